//! Length-prefixed message framing: `(type: u8, length: u32, payload)`.
//!
//! The length prefix is written/read in host byte order by default, matching
//! the original C++ endpoint's `send(sock, &data_len, sizeof(data_len), 0)`
//! (no `htonl`). Enable the `network-byte-order` feature to switch to a
//! portable big-endian prefix instead; the two are not wire-compatible.

use crate::error::{AkeError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// No legitimate payload in this protocol exceeds a signature plus a KEM
/// public key (a few KiB); refuse anything absurd before allocating.
pub const MAX_FRAME_LEN: u32 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Hello = 0x01,
    SigKeyRequest = 0x02,
    SigPublicKey = 0x03,
    KemKeyRequest = 0x04,
    KemPublicKeySigned = 0x05,
    EncryptedSecret = 0x06,
    HmacTag = 0x07,
    HmacVerifySuccess = 0x08,
    HmacVerifyFailure = 0x09,
}

impl MessageType {
    fn from_u8(b: u8) -> Result<Self> {
        Ok(match b {
            0x01 => MessageType::Hello,
            0x02 => MessageType::SigKeyRequest,
            0x03 => MessageType::SigPublicKey,
            0x04 => MessageType::KemKeyRequest,
            0x05 => MessageType::KemPublicKeySigned,
            0x06 => MessageType::EncryptedSecret,
            0x07 => MessageType::HmacTag,
            0x08 => MessageType::HmacVerifySuccess,
            0x09 => MessageType::HmacVerifyFailure,
            other => return Err(AkeError::protocol(format!("unknown message type 0x{other:02x}"))),
        })
    }
}

fn encode_len(len: u32) -> [u8; 4] {
    #[cfg(feature = "network-byte-order")]
    {
        len.to_be_bytes()
    }
    #[cfg(not(feature = "network-byte-order"))]
    {
        len.to_ne_bytes()
    }
}

fn decode_len(bytes: [u8; 4]) -> u32 {
    #[cfg(feature = "network-byte-order")]
    {
        u32::from_be_bytes(bytes)
    }
    #[cfg(not(feature = "network-byte-order"))]
    {
        u32::from_ne_bytes(bytes)
    }
}

pub async fn send_message(stream: &mut TcpStream, msg_type: MessageType, payload: &[u8]) -> Result<()> {
    let len = payload.len() as u32;
    stream.write_all(&[msg_type as u8]).await?;
    stream.write_all(&encode_len(len)).await?;
    if len > 0 {
        stream.write_all(payload).await?;
    }
    stream.flush().await?;
    Ok(())
}

pub async fn recv_message(stream: &mut TcpStream) -> Result<(MessageType, Vec<u8>)> {
    let mut type_buf = [0u8; 1];
    stream.read_exact(&mut type_buf).await?;
    let msg_type = MessageType::from_u8(type_buf[0])?;

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = decode_len(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(AkeError::protocol(format!(
            "frame length {len} exceeds maximum {MAX_FRAME_LEN}"
        )));
    }

    let mut payload = vec![0u8; len as usize];
    if len > 0 {
        stream.read_exact(&mut payload).await?;
    }
    Ok((msg_type, payload))
}

/// Read a frame and require it to be of `expected` type, else abort.
pub async fn recv_expect(stream: &mut TcpStream, expected: MessageType) -> Result<Vec<u8>> {
    let (got, payload) = recv_message(stream).await?;
    if got != expected {
        return Err(AkeError::protocol(format!(
            "expected message type {expected:?}, got {got:?}"
        )));
    }
    Ok(payload)
}
