//! The 46-byte SRTP master key (32-byte AES-256 key ‖ 14-byte salt) handed
//! off to the media pipeline. Published once per session, by value.

use crate::crypto::SRTP_MASTER_KEY_LEN;
use zeroize::Zeroizing;

pub struct SessionKey(Zeroizing<[u8; SRTP_MASTER_KEY_LEN]>);

impl SessionKey {
    pub(crate) fn new(bytes: Zeroizing<[u8; SRTP_MASTER_KEY_LEN]>) -> Self {
        SessionKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SRTP_MASTER_KEY_LEN] {
        &self.0
    }

    pub fn aes_key(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn salt(&self) -> &[u8] {
        &self.0[32..]
    }
}
