use thiserror::Error;

/// Error taxonomy for the authenticated key exchange.
///
/// Every variant is fatal: the protocol has no local recovery path, so any
/// `AkeError` means the caller should close the socket and drop all secret
/// material already derived for this session.
#[derive(Debug, Error)]
pub enum AkeError {
    #[error("i/o error during handshake: {0}")]
    Io(#[from] std::io::Error),

    #[error("i/o deadline elapsed during handshake")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("signature verification failed for peer's KEM key - possible MITM")]
    AuthFailure,

    #[error("transcript HMAC mismatch")]
    HmacMismatch,

    #[error("cryptographic primitive failed: {0}")]
    CryptoFailure(String),

    #[error("identity registry or key store error: {0}")]
    Storage(String),
}

impl AkeError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        AkeError::Protocol(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        AkeError::Storage(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        AkeError::CryptoFailure(msg.into())
    }
}

impl From<tokio::time::error::Elapsed> for AkeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AkeError::Timeout
    }
}

pub type Result<T> = std::result::Result<T, AkeError>;
