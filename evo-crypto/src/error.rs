use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("Invalid signature encoding: expected 64 bytes, got {0}")]
    MalformedSignature(usize),

    #[error("Signature verification failed")]
    InvalidSignature,
}
