use thiserror::Error;

use evo_types::SporkId;

#[derive(Debug, Error)]
pub enum SporkError {
    #[error("unknown spork {0}")]
    UnknownSpork(String),

    #[error("message signed by unconfigured key {0}")]
    UnknownSigner(String),

    #[error("bad signature on spork {0}")]
    BadSignature(SporkId),

    #[error("spork message signed at {time_signed}, more than {max_drift}s after local time {now}")]
    FutureTimestamp { time_signed: i64, now: i64, max_drift: u64 },

    #[error("no spork signing key configured")]
    NoSigningKey,

    #[error("invalid spork configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}
