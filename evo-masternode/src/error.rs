use std::net::SocketAddr;

use thiserror::Error;

use evo_types::{Hash, OutPoint};

/// Why a provider transaction was rejected. Any of these rejects the whole block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("provider transactions are not allowed before DIP3 activation")]
    Dip3NotActive,

    #[error("unsupported payload version {0}")]
    BadPayloadVersion(u16),

    #[error("collateral {0} already backs a registered masternode")]
    DuplicateCollateral(OutPoint),

    #[error("collateral value {actual} does not match required {expected}")]
    BadCollateralValue { expected: u64, actual: u64 },

    #[error("embedded collateral index {0} out of range")]
    BadCollateralIndex(u32),

    #[error("collateral {0} not found or already spent")]
    CollateralNotFound(OutPoint),

    #[error("malformed key: {0}")]
    BadKeys(&'static str),

    #[error("payout script is empty")]
    BadPayee,

    #[error("proTxHash {} already used", hex::encode(.0))]
    DuplicateProTxHash(Hash),

    #[error("service address {0} already in use")]
    DuplicateServiceAddress(SocketAddr),

    #[error("{0} already in use by another masternode")]
    DuplicateKey(&'static str),

    #[error("no masternode with proTxHash {}", hex::encode(.0))]
    UnknownMasternode(Hash),

    #[error("inputs hash does not match the transaction inputs")]
    BadInputsHash,

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
}

impl ValidationError {
    /// Signature/authorization failures, as opposed to rule violations.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ValidationError::Unauthorized(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("transaction {tx_index} ({}) rejected: {source}", hex::encode(.txid))]
    Validation {
        tx_index: usize,
        txid: Hash,
        #[source]
        source: ValidationError,
    },

    #[error("unexpected block height {got}, expected {expected}")]
    UnexpectedHeight { expected: u32, got: u32 },

    /// Revert requested past the retained diff history. Callers must treat
    /// this as fatal: the registry can no longer follow the chain.
    #[error("no diff retained for height {height} (retaining {retained} blocks)")]
    ReorgDepthExceeded { height: u32, retained: usize },

    #[error("bad coinbase payload: {0}")]
    BadCoinbasePayload(String),

    #[error("masternode list for height {height} is not available")]
    HeightUnavailable { height: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("masternode list merkle root mismatch: block commits to {}, computed {}", hex::encode(.committed), hex::encode(.computed))]
    BadMerkleRoot { committed: Hash, computed: Hash },
}
