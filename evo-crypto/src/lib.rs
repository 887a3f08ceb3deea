//! Cryptographic primitives for the masternode registry and spork layer

pub mod error;
pub mod hash;
pub mod keypair;
pub mod signature;

pub use error::CryptoError;
pub use hash::{calculate_sha256, hash160, merkle_root, MerkleTree};
pub use keypair::EvoKeyPair;
pub use signature::{is_valid_public_key, key_id, verify_signature};
