//! Keypair generation and management.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use evo_types::{KeyId, PublicKey};

use crate::error::CryptoError;

/// Represents a cryptographic key pair (public and secret key).
#[derive(Clone)]
pub struct EvoKeyPair {
    signing_key: SigningKey,
}

impl EvoKeyPair {
    /// Generates a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        EvoKeyPair { signing_key: SigningKey::generate(&mut csprng) }
    }

    /// Rebuilds a key pair from its 32-byte secret.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        EvoKeyPair { signing_key: SigningKey::from_bytes(secret) }
    }

    /// Parses a hex-encoded 32-byte secret, as given on the command line.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| CryptoError::InvalidSecretKey(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self::from_secret_bytes(&secret))
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Returns the public key of this key pair.
    pub fn public_key(&self) -> PublicKey {
        self.signing_key.verifying_key().to_bytes()
    }

    /// HASH160 of the public key; the "address" form used for owner and voting keys.
    pub fn key_id(&self) -> KeyId {
        crate::hash::hash160(&self.public_key())
    }

    /// Signs the given message with the secret key.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for EvoKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvoKeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}
