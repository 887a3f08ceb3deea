use ed25519_dalek::{Signature, VerifyingKey};

use evo_types::{KeyId, PublicKey};

use crate::error::CryptoError;

/// Verifies an ed25519 signature over `message`.
pub fn verify_signature(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let sig = Signature::from_slice(signature)
        .map_err(|_| CryptoError::MalformedSignature(signature.len()))?;
    key.verify_strict(message, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// A key is usable when it decodes to a curve point outside the small-order
/// subgroup. `verify_strict` rejects every signature from a small-order key.
pub fn is_valid_public_key(public_key: &PublicKey) -> bool {
    VerifyingKey::from_bytes(public_key).map_or(false, |key| !key.is_weak())
}

pub fn key_id(public_key: &PublicKey) -> KeyId {
    crate::hash::hash160(public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::EvoKeyPair;

    #[test]
    fn test_malformed_signature() {
        let keypair = EvoKeyPair::generate();
        assert_eq!(
            verify_signature(&keypair.public_key(), b"msg", &[0u8; 10]),
            Err(CryptoError::MalformedSignature(10))
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = EvoKeyPair::from_secret_bytes(&[1u8; 32]);
        let other = EvoKeyPair::from_secret_bytes(&[2u8; 32]);
        let sig = signer.sign(b"payload");
        assert_eq!(
            verify_signature(&other.public_key(), b"payload", &sig),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_public_key_validity() {
        assert!(is_valid_public_key(&EvoKeyPair::generate().public_key()));
        // y = 2 is not on the curve.
        let mut bogus = [0u8; 32];
        bogus[0] = 2;
        assert!(!is_valid_public_key(&bogus));
        // y = 1 encodes the identity, a small-order point.
        let mut identity = [0u8; 32];
        identity[0] = 1;
        assert!(!is_valid_public_key(&identity));
    }
}
