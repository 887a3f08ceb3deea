//! Signed spork messages as exchanged between peers.

use serde::{Deserialize, Serialize};

use crate::{Hash, PublicKey};

/// Numeric wire identifier of a spork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SporkId(pub i32);

impl std::fmt::Display for SporkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SporkMessage {
    pub spork_id: SporkId,
    pub value: i64,
    /// Unix time (seconds) at which the signer produced the message.
    pub time_signed: i64,
    pub signer: PublicKey,
    pub signature: Vec<u8>,
}

impl SporkMessage {
    /// Bytes covered by the signature: `(spork_id, value, time_signed)`.
    pub fn signable_bytes(&self) -> Vec<u8> {
        bincode::serialize(&(self.spork_id, self.value, self.time_signed))
            .expect("Failed to serialize spork message for signing")
    }

    /// Identity of the message for relay/inventory purposes.
    pub fn hash(&self) -> Hash {
        let bytes = bincode::serialize(&(self.spork_id, self.value, self.time_signed, self.signer))
            .expect("Failed to serialize spork message");
        blake3::hash(&bytes).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signable_bytes_layout() {
        let msg = SporkMessage {
            spork_id: SporkId(10001),
            value: 1,
            time_signed: 2,
            signer: [0u8; 32],
            signature: vec![0xff; 64],
        };
        let bytes = msg.signable_bytes();
        // i32 + i64 + i64, little-endian, no length prefixes.
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &10001i32.to_le_bytes());
        assert_eq!(&bytes[4..12], &1i64.to_le_bytes());
        assert_eq!(&bytes[12..20], &2i64.to_le_bytes());
    }

    #[test]
    fn test_hash_ignores_signature_bytes() {
        let mut msg = SporkMessage {
            spork_id: SporkId(10002),
            value: 3,
            time_signed: 4,
            signer: [1u8; 32],
            signature: vec![],
        };
        let h = msg.hash();
        msg.signature = vec![1; 64];
        assert_eq!(h, msg.hash());
        msg.signer = [2u8; 32];
        assert_ne!(h, msg.hash());
    }
}
