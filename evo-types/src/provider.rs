//! Special transaction payloads (provider transactions and the coinbase
//! commitment).
//!
//! Every signed payload exposes `signable_bytes()`: the canonical bincode
//! encoding of the payload with its signature bytes emptied. Signers and
//! verifiers must both go through it.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{Hash, KeyId, OutPoint, PublicKey, RevocationReason};

/// A signature together with the key that produced it, for payloads whose
/// authorizing key is only known by its key id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSignature {
    pub public_key: PublicKey,
    pub signature: Vec<u8>,
}

impl PayloadSignature {
    fn unsigned(&self) -> Self {
        PayloadSignature { public_key: self.public_key, signature: Vec::new() }
    }
}

/// Provider registration (ProRegTx).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRegPayload {
    pub version: u16,
    /// External collateral, or a null txid whose `vout` points into the
    /// registering transaction's own outputs.
    pub collateral_outpoint: OutPoint,
    pub service_address: SocketAddr,
    pub platform_port: Option<u16>,
    pub owner_key_id: KeyId,
    pub operator_public_key: PublicKey,
    pub voting_key_id: KeyId,
    pub payout_script: Vec<u8>,
    pub inputs_hash: Hash,
    /// Signature by the collateral owner; required for external collateral only.
    pub payload_sig: Option<PayloadSignature>,
}

impl ProRegPayload {
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.payload_sig = self.payload_sig.as_ref().map(PayloadSignature::unsigned);
        bincode::serialize(&unsigned).expect("Failed to serialize payload for signing")
    }

    pub fn has_embedded_collateral(&self) -> bool {
        self.collateral_outpoint.is_null_txid()
    }
}

/// Operator-signed service update (ProUpServTx).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProUpServPayload {
    pub version: u16,
    pub pro_tx_hash: Hash,
    pub service_address: SocketAddr,
    pub platform_port: Option<u16>,
    /// Operator key rotation; `None` keeps the current key.
    pub new_operator_key: Option<PublicKey>,
    pub inputs_hash: Hash,
    pub payload_sig: Vec<u8>,
}

impl ProUpServPayload {
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.payload_sig = Vec::new();
        bincode::serialize(&unsigned).expect("Failed to serialize payload for signing")
    }
}

/// Owner-signed registrar update (ProUpRegTx). `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProUpRegPayload {
    pub version: u16,
    pub pro_tx_hash: Hash,
    pub operator_public_key: Option<PublicKey>,
    pub voting_key_id: Option<KeyId>,
    pub payout_script: Option<Vec<u8>>,
    pub inputs_hash: Hash,
    pub payload_sig: PayloadSignature,
}

impl ProUpRegPayload {
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.payload_sig = self.payload_sig.unsigned();
        bincode::serialize(&unsigned).expect("Failed to serialize payload for signing")
    }
}

/// Operator-signed revocation (ProUpRevTx).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProUpRevPayload {
    pub version: u16,
    pub pro_tx_hash: Hash,
    pub reason: RevocationReason,
    pub inputs_hash: Hash,
    pub payload_sig: Vec<u8>,
}

impl ProUpRevPayload {
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.payload_sig = Vec::new();
        bincode::serialize(&unsigned).expect("Failed to serialize payload for signing")
    }
}

/// Coinbase commitment to the masternode list at the block's height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbasePayload {
    pub version: u16,
    pub height: u32,
    pub merkle_root_mn_list: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialPayload {
    ProviderRegister(ProRegPayload),
    ProviderUpdateService(ProUpServPayload),
    ProviderUpdateRegistrar(ProUpRegPayload),
    ProviderUpdateRevoke(ProUpRevPayload),
    Coinbase(CoinbasePayload),
}

impl SpecialPayload {
    pub fn name(&self) -> &'static str {
        match self {
            SpecialPayload::ProviderRegister(_) => "ProRegTx",
            SpecialPayload::ProviderUpdateService(_) => "ProUpServTx",
            SpecialPayload::ProviderUpdateRegistrar(_) => "ProUpRegTx",
            SpecialPayload::ProviderUpdateRevoke(_) => "ProUpRevTx",
            SpecialPayload::Coinbase(_) => "CbTx",
        }
    }

    pub fn is_provider_tx(&self) -> bool {
        !matches!(self, SpecialPayload::Coinbase(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signable_bytes_ignore_signature() {
        let mut payload = ProUpServPayload {
            version: 1,
            pro_tx_hash: [3u8; 32],
            service_address: "10.0.0.1:9999".parse().unwrap(),
            platform_port: None,
            new_operator_key: None,
            inputs_hash: [4u8; 32],
            payload_sig: Vec::new(),
        };
        let before = payload.signable_bytes();
        payload.payload_sig = vec![1, 2, 3];
        assert_eq!(before, payload.signable_bytes());

        payload.service_address = "10.0.0.2:9999".parse().unwrap();
        assert_ne!(before, payload.signable_bytes());
    }

    #[test]
    fn registrar_signable_bytes_keep_signer_key() {
        let payload = ProUpRegPayload {
            version: 1,
            pro_tx_hash: [3u8; 32],
            operator_public_key: None,
            voting_key_id: Some([5u8; 20]),
            payout_script: None,
            inputs_hash: [4u8; 32],
            payload_sig: PayloadSignature { public_key: [6u8; 32], signature: vec![9; 64] },
        };
        let mut other_key = payload.clone();
        other_key.payload_sig.public_key = [7u8; 32];
        assert_ne!(payload.signable_bytes(), other_key.signable_bytes());
    }
}
