use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type PublicKey = [u8; 32];
pub type Hash = [u8; 32];
pub type KeyId = [u8; 20];

pub mod masternode;
pub mod provider;
pub mod spork;

pub use masternode::{MasternodeEntry, MasternodeState, RevocationReason};
pub use provider::{
    CoinbasePayload, PayloadSignature, ProRegPayload, ProUpRegPayload, ProUpRevPayload,
    ProUpServPayload, SpecialPayload,
};
pub use spork::{SporkId, SporkMessage};

/// The all-zero hash, used as the "null" txid of an embedded collateral reference.
pub const NULL_HASH: Hash = [0u8; 32];

/// Represents a reference to a specific transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// The transaction ID (hash) of the transaction containing the output.
    pub txid: Hash,
    /// The index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    /// A null outpoint refers to an output of the enclosing transaction itself.
    pub fn is_null_txid(&self) -> bool {
        self.txid == NULL_HASH
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8>, Box<bincode::ErrorKind>> {
        bincode::serialize(self)
    }
}

impl std::fmt::Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", hex::encode(self.txid), self.vout)
    }
}

impl PartialOrd for OutPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders outpoints by their canonical serialization: the 32 txid bytes
/// followed by the little-endian `vout`.
impl Ord for OutPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.txid
            .cmp(&other.txid)
            .then_with(|| self.vout.to_le_bytes().cmp(&other.vout.to_le_bytes()))
    }
}

/// Represents a transaction input, referencing a previous transaction's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// The `OutPoint` referencing the output being spent.
    pub previous_output: OutPoint,
    /// The script signature, providing proof of ownership.
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    pub fn new(previous_output: OutPoint) -> Self {
        TxInput { previous_output, script_sig: Vec::new(), sequence: u32::MAX }
    }
}

/// Represents a transaction output, specifying a value and a locking script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// The value of the output in base units.
    pub value: u64,
    /// The locking script (scriptPubKey) that defines the conditions for spending this output.
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> Self {
        TxOutput { value, script_pubkey }
    }

    /// Builds a standard P2PKH locking script paying to `key_id`.
    pub fn p2pkh(value: u64, key_id: &KeyId) -> Self {
        let mut script = Vec::with_capacity(25);
        script.extend_from_slice(&[0x76, 0xA9, 0x14]);
        script.extend_from_slice(key_id);
        script.extend_from_slice(&[0x88, 0xAC]);
        TxOutput { value, script_pubkey: script }
    }

    /// Extracts the public key hash from a P2PKH script, if applicable.
    pub fn extract_public_key_hash(&self) -> Option<KeyId> {
        // P2PKH script: OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY OP_CHECKSIG
        if self.script_pubkey.len() == 25
            && self.script_pubkey[0] == 0x76 // OP_DUP
            && self.script_pubkey[1] == 0xA9 // OP_HASH160
            && self.script_pubkey[2] == 0x14 // PUSHDATA(20)
            && self.script_pubkey[23] == 0x88 // OP_EQUALVERIFY
            && self.script_pubkey[24] == 0xAC // OP_CHECKSIG
        {
            let mut public_key_hash = [0u8; 20];
            public_key_hash.copy_from_slice(&self.script_pubkey[3..23]);
            Some(public_key_hash)
        } else {
            None
        }
    }
}

/// A transaction as handed to the registry by the block-connection path.
///
/// Ordinary transactions carry no payload; provider and coinbase
/// transactions carry exactly one [`SpecialPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
    pub payload: Option<SpecialPayload>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>, payload: Option<SpecialPayload>) -> Self {
        Transaction {
            version: if payload.is_some() { 3 } else { 2 },
            inputs,
            outputs,
            lock_time: 0,
            payload,
        }
    }

    /// Returns the canonical byte representation of the transaction.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Box<bincode::ErrorKind>> {
        bincode::serialize(self)
    }

    /// Calculates and returns the transaction ID (BLAKE3 of the canonical bytes).
    pub fn txid(&self) -> Hash {
        let bytes = self.to_bytes().expect("Failed to serialize transaction");
        blake3::hash(&bytes).into()
    }

    /// Hash over the outpoints spent by this transaction. Provider payloads
    /// commit to it so a signed payload cannot be replayed in another transaction.
    pub fn inputs_hash(&self) -> Hash {
        let outpoints: Vec<&OutPoint> = self.inputs.iter().map(|i| &i.previous_output).collect();
        let bytes = bincode::serialize(&outpoints).expect("Failed to serialize transaction inputs");
        blake3::hash(&bytes).into()
    }

    pub fn spent_outpoints(&self) -> impl Iterator<Item = &OutPoint> {
        self.inputs.iter().map(|input| &input.previous_output)
    }

    pub fn is_special(&self) -> bool {
        self.payload.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outpoint_order_matches_serialized_bytes() {
        let a = OutPoint::new([1u8; 32], 1);
        let b = OutPoint::new([1u8; 32], 256);
        let c = OutPoint::new([2u8; 32], 0);

        let mut by_ord = vec![c, b, a];
        by_ord.sort();

        let mut by_bytes = vec![c, b, a];
        by_bytes.sort_by_key(|o| o.encode_to_vec().unwrap());

        assert_eq!(by_ord, by_bytes);
        // 256 serializes as 00 01 00 00, which sorts before 01 00 00 00.
        assert_eq!(by_ord[0], b);
    }

    #[test]
    fn p2pkh_round_trips_key_id() {
        let key_id = [7u8; 20];
        let output = TxOutput::p2pkh(42, &key_id);
        assert_eq!(output.extract_public_key_hash(), Some(key_id));
        assert_eq!(TxOutput::new(1, vec![0x6a]).extract_public_key_hash(), None);
    }

    #[test]
    fn inputs_hash_depends_on_spent_outpoints() {
        let tx_a = Transaction::new(vec![TxInput::new(OutPoint::new([1u8; 32], 0))], vec![], None);
        let tx_b = Transaction::new(vec![TxInput::new(OutPoint::new([1u8; 32], 1))], vec![], None);
        assert_ne!(tx_a.inputs_hash(), tx_b.inputs_hash());

        let mut tx_c = tx_a.clone();
        tx_c.outputs.push(TxOutput::new(5, vec![]));
        assert_eq!(tx_a.inputs_hash(), tx_c.inputs_hash());
        assert_ne!(tx_a.txid(), tx_c.txid());
    }

    #[test]
    fn txid_is_blake3_of_bytes_and_never_null() {
        let tx = Transaction::new(vec![], vec![], None);
        let expected: Hash = blake3::hash(&tx.to_bytes().unwrap()).into();
        assert_eq!(tx.txid(), expected);
        assert_ne!(tx.txid(), NULL_HASH);
        assert!(OutPoint::new(NULL_HASH, 0).is_null_txid());
    }

    #[test]
    fn outpoint_display_uses_txid_dash_vout() {
        let outpoint = OutPoint::new([0xab; 32], 3);
        assert!(outpoint.to_string().ends_with("abab-3"));
    }
}
