#![allow(dead_code)]

use std::net::SocketAddr;

use evo_crypto::EvoKeyPair;
use evo_masternode::{RegistryParams, MASTERNODE_COLLATERAL_AMOUNT};
use evo_types::{
    Hash, OutPoint, PayloadSignature, ProRegPayload, ProUpRegPayload, ProUpRevPayload,
    ProUpServPayload, RevocationReason, SpecialPayload, Transaction, TxInput, TxOutput, NULL_HASH,
};

pub fn params() -> RegistryParams {
    RegistryParams {
        collateral_amount: MASTERNODE_COLLATERAL_AMOUNT,
        activation_height: 1,
        max_reorg_depth: 10,
    }
}

pub fn keypair(tag: u8, seed: u8) -> EvoKeyPair {
    let mut secret = [tag; 32];
    secret[0] = seed;
    EvoKeyPair::from_secret_bytes(&secret)
}

pub fn service(seed: u8) -> SocketAddr {
    format!("10.0.1.{}:9999", seed).parse().unwrap()
}

/// Key material for one masternode.
pub struct TestMasternode {
    pub owner: EvoKeyPair,
    pub operator: EvoKeyPair,
    pub voting: EvoKeyPair,
    pub service: SocketAddr,
}

impl TestMasternode {
    pub fn new(seed: u8) -> Self {
        TestMasternode {
            owner: keypair(0x11, seed),
            operator: keypair(0x22, seed),
            voting: keypair(0x33, seed),
            service: service(seed),
        }
    }
}

/// A unique, otherwise meaningless funding input.
pub fn funding_input(seed: u8) -> TxInput {
    TxInput::new(OutPoint::new([seed; 32], 7))
}

fn inputs_hash(inputs: &[TxInput]) -> Hash {
    Transaction::new(inputs.to_vec(), vec![], None).inputs_hash()
}

fn registration_payload(mn: &TestMasternode, collateral_outpoint: OutPoint, inputs: &[TxInput]) -> ProRegPayload {
    ProRegPayload {
        version: 1,
        collateral_outpoint,
        service_address: mn.service,
        platform_port: None,
        owner_key_id: mn.owner.key_id(),
        operator_public_key: mn.operator.public_key(),
        voting_key_id: mn.voting.key_id(),
        payout_script: TxOutput::p2pkh(0, &mn.owner.key_id()).script_pubkey,
        inputs_hash: inputs_hash(inputs),
        payload_sig: None,
    }
}

/// Registration whose collateral is output 0 of the registering transaction.
pub fn register_embedded(mn: &TestMasternode, seed: u8) -> Transaction {
    register_embedded_with_value(mn, seed, MASTERNODE_COLLATERAL_AMOUNT)
}

pub fn register_embedded_with_value(mn: &TestMasternode, seed: u8, value: u64) -> Transaction {
    let inputs = vec![funding_input(seed)];
    let payload = registration_payload(mn, OutPoint::new(NULL_HASH, 0), &inputs);
    Transaction::new(
        inputs,
        vec![TxOutput::p2pkh(value, &mn.owner.key_id())],
        Some(SpecialPayload::ProviderRegister(payload)),
    )
}

/// Registration referencing an existing output, signed by `collateral_owner`.
pub fn register_external(
    mn: &TestMasternode,
    collateral: OutPoint,
    collateral_owner: &EvoKeyPair,
    seed: u8,
) -> Transaction {
    let inputs = vec![funding_input(seed)];
    let mut payload = registration_payload(mn, collateral, &inputs);
    payload.payload_sig = Some(PayloadSignature { public_key: collateral_owner.public_key(), signature: Vec::new() });
    let signature = collateral_owner.sign(&payload.signable_bytes());
    payload.payload_sig = Some(PayloadSignature { public_key: collateral_owner.public_key(), signature });
    Transaction::new(inputs, vec![], Some(SpecialPayload::ProviderRegister(payload)))
}

pub fn update_service(
    signer: &EvoKeyPair,
    pro_tx_hash: Hash,
    service_address: SocketAddr,
    new_operator_key: Option<&EvoKeyPair>,
    seed: u8,
) -> Transaction {
    let inputs = vec![funding_input(seed)];
    let mut payload = ProUpServPayload {
        version: 1,
        pro_tx_hash,
        service_address,
        platform_port: Some(26656),
        new_operator_key: new_operator_key.map(EvoKeyPair::public_key),
        inputs_hash: inputs_hash(&inputs),
        payload_sig: Vec::new(),
    };
    payload.payload_sig = signer.sign(&payload.signable_bytes());
    Transaction::new(inputs, vec![], Some(SpecialPayload::ProviderUpdateService(payload)))
}

pub fn update_registrar(
    owner: &EvoKeyPair,
    pro_tx_hash: Hash,
    operator: Option<&EvoKeyPair>,
    voting: Option<&EvoKeyPair>,
    payout_script: Option<Vec<u8>>,
    seed: u8,
) -> Transaction {
    let inputs = vec![funding_input(seed)];
    let mut payload = ProUpRegPayload {
        version: 1,
        pro_tx_hash,
        operator_public_key: operator.map(EvoKeyPair::public_key),
        voting_key_id: voting.map(EvoKeyPair::key_id),
        payout_script,
        inputs_hash: inputs_hash(&inputs),
        payload_sig: PayloadSignature { public_key: owner.public_key(), signature: Vec::new() },
    };
    payload.payload_sig.signature = owner.sign(&payload.signable_bytes());
    Transaction::new(inputs, vec![], Some(SpecialPayload::ProviderUpdateRegistrar(payload)))
}

pub fn revoke(operator: &EvoKeyPair, pro_tx_hash: Hash, reason: RevocationReason, seed: u8) -> Transaction {
    let inputs = vec![funding_input(seed)];
    let mut payload = ProUpRevPayload {
        version: 1,
        pro_tx_hash,
        reason,
        inputs_hash: inputs_hash(&inputs),
        payload_sig: Vec::new(),
    };
    payload.payload_sig = operator.sign(&payload.signable_bytes());
    Transaction::new(inputs, vec![], Some(SpecialPayload::ProviderUpdateRevoke(payload)))
}

/// An ordinary transaction spending `outpoint`.
pub fn spend(outpoint: OutPoint) -> Transaction {
    Transaction::new(vec![TxInput::new(outpoint)], vec![TxOutput::new(1, vec![0x51])], None)
}

pub fn embedded_collateral(tx: &Transaction) -> OutPoint {
    OutPoint::new(tx.txid(), 0)
}
