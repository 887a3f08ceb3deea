//! Height-tagged masternode list snapshot.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use evo_crypto::merkle_root;
use evo_types::{Hash, KeyId, MasternodeEntry, OutPoint, PublicKey};

use crate::diff::ListMutation;
use crate::error::RegistryError;

/// The registry contents at one height.
///
/// Entries are keyed by collateral outpoint. `OutPoint`'s ordering equals the
/// ordering of its serialized bytes, so iterating `entries` already yields the
/// canonical commitment order. Secondary indexes map unique attributes back to
/// the owning proTxHash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasternodeList {
    height: Option<u32>,
    entries: BTreeMap<OutPoint, Arc<MasternodeEntry>>,
    by_pro_tx_hash: HashMap<Hash, OutPoint>,
    service_addresses: HashMap<SocketAddr, Hash>,
    operator_keys: HashMap<PublicKey, Hash>,
    owner_keys: HashMap<KeyId, Hash>,
    // Every proTxHash ever registered up to this height, live or not.
    known_pro_tx_hashes: HashSet<Hash>,
}

impl MasternodeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub(crate) fn set_height(&mut self, height: Option<u32>) {
        self.height = height;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&MasternodeEntry> {
        self.entries.get(outpoint).map(Arc::as_ref)
    }

    pub fn get_by_pro_tx_hash(&self, pro_tx_hash: &Hash) -> Option<&MasternodeEntry> {
        self.by_pro_tx_hash
            .get(pro_tx_hash)
            .and_then(|outpoint| self.get(outpoint))
    }

    /// Entries sorted by collateral outpoint.
    pub fn entries(&self) -> impl Iterator<Item = &MasternodeEntry> {
        self.entries.values().map(Arc::as_ref)
    }

    pub fn valid_entries(&self) -> impl Iterator<Item = &MasternodeEntry> {
        self.entries().filter(|entry| entry.is_valid())
    }

    pub fn is_pro_tx_hash_known(&self, pro_tx_hash: &Hash) -> bool {
        self.known_pro_tx_hashes.contains(pro_tx_hash)
    }

    pub fn service_address_owner(&self, address: &SocketAddr) -> Option<&Hash> {
        self.service_addresses.get(address)
    }

    pub fn operator_key_owner(&self, key: &PublicKey) -> Option<&Hash> {
        self.operator_keys.get(key)
    }

    pub fn owner_key_owner(&self, key_id: &KeyId) -> Option<&Hash> {
        self.owner_keys.get(key_id)
    }

    /// Commitment over the serialized entries in outpoint order. An empty
    /// list commits to the all-zero hash.
    pub fn merkle_root(&self) -> Result<Hash, RegistryError> {
        let leaves = self
            .entries()
            .map(MasternodeEntry::to_bytes)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        let blocks: Vec<&[u8]> = leaves.iter().map(Vec::as_slice).collect();
        Ok(merkle_root(&blocks))
    }

    pub fn apply(&mut self, mutation: &ListMutation) {
        match mutation {
            ListMutation::Added(entry) => {
                self.known_pro_tx_hashes.insert(entry.pro_reg_tx_hash);
                self.insert(entry.clone());
            }
            ListMutation::Updated { previous, current } => {
                self.remove(&previous.collateral_outpoint);
                self.insert(current.clone());
            }
            ListMutation::Removed(entry) => {
                self.remove(&entry.collateral_outpoint);
            }
        }
    }

    /// Undoes `mutation`. Undoing an addition also forgets its proTxHash, so
    /// that a reverted list compares equal to the one before the block.
    pub fn revert(&mut self, mutation: &ListMutation) {
        self.apply(&mutation.inverse());
        if let ListMutation::Added(entry) = mutation {
            self.known_pro_tx_hashes.remove(&entry.pro_reg_tx_hash);
        }
    }

    fn insert(&mut self, entry: MasternodeEntry) {
        let pro_tx_hash = entry.pro_reg_tx_hash;
        self.by_pro_tx_hash.insert(pro_tx_hash, entry.collateral_outpoint);
        if let Some(address) = entry.state.service_address {
            self.service_addresses.insert(address, pro_tx_hash);
        }
        if let Some(key) = entry.state.operator_public_key {
            self.operator_keys.insert(key, pro_tx_hash);
        }
        self.owner_keys.insert(entry.state.owner_address, pro_tx_hash);
        self.entries.insert(entry.collateral_outpoint, Arc::new(entry));
    }

    fn remove(&mut self, outpoint: &OutPoint) -> Option<Arc<MasternodeEntry>> {
        let entry = self.entries.remove(outpoint)?;
        self.by_pro_tx_hash.remove(&entry.pro_reg_tx_hash);
        if let Some(address) = entry.state.service_address {
            self.service_addresses.remove(&address);
        }
        if let Some(key) = entry.state.operator_public_key {
            self.operator_keys.remove(&key);
        }
        self.owner_keys.remove(&entry.state.owner_address);
        Some(entry)
    }
}
