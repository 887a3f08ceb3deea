//! The deterministic masternode registry: block application, reorgs and
//! snapshot queries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{debug, error, info};

use evo_types::{CoinbasePayload, Hash, MasternodeEntry, OutPoint, SpecialPayload, Transaction};

use crate::collateral::{BlockCollateralView, CollateralView};
use crate::diff::{DiffLog, MasternodeListDiff};
use crate::error::RegistryError;
use crate::list::MasternodeList;
use crate::params::{ActivationGate, HeightActivation, RegistryParams};
use crate::validation::ProviderTxValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// No block at or above the activation height has been applied yet.
    Uninitialized,
    Active,
}

pub struct DeterministicMnManager {
    params: RegistryParams,
    validator: ProviderTxValidator,
    activation: Arc<dyn ActivationGate>,
    // Serializes apply/revert. Readers only touch `tip`.
    diffs: Mutex<DiffLog>,
    tip: RwLock<Arc<MasternodeList>>,
}

impl DeterministicMnManager {
    pub fn new(params: RegistryParams) -> Self {
        let gate = HeightActivation { activation_height: params.activation_height };
        Self::with_activation(params, Arc::new(gate))
    }

    pub fn with_activation(params: RegistryParams, activation: Arc<dyn ActivationGate>) -> Self {
        Self {
            validator: ProviderTxValidator::new(params.clone()),
            diffs: Mutex::new(DiffLog::new(params.max_reorg_depth)),
            tip: RwLock::new(Arc::new(MasternodeList::new())),
            activation,
            params,
        }
    }

    pub fn params(&self) -> &RegistryParams {
        &self.params
    }

    pub fn state(&self) -> RegistryState {
        match self.tip_height() {
            Some(height) if height >= self.params.activation_height => RegistryState::Active,
            _ => RegistryState::Uninitialized,
        }
    }

    pub fn tip_height(&self) -> Option<u32> {
        self.snapshot().height()
    }

    /// The current tip list. The returned snapshot never changes.
    pub fn snapshot(&self) -> Arc<MasternodeList> {
        self.tip.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Connects a block. Transactions are validated in order, each against
    /// the list as left by the previous one; the first failure aborts the
    /// block and nothing is committed.
    pub fn apply_block(
        &self,
        height: u32,
        transactions: &[Transaction],
        collateral: &dyn CollateralView,
    ) -> Result<MasternodeListDiff, RegistryError> {
        let mut diffs = lock(&self.diffs);
        let current = self.snapshot();
        if let Some(tip) = current.height() {
            let expected = tip.saturating_add(1);
            if height != expected {
                return Err(RegistryError::UnexpectedHeight { expected, got: height });
            }
        }

        let dip3_active = self.activation.is_dip3_active(height);
        let mut working = MasternodeList::clone(&current);
        let mut view = BlockCollateralView::new(collateral);
        let mut mutations = Vec::new();
        let mut coinbase: Option<&CoinbasePayload> = None;

        for (tx_index, tx) in transactions.iter().enumerate() {
            if let Some(SpecialPayload::Coinbase(payload)) = &tx.payload {
                if coinbase.replace(payload).is_some() {
                    return Err(RegistryError::BadCoinbasePayload(format!(
                        "second coinbase payload at transaction {}",
                        tx_index
                    )));
                }
            }
            let intents = self
                .validator
                .validate(&working, tx, height, dip3_active, &view)
                .map_err(|source| {
                    debug!("Rejecting block {}: transaction {} invalid: {}", height, tx_index, source);
                    RegistryError::Validation { tx_index, txid: tx.txid(), source }
                })?;
            for intent in &intents {
                working.apply(intent);
            }
            mutations.extend(intents);
            view.connect(tx);
        }
        working.set_height(Some(height));

        if let Some(payload) = coinbase {
            check_coinbase(payload, height, &working)?;
        }

        let diff = MasternodeListDiff { height, previous_height: current.height(), mutations };
        diffs.push(diff.clone());
        *self.tip.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(working);

        if !diff.is_empty() {
            info!(
                "Masternode list at height {}: {} added, {} updated, {} removed",
                height,
                diff.added().count(),
                diff.updated().count(),
                diff.removed().count()
            );
        }
        Ok(diff)
    }

    /// Disconnects the tip block by undoing its recorded diff.
    ///
    /// `ReorgDepthExceeded` means the caller asked for a revert beyond the
    /// retained history. The registry cannot recover from that and the
    /// caller must stop following the chain.
    pub fn revert_block(&self, height: u32) -> Result<(), RegistryError> {
        let mut diffs = lock(&self.diffs);
        let current = self.snapshot();
        match current.height() {
            Some(tip) if tip != height => {
                return Err(RegistryError::UnexpectedHeight { expected: tip, got: height });
            }
            _ => {}
        }

        let diff = diffs.pop_tip(height).ok_or_else(|| {
            error!(
                "Cannot revert masternode list at height {}: no diff retained ({} blocks kept)",
                height,
                diffs.len()
            );
            RegistryError::ReorgDepthExceeded { height, retained: diffs.len() }
        })?;

        let mut list = MasternodeList::clone(&current);
        for mutation in diff.mutations.iter().rev() {
            list.revert(mutation);
        }
        list.set_height(diff.previous_height);
        *self.tip.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(list);

        info!("Reverted masternode list block {} ({} mutations)", height, diff.mutations.len());
        Ok(())
    }

    pub fn query(&self, outpoint: &OutPoint) -> Option<MasternodeEntry> {
        self.snapshot().get(outpoint).cloned()
    }

    pub fn query_by_pro_tx_hash(&self, pro_tx_hash: &Hash) -> Option<MasternodeEntry> {
        self.snapshot().get_by_pro_tx_hash(pro_tx_hash).cloned()
    }

    /// All live entries, sorted by collateral outpoint.
    pub fn list(&self) -> Vec<MasternodeEntry> {
        self.snapshot().entries().cloned().collect()
    }

    pub fn diff(&self, height: u32) -> Option<MasternodeListDiff> {
        lock(&self.diffs).get(height).cloned()
    }

    /// The list as it stood at `height`, rebuilt from the tip by undoing
    /// retained diffs.
    pub fn snapshot_at(&self, height: u32) -> Result<Arc<MasternodeList>, RegistryError> {
        let diffs = lock(&self.diffs);
        let tip = self.snapshot();
        if tip.height() == Some(height) {
            return Ok(tip);
        }
        match tip.height() {
            Some(tip_height) if height < tip_height => {}
            _ => return Err(RegistryError::HeightUnavailable { height }),
        }

        let mut list = MasternodeList::clone(&tip);
        for diff in diffs.iter_rev() {
            if list.height() != Some(diff.height) {
                break;
            }
            for mutation in diff.mutations.iter().rev() {
                list.revert(mutation);
            }
            list.set_height(diff.previous_height);
            if list.height() == Some(height) {
                return Ok(Arc::new(list));
            }
        }
        Err(RegistryError::HeightUnavailable { height })
    }

    pub fn compute_merkle_root(&self, height: u32) -> Result<Hash, RegistryError> {
        self.snapshot_at(height)?.merkle_root()
    }
}

fn check_coinbase(payload: &CoinbasePayload, height: u32, list: &MasternodeList) -> Result<(), RegistryError> {
    if payload.height != height {
        return Err(RegistryError::BadCoinbasePayload(format!(
            "coinbase height {} does not match block height {}",
            payload.height, height
        )));
    }
    let computed = list.merkle_root()?;
    if payload.merkle_root_mn_list != computed {
        return Err(RegistryError::BadMerkleRoot { committed: payload.merkle_root_mn_list, computed });
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
