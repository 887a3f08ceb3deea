//! Read-only view of the unspent outputs that can back a registration.
//!
//! The UTXO set itself lives outside this crate; the registry only needs to
//! ask whether an outpoint is unspent and what it pays.

use std::collections::{HashMap, HashSet};

use evo_types::{OutPoint, Transaction, TxOutput};

pub trait CollateralView {
    /// The unspent output at `outpoint`, or `None` if it does not exist or is spent.
    fn unspent_output(&self, outpoint: &OutPoint) -> Option<TxOutput>;
}

/// A view with nothing unspent, for blocks without external-collateral registrations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCollateral;

impl CollateralView for NoCollateral {
    fn unspent_output(&self, _outpoint: &OutPoint) -> Option<TxOutput> {
        None
    }
}

/// Map-backed view, used by callers that track outputs themselves and by tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCollateralView {
    outputs: HashMap<OutPoint, TxOutput>,
}

impl InMemoryCollateralView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_output(&mut self, outpoint: OutPoint, output: TxOutput) {
        self.outputs.insert(outpoint, output);
    }

    pub fn spend(&mut self, outpoint: &OutPoint) -> Option<TxOutput> {
        self.outputs.remove(outpoint)
    }
}

impl CollateralView for InMemoryCollateralView {
    fn unspent_output(&self, outpoint: &OutPoint) -> Option<TxOutput> {
        self.outputs.get(outpoint).cloned()
    }
}

/// Layers the outputs created and spent by earlier transactions of the block
/// being connected on top of the pre-block view.
pub struct BlockCollateralView<'a> {
    base: &'a dyn CollateralView,
    created: HashMap<OutPoint, TxOutput>,
    spent: HashSet<OutPoint>,
}

impl<'a> BlockCollateralView<'a> {
    pub fn new(base: &'a dyn CollateralView) -> Self {
        Self { base, created: HashMap::new(), spent: HashSet::new() }
    }

    pub fn connect(&mut self, tx: &Transaction) {
        for outpoint in tx.spent_outpoints() {
            if self.created.remove(outpoint).is_none() {
                self.spent.insert(*outpoint);
            }
        }
        let txid = tx.txid();
        for (vout, output) in tx.outputs.iter().enumerate() {
            self.created.insert(OutPoint::new(txid, vout as u32), output.clone());
        }
    }
}

impl CollateralView for BlockCollateralView<'_> {
    fn unspent_output(&self, outpoint: &OutPoint) -> Option<TxOutput> {
        if let Some(output) = self.created.get(outpoint) {
            return Some(output.clone());
        }
        if self.spent.contains(outpoint) {
            return None;
        }
        self.base.unspent_output(outpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_types::TxInput;

    #[test]
    fn test_block_view_tracks_in_block_outputs() {
        let mut base = InMemoryCollateralView::new();
        let funding = OutPoint::new([1u8; 32], 0);
        base.add_output(funding, TxOutput::new(50, vec![]));

        let tx = Transaction::new(vec![TxInput::new(funding)], vec![TxOutput::new(40, vec![0x51])], None);
        let mut view = BlockCollateralView::new(&base);
        view.connect(&tx);

        assert!(view.unspent_output(&funding).is_none());
        assert_eq!(view.unspent_output(&OutPoint::new(tx.txid(), 0)).map(|o| o.value), Some(40));

        let spender = Transaction::new(vec![TxInput::new(OutPoint::new(tx.txid(), 0))], vec![], None);
        view.connect(&spender);
        assert!(view.unspent_output(&OutPoint::new(tx.txid(), 0)).is_none());
    }
}
