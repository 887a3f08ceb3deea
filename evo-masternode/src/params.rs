//! Registry configuration and the DIP3 activation seam.

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

/// Canonical masternode collateral denomination.
pub const MASTERNODE_COLLATERAL_AMOUNT: u64 = 10_000_000 * COIN;

/// Highest provider payload version understood by the validator.
pub const CURRENT_PROTX_VERSION: u16 = 1;

/// Configuration for the deterministic masternode registry.
#[derive(Debug, Clone)]
pub struct RegistryParams {
    /// Exact value a collateral output must carry.
    pub collateral_amount: u64,
    /// First height at which provider transactions are accepted.
    pub activation_height: u32,
    /// Number of per-block diffs retained for reorg handling.
    pub max_reorg_depth: usize,
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self {
            collateral_amount: MASTERNODE_COLLATERAL_AMOUNT,
            activation_height: 2,
            max_reorg_depth: 100,
        }
    }
}

/// Decides whether DIP3 rules apply to a block at `height`.
pub trait ActivationGate: Send + Sync {
    fn is_dip3_active(&self, height: u32) -> bool;
}

/// Plain height-based activation.
#[derive(Debug, Clone, Copy)]
pub struct HeightActivation {
    pub activation_height: u32,
}

impl ActivationGate for HeightActivation {
    fn is_dip3_active(&self, height: u32) -> bool {
        height >= self.activation_height
    }
}
