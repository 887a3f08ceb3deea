use std::sync::Arc;

use evo_masternode::ActivationGate;
use evo_spork::{SporkManager, SPORK_4_DIP0003_ENFORCED};

/// DIP3 gate driven by chain height and `SPORK_4_DIP0003_ENFORCED`.
///
/// Provider transactions are accepted from `activation_height` on, but only
/// once either `enforcement_height` is reached or the spork value (a block
/// height) is at or below the block being connected.
pub struct SporkGatedActivation {
    pub activation_height: u32,
    pub enforcement_height: u32,
    sporks: Arc<SporkManager>,
}

impl SporkGatedActivation {
    pub fn new(activation_height: u32, enforcement_height: u32, sporks: Arc<SporkManager>) -> Self {
        Self { activation_height, enforcement_height, sporks }
    }
}

impl ActivationGate for SporkGatedActivation {
    fn is_dip3_active(&self, height: u32) -> bool {
        if height < self.activation_height {
            return false;
        }
        height >= self.enforcement_height || self.sporks.value(SPORK_4_DIP0003_ENFORCED) <= i64::from(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_crypto::EvoKeyPair;
    use evo_spork::{ManualClock, SporkConfig};

    fn sporks(with_key: bool) -> Arc<SporkManager> {
        let key = EvoKeyPair::from_secret_bytes(&[1u8; 32]);
        let mut config = SporkConfig::new([key.public_key()], 1);
        if with_key {
            config = config.with_signing_key([1u8; 32]);
        }
        Arc::new(SporkManager::new(config, Arc::new(ManualClock::new(1_700_000_000))).unwrap())
    }

    #[test]
    fn test_height_only() {
        let gate = SporkGatedActivation::new(135, 150, sporks(false));
        assert!(!gate.is_dip3_active(134));
        assert!(!gate.is_dip3_active(140));
        assert!(gate.is_dip3_active(150));
    }

    #[test]
    fn test_spork_enforces_early() {
        let manager = sporks(true);
        let gate = SporkGatedActivation::new(135, 150, manager.clone());
        manager.broadcast(SPORK_4_DIP0003_ENFORCED, 140).unwrap();
        assert!(!gate.is_dip3_active(139));
        assert!(gate.is_dip3_active(140));
        // Never before the activation height.
        manager.broadcast(SPORK_4_DIP0003_ENFORCED, 0).unwrap();
        assert!(!gate.is_dip3_active(100));
    }
}
