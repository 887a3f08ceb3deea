use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{Hash, KeyId, OutPoint, PublicKey};

/// Reason code carried by a provider revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevocationReason {
    NotSpecified,
    TerminationOfService,
    CompromisedKeys,
    ChangeOfKeys,
}

impl Default for RevocationReason {
    fn default() -> Self {
        RevocationReason::NotSpecified
    }
}

/// Mutable part of a registered masternode.
///
/// Every field here can be changed by a provider update transaction; the
/// registry records full before/after copies of this struct so that a block
/// can be reverted exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasternodeState {
    pub owner_address: KeyId,
    /// `None` once the operator revoked the registration.
    pub operator_public_key: Option<PublicKey>,
    pub voting_address: KeyId,
    /// Locking script that receives masternode payouts.
    pub payout_address: Vec<u8>,
    pub service_address: Option<SocketAddr>,
    pub platform_port: Option<u16>,
    pub last_paid_height: u32,
    pub pose_ban_height: Option<u32>,
    pub revived_height: Option<u32>,
    pub revocation_reason: RevocationReason,
}

impl MasternodeState {
    /// Names of the fields that differ between `self` and `other`.
    pub fn changed_fields(&self, other: &MasternodeState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.owner_address != other.owner_address {
            fields.push("ownerAddress");
        }
        if self.operator_public_key != other.operator_public_key {
            fields.push("operatorPublicKey");
        }
        if self.voting_address != other.voting_address {
            fields.push("votingAddress");
        }
        if self.payout_address != other.payout_address {
            fields.push("payoutAddress");
        }
        if self.service_address != other.service_address {
            fields.push("service");
        }
        if self.platform_port != other.platform_port {
            fields.push("platformPort");
        }
        if self.last_paid_height != other.last_paid_height {
            fields.push("lastPaidHeight");
        }
        if self.pose_ban_height != other.pose_ban_height {
            fields.push("PoSeBanHeight");
        }
        if self.revived_height != other.revived_height {
            fields.push("PoSeRevivedHeight");
        }
        if self.revocation_reason != other.revocation_reason {
            fields.push("revocationReason");
        }
        fields
    }

    pub fn is_banned(&self) -> bool {
        self.pose_ban_height.is_some()
    }

    /// Clears everything the operator controls. Used by revocation.
    pub fn reset_operator_fields(&mut self) {
        self.operator_public_key = None;
        self.service_address = None;
        self.platform_port = None;
        self.revocation_reason = RevocationReason::NotSpecified;
    }

    pub fn ban_if_not_banned(&mut self, height: u32) {
        if self.pose_ban_height.is_none() {
            self.pose_ban_height = Some(height);
        }
    }
}

/// One registered masternode, identified by the hash of its registration
/// transaction and backed by `collateral_outpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasternodeEntry {
    pub pro_reg_tx_hash: Hash,
    pub collateral_outpoint: OutPoint,
    pub registered_height: u32,
    pub state: MasternodeState,
}

impl MasternodeEntry {
    /// A masternode is valid (eligible for payment and quorums) unless banned.
    pub fn is_valid(&self) -> bool {
        !self.state.is_banned()
    }

    /// Canonical serialization used for the list commitment.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Box<bincode::ErrorKind>> {
        bincode::serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MasternodeState {
        MasternodeState {
            owner_address: [1u8; 20],
            operator_public_key: Some([2u8; 32]),
            voting_address: [1u8; 20],
            payout_address: vec![0x51],
            service_address: Some("127.0.0.1:19999".parse().unwrap()),
            platform_port: None,
            last_paid_height: 0,
            pose_ban_height: None,
            revived_height: None,
            revocation_reason: RevocationReason::NotSpecified,
        }
    }

    #[test]
    fn test_changed_fields() {
        let before = state();
        let mut after = before.clone();
        assert!(before.changed_fields(&after).is_empty());

        after.voting_address = [9u8; 20];
        after.service_address = Some("127.0.0.2:19999".parse().unwrap());
        assert_eq!(before.changed_fields(&after), vec!["votingAddress", "service"]);
    }

    #[test]
    fn test_reset_operator_fields_and_ban() {
        let mut s = state();
        s.revocation_reason = RevocationReason::CompromisedKeys;
        s.reset_operator_fields();
        s.ban_if_not_banned(10);
        s.ban_if_not_banned(12);

        assert_eq!(s.operator_public_key, None);
        assert_eq!(s.service_address, None);
        assert_eq!(s.revocation_reason, RevocationReason::NotSpecified);
        assert_eq!(s.pose_ban_height, Some(10));
        assert!(s.is_banned());
    }
}
