//! Provider transaction validation.
//!
//! The validator is stateless: given the list as it stands before a
//! transaction, it either rejects the transaction or returns the mutations
//! the transaction causes. The registry applies those before validating the
//! next transaction of the same block.

use std::collections::HashSet;

use evo_crypto::{is_valid_public_key, key_id, verify_signature};
use evo_types::{
    Hash, MasternodeEntry, MasternodeState, OutPoint, ProRegPayload, ProUpRegPayload,
    ProUpRevPayload, ProUpServPayload, PublicKey, RevocationReason, SpecialPayload, Transaction,
};

use crate::collateral::CollateralView;
use crate::diff::ListMutation;
use crate::error::ValidationError;
use crate::list::MasternodeList;
use crate::params::{RegistryParams, CURRENT_PROTX_VERSION};

/// What a single valid transaction does to the list.
pub type MutationIntent = ListMutation;

pub struct ProviderTxValidator {
    params: RegistryParams,
}

impl ProviderTxValidator {
    pub fn new(params: RegistryParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RegistryParams {
        &self.params
    }

    /// Validates `tx` at `height` against `list`.
    ///
    /// The payload's own intent (if any) comes first, followed by one
    /// `Removed` for every live collateral the transaction spends.
    pub fn validate(
        &self,
        list: &MasternodeList,
        tx: &Transaction,
        height: u32,
        dip3_active: bool,
        collateral: &dyn CollateralView,
    ) -> Result<Vec<MutationIntent>, ValidationError> {
        let mut intents = Vec::new();

        if let Some(payload) = &tx.payload {
            if payload.is_provider_tx() && !dip3_active {
                return Err(ValidationError::Dip3NotActive);
            }
            let intent = match payload {
                SpecialPayload::ProviderRegister(p) => Some(self.check_register(list, tx, p, height, collateral)?),
                SpecialPayload::ProviderUpdateService(p) => Some(self.check_update_service(list, tx, p, height)?),
                SpecialPayload::ProviderUpdateRegistrar(p) => Some(self.check_update_registrar(list, tx, p, height)?),
                SpecialPayload::ProviderUpdateRevoke(p) => Some(self.check_revoke(list, tx, p, height)?),
                SpecialPayload::Coinbase(_) => None,
            };
            intents.extend(intent);
        }

        let mut seen = HashSet::new();
        for outpoint in tx.spent_outpoints() {
            if !seen.insert(*outpoint) {
                continue;
            }
            // A payload that touched this collateral already holds the newest value.
            let touched = intents
                .iter()
                .filter_map(ListMutation::resulting_entry)
                .find(|entry| entry.collateral_outpoint == *outpoint)
                .cloned();
            if let Some(entry) = touched.or_else(|| list.get(outpoint).cloned()) {
                intents.push(ListMutation::Removed(entry));
            }
        }

        Ok(intents)
    }

    fn check_version(version: u16) -> Result<(), ValidationError> {
        if version == 0 || version > CURRENT_PROTX_VERSION {
            return Err(ValidationError::BadPayloadVersion(version));
        }
        Ok(())
    }

    fn check_inputs_hash(tx: &Transaction, committed: &Hash) -> Result<(), ValidationError> {
        if tx.inputs_hash() != *committed {
            return Err(ValidationError::BadInputsHash);
        }
        Ok(())
    }

    fn check_register(
        &self,
        list: &MasternodeList,
        tx: &Transaction,
        payload: &ProRegPayload,
        height: u32,
        collateral: &dyn CollateralView,
    ) -> Result<MutationIntent, ValidationError> {
        Self::check_version(payload.version)?;

        if payload.owner_key_id == [0u8; 20] {
            return Err(ValidationError::BadKeys("owner key id is null"));
        }
        if payload.voting_key_id == [0u8; 20] {
            return Err(ValidationError::BadKeys("voting key id is null"));
        }
        if !is_valid_public_key(&payload.operator_public_key) {
            return Err(ValidationError::BadKeys("operator key is not a valid public key"));
        }
        if payload.payout_script.is_empty() {
            return Err(ValidationError::BadPayee);
        }
        Self::check_inputs_hash(tx, &payload.inputs_hash)?;

        let txid = tx.txid();
        let collateral_outpoint = if payload.has_embedded_collateral() {
            let vout = payload.collateral_outpoint.vout;
            let output = tx
                .outputs
                .get(vout as usize)
                .ok_or(ValidationError::BadCollateralIndex(vout))?;
            self.check_collateral_value(output.value)?;
            OutPoint::new(txid, vout)
        } else {
            let outpoint = payload.collateral_outpoint;
            if list.get(&outpoint).is_some() {
                return Err(ValidationError::DuplicateCollateral(outpoint));
            }
            if tx.spent_outpoints().any(|spent| *spent == outpoint) {
                return Err(ValidationError::CollateralNotFound(outpoint));
            }
            let output = collateral
                .unspent_output(&outpoint)
                .ok_or(ValidationError::CollateralNotFound(outpoint))?;
            self.check_collateral_value(output.value)?;

            let sig = payload
                .payload_sig
                .as_ref()
                .ok_or(ValidationError::Unauthorized("external collateral requires an owner signature"))?;
            if output.extract_public_key_hash() != Some(key_id(&sig.public_key)) {
                return Err(ValidationError::Unauthorized("signer does not own the collateral"));
            }
            verify_signature(&sig.public_key, &payload.signable_bytes(), &sig.signature)
                .map_err(|_| ValidationError::Unauthorized("bad collateral owner signature"))?;
            outpoint
        };

        if list.is_pro_tx_hash_known(&txid) {
            return Err(ValidationError::DuplicateProTxHash(txid));
        }
        if list.service_address_owner(&payload.service_address).is_some() {
            return Err(ValidationError::DuplicateServiceAddress(payload.service_address));
        }
        if list.operator_key_owner(&payload.operator_public_key).is_some() {
            return Err(ValidationError::DuplicateKey("operator key"));
        }
        if list.owner_key_owner(&payload.owner_key_id).is_some() {
            return Err(ValidationError::DuplicateKey("owner key"));
        }

        Ok(ListMutation::Added(MasternodeEntry {
            pro_reg_tx_hash: txid,
            collateral_outpoint,
            registered_height: height,
            state: MasternodeState {
                owner_address: payload.owner_key_id,
                operator_public_key: Some(payload.operator_public_key),
                voting_address: payload.voting_key_id,
                payout_address: payload.payout_script.clone(),
                service_address: Some(payload.service_address),
                platform_port: payload.platform_port,
                last_paid_height: 0,
                pose_ban_height: None,
                revived_height: None,
                revocation_reason: RevocationReason::NotSpecified,
            },
        }))
    }

    fn check_collateral_value(&self, actual: u64) -> Result<(), ValidationError> {
        if actual != self.params.collateral_amount {
            return Err(ValidationError::BadCollateralValue {
                expected: self.params.collateral_amount,
                actual,
            });
        }
        Ok(())
    }

    fn check_update_service(
        &self,
        list: &MasternodeList,
        tx: &Transaction,
        payload: &ProUpServPayload,
        height: u32,
    ) -> Result<MutationIntent, ValidationError> {
        Self::check_version(payload.version)?;
        let previous = lookup(list, &payload.pro_tx_hash)?;
        Self::check_inputs_hash(tx, &payload.inputs_hash)?;
        verify_operator(&previous, &payload.signable_bytes(), &payload.payload_sig)?;

        if let Some(owner) = list.service_address_owner(&payload.service_address) {
            if *owner != payload.pro_tx_hash {
                return Err(ValidationError::DuplicateServiceAddress(payload.service_address));
            }
        }

        let mut current = previous.clone();
        if let Some(new_key) = payload.new_operator_key {
            if !is_valid_public_key(&new_key) {
                return Err(ValidationError::BadKeys("operator key is not a valid public key"));
            }
            if let Some(owner) = list.operator_key_owner(&new_key) {
                if *owner != payload.pro_tx_hash {
                    return Err(ValidationError::DuplicateKey("operator key"));
                }
            }
            current.state.operator_public_key = Some(new_key);
        }
        current.state.service_address = Some(payload.service_address);
        current.state.platform_port = payload.platform_port;
        if current.state.is_banned() {
            current.state.pose_ban_height = None;
            current.state.revived_height = Some(height);
        }

        Ok(ListMutation::Updated { previous, current })
    }

    fn check_update_registrar(
        &self,
        list: &MasternodeList,
        tx: &Transaction,
        payload: &ProUpRegPayload,
        height: u32,
    ) -> Result<MutationIntent, ValidationError> {
        Self::check_version(payload.version)?;
        let previous = lookup(list, &payload.pro_tx_hash)?;
        Self::check_inputs_hash(tx, &payload.inputs_hash)?;

        let signer = &payload.payload_sig;
        if key_id(&signer.public_key) != previous.state.owner_address {
            return Err(ValidationError::Unauthorized("payload not signed by the owner key"));
        }
        verify_signature(&signer.public_key, &payload.signable_bytes(), &signer.signature)
            .map_err(|_| ValidationError::Unauthorized("bad owner signature"))?;

        let mut current = previous.clone();
        if let Some(new_key) = payload.operator_public_key {
            if previous.state.operator_public_key != Some(new_key) {
                if !is_valid_public_key(&new_key) {
                    return Err(ValidationError::BadKeys("operator key is not a valid public key"));
                }
                if list.operator_key_owner(&new_key).is_some() {
                    return Err(ValidationError::DuplicateKey("operator key"));
                }
                // A new operator has to announce its service before the node is valid again.
                current.state.reset_operator_fields();
                current.state.operator_public_key = Some(new_key);
                current.state.ban_if_not_banned(height);
            }
        }
        if let Some(voting) = payload.voting_key_id {
            if voting == [0u8; 20] {
                return Err(ValidationError::BadKeys("voting key id is null"));
            }
            current.state.voting_address = voting;
        }
        if let Some(payout) = &payload.payout_script {
            if payout.is_empty() {
                return Err(ValidationError::BadPayee);
            }
            current.state.payout_address = payout.clone();
        }

        Ok(ListMutation::Updated { previous, current })
    }

    fn check_revoke(
        &self,
        list: &MasternodeList,
        tx: &Transaction,
        payload: &ProUpRevPayload,
        height: u32,
    ) -> Result<MutationIntent, ValidationError> {
        Self::check_version(payload.version)?;
        let previous = lookup(list, &payload.pro_tx_hash)?;
        Self::check_inputs_hash(tx, &payload.inputs_hash)?;
        verify_operator(&previous, &payload.signable_bytes(), &payload.payload_sig)?;

        let mut current = previous.clone();
        current.state.reset_operator_fields();
        current.state.ban_if_not_banned(height);
        current.state.revocation_reason = payload.reason;

        Ok(ListMutation::Updated { previous, current })
    }
}

fn lookup(list: &MasternodeList, pro_tx_hash: &Hash) -> Result<MasternodeEntry, ValidationError> {
    list.get_by_pro_tx_hash(pro_tx_hash)
        .cloned()
        .ok_or(ValidationError::UnknownMasternode(*pro_tx_hash))
}

fn verify_operator(entry: &MasternodeEntry, message: &[u8], signature: &[u8]) -> Result<(), ValidationError> {
    let operator: PublicKey = entry
        .state
        .operator_public_key
        .ok_or(ValidationError::Unauthorized("operator key was revoked"))?;
    verify_signature(&operator, message, signature)
        .map_err(|_| ValidationError::Unauthorized("bad operator signature"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_types::{TxInput, TxOutput};

    fn validator() -> ProviderTxValidator {
        ProviderTxValidator::new(RegistryParams { collateral_amount: 1000, ..RegistryParams::default() })
    }

    #[test]
    fn test_plain_transaction_has_no_intents() {
        let tx = Transaction::new(
            vec![TxInput::new(OutPoint::new([1u8; 32], 0))],
            vec![TxOutput::new(5, vec![0x51])],
            None,
        );
        let intents = validator()
            .validate(&MasternodeList::new(), &tx, 10, true, &crate::collateral::NoCollateral)
            .unwrap();
        assert!(intents.is_empty());
    }

    #[test]
    fn test_version_bounds() {
        assert_eq!(ProviderTxValidator::check_version(0), Err(ValidationError::BadPayloadVersion(0)));
        assert!(ProviderTxValidator::check_version(CURRENT_PROTX_VERSION).is_ok());
        assert_eq!(
            ProviderTxValidator::check_version(CURRENT_PROTX_VERSION + 1),
            Err(ValidationError::BadPayloadVersion(CURRENT_PROTX_VERSION + 1))
        );
    }

    #[test]
    fn test_unknown_target() {
        let payload = ProUpRevPayload {
            version: 1,
            pro_tx_hash: [8u8; 32],
            reason: RevocationReason::TerminationOfService,
            inputs_hash: [0u8; 32],
            payload_sig: Vec::new(),
        };
        let tx = Transaction::new(vec![], vec![], Some(SpecialPayload::ProviderUpdateRevoke(payload)));
        assert_eq!(
            validator().validate(&MasternodeList::new(), &tx, 10, true, &crate::collateral::NoCollateral),
            Err(ValidationError::UnknownMasternode([8u8; 32]))
        );
    }
}
