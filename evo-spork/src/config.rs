use std::collections::BTreeSet;

use evo_crypto::EvoKeyPair;
use evo_types::PublicKey;

use crate::error::SporkError;

pub const DEFAULT_MAX_FUTURE_DRIFT_SECS: u64 = 2 * 60 * 60;

/// Process-wide spork configuration. Changing it requires a restart.
#[derive(Clone)]
pub struct SporkConfig {
    /// Keys whose signed messages count towards the tally.
    pub signer_keys: BTreeSet<PublicKey>,
    /// Distinct signers that must agree on a value for it to take effect.
    pub min_signers: usize,
    /// Secret key of this node, if it is itself a spork signer.
    pub signing_key: Option<[u8; 32]>,
    /// Messages timestamped further than this into the future are rejected.
    pub max_future_drift_secs: u64,
    /// When set, messages older than this are dropped on maintenance.
    pub signature_ttl_secs: Option<u64>,
}

impl std::fmt::Debug for SporkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SporkConfig")
            .field("signer_keys", &self.signer_keys.iter().map(hex::encode).collect::<Vec<_>>())
            .field("min_signers", &self.min_signers)
            .field("signing_key", &self.signing_key.map(|_| "<redacted>"))
            .field("max_future_drift_secs", &self.max_future_drift_secs)
            .field("signature_ttl_secs", &self.signature_ttl_secs)
            .finish()
    }
}

impl SporkConfig {
    pub fn new(signer_keys: impl IntoIterator<Item = PublicKey>, min_signers: usize) -> Self {
        Self {
            signer_keys: signer_keys.into_iter().collect(),
            min_signers,
            signing_key: None,
            max_future_drift_secs: DEFAULT_MAX_FUTURE_DRIFT_SECS,
            signature_ttl_secs: None,
        }
    }

    pub fn with_signing_key(mut self, secret: [u8; 32]) -> Self {
        self.signing_key = Some(secret);
        self
    }

    /// Checks the configuration and returns the local signer, if any.
    ///
    /// A non-empty key set needs a strict majority: `min_signers` must be
    /// above half the keys and at most all of them. With no keys at all the
    /// layer is inert and every spork keeps its default.
    pub fn validate(&self) -> Result<Option<EvoKeyPair>, SporkError> {
        let keys = self.signer_keys.len();
        if keys > 0 && (self.min_signers <= keys / 2 || self.min_signers > keys) {
            return Err(SporkError::InvalidConfig(format!(
                "min_signers {} invalid for {} signer keys",
                self.min_signers, keys
            )));
        }

        match self.signing_key {
            None => Ok(None),
            Some(secret) => {
                let signer = EvoKeyPair::from_secret_bytes(&secret);
                if !self.signer_keys.contains(&signer.public_key()) {
                    return Err(SporkError::InvalidConfig(
                        "signing key does not match any configured spork key".to_string(),
                    ));
                }
                Ok(Some(signer))
            }
        }
    }
}
