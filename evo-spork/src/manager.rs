//! Spork manager: verified ingestion, threshold tally and persistence.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use evo_crypto::{verify_signature, EvoKeyPair};
use evo_types::{SporkId, SporkMessage};

use crate::clock::Clock;
use crate::config::SporkConfig;
use crate::error::SporkError;
use crate::sporks::{spork_by_id, spork_by_name, KNOWN_SPORKS};
use crate::tally::{RecordOutcome, SporkTally};

const SPORK_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The message was stored; effective value before and after.
    Accepted { previous: i64, current: i64 },
    /// The signer already has an equal or newer message for this spork.
    Stale,
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }

    pub fn value_changed(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { previous, current } if previous != current)
    }
}

#[derive(Serialize, Deserialize)]
struct SporkFile {
    version: u32,
    messages: Vec<SporkMessage>,
}

pub struct SporkManager {
    config: SporkConfig,
    signer: Option<EvoKeyPair>,
    clock: Arc<dyn Clock>,
    tally: Mutex<SporkTally>,
}

impl SporkManager {
    pub fn new(config: SporkConfig, clock: Arc<dyn Clock>) -> Result<Self, SporkError> {
        let signer = config.validate()?;
        info!(
            "Spork manager configured with {} signer keys, {} required{}",
            config.signer_keys.len(),
            config.min_signers,
            if signer.is_some() { ", local signer enabled" } else { "" }
        );
        Ok(Self { config, signer, clock, tally: Mutex::new(SporkTally::new()) })
    }

    pub fn config(&self) -> &SporkConfig {
        &self.config
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    /// Verifies and records a signed message, then re-tallies its spork.
    pub fn ingest(&self, message: SporkMessage) -> Result<IngestOutcome, SporkError> {
        self.check_message(&message)?;
        let now = self.clock.now();
        let max_drift = self.config.max_future_drift_secs;
        if message.time_signed > now.saturating_add(max_drift as i64) {
            return Err(SporkError::FutureTimestamp { time_signed: message.time_signed, now, max_drift });
        }

        let mut tally = self.lock();
        Ok(self.record_locked(&mut tally, message))
    }

    fn record_locked(&self, tally: &mut SporkTally, message: SporkMessage) -> IngestOutcome {
        let spork_id = message.spork_id;
        let previous = tally.current_value(spork_id);
        if tally.record(message) == RecordOutcome::Stale {
            return IngestOutcome::Stale;
        }
        let current = tally.recompute(spork_id, self.config.min_signers);
        if previous != current {
            info!("Spork {} changed from {} to {}", spork_name(spork_id), previous, current);
        }
        IngestOutcome::Accepted { previous, current }
    }

    // Spork known, signer configured, signature valid.
    fn check_message(&self, message: &SporkMessage) -> Result<(), SporkError> {
        if spork_by_id(message.spork_id).is_none() {
            return Err(SporkError::UnknownSpork(message.spork_id.to_string()));
        }
        if !self.config.signer_keys.contains(&message.signer) {
            return Err(SporkError::UnknownSigner(hex::encode(message.signer)));
        }
        verify_signature(&message.signer, &message.signable_bytes(), &message.signature)
            .map_err(|_| SporkError::BadSignature(message.spork_id))
    }

    pub fn recompute(&self, spork_id: SporkId) -> i64 {
        self.lock().recompute(spork_id, self.config.min_signers)
    }

    pub fn recompute_all(&self) {
        let mut tally = self.lock();
        for def in KNOWN_SPORKS {
            tally.recompute(def.id, self.config.min_signers);
        }
    }

    /// Periodic maintenance: drops messages from unconfigured keys, with
    /// signatures that no longer verify, or past the freshness window, then
    /// re-tallies every spork. Returns the number of messages dropped.
    pub fn check_and_remove(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.signature_ttl_secs;
        let mut tally = self.lock();
        let removed = tally.retain(|message| {
            let fresh = ttl.map_or(true, |ttl| message.time_signed.saturating_add(ttl as i64) >= now);
            fresh && self.check_message(message).is_ok()
        });
        for def in KNOWN_SPORKS {
            tally.recompute(def.id, self.config.min_signers);
        }
        if removed > 0 {
            info!("Dropped {} spork messages during maintenance", removed);
        }
        removed
    }

    /// Signs `(spork, value, now)` with the local key and ingests it. The
    /// returned message is meant for relay.
    pub fn broadcast(&self, spork_id: SporkId, value: i64) -> Result<SporkMessage, SporkError> {
        let signer = self.signer.as_ref().ok_or(SporkError::NoSigningKey)?;
        if spork_by_id(spork_id).is_none() {
            return Err(SporkError::UnknownSpork(spork_id.to_string()));
        }

        // Held from timestamp choice to record: one signer never reuses a timestamp.
        let mut tally = self.lock();
        let now = self.clock.now();
        let time_signed = match tally.latest(spork_id, &signer.public_key()) {
            Some(last) if last.time_signed >= now => last.time_signed + 1,
            _ => now,
        };

        let mut message = SporkMessage {
            spork_id,
            value,
            time_signed,
            signer: signer.public_key(),
            signature: Vec::new(),
        };
        message.signature = signer.sign(&message.signable_bytes());
        self.record_locked(&mut tally, message.clone());
        drop(tally);
        debug!("Signed spork {} = {} at {}", spork_name(spork_id), value, time_signed);
        Ok(message)
    }

    pub fn value(&self, spork_id: SporkId) -> i64 {
        self.lock().current_value(spork_id)
    }

    pub fn value_by_name(&self, name: &str) -> Result<i64, SporkError> {
        let def = spork_by_name(name).ok_or_else(|| SporkError::UnknownSpork(name.to_string()))?;
        Ok(self.value(def.id))
    }

    /// A spork is active once local time has passed its value.
    pub fn is_active(&self, spork_id: SporkId) -> bool {
        self.value(spork_id) < self.clock.now()
    }

    /// Current value of every known spork, by name.
    pub fn show(&self) -> BTreeMap<&'static str, i64> {
        let tally = self.lock();
        KNOWN_SPORKS.iter().map(|def| (def.name, tally.current_value(def.id))).collect()
    }

    /// `is_active` for every known spork, by name.
    pub fn active(&self) -> BTreeMap<&'static str, bool> {
        let now = self.clock.now();
        self.show().into_iter().map(|(name, value)| (name, value < now)).collect()
    }

    /// All retained signed messages, e.g. to answer a peer's request.
    pub fn messages(&self) -> Vec<SporkMessage> {
        self.lock().messages().cloned().collect()
    }

    pub fn save_to_disk(&self, path: &Path) -> Result<(), SporkError> {
        let file = SporkFile { version: SPORK_FILE_VERSION, messages: self.messages() };
        let encoded = bincode::serialize(&file)?;
        std::fs::write(path, encoded)?;
        debug!("Saved {} spork messages to {}", file.messages.len(), path.display());
        Ok(())
    }

    /// Restores this node's own signed messages saved by
    /// [`save_to_disk`](Self::save_to_disk). Messages from other signers are
    /// not restored: after a restart they only count again once peers
    /// re-broadcast them. Returns the number kept.
    pub fn load_from_disk(&self, path: &Path) -> Result<usize, SporkError> {
        let encoded = std::fs::read(path)?;
        let file: SporkFile = bincode::deserialize(&encoded)?;
        if file.version != SPORK_FILE_VERSION {
            warn!("Ignoring spork file {} with unknown version {}", path.display(), file.version);
            return Ok(0);
        }

        let own_key = self.signer.as_ref().map(EvoKeyPair::public_key);
        let total = file.messages.len();
        {
            let mut tally = self.lock();
            for message in file.messages {
                if Some(message.signer) == own_key {
                    tally.record(message);
                }
            }
        }
        self.check_and_remove();
        let kept = self.lock().len();
        info!("Loaded {} of {} spork messages from {}", kept, total, path.display());
        Ok(kept)
    }

    fn lock(&self) -> MutexGuard<'_, SporkTally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn spork_name(spork_id: SporkId) -> String {
    spork_by_id(spork_id).map_or_else(|| spork_id.to_string(), |def| def.name.to_string())
}
