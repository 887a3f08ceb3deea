//! Per-spork record of the latest message from every signer.

use std::collections::{BTreeMap, HashMap};

use evo_types::{PublicKey, SporkId, SporkMessage};

use crate::sporks::{spork_by_id, SPORK_DEFAULT_OFF};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored,
    /// Not newer than what this signer already has on file.
    Stale,
}

#[derive(Debug, Default, Clone)]
pub struct SporkTally {
    signed: BTreeMap<SporkId, BTreeMap<PublicKey, SporkMessage>>,
    current: BTreeMap<SporkId, i64>,
}

impl SporkTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `message` if it is newer than the signer's stored one. Does not
    /// recompute.
    pub fn record(&mut self, message: SporkMessage) -> RecordOutcome {
        let by_signer = self.signed.entry(message.spork_id).or_default();
        match by_signer.get(&message.signer) {
            Some(stored) if stored.time_signed >= message.time_signed => RecordOutcome::Stale,
            _ => {
                by_signer.insert(message.signer, message);
                RecordOutcome::Stored
            }
        }
    }

    pub fn latest(&self, spork_id: SporkId, signer: &PublicKey) -> Option<&SporkMessage> {
        self.signed.get(&spork_id).and_then(|by_signer| by_signer.get(signer))
    }

    /// Drops every stored message for which `keep` is false. Returns how many went.
    pub fn retain(&mut self, mut keep: impl FnMut(&SporkMessage) -> bool) -> usize {
        let mut removed = 0;
        for by_signer in self.signed.values_mut() {
            let before = by_signer.len();
            by_signer.retain(|_, message| keep(message));
            removed += before - by_signer.len();
        }
        self.signed.retain(|_, by_signer| !by_signer.is_empty());
        removed
    }

    /// Re-derives the effective value of `spork_id` and caches it.
    pub fn recompute(&mut self, spork_id: SporkId, min_signers: usize) -> i64 {
        let default = default_value(spork_id);
        let value = match self.signed.get(&spork_id) {
            Some(by_signer) => tally_value(by_signer.values().map(|m| m.value), min_signers, default),
            None => default,
        };
        self.current.insert(spork_id, value);
        value
    }

    pub fn current_value(&self, spork_id: SporkId) -> i64 {
        self.current
            .get(&spork_id)
            .copied()
            .unwrap_or_else(|| default_value(spork_id))
    }

    pub fn messages(&self) -> impl Iterator<Item = &SporkMessage> {
        self.signed.values().flat_map(|by_signer| by_signer.values())
    }

    pub fn len(&self) -> usize {
        self.signed.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.signed.is_empty()
    }
}

fn default_value(spork_id: SporkId) -> i64 {
    spork_by_id(spork_id).map_or(SPORK_DEFAULT_OFF, |def| def.default_value)
}

/// The value asserted by the most signers, if that support reaches
/// `min_signers` and no other value has the same support. Otherwise `default`.
pub fn tally_value(values: impl Iterator<Item = i64>, min_signers: usize, default: i64) -> i64 {
    let mut support: HashMap<i64, usize> = HashMap::new();
    for value in values {
        *support.entry(value).or_insert(0) += 1;
    }

    let Some(best) = support.values().copied().max() else {
        return default;
    };
    let mut leaders = support.iter().filter(|(_, count)| **count == best);
    match (leaders.next(), leaders.next()) {
        (Some((value, _)), None) if best >= min_signers.max(1) => *value,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sporks::SPORK_2_INSTANTSEND_ENABLED;

    fn message(signer: u8, value: i64, time_signed: i64) -> SporkMessage {
        SporkMessage {
            spork_id: SPORK_2_INSTANTSEND_ENABLED,
            value,
            time_signed,
            signer: [signer; 32],
            signature: Vec::new(),
        }
    }

    #[test]
    fn test_tally_value() {
        assert_eq!(tally_value([].into_iter(), 3, 7), 7);
        assert_eq!(tally_value([1, 1].into_iter(), 3, 7), 7);
        assert_eq!(tally_value([1, 1, 1].into_iter(), 3, 7), 1);
        assert_eq!(tally_value([1, 1, 1, 2, 2].into_iter(), 3, 7), 1);
        // Equal support for two values never picks either.
        assert_eq!(tally_value([1, 1, 2, 2].into_iter(), 2, 7), 7);
        assert_eq!(tally_value([5].into_iter(), 0, 7), 5);
    }

    #[test]
    fn test_older_message_never_overwrites() {
        let mut tally = SporkTally::new();
        assert_eq!(tally.record(message(1, 10, 100)), RecordOutcome::Stored);
        assert_eq!(tally.record(message(1, 20, 99)), RecordOutcome::Stale);
        assert_eq!(tally.record(message(1, 20, 100)), RecordOutcome::Stale);
        assert_eq!(tally.latest(SPORK_2_INSTANTSEND_ENABLED, &[1u8; 32]).map(|m| m.value), Some(10));
        assert_eq!(tally.record(message(1, 30, 101)), RecordOutcome::Stored);
        assert_eq!(tally.len(), 1);
    }

    #[test]
    fn test_retain_and_recompute() {
        let mut tally = SporkTally::new();
        for signer in 1..=3 {
            tally.record(message(signer, 1, 100));
        }
        assert_eq!(tally.recompute(SPORK_2_INSTANTSEND_ENABLED, 3), 1);
        assert_eq!(tally.retain(|m| m.signer != [3u8; 32]), 1);
        assert_eq!(tally.recompute(SPORK_2_INSTANTSEND_ENABLED, 3), SPORK_DEFAULT_OFF);
        assert_eq!(tally.current_value(SPORK_2_INSTANTSEND_ENABLED), SPORK_DEFAULT_OFF);
    }
}
