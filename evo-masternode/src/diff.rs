//! Per-block list diffs and the bounded log that makes reorgs reversible.

use std::collections::VecDeque;

use evo_types::{MasternodeEntry, OutPoint};

/// One change to the masternode list. Every variant carries full entry
/// values so that [`ListMutation::inverse`] is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMutation {
    Added(MasternodeEntry),
    Updated {
        previous: MasternodeEntry,
        current: MasternodeEntry,
    },
    Removed(MasternodeEntry),
}

impl ListMutation {
    pub fn collateral_outpoint(&self) -> &OutPoint {
        match self {
            ListMutation::Added(entry) | ListMutation::Removed(entry) => &entry.collateral_outpoint,
            ListMutation::Updated { current, .. } => &current.collateral_outpoint,
        }
    }

    /// The entry as it stands after this mutation, if it still exists.
    pub fn resulting_entry(&self) -> Option<&MasternodeEntry> {
        match self {
            ListMutation::Added(entry) => Some(entry),
            ListMutation::Updated { current, .. } => Some(current),
            ListMutation::Removed(_) => None,
        }
    }

    pub fn inverse(&self) -> ListMutation {
        match self {
            ListMutation::Added(entry) => ListMutation::Removed(entry.clone()),
            ListMutation::Removed(entry) => ListMutation::Added(entry.clone()),
            ListMutation::Updated { previous, current } => ListMutation::Updated {
                previous: current.clone(),
                current: previous.clone(),
            },
        }
    }
}

/// Everything one block did to the list, in transaction order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasternodeListDiff {
    pub height: u32,
    /// Tip height before the block was applied; `None` for the first block.
    pub previous_height: Option<u32>,
    pub mutations: Vec<ListMutation>,
}

impl MasternodeListDiff {
    pub fn added(&self) -> impl Iterator<Item = &MasternodeEntry> {
        self.mutations.iter().filter_map(|m| match m {
            ListMutation::Added(entry) => Some(entry),
            _ => None,
        })
    }

    /// `(previous, current, changed field names)` for every update.
    pub fn updated(&self) -> impl Iterator<Item = (&MasternodeEntry, &MasternodeEntry, Vec<&'static str>)> {
        self.mutations.iter().filter_map(|m| match m {
            ListMutation::Updated { previous, current } => {
                Some((previous, current, previous.state.changed_fields(&current.state)))
            }
            _ => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = &MasternodeEntry> {
        self.mutations.iter().filter_map(|m| match m {
            ListMutation::Removed(entry) => Some(entry),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Height-indexed diffs, oldest first, capped at `capacity` blocks.
#[derive(Debug, Clone)]
pub struct DiffLog {
    diffs: VecDeque<MasternodeListDiff>,
    capacity: usize,
}

impl DiffLog {
    pub fn new(capacity: usize) -> Self {
        Self { diffs: VecDeque::with_capacity(capacity.min(1024)), capacity }
    }

    /// Appends the tip diff and prunes anything older than the retention window.
    pub fn push(&mut self, diff: MasternodeListDiff) {
        self.diffs.push_back(diff);
        while self.diffs.len() > self.capacity {
            self.diffs.pop_front();
        }
    }

    /// Removes and returns the newest diff, only if it was recorded for `height`.
    pub fn pop_tip(&mut self, height: u32) -> Option<MasternodeListDiff> {
        match self.diffs.back() {
            Some(diff) if diff.height == height => self.diffs.pop_back(),
            _ => None,
        }
    }

    pub fn get(&self, height: u32) -> Option<&MasternodeListDiff> {
        self.diffs.iter().rev().find(|diff| diff.height == height)
    }

    /// Newest first.
    pub fn iter_rev(&self) -> impl Iterator<Item = &MasternodeListDiff> {
        self.diffs.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }
}
