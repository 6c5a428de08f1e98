//! Sliding window of recent fingerprints.

use crate::fingerprint::Fingerprint;
use std::collections::VecDeque;

/// Number of fingerprints kept for change detection.
pub const HISTORY_CAPACITY: usize = 2;

/// FIFO window holding the last two fingerprints.
///
/// Pushing into a full window evicts the oldest entry.
#[derive(Debug, Clone, Default)]
pub struct FingerprintHistory {
    entries: VecDeque<Fingerprint>,
}

impl FingerprintHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Appends a fingerprint, returning the evicted one if the window was full.
    pub fn push(&mut self, fingerprint: Fingerprint) -> Option<Fingerprint> {
        let evicted = if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(fingerprint);
        evicted
    }

    /// The older and newer fingerprint, once the window is full.
    pub fn pair(&self) -> Option<(&Fingerprint, &Fingerprint)> {
        match (self.entries.front(), self.entries.back()) {
            (Some(older), Some(newer)) if self.is_full() => Some((older, newer)),
            _ => None,
        }
    }

    /// The older entry.
    pub fn oldest(&self) -> Option<&Fingerprint> {
        self.entries.front()
    }

    /// The most recently pushed entry.
    pub fn newest(&self) -> Option<&Fingerprint> {
        self.entries.back()
    }

    /// Number of entries held, at most two.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been pushed since the last clear.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a pair is available for comparison.
    pub fn is_full(&self) -> bool {
        self.entries.len() == HISTORY_CAPACITY
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.entries.iter()
    }

    /// Drops all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
