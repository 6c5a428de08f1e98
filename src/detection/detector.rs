//! Change detection over consecutive fingerprints.

use super::history::FingerprintHistory;
use crate::capture::DetectorConfig;
use crate::fingerprint::{Comparator, Comparison, Fingerprint};

/// Result of observing one fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not enough history yet to compare.
    Priming,
    /// The newest frame matches the previous one.
    Unchanged(Comparison),
    /// The newest frame differs from the previous one.
    Changed(Comparison),
}

impl Verdict {
    /// Whether the newest frame differs from the previous one.
    pub fn is_changed(&self) -> bool {
        matches!(self, Verdict::Changed(_))
    }

    /// The comparison behind the verdict, if one was made.
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            Verdict::Priming => None,
            Verdict::Unchanged(c) | Verdict::Changed(c) => Some(c),
        }
    }
}

/// Running counters kept by the detector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionMetrics {
    /// Fingerprints observed.
    pub total_frames: u64,
    /// Comparisons performed (frames observed with a full history).
    pub comparisons: u64,
    /// Comparisons that reported a change.
    pub changes_detected: u64,
    /// Unchanged comparisons since the last change.
    pub consecutive_unchanged: u64,
    /// Most recent comparison, if any.
    pub last_comparison: Option<Comparison>,
}

/// Pushes fingerprints into a two-entry history and compares the pair.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    comparator: Comparator,
    history: FingerprintHistory,
    metrics: DetectionMetrics,
}

impl ChangeDetector {
    /// Creates a detector with an empty history.
    pub fn new(comparator: Comparator) -> Self {
        Self {
            comparator,
            history: FingerprintHistory::new(),
            metrics: DetectionMetrics::default(),
        }
    }

    /// Creates a detector using the configured matching threshold.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(Comparator::from_config(config))
    }

    /// Records a fingerprint and compares it with the previous one.
    pub fn observe(&mut self, fingerprint: Fingerprint) -> Verdict {
        self.history.push(fingerprint);
        self.metrics.total_frames += 1;

        let Some((older, newer)) = self.history.pair() else {
            tracing::trace!("Priming history");
            return Verdict::Priming;
        };

        let comparison = self.comparator.compare(older, newer);
        self.metrics.comparisons += 1;
        self.metrics.last_comparison = Some(comparison);

        if comparison.is_same {
            self.metrics.consecutive_unchanged += 1;
            tracing::trace!(
                matching = comparison.matching,
                "Frame unchanged"
            );
            Verdict::Unchanged(comparison)
        } else {
            self.metrics.changes_detected += 1;
            self.metrics.consecutive_unchanged = 0;
            tracing::warn!(
                matching = comparison.matching,
                differing = comparison.differing,
                threshold = self.comparator.min_matching(),
                "Frame changed"
            );
            Verdict::Changed(comparison)
        }
    }

    /// Fingerprints currently held for comparison.
    pub fn history(&self) -> &FingerprintHistory {
        &self.history
    }

    /// Counters since creation or the last reset.
    pub fn metrics(&self) -> &DetectionMetrics {
        &self.metrics
    }

    /// The comparator in use.
    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// Forgets the history but keeps the counters.
    pub fn clear_history(&mut self) {
        self.history.clear();
        tracing::debug!("Fingerprint history cleared");
    }

    /// Resets history and counters.
    pub fn reset(&mut self) {
        self.history.clear();
        self.metrics = DetectionMetrics::default();
        tracing::info!("Change detector reset");
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(Comparator::default())
    }
}
