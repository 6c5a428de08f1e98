//! Metrics collection and registry.

use crate::detection::{DetectionMetrics, RecorderState};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of detector and recorder state for a metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Recorder state code (0 idle, 1 preview, 2 recording).
    pub recorder_state: i64,
    /// Fingerprints observed.
    pub total_frames: u64,
    /// Comparisons performed.
    pub comparisons: u64,
    /// Comparisons that reported a change.
    pub changes_detected: u64,
    /// Unchanged comparisons since the last change.
    pub consecutive_unchanged: u64,
    /// Matching cells of the latest comparison.
    pub last_matching_cells: Option<u32>,
    /// Dark cells of the newest fingerprint.
    pub last_dark_cells: Option<u32>,
}

impl MetricsSnapshot {
    /// Builds a snapshot from detector counters and the recorder state.
    pub fn from_components(
        detection: &DetectionMetrics,
        state: RecorderState,
        last_dark_cells: Option<u32>,
    ) -> Self {
        Self {
            recorder_state: state.code(),
            total_frames: detection.total_frames,
            comparisons: detection.comparisons,
            changes_detected: detection.changes_detected,
            consecutive_unchanged: detection.consecutive_unchanged,
            last_matching_cells: detection.last_comparison.map(|c| c.matching),
            last_dark_cells,
        }
    }

    /// Same counters, reported under a different recorder state.
    pub fn with_state(mut self, state: RecorderState) -> Self {
        self.recorder_state = state.code();
        self
    }
}

/// Prometheus metrics registry for change detection.
pub struct MetricsRegistry {
    registry: Registry,

    recorder_state: IntGauge,

    frames_total: IntCounter,
    comparisons_total: IntCounter,
    changes_total: IntCounter,
    consecutive_unchanged: IntGauge,

    last_matching_cells: IntGauge,
    last_dark_cells: IntGauge,
}

impl MetricsRegistry {
    /// Creates a registry with every metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let recorder_state = IntGauge::new(
            "frame_fingerprint_recorder_state",
            "Recorder state (0=idle, 1=preview, 2=recording)",
        )?;
        let frames_total = IntCounter::new(
            "frame_fingerprint_frames_total",
            "Total number of frames fingerprinted",
        )?;
        let comparisons_total = IntCounter::new(
            "frame_fingerprint_comparisons_total",
            "Total number of fingerprint comparisons",
        )?;
        let changes_total = IntCounter::new(
            "frame_fingerprint_changes_total",
            "Total number of frame changes detected",
        )?;
        let consecutive_unchanged = IntGauge::new(
            "frame_fingerprint_consecutive_unchanged",
            "Unchanged comparisons since the last change",
        )?;
        let last_matching_cells = IntGauge::new(
            "frame_fingerprint_last_matching_cells",
            "Matching cells (of 256) in the latest comparison",
        )?;
        let last_dark_cells = IntGauge::new(
            "frame_fingerprint_last_dark_cells",
            "Dark cells (of 256) in the newest fingerprint",
        )?;

        registry.register(Box::new(recorder_state.clone()))?;
        registry.register(Box::new(frames_total.clone()))?;
        registry.register(Box::new(comparisons_total.clone()))?;
        registry.register(Box::new(changes_total.clone()))?;
        registry.register(Box::new(consecutive_unchanged.clone()))?;
        registry.register(Box::new(last_matching_cells.clone()))?;
        registry.register(Box::new(last_dark_cells.clone()))?;

        Ok(Self {
            registry,
            recorder_state,
            frames_total,
            comparisons_total,
            changes_total,
            consecutive_unchanged,
            last_matching_cells,
            last_dark_cells,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.recorder_state.set(snapshot.recorder_state);
        self.consecutive_unchanged
            .set(snapshot.consecutive_unchanged as i64);

        // Counters only move forward by the difference
        advance(&self.frames_total, snapshot.total_frames);
        advance(&self.comparisons_total, snapshot.comparisons);
        advance(&self.changes_total, snapshot.changes_detected);

        if let Some(matching) = snapshot.last_matching_cells {
            self.last_matching_cells.set(matching as i64);
        }
        if let Some(dark) = snapshot.last_dark_cells {
            self.last_dark_cells.set(dark as i64);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Comparison;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let detection = DetectionMetrics {
            total_frames: 10,
            comparisons: 9,
            changes_detected: 2,
            consecutive_unchanged: 4,
            last_comparison: Some(Comparison {
                matching: 254,
                differing: 2,
                is_same: true,
            }),
        };
        let snapshot =
            MetricsSnapshot::from_components(&detection, RecorderState::Recording, Some(120));
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("frame_fingerprint_recorder_state 2"));
        assert!(output.contains("frame_fingerprint_frames_total 10"));
        assert!(output.contains("frame_fingerprint_changes_total 2"));
        assert!(output.contains("frame_fingerprint_last_matching_cells 254"));
        assert!(output.contains("frame_fingerprint_last_dark_cells 120"));
    }

    #[test]
    fn test_recorder_state_returns_to_idle() {
        let registry = MetricsRegistry::new().unwrap();
        let detection = DetectionMetrics {
            total_frames: 3,
            comparisons: 2,
            changes_detected: 1,
            ..DetectionMetrics::default()
        };
        let recording =
            MetricsSnapshot::from_components(&detection, RecorderState::Recording, Some(40));
        registry.update(&recording);
        assert!(registry.encode().unwrap().contains("frame_fingerprint_recorder_state 2"));

        registry.update(&recording.with_state(RecorderState::Idle));
        let output = registry.encode().unwrap();
        assert!(output.contains("frame_fingerprint_recorder_state 0"));
        assert!(output.contains("frame_fingerprint_frames_total 3"));
        assert!(output.contains("frame_fingerprint_changes_total 1"));
    }

    #[test]
    fn test_counters_never_go_backwards() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            total_frames: 5,
            ..Default::default()
        });
        // A detector reset reports a smaller total
        registry.update(&MetricsSnapshot {
            total_frames: 1,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("frame_fingerprint_frames_total 5"));
    }
}
