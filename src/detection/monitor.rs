//! Periodic change monitoring.
//!
//! Every interval the monitor pulls a frame, fingerprints it and feeds
//! the change detector. It listens to recorder state events and only
//! samples while recording.

use super::detector::{ChangeDetector, DetectionMetrics, Verdict};
use super::state::{RecorderState, StateEvent};
use crate::capture::{CaptureError, FileConfig, FrameSource, SnapshotWriter};
use crate::fingerprint::{Extractor, FingerprintError};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest single wait, so a shutdown request is noticed promptly.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Errors that fail a single monitor tick.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The source could not deliver a frame.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// The frame could not be fingerprinted.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

/// What happened during one monitor tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Sequence number of the sampled frame.
    pub sequence: u64,
    /// Dark-cell count of each fingerprint in the history, oldest first.
    pub dark_cells: Vec<u32>,
    /// Detector verdict for this frame.
    pub verdict: Verdict,
    /// Snapshot written for a changed frame, if snapshots are enabled and
    /// the save succeeded.
    pub snapshot: Option<PathBuf>,
    /// Time spent capturing, fingerprinting and comparing.
    pub elapsed: Duration,
    /// Detector counters after this tick.
    pub metrics: DetectionMetrics,
}

impl TickReport {
    /// One-line summary, e.g. `[118 | 121] (12 ms.)`.
    pub fn status_line(&self) -> String {
        let counts: Vec<String> = self.dark_cells.iter().map(u32::to_string).collect();
        format!(
            "[{}] ({} ms.)",
            counts.join(" | "),
            self.elapsed.as_millis()
        )
    }
}

/// Totals returned when the monitor loop ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    /// Frames sampled.
    pub ticks: u64,
    /// Ticks that reported a change.
    pub changes: u64,
    /// Ticks that ended in an error.
    pub failed_ticks: u64,
}

/// Samples a frame source on a fixed interval while recording.
pub struct ChangeMonitor<S: FrameSource> {
    source: S,
    extractor: Extractor,
    detector: ChangeDetector,
    interval: Duration,
    snapshots: Option<SnapshotWriter>,
    tick_limit: Option<u64>,
    active: bool,
}

impl<S: FrameSource> ChangeMonitor<S> {
    /// Creates an inactive monitor; it starts sampling on the first `Recording` event.
    pub fn new(source: S, extractor: Extractor, detector: ChangeDetector, interval: Duration) -> Self {
        Self {
            source,
            extractor,
            detector,
            interval,
            snapshots: None,
            tick_limit: None,
            active: false,
        }
    }

    /// Builds a monitor from the detector and monitor sections of a config.
    pub fn from_config(source: S, config: &FileConfig) -> Self {
        Self::new(
            source,
            Extractor::from_config(&config.detector),
            ChangeDetector::from_config(&config.detector),
            config.monitor.interval(),
        )
    }

    /// Saves a JPEG of every frame that differs from its predecessor.
    pub fn with_snapshots(mut self, writer: SnapshotWriter) -> Self {
        self.snapshots = Some(writer);
        self
    }

    /// Stops the loop after `ticks` samples.
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.tick_limit = Some(ticks);
        self
    }

    /// Whether frames are currently being sampled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The detector and its counters.
    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// The frame source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consumes the monitor, returning the source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Applies a recorder transition.
    ///
    /// Leaving `Recording` clears the history so the next session does
    /// not compare against a stale frame.
    pub fn handle_event(&mut self, event: &StateEvent) {
        let recording = event.to == RecorderState::Recording;
        if self.active && !recording {
            self.detector.clear_history();
        }
        if self.active != recording {
            tracing::debug!(active = recording, "Change monitor toggled");
        }
        self.active = recording;
    }

    /// Samples one frame and runs it through the detector.
    pub fn tick(&mut self) -> Result<TickReport, MonitorError> {
        let started = Instant::now();

        let frame = self.source.next_frame()?;
        let fingerprint = self.extractor.extract_frame(&frame)?;
        let verdict = self.detector.observe(fingerprint);

        // a failed save must not drop the verdict the detector already counted
        let snapshot = match (&self.snapshots, verdict.is_changed()) {
            (Some(writer), true) => match writer.save(&frame) {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "Saved snapshot of changed frame");
                    Some(path)
                }
                Err(e) => {
                    tracing::warn!(sequence = frame.sequence(), "Failed to save snapshot: {}", e);
                    None
                }
            },
            _ => None,
        };

        let report = TickReport {
            sequence: frame.sequence(),
            dark_cells: self
                .detector
                .history()
                .iter()
                .map(|fp| fp.dark_cells())
                .collect(),
            verdict,
            snapshot,
            elapsed: started.elapsed(),
            metrics: self.detector.metrics().clone(),
        };

        tracing::debug!(
            sequence = report.sequence,
            status = %report.status_line(),
            "Monitor tick"
        );
        Ok(report)
    }

    /// Runs until shutdown, the tick limit, or the state channel closing.
    ///
    /// A failed tick is logged and counted; the loop keeps going.
    pub fn run<F>(
        &mut self,
        events: &Receiver<StateEvent>,
        shutdown: &AtomicBool,
        mut on_tick: F,
    ) -> MonitorSummary
    where
        F: FnMut(&TickReport),
    {
        let mut summary = MonitorSummary::default();
        tracing::info!(
            source = self.source.name(),
            interval_ms = self.interval.as_millis() as u64,
            "Change monitor started"
        );

        loop {
            if !self.wait_interval(events, shutdown) {
                break;
            }
            if !self.active {
                continue;
            }

            summary.ticks += 1;
            match self.tick() {
                Ok(report) => {
                    if report.verdict.is_changed() {
                        summary.changes += 1;
                    }
                    on_tick(&report);
                }
                Err(e) => {
                    summary.failed_ticks += 1;
                    tracing::warn!("Monitor tick failed: {}", e);
                }
            }

            if self.tick_limit.is_some_and(|limit| summary.ticks >= limit) {
                tracing::info!(ticks = summary.ticks, "Tick limit reached");
                break;
            }
        }

        tracing::info!(
            ticks = summary.ticks,
            changes = summary.changes,
            failed = summary.failed_ticks,
            "Change monitor stopped"
        );
        summary
    }

    /// Sleeps one interval while applying state events.
    ///
    /// Returns `false` when the loop should end.
    fn wait_interval(&mut self, events: &Receiver<StateEvent>, shutdown: &AtomicBool) -> bool {
        let deadline = Instant::now() + self.interval;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            match events.recv_timeout((deadline - now).min(POLL_SLICE)) {
                Ok(event) => self.handle_event(&event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Recorder state channel closed");
                    return false;
                }
            }
        }
    }
}

/// Runs a change monitor on a background thread.
///
/// The source is built and opened on the worker, so it does not need
/// to be `Send`.
pub fn spawn_monitor<S, M, F>(
    make_source: M,
    config: FileConfig,
    snapshots: Option<SnapshotWriter>,
    tick_limit: Option<u64>,
    events: Receiver<StateEvent>,
    shutdown: Arc<AtomicBool>,
    on_tick: F,
) -> std::io::Result<JoinHandle<Result<MonitorSummary, MonitorError>>>
where
    S: FrameSource + 'static,
    M: FnOnce() -> S + Send + 'static,
    F: FnMut(&TickReport) + Send + 'static,
{
    std::thread::Builder::new()
        .name("change-monitor".into())
        .spawn(move || {
            let mut source = make_source();
            source.open(&config.capture)?;

            let mut monitor = ChangeMonitor::from_config(source, &config);
            if let Some(writer) = snapshots {
                monitor = monitor.with_snapshots(writer);
            }
            if let Some(limit) = tick_limit {
                monitor = monitor.with_tick_limit(limit);
            }

            let summary = monitor.run(&events, &shutdown, on_tick);
            monitor.into_source().close();
            Ok(summary)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureConfig, SyntheticSource};
    use crate::detection::RecorderStateMachine;

    fn opened_source(change_every: u64) -> SyntheticSource {
        let mut source = SyntheticSource::new().change_every(change_every);
        source.open(&CaptureConfig::with_dimensions(64, 48)).unwrap();
        source
    }

    fn monitor(source: SyntheticSource) -> ChangeMonitor<SyntheticSource> {
        ChangeMonitor::new(
            source,
            Extractor::new(),
            ChangeDetector::default(),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_tick_primes_then_compares() {
        let mut monitor = monitor(opened_source(0));

        let first = monitor.tick().unwrap();
        assert_eq!(first.verdict, Verdict::Priming);
        assert_eq!(first.dark_cells.len(), 1);

        let second = monitor.tick().unwrap();
        assert!(matches!(second.verdict, Verdict::Unchanged(_)));
        assert_eq!(second.dark_cells.len(), 2);
        assert_eq!(second.dark_cells[0], second.dark_cells[1]);
    }

    #[test]
    fn test_scene_change_detected() {
        // frames 1 and 2 normal, frame 3 inverted
        let mut monitor = monitor(opened_source(2));

        monitor.tick().unwrap();
        assert!(!monitor.tick().unwrap().verdict.is_changed());
        assert!(monitor.tick().unwrap().verdict.is_changed());
    }

    #[test]
    fn test_status_line_format() {
        let report = TickReport {
            sequence: 2,
            dark_cells: vec![118, 121],
            verdict: Verdict::Priming,
            snapshot: None,
            elapsed: Duration::from_millis(12),
            metrics: DetectionMetrics::default(),
        };
        assert_eq!(report.status_line(), "[118 | 121] (12 ms.)");
    }

    #[test]
    fn test_leaving_recording_clears_history() {
        let mut monitor = monitor(opened_source(0));
        let recording = StateEvent {
            from: RecorderState::PreviewOnly,
            to: RecorderState::Recording,
        };
        let stopped = StateEvent {
            from: RecorderState::Recording,
            to: RecorderState::PreviewOnly,
        };

        monitor.handle_event(&recording);
        assert!(monitor.is_active());
        monitor.tick().unwrap();
        monitor.tick().unwrap();
        assert!(monitor.detector().history().is_full());

        monitor.handle_event(&stopped);
        assert!(!monitor.is_active());
        assert!(monitor.detector().history().is_empty());
    }

    #[test]
    fn test_run_samples_only_while_recording() {
        let mut machine = RecorderStateMachine::new();
        let events = machine.subscribe();
        let shutdown = AtomicBool::new(false);

        machine.start_preview();
        machine.toggle_recording().unwrap();

        let mut monitor = monitor(opened_source(0)).with_tick_limit(3);
        let mut reports = Vec::new();
        let summary = monitor.run(&events, &shutdown, |r| reports.push(r.clone()));

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.changes, 0);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].verdict, Verdict::Priming);
    }

    #[test]
    fn test_run_stops_when_state_channel_closes() {
        let mut machine = RecorderStateMachine::new();
        let events = machine.subscribe();
        let shutdown = AtomicBool::new(false);
        machine.start_preview();
        drop(machine);

        let summary = monitor(opened_source(0)).run(&events, &shutdown, |_| {});
        assert_eq!(summary.ticks, 0);
    }

    #[test]
    fn test_run_honours_shutdown() {
        let mut machine = RecorderStateMachine::new();
        let events = machine.subscribe();
        let shutdown = AtomicBool::new(true);

        let summary = monitor(opened_source(0)).run(&events, &shutdown, |_| {});
        assert_eq!(summary, MonitorSummary::default());
        drop(machine);
    }

    #[test]
    fn test_snapshot_failure_keeps_change() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_dir = dir.path().join("changed");
        let writer = SnapshotWriter::new(&snapshot_dir).unwrap();
        std::fs::remove_dir_all(&snapshot_dir).unwrap();

        let mut machine = RecorderStateMachine::new();
        let events = machine.subscribe();
        let shutdown = AtomicBool::new(false);
        machine.start_preview();
        machine.toggle_recording().unwrap();

        let mut monitor = monitor(opened_source(1))
            .with_snapshots(writer)
            .with_tick_limit(2);
        let mut reports = Vec::new();
        let summary = monitor.run(&events, &shutdown, |r| reports.push(r.clone()));

        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.failed_ticks, 0);
        assert_eq!(summary.changes, 1);
        assert_eq!(reports.len(), 2);
        assert!(reports[1].verdict.is_changed());
        assert!(reports[1].snapshot.is_none());
        assert_eq!(monitor.detector().metrics().changes_detected, summary.changes);
    }

    #[test]
    fn test_failed_ticks_are_counted() {
        let mut machine = RecorderStateMachine::new();
        let events = machine.subscribe();
        let shutdown = AtomicBool::new(false);
        machine.start_preview();
        machine.toggle_recording().unwrap();

        // never opened
        let mut monitor = monitor(SyntheticSource::new()).with_tick_limit(2);
        let summary = monitor.run(&events, &shutdown, |_| {});

        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.failed_ticks, 2);
    }
}
