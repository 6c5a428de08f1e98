//! Change detection between consecutive frames.
//!
//! Fingerprints go into a two-entry history; once it is full the older
//! and newer entry are compared. The monitor drives this on a timer
//! while the recorder state machine says we are recording.

mod detector;
mod history;
mod monitor;
mod state;

pub use detector::{ChangeDetector, DetectionMetrics, Verdict};
pub use history::{FingerprintHistory, HISTORY_CAPACITY};
pub use monitor::{spawn_monitor, ChangeMonitor, MonitorError, MonitorSummary, TickReport};
pub use state::{RecorderState, RecorderStateMachine, StateError, StateEvent};
