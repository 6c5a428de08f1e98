//! Prometheus metrics for change monitoring.
//!
//! # Metrics Exposed
//!
//! - `frame_fingerprint_recorder_state` - 0 idle, 1 preview, 2 recording
//! - `frame_fingerprint_frames_total` - Frames fingerprinted
//! - `frame_fingerprint_comparisons_total` - Fingerprint comparisons
//! - `frame_fingerprint_changes_total` - Changes detected
//! - `frame_fingerprint_consecutive_unchanged` - Unchanged comparisons since the last change
//! - `frame_fingerprint_last_matching_cells` - Matching cells in the latest comparison
//! - `frame_fingerprint_last_dark_cells` - Dark cells in the newest fingerprint
//!
//! The HTTP exporter needs the `metrics` feature.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
