//! Frame Fingerprint Library
//!
//! Detects whether successive camera frames differ by reducing each frame
//! to a 16x16 brightness fingerprint and comparing fingerprints with a
//! small noise tolerance.
//!
//! # Architecture
//!
//! ```text
//! capture → fingerprint → detection
//!    ↑                        ↓
//!    └── recorder state ── monitor loop (metrics)
//! ```
//!
//! - **capture**: frame sources (synthetic, image directory, webcam), config, snapshots
//! - **fingerprint**: 16x16 downsample, brightness threshold, comparison
//! - **detection**: two-entry history, change detector, recorder state, monitor
//! - **metrics**: Prometheus registry and optional HTTP exporter
//!
//! # Example
//!
//! ```no_run
//! use frame_fingerprint::{
//!     capture::{CaptureConfig, FrameSource, SyntheticSource},
//!     detection::ChangeDetector,
//!     fingerprint::Extractor,
//! };
//!
//! let mut source = SyntheticSource::new().change_every(5);
//! source.open(&CaptureConfig::default()).unwrap();
//!
//! let extractor = Extractor::new();
//! let mut detector = ChangeDetector::default();
//!
//! for _ in 0..10 {
//!     let frame = source.next_frame().unwrap();
//!     let fingerprint = extractor.extract_frame(&frame).unwrap();
//!     if detector.observe(fingerprint).is_changed() {
//!         println!("frame {} changed", frame.sequence());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod detection;
pub mod fingerprint;
pub mod metrics;

// Re-export commonly used types at crate root
pub use capture::{CaptureConfig, FileConfig, Frame, FrameSource, SyntheticSource};
pub use detection::{ChangeDetector, ChangeMonitor, RecorderState, RecorderStateMachine, Verdict};
pub use fingerprint::{Comparator, Extractor, Fingerprint, FingerprintError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
