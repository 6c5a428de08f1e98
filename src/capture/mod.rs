//! Frame sources, frame handling and configuration.
//!
//! A frame source is anything that can hand the change monitor its next
//! image: a webcam, a folder of stills, or generated test frames.

#[cfg(feature = "camera")]
mod camera;
mod config;
mod directory;
mod frame;
mod snapshot;
mod source;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use config::{
    CaptureConfig, ConfigError, DetectorConfig, FileConfig, MonitorConfig, OutputConfig,
};
pub use directory::ImageDirSource;
pub use frame::{Frame, PixelFormat};
pub use snapshot::{capture_file_name, SnapshotError, SnapshotWriter};
pub use source::{CaptureError, FrameSource, SyntheticSource};
