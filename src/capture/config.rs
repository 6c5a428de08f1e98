//! Capture and detection configuration.
//!
//! Every section has defaults, so an empty TOML file is a valid
//! configuration.

use crate::fingerprint::{ResizeFilter, FINGERPRINT_LEN, SAME_IMAGE_MIN_MATCHING};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for frame capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index.
    pub device_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Capture single-channel frames instead of RGB.
    pub grayscale: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            grayscale: false,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate outside 1..=120.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// Brightness threshold outside (0, 1].
    #[error("invalid brightness threshold {0} (must be in (0, 1])")]
    InvalidBrightnessThreshold(f32),
    /// More matching cells required than a fingerprint has.
    #[error("invalid matching-cell threshold {0} (must be at most 256)")]
    InvalidMatchingThreshold(u32),
    /// Monitor interval of zero.
    #[error("monitor interval must be at least 1 ms")]
    InvalidInterval,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Frame source settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Extraction and comparison settings.
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Sampling loop settings.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Reporting and snapshot settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Fingerprint extraction and comparison settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Cells darker than this brightness (0.0 to 1.0) are set.
    pub brightness_threshold: f32,
    /// Minimum equal cells (of 256) for two frames to count as the same.
    pub min_matching_cells: u32,
    /// Filter used when downsampling to the 16x16 grid.
    pub resize_filter: ResizeFilter,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: 0.5,
            min_matching_cells: SAME_IMAGE_MIN_MATCHING,
            resize_filter: ResizeFilter::default(),
        }
    }
}

impl DetectorConfig {
    /// Checks the brightness and matching thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.brightness_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(ConfigError::InvalidBrightnessThreshold(t));
        }
        if self.min_matching_cells as usize > FINGERPRINT_LEN {
            return Err(ConfigError::InvalidMatchingThreshold(
                self.min_matching_cells,
            ));
        }
        Ok(())
    }
}

/// Change monitor timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay between two captured frames, in milliseconds.
    pub interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_ms: 3000 }
    }
}

impl MonitorConfig {
    /// Rejects a zero interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(())
    }

    /// Time between samples.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Run until interrupted (true) or stop after `frame_count` ticks.
    pub continuous: bool,
    /// Number of monitor ticks if not continuous.
    pub frame_count: u32,
    /// Directory for JPEG snapshots of changed frames (none to disable).
    pub snapshot_dir: Option<PathBuf>,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            frame_count: 20,
            snapshot_dir: None,
            metrics_port: 9090,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.detector.validate()?;
        self.monitor.validate()
    }
}
