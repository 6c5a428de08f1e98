//! Frame source abstraction.
//!
//! The change monitor only needs "give me the next frame". This trait
//! lets the monitor run against a real webcam, a folder of stills, or
//! generated frames in tests.

use super::{CaptureConfig, Frame, PixelFormat};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use thiserror::Error;

/// Errors that can occur while producing frames.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No device or input matched.
    #[error("capture device not found: {0}")]
    DeviceNotFound(String),
    /// The source exists but could not be opened.
    #[error("failed to open frame source: {0}")]
    OpenFailed(String),
    /// The requested capture settings were rejected.
    #[error("failed to configure frame source: {0}")]
    ConfigFailed(String),
    /// Grabbing or decoding a frame failed.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// `next_frame` was called before `open`.
    #[error("frame source not initialized")]
    NotInitialized,
}

/// Trait for anything that produces frames on demand.
pub trait FrameSource {
    /// Opens and initializes the source with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CaptureError>;

    /// Produces the next frame.
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Checks if the source is currently open.
    fn is_open(&self) -> bool;

    /// Closes the source and releases resources.
    fn close(&mut self);

    /// Short name used in logs.
    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CaptureError> {
        (**self).open(config)
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).next_frame()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Generates a diagonal gradient scene with optional seeded noise.
///
/// With `change_every = Some(n)` the scene inverts every `n` frames,
/// which is what a test needs to see a "frame changed" verdict.
#[derive(Debug)]
pub struct SyntheticSource {
    config: Option<CaptureConfig>,
    sequence: u64,
    seed: u64,
    rng: ChaCha8Rng,
    noise: u8,
    change_every: Option<u64>,
}

impl SyntheticSource {
    /// Creates a noiseless source with a fixed seed.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates a source whose noise is reproducible from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            config: None,
            sequence: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise: 0,
            change_every: None,
        }
    }

    /// Adds up to `amplitude` levels of noise per pixel, in either direction.
    pub fn noise(mut self, amplitude: u8) -> Self {
        self.noise = amplitude;
        self
    }

    /// Inverts the scene every `frames` frames (0 disables).
    pub fn change_every(mut self, frames: u64) -> Self {
        self.change_every = (frames > 0).then_some(frames);
        self
    }

    fn pixel_value(&mut self, x: u32, y: u32, width: u32, height: u32, inverted: bool) -> u8 {
        let span = (width + height).saturating_sub(2).max(1) as u64;
        let base = ((x + y) as u64 * 255 / span) as u8;
        let base = if inverted { 255 - base } else { base };

        if self.noise == 0 {
            return base;
        }
        let range = 2 * self.noise as u32 + 1;
        let offset = (self.rng.next_u32() % range) as i32 - self.noise as i32;
        (base as i32 + offset).clamp(0, 255) as u8
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CaptureError> {
        config
            .validate()
            .map_err(|e| CaptureError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        tracing::info!("SyntheticSource opened with config: {:?}", config);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let config = self.config.clone().ok_or(CaptureError::NotInitialized)?;
        let (width, height) = (config.width, config.height);

        let inverted = self
            .change_every
            .map(|n| (self.sequence / n) % 2 == 1)
            .unwrap_or(false);

        let format = if config.grayscale {
            PixelFormat::Gray8
        } else {
            PixelFormat::Rgb8
        };
        let mut pixels = Vec::with_capacity(
            (width as usize) * (height as usize) * format.bytes_per_pixel(),
        );
        for y in 0..height {
            for x in 0..width {
                let v = self.pixel_value(x, y, width, height, inverted);
                match format {
                    PixelFormat::Gray8 => pixels.push(v),
                    PixelFormat::Rgb8 => pixels.extend_from_slice(&[v, v, v]),
                }
            }
        }

        self.sequence += 1;
        Ok(Frame::with_format(pixels, width, height, format, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("SyntheticSource closed");
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_source_lifecycle() {
        let mut source = SyntheticSource::new();
        let config = CaptureConfig::with_dimensions(32, 24);

        assert!(!source.is_open());

        source.open(&config).unwrap();
        assert!(source.is_open());

        let frame = source.next_frame().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.format(), PixelFormat::Rgb8);

        let frame2 = source.next_frame().unwrap();
        assert_eq!(frame2.sequence(), 2);

        source.close();
        assert!(!source.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut source = SyntheticSource::new();
        assert!(matches!(
            source.next_frame(),
            Err(CaptureError::NotInitialized)
        ));
    }

    #[test]
    fn test_grayscale_frames() {
        let mut source = SyntheticSource::new();
        let mut config = CaptureConfig::with_dimensions(16, 16);
        config.grayscale = true;
        source.open(&config).unwrap();

        let frame = source.next_frame().unwrap();
        assert_eq!(frame.format(), PixelFormat::Gray8);
        assert_eq!(frame.pixels().len(), 256);
        assert_eq!(frame.pixels()[0], 0);
        assert_eq!(frame.pixels()[255], 255);
    }

    #[test]
    fn test_scene_inverts_on_schedule() {
        let mut source = SyntheticSource::new().change_every(2);
        let mut config = CaptureConfig::with_dimensions(8, 8);
        config.grayscale = true;
        source.open(&config).unwrap();

        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        let third = source.next_frame().unwrap();

        assert_eq!(first.pixels(), second.pixels());
        assert_eq!(third.pixels()[0], 255 - first.pixels()[0]);
    }

    #[test]
    fn test_noise_is_reproducible() {
        let config = CaptureConfig::with_dimensions(16, 16);

        let mut a = SyntheticSource::with_seed(42).noise(10);
        let mut b = SyntheticSource::with_seed(42).noise(10);
        a.open(&config).unwrap();
        b.open(&config).unwrap();

        assert_eq!(a.next_frame().unwrap().pixels(), b.next_frame().unwrap().pixels());
    }
}
