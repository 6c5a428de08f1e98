//! Downsampling images into fingerprints.

use super::{Fingerprint, FingerprintError, GRID_SIZE};
use crate::capture::{DetectorConfig, Frame};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgb};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// Resampling filter used to shrink an image to the 16x16 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    /// Catmull-Rom cubic.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with window 3.
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// HSL lightness of a pixel in `[0, 1]`: the mean of its largest and
/// smallest channel.
#[inline]
pub fn brightness(pixel: &Rgb<u8>) -> f32 {
    let [r, g, b] = pixel.0;
    let max = r.max(g).max(b) as f32;
    let min = r.min(g).min(b) as f32;
    (max + min) / 510.0
}

/// Turns images into fingerprints.
///
/// The image is resized to 16x16 and each cell is flagged dark when its
/// brightness is below the threshold. The extractor holds no state, so
/// one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Extractor {
    filter: ResizeFilter,
    brightness_threshold: f32,
}

impl Extractor {
    /// Bilinear downsampling with a 0.5 brightness threshold.
    pub fn new() -> Self {
        Self {
            filter: ResizeFilter::default(),
            brightness_threshold: 0.5,
        }
    }

    /// Creates an extractor with the configured filter and threshold.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            filter: config.resize_filter,
            brightness_threshold: config.brightness_threshold,
        }
    }

    /// Sets the resampling filter.
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the brightness below which a cell is dark.
    pub fn with_threshold(mut self, brightness_threshold: f32) -> Self {
        self.brightness_threshold = brightness_threshold;
        self
    }

    /// Resampling filter in use.
    pub fn filter(&self) -> ResizeFilter {
        self.filter
    }

    /// Brightness cutoff in use.
    pub fn brightness_threshold(&self) -> f32 {
        self.brightness_threshold
    }

    /// Fingerprints an in-memory image of any size and colour type.
    pub fn extract(&self, image: &DynamicImage) -> Result<Fingerprint, FingerprintError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(FingerprintError::EmptyImage { width, height });
        }

        let grid = image
            .resize_exact(GRID_SIZE, GRID_SIZE, self.filter.into())
            .to_rgb8();

        let mut cells = Vec::with_capacity((GRID_SIZE * GRID_SIZE) as usize);
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                cells.push(brightness(grid.get_pixel(col, row)) < self.brightness_threshold);
            }
        }

        let fingerprint = Fingerprint::from_cells(cells);
        tracing::trace!(
            width,
            height,
            dark_cells = fingerprint.dark_cells(),
            "Extracted fingerprint"
        );
        Ok(fingerprint)
    }

    /// Fingerprints a captured frame.
    pub fn extract_frame(&self, frame: &Frame) -> Result<Fingerprint, FingerprintError> {
        let image = frame.to_image().ok_or(FingerprintError::InvalidFrame {
            width: frame.width(),
            height: frame.height(),
            bytes: frame.pixels().len(),
        })?;
        self.extract(&image)
    }

    /// Decodes an encoded image (format guessed from content) and fingerprints it.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<Fingerprint, FingerprintError> {
        let image = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;
        self.extract(&image)
    }

    /// Loads an image file and fingerprints it.
    pub fn extract_path(&self, path: impl AsRef<Path>) -> Result<Fingerprint, FingerprintError> {
        let path = path.as_ref();
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        tracing::debug!(path = %path.display(), "Decoded image file");
        self.extract(&image)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
