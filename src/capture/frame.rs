//! Frame type representing a captured image with metadata.

use image::{DynamicImage, GrayImage, RgbImage};
use std::time::Instant;

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel.
    Gray8,
    /// Three bytes per pixel, R then G then B.
    Rgb8,
}

impl PixelFormat {
    /// Bytes used by a single pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A single captured frame from a frame source.
///
/// Holds the raw pixel buffer plus the metadata the change monitor
/// reports alongside each fingerprint.
#[derive(Clone)]
pub struct Frame {
    /// Raw pixel data laid out according to `format`.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Buffer layout.
    format: PixelFormat,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a grayscale frame.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::with_format(pixels, width, height, PixelFormat::Gray8, sequence)
    }

    /// Creates an RGB frame.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::with_format(pixels, width, height, PixelFormat::Rgb8, sequence)
    }

    /// Creates a frame with an explicit pixel format.
    pub fn with_format(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Buffer layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions and format.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * self.format.bytes_per_pixel()
    }

    /// Copies the buffer into an `image` crate image.
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn to_image(&self) -> Option<DynamicImage> {
        if !self.is_valid() {
            return None;
        }
        let pixels = self.pixels.clone();
        match self.format {
            PixelFormat::Gray8 => {
                GrayImage::from_raw(self.width, self.height, pixels).map(DynamicImage::ImageLuma8)
            }
            PixelFormat::Rgb8 => {
                RgbImage::from_raw(self.width, self.height, pixels).map(DynamicImage::ImageRgb8)
            }
        }
    }

    /// Converts to a `Gray8` frame using the `image` crate's luma weights,
    /// keeping the timestamp and sequence.
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn to_gray(&self) -> Option<Frame> {
        let gray = self.to_image()?.to_luma8().into_raw();
        Some(Self {
            pixels: gray,
            format: PixelFormat::Gray8,
            ..self.clone()
        })
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
