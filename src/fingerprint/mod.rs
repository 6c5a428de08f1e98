//! Brightness fingerprints.
//!
//! An image is shrunk to a 16x16 grid and every cell is reduced to a
//! single dark/light flag. Two fingerprints describe the same scene
//! when nearly all of their cells agree, which makes the comparison
//! robust to sensor noise while still catching real changes.

mod bits;
mod comparator;
mod extractor;

pub use bits::Fingerprint;
pub use comparator::{is_same, Comparator, Comparison};
pub use extractor::{brightness, Extractor, ResizeFilter};

use thiserror::Error;

/// Width and height of the downsampled grid.
pub const GRID_SIZE: u32 = 16;

/// Number of cells in a fingerprint.
pub const FINGERPRINT_LEN: usize = (GRID_SIZE * GRID_SIZE) as usize;

/// Default number of equal cells for two frames to count as the same.
pub const SAME_IMAGE_MIN_MATCHING: u32 = 253;

/// Errors raised while producing or comparing fingerprints.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The image file could not be read.
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    /// The image data could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The image has zero width or height.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// A frame buffer length does not match its dimensions.
    #[error("frame buffer of {bytes} bytes does not match {width}x{height}")]
    InvalidFrame {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Actual buffer length.
        bytes: usize,
    },

    /// A cell list is not 256 long.
    #[error("fingerprint must have 256 cells, got {0}")]
    InvalidLength(usize),

    /// Two cell lists of different lengths were compared.
    #[error("cannot compare fingerprints of different lengths ({left} vs {right})")]
    LengthMismatch {
        /// Length of the first list.
        left: usize,
        /// Length of the second list.
        right: usize,
    },
}
