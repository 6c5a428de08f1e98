//! Frame source backed by a directory of still images.

use super::{CaptureConfig, CaptureError, Frame, FrameSource, PixelFormat};
use std::path::{Path, PathBuf};

/// Replays the images of a directory in file-name order, looping forever.
///
/// Useful for running the change monitor against photos saved by an
/// earlier session.
#[derive(Debug)]
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    grayscale: bool,
    sequence: u64,
    open: bool,
}

impl ImageDirSource {
    /// Creates a source over `dir`; files are listed on `open`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: 0,
            grayscale: false,
            sequence: 0,
            open: false,
        }
    }

    /// Image files discovered by the last `open`.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn scan(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && image::ImageFormat::from_path(path).is_ok())
            .collect();
        files.sort();
        Ok(files)
    }
}

impl FrameSource for ImageDirSource {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CaptureError> {
        let files = Self::scan(&self.dir)?;
        if files.is_empty() {
            return Err(CaptureError::DeviceNotFound(format!(
                "no images in {}",
                self.dir.display()
            )));
        }

        tracing::info!(
            dir = %self.dir.display(),
            images = files.len(),
            "ImageDirSource opened"
        );
        self.files = files;
        self.cursor = 0;
        self.sequence = 0;
        self.grayscale = config.grayscale;
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if !self.open {
            return Err(CaptureError::NotInitialized);
        }

        let path = &self.files[self.cursor];
        self.cursor = (self.cursor + 1) % self.files.len();

        let image = image::open(path)
            .map_err(|e| CaptureError::CaptureFailed(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded frame from disk");

        self.sequence += 1;
        let frame = if self.grayscale {
            let gray = image.to_luma8();
            let (w, h) = gray.dimensions();
            Frame::with_format(gray.into_raw(), w, h, PixelFormat::Gray8, self.sequence)
        } else {
            let rgb = image.to_rgb8();
            let (w, h) = rgb.dimensions();
            Frame::from_rgb(rgb.into_raw(), w, h, self.sequence)
        };
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        self.files.clear();
        tracing::info!("ImageDirSource closed");
    }

    fn name(&self) -> &str {
        "directory"
    }
}
