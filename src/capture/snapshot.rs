//! Saving captured frames as JPEG photos.

use super::Frame;
use chrono::{DateTime, Local, TimeZone};
use image::ImageFormat;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while saving snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Directory or file I/O failed.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The frame buffer does not match its dimensions.
    #[error("frame buffer does not match its dimensions")]
    InvalidFrame,
    /// JPEG encoding failed.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] image::ImageError),
}

/// Builds a capture file name of the form `YYYYMMDD_HH-MM<extension>`.
///
/// `extension` includes the leading dot.
pub fn capture_file_name<Tz>(time: &DateTime<Tz>, extension: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}{}", time.format("%Y%m%d_%H-%M"), extension)
}

/// Writes frames into a capture folder.
///
/// Names come from [`capture_file_name`]; when a name is taken the
/// writer appends ` (2)`, ` (3)` and so on.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    /// Creates the writer, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory snapshots are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves the frame using the current local time for its name.
    pub fn save(&self, frame: &Frame) -> Result<PathBuf, SnapshotError> {
        self.save_at(frame, &Local::now())
    }

    /// Saves the frame named after `time`.
    pub fn save_at<Tz>(&self, frame: &Frame, time: &DateTime<Tz>) -> Result<PathBuf, SnapshotError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let image = frame.to_image().ok_or(SnapshotError::InvalidFrame)?;
        let path = self.unique_path(&capture_file_name(time, ""), "jpg");

        image.save_with_format(&path, ImageFormat::Jpeg)?;
        tracing::debug!(path = %path.display(), sequence = frame.sequence(), "Saved snapshot");
        Ok(path)
    }

    fn unique_path(&self, stem: &str, extension: &str) -> PathBuf {
        let mut candidate = self.dir.join(format!("{stem}.{extension}"));
        let mut n = 2;
        while candidate.exists() {
            candidate = self.dir.join(format!("{stem} ({n}).{extension}"));
            n += 1;
        }
        candidate
    }
}
