//! Webcam frame source backed by `nokhwa`.

use super::{CaptureConfig, CaptureError, Frame, FrameSource};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

/// The platform webcam.
///
/// Frames are decoded to RGB by nokhwa and copied into a [`Frame`];
/// grayscale is produced here when the config asks for it.
#[derive(Default)]
pub struct CameraSource {
    camera: Option<Camera>,
    grayscale: bool,
    sequence: u64,
}

impl CameraSource {
    /// Creates an unopened camera source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CaptureError> {
        config
            .validate()
            .map_err(|e| CaptureError::ConfigFailed(e.to_string()))?;

        let wanted = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));

        let mut camera = Camera::new(CameraIndex::Index(config.device_id), requested)
            .map_err(|e| CaptureError::DeviceNotFound(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::OpenFailed(e.to_string()))?;

        tracing::info!(
            device = config.device_id,
            format = ?camera.camera_format(),
            "Camera opened"
        );
        self.camera = Some(camera);
        self.grayscale = config.grayscale;
        self.sequence = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let camera = self.camera.as_mut().ok_or(CaptureError::NotInitialized)?;

        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        let rgb = decoded.into_raw();
        self.sequence += 1;

        let frame = Frame::from_rgb(rgb, width, height, self.sequence);
        if !self.grayscale {
            return Ok(frame);
        }
        frame.to_gray().ok_or_else(|| {
            CaptureError::CaptureFailed(format!("short frame buffer for {width}x{height}"))
        })
    }

    fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!("Failed to stop camera stream: {}", e);
            }
            tracing::info!("Camera closed");
        }
    }

    fn name(&self) -> &str {
        "camera"
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}
