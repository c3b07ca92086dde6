use super::CameraSource;
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

pub struct NokhwaCamera {
    camera: Camera,
    pending: Option<RgbImage>,
}

impl NokhwaCamera {
    pub fn new(device_index: u32) -> Result<Self> {
        tracing::info!("Initializing camera {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        tracing::info!("Camera initialized successfully");

        Ok(Self {
            camera,
            pending: None,
        })
    }
}

impl CameraSource for NokhwaCamera {
    fn update(&mut self) -> bool {
        match self.camera.frame() {
            Ok(frame) => match frame.decode_image::<RgbFormat>() {
                Ok(decoded) => {
                    self.pending = Some(decoded);
                    true
                }
                Err(err) => {
                    tracing::debug!("Frame decode failed: {err}");
                    self.pending = None;
                    false
                }
            },
            Err(err) => {
                // A dropped frame is not an error; the session shows
                // the idle view and tries again next tick.
                tracing::debug!("No frame this tick: {err}");
                self.pending = None;
                false
            }
        }
    }

    fn read(&mut self) -> Result<RgbImage> {
        self.pending
            .take()
            .context("read called without a successful update")
    }
}
