mod nokhwa_camera;
mod undistort;

pub use nokhwa_camera::NokhwaCamera;
pub use undistort::Undistorter;

use anyhow::Result;
use image::RgbImage;

/// Trait for camera frame sources.
///
/// Call `update` once per tick; `read` is only defined after an
/// `update` that returned true on the same tick.
pub trait CameraSource {
    /// Poll the device for a new frame. Returns whether one is
    /// available this tick.
    fn update(&mut self) -> bool;

    /// Take the frame fetched by the last successful `update`.
    fn read(&mut self) -> Result<RgbImage>;
}

/// Trait for lens distortion correction. Pure per-frame transform.
pub trait LensCorrection {
    fn correct(&self, frame: &RgbImage) -> RgbImage;
}
