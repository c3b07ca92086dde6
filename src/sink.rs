use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;

/// Trait for frame persistence.
pub trait FrameSink {
    /// Encode and write one frame to `path`.
    fn write(&mut self, frame: &RgbImage, path: &Path) -> Result<()>;
}

/// PNG writer backed by the `image` crate.
pub struct PngSink;

impl FrameSink for PngSink {
    fn write(&mut self, frame: &RgbImage, path: &Path) -> Result<()> {
        frame
            .save(path)
            .with_context(|| format!("Failed to write frame to {}", path.display()))
    }
}
