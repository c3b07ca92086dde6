use super::LensCorrection;
use crate::profile::Intrinsics;
use image::{Rgb, RgbImage};

/// Lens correction built from a camera profile's intrinsics.
///
/// Inverse mapping with the usual radial (k1, k2) and tangential
/// (p1, p2) model, nearest-neighbor sampling. With no intrinsics the
/// correction is the identity.
pub struct Undistorter {
    intrinsics: Option<Intrinsics>,
}

impl Undistorter {
    pub fn new(intrinsics: Option<Intrinsics>) -> Self {
        if intrinsics.is_none() {
            tracing::info!("No lens intrinsics in profile; frames pass through uncorrected");
        }
        Self { intrinsics }
    }
}

impl LensCorrection for Undistorter {
    fn correct(&self, frame: &RgbImage) -> RgbImage {
        let Some(intr) = self.intrinsics else {
            return frame.clone();
        };

        let (width, height) = frame.dimensions();
        let mut out = RgbImage::new(width, height);

        for v in 0..height {
            for u in 0..width {
                // Normalized coordinates of the corrected pixel.
                let x = (u as f64 - intr.cx) / intr.fx;
                let y = (v as f64 - intr.cy) / intr.fy;
                let r2 = x * x + y * y;
                let radial = 1.0 + intr.k1 * r2 + intr.k2 * r2 * r2;

                let xd = x * radial + 2.0 * intr.p1 * x * y + intr.p2 * (r2 + 2.0 * x * x);
                let yd = y * radial + intr.p1 * (r2 + 2.0 * y * y) + 2.0 * intr.p2 * x * y;

                let src_u = (intr.fx * xd + intr.cx).round();
                let src_v = (intr.fy * yd + intr.cy).round();

                let pixel = if src_u >= 0.0
                    && src_v >= 0.0
                    && (src_u as u32) < width
                    && (src_v as u32) < height
                {
                    *frame.get_pixel(src_u as u32, src_v as u32)
                } else {
                    Rgb([0, 0, 0])
                };
                out.put_pixel(u, v, pixel);
            }
        }

        out
    }
}
