use std::f64::consts::PI;

use patchfind_core::Keypoint;

use crate::integral::IntegralImage;

/// Sampling radius in units of the keypoint scale
const ORI_RADIUS: i32 = 6;
const ORI_SIGMA: f64 = 2.5;
/// Width of the sliding window and its step, in degrees
const ORI_WINDOW: i32 = 60;
const ORI_STEP: i32 = 5;

/// Keypoint scale from its filter size
#[inline]
pub fn keypoint_scale(size: f32) -> f64 {
    size as f64 * 1.2 / 9.0
}

/// Side of the Haar wavelet used for orientation and description at scale `s`
#[inline]
pub fn wavelet_size(s: f64) -> i64 {
    (2 * (2.0 * s).round() as i64).max(2)
}

/// Circular sample pattern with its Gaussian weights
#[derive(Debug, Clone)]
pub struct OrientationPattern {
    samples: Vec<(i32, i32, f64)>,
}

impl Default for OrientationPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationPattern {
    pub fn new() -> Self {
        let r2 = ORI_RADIUS * ORI_RADIUS;
        let samples = (-ORI_RADIUS..=ORI_RADIUS)
            .flat_map(|j| (-ORI_RADIUS..=ORI_RADIUS).map(move |i| (i, j)))
            .filter(|&(i, j)| i * i + j * j <= r2)
            .map(|(i, j)| {
                let d2 = (i * i + j * j) as f64;
                (i, j, (-d2 / (2.0 * ORI_SIGMA * ORI_SIGMA)).exp())
            })
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Dominant gradient direction around `kp` in radians, image axes (y down).
    ///
    /// Returns `None` when the wavelet no longer fits inside the image.
    pub fn dominant_angle(&self, ii: &IntegralImage, kp: &Keypoint) -> Option<f32> {
        let s = keypoint_scale(kp.size);
        let wav = wavelet_size(s);
        if ii.width() as i64 <= wav || ii.height() as i64 <= wav {
            return None;
        }

        let mut responses = Vec::with_capacity(self.samples.len());
        for &(i, j, weight) in &self.samples {
            let x = (kp.x as f64 + i as f64 * s).round() as i64;
            let y = (kp.y as f64 + j as f64 * s).round() as i64;
            let half = wav / 2;
            if x - half < 0 || y - half < 0 || x + half > ii.width() as i64 || y + half > ii.height() as i64 {
                continue;
            }
            let dx = ii.haar_x(x, y, wav) * weight;
            let dy = ii.haar_y(x, y, wav) * weight;
            let deg = dy.atan2(dx).to_degrees().rem_euclid(360.0).round() as i32;
            responses.push((dx, dy, deg));
        }

        let (mut best_x, mut best_y, mut best_mag) = (0.0, 0.0, 0.0);
        for centre in (0..360).step_by(ORI_STEP as usize) {
            let (mut sx, mut sy) = (0.0, 0.0);
            for &(dx, dy, deg) in &responses {
                let d = (deg - centre).abs();
                if d < ORI_WINDOW / 2 || d > 360 - ORI_WINDOW / 2 {
                    sx += dx;
                    sy += dy;
                }
            }
            let mag = sx * sx + sy * sy;
            if mag > best_mag {
                best_mag = mag;
                best_x = sx;
                best_y = sy;
            }
        }

        let angle: f64 = best_y.atan2(best_x);
        Some(angle.rem_euclid(2.0 * PI) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn kp_at(x: f32, y: f32, size: f32) -> Keypoint {
        Keypoint {
            x,
            y,
            size,
            angle: 0.0,
            response: 1.0,
            octave: 0,
            laplacian: 1,
        }
    }

    #[test]
    fn pattern_covers_disc() {
        let p = OrientationPattern::new();
        // lattice points with i^2 + j^2 <= 36
        assert_eq!(p.len(), 113);
    }

    #[test]
    fn horizontal_ramp_points_along_x() {
        let img = GrayImage::from_fn(80, 80, |x, _| Luma([(x * 3) as u8]));
        let ii = IntegralImage::new(&img);
        let angle = OrientationPattern::new()
            .dominant_angle(&ii, &kp_at(40.0, 40.0, 9.0))
            .unwrap();
        assert!(angle < 0.1 || angle > 2.0 * std::f32::consts::PI - 0.1, "angle = {angle}");
    }

    #[test]
    fn vertical_ramp_points_down() {
        let img = GrayImage::from_fn(80, 80, |_, y| Luma([(y * 3) as u8]));
        let ii = IntegralImage::new(&img);
        let angle = OrientationPattern::new()
            .dominant_angle(&ii, &kp_at(40.0, 40.0, 9.0))
            .unwrap();
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 0.1, "angle = {angle}");
    }

    #[test]
    fn oversized_wavelet_is_rejected() {
        let ii = IntegralImage::new(&GrayImage::new(6, 6));
        assert!(OrientationPattern::new()
            .dominant_angle(&ii, &kp_at(3.0, 3.0, 60.0))
            .is_none());
    }
}
