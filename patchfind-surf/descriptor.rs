use patchfind_core::Keypoint;

use crate::integral::IntegralImage;
use crate::orientation::{keypoint_scale, wavelet_size};

/// Sample grid side; split into `SUBREGIONS x SUBREGIONS` blocks
const PATCH_SAMPLES: i32 = 20;
const SUBREGIONS: usize = 4;
const SAMPLES_PER_REGION: i32 = PATCH_SAMPLES / SUBREGIONS as i32;
const DESC_SIGMA: f64 = 3.3;

/// Descriptor length for the standard or extended layout
pub const fn descriptor_len(extended: bool) -> usize {
    if extended {
        128
    } else {
        64
    }
}

/// Rotated Haar-wavelet histogram around one keypoint, L2 normalised.
///
/// The 20x20 grid is aligned with `kp.angle`; every 5x5 block contributes
/// `(Σdx, Σdy, Σ|dx|, Σ|dy|)`, or the sign-split eight sums when `extended`.
pub fn describe(ii: &IntegralImage, kp: &Keypoint, extended: bool, out: &mut [f32]) {
    debug_assert_eq!(out.len(), descriptor_len(extended));
    out.fill(0.0);

    let s = keypoint_scale(kp.size);
    let wav = wavelet_size(s);
    let (sin, cos) = (kp.angle as f64).sin_cos();
    let bins = if extended { 8 } else { 4 };
    let two_sigma2 = 2.0 * DESC_SIGMA * DESC_SIGMA;

    let half = PATCH_SAMPLES / 2;
    for v in -half..half {
        for u in -half..half {
            let (fu, fv) = (u as f64 + 0.5, v as f64 + 0.5);
            let px = kp.x as f64 + s * (fu * cos - fv * sin);
            let py = kp.y as f64 + s * (fu * sin + fv * cos);
            let (x, y) = (px.round() as i64, py.round() as i64);

            let gx = ii.haar_x(x, y, wav);
            let gy = ii.haar_y(x, y, wav);
            let weight = (-(fu * fu + fv * fv) / two_sigma2).exp();
            let rx = (gx * cos + gy * sin) * weight;
            let ry = (-gx * sin + gy * cos) * weight;

            let bu = ((u + half) / SAMPLES_PER_REGION) as usize;
            let bv = ((v + half) / SAMPLES_PER_REGION) as usize;
            let base = (bv * SUBREGIONS + bu) * bins;
            let cell = &mut out[base..base + bins];

            if extended {
                if ry >= 0.0 {
                    cell[0] += rx as f32;
                    cell[1] += rx.abs() as f32;
                } else {
                    cell[2] += rx as f32;
                    cell[3] += rx.abs() as f32;
                }
                if rx >= 0.0 {
                    cell[4] += ry as f32;
                    cell[5] += ry.abs() as f32;
                } else {
                    cell[6] += ry as f32;
                    cell[7] += ry.abs() as f32;
                }
            } else {
                cell[0] += rx as f32;
                cell[1] += ry as f32;
                cell[2] += rx.abs() as f32;
                cell[3] += ry.abs() as f32;
            }
        }
    }

    let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        out.iter_mut().for_each(|v| *v /= norm);
    }
}
