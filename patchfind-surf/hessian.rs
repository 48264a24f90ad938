use nalgebra::{Matrix3, Vector3};
use patchfind_core::Keypoint;
use rayon::prelude::*;

use crate::integral::IntegralImage;
use crate::types::{HessianLayer, ScaleLevel};

/// Smallest box filter; every layer grows by `FILTER_INC << octave`
pub const BASE_FILTER_SIZE: usize = 9;
pub const FILTER_INC: usize = 6;

/// Relative weight of the mixed derivative in the determinant
const DXY_WEIGHT: f64 = 0.81;

// Box lobes of the 9x9 filters as (x0, y0, x1, y1, weight), rescaled per layer
const DXX: [[i32; 5]; 3] = [[0, 2, 3, 7, 1], [3, 2, 6, 7, -2], [6, 2, 9, 7, 1]];
const DYY: [[i32; 5]; 3] = [[2, 0, 7, 3, 1], [2, 3, 7, 6, -2], [2, 6, 7, 9, 1]];
const DXY: [[i32; 5]; 4] = [[1, 1, 4, 4, 1], [5, 1, 8, 4, -1], [1, 5, 4, 8, -1], [5, 5, 8, 8, 1]];

/// One lobe of a scaled box filter, weight already divided by its area
#[derive(Debug, Clone, Copy)]
struct Lobe {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    weight: f64,
}

fn scale_lobes<const N: usize>(src: &[[i32; 5]; N], size: usize) -> [Lobe; N] {
    let ratio = size as f64 / BASE_FILTER_SIZE as f64;
    src.map(|[x0, y0, x1, y1, w]| {
        let x0 = (ratio * x0 as f64).round() as usize;
        let y0 = (ratio * y0 as f64).round() as usize;
        let x1 = (ratio * x1 as f64).round() as usize;
        let y1 = (ratio * y1 as f64).round() as usize;
        let area = ((x1 - x0) * (y1 - y0)).max(1) as f64;
        Lobe {
            x0,
            y0,
            x1,
            y1,
            weight: w as f64 / area,
        }
    })
}

#[inline]
fn apply(ii: &IntegralImage, lobes: &[Lobe], left: usize, top: usize) -> f64 {
    lobes
        .iter()
        .map(|l| {
            l.weight * ii.box_sum_unchecked(left + l.x0, top + l.y0, left + l.x1, top + l.y1)
        })
        .sum()
}

/// Filter sizes and sampling steps of the scale space
pub fn scale_levels(n_octaves: usize, n_octave_layers: usize) -> Vec<ScaleLevel> {
    let layers = n_octave_layers + 2;
    (0..n_octaves)
        .flat_map(|octave| {
            (0..layers).map(move |layer| ScaleLevel {
                octave,
                layer,
                size: (BASE_FILTER_SIZE + FILTER_INC * layer) << octave,
                step: 1 << octave,
            })
        })
        .collect()
}

/// Evaluate the determinant of Hessian on the sampling grid of `level`.
///
/// Grid cell `(r, c)` is centred on pixel `(c * step, r * step)`; cells whose
/// filter would leave the image are left at zero and excluded from the valid range.
pub fn compute_layer(ii: &IntegralImage, level: ScaleLevel) -> HessianLayer {
    let (w, h) = (ii.width(), ii.height());
    let step = level.step;
    let size = level.size;
    let half = size / 2;
    let cols = if w == 0 { 0 } else { (w - 1) / step + 1 };
    let rows = if h == 0 { 0 } else { (h - 1) / step + 1 };

    let mut layer = HessianLayer::empty(level, rows, cols);
    if size > w || size > h {
        return layer;
    }

    // centre must satisfy half <= centre && centre + half < extent
    let first = half.div_ceil(step);
    let last_c = (w - 1 - half) / step;
    let last_r = (h - 1 - half) / step;
    if first > last_c || first > last_r {
        return layer;
    }
    layer.valid_cols = first..last_c + 1;
    layer.valid_rows = first..last_r + 1;

    let dxx = scale_lobes(&DXX, size);
    let dyy = scale_lobes(&DYY, size);
    let dxy = scale_lobes(&DXY, size);
    let valid_cols = layer.valid_cols.clone();
    let valid_rows = layer.valid_rows.clone();

    layer
        .det
        .par_chunks_mut(cols)
        .zip(layer.trace_positive.par_chunks_mut(cols))
        .enumerate()
        .filter(|(r, _)| valid_rows.contains(r))
        .for_each(|(r, (det_row, trace_row))| {
            let top = r * step - half;
            for c in valid_cols.clone() {
                let left = c * step - half;
                let fxx = apply(ii, &dxx, left, top);
                let fyy = apply(ii, &dyy, left, top);
                let fxy = apply(ii, &dxy, left, top);
                det_row[c] = (fxx * fyy - DXY_WEIGHT * fxy * fxy) as f32;
                trace_row[c] = fxx + fyy >= 0.0;
            }
        });

    layer
}

/// Local maxima of the determinant over 3x3x3 neighbourhoods of one octave,
/// refined to sub-pixel and sub-scale precision.
pub fn find_extrema(octave: &[HessianLayer], threshold: f64) -> Vec<Keypoint> {
    if octave.len() < 3 {
        return Vec::new();
    }

    (1..octave.len() - 1)
        .into_par_iter()
        .flat_map_iter(|l| {
            let (below, mid, above) = (&octave[l - 1], &octave[l], &octave[l + 1]);
            // the largest filter bounds where all 27 samples exist
            let rows = shrink(&above.valid_rows);
            let cols = shrink(&above.valid_cols);
            let mut found = Vec::new();
            for r in rows {
                for c in cols.clone() {
                    let v = mid.at(r, c);
                    if (v as f64) <= threshold {
                        continue;
                    }
                    if !is_strict_max(v, r, c, below, mid, above) {
                        continue;
                    }
                    if let Some(kp) = interpolate(r, c, below, mid, above) {
                        found.push(kp);
                    }
                }
            }
            found
        })
        .collect()
}

fn shrink(range: &std::ops::Range<usize>) -> std::ops::Range<usize> {
    if range.end <= range.start + 2 {
        return 0..0;
    }
    range.start + 1..range.end - 1
}

fn is_strict_max(
    v: f32,
    r: usize,
    c: usize,
    below: &HessianLayer,
    mid: &HessianLayer,
    above: &HessianLayer,
) -> bool {
    for layer in [below, mid, above] {
        for rr in r - 1..=r + 1 {
            for cc in c - 1..=c + 1 {
                if std::ptr::eq(layer, mid) && rr == r && cc == c {
                    continue;
                }
                if layer.at(rr, cc) >= v {
                    return false;
                }
            }
        }
    }
    true
}

/// Fit a quadratic to the 3x3x3 neighbourhood and move the extremum to its peak.
/// Candidates whose peak lies outside the unit cell are rejected.
fn interpolate(
    r: usize,
    c: usize,
    below: &HessianLayer,
    mid: &HessianLayer,
    above: &HessianLayer,
) -> Option<Keypoint> {
    let n0 = |dr: isize, dc: isize| below.at_offset(r, c, dr, dc) as f64;
    let n1 = |dr: isize, dc: isize| mid.at_offset(r, c, dr, dc) as f64;
    let n2 = |dr: isize, dc: isize| above.at_offset(r, c, dr, dc) as f64;

    let gradient = Vector3::new(
        (n1(0, 1) - n1(0, -1)) / 2.0,
        (n1(1, 0) - n1(-1, 0)) / 2.0,
        (n2(0, 0) - n0(0, 0)) / 2.0,
    );

    let dxx = n1(0, -1) - 2.0 * n1(0, 0) + n1(0, 1);
    let dyy = n1(-1, 0) - 2.0 * n1(0, 0) + n1(1, 0);
    let dss = n0(0, 0) - 2.0 * n1(0, 0) + n2(0, 0);
    let dxy = (n1(1, 1) - n1(1, -1) - n1(-1, 1) + n1(-1, -1)) / 4.0;
    let dxs = (n2(0, 1) - n2(0, -1) - n0(0, 1) + n0(0, -1)) / 4.0;
    let dys = (n2(1, 0) - n2(-1, 0) - n0(1, 0) + n0(-1, 0)) / 4.0;

    let hessian = Matrix3::new(dxx, dxy, dxs, dxy, dyy, dys, dxs, dys, dss);
    let offset = hessian.lu().solve(&(-gradient))?;
    if !offset.iter().all(|o| o.is_finite() && o.abs() <= 1.0) {
        return None;
    }

    let step = mid.level.step as f64;
    let size_step = (above.level.size - mid.level.size) as f64;
    let trace_sign = if mid.trace_at(r, c) { 1 } else { -1 };

    Some(Keypoint {
        x: ((c as f64 + offset[0]) * step) as f32,
        y: ((r as f64 + offset[1]) * step) as f32,
        size: (mid.level.size as f64 + offset[2] * size_step).round() as f32,
        angle: 0.0,
        response: mid.at(r, c),
        octave: mid.level.octave as u8,
        laplacian: trace_sign,
    })
}
