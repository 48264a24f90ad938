use patchfind_core::{CornerSet, PixelPoint};

use crate::error::{GeometryError, GeometryResult};
use crate::orientation::PatchReflection;

/// Printed target size in any consistent unit; only the ratio matters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetAspect {
    x_size: f64,
    y_size: f64,
}

impl TargetAspect {
    pub fn new(x_size: f64, y_size: f64) -> GeometryResult<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !ok(x_size) || !ok(y_size) {
            return Err(GeometryError::InvalidAspect { x_size, y_size });
        }
        Ok(Self { x_size, y_size })
    }

    pub fn x_size(&self) -> f64 {
        self.x_size
    }

    pub fn y_size(&self) -> f64 {
        self.y_size
    }

    /// Height over width
    pub fn ratio(&self) -> f64 {
        self.y_size / self.x_size
    }
}

/// Patch centre in the unit square of the target frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeCenter {
    pub x: f64,
    pub y: f64,
}

impl RelativeCenter {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Scene-pixel centre of every patch.
///
/// `corners` are the oriented corners in reduced space; the top edge runs from
/// corner 0 to corner 1 and `scale` maps back to full resolution. The skew
/// angle comes from the unscaled corners, lengths from the scaled ones.
pub fn project_patches(
    corners: &CornerSet,
    aspect: TargetAspect,
    patches: &[RelativeCenter],
    reflection: PatchReflection,
    scale: i32,
) -> GeometryResult<Vec<PixelPoint>> {
    let (c0, c1) = (corners[0], corners[1]);
    let theta = ((c1.y - c0.y) as f64).atan2((c1.x - c0.x) as f64);
    let (cos_t, tan_t) = (theta.cos(), theta.tan());

    let (s0, s1) = (c0.scaled(scale), c1.scaled(scale));
    let c = (((s1.x - s0.x) as f64).powi(2) + ((s1.y - s0.y) as f64).powi(2)).sqrt();
    if c == 0.0 || cos_t.abs() < 1e-9 {
        return Err(GeometryError::DegenerateTopEdge);
    }
    let d = c * aspect.ratio();
    let origin = (s0.x as f64, s0.y as f64);

    let n = patches.len();
    let centres = (0..n)
        .map(|i| {
            let rel_x = if reflection.reverse_along_edge {
                patches[n - 1 - i].x
            } else {
                patches[i].x
            };
            let rel_y = if reflection.invert_height {
                1.0 - patches[i].y
            } else {
                patches[i].y
            };

            let e = c * rel_x;
            let f = d * rel_y * tan_t;
            let g = e - f;
            let h = g * cos_t;
            let j = h * tan_t;
            let k = rel_y * d / cos_t;

            PixelPoint::new((h + origin.0).trunc() as i32, (j + k + origin.1).trunc() as i32)
        })
        .collect();
    Ok(centres)
}
