use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use patchfind_core::{CornerSet, PixelPoint};
use patchfind_surf::reduce_times;

use crate::error::{LocateError, LocateResult};

pub const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const OUTLINE_THICKNESS: i32 = 12;
pub const MARKER_RADIUS: i32 = 14;

fn draw_thick_line(img: &mut RgbImage, from: PixelPoint, to: PixelPoint, thickness: i32, color: Rgb<u8>) {
    let (dx, dy) = ((to.x - from.x) as f32, (to.y - from.y) as f32);
    let len = dx.hypot(dy);
    if len == 0.0 {
        return;
    }
    // unit normal
    let (nx, ny) = (-dy / len, dx / len);
    let half = thickness / 2;
    for t in -half..=half {
        let t = t as f32;
        let (ox, oy) = (nx * t, ny * t);
        draw_line_segment_mut(
            img,
            (from.x as f32 + ox, from.y as f32 + oy),
            (to.x as f32 + ox, to.y as f32 + oy),
            color,
        );
    }
}

/// Draw the target outline and a disc on every patch centre, in place.
/// `corners` and `centres` are full-resolution scene coordinates.
pub fn draw_location(img: &mut RgbImage, corners: &CornerSet, centres: &[PixelPoint]) {
    for k in 0..4 {
        draw_thick_line(img, corners[k], corners[(k + 1) % 4], OUTLINE_THICKNESS, OUTLINE_COLOR);
    }
    for c in centres {
        draw_filled_circle_mut(img, (c.x, c.y), MARKER_RADIUS, OUTLINE_COLOR);
    }
}

/// Annotate the scene, shrink it `reductions` times and save it by extension
pub fn save_annotated<P: AsRef<Path>>(
    mut img: RgbImage,
    corners: &CornerSet,
    centres: &[PixelPoint],
    reductions: u32,
    path: P,
) -> LocateResult<()> {
    draw_location(&mut img, corners, centres);
    let small = reduce_times(img, reductions);
    if small.width() == 0 || small.height() == 0 {
        return Err(LocateError::Annotation(format!(
            "image vanished after {} reductions",
            reductions
        )));
    }
    small
        .save(path.as_ref())
        .map_err(|e| LocateError::Annotation(format!("{}: {}", path.as_ref().display(), e)))?;
    log::info!("Saved annotated image to {}", path.as_ref().display());
    Ok(())
}
