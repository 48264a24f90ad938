use image::RgbImage;
use patchfind_core::{CornerSet, PixelPoint};
use rayon::prelude::*;

const CM_PER_INCH: f64 = 2.54;

/// Mean colour of a patch and the spread of its first channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchColor {
    pub rgb: [f64; 3],
    pub std_dev: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let k = 10f64.powi(decimals);
    (value * k).round() / k
}

/// Average a `(1 + 2r)` square stencil centred on `centre`.
/// Returns `None` when the stencil does not fit inside the image.
pub fn sample_patch(img: &RgbImage, centre: PixelPoint, radius: u32) -> Option<PatchColor> {
    let r = radius as i64;
    let (cx, cy) = (centre.x as i64, centre.y as i64);
    let (w, h) = (img.width() as i64, img.height() as i64);
    if cx - r < 0 || cy - r < 0 || cx + r >= w || cy + r >= h {
        return None;
    }

    let side = 2 * r + 1;
    let n = (side * side) as f64;
    let mut sums = [0.0f64; 3];
    let mut first = Vec::with_capacity((side * side) as usize);
    for y in cy - r..=cy + r {
        for x in cx - r..=cx + r {
            let px = img.get_pixel(x as u32, y as u32).0;
            for (s, &v) in sums.iter_mut().zip(px.iter()) {
                *s += v as f64;
            }
            first.push(px[0] as f64);
        }
    }

    let rgb = sums.map(|s| round_to(s / n, 1));
    let var = first.iter().map(|v| (rgb[0] - v).powi(2)).sum::<f64>() / n;
    Some(PatchColor {
        rgb,
        std_dev: round_to(var.sqrt(), 1),
    })
}

pub fn sample_patches(img: &RgbImage, centres: &[PixelPoint], radius: u32) -> Vec<Option<PatchColor>> {
    centres.par_iter().map(|&c| sample_patch(img, c, radius)).collect()
}

/// Rounded length of the top edge, corner 0 to corner 1
pub fn target_length(corners: &CornerSet) -> f64 {
    let dx = (corners[1].x - corners[0].x) as f64;
    let dy = (corners[1].y - corners[0].y) as f64;
    dx.hypot(dy).round()
}

/// Pixels per inch along the top edge, to two decimals
pub fn resolution(length_px: f64, width_cm: f64) -> Option<f64> {
    if !(width_cm > 0.0) {
        return None;
    }
    Some(round_to(length_px / (width_cm / CM_PER_INCH), 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn flat_patch_has_no_spread() {
        let img = RgbImage::from_pixel(20, 20, Rgb([200, 100, 50]));
        let c = sample_patch(&img, PixelPoint::new(10, 10), 3).unwrap();
        assert_eq!(c.rgb, [200.0, 100.0, 50.0]);
        assert_eq!(c.std_dev, 0.0);
    }

    #[test]
    fn mean_and_spread_round_to_one_decimal() {
        // 3x3 stencil: eight pixels at 10 and one at 20 in the red channel
        let mut img = RgbImage::from_pixel(5, 5, Rgb([10, 0, 0]));
        img.put_pixel(2, 2, Rgb([20, 0, 0]));
        let c = sample_patch(&img, PixelPoint::new(2, 2), 1).unwrap();
        assert_eq!(c.rgb[0], 11.1);
        // deviations: eight of 1.1 and one of 8.9 around the rounded mean, sqrt(9.877)
        assert_eq!(c.std_dev, 3.1);
    }

    #[test]
    fn stencil_leaving_the_image_is_unavailable() {
        let img = RgbImage::new(10, 10);
        assert!(sample_patch(&img, PixelPoint::new(1, 5), 2).is_none());
        assert!(sample_patch(&img, PixelPoint::new(5, 8), 2).is_none());
        assert!(sample_patch(&img, PixelPoint::new(-3, 5), 0).is_none());
        assert!(sample_patch(&img, PixelPoint::new(7, 7), 2).is_some());
    }

    #[test]
    fn length_and_resolution() {
        let p = PixelPoint::new;
        let corners = [p(0, 0), p(300, 400), p(0, 0), p(0, 0)];
        assert_eq!(target_length(&corners), 500.0);
        // 500 px over 12.7 cm = 5 in
        assert_eq!(resolution(500.0, 12.7), Some(100.0));
        assert_eq!(resolution(500.0, 0.0), None);
    }
}
