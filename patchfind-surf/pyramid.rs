use image::{GrayImage, ImageBuffer, Pixel};
use log::{debug, info};
use rayon::prelude::*;

use crate::error::{SurfError, SurfResult};

/// Default longest side above which both images are halved
pub const DEFAULT_PYRAMID_THRESHOLD: u32 = 10_000;

/// Separable 5-tap binomial kernel, total weight 16 per axis
const KERNEL: [u32; 5] = [1, 4, 6, 4, 1];

/// Reflect-101 border handling (`gfedcb|abcdefgh|gfedcba`)
#[inline]
fn reflect101(mut i: i64, n: usize) -> usize {
    let n = n as i64;
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Gaussian-smooth with the fixed 5x5 kernel and keep every second pixel.
///
/// The output is exactly `floor(w/2) x floor(h/2)`; odd trailing rows and
/// columns only contribute through the kernel support.
pub fn pyr_down<P>(img: &ImageBuffer<P, Vec<u8>>) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let (w, h) = img.dimensions();
    let (ow, oh) = (w / 2, h / 2);
    let mut out = ImageBuffer::<P, Vec<u8>>::new(ow, oh);
    if ow == 0 || oh == 0 {
        return out;
    }

    let ch = P::CHANNEL_COUNT as usize;
    let src = img.as_raw();
    let src_stride = w as usize * ch;
    let dst_stride = ow as usize * ch;

    // Horizontal pass, evaluated at even columns only
    let mut tmp = vec![0u32; h as usize * dst_stride];
    tmp.par_chunks_mut(dst_stride).enumerate().for_each(|(y, row)| {
        let src_row = &src[y * src_stride..(y + 1) * src_stride];
        for ox in 0..ow as usize {
            for c in 0..ch {
                let mut acc = 0u32;
                for (k, &wgt) in KERNEL.iter().enumerate() {
                    let sx = reflect101(2 * ox as i64 + k as i64 - 2, w as usize);
                    acc += wgt * src_row[sx * ch + c] as u32;
                }
                row[ox * ch + c] = acc;
            }
        }
    });

    // Vertical pass, evaluated at even rows only
    {
        let dst: &mut [u8] = &mut out;
        dst.par_chunks_mut(dst_stride).enumerate().for_each(|(oy, row)| {
            for (i, px) in row.iter_mut().enumerate() {
                let mut acc = 0u32;
                for (k, &wgt) in KERNEL.iter().enumerate() {
                    let sy = reflect101(2 * oy as i64 + k as i64 - 2, h as usize);
                    acc += wgt * tmp[sy * dst_stride + i];
                }
                *px = ((acc + 128) >> 8) as u8;
            }
        });
    }

    out
}

/// Apply `pyr_down` `times` times, consuming the input
pub fn reduce_times<P>(mut img: ImageBuffer<P, Vec<u8>>, times: u32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    for _ in 0..times {
        img = pyr_down(&img);
    }
    img
}

/// Multiplier that maps reduced-space coordinates back to full resolution.
///
/// 0 reductions -> 1, 1 -> 2, and n >= 2 -> n².
pub fn scale_factor(reductions: u32) -> u32 {
    match reductions {
        0 => 1,
        1 => 2,
        n => n * n,
    }
}

/// Target and scene after lockstep reduction
#[derive(Debug, Clone)]
pub struct ReducedPair {
    pub target: GrayImage,
    pub scene: GrayImage,
    pub reductions: u32,
}

impl ReducedPair {
    pub fn scale_factor(&self) -> u32 {
        scale_factor(self.reductions)
    }
}

/// Halve target and scene together until neither exceeds `threshold` on any side.
///
/// The target is brought under the threshold first, then the scene; every
/// step reduces both images so their relative scale never drifts.
pub fn reduce_pair(target: GrayImage, scene: GrayImage, threshold: u32) -> SurfResult<ReducedPair> {
    if threshold == 0 {
        return Err(SurfError::InvalidPyramidThreshold(threshold));
    }

    let exceeds = |img: &GrayImage| img.width() > threshold || img.height() > threshold;

    let mut pair = ReducedPair {
        target,
        scene,
        reductions: 0,
    };

    while exceeds(&pair.target) {
        pair = step(pair);
    }
    while exceeds(&pair.scene) {
        pair = step(pair);
    }

    if pair.reductions > 0 {
        info!(
            "Reduced images {} times (target {}x{}, scene {}x{}, scale {})",
            pair.reductions,
            pair.target.width(),
            pair.target.height(),
            pair.scene.width(),
            pair.scene.height(),
            pair.scale_factor()
        );
    } else {
        debug!("Images within {} px, no reduction needed", threshold);
    }

    Ok(pair)
}

fn step(pair: ReducedPair) -> ReducedPair {
    ReducedPair {
        target: pyr_down(&pair.target),
        scene: pyr_down(&pair.scene),
        reductions: pair.reductions + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use proptest::prelude::*;

    #[test]
    fn scale_factor_table() {
        assert_eq!(scale_factor(0), 1);
        assert_eq!(scale_factor(1), 2);
        assert_eq!(scale_factor(2), 4);
        assert_eq!(scale_factor(3), 9);
        assert_eq!(scale_factor(4), 16);
    }

    #[test]
    fn constant_image_stays_constant() {
        let img = GrayImage::from_pixel(17, 9, Luma([77]));
        let out = pyr_down(&img);
        assert_eq!(out.dimensions(), (8, 4));
        assert!(out.pixels().all(|p| p.0[0] == 77));
    }

    #[test]
    fn colour_channels_are_independent() {
        let img = RgbImage::from_pixel(10, 10, Rgb([10, 200, 30]));
        let out = pyr_down(&img);
        assert_eq!(out.dimensions(), (5, 5));
        assert!(out.pixels().all(|p| p.0 == [10, 200, 30]));
    }

    #[test]
    fn degenerate_sizes_produce_empty_images() {
        let img = GrayImage::new(1, 40);
        let out = pyr_down(&img);
        assert_eq!(out.dimensions(), (0, 20));
    }

    #[test]
    fn smoothing_spreads_a_single_spike() {
        let mut img = GrayImage::new(8, 8);
        img.put_pixel(4, 4, Luma([255]));
        let out = pyr_down(&img);
        // centre tap 6*6/256 of 255
        assert_eq!(out.get_pixel(2, 2).0[0], ((255 * 36 + 128) / 256) as u8);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn pair_reduction_counts_steps() {
        let target = GrayImage::new(50, 30);
        let scene = GrayImage::new(400, 100);
        let pair = reduce_pair(target, scene, 100).unwrap();
        assert_eq!(pair.reductions, 2);
        assert_eq!(pair.scene.dimensions(), (100, 25));
        assert_eq!(pair.target.dimensions(), (12, 7));
        assert_eq!(pair.scale_factor(), 4);
    }

    #[test]
    fn target_is_reduced_before_scene() {
        let target = GrayImage::new(300, 10);
        let scene = GrayImage::new(150, 150);
        let pair = reduce_pair(target, scene, 100).unwrap();
        // two steps for the target bring the scene to 37 already
        assert_eq!(pair.reductions, 2);
        assert_eq!(pair.target.width(), 75);
        assert_eq!(pair.scene.width(), 37);
    }

    #[test]
    fn small_images_are_untouched() {
        let pair = reduce_pair(GrayImage::new(10, 10), GrayImage::new(20, 20), 10_000).unwrap();
        assert_eq!(pair.reductions, 0);
        assert_eq!(pair.scale_factor(), 1);
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = reduce_pair(GrayImage::new(4, 4), GrayImage::new(4, 4), 0).unwrap_err();
        assert_eq!(err, SurfError::InvalidPyramidThreshold(0));
    }

    proptest! {
        #[test]
        fn output_dimensions_are_floored_halves(w in 1u32..64, h in 1u32..64) {
            let img = GrayImage::new(w, h);
            let out = pyr_down(&img);
            prop_assert_eq!(out.dimensions(), (w / 2, h / 2));
        }

        #[test]
        fn reduced_pair_respects_threshold(w in 1u32..600, h in 1u32..600, t in 16u32..200) {
            let pair = reduce_pair(GrayImage::new(w, h), GrayImage::new(h, w), t).unwrap();
            prop_assert!(pair.target.width() <= t && pair.target.height() <= t);
            prop_assert!(pair.scene.width() <= t && pair.scene.height() <= t);
        }
    }
}
