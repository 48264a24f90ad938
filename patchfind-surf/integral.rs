use image::GrayImage;
use rayon::prelude::*;

/// Summed-area table over raw 0..255 intensities with a zero guard row/column.
///
/// `sum[(y) * (w+1) + x]` holds the sum of all pixels strictly above and left
/// of `(x, y)`, so any axis-aligned box costs four lookups.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    sum: Vec<f64>,
}

impl IntegralImage {
    pub fn new(img: &GrayImage) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let stride = width + 1;
        let raw = img.as_raw();

        // Row prefix sums in parallel, then the running column sums
        let mut sum = vec![0f64; stride * (height + 1)];
        sum[stride..]
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                let src = &raw[y * width..(y + 1) * width];
                let mut acc = 0f64;
                for (x, &v) in src.iter().enumerate() {
                    acc += v as f64;
                    row[x + 1] = acc;
                }
            });
        for y in 1..=height {
            let (prev, cur) = sum.split_at_mut(y * stride);
            let prev = &prev[(y - 1) * stride..];
            for x in 0..stride {
                cur[x] += prev[x];
            }
        }

        Self { width, height, sum }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum over the half-open box `[x0, x1) x [y0, y1)`, clipped to the image
    pub fn box_sum(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> f64 {
        let cx = |v: i64| v.clamp(0, self.width as i64) as usize;
        let cy = |v: i64| v.clamp(0, self.height as i64) as usize;
        let (x0, x1, y0, y1) = (cx(x0), cx(x1), cy(y0), cy(y1));
        if x1 <= x0 || y1 <= y0 {
            return 0.0;
        }
        let stride = self.width + 1;
        self.sum[y1 * stride + x1] - self.sum[y0 * stride + x1] - self.sum[y1 * stride + x0]
            + self.sum[y0 * stride + x0]
    }

    /// Unclipped lookup for boxes already known to be inside the image
    #[inline]
    pub(crate) fn box_sum_unchecked(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let stride = self.width + 1;
        self.sum[y1 * stride + x1] - self.sum[y0 * stride + x1] - self.sum[y1 * stride + x0]
            + self.sum[y0 * stride + x0]
    }

    /// Horizontal Haar response of side `size` centred at `(x, y)`: right half minus left half
    pub fn haar_x(&self, x: i64, y: i64, size: i64) -> f64 {
        let half = size / 2;
        self.box_sum(x, y - half, x + half, y + half) - self.box_sum(x - half, y - half, x, y + half)
    }

    /// Vertical Haar response of side `size` centred at `(x, y)`: bottom half minus top half
    pub fn haar_y(&self, x: i64, y: i64, size: i64) -> f64 {
        let half = size / 2;
        self.box_sum(x - half, y, x + half, y + half) - self.box_sum(x - half, y - half, x + half, y)
    }
}
