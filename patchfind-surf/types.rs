use std::ops::Range;

/// One filter of the scale space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleLevel {
    pub octave: usize,
    pub layer: usize,
    /// Side of the box filter in pixels
    pub size: usize,
    /// Pixel distance between grid samples
    pub step: usize,
}

/// Determinant-of-Hessian responses sampled on a regular grid
#[derive(Debug, Clone)]
pub struct HessianLayer {
    pub level: ScaleLevel,
    pub rows: usize,
    pub cols: usize,
    pub det: Vec<f32>,
    pub trace_positive: Vec<bool>,
    /// Grid rows and columns whose filter lies fully inside the image
    pub valid_rows: Range<usize>,
    pub valid_cols: Range<usize>,
}

impl HessianLayer {
    pub fn empty(level: ScaleLevel, rows: usize, cols: usize) -> Self {
        Self {
            level,
            rows,
            cols,
            det: vec![0.0; rows * cols],
            trace_positive: vec![false; rows * cols],
            valid_rows: 0..0,
            valid_cols: 0..0,
        }
    }

    #[inline]
    pub fn at(&self, r: usize, c: usize) -> f32 {
        self.det[r * self.cols + c]
    }

    #[inline]
    pub fn at_offset(&self, r: usize, c: usize, dr: isize, dc: isize) -> f32 {
        let rr = (r as isize + dr) as usize;
        let cc = (c as isize + dc) as usize;
        self.at(rr, cc)
    }

    #[inline]
    pub fn trace_at(&self, r: usize, c: usize) -> bool {
        self.trace_positive[r * self.cols + c]
    }
}
