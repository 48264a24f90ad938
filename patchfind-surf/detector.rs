use image::GrayImage;
use log::debug;
use patchfind_core::{Descriptors, Keypoint, SurfConfig};
use rayon::prelude::*;

use crate::descriptor::{describe, descriptor_len};
use crate::error::{SurfError, SurfResult};
use crate::hessian::{compute_layer, find_extrema, scale_levels};
use crate::integral::IntegralImage;
use crate::orientation::OrientationPattern;
use crate::types::HessianLayer;

/// Scale- and rotation-invariant keypoint detector with SURF descriptors
#[derive(Debug, Clone)]
pub struct SurfDetector {
    cfg: SurfConfig,
    pattern: OrientationPattern,
}

impl SurfDetector {
    /// Creates a new detector with validation
    pub fn new(cfg: SurfConfig) -> SurfResult<Self> {
        if !cfg.hessian_threshold.is_finite() || cfg.hessian_threshold < 0.0 {
            return Err(SurfError::InvalidThreshold(cfg.hessian_threshold));
        }
        if cfg.n_octaves == 0 || cfg.n_octave_layers == 0 {
            return Err(SurfError::InvalidOctaves {
                octaves: cfg.n_octaves,
                layers: cfg.n_octave_layers,
            });
        }
        Ok(Self {
            cfg,
            pattern: OrientationPattern::new(),
        })
    }

    pub fn config(&self) -> &SurfConfig {
        &self.cfg
    }

    pub fn descriptor_len(&self) -> usize {
        descriptor_len(self.cfg.extended)
    }

    /// Keypoints with orientation, in octave then layer order
    pub fn detect(&self, img: &GrayImage) -> SurfResult<Vec<Keypoint>> {
        let ii = self.integral(img)?;
        Ok(self.detect_integral(&ii))
    }

    /// Detect keypoints and describe them in one pass over a shared integral image.
    ///
    /// An image without any structure yields empty outputs, not an error.
    pub fn detect_and_compute(&self, img: &GrayImage) -> SurfResult<(Vec<Keypoint>, Descriptors)> {
        let ii = self.integral(img)?;
        let keypoints = self.detect_integral(&ii);

        let dim = self.descriptor_len();
        let mut flat = vec![0f32; keypoints.len() * dim];
        flat.par_chunks_mut(dim)
            .zip(keypoints.par_iter())
            .for_each(|(row, kp)| describe(&ii, kp, self.cfg.extended, row));

        let descriptors = Descriptors::from_flat(dim, flat).unwrap_or_else(|| Descriptors::new(dim));
        debug!(
            "{} keypoints, {}-dim descriptors on {}x{}",
            keypoints.len(),
            dim,
            img.width(),
            img.height()
        );
        Ok((keypoints, descriptors))
    }

    fn integral(&self, img: &GrayImage) -> SurfResult<IntegralImage> {
        if img.width() == 0 || img.height() == 0 {
            return Err(SurfError::InvalidImageSize {
                width: img.width(),
                height: img.height(),
            });
        }
        Ok(IntegralImage::new(img))
    }

    fn detect_integral(&self, ii: &IntegralImage) -> Vec<Keypoint> {
        let levels = scale_levels(self.cfg.n_octaves, self.cfg.n_octave_layers);
        let per_octave = self.cfg.n_octave_layers + 2;

        let layers: Vec<HessianLayer> = levels
            .par_iter()
            .map(|&level| compute_layer(ii, level))
            .collect();

        let candidates: Vec<Keypoint> = layers
            .par_chunks(per_octave)
            .flat_map_iter(|octave| find_extrema(octave, self.cfg.hessian_threshold))
            .collect();

        let found = candidates.len();
        let keypoints: Vec<Keypoint> = candidates
            .into_par_iter()
            .filter_map(|mut kp| {
                kp.angle = self.pattern.dominant_angle(ii, &kp)?;
                Some(kp)
            })
            .collect();

        debug!(
            "Fast-Hessian kept {} of {} extrema over {} octaves",
            keypoints.len(),
            found,
            self.cfg.n_octaves
        );
        keypoints
    }
}
