use patchfind_core::{MatchStrategy, SurfConfig};

use crate::config::LocatorConfig;
use crate::error::LocateResult;
use crate::locator::TargetLocator;

/// Builder for creating a `TargetLocator`
#[derive(Debug, Clone, Default)]
pub struct LocatorBuilder {
    config: LocatorConfig,
}

impl LocatorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Set the minimum Hessian response
    pub fn hessian_threshold(mut self, threshold: f64) -> Self {
        self.config.surf.hessian_threshold = threshold;
        self
    }

    /// Set octave count and intermediate layers per octave
    pub fn octaves(mut self, n_octaves: usize, n_octave_layers: usize) -> Self {
        self.config.surf.n_octaves = n_octaves;
        self.config.surf.n_octave_layers = n_octave_layers;
        self
    }

    /// Choose 128-element (true) or 64-element descriptors
    pub fn extended(mut self, enable: bool) -> Self {
        self.config.surf.extended = enable;
        self
    }

    /// Replace all detector settings at once
    pub fn surf(mut self, surf: SurfConfig) -> Self {
        self.config.surf = surf;
        self
    }

    /// Set the nearest/second-nearest acceptance ratio
    pub fn ratio(mut self, ratio: f32) -> Self {
        self.config.matching.ratio = ratio;
        self
    }

    /// Switch between the k-d forest and exhaustive matching
    pub fn strategy(mut self, strategy: MatchStrategy) -> Self {
        self.config.matching.strategy = strategy;
        self
    }

    /// Set forest size and leaf checks per query
    pub fn forest(mut self, trees: usize, checks: usize) -> Self {
        self.config.matching.trees = trees;
        self.config.matching.checks = checks;
        self
    }

    /// Set the RANSAC inlier threshold in pixels
    pub fn reprojection_threshold(mut self, px: f64) -> Self {
        self.config.ransac.reprojection_threshold = px;
        self
    }

    /// Set the RANSAC iteration cap
    pub fn max_iters(mut self, iters: usize) -> Self {
        self.config.ransac.max_iters = iters;
        self
    }

    /// Seed both the forest and RANSAC
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.matching.seed = seed;
        self.config.ransac.seed = seed;
        self
    }

    /// Set the longest side allowed before both images are halved
    pub fn pyramid_threshold(mut self, px: u32) -> Self {
        self.config.pyramid_threshold = px;
        self
    }

    /// Set how often the annotated image is halved before saving
    pub fn annotation_reductions(mut self, n: u32) -> Self {
        self.config.annotation_reductions = n;
        self
    }

    /// Sample patch colours over a `(1 + 2r)` square stencil
    pub fn color_sampling(mut self, radius: Option<u32>) -> Self {
        self.config.color_sample_radius = radius;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Apply the exact preset: brute-force matching and a tighter threshold
    pub fn preset_exact(mut self) -> Self {
        self.config.matching.strategy = MatchStrategy::BruteForce;
        self.config.ransac.reprojection_threshold = 3.0;
        self
    }

    /// Apply the fast preset: 64-element descriptors and fewer leaf checks
    pub fn preset_fast(mut self) -> Self {
        self.config.surf.extended = false;
        self.config.surf.n_octaves = 3;
        self.config.matching.checks = 32;
        self
    }

    /// Build the `TargetLocator`
    pub fn build(self) -> LocateResult<TargetLocator> {
        TargetLocator::new(self.config)
    }

    /// Finish without constructing a locator
    pub fn to_config(self) -> LocatorConfig {
        self.config
    }
}
