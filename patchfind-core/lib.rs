#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interest point ≙ Fast-Hessian extremum + dominant orientation (radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32, // Subpixel x coordinate
    pub y: f32, // Subpixel y coordinate
    pub size: f32,
    pub angle: f32,
    pub response: f32,
    pub octave: u8,
    /// Sign of the Hessian trace, +1 for dark blobs on bright ground
    pub laplacian: i8,
}

/// Dense row-major descriptor table, one row per keypoint
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptors {
    dim: usize,
    data: Vec<f32>,
}

impl Descriptors {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    /// Build a table from already flattened rows. Returns `None` when the
    /// buffer length is not a multiple of `dim`.
    pub fn from_flat(dim: usize, data: Vec<f32>) -> Option<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return None;
        }
        Some(Self { dim, data })
    }

    /// Append one row. Returns `false` and leaves the table untouched when
    /// `row` does not have `dim` entries.
    #[must_use]
    pub fn push(&mut self, row: &[f32]) -> bool {
        if self.dim == 0 || row.len() != self.dim {
            return false;
        }
        self.data.extend_from_slice(row);
        true
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dim.max(1))
    }
}

/// Accepted match: (target descriptor index, scene descriptor index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Correspondence {
    pub target: usize,
    pub scene: usize,
}

/// Integer pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, scale: i32) -> Self {
        Self {
            x: self.x * scale,
            y: self.y * scale,
        }
    }
}

/// Target corners in the order (0,0), (w,0), (w,h), (0,h) of the target frame
pub type CornerSet = [PixelPoint; 4];

/// Fast-Hessian detector and descriptor settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SurfConfig {
    /// Minimum determinant-of-Hessian response kept by the detector
    pub hessian_threshold: f64,
    pub n_octaves: usize,
    /// Layers per octave beyond the two bracketing ones
    pub n_octave_layers: usize,
    /// 128-element descriptors instead of 64
    pub extended: bool,
}

impl Default for SurfConfig {
    fn default() -> Self {
        Self {
            hessian_threshold: 500.0,
            n_octaves: 4,
            n_octave_layers: 2,
            extended: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchStrategy {
    /// Randomised k-d forest, approximate
    KdForest,
    /// Exhaustive search with early-exit distances
    BruteForce,
}

/// Descriptor matcher settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    /// Nearest must be closer than `ratio` times the second nearest
    pub ratio: f32,
    pub strategy: MatchStrategy,
    pub trees: usize,
    /// Upper bound on leaves visited per query
    pub checks: usize,
    pub seed: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ratio: 0.6,
            strategy: MatchStrategy::KdForest,
            trees: 4,
            checks: 64,
            seed: 0x5eed,
        }
    }
}

/// Robust homography fitting settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RansacConfig {
    /// Maximum reprojection error in pixels for an inlier
    pub reprojection_threshold: f64,
    pub max_iters: usize,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reprojection_threshold: 5.0,
            max_iters: 2000,
            confidence: 0.995,
            seed: 0x5eed,
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

/// Default worker count for the global pool
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}
