//! Image pyramid reduction and SURF-style feature extraction.
//!
//! The pipeline is integral image -> Fast-Hessian box-filter scale space ->
//! 3x3x3 non-maximum suppression with quadratic refinement -> Haar-wavelet
//! orientation -> 64 or 128 element rotated descriptors.

pub mod descriptor;
pub mod detector;
pub mod error;
pub mod hessian;
pub mod integral;
pub mod orientation;
pub mod pyramid;
pub mod types;

pub use descriptor::descriptor_len;
pub use detector::SurfDetector;
pub use error::{SurfError, SurfResult};
pub use integral::IntegralImage;
pub use pyramid::{pyr_down, reduce_pair, reduce_times, scale_factor, ReducedPair, DEFAULT_PYRAMID_THRESHOLD};
