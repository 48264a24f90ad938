//! Target geometry: robust homography, corner orientation and patch centres.

pub mod error;
pub mod homography;
pub mod orientation;
pub mod projector;

pub use error::{GeometryError, GeometryResult};
pub use homography::{estimate, Homography, RansacFit, MIN_CORRESPONDENCES};
pub use orientation::{normalize, Orientation, PatchReflection};
pub use projector::{project_patches, RelativeCenter, TargetAspect};
