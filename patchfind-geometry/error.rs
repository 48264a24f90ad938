#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    TooFewCorrespondences { found: usize },
    NoConsensus { best_inliers: usize },
    DegenerateHomography,
    DegenerateTopEdge,
    InvalidAspect { x_size: f64, y_size: f64 },
    InvalidRansacParams(String),
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::TooFewCorrespondences { found } => {
                write!(f, "Too few correspondences: {} (at least 4 required)", found)
            }
            GeometryError::NoConsensus { best_inliers } => {
                write!(f, "No homography consensus: best model had {} inliers (at least 4 required)", best_inliers)
            }
            GeometryError::DegenerateHomography => {
                write!(f, "Homography maps a target corner to infinity")
            }
            GeometryError::DegenerateTopEdge => {
                write!(f, "Target top edge is vertical or has zero length")
            }
            GeometryError::InvalidAspect { x_size, y_size } => {
                write!(f, "Invalid target size: {}x{} (both must be finite and > 0)", x_size, y_size)
            }
            GeometryError::InvalidRansacParams(msg) => write!(f, "Invalid RANSAC parameters: {}", msg),
        }
    }
}

impl std::error::Error for GeometryError {}

pub type GeometryResult<T> = Result<T, GeometryError>;
