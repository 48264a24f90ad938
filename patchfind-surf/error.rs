#[derive(Debug, Clone, PartialEq)]
pub enum SurfError {
    InvalidImageSize { width: u32, height: u32 },
    InvalidThreshold(f64),
    InvalidOctaves { octaves: usize, layers: usize },
    InvalidPyramidThreshold(u32),
}

impl std::fmt::Display for SurfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            SurfError::InvalidThreshold(t) => {
                write!(f, "Invalid Hessian threshold: {} (must be finite and >= 0)", t)
            }
            SurfError::InvalidOctaves { octaves, layers } => {
                write!(f, "Invalid scale space: {} octaves x {} layers (both must be >= 1)", octaves, layers)
            }
            SurfError::InvalidPyramidThreshold(t) => {
                write!(f, "Invalid pyramid threshold: {} (must be >= 1)", t)
            }
        }
    }
}

impl std::error::Error for SurfError {}

pub type SurfResult<T> = Result<T, SurfError>;
