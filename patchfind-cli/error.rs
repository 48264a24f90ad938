use std::path::PathBuf;

use patchfind_geometry::GeometryError;
use patchfind_match::MatchError;
use patchfind_surf::SurfError;

#[derive(Debug)]
pub enum LocateError {
    ImageLoadFailure { path: PathBuf, reason: String },
    TargetNotFound(String),
    MalformedTargetDescription(String),
    Document { path: PathBuf, reason: String },
    Config(String),
    Io { path: PathBuf, source: std::io::Error },
    Annotation(String),
    ThreadPool(rayon::ThreadPoolBuildError),
    Surf(SurfError),
    Match(MatchError),
    Geometry(GeometryError),
}

impl std::fmt::Display for LocateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocateError::ImageLoadFailure { path, reason } => {
                write!(f, "Could not load image {}: {}", path.display(), reason)
            }
            LocateError::TargetNotFound(reason) => write!(f, "Target not found: {}", reason),
            LocateError::MalformedTargetDescription(reason) => {
                write!(f, "Malformed target description: {}", reason)
            }
            LocateError::Document { path, reason } => {
                write!(f, "Document error in {}: {}", path.display(), reason)
            }
            LocateError::Config(reason) => write!(f, "Invalid configuration: {}", reason),
            LocateError::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
            LocateError::Annotation(reason) => write!(f, "Annotation failed: {}", reason),
            LocateError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
            LocateError::Surf(e) => write!(f, "Feature extraction error: {}", e),
            LocateError::Match(e) => write!(f, "Matching error: {}", e),
            LocateError::Geometry(e) => write!(f, "Geometry error: {}", e),
        }
    }
}

impl std::error::Error for LocateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocateError::Io { source, .. } => Some(source),
            LocateError::ThreadPool(e) => Some(e),
            LocateError::Surf(e) => Some(e),
            LocateError::Match(e) => Some(e),
            LocateError::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SurfError> for LocateError {
    fn from(err: SurfError) -> Self {
        LocateError::Surf(err)
    }
}

impl From<MatchError> for LocateError {
    fn from(err: MatchError) -> Self {
        LocateError::Match(err)
    }
}

/// Homography failures mean the target was not found; the rest stay geometry errors
impl From<GeometryError> for LocateError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::TooFewCorrespondences { .. }
            | GeometryError::NoConsensus { .. }
            | GeometryError::DegenerateHomography => LocateError::TargetNotFound(err.to_string()),
            other => LocateError::Geometry(other),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for LocateError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        LocateError::ThreadPool(err)
    }
}

pub type LocateResult<T> = Result<T, LocateError>;
