use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the decode engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The slide file does not exist
    #[error("Slide file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The engine could not parse the file
    #[error("Cannot open slide {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// Reading pixels from an opened slide failed
    #[error("Cannot read region at level {level}: {message}")]
    Read { level: usize, message: String },

    /// The engine raised an unexpected fault while probing a file
    #[error("Decode engine fault: {0}")]
    Fault(String),
}

/// A requested path was rejected because it cannot be confined to the root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Path rejected: {requested} ({reason})")]
pub struct PathRejected {
    /// The path as supplied by the caller
    pub requested: String,

    /// Why the path was rejected
    pub reason: &'static str,
}

/// Errors from directory navigation.
#[derive(Debug, Clone, Error)]
pub enum BrowseError {
    /// The path escapes the configured root
    #[error("Access denied: {requested}")]
    AccessDenied { requested: String },

    /// The confined path does not exist
    #[error("Directory not found: {path}")]
    NotFound { path: String },

    /// The confined path exists but is not a directory
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// The directory exists but could not be read
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },
}

impl From<PathRejected> for BrowseError {
    fn from(err: PathRejected) -> Self {
        BrowseError::AccessDenied {
            requested: err.requested,
        }
    }
}

/// Errors that can occur while serving tiles, metadata or overviews.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// No indexed slide has this identifier
    #[error("Slide not found: {slide_id}")]
    SlideNotFound { slide_id: String },

    /// Requested pyramid level does not exist
    #[error("Invalid level {level}: slide has {max_levels} levels")]
    InvalidLevel { level: usize, max_levels: usize },

    /// Invalid JPEG quality parameter
    #[error("Invalid quality {quality}: must be 1-100")]
    InvalidQuality { quality: u8 },

    /// A request parameter could not be parsed
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The decode engine failed while it should have succeeded
    #[error("Decode error: {0}")]
    Decode(#[from] EngineError),

    /// Failed to encode the output image
    #[error("Encode error: {message}")]
    Encode { message: String },

    /// The blocking worker running the request did not complete
    #[error("Worker error: {message}")]
    Worker { message: String },
}
