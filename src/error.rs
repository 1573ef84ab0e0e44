//! Custom error types for brisque-score.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the brisque-score library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Image dimensions are not supported.
    #[error("unsupported image dimensions {width}x{height}: {reason}")]
    UnsupportedDimensions {
        width: usize,
        height: usize,
        reason: String,
    },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Tensor samples fall outside the declared data range.
    #[error("tensor values [{min}, {max}] fall outside the declared data range [0, {data_range}]")]
    DataRange { min: f32, max: f32, data_range: f32 },

    /// Failed to download a model file.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// A model file could not be parsed.
    #[error("failed to parse model file {path}: {reason}")]
    ModelParse { path: PathBuf, reason: String },

    /// A model file is not cached and downloads are disabled.
    #[error("model {name} is not cached and downloads are disabled")]
    ModelMissing { name: String },

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for brisque-score operations.
pub type Result<T> = std::result::Result<T, Error>;
