//! Custom error types for stylecast.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the stylecast library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or decode an image file.
    #[error("failed to decode image from {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// The model download was cut off or could not be written.
    #[error("failed to download model {name}: {source}")]
    ModelDownloadIo {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// The model is neither cached nor downloadable.
    #[error("model {name} is not cached at {path} and no download url is configured")]
    ModelUnavailable { name: String, path: PathBuf },

    /// Failed to create or write into the model cache.
    #[error("model cache error at {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The background worker has shut down.
    #[error("stylization worker is closed")]
    WorkerClosed,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`Error`], as reported to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An input image is missing, unreadable or corrupt.
    Decode,
    /// The pretrained model could not be fetched or initialized.
    ModelLoad,
    /// Running the model failed.
    Stylization,
    /// Anything else (bad parameters, export, IO).
    Other,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode { .. } => ErrorKind::Decode,
            Self::ModelDownload { .. }
            | Self::ModelDownloadIo { .. }
            | Self::ModelLoad { .. }
            | Self::ModelUnavailable { .. }
            | Self::CacheDir { .. } => ErrorKind::ModelLoad,
            Self::Inference { .. } | Self::ShapeMismatch { .. } => ErrorKind::Stylization,
            Self::ImageSave { .. }
            | Self::InvalidParameter { .. }
            | Self::WorkerClosed
            | Self::Io(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for stylecast operations.
pub type Result<T> = std::result::Result<T, Error>;
