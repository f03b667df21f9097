//! Error types for Fibril.

use thiserror::Error;

/// Main error type for Fibril operations.
#[derive(Error, Debug)]
pub enum FibrilError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Feature has no coordinates")]
    EmptyFeature,

    #[error("Frame out of order: expected {expected}, got {got}")]
    FrameOrder { expected: usize, got: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Fibril operations.
pub type Result<T> = std::result::Result<T, FibrilError>;
