//! Error types for layout operations.

use thiserror::Error;

/// Result type for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors that can occur in layout operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A canvas or element dimension was zero.
    #[error("Invalid dimension: {width}x{height} (both must be at least 1)")]
    InvalidDimension {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Two elements of one layout share an id.
    #[error("Duplicate element id: {0}")]
    DuplicateElement(String),

    /// The referenced layout does not exist.
    #[error("Layout not found: {0}")]
    LayoutNotFound(String),

    /// Layout serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Blob persistence I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// QR code encoding failed.
    #[error("QR encoding failed: {0}")]
    QrEncode(String),
}
