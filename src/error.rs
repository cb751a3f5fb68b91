//! Error types for rastermesh

use std::io;
use thiserror::Error;

/// Result type for rastermesh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in rastermesh operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed file content
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Raster or block geometry that cannot be addressed
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Caller asked for a tile, block, feature or field that does not exist
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Operation or encoding not supported by the format
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A structural rewrite failed before the live file was replaced
    #[error("Rewrite failed: {0}")]
    Rewrite(String),
}

impl Error {
    pub(crate) fn invalid_format(msg: impl Into<String>) -> Self {
        Error::InvalidFormat(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    pub(crate) fn out_of_bounds(msg: impl Into<String>) -> Self {
        Error::OutOfBounds(msg.into())
    }
}
