//! Error types for point sets, grids and transforms.

use thiserror::Error;

/// Errors raised by the geometric building blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A transform was asked about a parameter it does not own.
    #[error("Unknown parameter '{name}' for {transform} (expected one of {expected:?})")]
    UnknownParameter {
        transform: &'static str,
        name: String,
        expected: &'static [&'static str],
    },

    /// Two sequences that must line up element by element do not.
    #[error("Length mismatch: {what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Control-point grid geometry is unusable.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// An operation needs at least one point.
    #[error("Point set is empty: {0}")]
    EmptyPointSet(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an invalid grid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create an empty point set error.
    pub fn empty(msg: impl Into<String>) -> Self {
        Self::EmptyPointSet(msg.into())
    }
}
