//! Error types for the ordered-map backends.

use std::collections::TryReserveError;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by every backend.
///
/// No variant is produced after a partial mutation: a failed call leaves the
/// tree exactly as it was.
#[derive(Debug, Error)]
pub enum Error {
    // Invalid arguments
    #[error("record size must be non-zero")]
    ZeroRecordSize,

    #[error("record is {actual} bytes, tree stores {expected}-byte records")]
    RecordSize { expected: usize, actual: usize },

    #[error("fanout {fanout} is out of range (minimum {min}, node buffers must fit in usize)")]
    InvalidFanout { fanout: usize, min: usize },

    // Lookups
    #[error("key not found")]
    NotFound,

    #[error("tree is empty")]
    Empty,

    // Conflicts
    #[error("duplicate key")]
    DuplicateKey,

    // Growth
    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),

    #[error("tree cannot address more than {max} nodes")]
    Capacity { max: usize },
}
