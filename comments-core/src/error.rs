//! Error types for the commenting engine.
//!
//! Reducers never fail: operating on a missing id is a no-op. These errors
//! only surface from boundary parsing (bootstrap data, stored positions) and
//! from the external persistence collaborator.

use crate::state::CommentId;

/// Error type for comment engine operations
#[derive(Debug, thiserror::Error)]
pub enum CommentsError {
    #[error("Invalid stored position for comment {comment_id}: {source}")]
    InvalidPosition {
        comment_id: CommentId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Block not found: {key}")]
    UnknownBlock { key: String },

    #[error("Range {start}..{end} out of bounds for block {key} (length {len})")]
    RangeOutOfBounds {
        key: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<serde_json::Error> for CommentsError {
    fn from(e: serde_json::Error) -> Self {
        CommentsError::InvalidPayload(e.to_string())
    }
}

/// Result type for comment engine operations
pub type Result<T> = std::result::Result<T, CommentsError>;

/// Failure reported by the persistence collaborator.
///
/// Recovered locally by moving the entity into a `*_error` mode.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),
}
