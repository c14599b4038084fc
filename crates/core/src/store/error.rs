//! Errors raised at the storage seam.

use thiserror::Error;

/// Failure reported by a storage backend.
///
/// Domain services translate these into their own error types; a
/// `Conflict` always means a compare-and-set guard rejected the write and
/// nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An optimistic-lock or state guard did not match.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend failed (connection, constraint, serialization).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
