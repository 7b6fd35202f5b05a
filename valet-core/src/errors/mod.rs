//! Error taxonomy for the memory engine.
//!
//! Every mutating operation either fully succeeds or fails with one of
//! these typed errors; there is no partial-success response for a
//! single-entity operation.

mod storage_error;

pub use storage_error::StorageError;

use crate::memory::EntityKind;

/// Top-level error type shared by every engine crate.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Caller error: bad permanence value, forget/confirm on an
    /// episode, malformed weights, unknown entity kind. Never retried.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// Unknown id for the given entity kind.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Concurrent supersession race detected by the storage-layer
    /// uniqueness constraint. The writer retries once before surfacing.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// An external collaborator (embedder, proposer) failed.
    #[error("collaborator '{collaborator}' failed: {reason}")]
    Collaborator { collaborator: String, reason: String },

    /// Storage-layer failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MemoryError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict { reason: reason.into() }
    }

    pub fn collaborator(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the workspace.
pub type MemoryResult<T> = Result<T, MemoryError>;
