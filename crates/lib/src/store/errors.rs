//! Error types for document store operations.

use thiserror::Error;

/// Errors that can occur when talking to a document store.
///
/// Implementations map their native failures onto these variants so callers
/// can classify without knowing which store is behind the trait.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document not found at the given path.
    #[error("Document not found: {path}")]
    NotFound { path: String },

    /// The store rejected the operation for permission reasons.
    #[error("Permission denied for {path}")]
    PermissionDenied { path: String },

    /// Network or availability failure reaching the store.
    #[error("Store unreachable: {reason}")]
    Unavailable { reason: String },

    /// A batched operation failed as a whole; no partial effects applied.
    #[error("Batch operation failed: {reason}")]
    BatchFailed { reason: String },

    /// Stored document could not be decoded.
    #[error("Malformed document at {path}: {reason}")]
    MalformedDocument { path: String, reason: String },
}

impl StoreError {
    /// Check if this error indicates a missing document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error indicates permission was denied.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }

    /// Check if this error is a network/availability failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable { .. } | StoreError::BatchFailed { .. }
        )
    }
}
