//! Error types for session operations.

use thiserror::Error;

/// Validation errors from session operations.
///
/// These are the only session errors callers ever see: remote-store failures
/// are reported through tracing and the failure counter instead, so the
/// in-memory contract never breaks.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// Keys must be non-empty strings.
    #[error("Key must be a non-empty string")]
    EmptyKey,

    /// Lesson identifiers must be non-empty strings.
    #[error("Lesson id must be a non-empty string")]
    EmptyLessonId,
}

impl SessionError {
    /// Check if this error is an input validation failure.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            SessionError::EmptyKey | SessionError::EmptyLessonId
        )
    }
}
