//! Error types for identity operations.

use thiserror::Error;

/// Errors from the identity provider boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuthError {
    /// An operation required a signed-in user.
    #[error("No user is signed in")]
    NotSignedIn,

    /// The identity provider could not complete a sign-in or sign-up.
    ///
    /// Unlike storage failures, identity failures during sign-in flows are
    /// surfaced to the caller rather than degraded.
    #[error("Identity provider error: {reason}")]
    Provider { reason: String },
}

impl AuthError {
    /// Check if this error means no user was signed in.
    pub fn is_not_signed_in(&self) -> bool {
        matches!(self, AuthError::NotSignedIn)
    }
}
