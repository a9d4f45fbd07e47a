//! Error types for the vendor proxy clients.

use thiserror::Error;

/// Errors from the speech and translation proxies.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Input text was empty or whitespace-only.
    #[error("Text is required")]
    EmptyText,

    /// Input text exceeded the accepted maximum.
    #[error("Text too long ({length} characters, max {max})")]
    TextTooLong { length: usize, max: usize },

    /// The vendor rejected or failed a request.
    #[error("Vendor error ({status}): {message}")]
    Vendor { status: u16, message: String },

    /// The vendor response could not be decoded.
    #[error("Malformed vendor response: {reason}")]
    MalformedResponse { reason: String },
}

impl ProxyError {
    /// Check if this error is an input validation failure.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ProxyError::EmptyText | ProxyError::TextTooLong { .. }
        )
    }

    /// Check if this error came back from the vendor.
    pub fn is_vendor_error(&self) -> bool {
        matches!(
            self,
            ProxyError::Vendor { .. } | ProxyError::MalformedResponse { .. }
        )
    }
}
