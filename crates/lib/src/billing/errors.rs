//! Error types for billing operations.

use thiserror::Error;

/// Errors from checkout creation and webhook processing.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BillingError {
    /// A required request field was missing or empty.
    #[error("{name} is required")]
    MissingField { name: &'static str },

    /// The signature header could not be parsed.
    #[error("Malformed signature header: {reason}")]
    MalformedSignatureHeader { reason: String },

    /// The payload signature did not match any provided signature.
    #[error("Webhook signature verification failed")]
    SignatureMismatch,

    /// The signed timestamp fell outside the accepted tolerance window.
    #[error("Webhook timestamp outside tolerance: skew of {skew_secs}s exceeds {tolerance_secs}s")]
    TimestampOutOfTolerance { skew_secs: i64, tolerance_secs: i64 },

    /// The event payload was not valid JSON of the expected shape.
    #[error("Malformed event payload: {reason}")]
    MalformedEvent { reason: String },

    /// The payment vendor rejected or failed a request.
    #[error("Payment vendor error ({status}): {message}")]
    Vendor { status: u16, message: String },

    /// The vendor response could not be decoded.
    #[error("Malformed vendor response: {reason}")]
    MalformedResponse { reason: String },
}

impl BillingError {
    /// Check if this error is an input validation failure.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, BillingError::MissingField { .. })
    }

    /// Check if this error means the signed event must be rejected.
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            BillingError::MalformedSignatureHeader { .. }
                | BillingError::SignatureMismatch
                | BillingError::TimestampOutOfTolerance { .. }
                | BillingError::MalformedEvent { .. }
        )
    }

    /// Check if this error came back from the payment vendor.
    pub fn is_vendor_error(&self) -> bool {
        matches!(
            self,
            BillingError::Vendor { .. } | BillingError::MalformedResponse { .. }
        )
    }
}
