//!
//! Ulpan: cloud-backed keyed state and vendor API glue for a
//! language-learning app.
//!
//! ## Core Concepts
//!
//! * **Session (`session::Session`)**: The keyed state synchronizer. A fast
//!   in-memory cache over a per-user remote mirror, with per-key observer
//!   notification and graceful degradation to session-only storage when no
//!   user is signed in.
//! * **Document stores (`store::DocumentStore`)**: A pluggable remote
//!   document store addressed by `users/{user}/...` paths. `store::InMemory`
//!   is the bundled implementation for development and tests.
//! * **Identity (`auth::IdentityProvider`)**: The external identity provider
//!   boundary: a current user plus a stream of auth-state changes that drive
//!   session hydration and reset.
//! * **Billing (`billing`)**: Hosted checkout creation and signed webhook
//!   processing; subscription state itself belongs to the payment vendor.
//! * **Proxies (`proxy`)**: Validated pass-through clients for the speech
//!   and translation vendors.

pub mod auth;
pub mod billing;
pub mod clock;
pub mod constants;
pub mod proxy;
pub mod session;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use session::Session;

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Result type used throughout the Ulpan library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Ulpan library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured identity errors from the auth module
    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    /// Structured document store errors from the store module
    #[error(transparent)]
    Store(#[from] store::StoreError),

    /// Structured synchronizer errors from the session module
    #[error(transparent)]
    Session(#[from] session::SessionError),

    /// Structured billing errors from the billing module
    #[error(transparent)]
    Billing(#[from] billing::BillingError),

    /// Structured vendor proxy errors from the proxy module
    #[error(transparent)]
    Proxy(#[from] proxy::ProxyError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Auth(_) => "auth",
            Error::Store(_) => "store",
            Error::Session(_) => "session",
            Error::Billing(_) => "billing",
            Error::Proxy(_) => "proxy",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates permission was denied.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_permission_denied(),
            _ => false,
        }
    }

    /// Check if this error is an input validation failure.
    ///
    /// Validation failures are rejected synchronously, before any remote or
    /// vendor call is made.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Session(session_err) => session_err.is_validation_error(),
            Error::Billing(billing_err) => billing_err.is_validation_error(),
            Error::Proxy(proxy_err) => proxy_err.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error came back from an external vendor API.
    pub fn is_vendor_error(&self) -> bool {
        match self {
            Error::Billing(billing_err) => billing_err.is_vendor_error(),
            Error::Proxy(proxy_err) => proxy_err.is_vendor_error(),
            _ => false,
        }
    }

    /// Check if this error means a signed webhook delivery must be rejected.
    pub fn is_signature_error(&self) -> bool {
        match self {
            Error::Billing(billing_err) => billing_err.is_signature_error(),
            _ => false,
        }
    }

    /// Check if this error is a store availability failure.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_unavailable(),
            _ => false,
        }
    }
}

/// Strip trailing slashes from a caller-supplied origin.
pub(crate) fn trim_origin(mut origin: String) -> String {
    while origin.ends_with('/') {
        origin.pop();
    }
    origin
}
