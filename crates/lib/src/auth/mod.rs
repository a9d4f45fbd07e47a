//! Identity provider boundary.
//!
//! Authentication itself is delegated to an external identity provider; this
//! module only defines the contract the session layer consumes: a current
//! user and a stream of auth-state changes. [`LocalIdentity`] is the provided
//! implementation for development and tests.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

mod errors;
pub use errors::AuthError;

/// Stable identifier for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id from a provider-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::new(id)
    }
}

/// Source of the current user and auth-state change notifications.
///
/// `watch()` returns a receiver whose value is the currently signed-in user,
/// updated on every sign-in and sign-out. The session layer forwards those
/// transitions into its own lifecycle (hydrate on sign-in, reset on
/// sign-out).
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<UserId>;

    /// Subscribe to auth-state changes.
    fn watch(&self) -> watch::Receiver<Option<UserId>>;
}

/// Identity provider with locally driven sign-in state.
///
/// Stands in for a hosted provider during development and in tests: callers
/// flip the auth state explicitly and every watcher observes the change.
#[derive(Debug)]
pub struct LocalIdentity {
    tx: watch::Sender<Option<UserId>>,
}

impl LocalIdentity {
    /// Create a provider with no user signed in.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Sign a user in, notifying all watchers.
    pub fn sign_in(&self, user: UserId) {
        self.tx.send_replace(Some(user));
    }

    /// Sign the current user out, notifying all watchers.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for LocalIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.tx.subscribe()
    }
}
