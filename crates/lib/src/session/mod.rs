//! Keyed state synchronizer.
//!
//! [`Session`] gives application code a simple get/set/remove/clear API over
//! named JSON values while maintaining an in-memory cache, a per-user remote
//! mirror, and per-key observer notification. With no user signed in the
//! cache is the only source of truth; once a user signs in, writes are
//! mirrored to `users/{user}/data/{key}` and the cache is bulk-hydrated from
//! the remote namespace.
//!
//! Storage failures never surface to callers: reads degrade to the supplied
//! default and writes keep their optimistic local effect, with the failure
//! reported through tracing and [`Session::remote_write_failures`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;

use crate::Result;
use crate::auth::{IdentityProvider, UserId};
use crate::clock::{Clock, SystemClock};
use crate::constants::VALUE_FIELD;
use crate::store::{DocPath, Document, DocumentStore, StoreError};

mod errors;
pub use errors::SessionError;

mod observers;
use observers::ObserverRegistry;
pub use observers::{ObserverFn, ObserverHandle};

mod progress;
pub use progress::LessonRecord;

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Auth-dependent session state.
///
/// The generation counter is bumped on every sign-in and sign-out. Remote
/// operations snapshot it when they start and re-check it before touching the
/// cache, so an operation that raced an auth transition completes under the
/// identity it started with instead of polluting the next user's cache.
struct AuthState {
    user: Option<UserId>,
    generation: u64,
}

/// Cloud-backed keyed state for one application session.
///
/// Construct with an injected [`DocumentStore`] and drive auth transitions
/// either directly via [`Session::handle_auth_change`] or by attaching an
/// [`IdentityProvider`] stream with [`Session::attach`].
pub struct Session {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<AuthState>,
    cache: RwLock<HashMap<String, Value>>,
    observers: ObserverRegistry,
    remote_timeout: Duration,
    remote_write_failures: AtomicU64,
}

impl Session {
    /// Create a session over the given store, with no user signed in.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            state: RwLock::new(AuthState {
                user: None,
                generation: 0,
            }),
            cache: RwLock::new(HashMap::new()),
            observers: ObserverRegistry::default(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            remote_write_failures: AtomicU64::new(0),
        }
    }

    /// Replace the session clock. Used by calendar-sensitive tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound every remote call with the given timeout (default 10s).
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// The currently signed-in user, if any.
    pub fn current_user(&self) -> Option<UserId> {
        self.state.read().unwrap().user.clone()
    }

    /// Number of best-effort remote writes that failed since construction.
    pub fn remote_write_failures(&self) -> u64 {
        self.remote_write_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Forward an identity provider's auth-state stream into this session.
    ///
    /// Applies the state current at attach time, then follows every change
    /// until the provider is dropped. The session handle is moved into the
    /// forwarding task; returns that task's handle.
    pub fn attach(
        self: Arc<Self>,
        provider: &dyn IdentityProvider,
    ) -> tokio::task::JoinHandle<()> {
        let mut rx = provider.watch();
        tokio::spawn(async move {
            loop {
                let user = rx.borrow_and_update().clone();
                self.handle_auth_change(user).await;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Apply an auth-state transition.
    ///
    /// Sign-in records the user and bulk-hydrates the cache from the remote
    /// namespace. Sign-out resets the user and empties the cache. Both bump
    /// the session generation so in-flight remote reads from the previous
    /// identity cannot populate the new state.
    pub async fn handle_auth_change(&self, user: Option<UserId>) {
        match user {
            Some(user) => {
                {
                    let mut state = self.state.write().unwrap();
                    state.user = Some(user.clone());
                    state.generation += 1;
                }
                tracing::info!("user {user} signed in, hydrating session");
                let _ = self.load_all_data().await;
            }
            None => {
                {
                    let mut state = self.state.write().unwrap();
                    state.user = None;
                    state.generation += 1;
                }
                self.cache.write().unwrap().clear();
                tracing::info!("user signed out, session cache reset");
            }
        }
    }

    /// Store `value` under `key`.
    ///
    /// The cache is updated and observers of `key` are notified immediately;
    /// both happen whether or not a user is signed in. If one is, the value
    /// is additionally merge-written to the user's remote namespace. Remote
    /// failures are reported, never returned, and the cache is not rolled
    /// back.
    ///
    /// # Errors
    /// [`SessionError::EmptyKey`] if `key` is empty. No remote call is made.
    pub async fn set(&self, key: impl AsRef<str>, value: Value) -> Result<()> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(SessionError::EmptyKey.into());
        }

        self.cache
            .write()
            .unwrap()
            .insert(key.to_string(), value.clone());
        // Notification follows the confirmed local mutation, not remote
        // acknowledgement, so observers see identical behavior in the
        // signed-in and signed-out branches.
        self.observers.notify(key, &value);

        let Some(user) = self.current_user() else {
            tracing::warn!("no user signed in, storing '{key}' in session only");
            return Ok(());
        };

        let mut fields = Document::new();
        fields.insert(VALUE_FIELD.to_string(), value);
        let path = DocPath::user_data(&user, key);
        if let Err(e) = self.remote(self.store.write_merge(&path, fields)).await {
            self.remote_write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!("failed to persist '{key}' for {user}: {e}");
        }
        Ok(())
    }

    /// Fetch the value under `key`, or `default` if it cannot be produced.
    ///
    /// The cache always wins. On a miss with a user signed in, the remote
    /// document is read and (when found) cached; a missing document or any
    /// store failure degrades to `default` without caching it. Signed out,
    /// a miss returns `default` with no remote call.
    pub async fn get(&self, key: impl AsRef<str>, default: Value) -> Value {
        let key = key.as_ref();
        if let Some(value) = self.cache.read().unwrap().get(key) {
            return value.clone();
        }

        let (user, generation) = {
            let state = self.state.read().unwrap();
            (state.user.clone(), state.generation)
        };
        let Some(user) = user else {
            tracing::warn!("no user signed in, returning default for '{key}'");
            return default;
        };

        let path = DocPath::user_data(&user, key);
        match self.remote(self.store.read(&path)).await {
            Ok(Some(doc)) => match doc.get(VALUE_FIELD) {
                Some(value) => {
                    let value = value.clone();
                    // The read completes under the identity it started with,
                    // but only the same generation may cache its result.
                    if self.state.read().unwrap().generation == generation {
                        self.cache
                            .write()
                            .unwrap()
                            .insert(key.to_string(), value.clone());
                    }
                    value
                }
                None => {
                    tracing::warn!("document at {path} has no value field");
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                tracing::error!("failed to read '{key}' for {user}: {e}");
                default
            }
        }
    }

    /// Remove `key` locally and, when signed in, remotely.
    ///
    /// Removing an absent key is a no-op. Remote failures are reported, not
    /// returned.
    pub async fn remove(&self, key: impl AsRef<str>) -> Result<()> {
        let key = key.as_ref();
        self.cache.write().unwrap().remove(key);

        let Some(user) = self.current_user() else {
            return Ok(());
        };
        let path = DocPath::user_data(&user, key);
        if let Err(e) = self.remote(self.store.delete(&path)).await {
            self.remote_write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!("failed to delete '{key}' for {user}: {e}");
        }
        Ok(())
    }

    /// Empty the cache and, when signed in, the user's remote data namespace.
    ///
    /// Remote documents are deleted as a single atomic batch. Failures are
    /// reported, not returned.
    pub async fn clear(&self) -> Result<()> {
        self.cache.write().unwrap().clear();

        let Some(user) = self.current_user() else {
            return Ok(());
        };
        let collection = DocPath::data_collection(&user);
        let children = match self.remote(self.store.list_children(&collection)).await {
            Ok(children) => children,
            Err(e) => {
                tracing::error!("failed to enumerate data for {user}: {e}");
                return Ok(());
            }
        };
        if children.is_empty() {
            return Ok(());
        }
        let paths: Vec<DocPath> = children
            .iter()
            .map(|(id, _)| collection.child(id))
            .collect();
        if let Err(e) = self.remote(self.store.batch_delete(&paths)).await {
            self.remote_write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!("failed to clear remote data for {user}: {e}");
        }
        Ok(())
    }

    /// Bulk-load every stored value for the signed-in user into the cache.
    ///
    /// Remote values overwrite same-named cache entries: at hydration time
    /// the remote store is authoritative. No-op when signed out.
    pub async fn load_all_data(&self) -> Result<()> {
        let (user, generation) = {
            let state = self.state.read().unwrap();
            (state.user.clone(), state.generation)
        };
        let Some(user) = user else {
            return Ok(());
        };

        let collection = DocPath::data_collection(&user);
        match self.remote(self.store.list_children(&collection)).await {
            Ok(children) => {
                if self.state.read().unwrap().generation != generation {
                    // An auth transition happened mid-flight; this snapshot
                    // belongs to the old identity.
                    return Ok(());
                }
                let mut loaded = 0usize;
                let mut cache = self.cache.write().unwrap();
                for (id, doc) in children {
                    if let Some(value) = doc.get(VALUE_FIELD) {
                        cache.insert(id, value.clone());
                        loaded += 1;
                    }
                }
                drop(cache);
                tracing::info!("hydrated {loaded} values for {user}");
            }
            Err(e) => tracing::error!("failed to hydrate session for {user}: {e}"),
        }
        Ok(())
    }

    /// Register `callback` to run after each committed write of `key`.
    pub fn subscribe(&self, key: impl Into<String>, callback: ObserverFn) -> ObserverHandle {
        self.observers.subscribe(key, callback)
    }

    /// Remove a subscription. Unknown or already-removed handles are a no-op.
    pub fn unsubscribe(&self, handle: &ObserverHandle) {
        self.observers.unsubscribe(handle);
    }

    /// Run a store future under the session's remote timeout.
    pub(crate) async fn remote<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.remote_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable {
                reason: format!("remote call timed out after {:?}", self.remote_timeout),
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap();
        f.debug_struct("Session")
            .field("user", &state.user)
            .field("generation", &state.generation)
            .field("cached_keys", &self.cache.read().unwrap().len())
            .field("remote_timeout", &self.remote_timeout)
            .finish()
    }
}
