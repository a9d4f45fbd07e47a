use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use ulpan::auth::UserId;
use ulpan::constants::VALUE_FIELD;
use ulpan::store::{DocPath, Document, DocumentStore, InMemory};
use ulpan::{FixedClock, Result, Session};

/// Test fixture bundling a session with its injected collaborators.
///
/// The store and clock stay accessible so tests can seed remote documents,
/// advance calendar days, and assert on operation counters.
pub struct TestContext {
    pub store: Arc<InMemory>,
    pub clock: Arc<FixedClock>,
    pub session: Arc<Session>,
}

impl TestContext {
    /// A signed-out session over an empty store.
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::default());
        let store = Arc::new(InMemory::with_clock(clock.clone()));
        let session = Arc::new(Session::new(store.clone()).with_clock(clock.clone()));
        Self {
            store,
            clock,
            session,
        }
    }

    /// A session signed in as `user` (hydrated from the empty store).
    pub async fn signed_in(user: &str) -> Self {
        let ctx = Self::new();
        ctx.session
            .handle_auth_change(Some(UserId::new(user)))
            .await;
        ctx
    }

    /// Write a `{value: ...}` document straight into the remote store,
    /// bypassing the session.
    pub async fn seed_remote_value(&self, user: &str, key: &str, value: Value) {
        self.store
            .write_merge(&DocPath::user_data(&UserId::new(user), key), value_doc(value))
            .await
            .expect("failed to seed store");
    }
}

/// Build a `{value: ...}` document.
pub fn value_doc(value: Value) -> Document {
    let mut doc = Document::new();
    doc.insert(VALUE_FIELD.to_string(), value);
    doc
}

/// Store wrapper whose point reads block until the test releases them.
///
/// Used to interleave an auth transition with an in-flight remote read: the
/// test waits for the read to enter the store, flips the auth state, then
/// lets the read complete.
pub struct GatedStore {
    inner: InMemory,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    pub fn new(inner: InMemory) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Wait until a read has entered the store and is parked.
    pub async fn wait_for_read(&self) {
        self.entered.notified().await;
    }

    /// Let one parked read proceed.
    pub fn release_read(&self) {
        self.release.notify_one();
    }

    pub fn inner(&self) -> &InMemory {
        &self.inner
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn read(&self, path: &DocPath) -> Result<Option<Document>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.read(path).await
    }

    async fn write_merge(&self, path: &DocPath, fields: Document) -> Result<()> {
        self.inner.write_merge(path, fields).await
    }

    async fn delete(&self, path: &DocPath) -> Result<()> {
        self.inner.delete(path).await
    }

    async fn list_children(&self, path: &DocPath) -> Result<Vec<(String, Document)>> {
        self.inner.list_children(path).await
    }

    async fn batch_delete(&self, paths: &[DocPath]) -> Result<()> {
        self.inner.batch_delete(paths).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Spawn an axum router on an ephemeral port, returning its origin.
///
/// Used to stand in for vendor HTTP APIs in proxy and billing tests.
pub async fn spawn_stub_vendor(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind stub vendor");
    let addr = listener.local_addr().expect("failed to get stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub vendor failed");
    });
    format!("http://{addr}")
}
