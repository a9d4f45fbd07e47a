//! Document store abstraction and implementations.
//!
//! This module provides the [`DocumentStore`] trait and the path type used to
//! address documents. The trait models the subset of a hosted document
//! database the rest of the crate needs: point reads, merge writes, deletes,
//! child listing, and atomic batched deletes. Keeping it as a trait lets the
//! session layer run against test doubles and keeps the hosted vendor out of
//! the core.

use std::any::Any;
use std::fmt;

use async_trait::async_trait;

use crate::Result;
use crate::auth::UserId;
use crate::constants::{DATA_COLLECTION, PROGRESS_COLLECTION, USERS_COLLECTION};

mod errors;
pub use errors::StoreError;

mod in_memory;
pub use in_memory::InMemory;

/// A document: a flat JSON object of named fields.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Slash-separated path addressing a document or collection in the store.
///
/// The canonical shapes are `users/{user}`, `users/{user}/data/{key}` and
/// `users/{user}/progress/{lesson}`. Constructors build these shapes so call
/// sites never assemble raw strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// Path of a user's root document.
    pub fn user(user: &UserId) -> Self {
        DocPath(format!("{USERS_COLLECTION}/{user}"))
    }

    /// Path of a generic key/value document under a user.
    pub fn user_data(user: &UserId, key: impl AsRef<str>) -> Self {
        DocPath(format!(
            "{USERS_COLLECTION}/{user}/{DATA_COLLECTION}/{}",
            key.as_ref()
        ))
    }

    /// Path of the generic key/value collection under a user.
    pub fn data_collection(user: &UserId) -> Self {
        DocPath(format!("{USERS_COLLECTION}/{user}/{DATA_COLLECTION}"))
    }

    /// Path of a single lesson's progress document under a user.
    pub fn user_progress(user: &UserId, lesson_id: impl AsRef<str>) -> Self {
        DocPath(format!(
            "{USERS_COLLECTION}/{user}/{PROGRESS_COLLECTION}/{}",
            lesson_id.as_ref()
        ))
    }

    /// Path of the per-lesson progress collection under a user.
    pub fn progress_collection(user: &UserId) -> Self {
        DocPath(format!("{USERS_COLLECTION}/{user}/{PROGRESS_COLLECTION}"))
    }

    /// Path of a named child document under this collection path.
    pub fn child(&self, id: impl AsRef<str>) -> Self {
        DocPath(format!("{}/{}", self.0, id.as_ref()))
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote document store consumed by the session layer.
///
/// Implementations must be `Send + Sync` so a single store can be shared
/// across tasks, and expose `as_any` for downcasting where the binary needs
/// implementation-specific behavior (e.g. saving the in-memory store to disk
/// on shutdown).
///
/// Timestamps are a store concern: every merge write stamps an `updatedAt`
/// field server-side. Callers never supply their own.
#[async_trait]
pub trait DocumentStore: Send + Sync + Any {
    /// Read the document at `path`.
    ///
    /// # Returns
    /// `Ok(Some(document))` if present, `Ok(None)` if the path has no
    /// document, or an error for store failures.
    async fn read(&self, path: &DocPath) -> Result<Option<Document>>;

    /// Merge `fields` into the document at `path`, creating it if absent.
    ///
    /// Fields not named in `fields` are left untouched. The store stamps
    /// `updatedAt` on the document as part of the write.
    async fn write_merge(&self, path: &DocPath, fields: Document) -> Result<()>;

    /// Delete the document at `path`. Deleting a missing document is a no-op.
    async fn delete(&self, path: &DocPath) -> Result<()>;

    /// List the direct child documents of the collection at `path`.
    ///
    /// # Returns
    /// A sequence of `(id, document)` pairs, where `id` is the final path
    /// segment of each child.
    async fn list_children(&self, path: &DocPath) -> Result<Vec<(String, Document)>>;

    /// Delete every document in `paths` as a single atomic batch.
    ///
    /// Either all deletions apply or none do.
    async fn batch_delete(&self, paths: &[DocPath]) -> Result<()>;

    /// Access the concrete store type for downcasting.
    fn as_any(&self) -> &dyn Any;
}
