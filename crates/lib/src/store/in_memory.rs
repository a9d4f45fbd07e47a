//! In-memory document store.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::clock::{Clock, SystemClock};
use crate::constants::UPDATED_AT_FIELD;
use crate::store::{DocPath, Document, DocumentStore, StoreError};
use crate::{Error, Result};

#[cfg(any(test, feature = "testing"))]
use std::sync::atomic::AtomicBool;

/// A simple in-memory store implementation backed by a `BTreeMap`.
///
/// Suitable for development, testing, and ephemeral deployments. Basic
/// persistence is available via [`InMemory::save_to_file`] and
/// [`InMemory::load_from_file`], which serialize the document map to JSON.
///
/// Every operation is counted, so tests can assert how many remote calls an
/// operation performed (or that none happened at all).
#[derive(Debug)]
pub struct InMemory {
    /// Documents keyed by their full path string.
    docs: RwLock<BTreeMap<String, Document>>,
    /// Stamps `updatedAt` on merge writes.
    clock: Arc<dyn Clock>,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    lists: AtomicU64,
    batches: AtomicU64,
    /// When set, every operation fails with [`StoreError::Unavailable`].
    #[cfg(any(test, feature = "testing"))]
    offline: AtomicBool,
}

impl InMemory {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping timestamps from the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            clock,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            lists: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            #[cfg(any(test, feature = "testing"))]
            offline: AtomicBool::new(false),
        }
    }

    /// Serialize all documents to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let docs = self.docs.read().unwrap();
        let json = serde_json::to_string_pretty(&*docs)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a store previously written with [`InMemory::save_to_file`].
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let docs: BTreeMap<String, Document> = serde_json::from_str(&json)?;
        let store = Self::new();
        *store.docs.write().unwrap() = docs;
        Ok(store)
    }

    /// Number of point reads performed.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of merge writes performed.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of single-document deletes performed.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Number of child listings performed.
    pub fn lists(&self) -> u64 {
        self.lists.load(Ordering::Relaxed)
    }

    /// Number of atomic delete batches performed.
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Total number of store calls of any kind.
    pub fn total_calls(&self) -> u64 {
        self.reads() + self.writes() + self.deletes() + self.lists() + self.batches()
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    /// Check whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.read().unwrap().is_empty()
    }

    /// Simulate the store being unreachable.
    ///
    /// While offline, every operation fails with
    /// [`StoreError::Unavailable`] and has no effect on stored documents.
    #[cfg(any(test, feature = "testing"))]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn check_online(&self) -> Result<()> {
        #[cfg(any(test, feature = "testing"))]
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable {
                reason: "store offline".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for InMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemory {
    async fn read(&self, path: &DocPath) -> Result<Option<Document>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let docs = self.docs.read().unwrap();
        Ok(docs.get(path.as_str()).cloned())
    }

    async fn write_merge(&self, path: &DocPath, fields: Document) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let stamp = self.clock.now_rfc3339();
        let mut docs = self.docs.write().unwrap();
        let doc = docs.entry(path.as_str().to_string()).or_default();
        for (name, value) in fields {
            doc.insert(name, value);
        }
        doc.insert(UPDATED_AT_FIELD.to_string(), stamp.into());
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        self.docs.write().unwrap().remove(path.as_str());
        Ok(())
    }

    async fn list_children(&self, path: &DocPath) -> Result<Vec<(String, Document)>> {
        self.lists.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let prefix = format!("{}/", path.as_str());
        let docs = self.docs.read().unwrap();
        let children = docs
            .range(prefix.clone()..)
            .take_while(|(full, _)| full.starts_with(&prefix))
            .filter_map(|(full, doc)| {
                let id = &full[prefix.len()..];
                // Only direct children; deeper paths belong to subcollections.
                (!id.is_empty() && !id.contains('/')).then(|| (id.to_string(), doc.clone()))
            })
            .collect();
        Ok(children)
    }

    async fn batch_delete(&self, paths: &[DocPath]) -> Result<()> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.check_online().map_err(|e| match e {
            Error::Store(StoreError::Unavailable { reason }) => {
                StoreError::BatchFailed { reason }.into()
            }
            other => other,
        })?;
        // Single write lock: the batch is all-or-nothing.
        let mut docs = self.docs.write().unwrap();
        for path in paths {
            docs.remove(path.as_str());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
