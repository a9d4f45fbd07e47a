//! Per-key observer registry.
//!
//! Observers are notified synchronously after a value is committed to the
//! session cache. Registration hands back an opaque handle; unsubscribing an
//! already-removed handle is a no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

/// Callback invoked with the new value of an observed key.
pub type ObserverFn = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle identifying one subscription on one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverHandle {
    key: String,
    id: Uuid,
}

impl ObserverHandle {
    /// The key this handle observes.
    pub fn key(&self) -> &str {
        &self.key
    }
}

struct Registered {
    id: Uuid,
    callback: ObserverFn,
}

/// Registry mapping keys to their ordered observer lists.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Mutex<HashMap<String, Vec<Registered>>>,
}

impl ObserverRegistry {
    /// Register a callback for `key`, returning its handle.
    pub(crate) fn subscribe(&self, key: impl Into<String>, callback: ObserverFn) -> ObserverHandle {
        let key = key.into();
        let id = Uuid::new_v4();
        self.observers
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .push(Registered { id, callback });
        ObserverHandle { key, id }
    }

    /// Remove the subscription identified by `handle`, if still present.
    pub(crate) fn unsubscribe(&self, handle: &ObserverHandle) {
        let mut observers = self.observers.lock().unwrap();
        if let Some(list) = observers.get_mut(&handle.key) {
            list.retain(|r| r.id != handle.id);
            if list.is_empty() {
                observers.remove(&handle.key);
            }
        }
    }

    /// Invoke every observer of `key` with `value`, in subscription order.
    pub(crate) fn notify(&self, key: &str, value: &Value) {
        // Snapshot the callbacks so observers can re-subscribe without
        // deadlocking against the registry lock.
        let callbacks: Vec<ObserverFn> = {
            let observers = self.observers.lock().unwrap();
            match observers.get(key) {
                Some(list) => list.iter().map(|r| r.callback.clone()).collect(),
                None => return,
            }
        };
        for callback in callbacks {
            callback(value);
        }
    }
}
