//! Application state shared by every conversation of one adapter.
//!
//! [`AppState`] is a handle to a single mapping. Cloning the handle does not
//! copy the mapping: every scope built by the same adapter sees the identical
//! instance, so a value stored while handling one request is visible in later
//! requests. Consistency under concurrent mutation is the managed
//! application's responsibility; the lock here only keeps individual
//! operations atomic.

use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared, mutable key/value state.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl AppState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state holding `values`.
    #[must_use]
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(values)),
        }
    }

    // The map is plain data, a panic in another holder leaves nothing half-built.
    fn read(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a copy of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.write().insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    /// Replace the whole contents, keeping the instance.
    pub fn replace(&self, values: Map<String, Value>) {
        *self.write() = values;
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.read().clone()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether both handles point at the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Map<String, Value>> for AppState {
    fn from(values: Map<String, Value>) -> Self {
        Self::from_map(values)
    }
}

impl PartialEq<Map<String, Value>> for AppState {
    fn eq(&self, other: &Map<String, Value>) -> bool {
        *self.read() == *other
    }
}
