//! In-memory storage backend.

use super::traits::StorageBackend;
use crate::error::{CairnError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local, insertion-ordered storage backend.
///
/// Serves as the swappable test double for anything that talks to a
/// [`StorageBackend`]. Enumeration order is insertion order; overwriting a
/// record keeps its original position, matching the durable backend's
/// rowid order.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, String>,
    /// Insertion order for `key_at`.
    order: Vec<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| CairnError::Io {
            message: "Memory backend lock poisoned".to_string(),
            source: None,
        })
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, storage_key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.records.get(storage_key).cloned())
    }

    fn set(&self, storage_key: &str, raw: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if inner
            .records
            .insert(storage_key.to_string(), raw.to_string())
            .is_none()
        {
            inner.order.push(storage_key.to_string());
        }
        Ok(())
    }

    fn remove(&self, storage_key: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.records.remove(storage_key).is_some() {
            inner.order.retain(|k| k != storage_key);
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock()?.records.len())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        Ok(self.lock()?.order.get(index).cloned())
    }
}
