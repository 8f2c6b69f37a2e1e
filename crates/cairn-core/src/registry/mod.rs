//! The reactive registry: logical keys mapped to live cells, kept
//! consistent with the storage backend.

mod cell;
mod state;

pub use cell::{StreamEvent, Subscription, ValueStream};
pub use state::StateStream;

use crate::backend::StorageBackend;
use crate::config::RegistryConfig;
use crate::error::{CairnError, Result};
use cell::Cell;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Reactive, namespaced key-value registry.
///
/// Owns one [`Cell`] per live logical key and mediates every read and write
/// through the injected [`StorageBackend`]. The backend, not the in-memory
/// cell, is the source of truth: reads reconcile against it on every access
/// (read-through refresh), and writes persist before publishing so a
/// subscriber that reads the backend sees the just-written record.
///
/// The registry is an explicit, constructible object; create as many
/// isolated instances as needed (e.g. one per test) and inject the backend.
///
/// # Example
///
/// ```rust,ignore
/// use cairn_registry::{MemoryBackend, Registry};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let registry = Registry::new(Arc::new(MemoryBackend::new()));
/// registry.set_data("about-page", &json!({"headline": "About Us"}))?;
///
/// let stream = registry.get_data("about-page")?;
/// let _sub = stream.subscribe(|event| println!("{event:?}"));
/// ```
pub struct Registry {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
    cells: Mutex<HashMap<String, Arc<Cell>>>,
}

impl Registry {
    /// Create a registry over `backend` with the default namespace prefix.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_prefix(backend, RegistryConfig::DEFAULT_PREFIX)
    }

    /// Create a registry with an explicit namespace prefix.
    ///
    /// The prefix distinguishes this registry's backend records from
    /// unrelated data sharing the same backend.
    pub fn with_prefix(backend: Arc<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// The namespace prefix in use.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // ========================================
    // Storage key namespacing
    // ========================================

    /// The backend key for a logical key: `<prefix>-<key>`.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}{}", self.prefix, RegistryConfig::SEPARATOR, key)
    }

    /// The logical key for a backend key, or `None` if the backend key is
    /// outside this registry's namespace.
    ///
    /// Inverse of [`storage_key`](Self::storage_key):
    /// `base_key(storage_key(k)) == Some(k)` for every logical key.
    pub fn base_key<'a>(&self, storage_key: &'a str) -> Option<&'a str> {
        storage_key
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix(RegistryConfig::SEPARATOR))
    }

    /// Whether a backend key belongs to this registry's namespace.
    pub fn is_namespaced(&self, storage_key: &str) -> bool {
        self.base_key(storage_key).is_some()
    }

    // ========================================
    // Registry operations
    // ========================================

    /// Fetch the live value stream for a key.
    ///
    /// First access to an unknown key reads and decodes the backend record
    /// (absence and a persisted `null` both decode to `Value::Null`) and
    /// creates the cell seeded with that value. On a known key the backend
    /// is re-read and the fresh value re-published into the existing cell
    /// before the stream is returned, so the caller observes the latest
    /// persisted state even if it was mutated by another path.
    pub fn get_data(&self, key: &str) -> Result<ValueStream> {
        let storage_key = self.storage_key(key);
        let raw = self.backend.get(&storage_key)?;
        let value = decode_record(&storage_key, raw)?;

        let existing = self.lock_cells().get(key).cloned();
        let cell = match existing {
            Some(cell) => {
                // Read-through refresh: reconcile the cell with the backend.
                cell.publish(value);
                cell
            }
            None => {
                debug!("Hydrated new cell for key: {}", key);
                self.create_cell(key, value)?
            }
        };
        Ok(ValueStream::new(cell))
    }

    /// Set a key's value: persist first, then publish.
    ///
    /// Creates the cell if the key is unknown; otherwise pushes the value
    /// into the existing cell, notifying subscribers synchronously in
    /// subscription order.
    pub fn set_data<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| CairnError::Encode {
            key: key.to_string(),
            source: e,
        })?;
        let storage_key = self.storage_key(key);
        self.backend.set(&storage_key, &value.to_string())?;
        self.publish_value(key, value)
    }

    /// Whether the key currently has a live cell. This is an in-memory
    /// check only; it says nothing about the backend.
    pub fn key_exists(&self, key: &str) -> bool {
        self.lock_cells().contains_key(key)
    }

    /// Delete a key: complete its cell (terminating the stream for all
    /// current and future subscribers), remove it from the mapping, and
    /// erase its backend record.
    pub fn delete(&self, key: &str) -> Result<()> {
        let cell = self
            .lock_cells()
            .get(key)
            .cloned()
            .ok_or_else(|| CairnError::KeyNotFound {
                key: key.to_string(),
            })?;

        // Completion observers may still consult the mapping; remove the
        // entry only once they have run.
        cell.complete();
        self.lock_cells().remove(key);
        self.backend.remove(&self.storage_key(key))?;
        debug!("Deleted registry key: {}", key);
        Ok(())
    }

    /// Hydrate the registry from the backend.
    ///
    /// Enumerates every backend record; records inside the namespace are
    /// decoded and published under their logical key through the same path
    /// as [`set_data`](Self::set_data). Foreign records are skipped and the
    /// scan continues. A malformed record aborts the pass with
    /// [`CairnError::Decode`]; entries hydrated before it remain.
    pub fn load(&self) -> Result<()> {
        let total = self.backend.len()?;
        let mut loaded = 0usize;
        for index in 0..total {
            let Some(storage_key) = self.backend.key_at(index)? else {
                break;
            };
            let Some(base) = self.base_key(&storage_key).map(str::to_string) else {
                continue;
            };
            let raw = self.backend.get(&storage_key)?;
            let value = decode_record(&storage_key, raw)?;
            self.publish_value(&base, value)?;
            loaded += 1;
        }
        debug!("Loaded {} of {} backend records", loaded, total);
        Ok(())
    }

    /// Tear down every namespaced key: complete each live cell, clear the
    /// mapping, and erase every namespaced backend record. Records outside
    /// the namespace are untouched.
    pub fn reset(&self) -> Result<()> {
        // Collect first: deleting while enumerating by index would skew
        // the backend's key order mid-scan.
        let mut keys = Vec::new();
        let total = self.backend.len()?;
        for index in 0..total {
            let Some(storage_key) = self.backend.key_at(index)? else {
                break;
            };
            if let Some(base) = self.base_key(&storage_key) {
                keys.push(base.to_string());
            }
        }

        for key in keys {
            if self.key_exists(&key) {
                self.delete(&key)?;
            } else {
                // Record populated out-of-band; no cell to tear down.
                self.backend.remove(&self.storage_key(&key))?;
            }
        }
        debug!("Registry reset complete");
        Ok(())
    }

    /// Live aggregate stream over every currently-known key. Equivalent to
    /// [`state_with`](Self::state_with) with a filter admitting everything.
    pub fn state(&self) -> StateStream {
        self.state_with(|_| true)
    }

    /// Live aggregate stream with a per-value filter.
    ///
    /// The filter is applied to each value before the composite is built,
    /// so a key whose value fails the filter is omitted entirely rather
    /// than assembled and discarded.
    pub fn state_with<F>(&self, filter: F) -> StateStream
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let cells: Vec<(String, Arc<Cell>)> = self
            .lock_cells()
            .iter()
            .map(|(key, cell)| (key.clone(), cell.clone()))
            .collect();
        StateStream::new(cells, filter)
    }

    // ========================================
    // Internals
    // ========================================

    /// Cell observers never run under this lock; a poisoned map only means
    /// a panic during bookkeeping, so recover the state.
    fn lock_cells(&self) -> MutexGuard<'_, HashMap<String, Arc<Cell>>> {
        self.cells.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create-or-publish, shared by `set_data` and `load`. The backend
    /// record is assumed current at this point.
    fn publish_value(&self, key: &str, value: Value) -> Result<()> {
        let existing = self.lock_cells().get(key).cloned();
        match existing {
            Some(cell) => {
                cell.publish(value);
                Ok(())
            }
            None => self.create_cell(key, value).map(|_| ()),
        }
    }

    /// Register a fresh cell. Exactly one cell exists per live key; a
    /// second registration is a programming error.
    fn create_cell(&self, key: &str, value: Value) -> Result<Arc<Cell>> {
        let mut cells = self.lock_cells();
        if cells.contains_key(key) {
            warn!("Attempted to create duplicate cell for key: {}", key);
            return Err(CairnError::AlreadyExists {
                key: key.to_string(),
            });
        }
        let cell = Cell::new(value);
        cells.insert(key.to_string(), cell.clone());
        Ok(cell)
    }
}

/// Decode a raw backend record. Absence decodes to `Value::Null`; malformed
/// JSON surfaces as [`CairnError::Decode`] rather than being coerced.
fn decode_record(storage_key: &str, raw: Option<String>) -> Result<Value> {
    match raw {
        None => Ok(Value::Null),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| CairnError::Decode {
            storage_key: storage_key.to_string(),
            source: e,
        }),
    }
}
