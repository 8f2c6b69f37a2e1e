//! Storage backend trait.

use crate::error::Result;

/// Flat, string-keyed storage backend.
///
/// Operations are synchronous and apply immediately; there is no
/// transactionality. Implementations must be safe to share across threads,
/// but callers may assume every call completes without blocking on I/O
/// latency (the store is process-local).
pub trait StorageBackend: Send + Sync {
    /// Get the raw stored string for a key.
    ///
    /// Returns `Ok(None)` if the key is absent. Absence is never an error.
    fn get(&self, storage_key: &str) -> Result<Option<String>>;

    /// Create or overwrite the record for a key.
    fn set(&self, storage_key: &str, raw: &str) -> Result<()>;

    /// Remove the record for a key. No-op if absent.
    fn remove(&self, storage_key: &str) -> Result<()>;

    /// Number of records currently stored, including records outside any
    /// registry namespace.
    fn len(&self) -> Result<usize>;

    /// The key at `index` in the backend's stable enumeration order, or
    /// `None` past the end.
    ///
    /// Together with [`len`](Self::len) this allows full enumeration of all
    /// stored keys.
    fn key_at(&self, index: usize) -> Result<Option<String>>;
}
