//! Flat key-value storage backends for the registry.
//!
//! The registry mediates every read and write through a [`StorageBackend`].
//! Two implementations are provided:
//! - [`MemoryBackend`]: process-local, insertion-ordered; the swappable
//!   test double.
//! - [`SqliteBackend`]: durable single-file store.
//!
//! Backends are string-keyed and namespace-agnostic; they may hold records
//! that do not belong to any registry. Filtering is the registry's job.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::StorageBackend;
