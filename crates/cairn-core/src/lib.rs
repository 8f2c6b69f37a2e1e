//! Cairn Registry - reactive namespaced key-value registry over a flat
//! persistent store.
//!
//! The registry keeps one live reactive cell per logical key consistent
//! with the raw records of a [`StorageBackend`]. Callers subscribe to
//! individual keys or to a filtered projection of the whole registry;
//! writes persist first and publish second, so subscribers always observe
//! backend state at least as fresh as the value they were handed.
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn_registry::{Registry, SqliteBackend, StreamEvent};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! fn main() -> cairn_registry::Result<()> {
//!     let backend = Arc::new(SqliteBackend::open("./cairn.sqlite")?);
//!     let registry = Registry::new(backend);
//!
//!     // Resynchronize from records persisted by a previous instance.
//!     registry.load()?;
//!
//!     registry.set_data("about-page", &json!({"headline": "About Us"}))?;
//!
//!     let stream = registry.get_data("about-page")?;
//!     let _sub = stream.subscribe(|event| {
//!         if let StreamEvent::Value(value) = event {
//!             println!("about-page is now {value}");
//!         }
//!     });
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod registry;

// Re-export commonly used types
pub use backend::{MemoryBackend, SqliteBackend, StorageBackend};
pub use error::{CairnError, Result};
pub use registry::{Registry, StateStream, StreamEvent, Subscription, ValueStream};
