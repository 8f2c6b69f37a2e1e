//! Centralized configuration for the Cairn registry.
//!
//! Constants only; anything callers may want to vary per instance (the
//! namespace prefix, the backend) is injected through constructors instead.

/// Registry-level configuration.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Default namespace prefix for storage keys.
    pub const DEFAULT_PREFIX: &'static str = "cairn";
    /// Separator between the prefix and the logical key.
    pub const SEPARATOR: char = '-';
}

/// Configuration for the SQLite storage backend.
pub struct StoreConfig;

impl StoreConfig {
    /// Busy timeout for concurrent openers of the same database file.
    pub const BUSY_TIMEOUT_MS: u32 = 5_000;
    /// Table holding the flat key-value records.
    pub const RECORDS_TABLE: &'static str = "records";
}
