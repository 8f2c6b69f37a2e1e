//! Cairn Props - explicit property-metadata side-table.
//!
//! Attaches arbitrary JSON configuration objects to named properties of
//! arbitrary types and retrieves them later, either per property or as the
//! full list of tracked properties for a type. Registration is explicit,
//! at construction time; lookups are plain map reads keyed by type identity
//! and property name. No reflection, no ambient globals.
//!
//! This crate is independent of `cairn-registry`: the two are separate
//! systems that happen to share a codebase.
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn_props::PropTable;
//! use serde_json::json;
//!
//! struct TextComponent;
//!
//! let table = PropTable::new();
//! table.register::<TextComponent>(
//!     "text",
//!     json!({"control": "input", "type": "text", "placeholder": "Enter some text"}),
//! );
//!
//! let config = table.config_for::<TextComponent>("text");
//! let all = table.props_of::<TextComponent>();
//! ```

use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One tracked property of a type, with its configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PropBinding {
    pub property: &'static str,
    pub config: Value,
}

/// Side-table mapping `(owner type, property name)` to a configuration
/// object.
///
/// Registration order is preserved per type; re-registering a property
/// replaces its configuration in place, so constructors that run more than
/// once stay idempotent.
#[derive(Default)]
pub struct PropTable {
    entries: Mutex<HashMap<TypeId, Vec<PropBinding>>>,
}

impl PropTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<TypeId, Vec<PropBinding>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a configuration object to a named property of `T`.
    pub fn register<T: 'static>(&self, property: &'static str, config: Value) {
        let mut entries = self.lock_entries();
        let bindings = entries.entry(TypeId::of::<T>()).or_default();
        match bindings.iter_mut().find(|b| b.property == property) {
            Some(existing) => existing.config = config,
            None => bindings.push(PropBinding { property, config }),
        }
    }

    /// The configuration for one named property of `T`, if tracked.
    pub fn config_for<T: 'static>(&self, property: &str) -> Option<Value> {
        self.lock_entries()
            .get(&TypeId::of::<T>())
            .and_then(|bindings| bindings.iter().find(|b| b.property == property))
            .map(|b| b.config.clone())
    }

    /// Every tracked property of `T` with its configuration, in
    /// registration order. Empty when nothing is tracked for `T`.
    pub fn props_of<T: 'static>(&self) -> Vec<PropBinding> {
        self.lock_entries()
            .get(&TypeId::of::<T>())
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any property of `T` is tracked.
    pub fn tracks<T: 'static>(&self) -> bool {
        self.lock_entries().contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TextComponent;
    struct ImageComponent;

    #[test]
    fn config_is_keyed_by_type_and_property() {
        let table = PropTable::new();
        table.register::<TextComponent>("text", json!({"control": "input"}));

        assert_eq!(
            table.config_for::<TextComponent>("text"),
            Some(json!({"control": "input"}))
        );
        assert_eq!(table.config_for::<TextComponent>("other"), None);
        assert_eq!(table.config_for::<ImageComponent>("text"), None);
    }

    #[test]
    fn props_of_preserves_registration_order() {
        let table = PropTable::new();
        table.register::<TextComponent>("text", json!(1));
        table.register::<TextComponent>("placeholder", json!(2));
        table.register::<TextComponent>("rows", json!(3));

        let props: Vec<&'static str> = table
            .props_of::<TextComponent>()
            .into_iter()
            .map(|b| b.property)
            .collect();
        assert_eq!(props, vec!["text", "placeholder", "rows"]);
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let table = PropTable::new();
        table.register::<TextComponent>("text", json!({"v": 1}));
        table.register::<TextComponent>("rows", json!(4));
        table.register::<TextComponent>("text", json!({"v": 2}));

        assert_eq!(
            table.config_for::<TextComponent>("text"),
            Some(json!({"v": 2}))
        );
        let props: Vec<&'static str> = table
            .props_of::<TextComponent>()
            .into_iter()
            .map(|b| b.property)
            .collect();
        assert_eq!(props, vec!["text", "rows"]);
    }

    #[test]
    fn untracked_type_yields_empty_list() {
        let table = PropTable::new();
        assert!(table.props_of::<ImageComponent>().is_empty());
        assert!(!table.tracks::<ImageComponent>());
    }
}
