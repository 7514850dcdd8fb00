//! Append-only value registry backing global palettes.
//!
//! The registry is built once during startup through [`RegistryBuilder`] and
//! then frozen into an [`Arc<Registry>`] that every global palette shares
//! without locking. The default value is always id 0, so zero-initialized
//! storage resolves to it.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::palette::PaletteValue;

/// Ids must fit a 16-bit atomic slot.
pub const MAX_REGISTRY_LEN: usize = 1 << 16;

/// Errors that can occur while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The value was already registered under the given id.
    #[error("value already registered with id {0}")]
    Duplicate(u32),
    /// All 65 536 slots have been consumed.
    #[error("registry is full (max {MAX_REGISTRY_LEN} values)")]
    Full,
}

/// Collects values during the registration phase.
#[derive(Debug)]
pub struct RegistryBuilder<V> {
    values: Vec<V>,
    ids: FxHashMap<V, u32>,
}

impl<V: PaletteValue> RegistryBuilder<V> {
    /// Starts a registry whose id 0 is `default`.
    pub fn new(default: V) -> Self {
        let mut ids = FxHashMap::default();
        ids.insert(default, 0);
        Self {
            values: vec![default],
            ids,
        }
    }

    /// Registers a new value and returns its id.
    ///
    /// Ids are assigned sequentially and never reused.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the value already has an id, or
    /// [`RegistryError::Full`] once 65 536 values exist.
    pub fn register(&mut self, value: V) -> Result<u32, RegistryError> {
        if let Some(&id) = self.ids.get(&value) {
            return Err(RegistryError::Duplicate(id));
        }
        if self.values.len() >= MAX_REGISTRY_LEN {
            return Err(RegistryError::Full);
        }
        let id = self.values.len() as u32;
        self.ids.insert(value, id);
        self.values.push(value);
        Ok(id)
    }

    /// Number of values registered so far, including the default.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`: the default value is registered on construction.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Freezes the registry.
    pub fn build(self) -> Arc<Registry<V>> {
        tracing::debug!(values = self.values.len(), "registry frozen");
        Arc::new(Registry {
            values: self.values,
            ids: self.ids,
        })
    }
}

/// Immutable value table with O(1) lookups in both directions.
#[derive(Debug)]
pub struct Registry<V> {
    /// Dense array where `index == id`.
    values: Vec<V>,
    ids: FxHashMap<V, u32>,
}

impl<V: PaletteValue> Registry<V> {
    /// Returns the id of `value`, if registered.
    pub fn id_of(&self, value: &V) -> Option<u32> {
        self.ids.get(value).copied()
    }

    /// Returns the value registered under `id`.
    pub fn value_of(&self, id: u32) -> Option<V> {
        self.values.get(id as usize).copied()
    }

    /// The value with id 0.
    pub fn default_value(&self) -> V {
        self.values[0]
    }

    /// Total number of registered values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false` for a built registry.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(id, value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, V)> + '_ {
        self.values.iter().enumerate().map(|(i, v)| (i as u32, *v))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_id_zero() {
        let registry = RegistryBuilder::new("air").build();
        assert_eq!(registry.default_value(), "air");
        assert_eq!(registry.id_of(&"air"), Some(0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut builder = RegistryBuilder::new("air");
        assert_eq!(builder.register("stone"), Ok(1));
        assert_eq!(builder.register("dirt"), Ok(2));
        assert_eq!(builder.register("grass"), Ok(3));
        let registry = builder.build();
        assert_eq!(registry.value_of(2), Some("dirt"));
        assert_eq!(registry.value_of(4), None);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = RegistryBuilder::new(0u32);
        builder.register(7).unwrap();
        assert_eq!(builder.register(7), Err(RegistryError::Duplicate(1)));
        assert_eq!(builder.register(0), Err(RegistryError::Duplicate(0)));
    }

    #[test]
    fn test_full_registry() {
        let mut builder = RegistryBuilder::new(0u32);
        for v in 1..MAX_REGISTRY_LEN as u32 {
            builder.register(v).unwrap();
        }
        assert_eq!(builder.register(u32::MAX), Err(RegistryError::Full));
    }

    #[test]
    fn test_iter_in_id_order() {
        let mut builder = RegistryBuilder::new('a');
        builder.register('b').unwrap();
        builder.register('c').unwrap();
        let registry = builder.build();
        let entries: Vec<_> = registry.iter().collect();
        assert_eq!(entries, vec![(0, 'a'), (1, 'b'), (2, 'c')]);
    }
}
