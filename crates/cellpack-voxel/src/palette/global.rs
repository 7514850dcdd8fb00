//! Read-only palette over the process-wide registry.

use std::sync::Arc;

use super::{Palette, PaletteKind, PaletteValue};
use crate::error::StorageError;
use crate::registry::Registry;

/// A palette whose ids are the registry's ids.
///
/// Cloning shares the registry. Removal is never allowed because other
/// buffers may still hold the same ids.
#[derive(Clone, Debug)]
pub struct GlobalPalette<V> {
    registry: Arc<Registry<V>>,
}

impl<V: PaletteValue> GlobalPalette<V> {
    /// Creates a palette projecting `registry`.
    pub fn new(registry: Arc<Registry<V>>) -> Self {
        Self { registry }
    }

    /// The registry this palette reads from.
    pub fn registry(&self) -> &Arc<Registry<V>> {
        &self.registry
    }
}

impl<V: PaletteValue> Palette<V> for GlobalPalette<V> {
    fn get(&self, value: &V) -> Option<u32> {
        self.registry.id_of(value)
    }

    fn get_or_assign(&mut self, value: V) -> Result<u32, StorageError> {
        self.registry
            .id_of(&value)
            .ok_or(StorageError::UnregisteredValue)
    }

    fn get_by_id(&self, id: u32) -> Option<V> {
        self.registry.value_of(id)
    }

    fn remove(&mut self, _value: &V) -> Result<bool, StorageError> {
        Err(StorageError::UnsupportedRemoval)
    }

    fn entries(&self) -> Vec<(u32, V)> {
        self.registry.iter().collect()
    }

    fn highest_id(&self) -> u32 {
        (self.registry.len() - 1) as u32
    }

    fn len(&self) -> usize {
        self.registry.len()
    }

    fn fallback(&self) -> V {
        self.registry.default_value()
    }

    fn kind(&self) -> PaletteKind {
        PaletteKind::Global
    }

    fn box_clone(&self) -> Box<dyn Palette<V>> {
        Box::new(self.clone())
    }
}
