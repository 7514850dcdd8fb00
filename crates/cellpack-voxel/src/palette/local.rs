//! Per-buffer palette that assigns the lowest free id on demand.

use rustc_hash::FxHashMap;

use super::{IdBitSet, Palette, PaletteKind, PaletteValue};
use crate::error::StorageError;

/// A palette owned by a single buffer.
///
/// Ids are dense: a new value always receives the lowest id not currently in
/// use, so ids freed by [`remove`](Palette::remove) are recycled first.
#[derive(Clone, Debug)]
pub struct LocalPalette<V> {
    value_to_id: FxHashMap<V, u32>,
    id_to_value: FxHashMap<u32, V>,
    used: IdBitSet,
    highest_id: u32,
    fallback: V,
}

impl<V: PaletteValue> LocalPalette<V> {
    /// Creates an empty palette. `fallback` is returned for ids that fail to
    /// resolve and is not assigned an id until first written.
    pub fn new(fallback: V) -> Self {
        Self {
            value_to_id: FxHashMap::default(),
            id_to_value: FxHashMap::default(),
            used: IdBitSet::new(),
            highest_id: 0,
            fallback,
        }
    }

    /// Rebuilds a palette from explicit `(id, value)` pairs.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::DuplicatePaletteEntry`] if an id or a value
    /// appears twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (u32, V)>,
        fallback: V,
    ) -> Result<Self, StorageError> {
        let mut palette = Self::new(fallback);
        for (id, value) in entries {
            if palette.used.contains(id) || palette.value_to_id.contains_key(&value) {
                return Err(StorageError::DuplicatePaletteEntry(id));
            }
            palette.insert(id, value);
        }
        Ok(palette)
    }

    fn insert(&mut self, id: u32, value: V) {
        self.used.insert(id);
        self.value_to_id.insert(value, id);
        self.id_to_value.insert(id, value);
        self.highest_id = self.highest_id.max(id);
    }
}

impl<V: PaletteValue> Palette<V> for LocalPalette<V> {
    fn get(&self, value: &V) -> Option<u32> {
        self.value_to_id.get(value).copied()
    }

    fn get_or_assign(&mut self, value: V) -> Result<u32, StorageError> {
        if let Some(&id) = self.value_to_id.get(&value) {
            return Ok(id);
        }
        let id = self.used.next_clear_bit(0);
        self.insert(id, value);
        tracing::trace!(id, ?value, "assigned local palette id");
        Ok(id)
    }

    fn get_by_id(&self, id: u32) -> Option<V> {
        self.id_to_value.get(&id).copied()
    }

    fn remove(&mut self, value: &V) -> Result<bool, StorageError> {
        let Some(id) = self.value_to_id.remove(value) else {
            return Ok(false);
        };
        self.id_to_value.remove(&id);
        self.used.remove(id);
        self.highest_id = self.used.last().unwrap_or(0);
        Ok(true)
    }

    fn entries(&self) -> Vec<(u32, V)> {
        let mut entries: Vec<_> = self.id_to_value.iter().map(|(&id, &v)| (id, v)).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    fn highest_id(&self) -> u32 {
        self.highest_id
    }

    fn len(&self) -> usize {
        self.value_to_id.len()
    }

    fn fallback(&self) -> V {
        self.fallback
    }

    fn kind(&self) -> PaletteKind {
        PaletteKind::Local
    }

    fn box_clone(&self) -> Box<dyn Palette<V>> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
