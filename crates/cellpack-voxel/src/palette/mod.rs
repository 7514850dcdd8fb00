//! Bidirectional value ↔ small-integer-id dictionaries.
//!
//! A [`LocalPalette`] grows on demand and belongs to one buffer. A
//! [`GlobalPalette`] is a read-only projection over a shared
//! [`Registry`](crate::registry::Registry); its ids are fixed at startup.

mod global;
mod id_set;
mod local;

use std::fmt;
use std::hash::Hash;

pub use global::GlobalPalette;
pub use id_set::IdBitSet;
pub use local::LocalPalette;

use crate::error::StorageError;

/// Values a palette can store: small, copyable, hashable identifiers.
pub trait PaletteValue: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> PaletteValue for T where T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Which palette implementation backs a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteKind {
    /// Per-buffer palette that assigns ids on demand.
    Local,
    /// Projection over the process-wide registry.
    Global,
}

/// Shared capability set of local and global palettes.
pub trait Palette<V: PaletteValue>: Send + Sync + fmt::Debug {
    /// Returns the id of `value`, if it has one.
    fn get(&self, value: &V) -> Option<u32>;

    /// Returns the id of `value`, assigning one if needed.
    fn get_or_assign(&mut self, value: V) -> Result<u32, StorageError>;

    /// Reverse lookup.
    fn get_by_id(&self, id: u32) -> Option<V>;

    /// Frees the id held by `value`. Returns whether the value was present.
    fn remove(&mut self, value: &V) -> Result<bool, StorageError>;

    /// All `(id, value)` pairs, in ascending id order.
    fn entries(&self) -> Vec<(u32, V)>;

    /// Highest allocated id; sizes packed storage.
    fn highest_id(&self) -> u32;

    /// Number of values with an id.
    fn len(&self) -> usize;

    /// Returns `true` if no value has an id.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value substituted when a stored id fails to resolve.
    fn fallback(&self) -> V;

    /// Which implementation this is.
    fn kind(&self) -> PaletteKind;

    /// Deep-copies into a new box.
    fn box_clone(&self) -> Box<dyn Palette<V>>;
}

impl<V: PaletteValue> Clone for Box<dyn Palette<V>> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
