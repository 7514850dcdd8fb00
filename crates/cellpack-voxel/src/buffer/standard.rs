//! Bit-packed, single-writer buffer.

use cellpack_config::StorageConfig;
use glam::IVec3;
use rustc_hash::FxHashMap;

use super::{BufferKind, BufferOptions, OwnedBuffer, SharedBuffer, VoxelRead, VoxelWrite, resolve};
use crate::atomic::AtomicIdArray;
use crate::bit_packed::BitPackedArray;
use crate::bounds::Bounds;
use crate::error::StorageError;
use crate::nibble::NibbleArray;
use crate::palette::{LocalPalette, Palette, PaletteKind, PaletteValue};
use crate::snapshot::PackedSnapshot;
use crate::storage::{IdStorage, bits_for_highest_id, packed_storage, widen};

/// Palette-compressed storage for a bounded region.
///
/// Ids are bit-packed at the narrowest width the palette allows. When a
/// write assigns an id that no longer fits, the storage is rebuilt at a wider
/// width before the write lands.
#[derive(Clone, Debug)]
pub struct Buffer<V: PaletteValue> {
    bounds: Bounds,
    palette: Box<dyn Palette<V>>,
    storage: Box<dyn IdStorage>,
    options: BufferOptions,
}

impl<V: PaletteValue> Buffer<V> {
    /// Creates a buffer whose every cell holds id 0.
    ///
    /// The width is sized from the palette's current highest id.
    pub fn new(
        bounds: Bounds,
        palette: Box<dyn Palette<V>>,
        options: BufferOptions,
    ) -> Result<Self, StorageError> {
        if bounds.is_empty() {
            return Err(StorageError::EmptyBounds);
        }
        bounds.check_range()?;
        let bits = bits_for_highest_id(palette.highest_id(), options.min_width());
        let storage = packed_storage(bits, bounds.volume(), options.nibble_fast_path)?;
        Ok(Self {
            bounds,
            palette,
            storage,
            options,
        })
    }

    /// Creates a buffer with every cell set to `fill`.
    pub fn filled(
        bounds: Bounds,
        palette: Box<dyn Palette<V>>,
        options: BufferOptions,
        fill: V,
    ) -> Result<Self, StorageError> {
        let mut buffer = Self::new(bounds, palette, options)?;
        buffer.fill(fill)?;
        Ok(buffer)
    }

    /// Creates a buffer over a fresh [`LocalPalette`] filled with `fill`,
    /// which doubles as the fallback value.
    pub fn local(bounds: Bounds, fill: V) -> Result<Self, StorageError> {
        Self::filled(
            bounds,
            Box::new(LocalPalette::new(fill)),
            BufferOptions::default(),
            fill,
        )
    }

    /// Creates the block section at section coordinate `section`.
    pub fn section(
        config: &StorageConfig,
        section: IVec3,
        palette: Box<dyn Palette<V>>,
        fill: V,
    ) -> Result<Self, StorageError> {
        let edge = config.section_edge;
        let bounds = Bounds::cube(section * edge as i32, edge);
        Self::filled(bounds, palette, BufferOptions::blocks(config), fill)
    }

    /// Creates the 2-D biome area of the chunk column at `(chunk_x, chunk_z)`.
    ///
    /// Each cell covers `biome_cell_edge` blocks along x and z.
    pub fn biome_area(
        config: &StorageConfig,
        chunk_x: i32,
        chunk_z: i32,
        palette: Box<dyn Palette<V>>,
        fill: V,
    ) -> Result<Self, StorageError> {
        let edge = config.biome_edge();
        let bounds = Bounds::area(chunk_x * edge as i32, chunk_z * edge as i32, edge, edge);
        Self::filled(bounds, palette, BufferOptions::biomes(config), fill)
    }

    /// Rebuilds a buffer from the packed wire triple.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot does not cover `bounds`, its words do not match
    /// its width, its palette repeats an entry, or a stored id is missing from
    /// its palette.
    pub fn from_snapshot(
        bounds: Bounds,
        snapshot: &PackedSnapshot<V>,
        fallback: V,
        options: BufferOptions,
    ) -> Result<Self, StorageError> {
        if bounds.is_empty() {
            return Err(StorageError::EmptyBounds);
        }
        bounds.check_range()?;
        if snapshot.len != bounds.volume() {
            return Err(StorageError::LengthMismatch {
                expected: bounds.volume(),
                actual: snapshot.len,
            });
        }
        let palette = LocalPalette::from_entries(snapshot.palette.iter().copied(), fallback)?;
        let bits = snapshot.bits_per_entry;
        let storage: Box<dyn IdStorage> = if bits == 4 && options.nibble_fast_path {
            Box::new(NibbleArray::from_words(snapshot.len, &snapshot.words)?)
        } else {
            Box::new(BitPackedArray::from_raw(
                bits,
                snapshot.len,
                snapshot.words.clone(),
            )?)
        };
        for i in 0..storage.len() {
            let id = storage.get(i)?;
            if palette.get_by_id(id).is_none() {
                return Err(StorageError::UnknownPaletteId(id));
            }
        }
        tracing::debug!(
            cells = snapshot.len,
            bits,
            palette_len = snapshot.palette.len(),
            "decoded buffer snapshot"
        );
        Ok(Self {
            bounds,
            palette: Box::new(palette),
            storage,
            options,
        })
    }

    /// Builds a standard buffer from already-validated ids.
    pub(crate) fn from_ids(
        bounds: Bounds,
        palette: Box<dyn Palette<V>>,
        ids: &[u32],
        options: BufferOptions,
    ) -> Result<Self, StorageError> {
        let highest = ids.iter().copied().max().unwrap_or(0).max(palette.highest_id());
        let bits = bits_for_highest_id(highest, options.min_width());
        let mut storage = packed_storage(bits, bounds.volume(), options.nibble_fast_path)?;
        for (i, &id) in ids.iter().enumerate() {
            storage.set(i, id)?;
        }
        Ok(Self {
            bounds,
            palette,
            storage,
            options,
        })
    }

    /// Sets every cell to `value`, resetting storage to the narrowest width
    /// the palette allows.
    pub fn fill(&mut self, value: V) -> Result<(), StorageError> {
        let id = self.palette.get_or_assign(value)?;
        let bits = bits_for_highest_id(self.palette.highest_id(), self.options.min_width());
        let mut storage = packed_storage(bits, self.bounds.volume(), self.options.nibble_fast_path)?;
        if id != 0 {
            for i in 0..storage.len() {
                storage.set(i, id)?;
            }
        }
        self.storage = storage;
        Ok(())
    }

    /// Drops palette entries no cell uses, renumbers the rest densely, and
    /// shrinks storage to the narrowest width that fits.
    ///
    /// Only local palettes are compacted; returns `false` for a global one.
    /// Scans every cell, so call it before saving, not after every write.
    pub fn compact(&mut self) -> Result<bool, StorageError> {
        if self.palette.kind() != PaletteKind::Local {
            return Ok(false);
        }
        let mut compacted = LocalPalette::new(self.palette.fallback());
        let mut remap: FxHashMap<u32, u32> = FxHashMap::default();
        let mut ids = Vec::with_capacity(self.storage.len());
        for i in 0..self.storage.len() {
            let old = self.storage.get(i)?;
            let new = match remap.get(&old) {
                Some(&new) => new,
                None => {
                    let pos = self.bounds.position_of(i);
                    let value = resolve(self.palette.as_ref(), old, pos);
                    let new = compacted.get_or_assign(value)?;
                    remap.insert(old, new);
                    new
                }
            };
            ids.push(new);
        }

        let before = (self.palette.len(), self.storage.bits_per_entry());
        let rebuilt = Self::from_ids(self.bounds, Box::new(compacted), &ids, self.options)?;
        *self = rebuilt;
        tracing::debug!(
            palette_before = before.0,
            palette_after = self.palette.len(),
            bits_before = before.1,
            bits_after = self.storage.bits_per_entry(),
            "compacted buffer"
        );
        Ok(true)
    }

    /// Captures the `(palette entries, bits per entry, packed words)` triple.
    pub fn snapshot(&self) -> PackedSnapshot<V> {
        PackedSnapshot {
            palette: self.palette.entries(),
            bits_per_entry: self.storage.bits_per_entry(),
            len: self.storage.len(),
            words: self.storage.to_words(),
        }
    }

    /// Current packed width.
    pub fn bits_per_entry(&self) -> u8 {
        self.storage.bits_per_entry()
    }

    /// Bytes used by the id storage.
    pub fn storage_bytes(&self) -> usize {
        self.storage.storage_bytes()
    }

    /// The palette.
    pub fn palette(&self) -> &dyn Palette<V> {
        self.palette.as_ref()
    }

    /// Mutable palette access for collaborators that manage ids directly.
    ///
    /// Removing a value that cells still hold makes those cells read as the
    /// fallback (or as whichever value later reuses the id).
    pub fn palette_mut(&mut self) -> &mut dyn Palette<V> {
        self.palette.as_mut()
    }

    /// The id storage.
    pub fn storage(&self) -> &dyn IdStorage {
        self.storage.as_ref()
    }

    fn index_of(&self, pos: IVec3) -> Result<usize, StorageError> {
        self.bounds
            .linear_index(pos)
            .ok_or(StorageError::PositionOutOfBounds {
                pos,
                bounds: self.bounds,
            })
    }

    /// Rebuilds storage wide enough for `id` if it does not fit already.
    fn ensure_width(&mut self, id: u32) -> Result<(), StorageError> {
        let current = self.storage.bits_per_entry();
        let needed = bits_for_highest_id(id.max(self.palette.highest_id()), self.options.min_width());
        if needed <= current {
            return Ok(());
        }
        self.storage = widen(self.storage.as_ref(), needed, self.options.nibble_fast_path)?;
        tracing::debug!(from = current, to = needed, "widened buffer storage");
        Ok(())
    }
}

impl<V: PaletteValue> VoxelRead<V> for Buffer<V> {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn get(&self, pos: IVec3) -> Result<V, StorageError> {
        let index = self.index_of(pos)?;
        let id = self.storage.get(index)?;
        Ok(resolve(self.palette.as_ref(), id, pos))
    }

    fn palette_snapshot(&self) -> Box<dyn Palette<V>> {
        self.palette.box_clone()
    }

    fn options(&self) -> BufferOptions {
        self.options
    }

    fn copy(&self, kind: BufferKind) -> Result<OwnedBuffer<V>, StorageError> {
        match kind {
            BufferKind::Standard => Ok(OwnedBuffer::Standard(self.clone())),
            BufferKind::ThreadSafe => {
                let ids = (0..self.storage.len()).map(|i| self.storage.get(i));
                let cells = AtomicIdArray::from_ids(ids.collect::<Result<Vec<_>, _>>()?)?;
                Ok(OwnedBuffer::ThreadSafe(SharedBuffer::from_parts(
                    self.bounds,
                    self.palette.box_clone(),
                    cells,
                    self.options,
                )))
            }
        }
    }
}

impl<V: PaletteValue> VoxelWrite<V> for Buffer<V> {
    fn set(&mut self, pos: IVec3, value: V) -> Result<(), StorageError> {
        let index = self.index_of(pos)?;
        let id = self.palette.get_or_assign(value)?;
        self.ensure_width(id)?;
        self.storage.set(index, id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
