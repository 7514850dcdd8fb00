//! Atomic buffer that any number of threads can read and write through
//! shared references.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use glam::IVec3;
use parking_lot::Mutex;

use super::{Buffer, BufferKind, BufferOptions, OwnedBuffer, VoxelRead, VoxelWrite, resolve};
use crate::atomic::{ATOMIC_BITS, AtomicIdArray};
use crate::bounds::Bounds;
use crate::error::StorageError;
use crate::palette::{LocalPalette, Palette, PaletteValue};
use crate::snapshot::PackedSnapshot;
use crate::storage::{bits_for_highest_id, pack_ids};

/// Palette-compressed buffer with one atomic 16-bit slot per cell.
///
/// Cell reads and writes never tear. The palette is an immutable snapshot
/// published through [`ArcSwap`]: reads never wait, and the first write of a
/// new value copies the palette, assigns the id and republishes it before the
/// id reaches a cell, so a reader never sees an id its palette cannot
/// resolve. Palette updates are serialised by a writer lock that readers
/// never take.
///
/// There is no cross-cell atomicity. Readers walking many cells during
/// concurrent writes may see any interleaving of those writes.
#[derive(Debug)]
pub struct SharedBuffer<V: PaletteValue> {
    bounds: Bounds,
    palette: ArcSwap<Box<dyn Palette<V>>>,
    writer: Mutex<()>,
    cells: AtomicIdArray,
    options: BufferOptions,
}

impl<V: PaletteValue> SharedBuffer<V> {
    /// Creates a buffer whose every cell holds id 0.
    ///
    /// # Errors
    ///
    /// [`StorageError::EmptyBounds`] for a zero-sized region,
    /// [`StorageError::BoundsOverflow`] past the `i32` range, and
    /// [`StorageError::ValueTooLarge`] if the palette already holds ids that
    /// do not fit 16 bits.
    pub fn new(
        bounds: Bounds,
        palette: Box<dyn Palette<V>>,
        options: BufferOptions,
    ) -> Result<Self, StorageError> {
        if bounds.is_empty() {
            return Err(StorageError::EmptyBounds);
        }
        bounds.check_range()?;
        let highest = palette.highest_id();
        if highest > u32::from(u16::MAX) {
            return Err(StorageError::ValueTooLarge {
                value: highest,
                bits: ATOMIC_BITS,
            });
        }
        Ok(Self::from_parts(
            bounds,
            palette,
            AtomicIdArray::new(bounds.volume()),
            options,
        ))
    }

    /// Creates a buffer with every cell set to `fill`.
    pub fn filled(
        bounds: Bounds,
        palette: Box<dyn Palette<V>>,
        options: BufferOptions,
        fill: V,
    ) -> Result<Self, StorageError> {
        let buffer = Self::new(bounds, palette, options)?;
        buffer.fill(fill)?;
        Ok(buffer)
    }

    /// Creates a buffer over a fresh [`LocalPalette`] filled with `fill`.
    pub fn local(bounds: Bounds, fill: V) -> Result<Self, StorageError> {
        Self::filled(
            bounds,
            Box::new(LocalPalette::new(fill)),
            BufferOptions::default(),
            fill,
        )
    }

    pub(crate) fn from_parts(
        bounds: Bounds,
        palette: Box<dyn Palette<V>>,
        cells: AtomicIdArray,
        options: BufferOptions,
    ) -> Self {
        Self {
            bounds,
            palette: ArcSwap::from_pointee(palette),
            writer: Mutex::new(()),
            cells,
            options,
        }
    }

    /// Stores `value` at `pos` through a shared reference.
    ///
    /// Ids above 65535 are rejected with [`StorageError::ValueTooLarge`] and
    /// the cell is left untouched.
    pub fn store(&self, pos: IVec3, value: V) -> Result<(), StorageError> {
        let index = self.index_of(pos)?;
        let id = self.id_for(value)?;
        self.cells.set(index, id)
    }

    /// Sets every cell to `value`.
    ///
    /// Concurrent readers may observe a partially filled buffer.
    pub fn fill(&self, value: V) -> Result<(), StorageError> {
        let id = self.id_for(value)?;
        for i in 0..self.cells.len() {
            self.cells.set(i, id)?;
        }
        Ok(())
    }

    /// Captures the packed wire triple.
    ///
    /// Ids are read before the palette is loaded, so every captured id is
    /// already present in the captured palette.
    pub fn snapshot(&self) -> Result<PackedSnapshot<V>, StorageError> {
        let ids = self.cells.to_ids();
        let palette = self.palette.load();
        let highest = ids.iter().copied().max().unwrap_or(0).max(palette.highest_id());
        let bits = bits_for_highest_id(highest, self.options.min_width());
        Ok(PackedSnapshot {
            palette: palette.entries(),
            bits_per_entry: bits,
            len: ids.len(),
            words: pack_ids(bits, &ids)?,
        })
    }

    /// Bytes used by the id storage.
    pub fn storage_bytes(&self) -> usize {
        self.cells.storage_bytes()
    }

    /// The currently published palette. Later updates do not affect it.
    pub fn palette(&self) -> Guard<Arc<Box<dyn Palette<V>>>> {
        self.palette.load()
    }

    /// Applies `update` to a copy of the palette and publishes the copy if
    /// it succeeds. Readers keep using the previous palette meanwhile.
    pub fn update_palette<R>(
        &self,
        update: impl FnOnce(&mut dyn Palette<V>) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let _writer = self.writer.lock();
        let mut next = self.palette.load().box_clone();
        let result = update(next.as_mut())?;
        self.palette.store(Arc::new(next));
        Ok(result)
    }

    fn index_of(&self, pos: IVec3) -> Result<usize, StorageError> {
        self.bounds
            .linear_index(pos)
            .ok_or(StorageError::PositionOutOfBounds {
                pos,
                bounds: self.bounds,
            })
    }

    fn id_for(&self, value: V) -> Result<u32, StorageError> {
        if let Some(id) = self.palette.load().get(&value) {
            return Ok(id);
        }
        let _writer = self.writer.lock();
        let current = self.palette.load();
        // Another writer may have published it while we waited.
        if let Some(id) = current.get(&value) {
            return Ok(id);
        }
        let mut next = current.box_clone();
        let id = next.get_or_assign(value)?;
        if id > u32::from(u16::MAX) {
            return Err(StorageError::ValueTooLarge {
                value: id,
                bits: ATOMIC_BITS,
            });
        }
        self.palette.store(Arc::new(next));
        Ok(id)
    }
}

impl<V: PaletteValue> VoxelRead<V> for SharedBuffer<V> {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn get(&self, pos: IVec3) -> Result<V, StorageError> {
        let index = self.index_of(pos)?;
        let id = self.cells.get(index)?;
        let palette = self.palette.load();
        Ok(resolve(&***palette, id, pos))
    }

    fn palette_snapshot(&self) -> Box<dyn Palette<V>> {
        self.palette.load().box_clone()
    }

    fn options(&self) -> BufferOptions {
        self.options
    }

    fn copy(&self, kind: BufferKind) -> Result<OwnedBuffer<V>, StorageError> {
        let ids = self.cells.to_ids();
        let palette = self.palette.load().box_clone();
        match kind {
            BufferKind::Standard => Ok(OwnedBuffer::Standard(Buffer::from_ids(
                self.bounds,
                palette,
                &ids,
                self.options,
            )?)),
            BufferKind::ThreadSafe => Ok(OwnedBuffer::ThreadSafe(Self::from_parts(
                self.bounds,
                palette,
                AtomicIdArray::from_ids(ids)?,
                self.options,
            ))),
        }
    }
}

impl<V: PaletteValue> VoxelWrite<V> for SharedBuffer<V> {
    fn set(&mut self, pos: IVec3, value: V) -> Result<(), StorageError> {
        self.store(pos, value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
