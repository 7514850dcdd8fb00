//! Voxel buffers: a palette plus id storage over a bounded region.
//!
//! Two kinds exist. [`Buffer`] keeps ids bit-packed and needs `&mut self` to
//! write. [`SharedBuffer`] keeps one atomic 16-bit slot per cell and can be
//! read and written through `&self` from any number of threads. Both uphold
//! one invariant: every stored id resolves through the current palette.

mod shared;
mod standard;

use cellpack_config::StorageConfig;
use glam::IVec3;

pub use shared::SharedBuffer;
pub use standard::Buffer;

use crate::bounds::Bounds;
use crate::error::StorageError;
use crate::palette::{Palette, PaletteValue};
use crate::transform::{CoordTransform, Transformed};
use crate::view::{View, ViewMut, check_region};

/// Concurrency flavour of an owned buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Bit-packed, single writer, no internal synchronization.
    Standard,
    /// Atomic per-cell storage, safe to share across threads.
    ThreadSafe,
}

/// Storage tuning carried by every buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferOptions {
    /// Narrowest packed width ever used.
    pub min_bits: u8,
    /// Use [`NibbleArray`](crate::nibble::NibbleArray) whenever the width is 4.
    pub nibble_fast_path: bool,
}

impl BufferOptions {
    /// Options for block sections.
    pub fn blocks(config: &StorageConfig) -> Self {
        Self {
            min_bits: config.min_block_bits,
            nibble_fast_path: config.nibble_fast_path,
        }
    }

    /// Options for biome areas.
    pub fn biomes(config: &StorageConfig) -> Self {
        Self {
            min_bits: config.min_biome_bits,
            nibble_fast_path: config.nibble_fast_path,
        }
    }

    /// `min_bits`, clamped to a width packed arrays accept.
    pub(crate) fn min_width(&self) -> u8 {
        self.min_bits.clamp(1, crate::bit_packed::MAX_BITS)
    }
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self::blocks(&StorageConfig::default())
    }
}

/// Read access to a bounded region of values.
///
/// Implemented by both buffer kinds and by the views and transforms layered
/// over them, so wrappers compose: `b.view(a)?.view(c)?` is itself readable.
pub trait VoxelRead<V: PaletteValue> {
    /// Region covered, in this reader's own coordinates.
    fn bounds(&self) -> Bounds;

    /// Returns the value at `pos`.
    ///
    /// # Errors
    ///
    /// [`StorageError::PositionOutOfBounds`] if `pos` is outside
    /// [`bounds`](Self::bounds). An id that fails to resolve is not an error:
    /// the palette fallback is returned and a warning is logged.
    fn get(&self, pos: IVec3) -> Result<V, StorageError>;

    /// Deep copy of the palette backing this reader.
    fn palette_snapshot(&self) -> Box<dyn Palette<V>>;

    /// Storage options of the underlying buffer.
    fn options(&self) -> BufferOptions;

    /// Copies the covered region into a new, independent buffer of `kind`.
    fn copy(&self, kind: BufferKind) -> Result<OwnedBuffer<V>, StorageError> {
        copy_region(self, kind)
    }

    /// Returns a read-only window over `region`, re-based to start at zero.
    ///
    /// # Errors
    ///
    /// [`StorageError::ViewOutOfBounds`] unless `region` lies inside
    /// [`bounds`](Self::bounds).
    fn view(&self, region: Bounds) -> Result<View<'_, Self>, StorageError>
    where
        Self: Sized,
    {
        check_region(self.bounds(), region)?;
        Ok(View::new(self, region))
    }

    /// Returns a read-only wrapper reading `self.get(transform.apply(p))`.
    fn transform(&self, transform: CoordTransform) -> Transformed<'_, Self>
    where
        Self: Sized,
    {
        Transformed::new(self, transform, self.bounds())
    }
}

/// Write access to a bounded region of values.
pub trait VoxelWrite<V: PaletteValue>: VoxelRead<V> {
    /// Stores `value` at `pos`, growing the palette and storage as needed.
    fn set(&mut self, pos: IVec3, value: V) -> Result<(), StorageError>;

    /// Returns a mutable window over `region`, re-based to start at zero.
    fn view_mut(&mut self, region: Bounds) -> Result<ViewMut<'_, Self>, StorageError>
    where
        Self: Sized,
    {
        check_region(self.bounds(), region)?;
        Ok(ViewMut::new(self, region))
    }

    /// Writes `value` to every cell of `region`.
    fn fill_region(&mut self, region: Bounds, value: V) -> Result<(), StorageError> {
        check_region(self.bounds(), region)?;
        for pos in region.positions() {
            self.set(pos, value)?;
        }
        Ok(())
    }
}

/// An owned buffer of either kind, as produced by [`VoxelRead::copy`].
#[derive(Debug)]
pub enum OwnedBuffer<V: PaletteValue> {
    /// Bit-packed buffer.
    Standard(Buffer<V>),
    /// Atomic buffer.
    ThreadSafe(SharedBuffer<V>),
}

impl<V: PaletteValue> OwnedBuffer<V> {
    /// Which kind this is.
    pub fn kind(&self) -> BufferKind {
        match self {
            Self::Standard(_) => BufferKind::Standard,
            Self::ThreadSafe(_) => BufferKind::ThreadSafe,
        }
    }

    /// Unwraps a standard buffer.
    pub fn into_standard(self) -> Option<Buffer<V>> {
        match self {
            Self::Standard(buffer) => Some(buffer),
            Self::ThreadSafe(_) => None,
        }
    }

    /// Unwraps a thread-safe buffer.
    pub fn into_thread_safe(self) -> Option<SharedBuffer<V>> {
        match self {
            Self::Standard(_) => None,
            Self::ThreadSafe(buffer) => Some(buffer),
        }
    }
}

impl<V: PaletteValue> VoxelRead<V> for OwnedBuffer<V> {
    fn bounds(&self) -> Bounds {
        match self {
            Self::Standard(b) => b.bounds(),
            Self::ThreadSafe(b) => b.bounds(),
        }
    }

    fn get(&self, pos: IVec3) -> Result<V, StorageError> {
        match self {
            Self::Standard(b) => b.get(pos),
            Self::ThreadSafe(b) => b.get(pos),
        }
    }

    fn palette_snapshot(&self) -> Box<dyn Palette<V>> {
        match self {
            Self::Standard(b) => b.palette_snapshot(),
            Self::ThreadSafe(b) => b.palette_snapshot(),
        }
    }

    fn options(&self) -> BufferOptions {
        match self {
            Self::Standard(b) => b.options(),
            Self::ThreadSafe(b) => b.options(),
        }
    }

    fn copy(&self, kind: BufferKind) -> Result<OwnedBuffer<V>, StorageError> {
        match self {
            Self::Standard(b) => b.copy(kind),
            Self::ThreadSafe(b) => b.copy(kind),
        }
    }
}

impl<V: PaletteValue> VoxelWrite<V> for OwnedBuffer<V> {
    fn set(&mut self, pos: IVec3, value: V) -> Result<(), StorageError> {
        match self {
            Self::Standard(b) => VoxelWrite::set(b, pos, value),
            Self::ThreadSafe(b) => b.store(pos, value),
        }
    }
}

/// Resolves a stored id, substituting the palette fallback for corrupted ids.
pub(crate) fn resolve<V: PaletteValue>(palette: &dyn Palette<V>, id: u32, pos: IVec3) -> V {
    palette.get_by_id(id).unwrap_or_else(|| {
        tracing::warn!(id, %pos, "stored id has no palette entry, substituting fallback");
        palette.fallback()
    })
}

/// Materialises any reader into a fresh buffer that keeps the reader's
/// palette and options. The copy's bounds equal the reader's bounds.
fn copy_region<V, R>(src: &R, kind: BufferKind) -> Result<OwnedBuffer<V>, StorageError>
where
    V: PaletteValue,
    R: VoxelRead<V> + ?Sized,
{
    let bounds = src.bounds();
    let palette = src.palette_snapshot();
    let options = src.options();
    match kind {
        BufferKind::Standard => {
            let mut copy = Buffer::new(bounds, palette, options)?;
            for pos in bounds.positions() {
                VoxelWrite::set(&mut copy, pos, src.get(pos)?)?;
            }
            Ok(OwnedBuffer::Standard(copy))
        }
        BufferKind::ThreadSafe => {
            let copy = SharedBuffer::new(bounds, palette, options)?;
            for pos in bounds.positions() {
                copy.store(pos, src.get(pos)?)?;
            }
            Ok(OwnedBuffer::ThreadSafe(copy))
        }
    }
}
