//! Error types shared by the storage primitives, palettes, and buffers.

use glam::{IVec3, UVec3};

use crate::bounds::Bounds;

/// Errors surfaced by packed arrays, palettes, and voxel buffers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// An array index fell outside `[0, len)`.
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds {
        /// The rejected index.
        index: usize,
        /// Logical length of the array.
        len: usize,
    },

    /// A position fell outside the bounds of a buffer or view.
    #[error("position {pos} is outside {bounds}")]
    PositionOutOfBounds {
        /// The rejected position.
        pos: IVec3,
        /// Bounds of the buffer that rejected it.
        bounds: Bounds,
    },

    /// A requested view is not fully contained in its parent.
    #[error("view {requested} is not contained in {parent}")]
    ViewOutOfBounds {
        /// Bounds passed to `view`.
        requested: Bounds,
        /// Bounds of the parent buffer.
        parent: Bounds,
    },

    /// Bounds whose far corner does not fit in `i32` coordinates.
    #[error("bounds at {origin} with size {size} leave the i32 coordinate range")]
    BoundsOverflow {
        /// Requested origin.
        origin: IVec3,
        /// Requested size.
        size: UVec3,
    },

    /// A buffer was created with a zero-sized extent.
    #[error("buffer bounds must have a non-zero extent on every axis")]
    EmptyBounds,

    /// An id does not fit the configured packed width.
    ///
    /// The owning buffer widens its storage before writing, so this always
    /// points at a logic error in the caller.
    #[error("value {value} does not fit in {bits} bits")]
    ValueTooLarge {
        /// The value that was written.
        value: u32,
        /// Width of the target storage.
        bits: u8,
    },

    /// A packed width outside `1..=32` was requested.
    #[error("invalid bit width: {0}")]
    InvalidBitWidth(u8),

    /// Raw words handed to a packed array have the wrong length.
    #[error("word count mismatch: expected {expected}, got {actual}")]
    WordCountMismatch {
        /// Words required for `len * bits`.
        expected: usize,
        /// Words supplied.
        actual: usize,
    },

    /// A snapshot's cell count differs from the volume it is decoded into.
    #[error("length mismatch: expected {expected} cells, got {actual}")]
    LengthMismatch {
        /// Volume of the target bounds.
        expected: usize,
        /// Cells recorded in the snapshot.
        actual: usize,
    },

    /// `remove` was called on a palette backed by the global registry.
    #[error("global palettes do not support removal")]
    UnsupportedRemoval,

    /// A global palette was asked for a value the registry never saw.
    #[error("value is not present in the registry")]
    UnregisteredValue,

    /// Two palette entries claimed the same id or the same value.
    #[error("duplicate palette entry for id {0}")]
    DuplicatePaletteEntry(u32),

    /// Packed data references an id that the accompanying palette lacks.
    #[error("stored id {0} has no palette entry")]
    UnknownPaletteId(u32),

    /// A coordinate transform matrix is not a signed axis permutation.
    #[error("coordinate transform is not an invertible axis permutation")]
    NonInvertibleTransform,
}
