//! Palette-compressed voxel storage: bit-packed and atomic id arrays, local and
//! global palettes, and buffers with views and coordinate transforms.

pub mod atomic;
pub mod bit_packed;
pub mod bounds;
pub mod buffer;
pub mod error;
pub mod nibble;
pub mod palette;
pub mod registry;
pub mod snapshot;
pub mod storage;
pub mod transform;
pub mod view;

pub use atomic::AtomicIdArray;
pub use bit_packed::BitPackedArray;
pub use bounds::Bounds;
pub use buffer::{
    Buffer, BufferKind, BufferOptions, OwnedBuffer, SharedBuffer, VoxelRead, VoxelWrite,
};
pub use error::StorageError;
pub use nibble::NibbleArray;
pub use palette::{GlobalPalette, LocalPalette, Palette, PaletteKind, PaletteValue};
pub use registry::{Registry, RegistryBuilder, RegistryError};
pub use snapshot::PackedSnapshot;
pub use storage::IdStorage;
pub use transform::{Axis, CoordTransform, Transformed};
pub use view::{View, ViewMut};
