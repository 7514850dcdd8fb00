//! The id storage seam shared by the packed and nibble arrays.

use std::fmt;

use crate::bit_packed::BitPackedArray;
use crate::error::StorageError;
use crate::nibble::NibbleArray;

/// Index-addressed storage of palette ids.
pub trait IdStorage: Send + Sync + fmt::Debug {
    /// Number of cells.
    fn len(&self) -> usize;

    /// Returns `true` if there are no cells.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of each stored id.
    fn bits_per_entry(&self) -> u8;

    /// Reads the id at `index`.
    fn get(&self, index: usize) -> Result<u32, StorageError>;

    /// Writes `id` at `index`.
    fn set(&mut self, index: usize, id: u32) -> Result<(), StorageError>;

    /// Bytes used by the backing storage.
    fn storage_bytes(&self) -> usize;

    /// Returns the ids packed into `u64` words at [`bits_per_entry`](Self::bits_per_entry).
    fn to_words(&self) -> Vec<u64>;

    /// Clones into a new box.
    fn box_clone(&self) -> Box<dyn IdStorage>;
}

impl Clone for Box<dyn IdStorage> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl IdStorage for BitPackedArray {
    fn len(&self) -> usize {
        BitPackedArray::len(self)
    }

    fn bits_per_entry(&self) -> u8 {
        self.bits()
    }

    fn get(&self, index: usize) -> Result<u32, StorageError> {
        BitPackedArray::get(self, index)
    }

    fn set(&mut self, index: usize, id: u32) -> Result<(), StorageError> {
        BitPackedArray::set(self, index, id)
    }

    fn storage_bytes(&self) -> usize {
        BitPackedArray::storage_bytes(self)
    }

    fn to_words(&self) -> Vec<u64> {
        self.raw_data().to_vec()
    }

    fn box_clone(&self) -> Box<dyn IdStorage> {
        Box::new(self.clone())
    }
}

impl IdStorage for NibbleArray {
    fn len(&self) -> usize {
        NibbleArray::len(self)
    }

    fn bits_per_entry(&self) -> u8 {
        4
    }

    fn get(&self, index: usize) -> Result<u32, StorageError> {
        NibbleArray::get(self, index)
    }

    fn set(&mut self, index: usize, id: u32) -> Result<(), StorageError> {
        NibbleArray::set(self, index, id)
    }

    fn storage_bytes(&self) -> usize {
        NibbleArray::storage_bytes(self)
    }

    fn to_words(&self) -> Vec<u64> {
        NibbleArray::to_words(self)
    }

    fn box_clone(&self) -> Box<dyn IdStorage> {
        Box::new(self.clone())
    }
}

/// Minimum width able to hold `highest_id`, never narrower than `min_bits`.
///
/// This is `max(min_bits, ceil(log2(highest_id + 1)))`.
pub fn bits_for_highest_id(highest_id: u32, min_bits: u8) -> u8 {
    let needed = (u32::BITS - highest_id.leading_zeros()) as u8;
    needed.max(min_bits)
}

/// Allocates zeroed packed storage, taking the nibble fast path at width 4.
pub fn packed_storage(
    bits: u8,
    len: usize,
    nibble_fast_path: bool,
) -> Result<Box<dyn IdStorage>, StorageError> {
    if bits == 4 && nibble_fast_path {
        return Ok(Box::new(NibbleArray::new(len)));
    }
    Ok(Box::new(BitPackedArray::new(bits, len)?))
}

/// Copies every entry of `storage` into new packed storage of width `bits`.
pub fn widen(
    storage: &dyn IdStorage,
    bits: u8,
    nibble_fast_path: bool,
) -> Result<Box<dyn IdStorage>, StorageError> {
    let mut wider = packed_storage(bits, storage.len(), nibble_fast_path)?;
    for i in 0..storage.len() {
        wider.set(i, storage.get(i)?)?;
    }
    Ok(wider)
}

/// Packs a slice of ids into words at the given width.
pub fn pack_ids(bits: u8, ids: &[u32]) -> Result<Vec<u64>, StorageError> {
    let mut packed = BitPackedArray::new(bits, ids.len())?;
    for (i, &id) in ids.iter().enumerate() {
        packed.set(i, id)?;
    }
    Ok(packed.raw_data().to_vec())
}
