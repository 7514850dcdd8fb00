//! Four-bit specialisation of the packed array.
//!
//! Sixteen-entry palettes are by far the most common case for block sections,
//! so this keeps two entries per byte and skips the general shift arithmetic.
//! Read as little-endian `u64` words, the byte layout matches a 4-bit
//! [`BitPackedArray`](crate::bit_packed::BitPackedArray) exactly.

use serde::{Deserialize, Serialize};

use crate::bit_packed::words_for;
use crate::error::StorageError;

const NIBBLE_BITS: u8 = 4;
const NIBBLE_MAX: u32 = 0xF;

/// A packed array of 4-bit values, low nibble first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NibbleArray {
    data: Vec<u8>,
    len: usize,
}

impl NibbleArray {
    /// Creates `len` zeroed entries.
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0u8; len.div_ceil(2)],
            len,
        }
    }

    /// Builds an array from packed 4-bit words.
    pub fn from_words(len: usize, words: &[u64]) -> Result<Self, StorageError> {
        let expected = words_for(NIBBLE_BITS, len);
        if words.len() != expected {
            return Err(StorageError::WordCountMismatch {
                expected,
                actual: words.len(),
            });
        }
        let mut data: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        data.truncate(len.div_ceil(2));
        Ok(Self { data, len })
    }

    /// Returns the value at `index`.
    pub fn get(&self, index: usize) -> Result<u32, StorageError> {
        self.check_index(index)?;
        let byte = self.data[index >> 1];
        let nibble = if index & 1 == 0 { byte & 0x0F } else { byte >> 4 };
        Ok(u32::from(nibble))
    }

    /// Stores `value` at `index`.
    pub fn set(&mut self, index: usize, value: u32) -> Result<(), StorageError> {
        self.check_index(index)?;
        if value > NIBBLE_MAX {
            return Err(StorageError::ValueTooLarge {
                value,
                bits: NIBBLE_BITS,
            });
        }
        let byte = &mut self.data[index >> 1];
        let value = value as u8;
        *byte = if index & 1 == 0 {
            (*byte & 0xF0) | value
        } else {
            (*byte & 0x0F) | (value << 4)
        };
        Ok(())
    }

    /// Returns the entries as packed little-endian `u64` words.
    pub fn to_words(&self) -> Vec<u64> {
        self.data
            .chunks(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(bytes)
            })
            .collect()
    }

    /// Returns the number of logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing bytes.
    pub fn storage_bytes(&self) -> usize {
        self.data.len()
    }

    fn check_index(&self, index: usize) -> Result<(), StorageError> {
        if index >= self.len {
            return Err(StorageError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(())
    }
}
