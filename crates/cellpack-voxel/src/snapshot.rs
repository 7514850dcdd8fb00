//! The packed wire triple: palette entries, bits per entry, packed words.
//!
//! This is what network encoders and save writers consume. The word layout is
//! the one [`BitPackedArray`](crate::bit_packed::BitPackedArray) uses, lowest
//! bits first, entries allowed to straddle words.

use serde::{Deserialize, Serialize};

use crate::bit_packed::{check_bits, read_packed, words_for};
use crate::error::StorageError;

/// Immutable capture of a buffer's palette and ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedSnapshot<V> {
    /// `(id, value)` pairs sorted by id.
    pub palette: Vec<(u32, V)>,
    /// Width of every packed entry.
    pub bits_per_entry: u8,
    /// Number of cells.
    pub len: usize,
    /// Packed ids in linear cell order.
    pub words: Vec<u64>,
}

impl<V: Copy> PackedSnapshot<V> {
    /// Checks that the width is valid and `words` holds exactly `len` entries.
    pub fn validate(&self) -> Result<(), StorageError> {
        check_bits(self.bits_per_entry)?;
        let expected = words_for(self.bits_per_entry, self.len);
        if self.words.len() != expected {
            return Err(StorageError::WordCountMismatch {
                expected,
                actual: self.words.len(),
            });
        }
        Ok(())
    }

    /// Decodes the id of cell `index` straight from the words.
    pub fn get(&self, index: usize) -> Result<u32, StorageError> {
        self.validate()?;
        if index >= self.len {
            return Err(StorageError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(read_packed(&self.words, self.bits_per_entry, index))
    }

    /// Decodes every id in cell order.
    pub fn ids(&self) -> Result<Vec<u32>, StorageError> {
        self.validate()?;
        Ok((0..self.len)
            .map(|i| read_packed(&self.words, self.bits_per_entry, i))
            .collect())
    }

    /// Looks up the value for `id` in the captured palette.
    pub fn value_of(&self, id: u32) -> Option<V> {
        self.palette
            .binary_search_by_key(&id, |(entry, _)| *entry)
            .ok()
            .map(|i| self.palette[i].1)
    }
}
