//! Bit-packed array for storing fixed-width integer values in a compact `Vec<u64>`.
//!
//! Each element occupies exactly `bits` bits (1 to 32). Elements are packed
//! tightly, so a single element may straddle two backing words. The width is
//! fixed at construction: growing it means building a new array with
//! [`BitPackedArray::resized`] and dropping the old one.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Widest element a packed array can hold.
pub const MAX_BITS: u8 = 32;

/// Bits per backing word.
const WORD_BITS: usize = u64::BITS as usize;

/// Number of `u64` words needed to hold `len` elements of `bits` bits.
pub fn words_for(bits: u8, len: usize) -> usize {
    (len * bits as usize).div_ceil(WORD_BITS)
}

/// Reads entry `index` of width `bits` from packed words.
///
/// The caller guarantees that `words` holds at least `index + 1` entries.
pub(crate) fn read_packed(words: &[u64], bits: u8, index: usize) -> u32 {
    let bit_index = index * bits as usize;
    let word = bit_index / WORD_BITS;
    let offset = bit_index % WORD_BITS;
    let mut value = words[word] >> offset;
    if offset + bits as usize > WORD_BITS {
        value |= words[word + 1] << (WORD_BITS - offset);
    }
    (value & ((1u64 << bits) - 1)) as u32
}

/// A compact array where each element is stored using a fixed number of bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitPackedArray {
    /// Raw storage. Elements are packed into 64-bit words, lowest bits first.
    data: Vec<u64>,
    /// Bits per element (1..=32).
    bits: u8,
    /// Total number of logical elements.
    len: usize,
}

impl BitPackedArray {
    /// Creates a new array with `len` elements, all initialized to zero.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidBitWidth`] unless `bits` is in `1..=32`.
    pub fn new(bits: u8, len: usize) -> Result<Self, StorageError> {
        check_bits(bits)?;
        Ok(Self {
            data: vec![0u64; words_for(bits, len)],
            bits,
            len,
        })
    }

    /// Constructs an array over pre-packed words, e.g. decoded from the wire.
    ///
    /// # Errors
    ///
    /// Fails if `bits` is invalid or `data` does not hold exactly the number of
    /// words `len` elements require.
    pub fn from_raw(bits: u8, len: usize, data: Vec<u64>) -> Result<Self, StorageError> {
        check_bits(bits)?;
        let expected = words_for(bits, len);
        if data.len() != expected {
            return Err(StorageError::WordCountMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, bits, len })
    }

    /// Returns the value at the given index.
    pub fn get(&self, index: usize) -> Result<u32, StorageError> {
        self.check_index(index)?;
        Ok(read_packed(&self.data, self.bits, index))
    }

    /// Sets the value at the given index.
    ///
    /// Values that straddle a word boundary are written with a
    /// read-modify-write of both words.
    pub fn set(&mut self, index: usize, value: u32) -> Result<(), StorageError> {
        self.check_index(index)?;
        if value > self.max_value() {
            return Err(StorageError::ValueTooLarge {
                value,
                bits: self.bits,
            });
        }
        let mask = self.mask();
        let value = u64::from(value);
        let bit_index = index * self.bits as usize;
        let word = bit_index / WORD_BITS;
        let offset = bit_index % WORD_BITS;

        self.data[word] = (self.data[word] & !(mask << offset)) | (value << offset);

        let end = offset + self.bits as usize;
        if end > WORD_BITS {
            let spill = end - WORD_BITS;
            let high_mask = (1u64 << spill) - 1;
            self.data[word + 1] =
                (self.data[word + 1] & !high_mask) | (value >> (WORD_BITS - offset));
        }
        Ok(())
    }

    /// Returns a new array of width `bits` holding the same values.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::ValueTooLarge`] if narrowing would truncate
    /// a stored value.
    pub fn resized(&self, bits: u8) -> Result<Self, StorageError> {
        let mut resized = Self::new(bits, self.len)?;
        for (i, value) in self.iter().enumerate() {
            resized.set(i, value)?;
        }
        Ok(resized)
    }

    /// Iterates all stored values in index order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        // Indices are always in range here.
        (0..self.len).map(|i| self.get(i).unwrap_or(0))
    }

    /// Returns the number of bits per element.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Largest value representable at the current width.
    pub fn max_value(&self) -> u32 {
        self.mask() as u32
    }

    /// Returns the number of logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the size of the backing storage in bytes (not counting struct overhead).
    pub fn storage_bytes(&self) -> usize {
        self.data.len() * 8
    }

    /// Returns a reference to the raw `u64` storage words.
    pub fn raw_data(&self) -> &[u64] {
        &self.data
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
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

pub(crate) fn check_bits(bits: u8) -> Result<(), StorageError> {
    if bits == 0 || bits > MAX_BITS {
        return Err(StorageError::InvalidBitWidth(bits));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_initialized() {
        let arr = BitPackedArray::new(7, 100).unwrap();
        assert!(arr.iter().all(|v| v == 0));
        assert_eq!(arr.raw_data().len(), 11); // 700 bits
    }

    #[test]
    fn test_invalid_widths_rejected() {
        assert_eq!(
            BitPackedArray::new(0, 16),
            Err(StorageError::InvalidBitWidth(0))
        );
        assert_eq!(
            BitPackedArray::new(33, 16),
            Err(StorageError::InvalidBitWidth(33))
        );
    }

    #[test]
    fn test_reads_known_word_layout() {
        // Sixteen 4-bit values packed lowest nibble first.
        let arr = BitPackedArray::from_raw(4, 16, vec![0xFEDC_BA98_7654_3210]).unwrap();
        for i in 0..16 {
            assert_eq!(arr.get(i).unwrap(), i as u32);
        }
    }

    #[test]
    fn test_value_straddling_two_words() {
        // Index 12 of a 5-bit array occupies bits 60..65: low four bits in
        // word 0, top bit in word 1. 22 = 0b1_0110.
        let arr = BitPackedArray::from_raw(5, 13, vec![0x6000_0000_0000_0000, 0x1]).unwrap();
        assert_eq!(arr.get(12).unwrap(), 22);
        for i in 0..12 {
            assert_eq!(arr.get(i).unwrap(), 0);
        }

        let mut written = BitPackedArray::new(5, 13).unwrap();
        written.set(12, 22).unwrap();
        assert_eq!(written, arr);
    }

    #[test]
    fn test_five_bit_rewrite_reads_back_exactly() {
        let mut arr = BitPackedArray::new(5, 4096).unwrap();
        for i in 0..4096 {
            arr.set(i, (i % 31) as u32).unwrap();
        }

        let mut rebuilt = BitPackedArray::from_raw(5, 4096, arr.raw_data().to_vec()).unwrap();
        for i in 0..4096 {
            assert_eq!(rebuilt.get(i).unwrap(), (i % 31) as u32);
        }

        for i in 0..4096 {
            rebuilt.set(i, 31 - (i % 31) as u32).unwrap();
        }
        for i in 0..4096 {
            assert_eq!(rebuilt.get(i).unwrap(), 31 - (i % 31) as u32, "index {i}");
        }
    }

    #[test]
    fn test_neighbours_untouched_by_set() {
        let mut arr = BitPackedArray::new(13, 64).unwrap();
        for i in 0..64 {
            arr.set(i, 0x1FFF).unwrap();
        }
        arr.set(31, 0).unwrap();
        assert_eq!(arr.get(30).unwrap(), 0x1FFF);
        assert_eq!(arr.get(31).unwrap(), 0);
        assert_eq!(arr.get(32).unwrap(), 0x1FFF);
    }

    #[test]
    fn test_value_too_large() {
        let mut arr = BitPackedArray::new(3, 8).unwrap();
        assert_eq!(
            arr.set(0, 8),
            Err(StorageError::ValueTooLarge { value: 8, bits: 3 })
        );
        arr.set(0, 7).unwrap();
    }

    #[test]
    fn test_out_of_bounds() {
        let mut arr = BitPackedArray::new(4, 10).unwrap();
        assert_eq!(
            arr.get(10),
            Err(StorageError::IndexOutOfBounds { index: 10, len: 10 })
        );
        assert!(arr.set(11, 1).is_err());
    }

    #[test]
    fn test_thirty_two_bit_width() {
        let mut arr = BitPackedArray::new(32, 5).unwrap();
        arr.set(3, u32::MAX).unwrap();
        assert_eq!(arr.get(3).unwrap(), u32::MAX);
        assert_eq!(arr.get(2).unwrap(), 0);
    }

    #[test]
    fn test_resized_preserves_values() {
        let mut arr = BitPackedArray::new(2, 100).unwrap();
        for i in 0..100 {
            arr.set(i, (i % 4) as u32).unwrap();
        }
        let wide = arr.resized(9).unwrap();
        assert_eq!(wide.bits(), 9);
        for i in 0..100 {
            assert_eq!(wide.get(i).unwrap(), (i % 4) as u32);
        }
        assert!(matches!(
            wide.resized(1),
            Err(StorageError::ValueTooLarge { .. })
        ));
    }

    #[test]
    fn test_word_count_mismatch() {
        assert_eq!(
            BitPackedArray::from_raw(5, 4096, vec![0; 319]),
            Err(StorageError::WordCountMismatch {
                expected: 320,
                actual: 319
            })
        );
    }

    #[test]
    fn test_storage_sizes() {
        // 4096 cells at 4 bits = 2048 bytes
        assert_eq!(BitPackedArray::new(4, 4096).unwrap().storage_bytes(), 2048);
        // 4096 cells at 5 bits = 320 words
        assert_eq!(BitPackedArray::new(5, 4096).unwrap().storage_bytes(), 2560);
    }
}
