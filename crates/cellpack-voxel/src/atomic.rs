//! Lock-free id storage for buffers shared across threads.
//!
//! Each cell is an independent [`AtomicU16`], so reads and writes of a single
//! cell are never torn. There is no cross-cell atomicity: a reader walking
//! many cells while a writer is active can observe any interleaving.

use std::sync::atomic::{AtomicU16, Ordering};

use crate::error::StorageError;

/// Width reported for atomic storage.
pub const ATOMIC_BITS: u8 = 16;

/// Unpacked per-cell atomic ids.
#[derive(Debug)]
pub struct AtomicIdArray {
    cells: Vec<AtomicU16>,
}

impl AtomicIdArray {
    /// Creates `len` cells holding id 0.
    pub fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicU16::new(0)).collect(),
        }
    }

    /// Builds an array from a sequence of ids.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::ValueTooLarge`] if an id exceeds 16 bits.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Result<Self, StorageError> {
        let cells = ids
            .into_iter()
            .map(|id| narrow(id).map(AtomicU16::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cells })
    }

    /// Loads the id at `index`.
    pub fn get(&self, index: usize) -> Result<u32, StorageError> {
        let cell = self.cell(index)?;
        Ok(u32::from(cell.load(Ordering::Acquire)))
    }

    /// Stores `id` at `index`. Takes `&self`: cells are independently atomic.
    pub fn set(&self, index: usize, id: u32) -> Result<(), StorageError> {
        let value = narrow(id)?;
        self.cell(index)?.store(value, Ordering::Release);
        Ok(())
    }

    /// Loads every cell in index order.
    pub fn to_ids(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|c| u32::from(c.load(Ordering::Acquire)))
            .collect()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if there are no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Size of the cell storage in bytes.
    pub fn storage_bytes(&self) -> usize {
        self.cells.len() * std::mem::size_of::<AtomicU16>()
    }

    fn cell(&self, index: usize) -> Result<&AtomicU16, StorageError> {
        self.cells.get(index).ok_or(StorageError::IndexOutOfBounds {
            index,
            len: self.cells.len(),
        })
    }
}

impl Clone for AtomicIdArray {
    fn clone(&self) -> Self {
        Self {
            cells: self
                .cells
                .iter()
                .map(|c| AtomicU16::new(c.load(Ordering::Acquire)))
                .collect(),
        }
    }
}

fn narrow(id: u32) -> Result<u16, StorageError> {
    u16::try_from(id).map_err(|_| StorageError::ValueTooLarge {
        value: id,
        bits: ATOMIC_BITS,
    })
}
