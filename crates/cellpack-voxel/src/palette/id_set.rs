//! Growable bitset tracking which local palette ids are in use.

const WORD_BITS: u32 = u64::BITS;

/// Set of allocated ids, one bit per id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdBitSet {
    words: Vec<u64>,
}

impl IdBitSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `id` is in the set.
    pub fn contains(&self, id: u32) -> bool {
        let (word, bit) = split(id);
        self.words.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Adds `id`, growing the backing words as needed.
    pub fn insert(&mut self, id: u32) {
        let (word, bit) = split(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    /// Removes `id`. Returns whether it was present.
    pub fn remove(&mut self, id: u32) -> bool {
        let (word, bit) = split(id);
        let Some(w) = self.words.get_mut(word) else {
            return false;
        };
        let present = *w & (1u64 << bit) != 0;
        *w &= !(1u64 << bit);
        present
    }

    /// Lowest id at or above `from` that is not in the set.
    pub fn next_clear_bit(&self, from: u32) -> u32 {
        let (mut word, bit) = split(from);
        let Some(&first) = self.words.get(word) else {
            return from;
        };
        // Treat bits below `from` as set so they are skipped.
        let mut bits = first | ((1u64 << bit) - 1);
        loop {
            if bits != u64::MAX {
                return word as u32 * WORD_BITS + bits.trailing_ones();
            }
            word += 1;
            match self.words.get(word) {
                Some(&w) => bits = w,
                None => return word as u32 * WORD_BITS,
            }
        }
    }

    /// Highest id in the set, if any.
    pub fn last(&self) -> Option<u32> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i as u32 * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros()))
    }

    /// Number of ids in the set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

fn split(id: u32) -> (usize, u32) {
    ((id / WORD_BITS) as usize, id % WORD_BITS)
}
