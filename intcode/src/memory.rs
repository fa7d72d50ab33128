use std::collections::BTreeMap;

use crate::{Error, Result, Word};

/// Somewhere an Intcode engine can keep its words.
///
/// Every non-negative address is valid. Addresses that were never written
/// read as zero. Negative addresses are refused without touching anything.
pub trait Memory {
    fn read_word(&self, address: Word) -> Result<Word>;
    fn write_word(&mut self, address: Word, value: Word) -> Result<()>;
}

fn checked_address(address: Word) -> Result<usize> {
    usize::try_from(address).map_err(|_| Error::NegativeAddress(address))
}

/// Writes further than this past the end of the vector go into the far map
/// instead of zero-filling the gap.
pub const MAX_DENSE_GAP: usize = 1 << 20;

/// A flat vector that zero-fills itself whenever something is written past
/// the end. This is what you want for nearly every program.
///
/// A write that lands so far out that filling the gap would be absurd (or
/// the allocation fails) is kept in a small ordered map instead, so every
/// non-negative address still works.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenseMemory {
    words: Vec<Word>,
    far: BTreeMap<usize, Word>,
}

impl DenseMemory {
    /// How many words are currently backed by the vector.
    pub fn len(&self) -> usize {
        self.words.len()
    }
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
    /// The contiguous part of memory, starting at address 0.
    pub fn as_slice(&self) -> &[Word] {
        &self.words
    }
    /// Cells written too far past the vector to be stored in it.
    pub fn far_cells(&self) -> impl Iterator<Item = (usize, Word)> + '_ {
        self.far.iter().map(|(&address, &value)| (address, value))
    }

    fn grow_to_fit(&mut self, index: usize) -> bool {
        let gap = index - self.words.len();
        if gap > MAX_DENSE_GAP || self.words.try_reserve(gap + 1).is_err() {
            return false;
        }
        self.words.resize(index + 1, 0);
        // anything that was parked in the far map now belongs in the vector
        let moved: Vec<usize> = self.far.range(..=index).map(|(&a, _)| a).collect();
        for address in moved {
            if let Some(value) = self.far.remove(&address) {
                self.words[address] = value;
            }
        }
        true
    }
}

impl From<&[Word]> for DenseMemory {
    fn from(program: &[Word]) -> Self {
        DenseMemory {
            words: program.to_vec(),
            far: BTreeMap::new(),
        }
    }
}

impl Memory for DenseMemory {
    fn read_word(&self, address: Word) -> Result<Word> {
        let index = checked_address(address)?;
        Ok(match self.words.get(index) {
            Some(&value) => value,
            None => self.far.get(&index).copied().unwrap_or(0),
        })
    }
    fn write_word(&mut self, address: Word, value: Word) -> Result<()> {
        let index = checked_address(address)?;
        if index < self.words.len() || self.grow_to_fit(index) {
            self.words[index] = value;
        } else {
            log::debug!("parking far write to {index} outside the vector");
            self.far.insert(index, value);
        }
        Ok(())
    }
}

/// Only remembers the addresses that have been written. Use it for programs
/// that scribble at huge addresses, where [`DenseMemory`] would have to
/// allocate everything in between.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMemory {
    words: BTreeMap<usize, Word>,
}

impl From<&[Word]> for SparseMemory {
    fn from(program: &[Word]) -> Self {
        SparseMemory {
            words: program.iter().copied().enumerate().collect(),
        }
    }
}

impl SparseMemory {
    /// Every cell that has been stored, in address order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, Word)> + '_ {
        self.words.iter().map(|(&address, &value)| (address, value))
    }
}

impl Memory for SparseMemory {
    fn read_word(&self, address: Word) -> Result<Word> {
        let index = checked_address(address)?;
        Ok(self.words.get(&index).copied().unwrap_or(0))
    }
    fn write_word(&mut self, address: Word, value: Word) -> Result<()> {
        let index = checked_address(address)?;
        self.words.insert(index, value);
        Ok(())
    }
}
