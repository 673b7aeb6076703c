//! Feature selections: bitsets over a symbol table's index space.

use std::fmt;
use std::sync::Arc;

use crate::alphabet::{SymbolResult, SymbolTable, same_table};
use crate::error::{SymbolError, VectorError};
use crate::symbol::Entry;
use crate::vector::VectorResult;

const WORD_BITS: usize = 64;

/// A subset of the indices of one symbol table.
///
/// Bits are packed into `u64` words and the storage grows as indices beyond
/// the current words are added.
#[derive(Clone)]
pub struct FeatureSelection {
    table: Arc<SymbolTable>,
    words: Vec<u64>,
}

impl FeatureSelection {
    /// An empty selection over `table`.
    pub fn new(table: Arc<SymbolTable>) -> Self {
        let words = vec![0; table.size().div_ceil(WORD_BITS)];
        Self { table, words }
    }

    /// A selection of every index currently in `table`.
    pub fn all(table: Arc<SymbolTable>) -> Self {
        let mut selection = Self::new(table);
        selection.fill_to(selection.table.size());
        selection
    }

    /// A selection of the given indices.
    pub fn from_indices(table: Arc<SymbolTable>, indices: &[usize]) -> SymbolResult<Self> {
        let mut selection = Self::new(table);
        for &index in indices {
            selection.add(index)?;
        }
        Ok(selection)
    }

    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }

    fn fill_to(&mut self, len: usize) {
        for index in 0..len {
            self.set_bit(index, true);
        }
    }

    fn get_bit(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|word| (word >> (index % WORD_BITS)) & 1 == 1)
    }

    fn set_bit(&mut self, index: usize, value: bool) {
        let word = index / WORD_BITS;
        if word >= self.words.len() {
            if !value {
                return;
            }
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << (index % WORD_BITS);
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    /// Select `index`. It must be an index of the table.
    pub fn add(&mut self, index: usize) -> SymbolResult<()> {
        let size = self.table.size();
        if index >= size {
            return Err(SymbolError::IndexOutOfRange { index, size });
        }
        self.set_bit(index, true);
        Ok(())
    }

    /// Select the index of `entry`, which must already be in the table.
    pub fn add_entry(&mut self, entry: &Entry) -> SymbolResult<()> {
        let index = self.table.lookup_strict(entry.clone())?;
        self.set_bit(index, true);
        Ok(())
    }

    /// Deselect `index`. Deselecting an unselected index does nothing.
    pub fn remove(&mut self, index: usize) {
        self.set_bit(index, false);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.get_bit(index)
    }

    /// Number of selected indices.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Selected indices in ascending order.
    pub fn selected(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.cardinality());
        for (w, &word) in self.words.iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                out.push(w * WORD_BITS + bit);
                bits &= bits - 1;
            }
        }
        out
    }

    fn check_table(&self, other: &FeatureSelection) -> VectorResult<()> {
        if same_table(&self.table, &other.table) {
            Ok(())
        } else {
            Err(VectorError::TableMismatch)
        }
    }

    /// Add every index selected in `other`.
    pub fn union_with(&mut self, other: &FeatureSelection) -> VectorResult<()> {
        self.check_table(other)?;
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            *mine |= theirs;
        }
        Ok(())
    }

    /// Keep only indices also selected in `other`.
    pub fn intersect_with(&mut self, other: &FeatureSelection) -> VectorResult<()> {
        self.check_table(other)?;
        for (w, mine) in self.words.iter_mut().enumerate() {
            *mine &= other.words.get(w).copied().unwrap_or(0);
        }
        Ok(())
    }

    /// Flip every index of the table as it is now.
    pub fn invert(&mut self) {
        let size = self.table.size();
        self.words.resize(size.div_ceil(WORD_BITS), 0);
        for word in &mut self.words {
            *word = !*word;
        }
        let tail = size % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }
}

impl PartialEq for FeatureSelection {
    fn eq(&self, other: &Self) -> bool {
        same_table(&self.table, &other.table) && self.selected() == other.selected()
    }
}

impl fmt::Debug for FeatureSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSelection")
            .field("table", &self.table.id())
            .field("selected", &self.selected())
            .finish()
    }
}
