//! Label tables: symbol tables that hand out one [`Label`] handle per index.
//!
//! Classifiers keep labels rather than bare indices so that a prediction
//! always knows which table it indexes into. Handles are materialized when
//! their entry is first inserted and reused afterwards.

use std::sync::{Arc, PoisonError, RwLock};

use super::{SymbolResult, SymbolTable};
use crate::symbol::{Entry, TableId};

/// A lightweight handle for one entry of a [`LabelTable`].
#[derive(Clone)]
pub struct Label {
    index: usize,
    entry: Entry,
    table: Arc<SymbolTable>,
}

impl Label {
    /// Index of this label in its table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The entry this label stands for.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// The table this label belongs to.
    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && Arc::ptr_eq(&self.table, &other.table)
    }
}

impl Eq for Label {}

impl std::hash::Hash for Label {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.table.id().hash(state);
        self.index.hash(state);
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.entry)
    }
}

impl std::fmt::Debug for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Label")
            .field("index", &self.index)
            .field("entry", &self.entry)
            .field("table", &self.table.id())
            .finish()
    }
}

/// A symbol table specialized for output labels.
///
/// Invariant: after every operation there is exactly one label per table
/// entry, and label `i` carries index `i` and entry `i`.
pub struct LabelTable {
    table: Arc<SymbolTable>,
    labels: RwLock<Vec<Label>>,
}

impl LabelTable {
    /// Create an empty label table.
    pub fn new() -> Self {
        Self::from_table(Arc::new(SymbolTable::new()))
    }

    /// Wrap an existing shared table, materializing a label per entry.
    pub fn from_table(table: Arc<SymbolTable>) -> Self {
        let labels = Self {
            table,
            labels: RwLock::new(Vec::new()),
        };
        labels.sync();
        labels
    }

    /// Create handles for entries the table gained since the last call.
    ///
    /// The underlying table is shared, so it may have grown through
    /// another holder.
    fn sync(&self) {
        let size = self.table.size();
        let mut labels = self.labels.write().unwrap_or_else(PoisonError::into_inner);
        for index in labels.len()..size {
            if let Some(entry) = self.table.object(index) {
                labels.push(Label {
                    index,
                    entry,
                    table: Arc::clone(&self.table),
                });
            }
        }
    }

    /// Look up the label of `entry`, inserting it when `add_if_absent` is set.
    pub fn lookup_label(&self, entry: impl Into<Entry>, add_if_absent: bool) -> SymbolResult<Option<Label>> {
        let Some(index) = self.table.lookup(entry, add_if_absent)? else {
            return Ok(None);
        };
        Ok(self.label(index))
    }

    /// Look up the index of `entry` (same contract as [`SymbolTable::lookup`]).
    pub fn lookup(&self, entry: impl Into<Entry>, add_if_absent: bool) -> SymbolResult<Option<usize>> {
        let index = self.table.lookup(entry, add_if_absent)?;
        self.sync();
        Ok(index)
    }

    /// The label at `index`, if any.
    pub fn label(&self, index: usize) -> Option<Label> {
        {
            let labels = self.labels.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(label) = labels.get(index) {
                return Some(label.clone());
            }
        }
        self.sync();
        let labels = self.labels.read().unwrap_or_else(PoisonError::into_inner);
        labels.get(index).cloned()
    }

    /// All labels in index order.
    pub fn labels(&self) -> Vec<Label> {
        self.sync();
        self.labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The entry at `index`, if any.
    pub fn object(&self, index: usize) -> Option<Entry> {
        self.table.object(index)
    }

    /// Number of labels.
    pub fn size(&self) -> usize {
        self.table.size()
    }

    /// Stop growth of the underlying table.
    pub fn freeze(&self) {
        self.table.freeze();
    }

    /// Allow growth again.
    pub fn unfreeze(&self) {
        self.table.unfreeze();
    }

    /// The shared underlying table.
    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }

    /// Identity of the underlying table.
    pub fn id(&self) -> TableId {
        self.table.id()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LabelTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelTable")
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_track_indices() {
        let labels = LabelTable::new();
        let pos = labels.lookup_label("POS", true).unwrap().unwrap();
        let neg = labels.lookup_label("NEG", true).unwrap().unwrap();
        assert_eq!(pos.index(), 0);
        assert_eq!(neg.index(), 1);
        assert_eq!(neg.entry(), &Entry::from("NEG"));
        assert_eq!(labels.size(), 2);

        let again = labels.lookup_label("POS", true).unwrap().unwrap();
        assert_eq!(again, pos);
        assert_ne!(pos, neg);
    }

    #[test]
    fn labels_from_different_tables_differ() {
        let a = LabelTable::new();
        let b = LabelTable::new();
        let la = a.lookup_label("X", true).unwrap().unwrap();
        let lb = b.lookup_label("X", true).unwrap().unwrap();
        assert_eq!(la.index(), lb.index());
        assert_ne!(la, lb);
    }

    #[test]
    fn frozen_label_table_returns_none() {
        let labels = LabelTable::new();
        labels.lookup("A", true).unwrap();
        labels.freeze();
        assert!(labels.lookup_label("B", true).unwrap().is_none());
        assert_eq!(labels.labels().len(), 1);
    }

    #[test]
    fn growth_through_shared_table_is_picked_up() {
        let table = Arc::new(SymbolTable::new());
        let labels = LabelTable::from_table(Arc::clone(&table));
        table.lookup("O", true).unwrap();
        table.lookup("B-PER", true).unwrap();

        let all = labels.labels();
        assert_eq!(all.len(), table.size());
        for (i, label) in all.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(Some(label.entry().clone()), table.object(i));
        }
        assert_eq!(labels.label(1).unwrap().to_string(), "B-PER");
        assert!(labels.label(2).is_none());
    }
}
