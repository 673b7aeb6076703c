//! Feature vectors: sparse vectors bound to a symbol table.
//!
//! A [`FeatureVector`] pairs a [`SparseVector`] with the `Arc<SymbolTable>`
//! that names its indices, so values can be read by entry as well as by
//! index. Two derived constructions move a vector between tables:
//!
//! - [`FeatureVector::with_conjunctions`] adds pairwise conjunction features
//!   that a destination table already names;
//! - [`FeatureVector::project`] keeps only selected features and re-indexes
//!   them through a destination table.
//!
//! [`FeatureSelection`] is the bitset over table indices both use.

pub mod selection;

pub use selection::FeatureSelection;

use std::fmt;
use std::sync::Arc;

use crate::alphabet::{SymbolTable, same_table};
use crate::error::{AlgebraResult, SymbolError, VectorError};
use crate::symbol::Entry;
use crate::vector::{BuildOptions, SparseVector, Vector, extended};

/// A sparse vector whose indices are entries of a symbol table.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    table: Arc<SymbolTable>,
    vector: SparseVector,
}

impl FeatureVector {
    /// Bind `vector` to `table`. Every index must name an entry of the table.
    pub fn new(table: Arc<SymbolTable>, vector: SparseVector) -> AlgebraResult<Self> {
        let size = table.size();
        if let Some(max) = vector.max_index() {
            if max >= size {
                return Err(VectorError::IndexOutOfRange { index: max, size }.into());
            }
        }
        Ok(Self { table, vector })
    }

    /// Build from entries, adding unseen ones to the table.
    ///
    /// `values == None` makes a binary vector. Entries a frozen table
    /// rejects are dropped together with their values.
    pub fn from_entries(
        table: Arc<SymbolTable>,
        entries: &[Entry],
        values: Option<&[f64]>,
    ) -> AlgebraResult<Self> {
        if let Some(values) = values {
            if values.len() != entries.len() {
                return Err(VectorError::LengthMismatch {
                    indices: entries.len(),
                    values: values.len(),
                }
                .into());
            }
        }

        let mut indices = Vec::with_capacity(entries.len());
        let mut kept = values.map(|_| Vec::with_capacity(entries.len()));
        for (position, entry) in entries.iter().enumerate() {
            match table.lookup_entry(entry, true)? {
                Some(index) => {
                    indices.push(index);
                    if let (Some(kept), Some(values)) = (kept.as_mut(), values) {
                        kept.push(values[position]);
                    }
                }
                None => tracing::trace!(%entry, "dropped entry rejected by frozen table"),
            }
        }

        let options = BuildOptions::default().with_size(table.size());
        let vector = SparseVector::new(indices, kept, options)?;
        Ok(Self { table, vector })
    }

    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }

    pub fn sparse(&self) -> &SparseVector {
        &self.vector
    }

    /// Overwrite the value of a feature this vector already holds.
    ///
    /// The index set only grows through [`FeatureVector::add`], which keeps
    /// every index inside the table.
    pub fn set_value(&mut self, entry: &Entry, value: f64) -> AlgebraResult<()> {
        let index = self.index_of(entry)?;
        Ok(self.vector.set_value(index, value)?)
    }

    /// Set the value stored at `location`.
    pub fn set_value_at_location(&mut self, location: usize, value: f64) -> AlgebraResult<()> {
        Ok(self.vector.set_value_at_location(location, value)?)
    }

    /// Multiply every present value by `factor`.
    pub fn times_equals(&mut self, factor: f64) -> AlgebraResult<()> {
        Ok(self.vector.times_equals(factor)?)
    }

    pub fn into_sparse(self) -> SparseVector {
        self.vector
    }

    fn index_of(&self, entry: &Entry) -> AlgebraResult<usize> {
        self.table
            .lookup_entry(entry, false)?
            .ok_or_else(|| {
                SymbolError::UnknownEntry {
                    entry: entry.to_string(),
                }
                .into()
            })
    }

    /// Value of `entry`; 0.0 when the table knows it but this vector does not.
    pub fn value_of(&self, entry: &Entry) -> AlgebraResult<f64> {
        let index = self.index_of(entry)?;
        Ok(self.vector.value(index))
    }

    /// Whether this vector holds `entry`.
    pub fn contains(&self, entry: &Entry) -> AlgebraResult<bool> {
        let index = self.index_of(entry)?;
        Ok(self.vector.location(index).is_some())
    }

    /// Accumulate `value` at `entry`, adding the entry to the table if it is
    /// not frozen. Returns `false` when a frozen table rejected the entry.
    pub fn add(&mut self, entry: &Entry, value: f64) -> AlgebraResult<bool> {
        let Some(index) = self.table.lookup_entry(entry, true)? else {
            return Ok(false);
        };
        if self.vector.is_binary() {
            self.vector.add_index(index)?;
        } else {
            self.vector.add(index, value)?;
        }
        self.vector.extend_size(self.table.size());
        Ok(true)
    }

    /// Entries of the present features in location order.
    pub fn entries_present(&self) -> AlgebraResult<Vec<Entry>> {
        let indices: Vec<usize> = (0..self.vector.num_locations())
            .map(|location| self.vector.index_at_location(location))
            .collect();
        Ok(self.table.objects(&indices)?)
    }

    /// This vector re-indexed into `dest`, plus every pairwise conjunction
    /// `dest` already names.
    ///
    /// Conjunction values are the product of the two feature values. Original
    /// features absent from `dest` are dropped.
    pub fn with_conjunctions(&self, dest: &Arc<SymbolTable>) -> AlgebraResult<FeatureVector> {
        self.conjoin(dest, None)
    }

    /// Like [`FeatureVector::with_conjunctions`], but only features in
    /// `selection` take part in conjunctions.
    pub fn with_conjunctions_selected(
        &self,
        dest: &Arc<SymbolTable>,
        selection: &FeatureSelection,
    ) -> AlgebraResult<FeatureVector> {
        if !same_table(selection.table(), &self.table) {
            return Err(VectorError::TableMismatch.into());
        }
        self.conjoin(dest, Some(selection))
    }

    fn conjoin(
        &self,
        dest: &Arc<SymbolTable>,
        selection: Option<&FeatureSelection>,
    ) -> AlgebraResult<FeatureVector> {
        let entries = self.entries_present()?;
        let values: Vec<f64> = (0..self.vector.num_locations())
            .map(|location| self.vector.value_at_location(location))
            .collect();

        let mut indices = Vec::new();
        let mut combined = Vec::new();
        for (entry, &value) in entries.iter().zip(&values) {
            if let Some(index) = dest.lookup_entry(entry, false)? {
                indices.push(index);
                combined.push(value);
            }
        }

        let conjoinable: Vec<usize> = (0..entries.len())
            .filter(|&location| {
                selection.is_none_or(|s| s.contains(self.vector.index_at_location(location)))
            })
            .collect();
        let mut found = 0usize;
        for (a, &i) in conjoinable.iter().enumerate() {
            for &j in &conjoinable[a + 1..] {
                let name = Entry::conjunction(&entries[i], &entries[j]);
                // A table of another entry kind cannot name a conjunction.
                if !dest.contains(&name) {
                    continue;
                }
                if let Some(index) = dest.lookup_entry(&name, false)? {
                    indices.push(index);
                    combined.push(extended::mul(values[i], values[j]));
                    found += 1;
                }
            }
        }
        tracing::trace!(
            originals = entries.len(),
            conjunctions = found,
            "expanded feature conjunctions"
        );

        let values = (!self.vector.is_binary()).then_some(combined);
        let options = BuildOptions::default().with_size(dest.size());
        let vector = SparseVector::new(indices, values, options)?;
        Ok(FeatureVector {
            table: Arc::clone(dest),
            vector,
        })
    }

    /// The selected features of this vector, re-indexed into `dest`.
    ///
    /// `selection` must be over this vector's own table. Selected entries are
    /// added to `dest` unless it is frozen, in which case they are dropped.
    pub fn project(
        &self,
        selection: &FeatureSelection,
        dest: &Arc<SymbolTable>,
    ) -> AlgebraResult<FeatureVector> {
        if !same_table(selection.table(), &self.table) {
            return Err(VectorError::TableMismatch.into());
        }

        let mut indices = Vec::new();
        let mut values = Vec::new();
        for location in 0..self.vector.num_locations() {
            let index = self.vector.index_at_location(location);
            if !selection.contains(index) {
                continue;
            }
            let entry = self.table.object_strict(index)?;
            match dest.lookup_entry(&entry, true)? {
                Some(projected) => {
                    indices.push(projected);
                    values.push(self.vector.value_at_location(location));
                }
                None => tracing::trace!(%entry, "projection dropped entry rejected by frozen table"),
            }
        }

        let values = (!self.vector.is_binary()).then_some(values);
        let options = BuildOptions::default().with_size(dest.size());
        let vector = SparseVector::new(indices, values, options)?;
        Ok(FeatureVector {
            table: Arc::clone(dest),
            vector,
        })
    }
}

impl Vector for FeatureVector {
    fn size(&self) -> usize {
        self.vector.size()
    }

    fn num_locations(&self) -> usize {
        self.vector.num_locations()
    }

    fn index_at_location(&self, location: usize) -> usize {
        self.vector.index_at_location(location)
    }

    fn value_at_location(&self, location: usize) -> f64 {
        self.vector.value_at_location(location)
    }

    fn location(&self, index: usize) -> Option<usize> {
        self.vector.location(index)
    }

    fn has_infinite(&self) -> bool {
        self.vector.has_infinite()
    }

    fn dense_values(&self) -> Option<&[f64]> {
        self.vector.dense_values()
    }

    fn is_binary(&self) -> bool {
        self.vector.is_binary()
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for location in 0..self.vector.num_locations() {
            if location > 0 {
                write!(f, " ")?;
            }
            let index = self.vector.index_at_location(location);
            let value = self.vector.value_at_location(location);
            match self.table.object(index) {
                Some(entry) => write!(f, "{entry}({value})")?,
                None => write!(f, "#{index}({value})")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlgebraError;

    fn words(names: &[&str]) -> Arc<SymbolTable> {
        Arc::new(SymbolTable::from_entries(names.iter().copied()).unwrap())
    }

    fn entry(name: &str) -> Entry {
        Entry::from(name)
    }

    #[test]
    fn value_mutators_keep_indices_inside_the_table() {
        let table = words(&["a", "b", "c"]);
        table.freeze();
        let mut fv = FeatureVector::from_entries(
            Arc::clone(&table),
            &[entry("a"), entry("c")],
            Some(&[1.0, 2.0]),
        )
        .unwrap();

        fv.set_value(&entry("c"), 5.0).unwrap();
        fv.times_equals(2.0).unwrap();
        fv.set_value_at_location(0, -1.0).unwrap();
        assert_eq!(fv.value_of(&entry("a")).unwrap(), -1.0);
        assert_eq!(fv.value_of(&entry("c")).unwrap(), 10.0);

        assert!(matches!(
            fv.set_value(&entry("b"), 1.0),
            Err(AlgebraError::Vector(VectorError::AbsentIndex { index: 1 }))
        ));
        assert!(matches!(
            fv.set_value(&entry("zzz"), 1.0),
            Err(AlgebraError::Symbol(SymbolError::UnknownEntry { .. }))
        ));
        assert!(matches!(
            fv.set_value_at_location(2, 1.0),
            Err(AlgebraError::Vector(VectorError::IndexOutOfRange { .. }))
        ));
        assert!(!fv.add(&entry("d"), 1.0).unwrap());

        assert_eq!(table.size(), 3);
        assert!(fv.sparse().max_index().unwrap() < table.size());
        assert!(FeatureVector::new(Arc::clone(&table), fv.sparse().clone()).is_ok());
    }

    #[test]
    fn value_by_entry() {
        let table = words(&["a", "b", "c"]);
        let fv = FeatureVector::from_entries(
            Arc::clone(&table),
            &[entry("c"), entry("a")],
            Some(&[3.0, 1.0]),
        )
        .unwrap();
        assert_eq!(fv.value_of(&entry("c")).unwrap(), 3.0);
        assert_eq!(fv.value_of(&entry("b")).unwrap(), 0.0);
        assert!(fv.contains(&entry("a")).unwrap());
        assert!(!fv.contains(&entry("b")).unwrap());
        assert!(matches!(
            fv.value_of(&entry("zzz")),
            Err(AlgebraError::Symbol(SymbolError::UnknownEntry { .. }))
        ));
        // Queries never grow the table.
        assert_eq!(table.size(), 3);
    }

    #[test]
    fn new_rejects_indices_beyond_table() {
        let table = words(&["a", "b"]);
        let sparse = SparseVector::binary(vec![0, 2]).unwrap();
        assert!(matches!(
            FeatureVector::new(table, sparse),
            Err(AlgebraError::Vector(VectorError::IndexOutOfRange { index: 2, size: 2 }))
        ));
    }

    #[test]
    fn from_entries_drops_what_frozen_table_rejects() {
        let table = words(&["a"]);
        table.freeze();
        let fv = FeatureVector::from_entries(
            Arc::clone(&table),
            &[entry("a"), entry("new")],
            Some(&[2.0, 5.0]),
        )
        .unwrap();
        assert_eq!(fv.num_locations(), 1);
        assert_eq!(fv.value_of(&entry("a")).unwrap(), 2.0);
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn add_grows_table_and_vector() {
        let table = words(&["a"]);
        let mut fv = FeatureVector::from_entries(Arc::clone(&table), &[entry("a")], Some(&[1.0])).unwrap();
        assert!(fv.add(&entry("b"), 2.0).unwrap());
        assert!(fv.add(&entry("a"), 0.5).unwrap());
        assert_eq!(fv.value_of(&entry("a")).unwrap(), 1.5);
        assert_eq!(fv.value_of(&entry("b")).unwrap(), 2.0);
        assert_eq!(fv.size(), 2);

        table.freeze();
        assert!(!fv.add(&entry("c"), 1.0).unwrap());
    }

    #[test]
    fn conjunctions_named_in_destination() {
        let source = words(&["x", "y", "z"]);
        let fv = FeatureVector::from_entries(
            Arc::clone(&source),
            &[entry("x"), entry("y"), entry("z")],
            Some(&[2.0, 3.0, 5.0]),
        )
        .unwrap();

        let dest = Arc::new(source.as_ref().clone());
        dest.lookup(Entry::conjunction(&entry("x"), &entry("z")), true).unwrap();
        dest.lookup(Entry::conjunction(&entry("y"), &entry("z")), true).unwrap();

        let expanded = fv.with_conjunctions(&dest).unwrap();
        assert!(same_table(expanded.table(), &dest));
        assert_eq!(expanded.num_locations(), 5);
        assert_eq!(expanded.value_of(&entry("x")).unwrap(), 2.0);
        assert_eq!(expanded.value_of(&Entry::from("x_&_z")).unwrap(), 10.0);
        assert_eq!(expanded.value_of(&Entry::from("y_&_z")).unwrap(), 15.0);
        let indices: Vec<usize> = expanded.sparse().indices().unwrap().to_vec();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        // x_&_y was never named, so it is not produced.
        assert_eq!(dest.size(), 5);
    }

    #[test]
    fn binary_conjunctions_stay_binary() {
        let source = words(&["p", "q"]);
        let fv = FeatureVector::from_entries(Arc::clone(&source), &[entry("p"), entry("q")], None).unwrap();
        let dest = Arc::new(source.as_ref().clone());
        dest.lookup("p_&_q", true).unwrap();
        let expanded = fv.with_conjunctions(&dest).unwrap();
        assert!(expanded.is_binary());
        assert_eq!(expanded.value_of(&entry("p_&_q")).unwrap(), 1.0);
    }

    #[test]
    fn conjunctions_restricted_by_selection() {
        let source = words(&["x", "y", "z"]);
        let fv = FeatureVector::from_entries(
            Arc::clone(&source),
            &[entry("x"), entry("y"), entry("z")],
            None,
        )
        .unwrap();
        let dest = Arc::new(source.as_ref().clone());
        dest.lookup("x_&_y", true).unwrap();
        dest.lookup("y_&_z", true).unwrap();

        let selection = FeatureSelection::from_indices(Arc::clone(&source), &[0, 1]).unwrap();
        let expanded = fv.with_conjunctions_selected(&dest, &selection).unwrap();
        assert!(expanded.contains(&entry("x_&_y")).unwrap());
        assert!(!expanded.contains(&entry("y_&_z")).unwrap());
        // Unselected originals are kept.
        assert!(expanded.contains(&entry("z")).unwrap());
    }

    #[test]
    fn conjunctions_against_integer_table_yield_originals_only() {
        let source = Arc::new(SymbolTable::from_entries([1i64, 2]).unwrap());
        let fv = FeatureVector::from_entries(
            Arc::clone(&source),
            &[Entry::Integer(1), Entry::Integer(2)],
            None,
        )
        .unwrap();
        let expanded = fv.with_conjunctions(&source).unwrap();
        assert_eq!(expanded.num_locations(), 2);
    }

    #[test]
    fn projection_with_full_selection_reproduces_pairs() {
        let source = words(&["a", "b", "c", "d"]);
        let fv = FeatureVector::from_entries(
            Arc::clone(&source),
            &[entry("d"), entry("b"), entry("a")],
            Some(&[4.0, 2.0, 1.0]),
        )
        .unwrap();
        let all = FeatureSelection::all(Arc::clone(&source));

        let identical = Arc::new(source.as_ref().clone());
        let projected = fv.project(&all, &identical).unwrap();
        let before: Vec<_> = fv.entries().collect();
        let after: Vec<_> = projected.entries().collect();
        assert_eq!(before, after);
        assert_eq!(identical.size(), 4);
    }

    #[test]
    fn projection_into_smaller_table() {
        let source = words(&["a", "b", "c", "d"]);
        let fv = FeatureVector::from_entries(
            Arc::clone(&source),
            &[entry("a"), entry("c"), entry("d")],
            Some(&[1.0, 3.0, 4.0]),
        )
        .unwrap();
        let selection = FeatureSelection::from_indices(Arc::clone(&source), &[2, 3]).unwrap();

        let dest = words(&["d"]);
        let projected = fv.project(&selection, &dest).unwrap();
        assert_eq!(dest.entries(), vec![entry("d"), entry("c")]);
        assert_eq!(projected.sparse().indices(), Some(&[0, 1][..]));
        assert_eq!(projected.value_of(&entry("c")).unwrap(), 3.0);
        assert_eq!(projected.value_of(&entry("d")).unwrap(), 4.0);
        assert!(projected.value_of(&entry("a")).is_err());
    }

    #[test]
    fn projection_into_frozen_table_drops_unknown() {
        let source = words(&["a", "b"]);
        let fv = FeatureVector::from_entries(Arc::clone(&source), &[entry("a"), entry("b")], None).unwrap();
        let dest = words(&["b"]);
        dest.freeze();
        let projected = fv.project(&FeatureSelection::all(Arc::clone(&source)), &dest).unwrap();
        assert_eq!(projected.num_locations(), 1);
        assert!(projected.contains(&entry("b")).unwrap());
    }

    #[test]
    fn projection_requires_the_source_table() {
        let source = words(&["a"]);
        let fv = FeatureVector::from_entries(Arc::clone(&source), &[entry("a")], None).unwrap();
        let foreign = FeatureSelection::all(words(&["a"]));
        assert!(matches!(
            fv.project(&foreign, &source),
            Err(AlgebraError::Vector(VectorError::TableMismatch))
        ));
    }

    #[test]
    fn display_lists_entries() {
        let table = words(&["dog", "cat"]);
        let fv = FeatureVector::from_entries(table, &[entry("cat"), entry("dog")], Some(&[0.5, 2.0])).unwrap();
        assert_eq!(fv.to_string(), "dog(2) cat(0.5)");
    }
}
