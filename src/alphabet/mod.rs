//! Symbol tables: append-only bidirectional entry ↔ index maps.
//!
//! A [`SymbolTable`] (an "alphabet") assigns dense indices `0..n` to entries
//! in order of first insertion. Tables are shared by reference between many
//! vectors and selections via `Arc<SymbolTable>`; any holder may grow or
//! freeze the table and every other holder observes the change.
//!
//! [`LabelTable`] additionally materializes one [`Label`] handle per index.

pub mod label;

pub use label::{Label, LabelTable};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::SymbolError;
use crate::symbol::{Entry, EntryKind, TableId};

/// Result type for symbol table operations.
pub type SymbolResult<T> = std::result::Result<T, SymbolError>;

#[derive(Debug, Clone, Default)]
struct TableState {
    /// Index → entry (insertion order).
    entries: Vec<Entry>,
    /// Entry → index.
    index: HashMap<Entry, usize>,
    /// Kind fixed by the first accepted entry.
    kind: Option<EntryKind>,
}

impl TableState {
    fn check_kind(&self, entry: &Entry) -> SymbolResult<()> {
        match self.kind {
            Some(kind) if kind != entry.kind() => Err(SymbolError::EntryKindMismatch {
                expected: kind.to_string(),
                actual: entry.kind().to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Append-only bidirectional map between entries and dense indices.
pub struct SymbolTable {
    id: TableId,
    state: RwLock<TableState>,
    /// Growth-stopped flag: unknown entries are reported absent, never inserted.
    frozen: AtomicBool,
}

impl SymbolTable {
    /// Create a new, empty, growable table.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty table with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: TableId::fresh(),
            state: RwLock::new(TableState {
                entries: Vec::with_capacity(capacity),
                index: HashMap::with_capacity(capacity),
                kind: None,
            }),
            frozen: AtomicBool::new(false),
        }
    }

    /// Create a table pre-populated with `entries`, in order.
    ///
    /// Duplicate entries keep their first index.
    pub fn from_entries<I, E>(entries: I) -> SymbolResult<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let table = Self::new();
        for entry in entries {
            table.lookup(entry, true)?;
        }
        Ok(table)
    }

    /// Rebuild a table with a known identity, as read back from storage.
    ///
    /// Fails if the entries are of mixed kinds. Duplicates are rejected as
    /// well, since they would break index contiguity.
    pub(crate) fn restore(id: TableId, entries: Vec<Entry>, frozen: bool) -> SymbolResult<Self> {
        let mut state = TableState {
            entries: Vec::with_capacity(entries.len()),
            index: HashMap::with_capacity(entries.len()),
            kind: None,
        };
        for entry in entries {
            state.check_kind(&entry)?;
            if state.index.contains_key(&entry) {
                return Err(SymbolError::DuplicateEntry {
                    entry: entry.to_string(),
                });
            }
            state.kind.get_or_insert(entry.kind());
            state.index.insert(entry.clone(), state.entries.len());
            state.entries.push(entry);
        }
        Ok(Self {
            id,
            state: RwLock::new(state),
            frozen: AtomicBool::new(frozen),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, TableState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process-scoped unique identifier of this table.
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Look up the index of `entry`, inserting it when `add_if_absent` is set.
    ///
    /// Returns `Ok(None)` when the entry is unknown and either insertion was
    /// not requested or the table is frozen. Fails when the entry's kind
    /// differs from the table's.
    pub fn lookup(&self, entry: impl Into<Entry>, add_if_absent: bool) -> SymbolResult<Option<usize>> {
        self.lookup_entry(&entry.into(), add_if_absent)
    }

    /// Like [`lookup`](Self::lookup), borrowing the entry.
    pub fn lookup_entry(&self, entry: &Entry, add_if_absent: bool) -> SymbolResult<Option<usize>> {
        {
            let state = self.read();
            state.check_kind(entry)?;
            if let Some(&index) = state.index.get(entry) {
                return Ok(Some(index));
            }
        }
        if !add_if_absent {
            return Ok(None);
        }
        if self.is_frozen() {
            tracing::trace!(table = %self.id, %entry, "frozen table rejected new entry");
            return Ok(None);
        }

        let mut state = self.write();
        // The flag only changes under the write lock, so this check is final.
        if self.is_frozen() {
            tracing::trace!(table = %self.id, %entry, "frozen table rejected new entry");
            return Ok(None);
        }
        // Another holder may have inserted it between the two locks.
        state.check_kind(entry)?;
        if let Some(&index) = state.index.get(entry) {
            return Ok(Some(index));
        }
        let index = state.entries.len();
        state.kind.get_or_insert(entry.kind());
        state.index.insert(entry.clone(), index);
        state.entries.push(entry.clone());
        Ok(Some(index))
    }

    /// Look up an entry that must already be present.
    pub fn lookup_strict(&self, entry: impl Into<Entry>) -> SymbolResult<usize> {
        let entry = entry.into();
        self.lookup_entry(&entry, false)?
            .ok_or_else(|| SymbolError::UnknownEntry {
                entry: entry.to_string(),
            })
    }

    /// Look up a batch of entries.
    pub fn lookup_all<I, E>(&self, entries: I, add_if_absent: bool) -> SymbolResult<Vec<Option<usize>>>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        entries
            .into_iter()
            .map(|e| self.lookup(e, add_if_absent))
            .collect()
    }

    /// The entry at `index`, if any.
    pub fn object(&self, index: usize) -> Option<Entry> {
        self.read().entries.get(index).cloned()
    }

    /// The entry at `index`, failing when out of range.
    pub fn object_strict(&self, index: usize) -> SymbolResult<Entry> {
        let state = self.read();
        state
            .entries
            .get(index)
            .cloned()
            .ok_or(SymbolError::IndexOutOfRange {
                index,
                size: state.entries.len(),
            })
    }

    /// Entries for a batch of indices.
    pub fn objects(&self, indices: &[usize]) -> SymbolResult<Vec<Entry>> {
        let state = self.read();
        indices
            .iter()
            .map(|&index| {
                state
                    .entries
                    .get(index)
                    .cloned()
                    .ok_or(SymbolError::IndexOutOfRange {
                        index,
                        size: state.entries.len(),
                    })
            })
            .collect()
    }

    /// Snapshot of all entries in index order.
    pub fn entries(&self) -> Vec<Entry> {
        self.read().entries.clone()
    }

    /// Whether `entry` is present. Never inserts.
    pub fn contains(&self, entry: &Entry) -> bool {
        self.read().index.contains_key(entry)
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.read().entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Kind of the entries held, once the first entry is accepted.
    pub fn entry_kind(&self) -> Option<EntryKind> {
        self.read().kind
    }

    /// Stop growth: unknown entries are reported absent from now on.
    ///
    /// Waits for an insert in progress, so no entry is added once this returns.
    pub fn freeze(&self) {
        let size = self.set_frozen(true);
        tracing::debug!(table = %self.id, size, "symbol table frozen");
    }

    /// Allow growth again.
    pub fn unfreeze(&self) {
        let size = self.set_frozen(false);
        tracing::debug!(table = %self.id, size, "symbol table unfrozen");
    }

    fn set_frozen(&self, frozen: bool) -> usize {
        let state = self.write();
        self.frozen.store(frozen, Ordering::Release);
        state.entries.len()
    }

    /// Whether growth is stopped.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

/// Whether two handles refer to the same table instance.
pub fn same_table(a: &Arc<SymbolTable>, b: &Arc<SymbolTable>) -> bool {
    Arc::ptr_eq(a, b)
}

/// Pairwise identity check of the tables attached to two carriers.
///
/// Carriers (instances, pipes) hold one table per role; they co-operate only
/// when every role uses the very same table.
pub fn tables_match(a: &[Arc<SymbolTable>], b: &[Arc<SymbolTable>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy of both directions and the frozen flag.
///
/// The copy is a different table and receives a fresh identity.
impl Clone for SymbolTable {
    fn clone(&self) -> Self {
        Self {
            id: TableId::fresh(),
            state: RwLock::new(self.read().clone()),
            frozen: AtomicBool::new(self.is_frozen()),
        }
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("id", &self.id)
            .field("size", &self.size())
            .field("kind", &self.entry_kind())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
