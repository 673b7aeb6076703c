//! Core entry and identity types for symbol tables.
//!
//! An [`Entry`] is the domain object a table maps to a dense integer index.
//! Its variant is its runtime type ([`EntryKind`]); a table accepts a single
//! kind. Every table carries a [`TableId`] that is unique within the process
//! and survives persistence, so decoding can restore shared-table identity.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A domain object stored in a symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entry {
    /// A word, feature name, or label name.
    Text(String),
    /// An integer key (e.g. a hashed feature or a class id).
    Integer(i64),
    /// A single character (character-level vocabularies).
    Char(char),
    /// An ordered pair of entries (e.g. a label bigram).
    Pair(Box<Entry>, Box<Entry>),
}

impl Entry {
    /// The runtime kind of this entry.
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Text(_) => EntryKind::Text,
            Entry::Integer(_) => EntryKind::Integer,
            Entry::Char(_) => EntryKind::Char,
            Entry::Pair(..) => EntryKind::Pair,
        }
    }

    /// Create a pair entry.
    pub fn pair(first: impl Into<Entry>, second: impl Into<Entry>) -> Self {
        Entry::Pair(Box::new(first.into()), Box::new(second.into()))
    }

    /// The entry naming the conjunction of two features.
    ///
    /// Conjunction names are always text, so a table of conjoined features
    /// must be a text table.
    pub fn conjunction(first: &Entry, second: &Entry) -> Self {
        Entry::Text(format!("{first}{CONJUNCTION_SEPARATOR}{second}"))
    }

    /// Borrow the text of a `Text` entry.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Entry::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Separator placed between the two feature names of a conjunction entry.
pub const CONJUNCTION_SEPARATOR: &str = "_&_";

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Text(s) => write!(f, "{s}"),
            Entry::Integer(i) => write!(f, "{i}"),
            Entry::Char(c) => write!(f, "{c}"),
            Entry::Pair(a, b) => write!(f, "({a},{b})"),
        }
    }
}

impl From<&str> for Entry {
    fn from(s: &str) -> Self {
        Entry::Text(s.to_owned())
    }
}

impl From<String> for Entry {
    fn from(s: String) -> Self {
        Entry::Text(s)
    }
}

impl From<i64> for Entry {
    fn from(i: i64) -> Self {
        Entry::Integer(i)
    }
}

impl From<char> for Entry {
    fn from(c: char) -> Self {
        Entry::Char(c)
    }
}

/// Runtime type tag of an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Text,
    Integer,
    Char,
    Pair,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Text => write!(f, "Text"),
            EntryKind::Integer => write!(f, "Integer"),
            EntryKind::Char => write!(f, "Char"),
            EntryKind::Pair => write!(f, "Pair"),
        }
    }
}

/// Process-scoped unique identifier of a symbol table.
///
/// The high 64 bits are a per-process random salt and the low 64 bits a
/// monotonically increasing counter, so ids minted by different processes
/// do not collide when their tables meet in one decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TableId(u128);

static NEXT_TABLE: AtomicU64 = AtomicU64::new(1);
static PROCESS_SALT: OnceLock<u64> = OnceLock::new();

impl TableId {
    /// Mint a new identifier, distinct from every other id of this process.
    pub fn fresh() -> Self {
        let salt = *PROCESS_SALT.get_or_init(rand::random::<u64>);
        let counter = NEXT_TABLE.fetch_add(1, Ordering::Relaxed);
        TableId(((salt as u128) << 64) | counter as u128)
    }

    /// Big-endian byte form used by the persisted layout.
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Rebuild an id from its persisted bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        TableId(u128::from_be_bytes(bytes))
    }

    /// Get the underlying `u128` value.
    pub fn get(self) -> u128 {
        self.0
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table:{:032x}", self.0)
    }
}
