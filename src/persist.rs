//! Versioned binary persistence.
//!
//! Every persisted type has a `serde` record carrying a version tag, encoded
//! with `bincode`. The layout is private to this crate: it only has to read
//! back what it wrote.
//!
//! Symbol tables are shared between many vectors, and that sharing must
//! survive a round trip. A [`DecodeSession`] keeps one live table per
//! [`TableId`]: the first record seen for an id creates the table and every
//! later record with the same id resolves to that instance. Sessions are
//! independent of each other, so separate loads never leak tables into one
//! another.

use std::io::{Read, Write};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::alphabet::{LabelTable, SymbolTable};
use crate::error::PersistError;
use crate::feature::FeatureVector;
use crate::symbol::{Entry, EntryKind, TableId};
use crate::vector::{AcceleratorKind, BuildOptions, DenseVector, SparseVector, Vector};

/// Result type for persistence operations.
pub type PersistResult<T> = std::result::Result<T, PersistError>;

pub const TABLE_VERSION: u32 = 1;
pub const SPARSE_VERSION: u32 = 1;
pub const DENSE_VERSION: u32 = 1;
pub const FEATURE_VERSION: u32 = 1;
pub const LABEL_TABLE_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Persisted form of a [`SymbolTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub version: u32,
    pub entries: Vec<Entry>,
    pub growth_stopped: bool,
    pub entry_kind: Option<EntryKind>,
    pub id_bytes: [u8; 16],
}

impl TableRecord {
    pub fn from_table(table: &SymbolTable) -> Self {
        Self {
            version: TABLE_VERSION,
            entries: table.entries(),
            growth_stopped: table.is_frozen(),
            entry_kind: table.entry_kind(),
            id_bytes: table.id().to_bytes(),
        }
    }

    fn validate(&self) -> PersistResult<()> {
        check_version("table", self.version, TABLE_VERSION)?;
        match (self.entry_kind, self.entries.first()) {
            (None, None) => Ok(()),
            (Some(kind), Some(_)) => match self.entries.iter().find(|e| e.kind() != kind) {
                Some(stray) => Err(corrupt(
                    "table",
                    format!("entry {stray} is not of the table kind {kind}"),
                )),
                None => Ok(()),
            },
            (None, Some(_)) => Err(corrupt("table", "entries present without an entry kind")),
            (Some(kind), None) => Err(corrupt("table", format!("empty table claims kind {kind}"))),
        }
    }
}

/// Persisted form of a [`SparseVector`].
///
/// `indices == None` is the dense layout; `values == None` a binary vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseRecord {
    pub version: u32,
    pub indices: Option<Vec<usize>>,
    pub values: Option<Vec<f64>>,
    pub size: usize,
    pub accelerator: AcceleratorKind,
}

impl SparseRecord {
    pub fn from_vector(vector: &SparseVector) -> Self {
        Self {
            version: SPARSE_VERSION,
            indices: vector.indices().map(<[usize]>::to_vec),
            values: vector.values().map(<[f64]>::to_vec),
            size: vector.size(),
            accelerator: vector.accelerator(),
        }
    }

    /// Rebuild the vector, checking the structural invariants.
    pub fn into_vector(self) -> PersistResult<SparseVector> {
        check_version("sparse vector", self.version, SPARSE_VERSION)?;
        let vector = match (self.indices, self.values) {
            (None, None) => {
                return Err(corrupt("sparse vector", "neither indices nor values present"));
            }
            (None, Some(values)) => {
                if values.len() != self.size {
                    return Err(corrupt(
                        "sparse vector",
                        format!("dense layout of {} values with size {}", values.len(), self.size),
                    ));
                }
                SparseVector::dense(values)
            }
            (Some(indices), values) => {
                if indices.last().is_some_and(|&max| max >= self.size) {
                    return Err(corrupt("sparse vector", "index beyond the recorded size"));
                }
                let options = BuildOptions::presorted().with_size(self.size);
                SparseVector::new(indices, values, options)
                    .map_err(|e| corrupt("sparse vector", e.to_string()))?
            }
        };
        Ok(vector.with_accelerator(self.accelerator))
    }
}

/// Persisted form of a [`DenseVector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseRecord {
    pub version: u32,
    pub values: Vec<f64>,
}

/// Persisted form of a [`FeatureVector`] and its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub version: u32,
    pub table: TableRecord,
    pub vector: SparseRecord,
}

/// Persisted form of a [`LabelTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTableRecord {
    pub version: u32,
    pub table: TableRecord,
}

fn check_version(kind: &'static str, found: u32, expected: u32) -> PersistResult<()> {
    if found == expected {
        Ok(())
    } else {
        Err(PersistError::UnsupportedVersion {
            kind,
            found,
            expected,
        })
    }
}

fn corrupt(kind: &'static str, message: impl Into<String>) -> PersistError {
    PersistError::Corrupt {
        kind,
        message: message.into(),
    }
}

fn from_bincode(e: bincode::Error) -> PersistError {
    match *e {
        bincode::ErrorKind::Io(source) => PersistError::Io { source },
        other => PersistError::Serialization {
            message: other.to_string(),
        },
    }
}

fn encode<T: Serialize>(record: &T) -> PersistResult<Vec<u8>> {
    bincode::serialize(record).map_err(from_bincode)
}

fn write_record<T: Serialize>(writer: impl Write, record: &T) -> PersistResult<()> {
    bincode::serialize_into(writer, record).map_err(from_bincode)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> PersistResult<T> {
    bincode::deserialize(bytes).map_err(from_bincode)
}

fn read_record<T: DeserializeOwned>(reader: impl Read) -> PersistResult<T> {
    bincode::deserialize_from(reader).map_err(from_bincode)
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub fn encode_table(table: &SymbolTable) -> PersistResult<Vec<u8>> {
    encode(&TableRecord::from_table(table))
}

pub fn encode_sparse(vector: &SparseVector) -> PersistResult<Vec<u8>> {
    encode(&SparseRecord::from_vector(vector))
}

pub fn encode_dense(vector: &DenseVector) -> PersistResult<Vec<u8>> {
    encode(&dense_record(vector))
}

pub fn encode_feature_vector(vector: &FeatureVector) -> PersistResult<Vec<u8>> {
    encode(&feature_record(vector))
}

pub fn encode_label_table(labels: &LabelTable) -> PersistResult<Vec<u8>> {
    encode(&label_record(labels))
}

pub fn write_table(writer: impl Write, table: &SymbolTable) -> PersistResult<()> {
    write_record(writer, &TableRecord::from_table(table))
}

pub fn write_sparse(writer: impl Write, vector: &SparseVector) -> PersistResult<()> {
    write_record(writer, &SparseRecord::from_vector(vector))
}

pub fn write_dense(writer: impl Write, vector: &DenseVector) -> PersistResult<()> {
    write_record(writer, &dense_record(vector))
}

pub fn write_feature_vector(writer: impl Write, vector: &FeatureVector) -> PersistResult<()> {
    write_record(writer, &feature_record(vector))
}

pub fn write_label_table(writer: impl Write, labels: &LabelTable) -> PersistResult<()> {
    write_record(writer, &label_record(labels))
}

fn dense_record(vector: &DenseVector) -> DenseRecord {
    DenseRecord {
        version: DENSE_VERSION,
        values: vector.values().to_vec(),
    }
}

fn feature_record(vector: &FeatureVector) -> FeatureRecord {
    FeatureRecord {
        version: FEATURE_VERSION,
        table: TableRecord::from_table(vector.table()),
        vector: SparseRecord::from_vector(vector.sparse()),
    }
}

fn label_record(labels: &LabelTable) -> LabelTableRecord {
    LabelTableRecord {
        version: LABEL_TABLE_VERSION,
        table: TableRecord::from_table(labels.table()),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a sparse vector. Vectors carry no table, so no session is needed.
pub fn decode_sparse(bytes: &[u8]) -> PersistResult<SparseVector> {
    decode::<SparseRecord>(bytes)?.into_vector()
}

pub fn read_sparse(reader: impl Read) -> PersistResult<SparseVector> {
    read_record::<SparseRecord>(reader)?.into_vector()
}

pub fn decode_dense(bytes: &[u8]) -> PersistResult<DenseVector> {
    dense_from_record(decode(bytes)?)
}

pub fn read_dense(reader: impl Read) -> PersistResult<DenseVector> {
    dense_from_record(read_record(reader)?)
}

fn dense_from_record(record: DenseRecord) -> PersistResult<DenseVector> {
    check_version("dense vector", record.version, DENSE_VERSION)?;
    Ok(DenseVector::from_vec(record.values))
}

/// Deserialization context that canonicalizes shared symbol tables.
///
/// Lookup-or-insert goes through the map's entry API, which holds the shard
/// lock, so concurrent decodes of the same id on one session still agree on
/// a single instance.
#[derive(Debug, Default)]
pub struct DecodeSession {
    tables: DashMap<TableId, Arc<SymbolTable>>,
}

impl DecodeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct tables seen so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// The live table for `id`, if this session has decoded one.
    pub fn table(&self, id: TableId) -> Option<Arc<SymbolTable>> {
        self.tables.get(&id).map(|t| Arc::clone(t.value()))
    }

    /// Resolve a table record to this session's live instance.
    pub fn table_from_record(&self, record: TableRecord) -> PersistResult<Arc<SymbolTable>> {
        record.validate()?;
        let id = TableId::from_bytes(record.id_bytes);
        match self.tables.entry(id) {
            MapEntry::Occupied(existing) => {
                tracing::debug!(table = %id, "reusing table already decoded in this session");
                Ok(Arc::clone(existing.get()))
            }
            MapEntry::Vacant(slot) => {
                let table = SymbolTable::restore(id, record.entries, record.growth_stopped)
                    .map_err(|e| corrupt("table", e.to_string()))?;
                let table = Arc::new(table);
                slot.insert(Arc::clone(&table));
                Ok(table)
            }
        }
    }

    pub fn decode_table(&self, bytes: &[u8]) -> PersistResult<Arc<SymbolTable>> {
        self.table_from_record(decode(bytes)?)
    }

    pub fn read_table(&self, reader: impl Read) -> PersistResult<Arc<SymbolTable>> {
        self.table_from_record(read_record(reader)?)
    }

    pub fn decode_feature_vector(&self, bytes: &[u8]) -> PersistResult<FeatureVector> {
        self.feature_from_record(decode(bytes)?)
    }

    pub fn read_feature_vector(&self, reader: impl Read) -> PersistResult<FeatureVector> {
        self.feature_from_record(read_record(reader)?)
    }

    fn feature_from_record(&self, record: FeatureRecord) -> PersistResult<FeatureVector> {
        check_version("feature vector", record.version, FEATURE_VERSION)?;
        let table = self.table_from_record(record.table)?;
        let vector = record.vector.into_vector()?;
        FeatureVector::new(table, vector).map_err(|e| corrupt("feature vector", e.to_string()))
    }

    pub fn decode_label_table(&self, bytes: &[u8]) -> PersistResult<LabelTable> {
        self.label_table_from_record(decode(bytes)?)
    }

    pub fn read_label_table(&self, reader: impl Read) -> PersistResult<LabelTable> {
        self.label_table_from_record(read_record(reader)?)
    }

    fn label_table_from_record(&self, record: LabelTableRecord) -> PersistResult<LabelTable> {
        check_version("label table", record.version, LABEL_TABLE_VERSION)?;
        let table = self.table_from_record(record.table)?;
        Ok(LabelTable::from_table(table))
    }
}
