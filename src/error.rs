//! Rich diagnostic error types for the algebra layer.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers know exactly what went wrong
//! and how to fix it. The invalid-argument and illegal-state families are kept
//! as distinct variants so callers can match on them.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the crate.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum AlgebraError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Vector(#[from] VectorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Symbol table errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SymbolError {
    #[error("entry kind mismatch: table holds {expected} entries, got {actual}")]
    #[diagnostic(
        code(spa::symbol::kind_mismatch),
        help(
            "A symbol table only accepts entries of the kind of its first entry. \
             Use a separate table for each kind of domain object."
        )
    )]
    EntryKindMismatch { expected: String, actual: String },

    #[error("entry {entry} is not present in the symbol table")]
    #[diagnostic(
        code(spa::symbol::unknown_entry),
        help(
            "Strict lookups never insert. Add the entry with `lookup(entry, true)` \
             before querying it, or use a non-strict lookup."
        )
    )]
    UnknownEntry { entry: String },

    #[error("entry {entry} appears more than once")]
    #[diagnostic(
        code(spa::symbol::duplicate_entry),
        help("Every entry of a table maps to exactly one index.")
    )]
    DuplicateEntry { entry: String },

    #[error("symbol index {index} out of range for table of size {size}")]
    #[diagnostic(
        code(spa::symbol::index_out_of_range),
        help("Indices must come from `lookup` on the same table.")
    )]
    IndexOutOfRange { index: usize, size: usize },
}

// ---------------------------------------------------------------------------
// Vector errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum VectorError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(spa::vector::dim_mismatch),
        help(
            "Dense-only operations require both operands to have the same size. \
             Resize one operand or use the sparse accumulate operations."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index {index} out of range for vector of size {size}")]
    #[diagnostic(
        code(spa::vector::index_out_of_range),
        help("The index lies beyond the materialized positions of this vector.")
    )]
    IndexOutOfRange { index: usize, size: usize },

    #[error("duplicate index {index} in sparse vector construction")]
    #[diagnostic(
        code(spa::vector::duplicate_index),
        help("Build with `merge_duplicates: true` to sum duplicate entries.")
    )]
    DuplicateIndex { index: usize },

    #[error("indices out of order at location {location}")]
    #[diagnostic(
        code(spa::vector::unsorted),
        help("Build with `sort: true` unless the indices are already strictly ascending.")
    )]
    Unsorted { location: usize },

    #[error("length mismatch: {indices} indices but {values} values")]
    #[diagnostic(
        code(spa::vector::length_mismatch),
        help("The value array must have exactly one value per index.")
    )]
    LengthMismatch { indices: usize, values: usize },

    #[error("feature selection and vector use different symbol tables")]
    #[diagnostic(
        code(spa::vector::table_mismatch),
        help(
            "Projection and selection arithmetic require the same table instance. \
             Build the selection from the vector's own table."
        )
    )]
    TableMismatch,

    #[error("index {index} is not present in this sparse vector")]
    #[diagnostic(
        code(spa::vector::absent_index),
        help(
            "Sparse vectors never change their index set on assignment. \
             Construct the vector with the index present, or use `add` to grow it."
        )
    )]
    AbsentIndex { index: usize },

    #[error("binary vector has no value storage")]
    #[diagnostic(
        code(spa::vector::binary),
        help("Every present entry of a binary vector is 1.0. Build a valued vector to mutate values.")
    )]
    BinaryVector,
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PersistError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(spa::persist::io),
        help("A read or write on the underlying stream failed.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(spa::persist::serde),
        help(
            "Failed to serialize or deserialize a record. \
             The bytes may be truncated or written by an incompatible build."
        )
    )]
    Serialization { message: String },

    #[error("unsupported {kind} record version {found} (expected {expected})")]
    #[diagnostic(
        code(spa::persist::version),
        help("Re-save the data with this version of the crate.")
    )]
    UnsupportedVersion {
        kind: &'static str,
        found: u32,
        expected: u32,
    },

    #[error("corrupt {kind} record: {message}")]
    #[diagnostic(
        code(spa::persist::corrupt),
        help("The record decoded but violates a structural invariant.")
    )]
    Corrupt { kind: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to parse configuration: {message}")]
    #[diagnostic(
        code(spa::config::parse),
        help("Check the TOML syntax and field names of the algebra configuration.")
    )]
    Parse { message: String },
}

/// Convenience alias for functions returning crate results.
pub type AlgebraResult<T> = std::result::Result<T, AlgebraError>;
