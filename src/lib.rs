// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # sparse-alphabet
//!
//! Symbol tables and the sparse/dense vector algebra that statistical NLP
//! models are built on.
//!
//! ## Architecture
//!
//! - **Symbol tables** (`alphabet`): append-only entry ↔ index maps shared via `Arc`
//! - **Vectors** (`vector`): dense, sparse, binary and accelerated sparse
//!   representations behind one [`vector::Vector`] contract
//! - **Features** (`feature`): table-bound feature vectors, conjunctions, projection
//! - **SIMD acceleration** (`simd`): Runtime-dispatched AVX2/generic dense kernels
//! - **Persistence** (`persist`): versioned bincode records with shared-table identity
//!
//! ## Library usage
//!
//! ```
//! use std::sync::Arc;
//! use sparse_alphabet::alphabet::SymbolTable;
//! use sparse_alphabet::feature::FeatureVector;
//! use sparse_alphabet::symbol::Entry;
//! use sparse_alphabet::vector::Vector;
//!
//! let table = Arc::new(SymbolTable::new());
//! let doc = FeatureVector::from_entries(
//!     Arc::clone(&table),
//!     &[Entry::from("the"), Entry::from("cat")],
//!     Some(&[2.0, 1.0]),
//! )
//! .unwrap();
//! assert_eq!(doc.value_of(&Entry::from("cat")).unwrap(), 1.0);
//! assert_eq!(doc.dot_product(doc.sparse()), 5.0);
//! ```

pub mod alphabet;
pub mod config;
pub mod error;
pub mod feature;
pub mod persist;
pub mod simd;
pub mod symbol;
pub mod vector;

pub use alphabet::{LabelTable, SymbolTable};
pub use config::AlgebraConfig;
pub use error::{AlgebraError, AlgebraResult};
pub use feature::{FeatureSelection, FeatureVector};
pub use persist::DecodeSession;
pub use symbol::{Entry, TableId};
pub use vector::{DenseVector, MatrixN, SparseVector, Vector};
