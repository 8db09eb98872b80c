//! Embedded relational query engine core: composite keys, an in-memory
//! B-tree, an index registry, and a cost-based planner/executor for
//! WHERE-clause evaluation.
//!
//! ## Architecture
//! - Storage: arena-backed B-tree multimap, keyed on `(key, row_id)`
//! - Catalog: a process-wide [`index::IndexRegistry`] of named indexes
//! - Query: predicate/expression modeling, normalization, selectivity
//!   and cost estimation, access-path planning, and index execution

pub mod error;
pub mod index;
pub mod key;
pub mod query;
pub mod types;

pub use error::{Result, StorageError};
pub use index::{BTree, IndexRegistry};
pub use key::CompositeKey;
pub use query::{IndexConfig, IndexExecutor};
