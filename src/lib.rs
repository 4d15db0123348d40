//! An ordered key-value store backed by a single two-column relational table.
//!
//! Tabledown reproduces the semantics of an embedded key-value store (point
//! get/put/delete, atomic batch writes, ordered range iteration) purely in
//! terms of SQL against one `(key BLOB PRIMARY KEY, value BLOB)` table. The
//! relational engine (SQLite, via `rusqlite`) owns durability, crash
//! recovery and physical layout; this crate owns the translation layer:
//! range predicates built from query descriptors, cursor iteration over a
//! dedicated connection, and the connection/transaction discipline that
//! makes batches atomic and iterators leak-free.

#![warn(missing_docs)]

pub mod batch;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod pool;
pub mod range;
pub mod store;

pub use batch::{Batch, BatchOp};
pub use config::{Config, PoolConfig};
pub use cursor::RangeIter;
pub use error::{Result, StoreError};
pub use range::{Filter, KeyBounds, RangeQuery};
pub use store::Store;
