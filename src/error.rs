//! Error taxonomy for the store.

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by store operations.
///
/// `NotFound` is the only variant that describes an absent key rather than a
/// failed operation; callers that treat absence as a normal outcome should
/// use [`crate::Store::try_get`] instead of matching on it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the filesystem layer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The requested key does not exist.
    #[error("key not found")]
    NotFound,
    /// A value could not be represented in (or recovered from) the backing
    /// column type, e.g. non-UTF-8 bytes read back as text.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Failure acquiring a connection or executing a statement.
    #[error("connection error: {0}")]
    Connection(#[from] rusqlite::Error),
    /// Connections were still leased at pool teardown. Fatal; never retried.
    #[error("{0} dangling connection(s) at pool teardown")]
    ResourceLeak(usize),
    /// Invalid or incomplete store configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Operation attempted on a closed store.
    #[error("store is closed")]
    Closed,
}
