//! Batched writes and the transaction executor.

use rusqlite::params;
use tracing::debug;

use crate::codec;
use crate::error::Result;
use crate::pool::Lease;

/// One write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert-or-replace `key` with `value`.
    Put {
        /// Record key.
        key: Vec<u8>,
        /// Record value.
        value: Vec<u8>,
    },
    /// Remove `key`. Absence of the key is not an error.
    Delete {
        /// Record key.
        key: Vec<u8>,
    },
}

/// An ordered sequence of write operations applied with all-or-nothing
/// atomicity. Operations apply in insertion order, so a later operation on
/// the same key overrides an earlier one (last-write-wins).
#[derive(Debug, Clone, Default)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Appends a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.into() });
        self
    }

    /// Number of operations in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The operations, in application order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

impl From<Vec<BatchOp>> for Batch {
    fn from(ops: Vec<BatchOp>) -> Self {
        Self { ops }
    }
}

/// Applies `batch` inside one explicit transaction on the leased connection.
///
/// On any statement failure the transaction rolls back (on drop) before the
/// error propagates; no partial batch effects are ever observable.
pub(crate) fn apply(lease: &mut Lease, rel: &str, batch: &Batch) -> Result<()> {
    debug!(table = %rel, ops = batch.len(), "applying batch");
    let tx = lease.conn_mut().transaction()?;
    {
        let mut upsert = tx.prepare_cached(&format!(
            "INSERT INTO {rel} (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value"
        ))?;
        let mut remove = tx.prepare_cached(&format!("DELETE FROM {rel} WHERE key = ?1"))?;
        for op in batch.ops() {
            match op {
                BatchOp::Put { key, value } => {
                    upsert.execute(params![
                        codec::serialize(Some(key.as_slice())),
                        codec::serialize(Some(value.as_slice()))
                    ])?;
                }
                BatchOp::Delete { key } => {
                    remove.execute(params![codec::serialize(Some(key.as_slice()))])?;
                }
            }
        }
    }
    tx.commit()?;
    Ok(())
}
