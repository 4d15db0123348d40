//! The store facade.

use std::fmt;

use rusqlite::params;
use tracing::{debug, info, warn};

use crate::batch::{self, Batch};
use crate::codec;
use crate::config::Config;
use crate::cursor::RangeIter;
use crate::error::{Result, StoreError};
use crate::pool::Pool;
use crate::range::RangeQuery;

/// An ordered key-value store over one relational table.
///
/// Reads route through iterator sessions on dedicated connections; writes
/// route through per-batch transactions on pooled connections. Both key and
/// value are raw byte strings; keys sort in unsigned byte-wise order.
///
/// # Example
///
/// ```no_run
/// use tabledown::{Config, Store};
///
/// let store = Store::open(Config::new("kv"))?;
/// store.put(b"a", b"1")?;
/// assert_eq!(store.get(b"a")?, b"1");
/// store.close()?;
/// # Ok::<(), tabledown::StoreError>(())
/// ```
pub struct Store {
    pool: Pool,
    table: String,
    rel: String,
    fetch_batch: usize,
}

impl Store {
    /// Opens (and by default creates) the backing table per `config`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let pool = Pool::new(&config)?;
        let rel = codec::quote_ident(&config.table);
        {
            let lease = pool.acquire()?;
            if config.create_if_missing {
                lease.conn().execute(
                    &format!(
                        "CREATE TABLE IF NOT EXISTS {rel} \
                         (key BLOB PRIMARY KEY, value BLOB NOT NULL)"
                    ),
                    [],
                )?;
            } else {
                let mut stmt = lease.conn().prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                )?;
                let mut rows = stmt.query(params![config.table])?;
                if rows.next()?.is_none() {
                    return Err(StoreError::Config(format!(
                        "table {:?} does not exist",
                        config.table
                    )));
                }
            }
        }
        info!(table = %config.table, "store opened");
        Ok(Self {
            pool,
            table: config.table,
            rel,
            fetch_batch: config.fetch_batch,
        })
    }

    /// Name of the backing table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the value stored under `key`, or [`StoreError::NotFound`].
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.try_get(key)?.ok_or(StoreError::NotFound)
    }

    /// Returns the value stored under `key`, or `None` if the key is absent.
    pub fn try_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let lease = self.pool.acquire()?;
        let mut stmt = lease
            .conn()
            .prepare_cached(&format!("SELECT value FROM {} WHERE key = ?1", self.rel))?;
        let mut rows = stmt.query(params![codec::serialize(Some(key))])?;
        match rows.next()? {
            Some(row) => Ok(Some(codec::deserialize(row.get_ref(0)?))),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key`, replacing any existing value.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = Batch::new();
        batch.put(key, value);
        self.batch(&batch)
    }

    /// Removes `key`. Succeeds whether or not the key exists.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut batch = Batch::new();
        batch.delete(key);
        self.batch(&batch)
    }

    /// Applies `batch` atomically: either every operation takes effect, in
    /// order, or none do.
    pub fn batch(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut lease = self.pool.acquire()?;
        match batch::apply(&mut lease, &self.rel, batch) {
            Ok(()) => Ok(()),
            Err(err) => {
                // The transaction has already rolled back; the connection
                // state is suspect, so close it rather than pool it.
                lease.destroy();
                Err(err)
            }
        }
    }

    /// Opens an iterator session over `query` on a dedicated connection.
    pub fn iter(&self, query: RangeQuery) -> Result<RangeIter> {
        let lease = self.pool.acquire_dedicated()?;
        RangeIter::open(lease, self.rel.clone(), query, self.fetch_batch)
    }

    /// Total stored bytes (key plus value lengths) for keys in
    /// `[start, end)`. Monotone under range inclusion: a superset range
    /// never reports less than any of its sub-ranges.
    pub fn approximate_size(&self, start: &[u8], end: &[u8]) -> Result<u64> {
        let lease = self.pool.acquire()?;
        let size: i64 = lease.conn().query_row(
            &format!(
                "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM {} \
                 WHERE key >= ?1 AND key < ?2",
                self.rel
            ),
            params![codec::serialize(Some(start)), codec::serialize(Some(end))],
            |row| row.get(0),
        )?;
        Ok(size.max(0) as u64)
    }

    /// Drops the backing table.
    pub fn drop_table(&self) -> Result<()> {
        let lease = self.pool.acquire()?;
        lease
            .conn()
            .execute(&format!("DROP TABLE IF EXISTS {}", self.rel), [])?;
        debug!(table = %self.table, "table dropped");
        Ok(())
    }

    /// Number of connections currently leased out (iterator sessions and
    /// in-flight batches). Zero once every session is closed.
    pub fn dangling(&self) -> usize {
        self.pool.dangling()
    }

    /// Tears the store down. Idempotent; fails with
    /// [`StoreError::ResourceLeak`] if any iterator session is still open,
    /// and may be retried once the offenders are closed.
    pub fn close(&self) -> Result<()> {
        self.pool.close()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("table", &self.table)
            .field("fetch_batch", &self.fetch_batch)
            .field("dangling", &self.pool.dangling())
            .finish_non_exhaustive()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(err) = self.pool.close() {
            warn!(error = %err, "store dropped with leaked connections");
        }
    }
}
