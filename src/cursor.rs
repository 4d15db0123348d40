//! Cursor iteration over a key range.
//!
//! A [`RangeIter`] is a single iterator session: it owns one dedicated
//! connection for its whole lifetime and yields `(key, value)` pairs in key
//! order until the range is exhausted or the session is closed. The sequence
//! is lazy, finite, forward-only and non-restartable; re-scanning requires a
//! fresh session.
//!
//! Rows are pulled in windows of `fetch_batch` rows per round-trip. Each
//! window continues from the last key handed out (`key > last` ascending,
//! `key < last` descending), which is observationally identical to
//! incremental reads from a held-open cursor because keys are unique. The
//! session pins a read transaction on its connection at open, so every
//! window reads the open-time snapshot; writes committed mid-iteration are
//! never visible to an already-open session.

use std::collections::VecDeque;
use std::fmt;

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::{debug, trace};

use crate::codec;
use crate::error::Result;
use crate::pool::Lease;
use crate::range::{self, Predicate, RangeQuery};

/// Lifecycle of an iterator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// More windows may remain.
    Open,
    /// The underlying range is drained; only buffered rows remain.
    Exhausted,
    /// Session closed and connection released. Terminal.
    Closed,
}

/// An open iterator session over one range descriptor.
pub struct RangeIter {
    lease: Option<Lease>,
    rel: String,
    predicate: Predicate,
    reverse: bool,
    remaining: Option<u64>,
    fetch_batch: usize,
    buf: VecDeque<(Vec<u8>, Vec<u8>)>,
    last_key: Option<Vec<u8>>,
    state: IterState,
}

impl RangeIter {
    pub(crate) fn open(
        lease: Lease,
        rel: String,
        query: RangeQuery,
        fetch_batch: usize,
    ) -> Result<Self> {
        // Pin the session's snapshot now. BEGIN alone defers the read
        // transaction to the first statement, so issue a trivial read to
        // start it; later windows then never see rows committed after open.
        lease.conn().execute_batch("BEGIN")?;
        lease
            .conn()
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
        let predicate = range::build(&query.filter);
        debug!(
            table = %rel,
            predicate = %predicate.sql,
            reverse = query.reverse,
            limit = query.limit,
            "iterator opened"
        );
        Ok(Self {
            lease: Some(lease),
            rel,
            predicate,
            reverse: query.reverse,
            remaining: query.limit,
            fetch_batch,
            buf: VecDeque::new(),
            last_key: None,
            state: IterState::Open,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Returns the next `(key, value)` pair in session order, or `None` once
    /// the range is exhausted or the session closed.
    ///
    /// Any fetch error closes the session (releasing its connection) before
    /// propagating.
    pub fn next_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        loop {
            if self.state == IterState::Closed {
                return Ok(None);
            }
            if let Some(pair) = self.buf.pop_front() {
                return Ok(Some(pair));
            }
            if self.state == IterState::Exhausted {
                self.close();
                return Ok(None);
            }
            if let Err(err) = self.fill_buffer() {
                self.close();
                return Err(err);
            }
        }
    }

    /// Closes the session and releases its connection. Idempotent, and safe
    /// to call before exhaustion.
    pub fn close(&mut self) {
        if self.state == IterState::Closed {
            return;
        }
        self.state = IterState::Closed;
        self.buf.clear();
        // End the pinned snapshot, then drop the dedicated lease: the
        // connection closes and leaves the pool's dangling count.
        if let Some(lease) = self.lease.take() {
            let _ = lease.conn().execute_batch("ROLLBACK");
        }
        debug!(table = %self.rel, "iterator closed");
    }

    fn fill_buffer(&mut self) -> Result<()> {
        let window = match self.remaining {
            Some(0) => {
                self.state = IterState::Exhausted;
                return Ok(());
            }
            Some(n) => n.min(self.fetch_batch as u64),
            None => self.fetch_batch as u64,
        };

        let mut clauses = Vec::new();
        let mut binds: Vec<Value> = Vec::with_capacity(self.predicate.params.len() + 1);
        if !self.predicate.is_empty() {
            clauses.push(format!("({})", self.predicate.sql));
            for param in &self.predicate.params {
                binds.push(codec::serialize(Some(param.as_slice())));
            }
        }
        if let Some(last) = &self.last_key {
            let op = if self.reverse { "<" } else { ">" };
            clauses.push(format!("key {op} ?"));
            binds.push(codec::serialize(Some(last.as_slice())));
        }

        let mut sql = format!("SELECT key, value FROM {}", self.rel);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(if self.reverse {
            " ORDER BY key DESC"
        } else {
            " ORDER BY key ASC"
        });
        sql.push_str(&format!(" LIMIT {window}"));
        trace!(sql = %sql, "cursor fetch");

        let lease = self
            .lease
            .as_ref()
            .expect("open iterator holds its lease");
        let mut stmt = lease.conn().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut fetched = 0u64;
        while let Some(row) = rows.next()? {
            let key = codec::deserialize(row.get_ref(0)?);
            let value = codec::deserialize(row.get_ref(1)?);
            self.last_key = Some(key.clone());
            self.buf.push_back((key, value));
            fetched += 1;
        }

        if let Some(remaining) = &mut self.remaining {
            *remaining -= fetched;
        }
        if fetched < window {
            self.state = IterState::Exhausted;
        }
        Ok(())
    }
}

impl fmt::Debug for RangeIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeIter")
            .field("table", &self.rel)
            .field("state", &self.state)
            .field("reverse", &self.reverse)
            .field("remaining", &self.remaining)
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}

impl Iterator for RangeIter {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

impl Drop for RangeIter {
    fn drop(&mut self) {
        self.close();
    }
}
