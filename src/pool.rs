//! Connection pool adapter.
//!
//! The pool is the only shared mutable resource in the store. Its discipline
//! is "one connection per in-flight batch or iterator session, released
//! exactly once", enforced through the scoped [`Lease`] guard: dropping a
//! lease runs the reset hook (forced ROLLBACK of any transaction left open)
//! and returns the connection to the idle set, while [`Lease::destroy`]
//! closes it instead. Every leased connection is counted; tearing the pool
//! down while any lease is outstanding is a fatal [`StoreError::ResourceLeak`].
//!
//! Iterator sessions hold a server-side cursor whose state pins the
//! connection, which is incompatible with returning it to the pool between
//! fetches. [`Pool::acquire_dedicated`] hands out a fresh connection that is
//! tracked for leak accounting but closed, not pooled, on release.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, error};

use crate::config::{Config, PoolConfig};
use crate::error::{Result, StoreError};

static MEM_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
enum ConnTarget {
    File(PathBuf),
    /// Shared-cache URI, so every pool connection observes the same
    /// in-memory database.
    Memory(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ConnSource {
    target: ConnTarget,
    busy_timeout: Duration,
}

impl ConnSource {
    fn new(config: &Config) -> Self {
        let target = match &config.database {
            Some(path) => ConnTarget::File(path.clone()),
            None => {
                let id = MEM_SEQ.fetch_add(1, Ordering::Relaxed);
                ConnTarget::Memory(format!("file:tabledown-mem-{id}?mode=memory&cache=shared"))
            }
        };
        Self {
            target,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }

    fn connect(&self) -> Result<Connection> {
        let conn = match &self.target {
            ConnTarget::File(path) => {
                let conn = Connection::open(path)?;
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "FULL")?;
                conn
            }
            ConnTarget::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )?,
        };
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

struct PoolState {
    idle: Vec<Connection>,
    /// Pooled connections currently in existence (idle + leased).
    open_total: usize,
    /// Acquired-but-unreleased connections, pooled and dedicated alike.
    /// This is the dangling count checked at teardown.
    outstanding: usize,
    closed: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    available: Condvar,
    cfg: PoolConfig,
    source: ConnSource,
}

/// A bounded pool of connections to one database.
pub struct Pool {
    shared: Arc<PoolShared>,
}

impl Pool {
    /// Opens a pool per `config`, eagerly establishing `pool.min` idle
    /// connections. In-memory databases need at least one connection alive
    /// at all times, so `min` is raised to 1 for them.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let source = ConnSource::new(config);
        let min = match source.target {
            ConnTarget::Memory(_) => config.pool.min.max(1),
            ConnTarget::File(_) => config.pool.min,
        };
        let mut idle = Vec::with_capacity(min);
        for _ in 0..min {
            idle.push(source.connect()?);
        }
        let open_total = idle.len();
        debug!(min = open_total, max = config.pool.max, "pool opened");
        Ok(Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    idle,
                    open_total,
                    outstanding: 0,
                    closed: false,
                }),
                available: Condvar::new(),
                cfg: config.pool,
                source: source.clone(),
            }),
        })
    }

    /// Acquires a pooled connection, blocking while the pool is exhausted.
    pub fn acquire(&self) -> Result<Lease> {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        loop {
            if state.closed {
                return Err(StoreError::Closed);
            }
            if let Some(conn) = state.idle.pop() {
                state.outstanding += 1;
                return Ok(Lease::new(conn, Arc::clone(shared), LeaseKind::Pooled));
            }
            if state.open_total < shared.cfg.max {
                state.open_total += 1;
                state.outstanding += 1;
                drop(state);
                return match shared.source.connect() {
                    Ok(conn) => Ok(Lease::new(conn, Arc::clone(shared), LeaseKind::Pooled)),
                    Err(err) => {
                        let mut state = shared.state.lock();
                        state.open_total -= 1;
                        state.outstanding -= 1;
                        drop(state);
                        shared.available.notify_one();
                        Err(err)
                    }
                };
            }
            shared.available.wait(&mut state);
        }
    }

    /// Acquires a dedicated connection for a cursor session. Not bounded by
    /// `pool.max` and never returned to the idle set, but counted against
    /// the dangling total until released.
    pub fn acquire_dedicated(&self) -> Result<Lease> {
        let shared = &self.shared;
        {
            let mut state = shared.state.lock();
            if state.closed {
                return Err(StoreError::Closed);
            }
            state.outstanding += 1;
        }
        match shared.source.connect() {
            Ok(conn) => Ok(Lease::new(conn, Arc::clone(shared), LeaseKind::Dedicated)),
            Err(err) => {
                shared.state.lock().outstanding -= 1;
                Err(err)
            }
        }
    }

    /// Number of acquired-but-unreleased connections.
    pub fn dangling(&self) -> usize {
        self.shared.state.lock().outstanding
    }

    /// Tears the pool down, closing idle connections. A nonzero dangling
    /// count is a fatal consistency error; the call may be repeated once
    /// the offending leases have been released.
    pub fn close(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        state.closed = true;
        state.open_total -= state.idle.len();
        state.idle.clear();
        let dangling = state.outstanding;
        drop(state);
        self.shared.available.notify_all();
        if dangling > 0 {
            error!(dangling, "pool closed with dangling connections");
            return Err(StoreError::ResourceLeak(dangling));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LeaseKind {
    Pooled,
    Dedicated,
}

/// Scoped lease on one connection.
///
/// Dropping the lease releases the connection exactly once: pooled leases
/// run the reset hook and rejoin the idle set, dedicated leases close their
/// connection. Either way the dangling count is decremented.
pub struct Lease {
    conn: Option<Connection>,
    shared: Arc<PoolShared>,
    kind: LeaseKind,
    poisoned: bool,
}

impl Lease {
    fn new(conn: Connection, shared: Arc<PoolShared>, kind: LeaseKind) -> Self {
        Self {
            conn: Some(conn),
            shared,
            kind,
            poisoned: false,
        }
    }

    /// The leased connection.
    pub fn conn(&self) -> &Connection {
        self.conn.as_ref().expect("lease holds a connection until dropped")
    }

    /// Mutable access, needed for explicit transactions.
    pub fn conn_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("lease holds a connection until dropped")
    }

    /// Releases the lease, closing the connection instead of pooling it.
    /// Used on error paths where the connection state is suspect.
    pub fn destroy(mut self) {
        self.poisoned = true;
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let conn = self.conn.take();
        let mut state = self.shared.state.lock();
        state.outstanding -= 1;
        if let (Some(conn), LeaseKind::Pooled) = (conn, self.kind) {
            if self.poisoned || state.closed {
                state.open_total -= 1;
            } else {
                // Reset hook: the idle set only ever holds connections in a
                // clean autocommit state.
                let clean = conn.is_autocommit() || conn.execute_batch("ROLLBACK").is_ok();
                if clean {
                    state.idle.push(conn);
                } else {
                    state.open_total -= 1;
                }
            }
        }
        drop(state);
        self.shared.available.notify_one();
    }
}
