//! Store configuration.
//!
//! All knobs are explicit fields with documented defaults; nothing in the
//! core reads ambient environment state. The CLI may feed env-derived values
//! in through this struct, but the library never looks them up itself.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Sizing for the shared connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connections opened eagerly and kept idle.
    pub min: usize,
    /// Upper bound on concurrently open pooled connections.
    pub max: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { min: 2, max: 20 }
    }
}

/// Configuration supplied when opening a [`crate::Store`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file backing the store. `None` selects a process-private
    /// in-memory database (kept alive by the pool's idle connections, so
    /// `pool.min` is raised to at least 1 for in-memory stores).
    pub database: Option<PathBuf>,
    /// Name of the backing table.
    pub table: String,
    /// Pool sizing.
    pub pool: PoolConfig,
    /// Rows fetched per cursor round-trip.
    pub fetch_batch: usize,
    /// Create the backing table on open if it does not exist.
    pub create_if_missing: bool,
    /// How long a connection waits on a busy database before failing.
    pub busy_timeout_ms: u64,
}

impl Config {
    /// Creates a configuration for `table` with default settings.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            database: None,
            table: table.into(),
            pool: PoolConfig::default(),
            fetch_batch: 100,
            create_if_missing: true,
            busy_timeout_ms: 5000,
        }
    }

    /// Parses a location string of the form `table` or `database/table`.
    ///
    /// The last segment names the table; an optional single leading segment
    /// names the database file. Deeper paths (sublevel namespaces) are not
    /// supported and are rejected rather than silently reinterpreted.
    pub fn from_location(location: &str) -> Result<Self> {
        let mut parts: Vec<&str> = location.split('/').collect();
        let table = parts.pop().unwrap_or_default();
        if table.is_empty() {
            return Err(StoreError::Config(
                "location must specify a table name".into(),
            ));
        }
        if parts.len() > 1 {
            return Err(StoreError::Config(format!(
                "sublevel location {location:?} not supported"
            )));
        }
        let mut config = Self::new(table);
        if let Some(db) = parts.pop() {
            if !db.is_empty() {
                config.database = Some(PathBuf::from(db));
            }
        }
        Ok(config)
    }

    /// Sets the backing database file.
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    /// Sets the pool sizing.
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Sets the number of rows fetched per cursor round-trip.
    pub fn fetch_batch(mut self, rows: usize) -> Self {
        self.fetch_batch = rows;
        self
    }

    /// Sets whether a missing backing table is created on open.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets the busy timeout applied to every connection.
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(StoreError::Config("table name must not be empty".into()));
        }
        if self.pool.max == 0 {
            return Err(StoreError::Config("pool.max must be at least 1".into()));
        }
        if self.pool.min > self.pool.max {
            return Err(StoreError::Config(format!(
                "pool.min ({}) exceeds pool.max ({})",
                self.pool.min, self.pool.max
            )));
        }
        if self.fetch_batch == 0 {
            return Err(StoreError::Config("fetch_batch must be at least 1".into()));
        }
        Ok(())
    }
}
