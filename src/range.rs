//! Range descriptors and the predicate builder.
//!
//! A [`RangeQuery`] describes which records an iterator should visit and in
//! which order. Its filter is a small recursive structure: a leaf holds
//! optional key bounds combined with AND, a group holds sub-filters combined
//! with OR. [`build`] lowers a filter to a SQL boolean expression with `?`
//! placeholders plus the ordered parameter list; values are always bound
//! through the driver, never spliced into the text.

/// Optional bounds on the key column. All present bounds must hold (AND).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBounds {
    /// Strictly greater than.
    pub gt: Option<Vec<u8>>,
    /// Greater than or equal.
    pub gte: Option<Vec<u8>>,
    /// Strictly less than.
    pub lt: Option<Vec<u8>>,
    /// Less than or equal.
    pub lte: Option<Vec<u8>>,
    /// Exactly equal.
    pub eq: Option<Vec<u8>>,
    /// Not equal.
    pub ne: Option<Vec<u8>>,
}

impl KeyBounds {
    /// Bounds with no constraints (matches every record).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the strict lower bound.
    pub fn gt(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.gt = Some(key.into());
        self
    }

    /// Sets the inclusive lower bound.
    pub fn gte(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.gte = Some(key.into());
        self
    }

    /// Sets the strict upper bound.
    pub fn lt(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.lt = Some(key.into());
        self
    }

    /// Sets the inclusive upper bound.
    pub fn lte(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.lte = Some(key.into());
        self
    }

    /// Requires the key to equal `key`.
    pub fn eq(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.eq = Some(key.into());
        self
    }

    /// Excludes exactly `key`.
    pub fn ne(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.ne = Some(key.into());
        self
    }

    /// Whether no bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.eq.is_none()
            && self.ne.is_none()
    }
}

/// A key filter: either a single set of bounds or a disjunction of filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Leaf node; bounds are ANDed together.
    Bounds(KeyBounds),
    /// Group node; members are ORed together. An empty group, like an
    /// unbounded leaf, matches every record.
    Any(Vec<Filter>),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Bounds(KeyBounds::default())
    }
}

impl From<KeyBounds> for Filter {
    fn from(bounds: KeyBounds) -> Self {
        Filter::Bounds(bounds)
    }
}

/// A full range descriptor: filter, direction and record cap.
#[derive(Debug, Clone, Default)]
pub struct RangeQuery {
    /// Which records match.
    pub filter: Filter,
    /// Descending key order when set; ascending otherwise.
    pub reverse: bool,
    /// Maximum records to yield; `None` means unbounded.
    pub limit: Option<u64>,
}

impl RangeQuery {
    /// A query matching every record in ascending order.
    pub fn all() -> Self {
        Self::default()
    }

    /// A query over the given bounds.
    pub fn bounds(bounds: KeyBounds) -> Self {
        Self {
            filter: Filter::Bounds(bounds),
            ..Self::default()
        }
    }

    /// Sets the filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the iteration direction.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Caps the number of records yielded.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A lowered filter: SQL boolean expression plus bind parameters in
/// placeholder order. An empty `sql` means "match all records" and callers
/// must omit the WHERE clause entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    /// Boolean expression over the `key` column, with `?` placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<Vec<u8>>,
}

impl Predicate {
    /// Whether this predicate matches every record.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

const BOUND_OPS: [(&str, fn(&KeyBounds) -> Option<&Vec<u8>>); 6] = [
    ("<", |b| b.lt.as_ref()),
    ("<=", |b| b.lte.as_ref()),
    (">=", |b| b.gte.as_ref()),
    (">", |b| b.gt.as_ref()),
    ("=", |b| b.eq.as_ref()),
    ("<>", |b| b.ne.as_ref()),
];

/// Lowers a filter to a [`Predicate`].
pub fn build(filter: &Filter) -> Predicate {
    match filter {
        Filter::Bounds(bounds) => {
            let mut predicate = Predicate::default();
            let mut clauses = Vec::new();
            for (op, get) in BOUND_OPS {
                if let Some(value) = get(bounds) {
                    clauses.push(format!("key {op} ?"));
                    predicate.params.push(value.clone());
                }
            }
            predicate.sql = clauses.join(" AND ");
            predicate
        }
        Filter::Any(members) => {
            let mut parts = Vec::with_capacity(members.len());
            let mut params = Vec::new();
            for member in members {
                let inner = build(member);
                if inner.is_empty() {
                    // One match-all member makes the whole disjunction
                    // match-all.
                    return Predicate::default();
                }
                parts.push(format!("({})", inner.sql));
                params.extend(inner.params);
            }
            Predicate {
                sql: parts.join(" OR "),
                params,
            }
        }
    }
}
