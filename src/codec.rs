//! The serialization boundary between application bytes and column values.
//!
//! This is the single place where column representations are decided: keys
//! and values live in BLOB columns, which SQLite compares with memcmp,
//! exactly the unsigned byte-wise order the store's external contract
//! promises. Absent values serialize to the empty BLOB, never SQL NULL;
//! reading a value back as bytes is lossless, reading it back as text fails
//! loudly on non-UTF-8 data instead of truncating. Higher-level encodings
//! (JSON, UTF-8 framing) layer strictly above this module.

use rusqlite::types::{Value, ValueRef};

use crate::error::{Result, StoreError};

/// Maps application bytes to a column value. `None` (an absent value)
/// becomes the empty BLOB.
pub fn serialize(source: Option<&[u8]>) -> Value {
    Value::Blob(source.unwrap_or_default().to_vec())
}

/// Maps a column value back to raw bytes.
///
/// BLOB and TEXT columns pass through verbatim; a NULL column becomes the
/// empty byte string; numeric columns are stringified. Never fails.
pub fn deserialize(source: ValueRef<'_>) -> Vec<u8> {
    match source {
        ValueRef::Blob(bytes) => bytes.to_vec(),
        ValueRef::Text(bytes) => bytes.to_vec(),
        ValueRef::Null => Vec::new(),
        ValueRef::Integer(i) => i.to_string().into_bytes(),
        ValueRef::Real(r) => r.to_string().into_bytes(),
    }
}

/// Maps a column value to a string, for callers that did not ask for raw
/// bytes. An empty or NULL column becomes the empty string, never a null;
/// bytes that are not valid UTF-8 are a serialization error.
pub fn deserialize_text(source: ValueRef<'_>) -> Result<String> {
    String::from_utf8(deserialize(source))
        .map_err(|_| StoreError::Serialization("column value is not valid UTF-8".into()))
}

/// Quotes a SQL identifier (table name) by doubling embedded quotes.
/// Identifiers cannot be bound as parameters, so this is the one spot where
/// externally-supplied text enters statement text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
