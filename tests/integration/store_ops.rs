use tabledown::{Config, RangeQuery, Result, Store, StoreError};
use tempfile::tempdir;

fn open_store(dir: &tempfile::TempDir, table: &str) -> Result<Store> {
    Store::open(Config::new(table).database(dir.path().join("kv.db")))
}

#[test]
fn put_get_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(&dir, "kv")?;

    store.put(b"a", b"alpha")?;
    assert_eq!(store.get(b"a")?, b"alpha");

    store.put(b"a", b"beta")?;
    assert_eq!(store.get(b"a")?, b"beta", "put replaces existing value");

    store.close()
}

#[test]
fn get_absent_key_is_not_found() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(&dir, "kv")?;

    let err = store.get(b"missing").unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
    assert_eq!(store.try_get(b"missing")?, None);

    store.close()
}

#[test]
fn delete_then_get_reports_not_found() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(&dir, "kv")?;

    store.put(b"a", b"value")?;
    store.delete(b"a")?;
    let err = store.get(b"a").unwrap_err();
    assert!(matches!(err, StoreError::NotFound));

    // Deleting an absent key is not an error.
    store.delete(b"a")?;
    store.delete(b"never-existed")?;

    store.close()
}

#[test]
fn empty_value_round_trips_as_empty_bytes() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(&dir, "kv")?;

    store.put(b"empty", b"")?;
    assert_eq!(store.get(b"empty")?, Vec::<u8>::new());
    assert_eq!(store.try_get(b"empty")?, Some(Vec::new()));

    store.close()
}

#[test]
fn binary_keys_and_values_survive() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(&dir, "kv")?;

    let key = vec![0u8, 255, 1, 0, 128];
    let value = vec![7u8, 0, 0, 9];
    store.put(&key, &value)?;
    assert_eq!(store.get(&key)?, value);

    store.close()
}

#[test]
fn store_persists_across_reopen() -> Result<()> {
    let dir = tempdir()?;
    {
        let store = open_store(&dir, "kv")?;
        store.put(b"durable", b"yes")?;
        store.close()?;
    }
    let store = open_store(&dir, "kv")?;
    assert_eq!(store.get(b"durable")?, b"yes");
    store.close()
}

#[test]
fn tables_are_independent() -> Result<()> {
    let dir = tempdir()?;
    let left = open_store(&dir, "left")?;
    let right = open_store(&dir, "right")?;

    left.put(b"k", b"left")?;
    right.put(b"k", b"right")?;
    assert_eq!(left.get(b"k")?, b"left");
    assert_eq!(right.get(b"k")?, b"right");

    left.close()?;
    right.close()
}

#[test]
fn open_without_create_requires_existing_table() -> Result<()> {
    let dir = tempdir()?;
    let config = Config::new("kv")
        .database(dir.path().join("kv.db"))
        .create_if_missing(false);
    let err = Store::open(config).unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));

    // After a normal open created the table, the strict open succeeds.
    open_store(&dir, "kv")?.close()?;
    let config = Config::new("kv")
        .database(dir.path().join("kv.db"))
        .create_if_missing(false);
    Store::open(config)?.close()
}

#[test]
fn in_memory_store_works_without_database_file() -> Result<()> {
    let store = Store::open(Config::new("kv"))?;
    store.put(b"a", b"1")?;
    assert_eq!(store.get(b"a")?, b"1");
    store.close()
}

#[test]
fn store_and_iterator_are_debug_printable() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(&dir, "kv")?;
    store.put(b"a", b"1")?;
    assert!(format!("{store:?}").contains("kv"));

    let mut iter = store.iter(RangeQuery::all())?;
    assert!(format!("{iter:?}").contains("RangeIter"));
    iter.close();
    store.close()
}

#[test]
fn drop_table_discards_all_records() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(&dir, "kv")?;
    store.put(b"a", b"1")?;
    store.drop_table()?;
    store.close()?;

    let store = open_store(&dir, "kv")?;
    assert_eq!(store.try_get(b"a")?, None);
    store.close()
}
