use tabledown::{Batch, Config, RangeQuery, Result, Store, StoreError};
use tempfile::tempdir;

#[test]
fn later_ops_on_same_key_win_within_a_batch() -> Result<()> {
    let dir = tempdir()?;
    let store = Store::open(Config::new("kv").database(dir.path().join("kv.db")))?;

    let mut batch = Batch::new();
    batch
        .put(*b"a", *b"first")
        .put(*b"b", *b"kept")
        .put(*b"a", *b"second")
        .delete(*b"b")
        .put(*b"a", *b"final");
    store.batch(&batch)?;

    assert_eq!(store.get(b"a")?, b"final");
    assert_eq!(store.try_get(b"b")?, None);
    store.close()
}

#[test]
fn put_then_delete_in_one_batch_leaves_key_absent() -> Result<()> {
    let dir = tempdir()?;
    let store = Store::open(Config::new("kv").database(dir.path().join("kv.db")))?;

    let mut batch = Batch::new();
    batch.put(*b"a", *b"v").delete(*b"a");
    store.batch(&batch)?;

    let err = store.get(b"a").unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
    store.close()
}

#[test]
fn empty_batch_is_a_no_op() -> Result<()> {
    let dir = tempdir()?;
    let store = Store::open(Config::new("kv").database(dir.path().join("kv.db")))?;
    store.batch(&Batch::new())?;
    store.close()
}

#[test]
fn failed_batch_has_no_partial_effects() -> Result<()> {
    let dir = tempdir()?;
    let store = Store::open(Config::new("kv").database(dir.path().join("kv.db")))?;
    store.put(b"existing", b"before")?;

    // Dropping the backing table makes every statement in the batch fail.
    store.drop_table()?;
    let mut batch = Batch::new();
    batch.put(*b"x", *b"1").put(*b"y", *b"2");
    let err = store.batch(&batch).unwrap_err();
    assert!(matches!(err, StoreError::Connection(_)));
    assert_eq!(store.dangling(), 0, "failing batch released its connection");
    store.close()?;

    // Reopen: the table is recreated empty; nothing from the failed batch
    // leaked through.
    let store = Store::open(Config::new("kv").database(dir.path().join("kv.db")))?;
    assert_eq!(store.try_get(b"x")?, None);
    assert_eq!(store.try_get(b"y")?, None);
    store.close()
}

#[test]
fn batches_visible_to_subsequent_full_scan_in_order() -> Result<()> {
    let dir = tempdir()?;
    let store = Store::open(Config::new("kv").database(dir.path().join("kv.db")))?;

    let mut first = Batch::new();
    first.put(*b"c", *b"1").put(*b"a", *b"1");
    let mut second = Batch::new();
    second.put(*b"b", *b"2").delete(*b"c").put(*b"a", *b"2");
    store.batch(&first)?;
    store.batch(&second)?;

    let mut iter = store.iter(RangeQuery::all())?;
    let mut records = Vec::new();
    while let Some(pair) = iter.next_entry()? {
        records.push(pair);
    }
    assert_eq!(
        records,
        vec![(b"a".to_vec(), b"2".to_vec()), (b"b".to_vec(), b"2".to_vec())]
    );
    store.close()
}
