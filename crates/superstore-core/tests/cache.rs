use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;

use superstore_core::cache::{DataSource, TableCache};
use superstore_parser::{LoadError, TextEncoding, TransactionsTable};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../superstore-parser/tests/data/store_sample.csv")
}

#[test]
fn loads_once_until_cleared() {
    let source = DataSource::new(fixture(), TextEncoding::Latin1);
    let mut cache = TableCache::new();
    let loads = Cell::new(0);
    let counting = |source: &DataSource| {
        loads.set(loads.get() + 1);
        source.load()
    };

    let first = cache.get_or_load_with(&source, counting).expect("first load");
    let second = cache.get_or_load_with(&source, counting).expect("cached");
    assert_eq!(loads.get(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.height(), 13);
    assert!(cache.contains(&source));

    cache.clear();
    assert!(cache.is_empty());
    let third = cache.get_or_load_with(&source, counting).expect("reload");
    assert_eq!(loads.get(), 2);
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn encoding_is_part_of_the_key() {
    let latin1 = DataSource::new(fixture(), TextEncoding::Latin1);
    let utf8 = DataSource::new(fixture(), TextEncoding::Utf8);
    let mut cache = TableCache::new();

    cache.get_or_load(&latin1).expect("latin1 loads");
    assert!(!cache.contains(&utf8));
    let err = cache.get_or_load(&utf8).expect_err("fixture is not utf8");
    assert!(matches!(err, LoadError::Encoding { .. }));
    assert_eq!(cache.len(), 1);
}

#[test]
fn failed_loads_are_not_cached() {
    let source = DataSource::new("missing.csv", TextEncoding::Latin1);
    let mut cache = TableCache::new();

    assert!(cache.get_or_load(&source).is_err());
    assert!(!cache.contains(&source));

    let table = cache
        .get_or_load_with(&source, |_| TransactionsTable::from_rows(Vec::new()))
        .expect("stub loader");
    assert!(table.is_empty());
    assert!(cache.contains(&source));
}
