//! Tests for the key-value store implementations

use std::sync::Arc;

use ipam::infrastructure::traits::{FileStore, KeyValueStore, MemoryStore};
use ipam::util::testing;
use rstest::rstest;
use tempfile::TempDir;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn stores(temp: &TempDir) -> Vec<Arc<dyn KeyValueStore>> {
    vec![
        Arc::new(MemoryStore::new()),
        Arc::new(FileStore::new(temp.path().join("store"))),
    ]
}

#[test]
fn given_any_store_when_setting_and_getting_then_bytes_round_trip() {
    let temp = TempDir::new().unwrap();
    for store in stores(&temp) {
        assert_eq!(store.get("ipam:schema").unwrap(), None);

        store.set("ipam:schema", b"{}").unwrap();
        store.set("ipam:schema", b"{\"Test\": []}").unwrap();

        assert_eq!(
            store.get("ipam:schema").unwrap().as_deref(),
            Some(b"{\"Test\": []}".as_slice())
        );
    }
}

#[test]
fn given_any_store_when_deleting_then_previous_value_returned_once() {
    let temp = TempDir::new().unwrap();
    for store in stores(&temp) {
        store.set("k", b"v").unwrap();

        assert_eq!(store.delete("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.delete("k").unwrap(), None);
        assert_eq!(store.get("k").unwrap(), None);
    }
}

#[rstest]
#[case::domains("ipam:domain:", &["ipam:domain:Alpha", "ipam:domain:beta/1"])]
#[case::everything("", &["ipam:domain:Alpha", "ipam:domain:beta/1", "ipam:schema"])]
#[case::nothing("other:", &[])]
fn given_keys_when_listing_by_prefix_then_sorted_matches(
    #[case] prefix: &str,
    #[case] expected: &[&str],
) {
    let temp = TempDir::new().unwrap();
    for store in stores(&temp) {
        for key in ["ipam:schema", "ipam:domain:beta/1", "ipam:domain:Alpha"] {
            store.set(key, b"x").unwrap();
        }

        assert_eq!(store.keys(prefix).unwrap(), expected);
    }
}

#[test]
fn given_file_store_when_setting_then_one_hex_named_file_per_key() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path());

    store.set("a/b", b"1").unwrap();

    let path = temp.path().join(format!("{}.kv", hex::encode("a/b")));
    assert_eq!(std::fs::read(path).unwrap(), b"1");
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn given_foreign_files_when_listing_then_ignored() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("README"), "not a record").unwrap();
    std::fs::write(temp.path().join("zz.kv"), "not hex").unwrap();
    let store = FileStore::new(temp.path());
    store.set("ipam:schema", b"{}").unwrap();

    assert_eq!(store.keys("").unwrap(), vec!["ipam:schema".to_string()]);
}

#[test]
fn given_missing_directory_when_reading_then_empty() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path().join("absent"));

    assert_eq!(store.get("k").unwrap(), None);
    assert!(store.keys("").unwrap().is_empty());
    assert_eq!(store.delete("k").unwrap(), None);
}

#[test]
fn given_two_handles_on_one_directory_when_writing_then_both_see_it() {
    let temp = TempDir::new().unwrap();
    let writer = FileStore::new(temp.path());
    let reader = FileStore::new(temp.path());

    writer.set("ipam:domain:Sedgman", b"doc").unwrap();

    assert_eq!(
        reader.get("ipam:domain:Sedgman").unwrap(),
        Some(b"doc".to_vec())
    );
}
