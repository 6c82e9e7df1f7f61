use std::sync::Arc;

use tblload_index::{IndexFile, IndexKey, KeyType, create_index, destroy_index, index_artifact_name};
use tblload_result::Error;
use tblload_storage::MemPager;
use tblload_test_utils::init_tracing_for_tests;
use tblload_types::RecordId;
use tempfile::TempDir;

#[test]
fn create_refuses_an_existing_artifact() {
    init_tracing_for_tests();
    let tmp = TempDir::new().expect("tempdir");
    let store = tmp.path().join("data.db");

    let path = create_index(&store, 2, KeyType::Long).expect("create");
    assert_eq!(path, index_artifact_name(&store, 2));
    assert!(path.exists());
    assert!(matches!(
        create_index(&store, 2, KeyType::Long),
        Err(Error::IndexFailure(_))
    ));

    // A different attribute is a different artifact.
    create_index(&store, 1, KeyType::Int).expect("create other");
}

#[test]
fn destroy_is_idempotent() {
    let tmp = TempDir::new().expect("tempdir");
    let store = tmp.path().join("data.db");
    let path = create_index(&store, 0, KeyType::Int).expect("create");

    assert!(destroy_index(&path).expect("destroy"));
    assert!(!destroy_index(&path).expect("destroy again"));
    assert!(!path.exists());
    create_index(&store, 0, KeyType::Int).expect("re-create");
}

#[test]
fn entries_persist_in_key_order_with_duplicates() {
    let tmp = TempDir::new().expect("tempdir");
    let store = tmp.path().join("data.db");
    let path = create_index(&store, 2, KeyType::Long).expect("create");

    let rows: [(i64, RecordId); 5] = [
        (30000, RecordId::new(1, 0)),
        (-5, RecordId::new(1, 1)),
        (30000, RecordId::new(1, 2)),
        (7, RecordId::new(2, 0)),
        (i64::MAX, RecordId::new(2, 1)),
    ];
    {
        let mut index = IndexFile::open(&path).expect("open");
        for (key, rid) in rows {
            index
                .insert_entry(KeyType::Long, &key.to_be_bytes(), rid)
                .expect("insert");
        }
        index.close().expect("close");
    }

    let index = IndexFile::open(&path).expect("reopen");
    assert_eq!(index.len(), 5);
    assert_eq!(index.attribute(), 2);
    assert_eq!(index.key_type(), KeyType::Long);
    let keys: Vec<IndexKey> = index.entries().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![
            IndexKey::Long(-5),
            IndexKey::Long(7),
            IndexKey::Long(30000),
            IndexKey::Long(30000),
            IndexKey::Long(i64::MAX),
        ]
    );
    assert_eq!(
        index.lookup(IndexKey::Long(30000)),
        vec![RecordId::new(1, 0), RecordId::new(1, 2)]
    );
    assert!(index.lookup(IndexKey::Long(8)).is_empty());
}

#[test]
fn insert_validates_key_type_and_width() {
    let pager = Arc::new(MemPager::new());
    let mut index = IndexFile::create_with_pager(pager, 1, KeyType::Int).expect("create");
    let rid = RecordId::new(1, 0);

    let err = index
        .insert_entry(KeyType::Long, &9i64.to_be_bytes(), rid)
        .unwrap_err();
    assert!(matches!(err, Error::IndexFailure(_)));

    let err = index.insert_entry(KeyType::Int, &[0, 0, 9], rid).unwrap_err();
    assert!(matches!(err, Error::IndexFailure(_)));
    assert!(index.is_empty());

    index
        .insert_entry(KeyType::Int, &9i32.to_be_bytes(), rid)
        .expect("insert");
    assert_eq!(index.len(), 1);
}

#[test]
fn many_entries_spill_across_sorted_leaves() {
    // 2 header bytes + 3 entries of 14 bytes each per leaf.
    let pager = Arc::new(MemPager::with_page_capacity(44));
    {
        let mut index =
            IndexFile::create_with_pager(Arc::clone(&pager), 0, KeyType::Int).expect("create");
        for i in (0..20i32).rev() {
            index
                .insert_entry(KeyType::Int, &i.to_be_bytes(), RecordId::new(1, i as u16))
                .expect("insert");
        }
        index.flush().expect("flush");
    }
    // Root page plus ceil(20 / 3) leaves.
    assert_eq!(pager.len(), 1 + 7);

    let index = IndexFile::with_pager(Arc::clone(&pager)).expect("reload");
    let keys: Vec<IndexKey> = index.entries().map(|(k, _)| k).collect();
    let expected: Vec<IndexKey> = (0..20).map(IndexKey::Int).collect();
    assert_eq!(keys, expected);
}

#[test]
fn second_create_on_the_same_pager_fails() {
    let pager = Arc::new(MemPager::new());
    IndexFile::create_with_pager(Arc::clone(&pager), 0, KeyType::Int)
        .expect("create")
        .close()
        .expect("close");
    assert!(matches!(
        IndexFile::create_with_pager(pager, 0, KeyType::Int),
        Err(Error::IndexFailure(_))
    ));
}
