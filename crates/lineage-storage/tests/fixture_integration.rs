//! Fixture Integration Tests.
//!
//! Loads fixture files from disk and checks that the resulting store pages
//! children the way the walker expects.

use std::io::Write;

use lineage_storage::{load_fixture, LineageStore, StorageError};

fn hash(n: u32) -> String {
    format!("0x{:064x}", n)
}

fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write fixture");
    file
}

#[tokio::test]
async fn test_fixture_file_pages_children() {
    let children: Vec<String> = (10..40)
        .map(|n| format!(r#"{{"hash": "{}"}}"#, hash(n)))
        .collect();
    let file = write_fixture(&format!(
        r#"{{"people": [{{"hash": "{}", "tag": "root", "children": [{}]}}]}}"#,
        hash(1),
        children.join(",")
    ));

    let store = load_fixture(file.path()).unwrap();

    let mut offset = 0;
    let mut seen = Vec::new();
    loop {
        let slice = store.list_children(&hash(1), 1, offset, 25).await.unwrap();
        assert_eq!(slice.total_count, 30);
        seen.extend(slice.child_hashes);
        if !slice.has_more {
            break;
        }
        offset = slice.next_offset;
    }

    let expected: Vec<String> = (10..40).map(hash).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_children_without_entries_are_unknown_leaves() {
    let file = write_fixture(&format!(
        r#"{{"people": [{{"hash": "{}", "children": [{{"hash": "{}"}}]}}]}}"#,
        hash(1),
        hash(2)
    ));

    let store = load_fixture(file.path()).unwrap();

    assert!(!store.version_exists(&hash(2), 1).await.unwrap());
    assert!(matches!(
        store.list_children(&hash(2), 1, 0, 25).await,
        Err(StorageError::VersionNotFound { .. })
    ));
}

#[test]
fn test_empty_document_loads_empty_store() {
    let file = write_fixture("{}");
    let store = load_fixture(file.path()).unwrap();
    assert!(store.is_empty());
}
