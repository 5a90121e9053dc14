use std::fs;

use serde_json::json;
use thoth_lab_store::{LocalResultStore, ResultStore, StoreError};

fn write_document(dir: &std::path::Path, name: &str, contents: &serde_json::Value) {
    fs::write(dir.join(name), serde_json::to_vec(contents).expect("serialize"))
        .expect("write fixture document");
}

#[tokio::test]
async fn local_store_lists_and_reads_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_document(dir.path(), "adviser-b.json", &json!({"result": {"error": false}}));
    write_document(dir.path(), "adviser-a.json", &json!({"result": {"error": true}}));
    write_document(dir.path(), "solver-raw", &json!({"metadata": {}}));
    fs::create_dir(dir.path().join("nested")).expect("nested dir");

    let store = LocalResultStore::open(dir.path()).expect("open store");
    let ids = store.list_document_ids().await.expect("list ids");
    assert_eq!(ids, vec!["adviser-a", "adviser-b", "solver-raw"]);

    let document = store.get_document("adviser-a").await.expect("get document");
    assert_eq!(document["result"]["error"], json!(true));

    let raw = store.get_document("solver-raw").await.expect("get raw document");
    assert!(raw["metadata"].is_object());
}

#[tokio::test]
async fn local_store_reports_missing_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LocalResultStore::open(dir.path()).expect("open store");

    let err = store.get_document("absent").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == "absent"));
}

#[tokio::test]
async fn local_store_rejects_invalid_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("broken.json"), b"{not json").expect("write");
    let store = LocalResultStore::open(dir.path()).expect("open store");

    let err = store.get_document("broken").await.unwrap_err();
    assert!(matches!(err, StoreError::Json { document_id, .. } if document_id == "broken"));
}

#[test]
fn local_store_requires_existing_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("solver");

    let err = LocalResultStore::open(&missing).unwrap_err();
    assert!(matches!(err, StoreError::Configuration(_)));
}

#[tokio::test]
async fn local_store_filters_by_batch_identifier() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in [
        "inspection-tf-cpu-0001.json",
        "inspection-tf-cpu-0002.json",
        "inspection-tf-gpu-0001.json",
        "inspection-0001.json",
    ] {
        write_document(dir.path(), name, &json!({}));
    }

    let store = LocalResultStore::open(dir.path()).expect("open store");
    let grouped = store
        .filter_document_ids(&["tf-cpu".to_string(), "pytorch".to_string()])
        .await
        .expect("filter ids");

    assert_eq!(grouped.len(), 2);
    assert_eq!(
        grouped["tf-cpu"],
        vec!["inspection-tf-cpu-0001", "inspection-tf-cpu-0002"]
    );
    assert!(grouped["pytorch"].is_empty());
}
