use polars::prelude::*;
use serde_json::json;
use thoth_lab_core::flatten::{flatten_document, FlatRecords, FlattenError};

#[test]
fn nested_objects_become_double_underscore_paths() {
    let document = json!({
        "inspection_id": "inspection-tf-1",
        "status": {"job": {"exit_code": 0}},
        "specification": {"packages": ["a", "b"]}
    });
    let flat = flatten_document(&document);
    let names: Vec<&str> = flat.iter().map(|(name, _)| name.as_str()).collect();

    assert!(names.contains(&"inspection_id"));
    assert!(names.contains(&"status__job__exit_code"));
    assert!(names.contains(&"specification__packages"));
    let packages = flat
        .iter()
        .find(|(name, _)| name == "specification__packages")
        .map(|(_, value)| value.clone());
    assert_eq!(packages, Some(json!(["a", "b"])));
}

#[test]
fn columns_keep_first_seen_order_and_missing_values_are_null() {
    let documents = [json!({"a": 1, "b": {"c": true}}), json!({"d": "x", "a": 2})];
    let records = FlatRecords::from_documents(&documents);

    assert_eq!(records.len(), 2);
    let columns: Vec<&str> = records.columns().iter().map(String::as_str).collect();
    assert_eq!(columns, ["a", "b__c", "d"]);
    assert!(records.column_values("d")[0].is_null());
}

#[test]
fn paths_follow_document_key_order() {
    let document: serde_json::Value =
        serde_json::from_str(r#"{"status": {"job": 1, "build": 2}, "created": "x", "analyzer": "y"}"#)
            .unwrap();
    let names: Vec<String> = flatten_document(&document)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, ["status__job", "status__build", "created", "analyzer"]);
}

#[test]
fn distinct_count_handles_scalars_and_composites() {
    let documents = [
        json!({"n": 1, "list": [1, 2], "obj": null}),
        json!({"n": 1, "list": [1, 2]}),
        json!({"n": 2, "list": [2, 1]}),
    ];
    let records = FlatRecords::from_documents(&documents);

    assert_eq!(records.distinct_count("n"), 2);
    assert_eq!(records.distinct_count("list"), 2);
    assert_eq!(records.distinct_count("obj"), 0);
}

#[test]
fn constant_columns_spare_versions_and_excluded_keys() {
    let documents = [
        json!({"created": "2021-01-01T00:00:00", "analyzer_version": "1", "os": "fedora", "run": 1}),
        json!({"created": "2021-01-01T00:00:00", "analyzer_version": "1", "os": "fedora", "run": 2}),
    ];
    let mut records = FlatRecords::from_documents(&documents);
    let constant = records.constant_columns(&["created"]);

    assert_eq!(constant, vec!["os".to_string()]);
    records.drop_columns(&constant);
    let columns: Vec<&str> = records.columns().iter().map(String::as_str).collect();
    assert_eq!(columns, ["created", "analyzer_version", "run"]);
}

#[test]
fn frame_columns_are_typed() -> Result<(), FlattenError> {
    let documents = [
        json!({
            "flag": true,
            "count": 3,
            "ratio": 0.5,
            "name": "a",
            "status": {"job": {"started_at": "2021-01-01T00:00:00Z"}},
            "tags": ["x"]
        }),
        json!({
            "flag": false,
            "count": 4,
            "ratio": 1,
            "name": null,
            "status": {"job": {"started_at": "2021-01-01T00:00:10.5Z"}},
            "tags": []
        }),
    ];
    let frame = FlatRecords::from_documents(&documents).to_frame()?;

    assert_eq!(frame.column("flag")?.dtype(), &DataType::Boolean);
    assert_eq!(frame.column("count")?.dtype(), &DataType::Int64);
    assert_eq!(frame.column("ratio")?.dtype(), &DataType::Float64);
    assert_eq!(frame.column("name")?.dtype(), &DataType::String);
    assert_eq!(frame.column("tags")?.dtype(), &DataType::String);
    assert!(matches!(
        frame.column("status__job__started_at")?.dtype(),
        DataType::Datetime(TimeUnit::Microseconds, _)
    ));
    assert_eq!(frame.column("name")?.null_count(), 1);
    Ok(())
}

#[test]
fn unparseable_timestamps_are_reported() {
    let documents = [json!({"created": "yesterday"})];
    let err = FlatRecords::from_documents(&documents).to_frame().unwrap_err();
    assert!(matches!(err, FlattenError::InvalidTimestamp { column, .. } if column == "created"));
}
