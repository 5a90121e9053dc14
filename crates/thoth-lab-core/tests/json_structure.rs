use serde_json::{json, Value};
use thoth_lab_core::json_structure::{
    extract_structure, filter_structure, KeyFilter, StructureError, StructureValue,
};
use thoth_lab_core::LabError;

fn sample() -> Value {
    json!({
        "metadata": {
            "analyzer": "adviser",
            "os_release": {"name": "Fedora", "version": "31"}
        },
        "result": {"error": false}
    })
}

#[test]
fn rows_list_parents_before_children() {
    let rows = extract_structure(&sample(), "document");
    let listing: Vec<(usize, &str, &str)> = rows
        .iter()
        .map(|row| (row.depth, row.upper_key.as_str(), row.key.as_str()))
        .collect();

    assert_eq!(
        listing,
        [
            (1, "document", "metadata"),
            (2, "document__metadata", "analyzer"),
            (2, "document__metadata", "os_release"),
            (3, "document__metadata__os_release", "name"),
            (3, "document__metadata__os_release", "version"),
            (1, "document", "result"),
            (2, "document__result", "error"),
        ]
    );
    assert_eq!(
        rows[0].value,
        StructureValue::Keys(vec!["analyzer".to_string(), "os_release".to_string()])
    );
    assert_eq!(rows[6].value, StructureValue::Leaf(json!(false)));
}

#[test]
fn scalars_have_no_structure() {
    assert!(extract_structure(&json!(42), "document").is_empty());
}

#[test]
fn filter_by_key_and_combined_key() {
    let rows = extract_structure(&sample(), "document");

    let by_key = filter_structure(&rows, KeyFilter::Key("version")).unwrap();
    assert_eq!(by_key.len(), 1);
    assert_eq!(by_key[0].value, StructureValue::Leaf(json!("31")));

    let by_path = filter_structure(&rows, KeyFilter::Key("document__metadata__os_release")).unwrap();
    let keys: Vec<&str> = by_path.iter().map(|row| row.key.as_str()).collect();
    assert_eq!(keys, ["name", "version"]);
}

#[test]
fn unknown_key_lists_what_is_available() {
    let rows = extract_structure(&sample(), "document");
    let err = filter_structure(&rows, KeyFilter::Key("missing")).unwrap_err();

    match err {
        StructureError::UnknownKey {
            available,
            combined,
            ..
        } => {
            assert!(available.contains(&"os_release".to_string()));
            assert!(combined.contains(&"document__result".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn filter_by_depth() {
    let rows = extract_structure(&sample(), "document");

    let top = filter_structure(&rows, KeyFilter::Depth(1)).unwrap();
    assert_eq!(top.len(), 2);

    assert_eq!(
        filter_structure(&rows, KeyFilter::Depth(4)).unwrap_err(),
        StructureError::DepthOutOfRange {
            requested: 4,
            max_depth: 3
        }
    );
}

#[test]
fn rows_follow_document_key_order() {
    let document: Value =
        serde_json::from_str(r#"{"result": {"report": null, "error": false}, "metadata": {}}"#).unwrap();
    let rows = extract_structure(&document, "document");
    let keys: Vec<&str> = rows.iter().map(|row| row.key.as_str()).collect();

    assert_eq!(keys, ["result", "report", "error", "metadata"]);
    assert_eq!(
        rows[0].value,
        StructureValue::Keys(vec!["report".to_string(), "error".to_string()])
    );
}

#[test]
fn structure_errors_convert_into_the_crate_error() {
    fn depth_listing(document: &Value, depth: usize) -> thoth_lab_core::Result<usize> {
        let rows = extract_structure(document, "document");
        Ok(filter_structure(&rows, KeyFilter::Depth(depth))?.len())
    }

    assert_eq!(depth_listing(&sample(), 1).unwrap(), 2);
    let err = depth_listing(&sample(), 9).unwrap_err();
    assert!(matches!(
        err,
        LabError::Structure(StructureError::DepthOutOfRange { requested: 9, .. })
    ));
}
