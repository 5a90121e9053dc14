use thoth_lab_store::{batch_identifier, group_by_identifier};

#[test]
fn batch_identifier_drops_first_and_last_segment() {
    assert_eq!(
        batch_identifier("inspection-tf-cpu-1a2b").as_deref(),
        Some("tf-cpu")
    );
    assert_eq!(batch_identifier("inspection-numpy-1a2b").as_deref(), Some("numpy"));
    assert_eq!(batch_identifier("inspection-1a2b"), None);
    assert_eq!(batch_identifier("single"), None);
    assert_eq!(batch_identifier("a--b"), None);
}

#[test]
fn grouping_keeps_requested_identifiers_only() {
    let ids = vec![
        "inspection-numpy-01".to_string(),
        "inspection-scipy-01".to_string(),
        "inspection-numpy-02".to_string(),
        "adviser-02".to_string(),
    ];
    let grouped = group_by_identifier(ids, &["numpy".to_string(), "flask".to_string()]);

    assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["flask", "numpy"]);
    assert_eq!(grouped["numpy"], vec!["inspection-numpy-01", "inspection-numpy-02"]);
    assert!(grouped["flask"].is_empty());
}
