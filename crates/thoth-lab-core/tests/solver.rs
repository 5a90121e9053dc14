use serde_json::{json, Value};
use thoth_lab_core::solver::{
    extract_errors, extract_metadata, extract_tree, summaries_frame, SolverError,
};

fn report() -> Value {
    json!({
        "metadata": {
            "document_id": "solver-fedora-31-py38-abc",
            "datetime": "2020-04-22T11:50:31.123456",
            "analyzer_version": "1.5.0",
            "os_release": {"name": "Fedora", "version": "31 (Thirty One)"},
            "python": {"major": 3, "minor": 8, "micro": 2},
            "arguments": {"python": {"requirements": "tensorflow==2.1.0"}}
        },
        "result": {
            "tree": [
                {
                    "package_name": "tensorflow",
                    "package_version_requested": "2.1.0",
                    "index_url": "https://pypi.org/simple",
                    "importlib_metadata": {"metadata": {"Name": "tensorflow"}},
                    "dependencies": [{"package_name": "numpy"}]
                },
                {
                    "package_name": "numpy",
                    "package_version_requested": null,
                    "index_url": "https://pypi.org/simple",
                    "importlib_metadata": null,
                    "dependencies": []
                }
            ],
            "errors": [
                {
                    "package_name": "scipy",
                    "package_version": "1.4.1",
                    "index_url": "https://pypi.org/simple",
                    "type": "command_error",
                    "details": {"return_code": 1, "stderr": "build failed"}
                }
            ]
        }
    })
}

#[test]
fn metadata_names_the_solver() {
    let summary = extract_metadata(&report()).unwrap();

    assert_eq!(summary.solver, "fedora-31-py38");
    assert_eq!(summary.os_name, "fedora");
    assert_eq!(summary.os_version, "31");
    assert_eq!(summary.python_interpreter, "3.8");
    assert_eq!(summary.document_id, "solver-fedora-31-py38-abc");
    assert_eq!(summary.requirements, json!("tensorflow==2.1.0"));
}

#[test]
fn tree_lists_resolved_packages() {
    let tree = extract_tree(&report()).unwrap();

    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].package_version.as_deref(), Some("2.1.0"));
    assert_eq!(tree[0].importlib_metadata, json!({"Name": "tensorflow"}));
    assert_eq!(tree[1].package_version, None);
    assert!(tree[1].importlib_metadata.is_null());
}

#[test]
fn errors_fill_absent_details_with_none() {
    let errors = extract_errors(&report()).unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, "command_error");
    assert_eq!(errors[0].details.return_code, Some(1));
    assert_eq!(errors[0].details.stderr.as_deref(), Some("build failed"));
    assert_eq!(errors[0].details.command, None);
    assert_eq!(errors[0].details.timeout, None);
}

#[test]
fn report_without_result_is_rejected() {
    let document = json!({"metadata": report()["metadata"].clone()});
    assert!(matches!(
        extract_tree(&document),
        Err(SolverError::MissingField("result"))
    ));
}

#[test]
fn empty_result_sections_default_to_nothing() {
    let document = json!({"result": {}});
    assert!(extract_tree(&document).unwrap().is_empty());
    assert!(extract_errors(&document).unwrap().is_empty());
}

#[test]
fn malformed_metadata_reports_its_section() {
    let document = json!({"metadata": {"document_id": "solver-x"}});
    assert!(matches!(
        extract_metadata(&document),
        Err(SolverError::Shape { section: "metadata", .. })
    ));
}

#[test]
fn summaries_become_a_table() {
    let summary = extract_metadata(&report()).unwrap();
    let frame = summaries_frame(&[summary.clone(), summary]).unwrap();

    assert_eq!(frame.height(), 2);
    assert_eq!(
        frame.get_column_names_str(),
        [
            "document_id",
            "datetime",
            "requirements",
            "solver",
            "os_name",
            "os_version",
            "python_interpreter",
            "analyzer_version"
        ]
    );
    let requirements = frame.column("requirements").unwrap().str().unwrap().get(0);
    assert_eq!(requirements, Some("tensorflow==2.1.0"));
}
