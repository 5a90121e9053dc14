//! Views over solver reports: which environment a solver ran in, the package tree it resolved
//! and the errors it hit.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use thoth_lab_store::{ResultStore, StoreError};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver document is missing '{0}'")]
    MissingField(&'static str),
    #[error("solver {section} has an unexpected shape: {source}")]
    Shape {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRelease {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PythonArguments {
    pub requirements: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverArguments {
    pub python: PythonArguments,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverMetadata {
    pub document_id: String,
    pub datetime: String,
    pub analyzer_version: String,
    pub os_release: OsRelease,
    pub python: PythonVersion,
    pub arguments: SolverArguments,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverSummary {
    pub document_id: String,
    pub datetime: String,
    pub requirements: Value,
    pub solver: String,
    pub os_name: String,
    pub os_version: String,
    pub python_interpreter: String,
    pub analyzer_version: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ImportlibMetadata {
    #[serde(default)]
    metadata: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct TreeEntry {
    package_name: String,
    package_version_requested: Option<String>,
    index_url: Option<String>,
    importlib_metadata: Option<ImportlibMetadata>,
    #[serde(default)]
    dependencies: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverPackage {
    pub package_name: String,
    pub package_version: Option<String>,
    pub index_url: Option<String>,
    pub importlib_metadata: Value,
    pub dependencies: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetails {
    pub command: Option<Value>,
    pub message: Option<String>,
    pub return_code: Option<i64>,
    pub stderr: Option<String>,
    pub stdout: Option<String>,
    pub timeout: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverErrorEntry {
    pub package_name: String,
    pub package_version: Option<String>,
    pub index_url: Option<String>,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub details: ErrorDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SolverResult {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    errors: Vec<SolverErrorEntry>,
}

fn section<'a>(document: &'a Value, key: &'static str) -> Result<&'a Value, SolverError> {
    document.get(key).ok_or(SolverError::MissingField(key))
}

fn parse_section<T: for<'de> Deserialize<'de>>(
    document: &Value,
    key: &'static str,
) -> Result<T, SolverError> {
    serde_json::from_value(section(document, key)?.clone())
        .map_err(|source| SolverError::Shape { section: key, source })
}

fn version_digits(version: &str) -> String {
    version.chars().filter(char::is_ascii_digit).collect()
}

/// Solver name such as `fedora-31-py38`: lower-cased OS name, the digits of the OS version and
/// the interpreter's major and minor version.
pub fn solver_name(metadata: &SolverMetadata) -> String {
    format!(
        "{}-{}-py{}{}",
        metadata.os_release.name.to_lowercase(),
        version_digits(&metadata.os_release.version),
        metadata.python.major,
        metadata.python.minor
    )
}

pub fn extract_metadata(document: &Value) -> Result<SolverSummary, SolverError> {
    let metadata: SolverMetadata = parse_section(document, "metadata")?;

    Ok(SolverSummary {
        solver: solver_name(&metadata),
        os_name: metadata.os_release.name.to_lowercase(),
        os_version: version_digits(&metadata.os_release.version),
        python_interpreter: format!("{}.{}", metadata.python.major, metadata.python.minor),
        document_id: metadata.document_id,
        datetime: metadata.datetime,
        requirements: metadata.arguments.python.requirements,
        analyzer_version: metadata.analyzer_version,
    })
}

pub fn extract_tree(document: &Value) -> Result<Vec<SolverPackage>, SolverError> {
    let result: SolverResult = parse_section(document, "result")?;
    Ok(result
        .tree
        .into_iter()
        .map(|entry| SolverPackage {
            package_name: entry.package_name,
            package_version: entry.package_version_requested,
            index_url: entry.index_url,
            importlib_metadata: entry
                .importlib_metadata
                .map(|importlib| importlib.metadata)
                .unwrap_or(Value::Null),
            dependencies: entry.dependencies,
        })
        .collect())
}

pub fn extract_errors(document: &Value) -> Result<Vec<SolverErrorEntry>, SolverError> {
    let result: SolverResult = parse_section(document, "result")?;
    Ok(result.errors)
}

fn text_column<'a>(
    name: &str,
    summaries: &'a [SolverSummary],
    select: impl Fn(&'a SolverSummary) -> &'a str,
) -> Column {
    let values: Vec<&str> = summaries.iter().map(select).collect();
    Series::new(name.into(), values).into()
}

pub fn summaries_frame(summaries: &[SolverSummary]) -> PolarsResult<DataFrame> {
    let requirements: Vec<String> = summaries
        .iter()
        .map(|summary| match &summary.requirements {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect();

    DataFrame::new(vec![
        text_column("document_id", summaries, |s| s.document_id.as_str()),
        text_column("datetime", summaries, |s| s.datetime.as_str()),
        Series::new("requirements".into(), requirements).into(),
        text_column("solver", summaries, |s| s.solver.as_str()),
        text_column("os_name", summaries, |s| s.os_name.as_str()),
        text_column("os_version", summaries, |s| s.os_version.as_str()),
        text_column("python_interpreter", summaries, |s| s.python_interpreter.as_str()),
        text_column("analyzer_version", summaries, |s| s.analyzer_version.as_str()),
    ])
}

/// Fetches every solver report in the store, at most `limit` of them.
pub async fn collect_solver_reports(
    store: &dyn ResultStore,
    limit: Option<usize>,
) -> Result<Vec<Value>, StoreError> {
    let ids = store.list_document_ids().await?;
    let mut reports = Vec::new();
    for (index, document_id) in ids.iter().take(limit.unwrap_or(usize::MAX)).enumerate() {
        debug!(document_id = %document_id, "document n. {}", index + 1);
        reports.push(store.get_document(document_id).await?);
    }
    info!(reports = reports.len(), "retrieved solver reports");
    Ok(reports)
}
