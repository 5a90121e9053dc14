use serde_json::{Map, Value};
use thiserror::Error;

use super::JustificationRecord;
use crate::timestamps::parse_timestamp;

/// Justification type reported for adviser runs that failed.
pub const ERROR_TYPE: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("missing field '{field}'")]
    MissingField { field: String },
    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

/// Which product's justification list is used when several products carry one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductPolicy {
    /// Every product is inspected and the last one with a non-empty list wins.
    #[default]
    LastMatch,
    /// The first product with a non-empty list wins; later products are not inspected.
    FirstMatch,
}

/// The justification picked for one adviser result, before document metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedJustification {
    pub is_error: bool,
    pub message: String,
    pub justification_type: String,
}

fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn invalid(field: impl Into<String>, expected: &'static str) -> ExtractError {
    ExtractError::InvalidField {
        field: field.into(),
        expected,
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ExtractError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid(path, "an object")),
    }
}

fn require<'a>(
    map: &'a Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<&'a Value, ExtractError> {
    map.get(key).ok_or_else(|| ExtractError::MissingField {
        field: field_path(parent, key),
    })
}

fn require_str<'a>(
    map: &'a Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<&'a str, ExtractError> {
    match require(map, parent, key)? {
        Value::String(text) => Ok(text),
        _ => Err(invalid(field_path(parent, key), "a string")),
    }
}

/// Picks the justification of a single `result` object.
///
/// An errored run yields its error message typed `ERROR`. Otherwise the first entry of a
/// product's justification list is used, the product being chosen by `policy`. Results without
/// a report, without products, or whose products carry no justifications yield `None`.
pub fn extract_from_result(
    result: &Value,
    policy: ProductPolicy,
) -> Result<Option<ExtractedJustification>, ExtractError> {
    let result = as_object(result, "result")?;

    let had_error = match require(result, "result", "error")? {
        Value::Bool(flag) => *flag,
        _ => return Err(invalid("result.error", "a boolean")),
    };

    if had_error {
        let message = require_str(result, "result", "error_msg")?;
        return Ok(Some(ExtractedJustification {
            is_error: true,
            message: message.to_string(),
            justification_type: ERROR_TYPE.to_string(),
        }));
    }

    let report = match result.get("report") {
        None | Some(Value::Null) => return Ok(None),
        Some(report) => as_object(report, "result.report")?,
    };

    let products = match report.get("products") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(products)) => products,
        Some(_) => return Err(invalid("result.report.products", "an array")),
    };

    let mut selected = None;
    for (index, product) in products.iter().enumerate() {
        let path = format!("result.report.products[{index}]");
        let product = as_object(product, &path)?;

        let entries = match require(product, &path, "justification")? {
            Value::Null => continue,
            Value::Array(entries) => entries,
            _ => return Err(invalid(field_path(&path, "justification"), "an array")),
        };
        let Some(first) = entries.first() else {
            continue;
        };

        let entry_path = format!("{path}.justification[0]");
        let entry = as_object(first, &entry_path)?;
        selected = Some(ExtractedJustification {
            is_error: false,
            message: require_str(entry, &entry_path, "message")?.to_string(),
            justification_type: require_str(entry, &entry_path, "type")?.to_string(),
        });

        if policy == ProductPolicy::FirstMatch {
            break;
        }
    }

    Ok(selected)
}

/// Analyzer version recorded in a document's metadata.
pub fn analyzer_version(document: &Value) -> Result<&str, ExtractError> {
    let document = as_object(document, "document")?;
    let metadata = as_object(require(document, "", "metadata")?, "metadata")?;
    require_str(metadata, "metadata", "analyzer_version")
}

/// Builds the record for one fetched adviser document. Both `metadata` and `result` are
/// required; a document with nothing to report yields `None`.
pub fn extract_record(
    document_id: &str,
    document: &Value,
    policy: ProductPolicy,
) -> Result<Option<JustificationRecord>, ExtractError> {
    let document = as_object(document, "document")?;
    let metadata = as_object(require(document, "", "metadata")?, "metadata")?;
    let result = require(document, "", "result")?;

    let datetime = require_str(metadata, "metadata", "datetime")?;
    let timestamp =
        parse_timestamp(datetime).ok_or_else(|| invalid("metadata.datetime", "an ISO 8601 timestamp"))?;
    let analyzer_version = require_str(metadata, "metadata", "analyzer_version")?;

    let Some(extracted) = extract_from_result(result, policy)? else {
        return Ok(None);
    };

    Ok(Some(JustificationRecord {
        document_id: document_id.to_string(),
        timestamp,
        analyzer_version: analyzer_version.to_string(),
        is_error: extracted.is_error,
        message: extracted.message,
        justification_type: extracted.justification_type,
    }))
}
