//! Tree listing of a result document: one row per key with its depth, the path of its parents
//! and either its child keys or its leaf value.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const PATH_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StructureValue {
    /// Child keys of a nested object; the children follow as their own rows.
    Keys(Vec<String>),
    Leaf(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureRow {
    pub depth: usize,
    pub upper_key: String,
    pub key: String,
    pub value: StructureValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("key '{key}' is not in the document; available keys: {available:?}; available combined keys: {combined:?}")]
    UnknownKey {
        key: String,
        available: Vec<String>,
        combined: Vec<String>,
    },
    #[error("depth {requested} exceeds the maximum tree depth {max_depth}")]
    DepthOutOfRange { requested: usize, max_depth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFilter<'a> {
    /// Exact key name, falling back to a suffix of the combined parent path.
    Key(&'a str),
    Depth(usize),
}

/// Lists the tree below `document`, top-level keys at depth 1 with `root` as their upper key.
/// Anything other than an object has no keys and yields no rows.
pub fn extract_structure(document: &Value, root: &str) -> Vec<StructureRow> {
    let mut rows = Vec::new();
    if let Value::Object(map) = document {
        walk(map, root, 1, &mut rows);
    }
    rows
}

fn walk(map: &Map<String, Value>, upper_key: &str, depth: usize, rows: &mut Vec<StructureRow>) {
    for (key, value) in map {
        match value {
            Value::Object(child) => {
                rows.push(StructureRow {
                    depth,
                    upper_key: upper_key.to_string(),
                    key: key.clone(),
                    value: StructureValue::Keys(child.keys().cloned().collect()),
                });
                let path = format!("{upper_key}{PATH_SEPARATOR}{key}");
                walk(child, &path, depth + 1, rows);
            }
            leaf => rows.push(StructureRow {
                depth,
                upper_key: upper_key.to_string(),
                key: key.clone(),
                value: StructureValue::Leaf(leaf.clone()),
            }),
        }
    }
}

pub fn filter_structure<'r>(
    rows: &'r [StructureRow],
    filter: KeyFilter<'_>,
) -> Result<Vec<&'r StructureRow>, StructureError> {
    match filter {
        KeyFilter::Key(key) => {
            if rows.iter().any(|row| row.key == key) {
                return Ok(rows.iter().filter(|row| row.key == key).collect());
            }
            if rows.iter().any(|row| row.upper_key == key) {
                return Ok(rows
                    .iter()
                    .filter(|row| row.upper_key.ends_with(key))
                    .collect());
            }

            let available: BTreeSet<&str> = rows.iter().map(|row| row.key.as_str()).collect();
            let combined: BTreeSet<&str> = rows.iter().map(|row| row.upper_key.as_str()).collect();
            Err(StructureError::UnknownKey {
                key: key.to_string(),
                available: available.into_iter().map(str::to_string).collect(),
                combined: combined.into_iter().map(str::to_string).collect(),
            })
        }
        KeyFilter::Depth(requested) => {
            let max_depth = rows.iter().map(|row| row.depth).max().unwrap_or(0);
            if requested > max_depth {
                return Err(StructureError::DepthOutOfRange {
                    requested,
                    max_depth,
                });
            }
            Ok(rows.iter().filter(|row| row.depth == requested).collect())
        }
    }
}
