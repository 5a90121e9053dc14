use std::collections::{HashMap, HashSet};

use polars::prelude::{Column, DataFrame, NamedFrom, PolarsError, Series};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::json_structure::PATH_SEPARATOR;
use crate::timestamps::{parse_timestamp, utc_datetime_series};

/// Leaf names that hold timestamps and become datetime columns.
const DATETIME_FIELDS: [&str; 3] = ["created", "started_at", "finished_at"];

static NULL: Value = Value::Null;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("column {column} holds a value that is not a timestamp: {value}")]
    InvalidTimestamp { column: String, value: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Documents flattened into rows of `parent__child` columns. Arrays stay whole as leaf values.
#[derive(Debug, Clone, Default)]
pub struct FlatRecords {
    columns: Vec<String>,
    rows: Vec<HashMap<String, Value>>,
}

/// How a value takes part in distinct counting: scalars are keyed directly, composites fall
/// back to structural equality.
#[derive(Debug, PartialEq, Eq, Hash)]
enum ScalarKey<'a> {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Text(&'a str),
}

enum Groupable<'a> {
    Missing,
    Scalar(ScalarKey<'a>),
    Composite(&'a Value),
}

fn groupable(value: &Value) -> Groupable<'_> {
    match value {
        Value::Null => Groupable::Missing,
        Value::Bool(flag) => Groupable::Scalar(ScalarKey::Bool(*flag)),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Groupable::Scalar(ScalarKey::Int(int))
            } else if let Some(uint) = number.as_u64() {
                Groupable::Scalar(ScalarKey::UInt(uint))
            } else {
                Groupable::Scalar(ScalarKey::Float(
                    number.as_f64().unwrap_or(f64::NAN).to_bits(),
                ))
            }
        }
        Value::String(text) => Groupable::Scalar(ScalarKey::Text(text)),
        Value::Array(_) | Value::Object(_) => Groupable::Composite(value),
    }
}

fn flatten_into(map: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let name = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(child) => flatten_into(child, Some(&name), out),
            leaf => out.push((name, leaf.clone())),
        }
    }
}

/// Leaf paths and values of one document; anything but an object has no leaves.
pub fn flatten_document(document: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    if let Value::Object(map) = document {
        flatten_into(map, None, &mut out);
    }
    out
}

impl FlatRecords {
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut records = FlatRecords::default();
        let mut seen: HashSet<String> = HashSet::new();

        for document in documents {
            let mut row = HashMap::new();
            for (name, value) in flatten_document(document) {
                if seen.insert(name.clone()) {
                    records.columns.push(name.clone());
                }
                row.insert(name, value);
            }
            records.rows.push(row);
        }

        records
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, `null` where a row lacks it.
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        self.rows
            .iter()
            .map(|row| row.get(column).unwrap_or(&NULL))
            .collect()
    }

    /// Number of distinct non-null values in a column.
    pub fn distinct_count(&self, column: &str) -> usize {
        let mut scalars: HashSet<ScalarKey<'_>> = HashSet::new();
        let mut composites: Vec<&Value> = Vec::new();

        for value in self.column_values(column) {
            match groupable(value) {
                Groupable::Missing => {}
                Groupable::Scalar(key) => {
                    scalars.insert(key);
                }
                Groupable::Composite(value) => {
                    if !composites.contains(&value) {
                        composites.push(value);
                    }
                }
            }
        }

        scalars.len() + composites.len()
    }

    /// Columns holding at most one distinct value. Version columns are always kept, as are
    /// columns below an excluded top-level key.
    pub fn constant_columns(&self, exclude: &[&str]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|name| !name.contains("version"))
            .filter(|name| {
                let top = name.split(PATH_SEPARATOR).next().unwrap_or(name.as_str());
                !exclude.contains(&top)
            })
            .filter(|name| self.distinct_count(name) <= 1)
            .cloned()
            .collect()
    }

    pub fn drop_columns(&mut self, names: &[String]) {
        self.columns.retain(|name| !names.contains(name));
        for row in &mut self.rows {
            for name in names {
                row.remove(name);
            }
        }
    }

    /// Typed frame with one column per flattened path, in first-seen order.
    pub fn to_frame(&self) -> Result<DataFrame, FlattenError> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let values = self.column_values(name);
            columns.push(build_column(name, &values)?.into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Int,
    Float,
    Text,
    Datetime,
}

fn column_kind(name: &str, values: &[&Value]) -> ColumnKind {
    let present: Vec<&Value> = values.iter().copied().filter(|value| !value.is_null()).collect();
    let leaf = name.rsplit(PATH_SEPARATOR).next().unwrap_or(name);

    if DATETIME_FIELDS.contains(&leaf) && present.iter().all(|value| value.is_string()) {
        return ColumnKind::Datetime;
    }
    if present.is_empty() {
        return ColumnKind::Text;
    }
    if present.iter().all(|value| value.is_boolean()) {
        ColumnKind::Boolean
    } else if present.iter().all(|value| value.is_i64()) {
        ColumnKind::Int
    } else if present.iter().all(|value| value.is_number()) {
        ColumnKind::Float
    } else {
        ColumnKind::Text
    }
}

fn build_column(name: &str, values: &[&Value]) -> Result<Series, FlattenError> {
    let series = match column_kind(name, values) {
        ColumnKind::Boolean => Series::new(
            name.into(),
            values.iter().map(|value| value.as_bool()).collect::<Vec<_>>(),
        ),
        ColumnKind::Int => Series::new(
            name.into(),
            values.iter().map(|value| value.as_i64()).collect::<Vec<_>>(),
        ),
        ColumnKind::Float => Series::new(
            name.into(),
            values.iter().map(|value| value.as_f64()).collect::<Vec<_>>(),
        ),
        ColumnKind::Text => {
            let text: Vec<Option<String>> = values
                .iter()
                .map(|value| match value {
                    Value::Null => None,
                    Value::String(text) => Some(text.clone()),
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(
                name.into(),
                text.iter().map(|opt| opt.as_deref()).collect::<Vec<Option<&str>>>(),
            )
        }
        ColumnKind::Datetime => {
            let micros = values
                .iter()
                .map(|value| match value {
                    Value::String(text) => parse_timestamp(text)
                        .map(|parsed| Some(parsed.timestamp_micros()))
                        .ok_or_else(|| FlattenError::InvalidTimestamp {
                            column: name.to_string(),
                            value: text.clone(),
                        }),
                    _ => Ok(None),
                })
                .collect::<Result<Vec<Option<i64>>, FlattenError>>()?;
            utc_datetime_series(name, micros)?
        }
    };
    Ok(series)
}
