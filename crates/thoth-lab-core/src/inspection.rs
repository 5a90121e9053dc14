use std::collections::BTreeMap;

use polars::df;
use polars::lazy::dsl::*;
use polars::prelude::*;
use serde_json::Value;
use thiserror::Error;
use thoth_lab_store::{ResultStore, StoreError};
use tracing::{debug, info};

use crate::flatten::{FlatRecords, FlattenError};

const MICROS_PER_SECOND: f64 = 1_000_000.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Duration columns added to processed results, with the timestamps they are measured between.
const DURATION_SPANS: [(&str, &str, &str); 2] = [
    (
        "status__job__duration",
        "status__job__started_at",
        "status__job__finished_at",
    ),
    (
        "status__build__duration",
        "status__build__started_at",
        "status__build__finished_at",
    ),
];

#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("empty set of inspection results provided")]
    EmptyInput,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("missing column {0}")]
    MissingColumn(String),
    #[error(transparent)]
    Flatten(#[from] FlattenError),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Top-level keys whose columns are never dropped as constant.
    pub exclude: Vec<String>,
    pub drop_constant: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            exclude: vec![
                "build_log".to_string(),
                "created".to_string(),
                "inspection_id".to_string(),
            ],
            drop_constant: true,
        }
    }
}

/// Flattens inspection results into one row each and adds job and build durations in seconds.
pub fn process_inspection_results(
    results: &[Value],
    options: &ProcessOptions,
) -> Result<DataFrame, InspectionError> {
    if results.is_empty() {
        return Err(InspectionError::EmptyInput);
    }

    let mut records = FlatRecords::from_documents(results);
    if options.drop_constant && records.len() > 1 {
        let exclude: Vec<&str> = options.exclude.iter().map(String::as_str).collect();
        let mut rejected = records.constant_columns(&exclude);
        rejected.retain(|name| {
            !DURATION_SPANS
                .iter()
                .any(|(_, started, finished)| name == started || name == finished)
        });
        debug!(?rejected, "dropping constant columns");
        records.drop_columns(&rejected);
    }

    let frame = records.to_frame()?;
    Ok(with_durations(frame)?)
}

fn with_durations(frame: DataFrame) -> PolarsResult<DataFrame> {
    let exprs: Vec<Expr> = DURATION_SPANS
        .iter()
        .filter(|(_, started, finished)| {
            frame.column(started).is_ok() && frame.column(finished).is_ok()
        })
        .map(|(duration, started, finished)| {
            ((col(*finished).cast(DataType::Int64) - col(*started).cast(DataType::Int64))
                .cast(DataType::Float64)
                / lit(MICROS_PER_SECOND))
            .alias(*duration)
        })
        .collect();

    if exprs.is_empty() {
        return Ok(frame);
    }
    frame.lazy().with_columns(exprs).collect()
}

fn band_exprs(name: &str) -> [Expr; 3] {
    [
        col(name).mean().alias(format!("{name}_mean")),
        (col(name) + col(name).std(1)).alias(format!("{name}_upper_bound")),
        (col(name) - col(name).std(1)).alias(format!("{name}_lower_bound")),
    ]
}

/// Job and build durations of processed results, each with its mean and a one-standard-deviation
/// band around every value.
pub fn duration_frame(processed: &DataFrame) -> Result<DataFrame, InspectionError> {
    if processed.height() == 0 {
        return Err(InspectionError::EmptyInput);
    }
    for (duration, _, _) in DURATION_SPANS {
        if processed.column(duration).is_err() {
            return Err(InspectionError::MissingColumn(duration.to_string()));
        }
    }

    let frame = processed
        .clone()
        .lazy()
        .select([
            col("status__job__duration").alias("job_duration"),
            col("status__build__duration").alias("build_duration"),
        ])
        .with_columns(band_exprs("job_duration"))
        .with_columns(band_exprs("build_duration"))
        .collect()?;
    Ok(frame)
}

fn column_sum(frame: &DataFrame, name: &str) -> Result<f64, InspectionError> {
    let column = frame
        .column(name)
        .map_err(|_| InspectionError::MissingColumn(name.to_string()))?;
    let values = column.cast(&DataType::Float64)?;
    Ok(values.f64()?.sum().unwrap_or(0.0))
}

/// Wall-clock hours each batch took, given `n_parallel` inspections running side by side.
/// Expects frames as returned by [`duration_frame`].
pub fn batch_time_summary(
    batches: &[(String, DataFrame)],
    n_parallel: u32,
) -> Result<DataFrame, InspectionError> {
    if n_parallel == 0 {
        return Err(InspectionError::InvalidArgument(
            "number of parallel inspections must be positive".to_string(),
        ));
    }
    let parallel = f64::from(n_parallel);

    let mut names = Vec::with_capacity(batches.len());
    let mut builds = Vec::with_capacity(batches.len());
    let mut jobs = Vec::with_capacity(batches.len());
    let mut totals = Vec::with_capacity(batches.len());

    for (name, frame) in batches {
        let build_hours = column_sum(frame, "build_duration")? / SECONDS_PER_HOUR / parallel;
        let job_hours = column_sum(frame, "job_duration")? / SECONDS_PER_HOUR / parallel;
        names.push(name.as_str());
        builds.push(build_hours);
        jobs.push(job_hours);
        totals.push(build_hours + job_hours);
    }

    Ok(df![
        "batches" => names,
        "builds_time" => builds,
        "jobs_time" => jobs,
        "tot_time" => totals,
    ]?)
}

/// Fetches the inspection documents of each requested batch identifier, at most
/// `limit_per_batch` per batch. Build logs are dropped to keep memory down.
pub async fn aggregate_inspection_results(
    store: &dyn ResultStore,
    identifiers: &[String],
    limit_per_batch: Option<usize>,
) -> Result<BTreeMap<String, Vec<Value>>, StoreError> {
    let grouped = store.filter_document_ids(identifiers).await?;
    let limit = limit_per_batch.unwrap_or(usize::MAX);
    let total: usize = grouped.values().map(|ids| ids.len().min(limit)).sum();

    let mut results = BTreeMap::new();
    let mut fetched = 0;
    for (identifier, ids) in grouped {
        info!(identifier = %identifier, "analyzing inspection batch");
        let mut documents = Vec::new();
        for document_id in ids.iter().take(limit) {
            let mut document = store.get_document(document_id).await?;
            if let Value::Object(map) = &mut document {
                map.insert("build_log".to_string(), Value::Null);
            }
            fetched += 1;
            debug!(document_id = %document_id, "analysis {}/{}", fetched, total);
            documents.push(document);
        }
        results.insert(identifier, documents);
    }

    Ok(results)
}
