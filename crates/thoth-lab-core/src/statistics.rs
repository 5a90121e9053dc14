use polars::lazy::dsl::{pearson_corr, spearman_rank_corr};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("no values to describe")]
    Empty,
    #[error("correlation needs at least two complete pairs, got {0}")]
    TooFewPairs(usize),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Descriptive statistics of one numeric parameter. Standard deviation uses one delta degree of
/// freedom and is `NaN` for a single value, as are the quantities derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub std_error: f64,
    /// Coefficient of variation in percent.
    pub cv: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub min: f64,
    pub max: f64,
}

pub fn evaluate_statistics(values: &[f64]) -> Result<Statistics, StatisticsError> {
    let chunked = Float64Chunked::from_slice("values".into(), values);
    describe(&chunked)
}

/// Statistics of a numeric column, nulls ignored.
pub fn evaluate_column(frame: &DataFrame, column: &str) -> Result<Statistics, StatisticsError> {
    let values = frame.column(column)?.cast(&DataType::Float64)?;
    describe(values.f64()?)
}

fn describe(values: &Float64Chunked) -> Result<Statistics, StatisticsError> {
    let count = values.len() - values.null_count();
    if count == 0 {
        return Err(StatisticsError::Empty);
    }

    let mean = values.mean().ok_or(StatisticsError::Empty)?;
    let std = values.std(1).unwrap_or(f64::NAN);
    let q1 = values
        .quantile(0.25, QuantileMethod::Linear)?
        .ok_or(StatisticsError::Empty)?;
    let q3 = values
        .quantile(0.75, QuantileMethod::Linear)?
        .ok_or(StatisticsError::Empty)?;

    Ok(Statistics {
        count,
        mean,
        std,
        std_error: std / (count as f64).sqrt(),
        cv: std / mean * 100.0,
        median: values.median().ok_or(StatisticsError::Empty)?,
        q1,
        q3,
        iqr: q3 - q1,
        min: values.min().ok_or(StatisticsError::Empty)?,
        max: values.max().ok_or(StatisticsError::Empty)?,
    })
}

/// One row per batch with the statistics of `parameter` in that batch, in batch order.
pub fn compare_batches(
    batches: &[(String, DataFrame)],
    parameter: &str,
) -> Result<DataFrame, StatisticsError> {
    if batches.is_empty() {
        return Err(StatisticsError::Empty);
    }

    let mut names = Vec::with_capacity(batches.len());
    let mut rows = Vec::with_capacity(batches.len());
    for (name, frame) in batches {
        names.push(name.as_str());
        rows.push(evaluate_column(frame, parameter)?);
    }
    let field = |select: fn(&Statistics) -> f64| rows.iter().map(select).collect::<Vec<f64>>();

    Ok(df![
        "batch" => names,
        "count" => rows.iter().map(|row| row.count as u64).collect::<Vec<_>>(),
        "mean" => field(|row| row.mean),
        "std" => field(|row| row.std),
        "std_error" => field(|row| row.std_error),
        "cv" => field(|row| row.cv),
        "median" => field(|row| row.median),
        "q1" => field(|row| row.q1),
        "q3" => field(|row| row.q3),
        "iqr" => field(|row| row.iqr),
        "min" => field(|row| row.min),
        "max" => field(|row| row.max),
    ]?)
}

/// Pearson, Spearman and Kendall (tau-b) coefficients between two numeric columns, over the
/// rows where both are present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlations {
    pub pairs: usize,
    pub pearson: f64,
    pub spearman: f64,
    pub kendall: f64,
}

pub fn correlations(frame: &DataFrame, a: &str, b: &str) -> Result<Correlations, StatisticsError> {
    let pairs = frame
        .clone()
        .lazy()
        .select([
            col(a).cast(DataType::Float64).alias("a"),
            col(b).cast(DataType::Float64).alias("b"),
        ])
        .drop_nulls(None)
        .collect()?;
    if pairs.height() < 2 {
        return Err(StatisticsError::TooFewPairs(pairs.height()));
    }

    let coefficients = pairs
        .clone()
        .lazy()
        .select([
            pearson_corr(col("a"), col("b")).alias("pearson"),
            spearman_rank_corr(col("a"), col("b"), false).alias("spearman"),
        ])
        .collect()?;

    let x: Vec<f64> = pairs.column("a")?.f64()?.into_no_null_iter().collect();
    let y: Vec<f64> = pairs.column("b")?.f64()?.into_no_null_iter().collect();

    Ok(Correlations {
        pairs: pairs.height(),
        pearson: first_value(&coefficients, "pearson")?,
        spearman: first_value(&coefficients, "spearman")?,
        kendall: kendall_tau_b(&x, &y),
    })
}

fn first_value(frame: &DataFrame, name: &str) -> Result<f64, StatisticsError> {
    let values = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(values.f64()?.get(0).unwrap_or(f64::NAN))
}

/// Pairs tied in both columns count towards neither tie total.
fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let (mut concordant, mut discordant, mut ties_x, mut ties_y) = (0u64, 0u64, 0u64, 0u64);

    for i in 0..x.len() {
        for j in i + 1..x.len() {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 && dy == 0.0 {
                continue;
            } else if dx == 0.0 {
                ties_x += 1;
            } else if dy == 0.0 {
                ties_y += 1;
            } else if (dx > 0.0) == (dy > 0.0) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let untied = (concordant + discordant) as f64;
    let denominator = ((untied + ties_x as f64) * (untied + ties_y as f64)).sqrt();
    (concordant as f64 - discordant as f64) / denominator
}
