use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::encoding::{class_label, ClassifiedJustifications, MessageClass};
use crate::timestamps::utc_datetime_series;

/// Interval count used for an overview heatmap.
pub const DEFAULT_INTERVALS: i64 = 10;

/// Largest interval count accepted; every interval holds a count for every class.
pub const MAX_INTERVALS: i64 = 100_000;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("cannot aggregate an empty set of justification records")]
    EmptyInput,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("record refers to class {0}, which is not in the class table")]
    UnknownClass(usize),
    #[error("interval boundary {0}µs is not a representable timestamp")]
    TimestampOutOfRange(i64),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class_id: usize,
    pub label: String,
    pub example_message: String,
    #[serde(rename = "type")]
    pub justification_type: String,
    pub count: usize,
}

/// Corpus-wide count per class, most frequent first (ties by ascending class id).
pub fn class_histogram(data: &ClassifiedJustifications) -> Result<Vec<ClassCount>, AggregateError> {
    if data.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for record in &data.records {
        *counts.entry(record.class_id).or_insert(0) += 1;
    }

    let mut histogram = counts
        .into_iter()
        .map(|(class_id, count)| {
            let class = data
                .class(class_id)
                .ok_or(AggregateError::UnknownClass(class_id))?;
            Ok(ClassCount {
                class_id,
                label: class.label(),
                example_message: class.example_message.clone(),
                justification_type: class.justification_type.clone(),
                count,
            })
        })
        .collect::<Result<Vec<_>, AggregateError>>()?;

    histogram.sort_by(|a, b| b.count.cmp(&a.count).then(a.class_id.cmp(&b.class_id)));
    Ok(histogram)
}

pub fn histogram_frame(histogram: &[ClassCount]) -> PolarsResult<DataFrame> {
    let class_ids: Vec<u64> = histogram.iter().map(|row| row.class_id as u64).collect();
    let labels: Vec<&str> = histogram.iter().map(|row| row.label.as_str()).collect();
    let messages: Vec<&str> = histogram
        .iter()
        .map(|row| row.example_message.as_str())
        .collect();
    let types: Vec<&str> = histogram
        .iter()
        .map(|row| row.justification_type.as_str())
        .collect();
    let counts: Vec<u64> = histogram.iter().map(|row| row.count as u64).collect();

    DataFrame::new(vec![
        Series::new("class_id".into(), class_ids).into(),
        Series::new("label".into(), labels).into(),
        Series::new("example_message".into(), messages).into(),
        Series::new("type".into(), types).into(),
        Series::new("count".into(), counts).into(),
    ])
}

/// Class counts within one time interval. Every class of the corpus is present, absent ones
/// with a zero count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub counts: BTreeMap<usize, usize>,
}

impl FrequencyBucket {
    pub fn count(&self, class_id: usize) -> usize {
        self.counts.get(&class_id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntervalAggregation {
    pub buckets: Vec<FrequencyBucket>,
    pub classes: Vec<MessageClass>,
}

impl IntervalAggregation {
    /// Counts of one class across all intervals, in time order.
    pub fn class_counts(&self, class_id: usize) -> Vec<usize> {
        self.buckets
            .iter()
            .map(|bucket| bucket.count(class_id))
            .collect()
    }

    /// Heatmap grid: one row per class (class id order), one column per interval.
    pub fn heatmap_values(&self) -> Vec<Vec<usize>> {
        self.classes
            .iter()
            .map(|class| self.class_counts(class.class_id))
            .collect()
    }

    /// Table keyed by `interval_end` with one count column per class label.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let ends: Vec<Option<i64>> = self
            .buckets
            .iter()
            .map(|bucket| Some(bucket.end.timestamp_micros()))
            .collect();

        let mut columns: Vec<Column> = vec![utc_datetime_series("interval_end", ends)?.into()];
        for class in &self.classes {
            let counts: Vec<u64> = self
                .class_counts(class.class_id)
                .into_iter()
                .map(|count| count as u64)
                .collect();
            columns.push(Series::new(class.label().as_str().into(), counts).into());
        }

        DataFrame::new(columns)
    }
}

/// `intervals + 1` boundaries from `begin` to `end` inclusive, computed in integer arithmetic
/// so the first is exactly `begin` and the last exactly `end`.
fn interval_edges(begin: i64, end: i64, intervals: usize) -> Vec<i64> {
    let span = i128::from(end) - i128::from(begin);
    let parts = intervals as i128;
    (0..=intervals)
        .map(|index| (i128::from(begin) + span * index as i128 / parts) as i64)
        .collect()
}

fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>, AggregateError> {
    DateTime::from_timestamp_micros(micros).ok_or(AggregateError::TimestampOutOfRange(micros))
}

/// Splits `[min, max]` of the record timestamps into `intervals` equal-width ranges and counts
/// each class per range. The first range is closed on both ends, the others are `(low, high]`,
/// so a record on a shared boundary belongs to the earlier range and none is dropped.
/// Interval counts above [`MAX_INTERVALS`] are rejected.
pub fn aggregate_per_interval(
    data: &ClassifiedJustifications,
    intervals: i64,
) -> Result<IntervalAggregation, AggregateError> {
    if intervals <= 0 {
        return Err(AggregateError::InvalidArgument(format!(
            "interval count must be positive, got {intervals}"
        )));
    }
    if intervals > MAX_INTERVALS {
        return Err(AggregateError::InvalidArgument(format!(
            "interval count {intervals} exceeds the maximum of {MAX_INTERVALS}"
        )));
    }
    let intervals = usize::try_from(intervals).map_err(|_| {
        AggregateError::InvalidArgument(format!("interval count {intervals} is too large"))
    })?;

    let timestamps: Vec<i64> = data
        .records
        .iter()
        .map(|row| row.record.timestamp.timestamp_micros())
        .collect();
    let (Some(&begin), Some(&end)) = (timestamps.iter().min(), timestamps.iter().max()) else {
        return Err(AggregateError::EmptyInput);
    };

    let edges = interval_edges(begin, end, intervals);
    let upper_edges = &edges[1..];

    let zeroed: BTreeMap<usize, usize> = data
        .classes
        .iter()
        .map(|class| (class.class_id, 0))
        .collect();
    let mut counts = vec![zeroed; intervals];

    for (row, timestamp) in data.records.iter().zip(&timestamps) {
        let index = upper_edges.partition_point(|edge| edge < timestamp);
        *counts[index].entry(row.class_id).or_insert(0) += 1;
    }

    let buckets = counts
        .into_iter()
        .enumerate()
        .map(|(index, counts)| {
            Ok(FrequencyBucket {
                start: micros_to_datetime(edges[index])?,
                end: micros_to_datetime(edges[index + 1])?,
                counts,
            })
        })
        .collect::<Result<Vec<_>, AggregateError>>()?;

    tracing::debug!(
        intervals,
        records = data.len(),
        classes = data.classes.len(),
        "aggregated justifications per interval"
    );

    Ok(IntervalAggregation {
        buckets,
        classes: data.classes.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::interval_edges;

    #[test]
    fn edges_hit_both_ends_exactly() {
        let edges = interval_edges(7, 17, 3);
        assert_eq!(edges.first(), Some(&7));
        assert_eq!(edges.last(), Some(&17));
        assert_eq!(edges.len(), 4);
        assert!(edges.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn degenerate_span_collapses_edges() {
        assert_eq!(interval_edges(5, 5, 4), vec![5; 5]);
    }
}
