//! Adviser justification pipeline: extract one justification per result document, group
//! identical messages into classes, and count classes over the corpus and over time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use thoth_lab_store::{ResultStore, StoreError};
use tracing::{debug, info, warn};

pub mod aggregate;
pub mod encoding;
pub mod extract;

pub use aggregate::{
    aggregate_per_interval, class_histogram, histogram_frame, AggregateError, ClassCount,
    FrequencyBucket, IntervalAggregation, DEFAULT_INTERVALS, MAX_INTERVALS,
};
pub use encoding::{
    class_label, classify, message_digest, ClassifiedJustifications, ClassifiedRecord,
    MessageClass,
};
pub use extract::{
    analyzer_version, extract_from_result, extract_record, ExtractError, ExtractedJustification,
    ProductPolicy, ERROR_TYPE,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JustificationRecord {
    pub document_id: String,
    pub timestamp: DateTime<Utc>,
    pub analyzer_version: String,
    pub is_error: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub justification_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Only documents produced by this analyzer version are extracted.
    pub analyzer_version: Option<String>,
    /// Stop after this many documents have been fetched.
    pub limit: Option<usize>,
    pub policy: ProductPolicy,
}

#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    Fetch(#[from] StoreError),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

#[derive(Debug)]
pub struct SkippedDocument {
    pub document_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct JustificationBatch {
    pub records: Vec<JustificationRecord>,
    pub skipped: Vec<SkippedDocument>,
    /// Documents ignored because of the analyzer-version filter.
    pub other_versions: usize,
    /// Well-formed documents with neither an error nor a justification.
    pub without_justification: usize,
}

impl JustificationBatch {
    fn skip(&mut self, document_id: &str, reason: SkipReason) {
        warn!(document_id, error = %reason, "skipping adviser document");
        self.skipped.push(SkippedDocument {
            document_id: document_id.to_string(),
            reason,
        });
    }

    fn push_document(&mut self, document_id: &str, document: &Value, options: &CollectOptions) {
        if let Some(wanted) = options.analyzer_version.as_deref() {
            match analyzer_version(document) {
                Ok(version) if version == wanted => {}
                Ok(_) => {
                    self.other_versions += 1;
                    return;
                }
                Err(err) => {
                    self.skip(document_id, err.into());
                    return;
                }
            }
        }

        match extract_record(document_id, document, options.policy) {
            Ok(Some(record)) => self.records.push(record),
            Ok(None) => self.without_justification += 1,
            Err(err) => self.skip(document_id, err.into()),
        }
    }
}

/// Extracts records from already-fetched documents. Malformed documents are logged, kept in
/// `skipped`, and never abort the batch.
pub fn extract_batch<I>(documents: I, options: &CollectOptions) -> JustificationBatch
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut batch = JustificationBatch::default();
    for (document_id, document) in documents.into_iter().take(options.limit.unwrap_or(usize::MAX)) {
        batch.push_document(&document_id, &document, options);
    }
    batch
}

/// Fetches adviser documents one at a time and extracts their justifications. Listing failures
/// are returned; a document that cannot be fetched is skipped like a malformed one.
pub async fn collect_justifications(
    store: &dyn ResultStore,
    options: &CollectOptions,
) -> Result<JustificationBatch, StoreError> {
    let ids = store.list_document_ids().await?;
    let total = options.limit.map_or(ids.len(), |limit| limit.min(ids.len()));
    info!(documents = ids.len(), selected = total, "collecting adviser justifications");

    let mut batch = JustificationBatch::default();
    for (index, document_id) in ids.iter().take(total).enumerate() {
        debug!(document_id = %document_id, "analysis {}/{}", index + 1, total);
        match store.get_document(document_id).await {
            Ok(document) => batch.push_document(document_id, &document, options),
            Err(err) => batch.skip(document_id, err.into()),
        }
    }

    info!(
        records = batch.records.len(),
        skipped = batch.skipped.len(),
        other_versions = batch.other_versions,
        "collected adviser justifications"
    );
    Ok(batch)
}

/// Everything the histogram and heatmap views need for one corpus.
#[derive(Debug)]
pub struct JustificationReport {
    pub classified: ClassifiedJustifications,
    pub histogram: Vec<ClassCount>,
    pub per_interval: IntervalAggregation,
    pub skipped: Vec<SkippedDocument>,
    pub other_versions: usize,
}

impl JustificationReport {
    pub fn from_batch(batch: JustificationBatch, intervals: i64) -> Result<Self, AggregateError> {
        let classified = classify(batch.records);
        let histogram = class_histogram(&classified)?;
        let per_interval = aggregate_per_interval(&classified, intervals)?;

        Ok(Self {
            classified,
            histogram,
            per_interval,
            skipped: batch.skipped,
            other_versions: batch.other_versions,
        })
    }
}

pub async fn justification_report(
    store: &dyn ResultStore,
    options: &CollectOptions,
    intervals: i64,
) -> crate::Result<JustificationReport> {
    let batch = collect_justifications(store, options).await?;
    Ok(JustificationReport::from_batch(batch, intervals)?)
}
