use std::collections::{BTreeMap, BTreeSet, HashMap};

use polars::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::JustificationRecord;
use crate::timestamps::utc_datetime_series;

/// Lower-case hex SHA-256 of the message's UTF-8 bytes.
pub fn message_digest(message: &str) -> String {
    format!("{:x}", Sha256::digest(message.as_bytes()))
}

pub fn class_label(class_id: usize) -> String {
    format!("type-{class_id}")
}

/// All records whose messages are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageClass {
    pub class_id: usize,
    pub content_hash: String,
    pub example_message: String,
    #[serde(rename = "type")]
    pub justification_type: String,
    pub occurrences: usize,
}

impl MessageClass {
    pub fn label(&self) -> String {
        class_label(self.class_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: JustificationRecord,
    pub content_hash: String,
    pub class_id: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ClassifiedJustifications {
    /// Input records in their original order.
    pub records: Vec<ClassifiedRecord>,
    /// Distinct classes ordered by `class_id`, so `classes[id].class_id == id`.
    pub classes: Vec<MessageClass>,
}

/// Groups records by message digest and numbers the distinct digests `0..K` in ascending hex
/// order. The numbering depends only on the set of distinct messages, never on record order.
pub fn classify(records: Vec<JustificationRecord>) -> ClassifiedJustifications {
    let digests: Vec<String> = records
        .iter()
        .map(|record| message_digest(&record.message))
        .collect();

    let class_ids: HashMap<String, usize> = digests
        .iter()
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .enumerate()
        .map(|(class_id, digest)| (digest, class_id))
        .collect();

    let mut classes: BTreeMap<usize, MessageClass> = BTreeMap::new();
    let mut classified = Vec::with_capacity(records.len());

    for (record, content_hash) in records.into_iter().zip(digests) {
        let class_id = class_ids[&content_hash];
        classes
            .entry(class_id)
            .and_modify(|class| class.occurrences += 1)
            .or_insert_with(|| MessageClass {
                class_id,
                content_hash: content_hash.clone(),
                example_message: record.message.clone(),
                justification_type: record.justification_type.clone(),
                occurrences: 1,
            });
        classified.push(ClassifiedRecord {
            record,
            content_hash,
            class_id,
        });
    }

    ClassifiedJustifications {
        records: classified,
        classes: classes.into_values().collect(),
    }
}

impl ClassifiedJustifications {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn class(&self, class_id: usize) -> Option<&MessageClass> {
        self.classes.get(class_id)
    }

    pub fn class_ids(&self) -> Vec<usize> {
        self.records.iter().map(|record| record.class_id).collect()
    }

    /// One row per record with its digest and class id.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let records = &self.records;

        let document_ids: Vec<&str> = records
            .iter()
            .map(|row| row.record.document_id.as_str())
            .collect();
        let datetimes: Vec<Option<i64>> = records
            .iter()
            .map(|row| Some(row.record.timestamp.timestamp_micros()))
            .collect();
        let versions: Vec<&str> = records
            .iter()
            .map(|row| row.record.analyzer_version.as_str())
            .collect();
        let errors: Vec<bool> = records.iter().map(|row| row.record.is_error).collect();
        let messages: Vec<&str> = records
            .iter()
            .map(|row| row.record.message.as_str())
            .collect();
        let types: Vec<&str> = records
            .iter()
            .map(|row| row.record.justification_type.as_str())
            .collect();
        let hashes: Vec<&str> = records.iter().map(|row| row.content_hash.as_str()).collect();
        let class_ids: Vec<u64> = records.iter().map(|row| row.class_id as u64).collect();

        DataFrame::new(vec![
            Series::new("document_id".into(), document_ids).into(),
            utc_datetime_series("datetime", datetimes)?.into(),
            Series::new("analyzer_version".into(), versions).into(),
            Series::new("error".into(), errors).into(),
            Series::new("message".into(), messages).into(),
            Series::new("type".into(), types).into(),
            Series::new("content_hash".into(), hashes).into(),
            Series::new("class_id".into(), class_ids).into(),
        ])
    }
}
