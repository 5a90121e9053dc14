//! Read access to stored analysis result documents (adviser, inspection and solver runs).
//!
//! Stores are explicit handles: build one with [`connect`] (or the concrete constructors) and
//! pass it to whatever needs documents. Dropping the handle releases the underlying client.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod local;
mod s3;

pub use local::LocalResultStore;
pub use s3::{S3Config, S3ResultStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("i/o error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("document {document_id} is not valid JSON: {source}")]
    Json {
        document_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn from_sdk(err: impl fmt::Display) -> Self {
        Self::Sdk(err.to_string())
    }
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Identifiers of every document under this store's prefix.
    async fn list_document_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn get_document(&self, document_id: &str) -> Result<Value, StoreError>;

    /// Groups document ids by their batch identifier, keeping only the requested identifiers.
    /// Every requested identifier is present in the result, possibly with no ids.
    async fn filter_document_ids(
        &self,
        identifiers: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, StoreError> {
        let ids = self.list_document_ids().await?;
        Ok(group_by_identifier(ids, identifiers))
    }
}

/// Batch identifier embedded in a document id: every `-`-separated segment except the first
/// and the last, so `inspection-tf-cpu-1a2b` belongs to `tf-cpu`.
pub fn batch_identifier(document_id: &str) -> Option<String> {
    let segments: Vec<&str> = document_id.split('-').collect();
    if segments.len() < 3 {
        return None;
    }

    let identifier = segments[1..segments.len() - 1].join("-");
    if identifier.is_empty() {
        None
    } else {
        Some(identifier)
    }
}

pub fn group_by_identifier(
    document_ids: impl IntoIterator<Item = String>,
    identifiers: &[String],
) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = identifiers
        .iter()
        .map(|identifier| (identifier.clone(), Vec::new()))
        .collect();

    for document_id in document_ids {
        let Some(identifier) = batch_identifier(&document_id) else {
            continue;
        };
        if let Some(ids) = grouped.get_mut(&identifier) {
            ids.push(document_id);
        }
    }

    let selected: usize = grouped.values().map(Vec::len).sum();
    tracing::info!(
        selected,
        batches = grouped.len(),
        "filtered document ids by batch identifier"
    );

    grouped
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    S3(S3Config),
    Local(PathBuf),
}

impl StoreConfig {
    /// Reads `THOTH_RESULT_STORE_KIND` (`s3` or `local`, default `s3`) and the matching
    /// backend variables.
    pub fn from_env() -> Result<Self, StoreError> {
        let kind = env::var("THOTH_RESULT_STORE_KIND").unwrap_or_else(|_| "s3".to_string());
        match kind.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StoreConfig::S3(S3Config::from_env()?)),
            "local" => {
                let dir = env::var("THOTH_LOCAL_RESULTS_DIR").map_err(|_| {
                    StoreError::Configuration(
                        "THOTH_LOCAL_RESULTS_DIR must be set for a local result store".into(),
                    )
                })?;
                Ok(StoreConfig::Local(PathBuf::from(dir)))
            }
            other => Err(StoreError::Configuration(format!(
                "unknown result store kind '{other}' (expected 's3' or 'local')"
            ))),
        }
    }

    /// Replaces the S3 key prefix; local stores are addressed by directory only.
    pub fn with_prefix(self, prefix: impl Into<String>) -> Self {
        match self {
            StoreConfig::S3(config) => StoreConfig::S3(S3Config {
                prefix: prefix.into(),
                ..config
            }),
            local @ StoreConfig::Local(_) => local,
        }
    }
}

pub async fn connect(config: StoreConfig) -> Result<Box<dyn ResultStore>, StoreError> {
    match config {
        StoreConfig::S3(config) => Ok(Box::new(S3ResultStore::connect(config).await?)),
        StoreConfig::Local(path) => Ok(Box::new(LocalResultStore::open(path)?)),
    }
}
