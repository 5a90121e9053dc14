use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{ResultStore, StoreError};

const JSON_EXTENSION: &str = "json";

/// Result documents kept as one JSON file per document in a single directory.
#[derive(Debug, Clone)]
pub struct LocalResultStore {
    root: PathBuf,
}

impl LocalResultStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::Configuration(format!(
                "there is no dataset at {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, document_id: &str) -> PathBuf {
        let with_extension = self.root.join(format!("{document_id}.{JSON_EXTENSION}"));
        if with_extension.is_file() {
            with_extension
        } else {
            self.root.join(document_id)
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl ResultStore for LocalResultStore {
    async fn list_document_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|err| io_error(&self.root, err))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error(&self.root, err))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let id = match path.extension().and_then(|ext| ext.to_str()) {
                Some(JSON_EXTENSION) => path.file_stem(),
                _ => path.file_name(),
            };
            if let Some(id) = id.and_then(|id| id.to_str()) {
                ids.push(id.to_string());
            }
        }

        ids.sort();
        debug!(count = ids.len(), root = %self.root.display(), "listed local result documents");
        Ok(ids)
    }

    async fn get_document(&self, document_id: &str) -> Result<Value, StoreError> {
        let path = self.document_path(document_id);
        let bytes = tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(document_id.to_string())
            } else {
                io_error(&path, err)
            }
        })?;

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            document_id: document_id.to_string(),
            source,
        })
    }
}
