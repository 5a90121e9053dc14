use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::DataFrame;

/// Writes a produced table as zstd-compressed parquet, creating parent directories as needed.
pub fn write_parquet(frame: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut clone = frame.clone();
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(&mut clone)
        .context("failed to write parquet")?;

    tracing::info!(path = %path.display(), rows = frame.height(), "wrote parquet output");
    Ok(())
}
