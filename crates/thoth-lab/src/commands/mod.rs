pub mod inspections;
pub mod justifications;
pub mod solvers;
pub mod structure;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use polars::prelude::DataFrame;
use thoth_lab_core::export::write_parquet;
use thoth_lab_store::{connect, LocalResultStore, ResultStore, StoreConfig};

/// Where result documents are read from.
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Read documents from a local directory of JSON files instead of the configured store
    #[arg(long)]
    pub local: Option<PathBuf>,
    /// Object key prefix, overriding THOTH_RESULTS_PREFIX
    #[arg(long)]
    pub prefix: Option<String>,
}

impl StoreArgs {
    pub async fn open(&self) -> Result<Box<dyn ResultStore>> {
        if let Some(dir) = &self.local {
            let store = LocalResultStore::open(dir)
                .with_context(|| format!("failed to open local results at {}", dir.display()))?;
            return Ok(Box::new(store));
        }

        let mut config = StoreConfig::from_env().context("failed to configure result store")?;
        if let Some(prefix) = &self.prefix {
            config = config.with_prefix(prefix.clone());
        }
        connect(config)
            .await
            .context("failed to connect to result store")
    }
}

pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Renders a frame with one table row per frame row.
pub fn frame_table(frame: &DataFrame) -> Result<Table> {
    let mut table = new_table();
    table.set_header(frame.get_column_names_str());

    for index in 0..frame.height() {
        let row = frame
            .get_columns()
            .iter()
            .map(|column| column.get(index).map(|value| value.str_value().into_owned()))
            .collect::<polars::prelude::PolarsResult<Vec<String>>>()?;
        table.add_row(row);
    }

    Ok(table)
}

pub fn print_frame(title: &str, frame: &DataFrame) -> Result<()> {
    println!("{title}");
    println!("{}", frame_table(frame)?);
    Ok(())
}

/// Writes `frame` to `<dir>/<name>.parquet` when an output directory was requested.
pub fn maybe_write(dir: Option<&Path>, name: &str, frame: &DataFrame) -> Result<()> {
    if let Some(dir) = dir {
        write_parquet(frame, &dir.join(format!("{name}.parquet")))?;
    }
    Ok(())
}
