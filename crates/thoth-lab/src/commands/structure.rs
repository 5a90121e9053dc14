use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use polars::prelude::*;
use thoth_lab_core::json_structure::{
    extract_structure, filter_structure, KeyFilter, StructureValue,
};

use super::{maybe_write, new_table, StoreArgs};

#[derive(Args, Debug)]
pub struct StructureArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Document to list
    #[arg(long)]
    pub document_id: String,
    /// Only show this key, or the children of this combined key
    #[arg(long, conflicts_with = "depth")]
    pub key: Option<String>,
    /// Only show keys at this depth
    #[arg(long)]
    pub depth: Option<usize>,
    /// Directory to write the listed rows as parquet
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_structure(args: StructureArgs) -> Result<()> {
    let store = args.store.open().await?;
    let document = store
        .get_document(&args.document_id)
        .await
        .with_context(|| format!("failed to fetch {}", args.document_id))?;

    let rows = extract_structure(&document, "document");
    let filter = match (&args.key, args.depth) {
        (Some(key), _) => Some(KeyFilter::Key(key.as_str())),
        (None, Some(depth)) => Some(KeyFilter::Depth(depth)),
        (None, None) => None,
    };
    let selected = match filter {
        Some(filter) => filter_structure(&rows, filter)?,
        None => rows.iter().collect(),
    };

    let values: Vec<String> = selected
        .iter()
        .map(|row| match &row.value {
            StructureValue::Keys(keys) => format!("{{{}}}", keys.join(", ")),
            StructureValue::Leaf(leaf) => leaf.to_string(),
        })
        .collect();

    let mut table = new_table();
    table.set_header(vec!["depth", "upper key", "key", "value"]);
    for (row, value) in selected.iter().zip(&values) {
        table.add_row(vec![
            row.depth.to_string(),
            row.upper_key.clone(),
            row.key.clone(),
            value.clone(),
        ]);
    }
    println!("{table}");

    if args.output.is_some() {
        let frame = df![
            "depth" => selected.iter().map(|row| row.depth as u64).collect::<Vec<_>>(),
            "upper_key" => selected.iter().map(|row| row.upper_key.as_str()).collect::<Vec<_>>(),
            "key" => selected.iter().map(|row| row.key.as_str()).collect::<Vec<_>>(),
            "value" => values,
        ]?;
        let name = format!("structure_{}", args.document_id);
        maybe_write(args.output.as_deref(), &name, &frame)?;
    }

    Ok(())
}
