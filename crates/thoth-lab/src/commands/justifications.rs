use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use thoth_lab_core::adviser::{
    histogram_frame, justification_report, CollectOptions, ProductPolicy, DEFAULT_INTERVALS,
};
use tracing::info;

use super::{maybe_write, new_table, print_frame, StoreArgs};

#[derive(Args, Debug)]
pub struct JustificationsArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Only consider documents produced by this analyzer version
    #[arg(long)]
    pub analyzer_version: Option<String>,
    /// Stop after this many documents
    #[arg(long)]
    pub limit: Option<usize>,
    /// Number of time intervals for the per-interval counts
    #[arg(long, default_value_t = DEFAULT_INTERVALS, allow_negative_numbers = true)]
    pub intervals: i64,
    /// Use the first product carrying justifications instead of the last one
    #[arg(long)]
    pub first_match: bool,
    /// Directory to write records, histogram and per-interval counts as parquet
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_justifications(args: JustificationsArgs) -> Result<()> {
    let store = args.store.open().await?;
    let options = CollectOptions {
        analyzer_version: args.analyzer_version,
        limit: args.limit,
        policy: if args.first_match {
            ProductPolicy::FirstMatch
        } else {
            ProductPolicy::LastMatch
        },
    };

    let report = justification_report(store.as_ref(), &options, args.intervals)
        .await
        .context("failed to build justification report")?;
    info!(
        records = report.classified.len(),
        classes = report.classified.classes.len(),
        "justification report ready"
    );

    let mut classes = new_table();
    classes.set_header(vec!["label", "count", "type", "example message"]);
    for row in &report.histogram {
        classes.add_row(vec![
            row.label.clone(),
            row.count.to_string(),
            row.justification_type.clone(),
            row.example_message.clone(),
        ]);
    }
    println!("Justification classes");
    println!("{classes}");

    let per_interval = report.per_interval.to_frame()?;
    print_frame("Justifications per interval", &per_interval)?;

    if !report.skipped.is_empty() || report.other_versions > 0 {
        println!(
            "Skipped {} malformed documents and {} documents from other analyzer versions.",
            report.skipped.len(),
            report.other_versions
        );
    }

    let output = args.output.as_deref();
    maybe_write(output, "justification_records", &report.classified.to_frame()?)?;
    maybe_write(output, "justification_histogram", &histogram_frame(&report.histogram)?)?;
    maybe_write(output, "justification_intervals", &per_interval)?;

    Ok(())
}
