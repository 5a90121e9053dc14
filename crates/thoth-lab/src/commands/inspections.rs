use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use thoth_lab_core::inspection::{
    aggregate_inspection_results, batch_time_summary, duration_frame, process_inspection_results,
    ProcessOptions,
};
use thoth_lab_core::statistics::{compare_batches, correlations, evaluate_column};
use tracing::warn;

use super::{maybe_write, new_table, print_frame, StoreArgs};

#[derive(Args, Debug)]
pub struct InspectionsArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Batch identifier to analyze; repeat for several batches
    #[arg(long = "identifier", required = true)]
    pub identifiers: Vec<String>,
    /// Fetch at most this many inspections per batch
    #[arg(long)]
    pub limit: Option<usize>,
    /// Inspections that ran side by side
    #[arg(long, default_value_t = 1)]
    pub n_parallel: u32,
    /// Keep columns whose value never changes
    #[arg(long)]
    pub keep_constant: bool,
    /// Directory to write per-batch durations and the batch summary as parquet
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_inspections(args: InspectionsArgs) -> Result<()> {
    let store = args.store.open().await?;
    let batches = aggregate_inspection_results(store.as_ref(), &args.identifiers, args.limit)
        .await
        .context("failed to fetch inspection results")?;

    let options = ProcessOptions {
        drop_constant: !args.keep_constant,
        ..ProcessOptions::default()
    };

    let mut durations = Vec::new();
    for (identifier, results) in batches {
        if results.is_empty() {
            warn!(identifier = %identifier, "no inspections found for batch");
            continue;
        }

        let processed = process_inspection_results(&results, &options)
            .with_context(|| format!("failed to process batch {identifier}"))?;
        let frame = duration_frame(&processed)
            .with_context(|| format!("batch {identifier} has no duration data"))?;

        let mut table = new_table();
        table.set_header(vec![
            "duration", "count", "mean", "std", "cv %", "median", "q1", "q3", "min", "max",
        ]);
        for column in ["job_duration", "build_duration"] {
            let stats = evaluate_column(&frame, column)?;
            table.add_row(vec![
                column.to_string(),
                stats.count.to_string(),
                format!("{:.3}", stats.mean),
                format!("{:.3}", stats.std),
                format!("{:.2}", stats.cv),
                format!("{:.3}", stats.median),
                format!("{:.3}", stats.q1),
                format!("{:.3}", stats.q3),
                format!("{:.3}", stats.min),
                format!("{:.3}", stats.max),
            ]);
        }
        println!("Batch {identifier} ({} inspections, seconds)", processed.height());
        println!("{table}");

        match correlations(&frame, "job_duration", "build_duration") {
            Ok(found) => println!(
                "job/build duration correlation over {} runs: pearson {:.3}, spearman {:.3}, kendall {:.3}",
                found.pairs, found.pearson, found.spearman, found.kendall
            ),
            Err(err) => warn!(identifier = %identifier, error = %err, "no duration correlation"),
        }

        maybe_write(args.output.as_deref(), &format!("inspection_{identifier}"), &processed)?;
        durations.push((identifier, frame));
    }

    if durations.is_empty() {
        bail!("none of the requested batches had inspections");
    }

    for parameter in ["job_duration", "build_duration"] {
        let comparison = compare_batches(&durations, parameter)?;
        print_frame(&format!("{parameter} across batches (seconds)"), &comparison)?;
        maybe_write(
            args.output.as_deref(),
            &format!("inspection_{parameter}_by_batch"),
            &comparison,
        )?;
    }

    let summary = batch_time_summary(&durations, args.n_parallel)?;
    print_frame("Batch wall-clock time (hours)", &summary)?;
    maybe_write(args.output.as_deref(), "inspection_batch_times", &summary)?;

    Ok(())
}
