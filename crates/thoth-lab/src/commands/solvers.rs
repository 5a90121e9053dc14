use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use thoth_lab_core::solver::{
    collect_solver_reports, extract_errors, extract_metadata, extract_tree, summaries_frame,
};
use tracing::warn;

use super::{maybe_write, new_table, print_frame, StoreArgs};

#[derive(Args, Debug)]
pub struct SolversArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Fetch at most this many solver reports
    #[arg(long)]
    pub limit: Option<usize>,
    /// Directory to write the solver summary as parquet
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_solvers(args: SolversArgs) -> Result<()> {
    let store = args.store.open().await?;
    let reports = collect_solver_reports(store.as_ref(), args.limit)
        .await
        .context("failed to fetch solver reports")?;

    let mut summaries = Vec::with_capacity(reports.len());
    let mut outcomes = new_table();
    outcomes.set_header(vec!["document", "solver", "packages", "errors", "error types"]);

    for report in &reports {
        let summary = match extract_metadata(report) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "skipping solver report");
                continue;
            }
        };
        let packages = extract_tree(report).map(|tree| tree.len()).unwrap_or_else(|err| {
            warn!(document_id = %summary.document_id, error = %err, "unreadable solver tree");
            0
        });
        let errors = extract_errors(report).unwrap_or_else(|err| {
            warn!(document_id = %summary.document_id, error = %err, "unreadable solver errors");
            Vec::new()
        });
        let mut error_types: Vec<&str> = errors.iter().map(|e| e.error_type.as_str()).collect();
        error_types.sort_unstable();
        error_types.dedup();

        outcomes.add_row(vec![
            summary.document_id.clone(),
            summary.solver.clone(),
            packages.to_string(),
            errors.len().to_string(),
            error_types.join(", "),
        ]);
        summaries.push(summary);
    }

    let frame = summaries_frame(&summaries)?;
    print_frame("Solver runs", &frame)?;
    println!("Solver outcomes");
    println!("{outcomes}");
    maybe_write(args.output.as_deref(), "solver_summaries", &frame)?;

    Ok(())
}
