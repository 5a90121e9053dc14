// crates/thoth-lab/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::inspections::{handle_inspections, InspectionsArgs};
use commands::justifications::{handle_justifications, JustificationsArgs};
use commands::solvers::{handle_solvers, SolversArgs};
use commands::structure::{handle_structure, StructureArgs};

/// Explore adviser, inspection and solver results kept in the result store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Group adviser justifications into message classes and count them
    Justifications(JustificationsArgs),
    /// Durations and batch timings of inspection runs
    Inspections(InspectionsArgs),
    /// Environments, resolved packages and errors of solver runs
    Solvers(SolversArgs),
    /// List the key tree of one result document
    Structure(StructureArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Justifications(args) => handle_justifications(args).await,
        Command::Inspections(args) => handle_inspections(args).await,
        Command::Solvers(args) => handle_solvers(args).await,
        Command::Structure(args) => handle_structure(args).await,
    }
}
