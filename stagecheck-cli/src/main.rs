//! Stagecheck: compare staging and live snapshots of the same records.
//!
//! # Usage
//!
//! ```text
//! stagecheck check --data <dir> [--models <file>] [--scope <id>]... [--entity <type>]...
//!                  [--show <category>]... [--threads N] [--json] [--dump-log]
//! stagecheck models [--models <file>] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, models::ModelsArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stagecheck",
    version,
    about = "Report differences between staging and live copies of scoped records",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile every applicable (scope, entity type) pair of a snapshot.
    Check(CheckArgs),

    /// List checkable entity types and their comparison policies.
    Models(ModelsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => args.run(),
        Commands::Models(args) => args.run(),
    }
}
