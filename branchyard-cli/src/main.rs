//! Branchyard: keep one working copy per remote branch.
//!
//! # Usage
//!
//! ```text
//! branchyard [--config PATH] [-v] [--repo URL] [--location DIR] [--reference NAME] [--prefix P] <command>
//! branchyard run
//! branchyard plan [--json]
//! branchyard report
//! branchyard live
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    live::LiveArgs, plan::PlanArgs, report::ReportArgs, run::RunArgs, GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "branchyard",
    version,
    about = "Mirror every remote branch of a repository into its own directory",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile branch directories, then write the configured reports.
    Run(RunArgs),

    /// Show what a run would clone, refresh and delete, without touching disk.
    Plan(PlanArgs),

    /// Write the branch divergence report for the existing checkouts.
    Report(ReportArgs),

    /// Write the live-diff report for the reference branch.
    Live(LiveArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match cli.command {
        Commands::Run(args) => args.run(&cli.global),
        Commands::Plan(args) => args.run(&cli.global),
        Commands::Report(args) => args.run(&cli.global),
        Commands::Live(args) => args.run(&cli.global),
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `-v`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
