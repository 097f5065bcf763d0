//! `branchyard run`: reconcile, then write the configured reports.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use branchyard_sync::RunOutcome;

use super::{pipeline, print_write, GlobalArgs};

/// Arguments for `branchyard run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Print the run summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let outcome = pipeline(&config)
            .run()
            .with_context(|| format!("reconciliation of {} failed", config.location.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome.summary)
                    .context("failed to serialize run summary")?
            );
            return Ok(());
        }
        print_outcome(&outcome);
        Ok(())
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let summary = &outcome.summary;
    println!(
        "{} {} cloned, {} updated, {} deleted, {} kept",
        "✓".green(),
        summary.cloned.len(),
        summary.updated.len(),
        summary.deleted.len(),
        summary.kept.len(),
    );
    for branch in &summary.cloned {
        println!("  {}  {branch}", "+".green());
    }
    for branch in &summary.deleted {
        println!("  {}  {branch}", "-".red());
    }
    for path in &summary.kept {
        println!("  {}  {path} (not managed, left alone)", "?".yellow());
    }
    for collision in &summary.collisions {
        println!(
            "  {}  {} skipped: '{}' belongs to {}",
            "!".yellow(),
            collision.branch,
            collision.path,
            collision.claimed_by
        );
    }
    if summary.step_failures > 0 {
        println!(
            "{}",
            format!(
                "{} update step(s) failed; see the log, the next run retries",
                summary.step_failures
            )
            .yellow()
        );
    }
    if !outcome.reports.is_empty() {
        println!("Reports:");
        outcome.reports.iter().for_each(print_write);
    }
}
