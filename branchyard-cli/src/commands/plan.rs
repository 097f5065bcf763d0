//! `branchyard plan`: preview a run without touching disk.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use branchyard_core::Config;
use branchyard_sync::{BranchAction, Plan, PlannedAction};

use super::{pipeline, GlobalArgs};

/// Arguments for `branchyard plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PlanTableRow {
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "directory")]
    directory: String,
    #[tabled(rename = "action")]
    action: String,
}

impl PlanArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let plan = pipeline(&config)
            .plan()
            .with_context(|| format!("failed to inspect {}", config.location.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }
        print_table(&config, &plan);
        Ok(())
    }
}

fn print_table(config: &Config, plan: &Plan) {
    println!(
        "Branchyard v{} | {} | {}",
        env!("CARGO_PKG_VERSION"),
        config.repo,
        config.location.display(),
    );
    let all: Vec<&PlannedAction> = std::iter::once(&plan.reference)
        .chain(plan.actions.iter())
        .collect();
    let count = |kind: BranchAction| all.iter().filter(|a| a.action == kind).count();
    println!(
        "{} {} checkout  {} {} refresh  {} {} delete  {} {} kept",
        action_indicator(BranchAction::Checkout),
        count(BranchAction::Checkout),
        action_indicator(BranchAction::Refresh),
        count(BranchAction::Refresh),
        action_indicator(BranchAction::Delete),
        count(BranchAction::Delete),
        action_indicator(BranchAction::Kept),
        count(BranchAction::Kept),
    );

    let rows: Vec<PlanTableRow> = all.into_iter().map(table_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    for collision in &plan.collisions {
        println!(
            "{} {} would be skipped: '{}' belongs to {}",
            "!".yellow().bold(),
            collision.branch,
            collision.path,
            collision.claimed_by
        );
    }
    if !plan.remotes_known {
        println!(
            "{}",
            "Remote branches unknown (no reference checkout yet); deletions are skipped.".yellow()
        );
    }
}

fn table_row(action: &PlannedAction) -> PlanTableRow {
    PlanTableRow {
        branch: action.branch.to_string(),
        directory: action.dir.display().to_string(),
        action: action.action.label().to_uppercase(),
    }
}

fn action_indicator(action: BranchAction) -> String {
    match action {
        BranchAction::Checkout => "■".green().bold().to_string(),
        BranchAction::Refresh => "■".blue().bold().to_string(),
        BranchAction::Delete => "■".red().bold().to_string(),
        BranchAction::Kept => "■".yellow().bold().to_string(),
    }
}
