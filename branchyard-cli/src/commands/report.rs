//! `branchyard report`: divergence report for the existing checkouts.

use anyhow::{bail, Context, Result};
use clap::Args;

use super::{pipeline, print_write, GlobalArgs};

/// Arguments for `branchyard report`.
#[derive(Args, Debug)]
pub struct ReportArgs {}

impl ReportArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let written = pipeline(&config)
            .write_divergence_report()
            .context("failed to write the branch divergence report")?;
        match written {
            Some(result) => print_write(&result),
            None => bail!("no report configured; set reports.branch_diffs"),
        }
        Ok(())
    }
}
