//! `branchyard live`: live-diff report for the reference branch.

use anyhow::{bail, Context, Result};
use clap::Args;

use super::{pipeline, print_write, GlobalArgs};

/// Arguments for `branchyard live`.
#[derive(Args, Debug)]
pub struct LiveArgs {}

impl LiveArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let written = pipeline(&config)
            .write_live_report()
            .context("failed to write the live-diff report")?;
        match written {
            Some(result) => print_write(&result),
            None => bail!("no report configured; set reports.live_diff"),
        }
        Ok(())
    }
}
