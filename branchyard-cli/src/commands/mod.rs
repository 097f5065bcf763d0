//! Subcommands and the option handling they share.

pub mod live;
pub mod plan;
pub mod report;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use branchyard_core::{config, BranchName, Config};
use branchyard_sync::{
    GitCli, Hooks, HttpDeployedHash, HttpTracker, NoopHooks, OwnershipHooks, Pipeline,
    WriteResult,
};

/// Options accepted before or after any subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Config file (default: ~/.branchyard/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log per-command detail.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override `repo`.
    #[arg(long, global = true, value_name = "URL")]
    pub repo: Option<String>,

    /// Override `location`.
    #[arg(long, global = true, value_name = "DIR")]
    pub location: Option<PathBuf>,

    /// Override `reference_branch`.
    #[arg(long, global = true, value_name = "NAME")]
    pub reference: Option<String>,

    /// Override `prefix`.
    #[arg(long, global = true, value_name = "P")]
    pub prefix: Option<String>,
}

impl GlobalArgs {
    /// Load the config file and apply the command-line overrides on top.
    pub fn load_config(&self) -> Result<Config> {
        let path = match self.config.clone() {
            Some(path) => path,
            None => config::default_path().context("could not locate the default config")?,
        };
        let mut config = config::load_at(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        tracing::debug!("loaded config from {}", path.display());

        if let Some(repo) = &self.repo {
            config.repo = repo.clone();
        }
        if let Some(location) = &self.location {
            config.location = location.clone();
        }
        if let Some(reference) = &self.reference {
            config.reference_branch = BranchName::from(reference.as_str());
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        config
            .normalize()
            .context("invalid configuration after applying command-line options")?;
        Ok(config)
    }
}

/// Pipeline over the `git` CLI with the hooks and HTTP collaborators the
/// config asks for.
pub fn pipeline(config: &Config) -> Pipeline<'_, GitCli, Box<dyn Hooks>> {
    let hooks: Box<dyn Hooks> = match config.permissions.as_ref() {
        Some(permissions) if !permissions.is_empty() => {
            Box::new(OwnershipHooks::new(permissions.clone()))
        }
        _ => Box::new(NoopHooks),
    };

    let mut pipeline = Pipeline::new(config, GitCli::new(config.remote.clone()), hooks);
    if let Some(tracker) = config.tracker.as_ref() {
        pipeline = pipeline.with_tracker(Box::new(HttpTracker::new(tracker)));
    }
    if let Some(url) = config.live.deployed_hash_url.as_ref() {
        pipeline = pipeline.with_deployed_hash(Box::new(HttpDeployedHash::new(url.clone())));
    }
    pipeline
}

pub fn print_write(result: &WriteResult) {
    match result {
        WriteResult::Written { path } => println!("  {}  {}", "✎".green(), path.display()),
        WriteResult::Unchanged { path } => println!("  {}  {}", "·".bright_black(), path.display()),
    }
}
