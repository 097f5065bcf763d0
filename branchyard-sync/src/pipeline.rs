//! End-to-end orchestration: lock → reconcile → reports → `after_run`.

use std::io;

use branchyard_core::{BranchName, Config};
use branchyard_renderer::{Renderer, ReportLinks};

use crate::error::SyncError;
use crate::hooks::Hooks;
use crate::live::build_live_log;
use crate::lock::RunLock;
use crate::reconcile::{ActiveBranch, Plan, Reconciler, RunSummary};
use crate::report::build_divergence_report;
use crate::tracker::{DeployedHashSource, IssueTracker, TrackerCache};
use crate::vcs::Vcs;
use crate::writer::{write_report, WriteResult};

/// Outcome of [`Pipeline::run`].
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub reports: Vec<WriteResult>,
}

/// Wires a [`Config`] to a VCS, hooks and the optional HTTP collaborators.
pub struct Pipeline<'a, V: Vcs, H: Hooks> {
    config: &'a Config,
    vcs: V,
    hooks: H,
    tracker: Option<Box<dyn IssueTracker + 'a>>,
    deployed: Option<Box<dyn DeployedHashSource + 'a>>,
}

impl<'a, V: Vcs, H: Hooks> Pipeline<'a, V, H> {
    pub fn new(config: &'a Config, vcs: V, hooks: H) -> Self {
        Self {
            config,
            vcs,
            hooks,
            tracker: None,
            deployed: None,
        }
    }

    pub fn with_tracker(mut self, tracker: Box<dyn IssueTracker + 'a>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_deployed_hash(mut self, source: Box<dyn DeployedHashSource + 'a>) -> Self {
        self.deployed = Some(source);
        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn plan(&mut self) -> Result<Plan, SyncError> {
        Reconciler::new(self.config, &self.vcs, &mut self.hooks).plan()
    }

    /// Full run under the location lock. A missing `location` fails with
    /// [`SyncError::DirectoryCreate`] before anything else is touched. A
    /// live-diff failure is logged and leaves the other results intact.
    pub fn run(&mut self) -> Result<RunOutcome, SyncError> {
        let location = &self.config.location;
        if !location.is_dir() {
            return Err(SyncError::DirectoryCreate {
                path: self.config.reference_dir(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("location {} does not exist", location.display()),
                ),
            });
        }
        let _lock = RunLock::acquire(location)?;

        let summary = Reconciler::new(self.config, &self.vcs, &mut self.hooks).run()?;
        tracing::info!(
            "reconciled: {} cloned, {} updated, {} deleted, {} kept, {} collisions",
            summary.cloned.len(),
            summary.updated.len(),
            summary.deleted.len(),
            summary.kept.len(),
            summary.collisions.len()
        );

        let mut reports = Vec::new();
        let mut cache = self.tracker.as_deref().map(TrackerCache::new);

        if let Some(written) = divergence(self.config, &self.vcs, &summary.active, cache.as_mut())? {
            reports.push(written);
        }
        if self.config.reports.live_diff.is_some() {
            match live(self.config, &self.vcs, self.deployed.as_deref(), cache.as_mut()) {
                Ok(Some(written)) => reports.push(written),
                Ok(None) => {}
                Err(err) => tracing::warn!("live diff skipped: {err}"),
            }
        }

        self.hooks.after_run();
        Ok(RunOutcome { summary, reports })
    }

    /// Divergence report for the branches already checked out, without
    /// reconciling. `None` when `reports.branch_diffs` is not configured.
    pub fn write_divergence_report(&mut self) -> Result<Option<WriteResult>, SyncError> {
        let branches = {
            let reconciler = Reconciler::new(self.config, &self.vcs, &mut self.hooks);
            reconciler.checked_out()?
        };
        let active: Vec<ActiveBranch> = branches
            .into_iter()
            .map(|co| {
                let name = match self.vcs.current_branch(&co.dir) {
                    Ok(Some(name)) => name,
                    _ => BranchName::from(co.path.as_str()),
                };
                ActiveBranch {
                    name,
                    path: co.path,
                    dir: co.dir,
                }
            })
            .collect();
        let mut cache = self.tracker.as_deref().map(TrackerCache::new);
        divergence(self.config, &self.vcs, &active, cache.as_mut())
    }

    /// `None` when `reports.live_diff` is not configured.
    pub fn write_live_report(&mut self) -> Result<Option<WriteResult>, SyncError> {
        let mut cache = self.tracker.as_deref().map(TrackerCache::new);
        live(self.config, &self.vcs, self.deployed.as_deref(), cache.as_mut())
    }
}

fn renderer(config: &Config) -> Result<Renderer, SyncError> {
    Ok(Renderer::with_overrides(config.reports.template_dir.as_deref())?)
}

fn divergence<V: Vcs>(
    config: &Config,
    vcs: &V,
    branches: &[ActiveBranch],
    tracker: Option<&mut TrackerCache<'_>>,
) -> Result<Option<WriteResult>, SyncError> {
    let Some(relative) = config.reports.branch_diffs.as_deref() else {
        return Ok(None);
    };
    let report = build_divergence_report(config, vcs, branches, tracker);
    let html = renderer(config)?.render_branch_diffs(&report, &ReportLinks::from_config(config))?;
    write_report(&config.report_path(relative), &html).map(Some)
}

fn live<V: Vcs>(
    config: &Config,
    vcs: &V,
    source: Option<&dyn DeployedHashSource>,
    tracker: Option<&mut TrackerCache<'_>>,
) -> Result<Option<WriteResult>, SyncError> {
    let Some(relative) = config.reports.live_diff.as_deref() else {
        return Ok(None);
    };
    let source = source.ok_or(SyncError::LiveNotConfigured)?;
    let log = build_live_log(config, vcs, source, tracker)?;
    let html = renderer(config)?.render_live_log(&log, &ReportLinks::from_config(config))?;
    write_report(&config.report_path(relative), &html).map(Some)
}
