//! Branch reconciler: brings the checkout tree under `location` in line with
//! the remote branch list.
//!
//! ## Run order
//!
//! 1. Scan `location` for prefixed directories that pass the ignore/allow
//!    filters (the checked-out set).
//! 2. Create the reference branch directory if needed, then prune+fetch and
//!    refresh it, or clone it.
//! 3. List remote branches through the reference working copy.
//! 4. Delete managed orphans; keep unmanaged ones. Skipped entirely when the
//!    checked-out set or the remote list is empty.
//! 5. Clone or refresh every admitted remote branch.
//!
//! [`Reconciler::plan`] computes the same decisions without touching disk or
//! the network.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;

use branchyard_core::{BranchFilter, BranchName, BranchPath, Config};

use crate::error::{io_err, SyncError};
use crate::hooks::Hooks;
use crate::marker;
use crate::vcs::Vcs;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// What a run does (or did) with one branch directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchAction {
    /// No working copy yet: clone and mark managed.
    Checkout,
    /// Working copy exists: reset, checkout, pull.
    Refresh,
    /// Managed orphan: remove recursively.
    Delete,
    /// Orphan without the marker: left alone.
    Kept,
}

impl BranchAction {
    pub fn label(&self) -> &'static str {
        match self {
            BranchAction::Checkout => "checkout",
            BranchAction::Refresh => "refresh",
            BranchAction::Delete => "delete",
            BranchAction::Kept => "kept",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    pub branch: BranchName,
    pub path: BranchPath,
    pub dir: PathBuf,
    pub action: BranchAction,
}

/// A remote branch whose directory name is already taken by another branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub branch: BranchName,
    pub path: BranchPath,
    pub claimed_by: BranchName,
}

/// A directory under `location` that passed the ignore/allow filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedOut {
    pub path: BranchPath,
    pub dir: PathBuf,
}

/// A branch with a working copy after the run, reference excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveBranch {
    pub name: BranchName,
    pub path: BranchPath,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub reference: PlannedAction,
    /// Deletions and keeps first, then checkouts and refreshes in remote order.
    pub actions: Vec<PlannedAction>,
    pub collisions: Vec<Collision>,
    /// `false` when the remote list was empty or unreadable; deletion is
    /// skipped in that case.
    pub remotes_known: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cloned: Vec<BranchName>,
    pub updated: Vec<BranchName>,
    pub deleted: Vec<BranchName>,
    pub kept: Vec<BranchPath>,
    pub collisions: Vec<Collision>,
    /// Non-fatal reset/checkout/pull/prune failures.
    pub step_failures: usize,
    pub active: Vec<ActiveBranch>,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<'a, V: Vcs> {
    config: &'a Config,
    filter: BranchFilter,
    vcs: V,
    hooks: &'a mut dyn Hooks,
}

/// Output of the pure decision step shared by `plan` and `run`.
struct Decisions {
    deletions: Vec<(CheckedOut, bool)>,
    branches: Vec<(BranchName, BranchPath)>,
    collisions: Vec<Collision>,
}

impl<'a, V: Vcs> Reconciler<'a, V> {
    pub fn new(config: &'a Config, vcs: V, hooks: &'a mut dyn Hooks) -> Self {
        Self {
            config,
            filter: config.filter(),
            vcs,
            hooks,
        }
    }

    /// Prefixed directories under `location` that pass the filters. The
    /// reference directory is always excluded. A missing `location` yields
    /// an empty list.
    pub fn checked_out(&self) -> Result<Vec<CheckedOut>, SyncError> {
        let location = &self.config.location;
        let entries = match std::fs::read_dir(location) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(location, e)),
        };
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(location, e))?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(path) = self.config.branch_path_from_dir_name(&name) else {
                continue;
            };
            if !self.filter.admits(path.as_str()) {
                continue;
            }
            found.push(CheckedOut { path, dir });
        }
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    /// Compute what [`Reconciler::run`] would do right now. Reads the
    /// reference working copy's remote-tracking refs as they are; nothing is
    /// pruned, fetched, cloned or removed.
    pub fn plan(&self) -> Result<Plan, SyncError> {
        let checked_out = self.checked_out()?;
        let reference_dir = self.config.reference_dir();
        let reference_has_copy = has_working_copy(&reference_dir);
        let remotes = if reference_has_copy {
            self.remote_branches(&reference_dir)
        } else {
            Vec::new()
        };
        let decisions = self.decide(checked_out, &remotes);

        let mut actions = Vec::new();
        for (co, managed) in decisions.deletions {
            actions.push(PlannedAction {
                branch: BranchName::from(co.path.as_str()),
                path: co.path,
                dir: co.dir,
                action: if managed { BranchAction::Delete } else { BranchAction::Kept },
            });
        }
        for (branch, path) in decisions.branches {
            let dir = self.config.branch_dir(&path);
            let action = if has_working_copy(&dir) {
                BranchAction::Refresh
            } else {
                BranchAction::Checkout
            };
            actions.push(PlannedAction { branch, path, dir, action });
        }

        Ok(Plan {
            reference: PlannedAction {
                branch: self.config.reference_branch.clone(),
                path: self.config.reference_path(),
                dir: reference_dir,
                action: if reference_has_copy {
                    BranchAction::Refresh
                } else {
                    BranchAction::Checkout
                },
            },
            actions,
            collisions: decisions.collisions,
            remotes_known: !remotes.is_empty(),
        })
    }

    /// Reconcile once. Directory-creation, clone and removal failures abort
    /// the run; reset/checkout/pull/prune failures are logged and counted.
    pub fn run(&mut self) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::default();
        let checked_out = self.checked_out()?;
        tracing::debug!("{} checked-out branch directories", checked_out.len());

        let reference_dir = self.config.reference_dir();
        self.ensure_reference(&reference_dir, &mut summary)?;

        let remotes = self.remote_branches(&reference_dir);
        tracing::info!(
            "known remotes: {}",
            remotes.iter().map(BranchName::as_str).collect::<Vec<_>>().join(", ")
        );

        let decisions = self.decide(checked_out, &remotes);
        for collision in &decisions.collisions {
            tracing::warn!(
                "skipping {}: directory '{}' already belongs to {}",
                collision.branch,
                collision.path,
                collision.claimed_by
            );
        }
        summary.collisions = decisions.collisions;

        for (co, managed) in decisions.deletions {
            if managed {
                let name = self.branch_in(&co);
                tracing::info!("delete {name} ({})", co.dir.display());
                std::fs::remove_dir_all(&co.dir).map_err(|e| io_err(&co.dir, e))?;
                self.hooks.after_branch_delete(&name, &co.dir);
                summary.deleted.push(name);
            } else {
                tracing::info!("keep {} (not managed)", co.dir.display());
                summary.kept.push(co.path);
            }
        }

        for (branch, path) in decisions.branches {
            let dir = self.config.branch_dir(&path);
            if has_working_copy(&dir) {
                self.refresh(&branch, &dir, &mut summary);
            } else {
                self.clone_into(&branch, &dir, &mut summary)?;
            }
            summary.active.push(ActiveBranch { name: branch, path, dir });
        }

        Ok(summary)
    }

    // -- steps ---------------------------------------------------------------

    fn ensure_reference(&mut self, dir: &Path, summary: &mut RunSummary) -> Result<(), SyncError> {
        let reference = self.config.reference_branch.clone();
        if !dir.exists() {
            std::fs::create_dir(dir).map_err(|source| SyncError::DirectoryCreate {
                path: dir.to_path_buf(),
                source,
            })?;
            tracing::info!("created {}", dir.display());
        }

        if has_working_copy(dir) {
            if let Err(err) = self.vcs.prune_and_fetch(dir) {
                tracing::warn!("prune/fetch of {reference} failed: {err}");
                summary.step_failures += 1;
            } else {
                tracing::info!("pruned and fetched {reference}");
            }
            self.refresh(&reference, dir, summary);
        } else {
            self.clone_into(&reference, dir, summary)?;
        }
        Ok(())
    }

    fn refresh(&mut self, branch: &BranchName, dir: &Path, summary: &mut RunSummary) {
        tracing::info!("update {branch}");
        self.hooks.before_branch_update(branch, dir);
        summary.step_failures += self.vcs.sync_branch(dir, branch).len();
        self.hooks.after_branch_update(branch, dir);
        summary.updated.push(branch.clone());
    }

    fn clone_into(
        &mut self,
        branch: &BranchName,
        dir: &Path,
        summary: &mut RunSummary,
    ) -> Result<(), SyncError> {
        tracing::info!("clone {branch} into {}", dir.display());
        self.vcs
            .clone_branch(&self.config.repo, branch, dir)
            .map_err(|source| SyncError::Clone {
                branch: branch.to_string(),
                path: dir.to_path_buf(),
                source,
            })?;
        marker::mark_managed(dir)?;
        self.hooks.after_branch_clone(branch, dir);
        summary.cloned.push(branch.clone());
        Ok(())
    }

    fn remote_branches(&self, reference_dir: &Path) -> Vec<BranchName> {
        match self.vcs.list_remote_branches(reference_dir) {
            Ok(remotes) => remotes,
            Err(err) => {
                tracing::warn!("cannot list remote branches, treating as none: {err}");
                Vec::new()
            }
        }
    }

    /// Branch checked out in an orphan directory, else the directory-derived
    /// path.
    fn branch_in(&self, co: &CheckedOut) -> BranchName {
        match self.vcs.current_branch(&co.dir) {
            Ok(Some(name)) => name,
            Ok(None) => BranchName::from(co.path.as_str()),
            Err(err) => {
                tracing::debug!("cannot read branch of {}: {err}", co.dir.display());
                BranchName::from(co.path.as_str())
            }
        }
    }

    fn decide(&self, checked_out: Vec<CheckedOut>, remotes: &[BranchName]) -> Decisions {
        let sanitizer = self.filter.sanitizer();

        let deletions = if checked_out.is_empty() || remotes.is_empty() {
            tracing::debug!("deletion skipped: nothing checked out or no remotes known");
            Vec::new()
        } else {
            let remote_paths: BTreeSet<BranchPath> =
                remotes.iter().map(|r| sanitizer.path_of(r)).collect();
            checked_out
                .into_iter()
                .filter(|co| !self.filter.is_ignored(co.path.as_str()))
                .filter(|co| !remote_paths.contains(&sanitizer.sanitize(co.path.as_str())))
                .map(|co| {
                    let managed = marker::is_managed(&co.dir);
                    (co, managed)
                })
                .collect()
        };

        let mut claimed: HashMap<BranchPath, BranchName> = HashMap::new();
        claimed.insert(
            self.config.reference_path(),
            self.config.reference_branch.clone(),
        );
        let mut branches = Vec::new();
        let mut collisions = Vec::new();
        for remote in remotes {
            if !self.filter.admits(remote.as_str()) {
                continue;
            }
            let path = sanitizer.path_of(remote);
            if path.is_empty() {
                tracing::warn!("skipping {remote}: no usable characters for a directory name");
                continue;
            }
            match claimed.get(&path) {
                Some(owner) if owner == remote => continue,
                Some(owner) => collisions.push(Collision {
                    branch: remote.clone(),
                    path,
                    claimed_by: owner.clone(),
                }),
                None => {
                    claimed.insert(path.clone(), remote.clone());
                    branches.push((remote.clone(), path));
                }
            }
        }

        Decisions {
            deletions,
            branches,
            collisions,
        }
    }
}

fn has_working_copy(dir: &Path) -> bool {
    dir.join(".git").exists()
}
