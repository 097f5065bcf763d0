//! Version-control adapter.
//!
//! [`Vcs`] is the narrow surface the reconciler and the reporters drive;
//! [`GitCli`] implements it by shelling out to `git`. Nothing else in the
//! workspace starts a VCS process.

use std::path::Path;
use std::process::{Command, Output};

use branchyard_core::BranchName;

use crate::error::VcsError;

/// Which commits [`Vcs::commit_log`] should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRange<'a> {
    /// Commits reachable from `branch` but not from the remote-tracking
    /// reference branch, newest first, merges excluded.
    Divergence {
        branch: &'a BranchName,
        reference: &'a BranchName,
    },
    /// The last `limit` commits of the checked-out branch, merges included.
    Recent { limit: usize },
}

pub trait Vcs {
    /// Remote branches known to the working copy at `reference_dir`, with the
    /// remote prefix stripped and symbolic entries (`HEAD -> master`) dropped.
    fn list_remote_branches(&self, reference_dir: &Path) -> Result<Vec<BranchName>, VcsError>;

    /// Clone the single named branch into `dest`.
    fn clone_branch(&self, repo: &str, branch: &BranchName, dest: &Path) -> Result<(), VcsError>;

    fn hard_reset(&self, dir: &Path) -> Result<(), VcsError>;

    fn checkout(&self, dir: &Path, branch: &BranchName) -> Result<(), VcsError>;

    fn pull(&self, dir: &Path) -> Result<(), VcsError>;

    /// Drop stale remote-tracking refs, then fetch.
    fn prune_and_fetch(&self, dir: &Path) -> Result<(), VcsError>;

    fn commit_log(&self, dir: &Path, range: LogRange<'_>) -> Result<Vec<String>, VcsError>;

    /// Branch checked out in `dir`; `None` on a detached HEAD.
    fn current_branch(&self, dir: &Path) -> Result<Option<BranchName>, VcsError>;

    /// Reset, checkout and pull in that order. Every step runs even when an
    /// earlier one failed; the failures are logged and returned.
    fn sync_branch(&self, dir: &Path, branch: &BranchName) -> Vec<VcsError> {
        let steps = [
            ("reset", self.hard_reset(dir)),
            ("checkout", self.checkout(dir, branch)),
            ("pull", self.pull(dir)),
        ];
        let mut failures = Vec::new();
        for (step, result) in steps {
            if let Err(err) = result {
                tracing::warn!("{step} of {branch} in {} failed: {err}", dir.display());
                failures.push(err);
            }
        }
        failures
    }
}

impl<T: Vcs + ?Sized> Vcs for &T {
    fn list_remote_branches(&self, reference_dir: &Path) -> Result<Vec<BranchName>, VcsError> {
        (**self).list_remote_branches(reference_dir)
    }
    fn clone_branch(&self, repo: &str, branch: &BranchName, dest: &Path) -> Result<(), VcsError> {
        (**self).clone_branch(repo, branch, dest)
    }
    fn hard_reset(&self, dir: &Path) -> Result<(), VcsError> {
        (**self).hard_reset(dir)
    }
    fn checkout(&self, dir: &Path, branch: &BranchName) -> Result<(), VcsError> {
        (**self).checkout(dir, branch)
    }
    fn pull(&self, dir: &Path) -> Result<(), VcsError> {
        (**self).pull(dir)
    }
    fn prune_and_fetch(&self, dir: &Path) -> Result<(), VcsError> {
        (**self).prune_and_fetch(dir)
    }
    fn commit_log(&self, dir: &Path, range: LogRange<'_>) -> Result<Vec<String>, VcsError> {
        (**self).commit_log(dir, range)
    }
    fn current_branch(&self, dir: &Path) -> Result<Option<BranchName>, VcsError> {
        (**self).current_branch(dir)
    }
}

/// Parse `git branch -r` output.
pub fn parse_remote_branches(raw: &str, remote: &str) -> Vec<BranchName> {
    let prefix = format!("{remote}/");
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.strip_prefix(prefix.as_str()).unwrap_or(line))
        .filter(|name| !name.chars().any(char::is_whitespace))
        .map(BranchName::from)
        .collect()
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

/// [`Vcs`] backed by the `git` executable on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCli {
    remote: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("origin")
    }
}

impl GitCli {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }

    fn run_in(&self, dir: &Path, args: &[&str]) -> Result<String, VcsError> {
        let mut command = Command::new("git");
        command.arg("-C").arg(dir).args(args);
        let label = format!("git -C {} {}", dir.display(), args.join(" "));
        run(command, label)
    }
}

fn run(mut command: Command, label: String) -> Result<String, VcsError> {
    tracing::debug!("{label}");
    let output: Output = command.output().map_err(|source| VcsError::Spawn {
        command: label.clone(),
        source,
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let captured = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        return Err(VcsError::Command {
            command: label,
            status: output.status.to_string(),
            output: captured,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl Vcs for GitCli {
    fn list_remote_branches(&self, reference_dir: &Path) -> Result<Vec<BranchName>, VcsError> {
        let raw = self.run_in(reference_dir, &["branch", "-r"])?;
        Ok(parse_remote_branches(&raw, &self.remote))
    }

    fn clone_branch(&self, repo: &str, branch: &BranchName, dest: &Path) -> Result<(), VcsError> {
        let mut command = Command::new("git");
        command
            .arg("clone")
            .arg(format!("--branch={branch}"))
            .arg(format!("--origin={}", self.remote))
            .arg(repo)
            .arg(dest);
        let label = format!("git clone --branch={branch} {repo} {}", dest.display());
        run(command, label).map(|_| ())
    }

    fn hard_reset(&self, dir: &Path) -> Result<(), VcsError> {
        self.run_in(dir, &["reset", "--hard"]).map(|_| ())
    }

    fn checkout(&self, dir: &Path, branch: &BranchName) -> Result<(), VcsError> {
        self.run_in(dir, &["checkout", branch.as_str()]).map(|_| ())
    }

    fn pull(&self, dir: &Path) -> Result<(), VcsError> {
        self.run_in(dir, &["pull"]).map(|_| ())
    }

    fn prune_and_fetch(&self, dir: &Path) -> Result<(), VcsError> {
        self.run_in(dir, &["remote", "prune", &self.remote])?;
        self.run_in(dir, &["fetch", &self.remote]).map(|_| ())
    }

    fn commit_log(&self, dir: &Path, range: LogRange<'_>) -> Result<Vec<String>, VcsError> {
        let raw = match range {
            LogRange::Divergence { branch, reference } => {
                let exclude = format!("^{}/{}", self.remote, reference);
                self.run_in(
                    dir,
                    &["log", "--no-color", branch.as_str(), &exclude, "--no-merges", "--"],
                )?
            }
            LogRange::Recent { limit } => {
                let count = format!("-{limit}");
                self.run_in(dir, &["log", "--no-color", "--no-decorate", &count])?
            }
        };
        Ok(raw.lines().map(str::to_string).collect())
    }

    fn current_branch(&self, dir: &Path) -> Result<Option<BranchName>, VcsError> {
        let raw = self.run_in(dir, &["branch", "--show-current"])?;
        let name = raw.trim();
        Ok((!name.is_empty()).then(|| BranchName::from(name)))
    }
}
