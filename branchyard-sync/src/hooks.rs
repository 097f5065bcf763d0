//! Lifecycle hooks fired by the reconciler.
//!
//! Every method has a no-op default, so collaborators implement only the
//! moments they care about. Hooks cannot fail a run; an implementation that
//! hits an error logs it.

use std::path::Path;
use std::process::Command;

use branchyard_core::config::PermissionsConfig;
use branchyard_core::BranchName;

pub trait Hooks {
    /// After reconciliation and report generation finished.
    fn after_run(&mut self) {}

    fn before_branch_update(&mut self, _branch: &BranchName, _dir: &Path) {}

    fn after_branch_update(&mut self, _branch: &BranchName, _dir: &Path) {}

    fn after_branch_clone(&mut self, _branch: &BranchName, _dir: &Path) {}

    /// `dir` no longer exists when this fires.
    fn after_branch_delete(&mut self, _branch: &BranchName, _dir: &Path) {}
}

impl<H: Hooks + ?Sized> Hooks for Box<H> {
    fn after_run(&mut self) {
        (**self).after_run();
    }
    fn before_branch_update(&mut self, branch: &BranchName, dir: &Path) {
        (**self).before_branch_update(branch, dir);
    }
    fn after_branch_update(&mut self, branch: &BranchName, dir: &Path) {
        (**self).after_branch_update(branch, dir);
    }
    fn after_branch_clone(&mut self, branch: &BranchName, dir: &Path) {
        (**self).after_branch_clone(branch, dir);
    }
    fn after_branch_delete(&mut self, branch: &BranchName, dir: &Path) {
        (**self).after_branch_delete(branch, dir);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}

/// Applies `permissions` recursively to every freshly cloned or updated
/// working copy (`chown -R`, `chgrp -R`, `chmod -R`).
#[derive(Debug, Clone)]
pub struct OwnershipHooks {
    permissions: PermissionsConfig,
}

impl OwnershipHooks {
    pub fn new(permissions: PermissionsConfig) -> Self {
        Self { permissions }
    }

    /// The commands [`OwnershipHooks::apply`] runs for `dir`, in order.
    pub fn commands(&self, dir: &Path) -> Vec<(String, Vec<String>)> {
        let target = dir.display().to_string();
        let steps = [
            ("chown", self.permissions.user.as_ref()),
            ("chgrp", self.permissions.group.as_ref()),
            ("chmod", self.permissions.mode.as_ref()),
        ];
        steps
            .into_iter()
            .filter_map(|(program, value)| {
                value
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (program.to_string(), vec!["-R".to_string(), v.clone(), target.clone()]))
            })
            .collect()
    }

    pub fn apply(&self, dir: &Path) {
        for (program, args) in self.commands(dir) {
            tracing::debug!("{program} {}", args.join(" "));
            match Command::new(&program).args(&args).output() {
                Ok(out) if out.status.success() => {}
                Ok(out) => tracing::warn!(
                    "{program} on {} exited with {}: {}",
                    dir.display(),
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
                Err(e) => tracing::warn!("failed to run {program} on {}: {e}", dir.display()),
            }
        }
    }
}

impl Hooks for OwnershipHooks {
    fn after_branch_update(&mut self, _branch: &BranchName, dir: &Path) {
        self.apply(dir);
    }

    fn after_branch_clone(&mut self, _branch: &BranchName, dir: &Path) {
        self.apply(dir);
    }
}
