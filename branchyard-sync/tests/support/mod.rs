#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use branchyard_core::{BranchName, Config, IssueDetails};
use branchyard_sync::{
    DeployedHashSource, FetchError, Hooks, IssueTracker, LogRange, Vcs, VcsError,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config_at(location: &Path) -> Config {
    let mut config = Config::new("git@github.com:acme/site.git", location);
    config.normalize().expect("valid test config");
    config
}

pub fn names(list: &[&str]) -> Vec<BranchName> {
    list.iter().map(|s| BranchName::from(*s)).collect()
}

fn failure(command: &str) -> VcsError {
    VcsError::Command {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        output: "simulated".to_string(),
    }
}

/// In-memory VCS: clones create `<dest>/.git`, everything else is recorded.
#[derive(Default)]
pub struct FakeVcs {
    pub remotes: RefCell<Vec<BranchName>>,
    pub list_fails: RefCell<bool>,
    pub fail_clone_of: RefCell<Option<String>>,
    pub fail_reset: RefCell<bool>,
    pub divergence: RefCell<HashMap<String, Vec<String>>>,
    pub recent: RefCell<Vec<String>>,
    pub checked_out: RefCell<HashMap<PathBuf, BranchName>>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeVcs {
    pub fn with_remotes(list: &[&str]) -> Self {
        let fake = Self::default();
        fake.set_remotes(list);
        fake
    }

    pub fn set_remotes(&self, list: &[&str]) {
        *self.remotes.borrow_mut() = names(list);
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Vcs for FakeVcs {
    fn list_remote_branches(&self, _reference_dir: &Path) -> Result<Vec<BranchName>, VcsError> {
        self.record("list".to_string());
        if *self.list_fails.borrow() {
            return Err(failure("git branch -r"));
        }
        Ok(self.remotes.borrow().clone())
    }

    fn clone_branch(&self, _repo: &str, branch: &BranchName, dest: &Path) -> Result<(), VcsError> {
        self.record(format!("clone {branch}"));
        if self.fail_clone_of.borrow().as_deref() == Some(branch.as_str()) {
            return Err(failure("git clone"));
        }
        std::fs::create_dir_all(dest.join(".git")).map_err(|source| VcsError::Spawn {
            command: "fake clone".to_string(),
            source,
        })?;
        self.checked_out
            .borrow_mut()
            .insert(dest.to_path_buf(), branch.clone());
        Ok(())
    }

    fn hard_reset(&self, dir: &Path) -> Result<(), VcsError> {
        self.record(format!("reset {}", dir.display()));
        if *self.fail_reset.borrow() {
            return Err(failure("git reset --hard"));
        }
        Ok(())
    }

    fn checkout(&self, _dir: &Path, branch: &BranchName) -> Result<(), VcsError> {
        self.record(format!("checkout {branch}"));
        Ok(())
    }

    fn pull(&self, dir: &Path) -> Result<(), VcsError> {
        self.record(format!("pull {}", dir.display()));
        Ok(())
    }

    fn prune_and_fetch(&self, dir: &Path) -> Result<(), VcsError> {
        self.record(format!("prune {}", dir.display()));
        Ok(())
    }

    fn commit_log(&self, _dir: &Path, range: LogRange<'_>) -> Result<Vec<String>, VcsError> {
        match range {
            LogRange::Divergence { branch, .. } => Ok(self
                .divergence
                .borrow()
                .get(branch.as_str())
                .cloned()
                .unwrap_or_default()),
            LogRange::Recent { limit } => {
                Ok(self.recent.borrow().iter().take(limit * 8).cloned().collect())
            }
        }
    }

    fn current_branch(&self, dir: &Path) -> Result<Option<BranchName>, VcsError> {
        Ok(self.checked_out.borrow().get(dir).cloned())
    }
}

/// Records every hook invocation as `"<event> <branch>"`.
#[derive(Default)]
pub struct RecordingHooks {
    pub events: Vec<String>,
}

impl RecordingHooks {
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(event)).count()
    }
}

impl Hooks for RecordingHooks {
    fn after_run(&mut self) {
        self.events.push("after_run".to_string());
    }
    fn before_branch_update(&mut self, branch: &BranchName, _dir: &Path) {
        self.events.push(format!("before_update {branch}"));
    }
    fn after_branch_update(&mut self, branch: &BranchName, _dir: &Path) {
        self.events.push(format!("after_update {branch}"));
    }
    fn after_branch_clone(&mut self, branch: &BranchName, _dir: &Path) {
        self.events.push(format!("after_clone {branch}"));
    }
    fn after_branch_delete(&mut self, branch: &BranchName, _dir: &Path) {
        self.events.push(format!("after_delete {branch}"));
    }
}

pub struct FixedHash(pub Option<String>);

impl DeployedHashSource for FixedHash {
    fn deployed_hash(&self) -> Result<String, FetchError> {
        self.0.clone().ok_or_else(|| FetchError::Empty {
            url: "test://deployed".to_string(),
        })
    }
}

pub struct StaticTracker(pub HashMap<u64, IssueDetails>);

impl IssueTracker for StaticTracker {
    fn issue(&self, id: u64) -> Result<IssueDetails, FetchError> {
        self.0.get(&id).cloned().ok_or_else(|| FetchError::Http {
            url: format!("test://stories/{id}"),
            message: "404".to_string(),
        })
    }
}

/// A directory that looks like a previously cloned, managed branch.
pub fn managed_checkout(location: &Path, dir_name: &str) -> PathBuf {
    let dir = location.join(dir_name);
    std::fs::create_dir_all(dir.join(".git")).unwrap();
    std::fs::write(dir.join(branchyard_sync::marker::MANAGED_MARKER), b"").unwrap();
    dir
}
