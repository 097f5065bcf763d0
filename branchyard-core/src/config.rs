//! YAML configuration for a branchyard checkout tree.
//!
//! # File layout
//!
//! ```yaml
//! repo: git@github.com:acme/site.git
//! location: /var/www/branches
//! reference_branch: master
//! prefix: site_
//! ignore: [scratch]
//! only: []
//! domain: branches.example.com
//! reports:
//!   branch_diffs: branches.html
//!   live_diff: live.html
//! live:
//!   deployed_hash_url: https://www.example.com/version.txt
//!   lookback: 30
//! tracker:
//!   token: secret
//! permissions:
//!   user: www-data
//!   group: www-data
//!   mode: "775"
//! ```
//!
//! # API pattern
//!
//! As with the registry helpers this crate grew from, path-taking `_at`
//! functions do the work and the no-arg wrappers resolve `dirs::home_dir()`.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sanitize::{BranchFilter, PathSanitizer, DEFAULT_INVALID_CHARS};
use crate::types::{BranchName, BranchPath};

/// Default bound on the live-diff history walk.
pub const DEFAULT_LIVE_LOOKBACK: usize = 30;
pub const DEFAULT_TRACKER_API_URL: &str = "https://www.pivotaltracker.com/services/v5/stories/";
pub const DEFAULT_TRACKER_STORY_URL: &str = "https://www.pivotaltracker.com/story/show/";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Where generated reports go, relative to the reference branch directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_diffs: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_diff: Option<PathBuf>,
    /// Directory of `.tera` files overriding the embedded templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Page returning the hash of the deployed release as plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_hash_url: Option<String>,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            deployed_hash_url: None,
            lookback: DEFAULT_LIVE_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub token: String,
    #[serde(default = "default_tracker_api_url")]
    pub api_url: String,
    #[serde(default = "default_tracker_story_url")]
    pub story_url: String,
}

/// Ownership and mode applied recursively after each clone or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl PermissionsConfig {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.group.is_none() && self.mode.is_none()
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Clone URL of the repository.
    pub repo: String,
    /// Absolute directory holding every branch checkout.
    pub location: PathBuf,
    #[serde(default = "default_reference_branch")]
    pub reference_branch: BranchName,
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Directory-name prefix: `<location>/<prefix><branch path>`.
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub ignore: Vec<BranchName>,
    #[serde(default)]
    pub only: Vec<BranchName>,
    #[serde(default = "default_invalid_chars")]
    pub invalid_chars: Vec<char>,
    /// Branches are served as `<branch path>.<domain>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionsConfig>,
}

impl Config {
    /// Minimal config with every optional section at its default.
    pub fn new(repo: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            location: location.into(),
            reference_branch: default_reference_branch(),
            remote: default_remote(),
            prefix: String::new(),
            ignore: Vec::new(),
            only: Vec::new(),
            invalid_chars: default_invalid_chars(),
            domain: None,
            reports: ReportsConfig::default(),
            live: LiveConfig::default(),
            tracker: None,
            permissions: None,
        }
    }

    /// Drop the reference branch from the allow set and check every value.
    ///
    /// Called by [`load_at`]; callers that build a `Config` by hand (or apply
    /// CLI overrides) call it again before use.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        let reference = self.reference_branch.clone();
        self.only.retain(|b| *b != reference);
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.repo.trim().is_empty() {
            return Err(ConfigError::Invalid("`repo` must not be empty".into()));
        }
        if !self.location.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "`location` must be absolute, got '{}'",
                self.location.display()
            )));
        }
        if self.reference_branch.0.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "`reference_branch` must not be empty".into(),
            ));
        }
        if self.sanitizer().path_of(&self.reference_branch).is_empty() {
            return Err(ConfigError::Invalid(format!(
                "reference branch '{}' sanitizes to an empty directory name",
                self.reference_branch
            )));
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "`prefix` must be a plain name prefix, got '{}'",
                self.prefix
            )));
        }
        if self.remote.trim().is_empty() {
            return Err(ConfigError::Invalid("`remote` must not be empty".into()));
        }
        if self.live.lookback == 0 {
            return Err(ConfigError::Invalid("`live.lookback` must be at least 1".into()));
        }
        Ok(())
    }

    pub fn sanitizer(&self) -> PathSanitizer {
        PathSanitizer::new(self.invalid_chars.clone())
    }

    pub fn filter(&self) -> BranchFilter {
        BranchFilter::new(
            self.sanitizer(),
            &self.reference_branch,
            &self.ignore,
            &self.only,
        )
    }

    /// `<location>/<prefix><path>`: pure, no I/O.
    pub fn branch_dir(&self, path: &BranchPath) -> PathBuf {
        self.location.join(format!("{}{}", self.prefix, path.0))
    }

    pub fn reference_path(&self) -> BranchPath {
        self.sanitizer().path_of(&self.reference_branch)
    }

    pub fn reference_dir(&self) -> PathBuf {
        self.branch_dir(&self.reference_path())
    }

    /// Branch path encoded in a directory name under `location`, or `None`
    /// when the name lacks the prefix or nothing follows it.
    pub fn branch_path_from_dir_name(&self, dir_name: &str) -> Option<BranchPath> {
        let rest = dir_name.strip_prefix(self.prefix.as_str())?.trim();
        (!rest.is_empty()).then(|| BranchPath::from(rest))
    }

    /// Resolve a report location against the reference branch directory.
    pub fn report_path(&self, relative: &Path) -> PathBuf {
        let relative: PathBuf = relative
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.reference_dir().join(relative)
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.branchyard/config.yaml`: pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".branchyard").join("config.yaml")
}

/// `default_path_at` convenience wrapper.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(default_path_at(&home))
}

/// Load and normalize the config at `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed, `ConfigError::Invalid` if a value is unusable.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: Config = serde_yaml::from_str(&contents).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    config.normalize()?;
    Ok(config)
}

fn default_reference_branch() -> BranchName {
    BranchName::from("master")
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_invalid_chars() -> Vec<char> {
    DEFAULT_INVALID_CHARS.to_vec()
}

fn default_lookback() -> usize {
    DEFAULT_LIVE_LOOKBACK
}

fn default_tracker_api_url() -> String {
    DEFAULT_TRACKER_API_URL.to_string()
}

fn default_tracker_story_url() -> String {
    DEFAULT_TRACKER_STORY_URL.to_string()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
