//! Branchyard core library: domain types, configuration, naming rules.
//!
//! - [`types`]: branch newtypes and the report payloads
//! - [`sanitize`]: branch name → directory name, ignore/allow filtering
//! - [`annotate`]: issue-id / commit-hash scraping, repository web paths
//! - [`config`]: YAML config load / validate
//! - [`error`]: [`ConfigError`]

pub mod annotate;
pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

pub use annotate::{parse_annotations, repo_web_path, LineAnnotations};
pub use config::Config;
pub use error::ConfigError;
pub use sanitize::{BranchFilter, PathSanitizer};
pub use types::{
    BranchDivergence, BranchIndexEntry, BranchName, BranchPath, CommitRecord, DivergenceReport,
    IssueDetails, IssueLabel, LiveLog, ReportLine,
};
