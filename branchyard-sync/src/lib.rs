//! # branchyard-sync
//!
//! Branch reconciliation and report generation.
//!
//! [`Reconciler`] keeps one working copy per remote branch under the
//! configured location; [`Pipeline`] wraps it with the run lock, the
//! divergence and live reports, and the `after_run` hook. All VCS access goes
//! through the [`Vcs`] trait ([`GitCli`] in production).

pub mod error;
pub mod hooks;
pub mod live;
pub mod lock;
pub mod marker;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod tracker;
pub mod vcs;
pub mod writer;

pub use error::{FetchError, SyncError, VcsError};
pub use hooks::{Hooks, NoopHooks, OwnershipHooks};
pub use lock::RunLock;
pub use pipeline::{Pipeline, RunOutcome};
pub use reconcile::{
    ActiveBranch, BranchAction, CheckedOut, Collision, Plan, PlannedAction, Reconciler, RunSummary,
};
pub use tracker::{DeployedHashSource, HttpDeployedHash, HttpTracker, IssueTracker, TrackerCache};
pub use vcs::{GitCli, LogRange, Vcs};
pub use writer::{write_report, WriteResult};
