//! Domain types shared by the reconciler, the reporter and the renderer.
//!
//! Branch names and branch paths are distinct newtypes: a [`BranchName`] is
//! the opaque remote identifier, a [`BranchPath`] is its filesystem-safe
//! derivation (see [`crate::sanitize`]). Keeping them apart stops a raw name
//! from being compared against a sanitized one by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A remote branch name, case-sensitive and unsanitized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Filesystem-safe form of a branch name with every invalid character removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchPath(pub String);

impl BranchPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchPath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Issue tracker payload
// ---------------------------------------------------------------------------

/// A label attached to a tracker story. Only `kind == "label"` entries are shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLabel {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

/// The subset of a tracker story the reports use.
///
/// `current_state` is the only field the tracker must return; everything else
/// is optional so that sparse responses still enrich the status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub current_state: String,
    #[serde(default)]
    pub estimate: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
}

impl IssueDetails {
    /// Trimmed, lower-cased story state (`"accepted"`, `"started"`, …).
    pub fn status(&self) -> String {
        self.current_state.trim().to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Branch divergence report
// ---------------------------------------------------------------------------

/// One raw `git log` line of a branch's divergence, with the annotations
/// extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    pub text: String,
    pub issue_id: Option<u64>,
    /// Tracker status, present only when the tracker answered.
    pub issue_status: Option<String>,
    pub commit_hash: Option<String>,
}

/// Entry in the report index; every reported branch gets one, even when it
/// has no unmerged commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchIndexEntry {
    pub branch: BranchName,
    pub path: BranchPath,
    pub has_changes: bool,
}

/// Commits on `branch` that the reference branch does not contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDivergence {
    pub branch: BranchName,
    pub path: BranchPath,
    pub lines: Vec<ReportLine>,
}

/// Structured payload of the branch divergence report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub reference: BranchName,
    pub index: Vec<BranchIndexEntry>,
    /// Only branches with at least one unmerged commit.
    pub sections: Vec<BranchDivergence>,
}

// ---------------------------------------------------------------------------
// Live diff
// ---------------------------------------------------------------------------

/// One parsed commit from the reference branch's recent history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: Option<String>,
    pub date: Option<String>,
    pub body: Vec<String>,
    pub issue_id: Option<u64>,
    pub issue: Option<IssueDetails>,
    pub is_live: bool,
    pub is_merge: bool,
}

impl CommitRecord {
    /// Tracker status of the linked story, if any.
    pub fn status(&self) -> Option<String> {
        self.issue
            .as_ref()
            .map(IssueDetails::status)
            .filter(|s| !s.is_empty())
    }
}

/// Recent reference-branch history annotated with the deployed commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveLog {
    pub reference: BranchName,
    pub deployed_hash: String,
    pub lookback: usize,
    /// `false` when the deployed hash is older than the lookback window.
    pub live_found: bool,
    pub records: Vec<CommitRecord>,
}
