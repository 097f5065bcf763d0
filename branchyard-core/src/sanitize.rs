//! Branch-name → directory-name derivation and branch filtering.
//!
//! Every membership comparison in the reconciler (ignore set, allow set,
//! remote list, checked-out list) goes through [`PathSanitizer::sanitize`] so
//! both sides of a comparison always use the identical transform.

use std::collections::HashSet;

use crate::types::{BranchName, BranchPath};

/// Characters stripped from branch names when none are configured.
pub const DEFAULT_INVALID_CHARS: [char; 3] = ['-', '_', '/'];

/// Strips a configured set of characters from branch names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSanitizer {
    invalid: Vec<char>,
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_INVALID_CHARS.to_vec())
    }
}

impl PathSanitizer {
    pub fn new(invalid: Vec<char>) -> Self {
        Self { invalid }
    }

    /// Remove every invalid character. Deterministic and idempotent.
    pub fn sanitize(&self, name: &str) -> BranchPath {
        BranchPath(name.chars().filter(|c| !self.invalid.contains(c)).collect())
    }

    pub fn path_of(&self, branch: &BranchName) -> BranchPath {
        self.sanitize(&branch.0)
    }
}

/// Ignore/allow filtering of branch names, compared by sanitized path.
///
/// The reference branch is implicitly ignored: the generic branch loop never
/// creates or deletes it.
#[derive(Debug, Clone)]
pub struct BranchFilter {
    sanitizer: PathSanitizer,
    reference: BranchPath,
    ignore: HashSet<BranchPath>,
    only: HashSet<BranchPath>,
}

impl BranchFilter {
    pub fn new(
        sanitizer: PathSanitizer,
        reference: &BranchName,
        ignore: &[BranchName],
        only: &[BranchName],
    ) -> Self {
        let reference_path = sanitizer.path_of(reference);
        let mut ignore: HashSet<BranchPath> = ignore.iter().map(|b| sanitizer.path_of(b)).collect();
        ignore.insert(reference_path.clone());
        let only = only
            .iter()
            .map(|b| sanitizer.path_of(b))
            .filter(|p| *p != reference_path)
            .collect();
        Self {
            sanitizer,
            reference: reference_path,
            ignore,
            only,
        }
    }

    pub fn sanitizer(&self) -> &PathSanitizer {
        &self.sanitizer
    }

    pub fn is_reference(&self, raw: &str) -> bool {
        self.sanitizer.sanitize(raw) == self.reference
    }

    /// `true` when `raw` (a branch name or a directory-derived branch path)
    /// is in the ignore set, the reference branch included.
    pub fn is_ignored(&self, raw: &str) -> bool {
        self.ignore.contains(&self.sanitizer.sanitize(raw))
    }

    /// `true` when no allow set is configured or `raw` is in it.
    pub fn is_allowed(&self, raw: &str) -> bool {
        self.only.is_empty() || self.only.contains(&self.sanitizer.sanitize(raw))
    }

    /// Not ignored and allowed: eligible for the generic branch loop.
    pub fn admits(&self, raw: &str) -> bool {
        !self.is_ignored(raw) && self.is_allowed(raw)
    }
}
