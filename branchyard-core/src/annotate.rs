//! Pure parsing helpers for commit-log text and repository URLs.
//!
//! Nothing here touches the VCS or the network, so every pattern can be unit
//! tested from literal strings.

use std::sync::OnceLock;

use regex::Regex;

/// Annotations scraped from a single `git log` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineAnnotations {
    /// Tracker story id: 6–10 digits following a `#`.
    pub issue_id: Option<u64>,
    /// 40-hex commit hash following the literal token `commit`.
    pub commit_hash: Option<String>,
}

fn issue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#([0-9]{6,10})").expect("issue id pattern"))
}

fn commit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"commit ([0-9a-f]{40})").expect("commit hash pattern"))
}

/// Extract the first issue id and commit hash from `line`.
pub fn parse_annotations(line: &str) -> LineAnnotations {
    LineAnnotations {
        issue_id: parse_issue_id(line),
        commit_hash: commit_re()
            .captures(line)
            .map(|caps| caps[1].to_string()),
    }
}

/// First `#NNNNNN` story reference in `line`, if any.
pub fn parse_issue_id(line: &str) -> Option<u64> {
    issue_re()
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
        .filter(|id| *id > 0)
}

/// Resolve `/<owner>/<repo>` for repositories hosted on GitHub.
///
/// Accepts `https://github.com/<owner>/<repo>.git` and
/// `git@github.com:<owner>/<repo>.git`; anything else yields `None`.
pub fn repo_web_path(repo_url: &str) -> Option<String> {
    let trimmed = repo_url.trim();
    if let Some(rest) = trimmed.strip_prefix("https://github.com") {
        let path = rest.strip_suffix(".git")?;
        return (!path.is_empty()).then(|| path.to_string());
    }
    if let Some(rest) = trimmed.strip_prefix("git@github.com:") {
        let path = rest.strip_suffix(".git")?;
        return (!path.is_empty()).then(|| format!("/{path}"));
    }
    None
}
