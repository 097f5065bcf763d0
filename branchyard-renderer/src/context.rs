//! Template contexts: serializable rendering payloads built from the core
//! report types.
//!
//! Links are resolved here rather than in the templates so overrides only
//! have to deal with markup.

use serde::{Deserialize, Serialize};

use branchyard_core::{
    repo_web_path, BranchPath, CommitRecord, Config, DivergenceReport, LiveLog, ReportLine,
};

use crate::error::RenderError;

/// Number of hash characters shown in the live log.
const SHORT_HASH_LEN: usize = 10;

/// Tracker states that have a dedicated CSS class in the live log.
const STATUS_CLASSES: &[&str] = &[
    "accepted",
    "rejected",
    "delivered",
    "finished",
    "started",
    "unscheduled",
];

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// External URLs the reports may point at. Every field is optional; a missing
/// base simply renders plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLinks {
    /// e.g. `https://github.com/acme/site`
    pub repo_web_url: Option<String>,
    /// Story URL prefix; the issue id is appended.
    pub story_url: Option<String>,
    /// Branch sites live at `http://<branch path>.<domain>/`.
    pub domain: Option<String>,
}

impl ReportLinks {
    pub fn from_config(config: &Config) -> Self {
        ReportLinks {
            repo_web_url: repo_web_path(&config.repo).map(|p| format!("https://github.com{p}")),
            story_url: config.tracker.as_ref().map(|t| t.story_url.clone()),
            domain: config.domain.clone(),
        }
    }

    pub fn commit_url(&self, hash: &str) -> Option<String> {
        self.repo_web_url
            .as_ref()
            .map(|base| format!("{base}/commit/{hash}"))
    }

    pub fn tree_url(&self, branch: &str) -> Option<String> {
        self.repo_web_url
            .as_ref()
            .map(|base| format!("{base}/tree/{branch}"))
    }

    pub fn story_url(&self, id: u64) -> Option<String> {
        self.story_url.as_ref().map(|base| format!("{base}{id}"))
    }

    pub fn site_url(&self, path: &BranchPath) -> Option<String> {
        self.domain
            .as_ref()
            .map(|domain| format!("http://{}.{domain}/", path.0))
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// A run of text, optionally hyperlinked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCtx {
    pub text: String,
    pub href: Option<String>,
    /// Link target window name.
    pub target: Option<String>,
}

impl SegmentCtx {
    fn plain(text: &str) -> Self {
        SegmentCtx {
            text: text.to_string(),
            href: None,
            target: None,
        }
    }
}

/// Page metadata. Holds nothing time-dependent: identical input must render
/// identical bytes so an unchanged report is not rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub branchyard_version: String,
}

impl MetaCtx {
    fn new() -> Self {
        MetaCtx {
            branchyard_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Split `text` into segments, linking the first occurrence of the issue id
/// (the digits after `#`) and of the commit hash.
pub fn link_segments(
    text: &str,
    issue_id: Option<u64>,
    commit_hash: Option<&str>,
    links: &ReportLinks,
) -> Vec<SegmentCtx> {
    let mut spans: Vec<(usize, usize, String, &'static str)> = Vec::new();

    if let Some(id) = issue_id {
        let needle = format!("#{id}");
        if let (Some(pos), Some(href)) = (text.find(&needle), links.story_url(id)) {
            spans.push((pos + 1, pos + needle.len(), href, "story"));
        }
    }
    if let Some(hash) = commit_hash {
        if let (Some(pos), Some(href)) = (text.find(hash), links.commit_url(hash)) {
            spans.push((pos, pos + hash.len(), href, "commit"));
        }
    }
    spans.sort_by_key(|(start, ..)| *start);

    let mut segments = Vec::new();
    let mut cursor = 0;
    for (start, end, href, target) in spans {
        if start < cursor {
            continue;
        }
        if start > cursor {
            segments.push(SegmentCtx::plain(&text[cursor..start]));
        }
        segments.push(SegmentCtx {
            text: text[start..end].to_string(),
            href: Some(href),
            target: Some(target.to_string()),
        });
        cursor = end;
    }
    if cursor < text.len() || segments.is_empty() {
        segments.push(SegmentCtx::plain(&text[cursor..]));
    }
    segments
}

// ---------------------------------------------------------------------------
// Branch divergence report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRowCtx {
    pub branch: String,
    pub anchor: String,
    pub site_url: Option<String>,
    pub has_changes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCtx {
    /// Tracker status shown above the line.
    pub status: Option<String>,
    pub segments: Vec<SegmentCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionCtx {
    pub branch: String,
    pub anchor: String,
    pub tree_url: Option<String>,
    pub lines: Vec<LineCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchDiffsContext {
    pub meta: MetaCtx,
    pub reference: String,
    pub index: Vec<IndexRowCtx>,
    pub sections: Vec<SectionCtx>,
}

impl BranchDiffsContext {
    pub fn build(report: &DivergenceReport, links: &ReportLinks) -> Self {
        let index = report
            .index
            .iter()
            .filter(|entry| !entry.path.is_empty())
            .map(|entry| IndexRowCtx {
                branch: entry.branch.0.clone(),
                anchor: entry.path.0.clone(),
                site_url: links.site_url(&entry.path),
                has_changes: entry.has_changes,
            })
            .collect();

        let sections = report
            .sections
            .iter()
            .map(|section| SectionCtx {
                branch: section.branch.0.clone(),
                anchor: section.path.0.clone(),
                tree_url: links.tree_url(&section.branch.0),
                lines: section.lines.iter().map(|l| line_ctx(l, links)).collect(),
            })
            .collect();

        BranchDiffsContext {
            meta: MetaCtx::new(),
            reference: report.reference.0.clone(),
            index,
            sections,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

fn line_ctx(line: &ReportLine, links: &ReportLinks) -> LineCtx {
    LineCtx {
        status: line
            .issue_status
            .clone()
            .filter(|s| line.issue_id.is_some() && !s.is_empty()),
        segments: link_segments(
            &line.text,
            line.issue_id,
            line.commit_hash.as_deref(),
            links,
        ),
    }
}

// ---------------------------------------------------------------------------
// Live log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveEntryCtx {
    /// Print the "Live" marker before this entry.
    pub live_marker: bool,
    /// Merge entries only carry the marker; their body is not shown.
    pub is_merge: bool,
    pub hash: String,
    pub short_hash: String,
    pub commit_url: Option<String>,
    pub issue_id: Option<u64>,
    pub issue_url: Option<String>,
    pub status: String,
    pub status_class: String,
    pub name: String,
    pub estimate: Option<String>,
    pub labels: Vec<String>,
    pub body: Vec<Vec<SegmentCtx>>,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveLogContext {
    pub meta: MetaCtx,
    pub reference: String,
    pub deployed_hash: String,
    pub lookback: usize,
    pub live_found: bool,
    pub entries: Vec<LiveEntryCtx>,
}

impl LiveLogContext {
    pub fn build(log: &LiveLog, links: &ReportLinks) -> Self {
        let mut marker_shown = false;
        let entries = log
            .records
            .iter()
            .map(|record| {
                let live_marker = record.is_live && !marker_shown;
                marker_shown |= live_marker;
                live_entry(record, live_marker, links)
            })
            .collect();

        LiveLogContext {
            meta: MetaCtx::new(),
            reference: log.reference.0.clone(),
            deployed_hash: log.deployed_hash.clone(),
            lookback: log.lookback,
            live_found: log.live_found,
            entries,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

fn live_entry(record: &CommitRecord, live_marker: bool, links: &ReportLinks) -> LiveEntryCtx {
    let status = record.status().unwrap_or_default();
    let status_class = if STATUS_CLASSES.contains(&status.as_str()) {
        status.clone()
    } else {
        String::new()
    };
    let issue = record.issue.as_ref();
    let name = issue
        .and_then(|i| i.name.clone())
        .unwrap_or_else(|| format!("Commit {}", record.hash));
    let estimate = issue.and_then(|i| i.estimate).map(format_estimate);
    let labels = issue
        .map(|i| {
            i.labels
                .iter()
                .filter(|l| l.kind == "label")
                .map(|l| l.name.clone())
                .collect()
        })
        .unwrap_or_default();
    let body = record
        .body
        .iter()
        .map(|line| link_segments(line, record.issue_id, None, links))
        .collect();

    LiveEntryCtx {
        live_marker,
        is_merge: record.is_merge,
        hash: record.hash.clone(),
        short_hash: record.hash.chars().take(SHORT_HASH_LEN).collect(),
        commit_url: links.commit_url(&record.hash),
        issue_id: record.issue_id,
        issue_url: record.issue_id.and_then(|id| links.story_url(id)),
        status,
        status_class,
        name,
        estimate,
        labels,
        body,
        author: record.author.clone().unwrap_or_default(),
        date: record.date.clone().unwrap_or_default(),
    }
}

fn format_estimate(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{points:.0}")
    } else {
        points.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branchyard_core::{BranchName, IssueDetails, IssueLabel};

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn links() -> ReportLinks {
        ReportLinks {
            repo_web_url: Some("https://github.com/acme/site".to_string()),
            story_url: Some("https://tracker.example/story/".to_string()),
            domain: Some("branches.example.com".to_string()),
        }
    }

    #[test]
    fn links_from_config() {
        let mut config = Config::new("git@github.com:acme/site.git", "/srv");
        config.domain = Some("b.example.com".to_string());
        let links = ReportLinks::from_config(&config);
        assert_eq!(links.repo_web_url.as_deref(), Some("https://github.com/acme/site"));
        assert!(links.story_url.is_none(), "no tracker configured");
        assert_eq!(
            links.site_url(&BranchPath::from("featurex")).as_deref(),
            Some("http://featurex.b.example.com/")
        );
    }

    #[test]
    fn commit_hash_is_linked() {
        let text = format!("commit {HASH}");
        let segments = link_segments(&text, None, Some(HASH), &links());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "commit ");
        assert_eq!(segments[1].text, HASH);
        assert_eq!(
            segments[1].href.as_deref(),
            Some(format!("https://github.com/acme/site/commit/{HASH}").as_str())
        );
    }

    #[test]
    fn issue_digits_are_linked_without_hash_sign() {
        let segments = link_segments("  fix [#123456] now", Some(123_456), None, &links());
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["  fix [#", "123456", "] now"]);
        assert_eq!(
            segments[1].href.as_deref(),
            Some("https://tracker.example/story/123456")
        );
    }

    #[test]
    fn no_bases_means_plain_text() {
        let text = format!("commit {HASH}");
        let segments = link_segments(&text, None, Some(HASH), &ReportLinks::default());
        assert_eq!(segments.len(), 1);
        assert!(segments[0].href.is_none());
        assert_eq!(segments[0].text, text);
    }

    #[test]
    fn empty_line_yields_one_empty_segment() {
        let segments = link_segments("", None, None, &links());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "");
    }

    #[test]
    fn live_marker_only_on_first_live_record() {
        let log = LiveLog {
            reference: BranchName::from("master"),
            deployed_hash: HASH.to_string(),
            lookback: 30,
            live_found: true,
            records: vec![
                CommitRecord {
                    hash: "a".repeat(40),
                    ..CommitRecord::default()
                },
                CommitRecord {
                    hash: HASH.to_string(),
                    is_live: true,
                    ..CommitRecord::default()
                },
            ],
        };
        let ctx = LiveLogContext::build(&log, &links());
        assert!(!ctx.entries[0].live_marker);
        assert!(ctx.entries[1].live_marker);
        assert_eq!(ctx.entries[1].short_hash, "0123456789");
        assert_eq!(ctx.entries[0].name, format!("Commit {}", "a".repeat(40)));
    }

    #[test]
    fn live_entry_uses_story_details() {
        let record = CommitRecord {
            hash: HASH.to_string(),
            issue_id: Some(30_848_279),
            issue: Some(IssueDetails {
                current_state: "Accepted".to_string(),
                estimate: Some(3.0),
                name: Some("Checkout flow".to_string()),
                labels: vec![
                    IssueLabel {
                        kind: "label".to_string(),
                        name: "payments".to_string(),
                    },
                    IssueLabel {
                        kind: "epic".to_string(),
                        name: "ignored".to_string(),
                    },
                ],
            }),
            ..CommitRecord::default()
        };
        let entry = live_entry(&record, false, &links());
        assert_eq!(entry.status, "accepted");
        assert_eq!(entry.status_class, "accepted");
        assert_eq!(entry.name, "Checkout flow");
        assert_eq!(entry.estimate.as_deref(), Some("3"));
        assert_eq!(entry.labels, vec!["payments".to_string()]);
        assert_eq!(
            entry.issue_url.as_deref(),
            Some("https://tracker.example/story/30848279")
        );
    }

    #[test]
    fn unknown_status_has_no_class() {
        let record = CommitRecord {
            hash: HASH.to_string(),
            issue_id: Some(123_456),
            issue: Some(IssueDetails {
                current_state: "planned".to_string(),
                estimate: None,
                name: None,
                labels: vec![],
            }),
            ..CommitRecord::default()
        };
        let entry = live_entry(&record, false, &links());
        assert_eq!(entry.status, "planned");
        assert_eq!(entry.status_class, "");
    }
}
