//! Divergence reporter: per-branch commits the reference branch lacks.

use branchyard_core::{
    parse_annotations, BranchDivergence, BranchIndexEntry, Config, DivergenceReport, ReportLine,
};

use crate::reconcile::ActiveBranch;
use crate::tracker::TrackerCache;
use crate::vcs::{LogRange, Vcs};

/// Build the divergence report for `branches`.
///
/// Every branch gets an index entry; only branches with at least one
/// unmerged commit get a section. A branch whose log cannot be read is
/// reported as having no changes.
pub fn build_divergence_report<V: Vcs>(
    config: &Config,
    vcs: &V,
    branches: &[ActiveBranch],
    mut tracker: Option<&mut TrackerCache<'_>>,
) -> DivergenceReport {
    let mut index = Vec::new();
    let mut sections = Vec::new();

    for branch in branches {
        if branch.name == config.reference_branch || branch.path.is_empty() {
            continue;
        }
        let range = LogRange::Divergence {
            branch: &branch.name,
            reference: &config.reference_branch,
        };
        let raw = match vcs.commit_log(&branch.dir, range) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!("no divergence log for {}: {err}", branch.name);
                Vec::new()
            }
        };

        index.push(BranchIndexEntry {
            branch: branch.name.clone(),
            path: branch.path.clone(),
            has_changes: !raw.is_empty(),
        });
        if raw.is_empty() {
            continue;
        }

        let lines = raw
            .into_iter()
            .map(|text| annotate_line(text, tracker.as_deref_mut()))
            .collect();
        sections.push(BranchDivergence {
            branch: branch.name.clone(),
            path: branch.path.clone(),
            lines,
        });
    }

    tracing::info!(
        "divergence report: {} branches, {} with unmerged commits",
        index.len(),
        sections.len()
    );
    DivergenceReport {
        reference: config.reference_branch.clone(),
        index,
        sections,
    }
}

fn annotate_line(text: String, tracker: Option<&mut TrackerCache<'_>>) -> ReportLine {
    let ann = parse_annotations(&text);
    let issue_status = match (ann.issue_id, tracker) {
        (Some(id), Some(cache)) => cache.status(id),
        _ => None,
    };
    ReportLine {
        text,
        issue_id: ann.issue_id,
        issue_status,
        commit_hash: ann.commit_hash,
    }
}
