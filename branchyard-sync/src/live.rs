//! Live diff: where the deployed commit sits in the reference branch's recent
//! history.
//!
//! Only the last `live.lookback` commits are inspected. A deployed hash older
//! than that window is never found; the log is still produced with
//! `live_found == false`.

use branchyard_core::annotate::parse_issue_id;
use branchyard_core::{CommitRecord, Config, LiveLog};

use crate::error::SyncError;
use crate::tracker::{DeployedHashSource, TrackerCache};
use crate::vcs::{LogRange, Vcs};

/// Split raw `git log` output into commit records.
///
/// A record starts at every `commit <hash>` line. `Author`/`Merge` lines and
/// lines starting with `Date` fill the matching fields; everything else is
/// body. Merge records are dropped unless they are the deployed commit.
pub fn parse_live_log(lines: &[String], deployed_hash: &str) -> Vec<CommitRecord> {
    let mut records = Vec::new();
    let mut current: Option<CommitRecord> = None;

    for line in lines {
        if let Some(rest) = line.strip_prefix("commit ") {
            flush(&mut records, current.take());
            let hash = rest.split_whitespace().next().unwrap_or_default().to_string();
            current = Some(CommitRecord {
                is_live: hash == deployed_hash,
                hash,
                ..CommitRecord::default()
            });
            continue;
        }
        let Some(record) = current.as_mut() else {
            continue;
        };
        if record.issue_id.is_none() {
            record.issue_id = parse_issue_id(line);
        }
        if line.starts_with("Author") {
            record.author = Some(line.clone());
        } else if line.starts_with("Merge") {
            record.is_merge = true;
        } else if line.starts_with("Date") {
            match record.date.as_mut() {
                Some(date) => date.push_str(line),
                None => record.date = Some(line.clone()),
            }
        } else if !line.trim().is_empty() {
            record.body.push(line.clone());
        }
    }
    flush(&mut records, current);
    records
}

fn flush(records: &mut Vec<CommitRecord>, record: Option<CommitRecord>) {
    match record {
        Some(r) if r.is_merge && !r.is_live => {}
        Some(r) => records.push(r),
        None => {}
    }
}

/// Fetch the deployed hash, read the recent history of the reference working
/// copy and enrich records that mention an issue.
///
/// Fails when the deployed hash is unavailable; no partial log is produced.
pub fn build_live_log<V: Vcs>(
    config: &Config,
    vcs: &V,
    source: &dyn DeployedHashSource,
    mut tracker: Option<&mut TrackerCache<'_>>,
) -> Result<LiveLog, SyncError> {
    let deployed_hash = source.deployed_hash().map_err(SyncError::DeployedHash)?;
    tracing::info!("deployed hash: {deployed_hash}");

    let lookback = config.live.lookback;
    let raw = vcs.commit_log(&config.reference_dir(), LogRange::Recent { limit: lookback })?;
    let mut records = parse_live_log(&raw, &deployed_hash);

    if let Some(cache) = tracker.as_deref_mut() {
        for record in records.iter_mut() {
            if let Some(id) = record.issue_id {
                record.issue = cache.lookup(id);
            }
        }
    }

    let live_found = records.iter().any(|r| r.is_live);
    if !live_found {
        tracing::warn!(
            "deployed commit {deployed_hash} is not among the last {lookback} commits of {}",
            config.reference_branch
        );
    }
    Ok(LiveLog {
        reference: config.reference_branch.clone(),
        deployed_hash,
        lookback,
        live_found,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIVE: &str = "2222222222222222222222222222222222222222";

    fn lines(raw: &str) -> Vec<String> {
        raw.lines().map(str::to_string).collect()
    }

    fn sample() -> Vec<String> {
        lines(&format!(
            "commit 1111111111111111111111111111111111111111
Author: Dev One <one@example.com>
Date:   Tue Jan 7 09:00:00 2014 -0700

    Tighten search [#30848279]

commit 3333333333333333333333333333333333333333
Merge: 1111111 2222222
Author: Dev Two <two@example.com>
Date:   Mon Jan 6 18:00:00 2014 -0700

    Merge branch 'feature-x'

commit {LIVE}
Author: Dev Three <three@example.com>
Date:   Mon Jan 6 10:00:00 2014 -0700

    Release 1.4
"
        ))
    }

    #[test]
    fn records_split_on_commit_lines() {
        let records = parse_live_log(&sample(), LIVE);
        let hashes: Vec<&str> = records.iter().map(|r| &r.hash[..4]).collect();
        assert_eq!(hashes, vec!["1111", "2222"], "merge record is dropped");
    }

    #[test]
    fn fields_are_classified() {
        let records = parse_live_log(&sample(), LIVE);
        let first = &records[0];
        assert_eq!(first.author.as_deref(), Some("Author: Dev One <one@example.com>"));
        assert!(first.date.as_deref().unwrap().starts_with("Date:"));
        assert_eq!(first.body, vec!["    Tighten search [#30848279]".to_string()]);
        assert_eq!(first.issue_id, Some(30_848_279));
        assert!(!first.is_live);
        assert!(records[1].is_live);
    }

    #[test]
    fn live_merge_commit_is_kept() {
        let raw = lines(&format!(
            "commit {LIVE}\nMerge: aaaaaaa bbbbbbb\nAuthor: Bot <bot@example.com>\n"
        ));
        let records = parse_live_log(&raw, LIVE);
        assert_eq!(records.len(), 1);
        assert!(records[0].is_merge && records[0].is_live);
    }

    #[test]
    fn trailing_merge_is_dropped() {
        let raw = lines("commit 4444444444444444444444444444444444444444\nMerge: a b\n");
        assert!(parse_live_log(&raw, LIVE).is_empty());
    }

    #[test]
    fn multi_line_dates_are_joined() {
        let raw = lines("commit 5555555555555555555555555555555555555555\nDate: one\nDate: two\n");
        let records = parse_live_log(&raw, LIVE);
        assert_eq!(records[0].date.as_deref(), Some("Date: oneDate: two"));
    }

    #[test]
    fn lines_before_first_commit_are_ignored() {
        let raw = lines("warning: something\ncommit 6666666666666666666666666666666666666666\n");
        let records = parse_live_log(&raw, LIVE);
        assert_eq!(records.len(), 1);
        assert!(records[0].body.is_empty());
    }
}
