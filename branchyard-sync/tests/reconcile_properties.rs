mod support;

use std::fs;

use branchyard_core::{BranchName, BranchPath};
use branchyard_sync::marker::is_managed;
use branchyard_sync::{BranchAction, NoopHooks, Reconciler, SyncError};
use tempfile::TempDir;

use support::{config_at, managed_checkout, names, FakeVcs, RecordingHooks};

#[test]
fn fresh_location_clones_every_remote() {
    support::init_logging();
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "feature-x", "release/1.0"]);
    let mut hooks = RecordingHooks::default();

    let summary = Reconciler::new(&config, &vcs, &mut hooks).run().unwrap();

    for dir in ["featurex", "release1.0"] {
        let path = tmp.path().join(dir);
        assert!(path.join(".git").exists(), "{dir} should be cloned");
        assert!(is_managed(&path), "{dir} should carry the marker");
    }
    assert!(tmp.path().join("master").join(".git").exists());
    assert_eq!(
        summary.cloned,
        names(&["master", "feature-x", "release/1.0"])
    );
    assert!(summary.deleted.is_empty());
    assert_eq!(hooks.count("after_clone"), 3);
    assert_eq!(summary.active.len(), 2, "reference is not an active branch");
}

#[test]
fn removed_remote_deletes_managed_directory_once() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "old-feature"]);
    Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();
    assert!(tmp.path().join("oldfeature").exists());

    vcs.set_remotes(&["master"]);
    let mut hooks = RecordingHooks::default();
    let summary = Reconciler::new(&config, &vcs, &mut hooks).run().unwrap();

    assert!(!tmp.path().join("oldfeature").exists());
    assert_eq!(summary.deleted, names(&["old-feature"]));
    let deletes: Vec<&String> = hooks
        .events
        .iter()
        .filter(|e| e.starts_with("after_delete"))
        .collect();
    assert_eq!(deletes, vec!["after_delete old-feature"]);
}

#[test]
fn unmanaged_directory_is_never_deleted() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let stray = tmp.path().join("stray");
    fs::create_dir_all(stray.join(".git")).unwrap();
    let vcs = FakeVcs::with_remotes(&["master", "feature-x"]);

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert!(stray.exists());
    assert_eq!(summary.kept, vec![BranchPath::from("stray")]);
    assert!(summary.deleted.is_empty());
}

#[test]
fn empty_remote_list_deletes_nothing() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_at(tmp.path());
    config.ignore = names(&["unrelated"]);
    let orphan = managed_checkout(tmp.path(), "oldfeature");
    let vcs = FakeVcs::default();

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert!(orphan.exists());
    assert!(summary.deleted.is_empty() && summary.kept.is_empty());
}

#[test]
fn unreadable_remote_list_deletes_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let orphan = managed_checkout(tmp.path(), "oldfeature");
    let vcs = FakeVcs::with_remotes(&["master"]);
    *vcs.list_fails.borrow_mut() = true;

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert!(orphan.exists());
    assert!(summary.deleted.is_empty());
}

#[test]
fn nothing_checked_out_means_no_delete_check() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master"]);
    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();
    assert!(summary.deleted.is_empty() && summary.kept.is_empty());
}

#[test]
fn reference_directory_is_never_deleted() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_at(tmp.path());
    config.ignore = names(&["something-else"]);
    let vcs = FakeVcs::with_remotes(&["master", "feature-x"]);
    Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();
    assert!(is_managed(&tmp.path().join("master")));

    // The reference branch vanishes from the remote listing.
    vcs.set_remotes(&["feature-x"]);
    let mut hooks = RecordingHooks::default();
    let summary = Reconciler::new(&config, &vcs, &mut hooks).run().unwrap();

    assert!(tmp.path().join("master").exists());
    assert!(summary.deleted.is_empty());
    assert_eq!(hooks.count("after_delete"), 0);
}

#[test]
fn allow_list_hides_other_branches_from_both_sides() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_at(tmp.path());
    config.only = names(&["feature-x", "master"]);
    config.normalize().unwrap();
    let featurey = managed_checkout(tmp.path(), "featurey");
    let vcs = FakeVcs::with_remotes(&["master", "feature-x", "feature-y"]);

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert!(tmp.path().join("master").join(".git").exists());
    assert!(tmp.path().join("featurex").join(".git").exists());
    assert!(featurey.exists(), "feature-y must not be deleted");
    assert!(vcs.calls_matching("clone feature-y").is_empty(), "feature-y must not be cloned");
    assert!(summary.deleted.is_empty());
    assert_eq!(config.only, names(&["feature-x"]), "reference dropped from allow set");
}

#[test]
fn existing_checkouts_are_refreshed_in_order() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "feature-x"]);
    Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();
    vcs.calls.borrow_mut().clear();

    let mut hooks = RecordingHooks::default();
    let summary = Reconciler::new(&config, &vcs, &mut hooks).run().unwrap();

    let reference = tmp.path().join("master");
    let calls = vcs.calls.borrow().clone();
    assert_eq!(
        &calls[..5],
        &[
            format!("prune {}", reference.display()),
            format!("reset {}", reference.display()),
            "checkout master".to_string(),
            format!("pull {}", reference.display()),
            "list".to_string(),
        ]
    );
    assert_eq!(summary.updated, names(&["master", "feature-x"]));
    assert!(summary.cloned.is_empty());
    assert_eq!(hooks.count("before_update"), 2);
    assert_eq!(hooks.count("after_update"), 2);
    let before = hooks.events.iter().position(|e| e == "before_update feature-x");
    let after = hooks.events.iter().position(|e| e == "after_update feature-x");
    assert!(before < after);
}

#[test]
fn failed_reset_still_checks_out_and_pulls() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "feature-x"]);
    Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();
    *vcs.fail_reset.borrow_mut() = true;
    vcs.calls.borrow_mut().clear();

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert_eq!(summary.step_failures, 2, "one failed reset per refreshed branch");
    assert_eq!(vcs.calls_matching("checkout").len(), 2);
    assert_eq!(vcs.calls_matching("pull").len(), 2);
}

#[test]
fn clone_failure_aborts_the_run() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "broken", "later"]);
    *vcs.fail_clone_of.borrow_mut() = Some("broken".to_string());

    let err = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap_err();

    assert!(matches!(err, SyncError::Clone { ref branch, .. } if branch == "broken"));
    assert!(vcs.calls_matching("clone later").is_empty());
    assert!(!is_managed(&tmp.path().join("broken")));
}

#[test]
fn missing_location_is_a_directory_create_error() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(&tmp.path().join("missing"));
    let vcs = FakeVcs::with_remotes(&["master"]);

    let err = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap_err();
    assert!(matches!(err, SyncError::DirectoryCreate { .. }));
}

#[test]
fn colliding_branches_share_no_directory() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "feature-x", "feature_x", "mas-ter"]);

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert_eq!(vcs.calls_matching("clone feature").len(), 1);
    assert_eq!(summary.collisions.len(), 1);
    let collision = &summary.collisions[0];
    assert_eq!(collision.branch, BranchName::from("feature_x"));
    assert_eq!(collision.claimed_by, BranchName::from("feature-x"));
    assert!(vcs.calls_matching("clone mas-ter").is_empty());
}

#[test]
fn prefix_scopes_the_scan() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_at(tmp.path());
    config.prefix = "site_".to_string();
    let foreign = managed_checkout(tmp.path(), "oldfeature");
    let ours = managed_checkout(tmp.path(), "site_oldfeature");
    let vcs = FakeVcs::with_remotes(&["master", "feature-x"]);

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert!(foreign.exists(), "unprefixed directory is outside our scope");
    assert!(!ours.exists());
    assert!(tmp.path().join("site_featurex").join(".git").exists());
    assert!(tmp.path().join("site_master").join(".git").exists());
    assert_eq!(summary.deleted, names(&["oldfeature"]));
}

#[test]
fn plan_predicts_without_side_effects() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "feature-x", "old-feature"]);
    Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();
    fs::create_dir_all(tmp.path().join("stray")).unwrap();
    vcs.set_remotes(&["master", "feature-x", "feature-z"]);
    vcs.calls.borrow_mut().clear();

    let mut hooks = RecordingHooks::default();
    let plan = Reconciler::new(&config, &vcs, &mut hooks).plan().unwrap();

    let actions: Vec<(String, BranchAction)> = plan
        .actions
        .iter()
        .map(|a| (a.path.to_string(), a.action))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("oldfeature".to_string(), BranchAction::Delete),
            ("stray".to_string(), BranchAction::Kept),
            ("featurex".to_string(), BranchAction::Refresh),
            ("featurez".to_string(), BranchAction::Checkout),
        ]
    );
    assert_eq!(plan.reference.action, BranchAction::Refresh);
    assert!(plan.remotes_known);
    assert_eq!(*vcs.calls.borrow(), vec!["list".to_string()]);
    assert!(hooks.events.is_empty());
    assert!(tmp.path().join("oldfeature").exists());
}

#[test]
fn plan_on_empty_location_only_checks_out_reference() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    let vcs = FakeVcs::with_remotes(&["master", "feature-x"]);

    let plan = Reconciler::new(&config, &vcs, &mut NoopHooks).plan().unwrap();

    assert_eq!(plan.reference.action, BranchAction::Checkout);
    assert!(plan.actions.is_empty());
    assert!(!plan.remotes_known);
    assert!(!tmp.path().join("master").exists());
}

#[test]
fn directory_named_before_a_sanitizer_change_still_matches_its_remote() {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    // Cloned back when `_` was still allowed in directory names.
    let legacy = managed_checkout(tmp.path(), "feature_x");
    let vcs = FakeVcs::with_remotes(&["master", "feature-x", "other"]);
    let orphan = managed_checkout(tmp.path(), "gone");

    let summary = Reconciler::new(&config, &vcs, &mut NoopHooks).run().unwrap();

    assert!(legacy.exists(), "sanitized name matches remote feature-x");
    assert!(!orphan.exists());
    assert_eq!(summary.deleted, names(&["gone"]));
}
