//! Managed-state marker: a zero-byte `managedbranch.txt` at the root of every
//! working copy branchyard cloned. Only marked directories are ever deleted.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

pub const MANAGED_MARKER: &str = "managedbranch.txt";

pub fn marker_path(dir: &Path) -> PathBuf {
    dir.join(MANAGED_MARKER)
}

/// Create the marker, leaving an existing one untouched.
pub fn mark_managed(dir: &Path) -> Result<(), SyncError> {
    let path = marker_path(dir);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map(|_| ())
        .map_err(|e| io_err(path, e))
}

pub fn is_managed(dir: &Path) -> bool {
    marker_path(dir).is_file()
}
