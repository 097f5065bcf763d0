//! Report files are replaced atomically and only when their content changes,
//! so a scheduled run that finds nothing new leaves the served page (and its
//! mtime) alone.
//!
//! The rendered page is written to a hidden sibling `.<name>.branchyard.tmp`
//! and renamed over the target. Line endings are normalised to LF before the
//! SHA-256 comparison.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Written { path: PathBuf },
    /// The file on disk already holds this page.
    Unchanged { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path } | WriteResult::Unchanged { path } => path,
        }
    }
}

pub fn write_report(path: &Path, html: &str) -> Result<WriteResult, SyncError> {
    let page = html.replace("\r\n", "\n");

    if on_disk_digest(path)?.as_deref() == Some(sha256_hex(page.as_bytes()).as_str()) {
        tracing::debug!("report unchanged: {}", path.display());
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
        });
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let staging = staging_path(dir, path);
    std::fs::write(&staging, page.as_bytes()).map_err(|e| io_err(&staging, e))?;
    if let Err(e) = std::fs::rename(&staging, path) {
        if let Err(cleanup) = std::fs::remove_file(&staging) {
            tracing::warn!("could not remove {}: {cleanup}", staging.display());
        }
        return Err(io_err(path, e));
    }

    tracing::info!("report written: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

fn staging_path(dir: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    dir.join(format!(".{name}.branchyard.tmp"))
}

/// `None` when there is no file yet.
fn on_disk_digest(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(sha256_hex(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
