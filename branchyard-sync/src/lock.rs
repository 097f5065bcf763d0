//! Exclusive run lock: at most one reconciliation per location.
//!
//! The lock is a `.branchyard.lock` file created with `create_new` inside
//! `location`, holding the owner's pid. It is removed on drop. A run that was
//! killed never drops its lock, so a lock naming a pid that no longer exists
//! is taken over.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{io_err, SyncError};

pub const LOCK_FILE: &str = ".branchyard.lock";

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Fails with [`SyncError::Locked`] when a live process holds the lock.
    pub fn acquire(location: &Path) -> Result<Self, SyncError> {
        let path = location.join(LOCK_FILE);
        match Self::create(&path) {
            Err(SyncError::Locked { .. }) => {}
            other => return other,
        }

        let Some(owner) = read_owner(&path)? else {
            return Err(SyncError::Locked { path });
        };
        if is_process_alive(owner) {
            return Err(SyncError::Locked { path });
        }
        // Re-read so a lock replaced since the first read is left alone.
        if read_owner(&path)? != Some(owner) {
            return Err(SyncError::Locked { path });
        }
        tracing::warn!("taking over {} left by dead process {owner}", path.display());
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&path, e)),
        }
        Self::create(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(path: &Path) -> Result<Self, SyncError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(SyncError::Locked {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(io_err(path, e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| io_err(path, e))?;
        tracing::debug!("acquired {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("failed to remove {}: {e}", self.path.display());
        }
    }
}

/// Pid recorded in the lock file. `None` when the file is gone, empty or
/// unparsable; such a lock is treated as held.
fn read_owner(path: &Path) -> Result<Option<u32>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents.trim().parse().ok()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

fn is_process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    if pid == std::process::id() {
        return true;
    }
    let proc_root = Path::new("/proc");
    if proc_root.join("self").exists() {
        return proc_root.join(pid.to_string()).exists();
    }
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(true)
}
