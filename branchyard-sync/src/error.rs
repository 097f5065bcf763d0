//! Error types for branchyard-sync.

use std::path::PathBuf;

use thiserror::Error;

use branchyard_renderer::RenderError;

/// A failed invocation of the version-control tool.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The command ran and exited unsuccessfully.
    #[error("`{command}` exited with {status}: {output}")]
    Command {
        command: String,
        status: String,
        /// Captured stderr (stdout when stderr was empty).
        output: String,
    },

    /// The command could not be started at all (tool missing, bad cwd).
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure talking to the issue tracker or the deployed-hash endpoint.
/// Never fatal: enrichment or the live diff is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("unexpected response from {url}: {message}")]
    Body { url: String, message: String },

    #[error("{url} returned an empty body")]
    Empty { url: String },
}

/// All errors that abort a branchyard run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required working directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cloning a branch failed; the run stops and the next one retries.
    #[error("clone of {branch} into {path} failed: {source}")]
    Clone {
        branch: String,
        path: PathBuf,
        #[source]
        source: VcsError,
    },

    /// Another reconciliation holds the lock for this location.
    #[error("another branchyard run holds {path}")]
    Locked { path: PathBuf },

    /// Live diff requested but no deployed-hash URL is configured.
    #[error("live diff needs live.deployed_hash_url")]
    LiveNotConfigured,

    /// The deployed hash could not be fetched; no live report is produced.
    #[error("deployed hash unavailable: {0}")]
    DeployedHash(#[source] FetchError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
