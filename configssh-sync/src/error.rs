//! Error types for configssh-sync.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use configssh_core::{EscapeError, OptionError};

/// Boxed error returned by a [`crate::fetch::WorkspaceDirectory`] implementation.
pub type DirectoryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of the resource fetch stage. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Listing the user's workspaces failed.
    #[error("fetch workspaces failed: {0}")]
    ListWorkspaces(#[source] DirectoryError),

    /// Resolving agents for a single workspace failed.
    #[error("fetch agents for workspace '{workspace}' failed: {source}")]
    Workspace {
        workspace: String,
        #[source]
        source: DirectoryError,
    },

    /// The fan-out did not finish before the deadline.
    #[error("fetching workspace agents timed out after {0:?}")]
    Timeout(Duration),
}

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path could not be escaped for the target platform.
    #[error("escape for ssh failed: {0}")]
    Escape(#[from] EscapeError),

    /// A user supplied option was rejected.
    #[error("invalid option: {0}")]
    Option(#[from] OptionError),

    /// The managed file exists but was not written by us.
    #[error("unexpected content in {path}: remove the file and rerun the command to continue")]
    UnknownManagedFile { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
