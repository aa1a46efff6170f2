//! # configssh-sync
//!
//! The SSH config synchronization pipeline:
//!
//! 1. [`fetch`]: concurrently resolve agent names per workspace
//! 2. [`compose`]: render the managed `~/.ssh/coder` file
//! 3. [`migrate`]: strip the legacy inline block, ensure a single `Include coder`
//! 4. [`reconcile`]: byte comparison, change list, unified diffs
//! 5. [`writer`]: temp-file-then-rename persistence
//!
//! [`pipeline::plan`] and [`pipeline::apply`] tie the stages together.

pub mod compose;
pub mod error;
pub mod fetch;
pub mod migrate;
pub mod pipeline;
pub mod reconcile;
pub mod writer;

pub use compose::{compose, DesiredConfig, HostEntry, ProxyTarget};
pub use error::{DirectoryError, FetchError, SyncError};
pub use fetch::{fetch_workspace_hosts, StaticDirectory, Workspace, WorkspaceDirectory};
pub use migrate::{ensure_include, migrate, strip_legacy_block, IncludeEdit, Migration};
pub use pipeline::{apply, plan, read_current, CurrentFiles, Plan, SyncPaths, SyncRequest, WriteResult};
pub use reconcile::{reconcile, ChangeSet, FileDiff, FileState};
pub use writer::write_atomic;
