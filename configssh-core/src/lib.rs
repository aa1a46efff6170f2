//! configssh core library: domain types, option records, platform escaping.
//!
//! Public API surface:
//! - [`types`]: workspace hosts, deployment settings, sync options, managed file kinds
//! - [`options`]: `--ssh-option` parsing, [`OptionSet`], and the `# :key=value` option record
//! - [`escape`]: [`Escaper`] and its POSIX / Windows implementations
//! - [`error`]: [`EscapeError`], [`OptionError`]

pub mod error;
pub mod escape;
pub mod options;
pub mod types;

pub use error::{EscapeError, OptionError};
pub use escape::{EscapeOptions, Escaper, Platform, PosixEscaper, WindowsEscaper};
pub use options::OptionSet;
pub use types::{DeploymentSsh, ManagedFile, SyncOptions, WaitMode, WorkspaceHosts, HOST_PREFIX};
