//! Error types for configssh-core.

use thiserror::Error;

/// A path that cannot be embedded in a `ProxyCommand` / `Match exec` line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    /// Newlines are allowed by some filesystems but ssh config cannot hold them.
    #[error("invalid path {path:?}: ssh config cannot contain a newline")]
    Newline { path: String },

    /// The character has no escape sequence on the target platform.
    #[error("invalid path {path:?}: {platform} paths must not contain {character:?}")]
    Unsupported {
        path: String,
        platform: &'static str,
        character: char,
    },
}

/// Errors raised while parsing user supplied options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    /// An `--ssh-option` value without a `=` or space separator.
    #[error("invalid config-ssh option {0:?}: expected \"Key=value\" or \"Key value\"")]
    InvalidSshOption(String),

    /// An unknown `--wait` value.
    #[error("unknown wait mode '{0}'; expected: yes, no, auto")]
    WaitMode(String),

    /// A host prefix or suffix that cannot appear in a `Host` line.
    #[error("invalid --{flag} {value:?}: must not contain whitespace or '#'")]
    HostName { flag: &'static str, value: String },

    /// A `--header` value that is not `key=value` on one line.
    #[error("invalid header {0:?}: expected \"key=value\" on a single line")]
    InvalidHeader(String),

    /// A `--header-command` spanning several lines.
    #[error("invalid header command {0:?}: must be a single line")]
    InvalidHeaderCommand(String),
}
