//! `--ssh-option` parsing and the option record kept in the managed file.
//!
//! The record is a run of comment lines of the form `# :key=value`:
//!
//! ```text
//! # :wait=yes
//! # :ssh-host-prefix=dev.
//! # :disable-autostart=true
//! # :ssh-option=ForwardAgent=yes
//! # :header=X-Team=infra
//! ```
//!
//! Only non-default values are recorded; unknown keys are ignored on read.

use std::collections::HashSet;

use crate::error::OptionError;
use crate::types::{SyncOptions, WaitMode};

/// Prefix of every option record line.
pub const RECORD_PREFIX: &str = "# :";

const KEY_WAIT: &str = "wait";
const KEY_HOST_PREFIX: &str = "ssh-host-prefix";
const KEY_HOSTNAME_SUFFIX: &str = "ssh-hostname-suffix";
const KEY_DISABLE_AUTOSTART: &str = "disable-autostart";
const KEY_SSH_OPTION: &str = "ssh-option";
const KEY_HEADER: &str = "header";
const KEY_HEADER_COMMAND: &str = "header-command";

/// Split an ssh option into key and value.
///
/// The separator is the first `=` or space, matching what ssh accepts.
/// Line breaks are rejected: the option would end its stanza early.
pub fn parse_ssh_option(option: &str) -> Result<(&str, &str), OptionError> {
    if option.contains(['\n', '\r']) {
        return Err(OptionError::InvalidSshOption(option.to_string()));
    }
    match option.find(['=', ' ']) {
        Some(idx) if idx > 0 => Ok((&option[..idx], &option[idx + 1..])),
        _ => Err(OptionError::InvalidSshOption(option.to_string())),
    }
}

/// Reject a host prefix or suffix that would split the `Host` line or
/// start a comment.
pub fn check_host_affix(flag: &'static str, value: &str) -> Result<(), OptionError> {
    if value.chars().any(|c| c.is_whitespace() || c == '#') {
        return Err(OptionError::HostName {
            flag,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Directive lines for one host stanza.
///
/// ssh keeps the first value it sees for most keywords, so lines are added
/// in priority order. An empty value (`LogLevel=`) removes that keyword:
/// neither it nor any later line with the same key is written. Keys
/// compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    lines: Vec<String>,
    removed: HashSet<String>,
}

impl OptionSet {
    pub fn add(&mut self, option: &str) -> Result<(), OptionError> {
        let (key, value) = parse_ssh_option(option)?;
        let key = key.to_ascii_lowercase();
        if self.removed.contains(&key) {
            return Ok(());
        }
        if value.trim().is_empty() {
            self.removed.insert(key);
        } else {
            self.lines.push(option.to_string());
        }
        Ok(())
    }

    pub fn extend<I, S>(&mut self, options: I) -> Result<(), OptionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for option in options {
            self.add(option.as_ref())?;
        }
        Ok(())
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Record lines (without trailing newline) for the non-default options.
pub fn record_lines(opts: &SyncOptions) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |key: &str, value: &str| lines.push(format!("{RECORD_PREFIX}{key}={value}"));
    if opts.wait != WaitMode::Auto {
        push(KEY_WAIT, &opts.wait.to_string());
    }
    if let Some(prefix) = &opts.host_prefix {
        push(KEY_HOST_PREFIX, prefix);
    }
    if let Some(suffix) = &opts.hostname_suffix {
        push(KEY_HOSTNAME_SUFFIX, suffix);
    }
    if opts.disable_autostart {
        push(KEY_DISABLE_AUTOSTART, "true");
    }
    for option in &opts.ssh_options {
        push(KEY_SSH_OPTION, option);
    }
    for header in &opts.headers {
        push(KEY_HEADER, header);
    }
    if let Some(command) = &opts.header_command {
        push(KEY_HEADER_COMMAND, command);
    }
    lines
}

/// Recover the options recorded by a previous run.
///
/// Missing keys fall back to defaults; malformed values are skipped.
pub fn parse_last_options(data: &[u8]) -> SyncOptions {
    let mut opts = SyncOptions::default();
    let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
    for line in String::from_utf8_lossy(data).lines() {
        let Some(record) = line.strip_prefix(RECORD_PREFIX) else {
            continue;
        };
        let Some((key, value)) = record.split_once('=') else {
            continue;
        };
        match key {
            KEY_WAIT => {
                if let Ok(wait) = value.parse() {
                    opts.wait = wait;
                }
            }
            KEY_HOST_PREFIX => opts.host_prefix = non_empty(value),
            KEY_HOSTNAME_SUFFIX => opts.hostname_suffix = non_empty(value),
            KEY_DISABLE_AUTOSTART => opts.disable_autostart = value == "true",
            KEY_SSH_OPTION => opts.ssh_options.push(value.to_string()),
            KEY_HEADER => opts.headers.push(value.to_string()),
            KEY_HEADER_COMMAND => opts.header_command = non_empty(value),
            _ => {}
        }
    }
    opts
}
