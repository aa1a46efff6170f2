//! Domain types shared by the fetcher, composer and CLI.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::OptionError;
use crate::options::{check_host_affix, parse_ssh_option};

// ---------------------------------------------------------------------------
// Fetcher output
// ---------------------------------------------------------------------------

/// Agent names reachable through one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceHosts {
    pub name: String,
    pub agents: Vec<String>,
}

impl WorkspaceHosts {
    pub fn new(name: impl Into<String>, agents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            agents: agents.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Deployment settings
// ---------------------------------------------------------------------------

/// Host prefix used when the deployment does not publish one.
pub const HOST_PREFIX: &str = "coder.";

/// SSH settings published by the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSsh {
    pub hostname_prefix: String,
    /// When set, hosts are named `<name>.<suffix>` instead of
    /// `<prefix><name>`.
    pub hostname_suffix: Option<String>,
    /// Extra directives, written after the user's own options.
    pub ssh_config_options: BTreeMap<String, String>,
}

impl Default for DeploymentSsh {
    fn default() -> Self {
        Self {
            hostname_prefix: HOST_PREFIX.to_string(),
            hostname_suffix: None,
            ssh_config_options: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Whether `coder ssh` waits for the agent startup script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    Yes,
    No,
    #[default]
    Auto,
}

impl fmt::Display for WaitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitMode::Yes => write!(f, "yes"),
            WaitMode::No => write!(f, "no"),
            WaitMode::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for WaitMode {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(WaitMode::Yes),
            "no" => Ok(WaitMode::No),
            "auto" => Ok(WaitMode::Auto),
            other => Err(OptionError::WaitMode(other.to_string())),
        }
    }
}

/// Invocation options that shape the managed file.
///
/// These are recorded in the managed file header so the next run can tell
/// an options change apart from a topology change.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Raw `--ssh-option` lines, in command-line order.
    pub ssh_options: Vec<String>,
    pub wait: WaitMode,
    pub disable_autostart: bool,
    /// Overrides the deployment's host prefix.
    pub host_prefix: Option<String>,
    /// Overrides the deployment's hostname suffix. Takes precedence over
    /// any prefix.
    pub hostname_suffix: Option<String>,
    /// `key=value` HTTP headers forwarded to `coder ssh`.
    pub headers: Vec<String>,
    pub header_command: Option<String>,
}

impl SyncOptions {
    /// Reject values that would corrupt the managed file.
    pub fn validate(&self) -> Result<(), OptionError> {
        for option in &self.ssh_options {
            parse_ssh_option(option)?;
        }
        for (flag, value) in [
            ("ssh-host-prefix", &self.host_prefix),
            ("ssh-hostname-suffix", &self.hostname_suffix),
        ] {
            if let Some(value) = value {
                check_host_affix(flag, value)?;
            }
        }
        for header in &self.headers {
            match header.split_once('=') {
                Some((name, _)) if !name.is_empty() && !header.contains(['\n', '\r']) => {}
                _ => return Err(OptionError::InvalidHeader(header.clone())),
            }
        }
        if let Some(command) = &self.header_command {
            if command.contains(['\n', '\r']) {
                return Err(OptionError::InvalidHeaderCommand(command.clone()));
            }
        }
        Ok(())
    }

    /// Human readable list of the non-default options, for prompts.
    pub fn as_list(&self) -> Vec<String> {
        let mut list = Vec::new();
        if self.wait != WaitMode::Auto {
            list.push(format!("wait: {}", self.wait));
        }
        if let Some(prefix) = &self.host_prefix {
            list.push(format!("ssh-host-prefix: {prefix}"));
        }
        if let Some(suffix) = &self.hostname_suffix {
            list.push(format!("ssh-hostname-suffix: {suffix}"));
        }
        if self.disable_autostart {
            list.push(format!("disable-autostart: {}", self.disable_autostart));
        }
        for option in &self.ssh_options {
            list.push(format!("ssh-option: {option}"));
        }
        for header in &self.headers {
            list.push(format!("header: {header}"));
        }
        if let Some(command) = &self.header_command {
            list.push(format!("header-command: {command}"));
        }
        list
    }
}

fn sorted(values: &[String]) -> Vec<&String> {
    let mut values: Vec<_> = values.iter().collect();
    values.sort();
    values
}

/// Option order on the command line matters for ssh, but two runs with
/// the same set of options are not a change worth prompting about.
impl PartialEq for SyncOptions {
    fn eq(&self, other: &Self) -> bool {
        sorted(&self.ssh_options) == sorted(&other.ssh_options)
            && sorted(&self.headers) == sorted(&other.headers)
            && self.wait == other.wait
            && self.disable_autostart == other.disable_autostart
            && self.host_prefix == other.host_prefix
            && self.hostname_suffix == other.hostname_suffix
            && self.header_command == other.header_command
    }
}

impl Eq for SyncOptions {}

// ---------------------------------------------------------------------------
// Managed files
// ---------------------------------------------------------------------------

/// The two files a sync run reads and may rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedFile {
    /// The user's primary config (`~/.ssh/config`); only lightly touched.
    SshConfig,
    /// The generated include file (`~/.ssh/coder`); fully owned.
    CoderConfig,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_mode_parses_case_insensitively() {
        assert_eq!("YES".parse::<WaitMode>().unwrap(), WaitMode::Yes);
        assert_eq!("auto".parse::<WaitMode>().unwrap(), WaitMode::Auto);
        let err = "sometimes".parse::<WaitMode>().unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn options_equality_ignores_ssh_option_order() {
        let a = SyncOptions {
            ssh_options: vec!["ForwardAgent=yes".into(), "Port 22".into()],
            ..Default::default()
        };
        let b = SyncOptions {
            ssh_options: vec!["Port 22".into(), "ForwardAgent=yes".into()],
            ..Default::default()
        };
        assert_eq!(a, b);

        let c = SyncOptions {
            wait: WaitMode::No,
            ..b.clone()
        };
        assert_ne!(b, c);
    }

    #[test]
    fn options_equality_ignores_header_order_but_not_prefix() {
        let a = SyncOptions {
            headers: vec!["X-A=1".into(), "X-B=2".into()],
            ..Default::default()
        };
        let b = SyncOptions {
            headers: vec!["X-B=2".into(), "X-A=1".into()],
            ..Default::default()
        };
        assert_eq!(a, b);

        let c = SyncOptions {
            host_prefix: Some("ws-".into()),
            ..b.clone()
        };
        assert_ne!(b, c);
    }

    #[test]
    fn as_list_skips_defaults() {
        assert!(SyncOptions::default().as_list().is_empty());

        let opts = SyncOptions {
            ssh_options: vec!["ForwardAgent=yes".into()],
            wait: WaitMode::Yes,
            disable_autostart: true,
            hostname_suffix: Some("corp".into()),
            headers: vec!["X-Team=infra".into()],
            ..Default::default()
        };
        assert_eq!(
            opts.as_list(),
            vec![
                "wait: yes".to_string(),
                "ssh-hostname-suffix: corp".to_string(),
                "disable-autostart: true".to_string(),
                "ssh-option: ForwardAgent=yes".to_string(),
                "header: X-Team=infra".to_string(),
            ]
        );
    }

    #[test]
    fn validate_rejects_option_without_separator() {
        let opts = SyncOptions {
            ssh_options: vec!["ForwardAgent".into()],
            ..Default::default()
        };
        assert_eq!(
            opts.validate(),
            Err(OptionError::InvalidSshOption("ForwardAgent".into()))
        );
    }

    #[test]
    fn validate_rejects_multiline_ssh_option() {
        let opts = SyncOptions {
            ssh_options: vec!["ForwardAgent=yes\nHost *".into()],
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(OptionError::InvalidSshOption(_))));
    }

    #[test]
    fn validate_rejects_unusable_host_affixes() {
        for (prefix, suffix) in [(Some("my host."), None), (None, Some("corp#x")), (None, Some("a\nb"))] {
            let opts = SyncOptions {
                host_prefix: prefix.map(Into::into),
                hostname_suffix: suffix.map(Into::into),
                ..Default::default()
            };
            assert!(matches!(opts.validate(), Err(OptionError::HostName { .. })), "{opts:?}");
        }
    }

    #[test]
    fn validate_checks_headers() {
        let ok = SyncOptions {
            headers: vec!["X-Env=a=b".into()],
            header_command: Some("printf X-Token=abc".into()),
            ..Default::default()
        };
        assert_eq!(ok.validate(), Ok(()));

        for header in ["X-Missing", "=value", "X-A=1\nX-B=2"] {
            let opts = SyncOptions {
                headers: vec![header.into()],
                ..Default::default()
            };
            assert_eq!(opts.validate(), Err(OptionError::InvalidHeader(header.into())));
        }

        let opts = SyncOptions {
            header_command: Some("a\nb".into()),
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(OptionError::InvalidHeaderCommand(_))));
    }

    #[test]
    fn deployment_defaults_to_coder_prefix() {
        let deployment = DeploymentSsh::default();
        assert_eq!(deployment.hostname_prefix, "coder.");
        assert!(deployment.hostname_suffix.is_none());
        assert!(deployment.ssh_config_options.is_empty());
    }

    #[test]
    fn workspace_hosts_constructor() {
        let hosts = WorkspaceHosts::new("dev", ["main"]);
        assert_eq!(hosts.name, "dev");
        assert_eq!(hosts.agents, vec!["main".to_string()]);
    }
}
