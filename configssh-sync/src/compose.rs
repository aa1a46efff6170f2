//! Desired-state composer: renders the managed `~/.ssh/coder` file.
//!
//! # Layout
//!
//! ```text
//! # This file is managed by coder. DO NOT EDIT.
//! #
//! # You should not hand-edit this file, all changes will be lost when running
//! # "coder config-ssh".
//! #
//! # Last config-ssh options:          <- only when non-default options exist
//! # :ssh-option=ForwardAgent=yes
//! #
//!
//! Host coder.dev
//! 	ForwardAgent=yes                  <- user options, in order
//! 	ServerAliveInterval 30            <- deployment options, by key
//! 	HostName coder.dev                <- fixed hardening directives
//! 	ConnectTimeout=0
//! 	StrictHostKeyChecking=no
//! 	UserKnownHostsFile=/dev/null
//! 	LogLevel ERROR
//! 	ProxyCommand /usr/bin/coder --global-config /home/me/.config/coderv2 ssh --stdio dev
//! ```
//!
//! An option with an empty value (`-o LogLevel=`) drops that keyword from
//! the stanza, fixed directives included.
//!
//! The output is a pure function of its inputs and is regenerated in full
//! on every run.

use configssh_core::{
    options::{check_host_affix, record_lines},
    DeploymentSsh, Escaper, OptionSet, SyncOptions, WaitMode, WorkspaceHosts,
};

use crate::error::SyncError;

/// First line of the managed file. Anything else at the top means the
/// file is not ours.
pub const MANAGED_HEADER: &str = "# This file is managed by coder. DO NOT EDIT.";

const MANAGED_DOCS: &str = "\
#
# You should not hand-edit this file, all changes will be lost when running
# \"coder config-ssh\".
";

const OPTIONS_HEADER: &str = "\
#
# Last config-ssh options:
";

/// Where `ProxyCommand` points: the CLI binary and its config root.
/// Both are unescaped; escaping happens per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub binary: String,
    pub config_root: String,
}

/// One addressable SSH destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// `workspace` or `workspace.agent`; unique within a run.
    pub display_name: String,
    /// The `Host` pattern, with prefix or suffix applied.
    pub host: String,
    /// Directive lines in stanza order, after removals.
    pub options: Vec<String>,
}

impl HostEntry {
    pub fn host_pattern(&self) -> &str {
        &self.host
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&format!("Host {}\n", self.host));
        for option in &self.options {
            out.push_str(&format!("\t{option}\n"));
        }
    }
}

/// The complete managed file for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredConfig {
    pub options: SyncOptions,
    pub entries: Vec<HostEntry>,
}

impl DesiredConfig {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(MANAGED_HEADER);
        out.push('\n');
        out.push_str(MANAGED_DOCS);

        let records = record_lines(&self.options);
        if !records.is_empty() {
            out.push_str(OPTIONS_HEADER);
            for line in records {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out.push_str("#\n");

        for entry in &self.entries {
            out.push('\n');
            entry.write_to(&mut out);
        }
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.render().into_bytes()
    }
}

/// Whether `data` looks like a file this module produced.
pub fn is_managed(data: &[u8]) -> bool {
    data.starts_with(MANAGED_HEADER.as_bytes())
}

/// How display names become `Host` patterns. User flags override the
/// deployment, and any suffix wins over a prefix.
enum HostNaming<'a> {
    Prefix(&'a str),
    Suffix(&'a str),
}

impl<'a> HostNaming<'a> {
    fn resolve(options: &'a SyncOptions, deployment: &'a DeploymentSsh) -> Result<Self, SyncError> {
        let suffix = options
            .hostname_suffix
            .as_deref()
            .or(deployment.hostname_suffix.as_deref())
            .filter(|s| !s.is_empty());
        let naming = match suffix {
            Some(suffix) => {
                check_host_affix("ssh-hostname-suffix", suffix)?;
                HostNaming::Suffix(suffix)
            }
            None => {
                let prefix = options
                    .host_prefix
                    .as_deref()
                    .unwrap_or(deployment.hostname_prefix.as_str());
                check_host_affix("ssh-host-prefix", prefix)?;
                HostNaming::Prefix(prefix)
            }
        };
        Ok(naming)
    }

    fn host(&self, display_name: &str) -> String {
        match self {
            HostNaming::Prefix(prefix) => format!("{prefix}{display_name}"),
            HostNaming::Suffix(suffix) => format!("{display_name}.{suffix}"),
        }
    }
}

/// Compose the desired managed file.
///
/// Workspaces are sorted by name and hostnames within a workspace are
/// sorted, so output is stable regardless of fetch order. An agent suffix
/// is applied iff the workspace has more than one agent.
pub fn compose(
    hosts: &[WorkspaceHosts],
    options: &SyncOptions,
    deployment: &DeploymentSsh,
    proxy: Option<&ProxyTarget>,
    escaper: &dyn Escaper,
) -> Result<DesiredConfig, SyncError> {
    let naming = HostNaming::resolve(options, deployment)?;
    let proxy_prefix = proxy
        .map(|p| -> Result<String, SyncError> {
            Ok(format!(
                "{} --global-config {}{} ssh --stdio{}",
                escaper.escape(&p.binary)?,
                escaper.escape(&p.config_root)?,
                header_flags(options),
                proxy_flags(options),
            ))
        })
        .transpose()?;
    let deployment_options: Vec<String> = deployment
        .ssh_config_options
        .iter()
        .map(|(key, value)| format!("{key} {value}"))
        .collect();

    let mut workspaces: Vec<&WorkspaceHosts> = hosts.iter().collect();
    workspaces.sort_by(|a, b| a.name.cmp(&b.name));

    let mut entries = Vec::new();
    for workspace in workspaces {
        let mut names: Vec<String> = match workspace.agents.as_slice() {
            [_] => vec![workspace.name.clone()],
            agents => agents
                .iter()
                .map(|agent| format!("{}.{agent}", workspace.name))
                .collect(),
        };
        names.sort();

        for display_name in names {
            let host = naming.host(&display_name);
            let mut directives = OptionSet::default();
            directives.extend(&options.ssh_options)?;
            directives.extend(&deployment_options)?;
            directives.extend([
                format!("HostName {host}"),
                "ConnectTimeout=0".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                // Without this the "REMOTE HOST IDENTITY CHANGED" warning appears.
                "UserKnownHostsFile=/dev/null".to_string(),
                // Silences "Permanently added ... to the list of known hosts".
                "LogLevel ERROR".to_string(),
            ])?;
            if let Some(prefix) = &proxy_prefix {
                directives.add(&format!(
                    "ProxyCommand {prefix} {}",
                    escaper.escape(&display_name)?
                ))?;
            }
            entries.push(HostEntry {
                display_name,
                host,
                options: directives.into_lines(),
            });
        }
    }

    Ok(DesiredConfig {
        options: options.clone(),
        entries,
    })
}

/// Root flags forwarding HTTP headers to `coder ssh`, quoted for the shell.
fn header_flags(options: &SyncOptions) -> String {
    let mut flags = String::new();
    for header in &options.headers {
        flags.push_str(&format!(" --header {header:?}"));
    }
    if let Some(command) = &options.header_command {
        flags.push_str(&format!(" --header-command {command:?}"));
    }
    flags
}

fn proxy_flags(options: &SyncOptions) -> String {
    let mut flags = String::new();
    if options.wait != WaitMode::Auto {
        flags.push_str(&format!(" --wait={}", options.wait));
    }
    if options.disable_autostart {
        flags.push_str(" --disable-autostart=true");
    }
    flags
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
