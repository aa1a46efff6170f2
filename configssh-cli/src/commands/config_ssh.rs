//! `coder config-ssh`: keep `~/.ssh/config` and `~/.ssh/coder` in sync with
//! the user's workspaces.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;

use configssh_core::{EscapeOptions, Platform, SyncOptions, WaitMode};
use configssh_sync::{
    apply, fetch_workspace_hosts, plan, read_current, Plan, ProxyTarget, SyncPaths, SyncRequest,
    WriteResult,
};

use crate::binpath;
use crate::client::{HeaderSource, HttpDirectory};
use crate::prompt::{Answer, Prompt};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments for `coder config-ssh`.
#[derive(Args, Debug)]
pub struct ConfigSshArgs {
    /// Specifies the path to an SSH config.
    #[arg(long, env = "CODER_SSH_CONFIG_FILE", default_value = "~/.ssh/config")]
    pub ssh_config_file: String,

    /// Specifies the path to the generated coder SSH config.
    #[arg(long, hide = true, default_value = "~/.ssh/coder")]
    pub ssh_coder_config_file: String,

    /// Specifies additional SSH options to embed in each host stanza.
    #[arg(short = 'o', long = "ssh-option", env = "CODER_SSH_CONFIG_OPTS")]
    pub ssh_option: Vec<String>,

    /// Show diff of changes that will be made.
    #[arg(short = 'D', long)]
    pub diff: bool,

    /// Specifies whether the ProxyCommand option should be skipped.
    #[arg(long, hide = true)]
    pub skip_proxy_command: bool,

    /// Override the default host prefix.
    #[arg(long, env = "CODER_CONFIGSSH_SSH_HOST_PREFIX")]
    pub ssh_host_prefix: Option<String>,

    /// Override the default hostname suffix. Takes precedence over a prefix.
    #[arg(long, env = "CODER_CONFIGSSH_SSH_HOSTNAME_SUFFIX")]
    pub ssh_hostname_suffix: Option<String>,

    /// Specifies whether or not to keep options from previous run of config-ssh.
    #[arg(long, env = "CODER_SSH_USE_PREVIOUS_OPTIONS")]
    pub use_previous_options: bool,

    /// Specifies whether or not to wait for the startup script to finish executing.
    #[arg(long, env = "CODER_CONFIGSSH_WAIT", default_value = "auto", value_name = "yes|no|auto")]
    pub wait: WaitMode,

    /// Disable starting the workspace automatically when connecting via SSH.
    #[arg(long, env = "CODER_CONFIGSSH_DISABLE_AUTOSTART")]
    pub disable_autostart: bool,

    /// Use '/' as the path separator in ProxyCommand, for unix-like shells on Windows.
    #[arg(long, env = "CODER_CONFIGSSH_UNIX_FILEPATHS")]
    pub force_unix_filepaths: bool,

    /// Absolute path to the coder binary used in ProxyCommand. Defaults to
    /// the binary running this command.
    #[arg(long, env = "CODER_SSH_CONFIG_BINARY_PATH", value_parser = binpath::parse_binary_path)]
    pub coder_binary_path: Option<String>,

    /// Bypass prompts.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl ConfigSshArgs {
    pub fn run(
        self,
        config_root: &Path,
        headers: &HeaderSource,
        escape: EscapeOptions,
    ) -> Result<ExitCode> {
        if self.skip_proxy_command && self.wait != WaitMode::Auto {
            bail!("cannot specify both --skip-proxy-command and --wait");
        }

        let escaper = Platform::current().escaper(EscapeOptions {
            force_unix_separators: escape.force_unix_separators || self.force_unix_filepaths,
            ..escape
        });
        let paths = SyncPaths {
            ssh_config: expand_home(&self.ssh_config_file)?,
            coder_config: expand_home(&self.ssh_coder_config_file)?,
        };
        let current = read_current(&paths).context("read ssh config failed")?;

        let prompt = Prompt::new(self.yes);
        let mut changes = Vec::new();
        let mut options = SyncOptions {
            ssh_options: self.ssh_option.clone(),
            wait: self.wait,
            disable_autostart: self.disable_autostart,
            host_prefix: non_empty(self.ssh_host_prefix.as_deref()),
            hostname_suffix: non_empty(self.ssh_hostname_suffix.as_deref()),
            headers: headers.headers.clone(),
            header_command: non_empty(headers.command.as_deref()),
        };
        if let Some(last) = current.last_options() {
            if self.use_previous_options {
                options = last;
            } else if !self.diff && options != last {
                options.validate().context("invalid option from flag")?;
                match prompt.confirm(&options_question(&options, &last))? {
                    Answer::Yes => changes.push("Use new options".to_string()),
                    Answer::No => options = last,
                    Answer::Canceled => return Ok(ExitCode::SUCCESS),
                }
                if prompt.interactive() {
                    println!();
                }
            }
        }

        let proxy = if self.skip_proxy_command {
            None
        } else {
            Some(ProxyTarget {
                binary: binpath::resolve(self.coder_binary_path.as_deref())?,
                config_root: config_root.to_string_lossy().into_owned(),
            })
        };

        let directory = HttpDirectory::from_config_root(config_root, headers)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("start async runtime")?;
        let (hosts, deployment) = runtime.block_on(async {
            let hosts = fetch_workspace_hosts(&directory, FETCH_TIMEOUT).await?;
            let deployment = directory
                .deployment_ssh()
                .await
                .map_err(|e| anyhow!(e))
                .context("fetch coderd config failed")?;
            anyhow::Ok((hosts, deployment))
        })?;

        let request = SyncRequest {
            options: &options,
            deployment: &deployment,
            proxy: proxy.as_ref(),
            escaper: escaper.as_ref(),
        };
        let plan = plan(&paths, &current, &hosts, &request)?;
        changes.extend(plan.changes.changes.iter().cloned());

        if self.diff {
            return Ok(print_diff(&plan, &changes));
        }

        if changes.is_empty() {
            println!("No changes to make.");
            return Ok(ExitCode::SUCCESS);
        }

        let question = format!(
            "The following changes will be made to your SSH configuration:\n\n    * {}\n\n  Continue?",
            changes.join("\n    * ")
        );
        if prompt.confirm(&question)? != Answer::Yes {
            return Ok(ExitCode::SUCCESS);
        }
        if prompt.interactive() {
            println!();
        }

        for result in apply(&plan).context("write ssh config failed")? {
            if let WriteResult::Written { path } = result {
                println!("{} {:?}", "Updated".green(), path.display().to_string());
            }
        }

        match plan.desired.entries.first() {
            Some(entry) => {
                println!("You should now be able to ssh into your workspace.");
                println!("For example, try running:\n\n\t$ ssh {}", entry.host_pattern());
            }
            None => println!(
                "You don't have any workspaces yet, try creating one with:\n\n\t$ coder create <workspace>"
            ),
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Print the change list and unified diffs. Exit status 1 means at least
/// one file would change.
fn print_diff(plan: &Plan, changes: &[String]) -> ExitCode {
    if !plan.changes.files_differ() {
        println!("No changes to make.");
        return ExitCode::SUCCESS;
    }

    eprintln!(
        "Changes:\n\n  * {}\n",
        changes.join("\n  * ")
    );
    for diff in &plan.changes.diffs {
        for line in diff.unified_diff.lines() {
            println!("{}", color_line(line));
        }
    }
    ExitCode::from(1)
}

fn color_line(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold().to_string()
    } else if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else if line.starts_with("@@") {
        line.cyan().to_string()
    } else {
        line.to_string()
    }
}

fn options_question(new: &SyncOptions, old: &SyncOptions) -> String {
    format!(
        "New options differ from previous options:{}{}\n\n  Use new options?",
        options_block("New options", new),
        options_block("Previous options", old)
    )
}

fn options_block(label: &str, options: &SyncOptions) -> String {
    let list = options.as_list();
    if list.is_empty() {
        format!("\n\n  {label}: none")
    } else {
        format!("\n\n  {label}:\n    * {}", list.join("\n    * "))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir()
            .context("could not determine home directory")?
            .join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_are_kept() {
        assert_eq!(expand_home("/etc/ssh/config").unwrap(), PathBuf::from("/etc/ssh/config"));
        assert_eq!(expand_home("relative/config").unwrap(), PathBuf::from("relative/config"));
    }

    #[test]
    fn tilde_prefix_is_expanded() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/.ssh/config").unwrap(), home.join(".ssh/config"));
    }

    #[test]
    fn options_question_lists_both_sides() {
        let new = SyncOptions {
            ssh_options: vec!["ForwardAgent=yes".into()],
            ..Default::default()
        };
        let question = options_question(&new, &SyncOptions::default());
        assert!(question.contains("New options:\n    * ssh-option: ForwardAgent=yes"));
        assert!(question.contains("Previous options: none"));
        assert!(question.ends_with("Use new options?"));
    }
}
