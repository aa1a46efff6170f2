//! coder: workspace CLI. Only `config-ssh` lives here.
//!
//! # Usage
//!
//! ```text
//! coder [--global-config <dir>] [--header <key=value>]... [--header-command <cmd>]
//!     config-ssh [-o <option>]... [--diff] [--yes] [--ssh-config-file <path>]
//!     [--ssh-host-prefix <prefix>] [--ssh-hostname-suffix <suffix>]
//!     [--use-previous-options] [--wait yes|no|auto] [--disable-autostart]
//!     [--coder-binary-path <path>]
//! ```

mod binpath;
mod client;
mod commands;
mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use client::HeaderSource;
use commands::config_ssh::ConfigSshArgs;
use configssh_core::{EscapeOptions, Platform};

#[derive(Parser, Debug)]
#[command(
    name = "coder",
    version,
    about = "Connect to your workspaces over SSH",
    long_about = None,
)]
struct Cli {
    /// Path to the global coder config directory.
    #[arg(long, global = true, env = "CODER_CONFIG_DIR", value_name = "DIR")]
    global_config: Option<PathBuf>,

    /// Additional HTTP headers added to all requests, as key=value. Can be
    /// specified multiple times.
    #[arg(long = "header", global = true, env = "CODER_HEADER", value_name = "KEY=VALUE")]
    headers: Vec<String>,

    /// An external command that outputs additional HTTP headers, one
    /// key=value per line.
    #[arg(long, global = true, env = "CODER_HEADER_COMMAND")]
    header_command: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add an SSH Host entry for your workspaces "ssh coder.workspace".
    #[command(name = "config-ssh")]
    ConfigSsh(ConfigSshArgs),
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let escape = EscapeOptions::for_platform(Platform::current());
    let matches = Cli::command()
        .mut_subcommand("config-ssh", |sub| {
            sub.mut_arg("force_unix_filepaths", |arg| {
                arg.hide(escape.hide_force_unix_slashes)
            })
        })
        .get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let config_root = match cli.global_config {
        Some(dir) => dir,
        None => dirs::config_dir()
            .context("could not determine config directory")?
            .join("coderv2"),
    };

    let headers = HeaderSource {
        headers: cli.headers,
        command: cli.header_command,
    };

    match cli.command {
        Commands::ConfigSsh(args) => args.run(&config_root, &headers, escape),
    }
}

/// Diagnostics go to stderr; stdout is reserved for diffs and messages.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
