//! HTTP workspace directory backed by the deployment's REST API.
//!
//! The config root holds two plain-text files written by `coder login`:
//! `url` (deployment base URL) and `session` (session token).

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;

use configssh_core::{DeploymentSsh, HOST_PREFIX};
use configssh_sync::{DirectoryError, Workspace, WorkspaceDirectory};

const NOT_LOGGED_IN: &str = "You are not logged in. Try logging in using 'coder login <url>'.";
const SESSION_HEADER: &str = "Coder-Session-Token";
const DEPLOYMENT_SSH_PATH: &str = "/api/v2/deployment/ssh";

/// Extra HTTP headers sent with every request.
#[derive(Debug, Clone, Default)]
pub struct HeaderSource {
    /// `key=value` pairs from `--header`.
    pub headers: Vec<String>,
    /// Shell command printing one `key=value` per line.
    pub command: Option<String>,
}

impl HeaderSource {
    /// Resolve to a header map, running the header command if set.
    fn resolve(&self, base_url: &str) -> Result<HeaderMap> {
        let mut lines = self.headers.clone();
        if let Some(command) = &self.command {
            lines.extend(run_header_command(command, base_url)?);
        }
        let mut map = HeaderMap::new();
        for line in &lines {
            let Some((name, value)) = line.split_once('=') else {
                bail!("split header {line:?} had less than two parts");
            };
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name in {line:?}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid header value in {line:?}"))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

fn run_header_command(command: &str, base_url: &str) -> Result<Vec<String>> {
    let (shell, flag) = if cfg!(windows) { ("cmd.exe", "/c") } else { ("sh", "-c") };
    let output = Command::new(shell)
        .args([flag, command])
        .env("CODER_URL", base_url)
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("failed to run {shell} {flag} {command:?}"))?;
    if !output.status.success() {
        bail!("failed to run {shell} {flag} {command:?}: {}", output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Deserialize)]
struct WorkspacesResponse {
    #[serde(default)]
    workspaces: Vec<WorkspaceBody>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceBody {
    name: String,
    latest_build: BuildBody,
}

#[derive(Debug, Deserialize)]
struct BuildBody {
    template_version_id: String,
}

#[derive(Debug, Deserialize)]
struct ResourceBody {
    transition: String,
    #[serde(default)]
    agents: Option<Vec<AgentBody>>,
}

#[derive(Debug, Deserialize)]
struct AgentBody {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SshConfigBody {
    #[serde(default)]
    hostname_prefix: String,
    #[serde(default)]
    hostname_suffix: String,
    #[serde(default)]
    ssh_config_options: Option<BTreeMap<String, String>>,
}

impl From<SshConfigBody> for DeploymentSsh {
    /// An empty prefix would name hosts after bare workspaces, so it falls
    /// back to the default like a missing endpoint does.
    fn from(body: SshConfigBody) -> Self {
        let hostname_prefix = if body.hostname_prefix.is_empty() {
            HOST_PREFIX.to_string()
        } else {
            body.hostname_prefix
        };
        Self {
            hostname_prefix,
            hostname_suffix: (!body.hostname_suffix.is_empty()).then_some(body.hostname_suffix),
            ssh_config_options: body.ssh_config_options.unwrap_or_default(),
        }
    }
}

pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpDirectory {
    /// Load `url` and `session` from the config root.
    pub fn from_config_root(root: &Path, headers: &HeaderSource) -> Result<Self> {
        let Some(base_url) = read_trimmed(&root.join("url"))? else {
            bail!(NOT_LOGGED_IN);
        };
        let Some(token) = read_trimmed(&root.join("session"))? else {
            bail!(NOT_LOGGED_IN);
        };
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .default_headers(headers.resolve(&base_url).context("create header transport")?)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// SSH settings published by the deployment. Deployments that predate
    /// the endpoint answer 404 and get the defaults.
    pub async fn deployment_ssh(&self) -> Result<DeploymentSsh, DirectoryError> {
        let response = self.send(DEPLOYMENT_SSH_PATH, &[]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("deployment has no ssh config endpoint, using defaults");
            return Ok(DeploymentSsh::default());
        }
        let body: SshConfigBody = response.error_for_status()?.json().await?;
        Ok(body.into())
    }

    async fn send(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, DirectoryError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .header(SESSION_HEADER, &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(NOT_LOGGED_IN.into());
        }
        Ok(response)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DirectoryError> {
        Ok(self.send(path, query).await?.error_for_status()?.json().await?)
    }
}

impl WorkspaceDirectory for HttpDirectory {
    async fn workspaces(&self) -> Result<Vec<Workspace>, DirectoryError> {
        let body: WorkspacesResponse = self
            .get("/api/v2/workspaces", &[("q", "owner:me")])
            .await?;
        Ok(body
            .workspaces
            .into_iter()
            .map(|w| Workspace {
                name: w.name,
                template_version_id: w.latest_build.template_version_id,
            })
            .collect())
    }

    async fn agents(&self, workspace: &Workspace) -> Result<Vec<String>, DirectoryError> {
        let path = format!(
            "/api/v2/templateversions/{}/resources",
            workspace.template_version_id
        );
        let resources: Vec<ResourceBody> = self.get(&path, &[]).await?;
        Ok(start_agents(resources))
    }
}

/// Agent names from resources provisioned on workspace start.
fn start_agents(resources: Vec<ResourceBody>) -> Vec<String> {
    resources
        .into_iter()
        .filter(|r| r.transition == "start")
        .flat_map(|r| r.agents.unwrap_or_default())
        .map(|a| a.name)
        .collect()
}

fn read_trimmed(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let value = raw.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}
