//! Resource fetcher: resolves reachable agents for every workspace.
//!
//! Lookups are I/O bound and independent, so they run concurrently: one
//! future per workspace, each writing into its own pre-sized slot keyed by
//! the workspace's position in the listing. The fan-out is joined before
//! anything reads the slots, so downstream output never depends on arrival
//! order.
//!
//! The first failing lookup aborts the whole fetch. Returning early drops
//! the remaining futures, which cancels every in-flight request.

use std::future::Future;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};

use configssh_core::WorkspaceHosts;

use crate::error::{DirectoryError, FetchError};

/// A workspace as listed by the directory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub name: String,
    /// Template version of the latest build; resources hang off this.
    pub template_version_id: String,
}

/// The workspace directory service.
pub trait WorkspaceDirectory {
    /// Workspaces owned by the current user.
    fn workspaces(&self) -> impl Future<Output = Result<Vec<Workspace>, DirectoryError>>;

    /// Agent names exposed by the workspace's `start` transition resources.
    fn agents(
        &self,
        workspace: &Workspace,
    ) -> impl Future<Output = Result<Vec<String>, DirectoryError>>;
}

/// Resolve agent names for every workspace, bounded by `timeout`.
///
/// On timeout every in-flight lookup is dropped and a single
/// [`FetchError::Timeout`] is returned.
pub async fn fetch_workspace_hosts<D: WorkspaceDirectory>(
    directory: &D,
    timeout: Duration,
) -> Result<Vec<WorkspaceHosts>, FetchError> {
    match tokio::time::timeout(timeout, fan_out(directory)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

async fn fan_out<D: WorkspaceDirectory>(directory: &D) -> Result<Vec<WorkspaceHosts>, FetchError> {
    let workspaces = directory
        .workspaces()
        .await
        .map_err(FetchError::ListWorkspaces)?;
    tracing::debug!(count = workspaces.len(), "resolving workspace agents");

    let mut slots: Vec<Option<WorkspaceHosts>> = vec![None; workspaces.len()];
    let mut lookups: FuturesUnordered<_> = workspaces
        .iter()
        .enumerate()
        .map(|(index, workspace)| async move { (index, directory.agents(workspace).await) })
        .collect();

    while let Some((index, result)) = lookups.next().await {
        let workspace = &workspaces[index];
        let agents = result.map_err(|source| FetchError::Workspace {
            workspace: workspace.name.clone(),
            source,
        })?;
        tracing::debug!(workspace = %workspace.name, agents = agents.len(), "resolved");
        slots[index] = Some(WorkspaceHosts {
            name: workspace.name.clone(),
            agents,
        });
    }

    Ok(slots.into_iter().flatten().collect())
}

// ---------------------------------------------------------------------------
// StaticDirectory
// ---------------------------------------------------------------------------

/// A directory backed by a fixed host list. Used for fixtures and for
/// exercising the pipeline without a deployment.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    hosts: Vec<WorkspaceHosts>,
}

impl StaticDirectory {
    pub fn new(hosts: Vec<WorkspaceHosts>) -> Self {
        Self { hosts }
    }
}

impl WorkspaceDirectory for StaticDirectory {
    async fn workspaces(&self) -> Result<Vec<Workspace>, DirectoryError> {
        Ok(self
            .hosts
            .iter()
            .map(|h| Workspace {
                name: h.name.clone(),
                template_version_id: h.name.clone(),
            })
            .collect())
    }

    async fn agents(&self, workspace: &Workspace) -> Result<Vec<String>, DirectoryError> {
        self.hosts
            .iter()
            .find(|h| h.name == workspace.name)
            .map(|h| h.agents.clone())
            .ok_or_else(|| format!("workspace '{}' not found", workspace.name).into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
