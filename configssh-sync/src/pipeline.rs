//! Sync pipeline: read, plan, apply.
//!
//! [`plan`] is pure given the current file bytes and the fetched hosts, so
//! diff mode and the real run see exactly the same bytes. [`apply`] is the
//! only step that touches disk.

use std::io;
use std::path::{Path, PathBuf};

use configssh_core::{
    options::parse_last_options, DeploymentSsh, Escaper, ManagedFile, SyncOptions, WorkspaceHosts,
};

use crate::compose::{compose, is_managed, DesiredConfig, ProxyTarget};
use crate::error::{io_err, SyncError};
use crate::migrate::migrate;
use crate::reconcile::{reconcile, ChangeSet, FileState};
use crate::writer::write_atomic;

/// Locations of the primary config and the managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPaths {
    pub ssh_config: PathBuf,
    pub coder_config: PathBuf,
}

/// On-disk bytes at the start of a run. Missing files read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentFiles {
    pub ssh_config: Vec<u8>,
    pub coder_config: Vec<u8>,
}

impl CurrentFiles {
    /// Options recorded by the previous run, if there was one.
    pub fn last_options(&self) -> Option<SyncOptions> {
        if self.coder_config.is_empty() {
            return None;
        }
        Some(parse_last_options(&self.coder_config))
    }
}

/// Read both files.
///
/// Fails on any read error other than not-found, and on a non-empty managed
/// file that we did not write.
pub fn read_current(paths: &SyncPaths) -> Result<CurrentFiles, SyncError> {
    let ssh_config = read_or_empty(&paths.ssh_config)?;
    let coder_config = read_or_empty(&paths.coder_config)?;
    if !coder_config.is_empty() && !is_managed(&coder_config) {
        return Err(SyncError::UnknownManagedFile {
            path: paths.coder_config.clone(),
        });
    }
    Ok(CurrentFiles {
        ssh_config,
        coder_config,
    })
}

fn read_or_empty(path: &Path) -> Result<Vec<u8>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("not found, treating as empty: {}", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(io_err(path, e)),
    }
}

/// Per-run inputs to [`plan`] besides the hosts.
pub struct SyncRequest<'a> {
    pub options: &'a SyncOptions,
    pub deployment: &'a DeploymentSsh,
    /// `None` skips `ProxyCommand` entirely.
    pub proxy: Option<&'a ProxyTarget>,
    pub escaper: &'a dyn Escaper,
}

/// Everything a run would do, computed without touching disk.
#[derive(Debug, Clone)]
pub struct Plan {
    pub ssh_config: FileState,
    pub coder_config: FileState,
    pub changes: ChangeSet,
    pub desired: DesiredConfig,
}

/// Compose, migrate and reconcile.
pub fn plan(
    paths: &SyncPaths,
    current: &CurrentFiles,
    hosts: &[WorkspaceHosts],
    request: &SyncRequest<'_>,
) -> Result<Plan, SyncError> {
    request.options.validate()?;
    let desired = compose(
        hosts,
        request.options,
        request.deployment,
        request.proxy,
        request.escaper,
    )?;
    let migration = migrate(&current.ssh_config);

    let ssh_config = FileState {
        kind: ManagedFile::SshConfig,
        path: paths.ssh_config.clone(),
        old: current.ssh_config.clone(),
        new: migration.bytes.clone(),
    };
    let coder_config = FileState {
        kind: ManagedFile::CoderConfig,
        path: paths.coder_config.clone(),
        old: current.coder_config.clone(),
        new: desired.to_bytes(),
    };
    let changes = reconcile(&ssh_config, &coder_config, &migration);
    tracing::debug!(
        entries = desired.entries.len(),
        changes = changes.changes.len(),
        "planned"
    );

    Ok(Plan {
        ssh_config,
        coder_config,
        changes,
        desired,
    })
}

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Written { path: PathBuf },
    /// Bytes on disk already match.
    Unchanged { path: PathBuf },
}

/// Write every changed file in `plan`.
///
/// The managed file goes first so the `Include coder` line never points at
/// a file that is missing or stale.
pub fn apply(plan: &Plan) -> Result<Vec<WriteResult>, SyncError> {
    let mut results = Vec::with_capacity(2);
    for file in [&plan.coder_config, &plan.ssh_config] {
        if !file.is_changed() {
            tracing::debug!("unchanged: {}", file.path.display());
            results.push(WriteResult::Unchanged {
                path: file.path.clone(),
            });
            continue;
        }
        write_atomic(&file.path, file.new.as_slice())?;
        results.push(WriteResult::Written {
            path: file.path.clone(),
        });
    }
    Ok(results)
}
