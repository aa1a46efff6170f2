//! Atomic writer.
//!
//! Bytes go to a temp file in the destination's directory, which is fsynced
//! and closed before being renamed over the destination. Same directory
//! means same filesystem, so the rename is atomic on POSIX.
//!
//! A failure before the rename leaves the destination untouched and the
//! temp file on disk for inspection.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{io_err, SyncError};

/// Replace `path` with the bytes read from `contents`.
///
/// Always rewrites, even when the bytes match what is already on disk.
/// Existing permissions on `path` carry over to the new file.
pub fn write_atomic(path: &Path, mut contents: impl Read) -> Result<(), SyncError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_dir(dir)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (mut file, tmp) = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .tempfile_in(dir)
        .map_err(|e| io_err(dir, e))?
        .keep()
        .map_err(|e| io_err(dir, e.error))?;
    tracing::debug!("writing temp file: {}", tmp.display());

    match fs::metadata(path) {
        Ok(meta) => file
            .set_permissions(meta.permissions())
            .map_err(|e| io_err(&tmp, e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    io::copy(&mut contents, &mut file).map_err(|e| io_err(&tmp, e))?;
    file.sync_all().map_err(|e| io_err(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;

    tracing::info!("wrote: {}", path.display());
    Ok(())
}

#[cfg(unix)]
fn create_dir(dir: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(|e| io_err(dir, e))
}

#[cfg(not(unix))]
fn create_dir(dir: &Path) -> Result<(), SyncError> {
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
}
