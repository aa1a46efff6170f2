//! Locating the binary that `ProxyCommand` runs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// clap value parser for `--coder-binary-path`.
pub fn parse_binary_path(value: &str) -> Result<String, String> {
    // Windows paths are accepted as given.
    if cfg!(windows) || Path::new(value).is_absolute() {
        Ok(value.to_string())
    } else {
        Err("coder cli path must be an absolute path".to_string())
    }
}

/// The explicit path if given, otherwise the running executable.
///
/// ssh runs `ProxyCommand` with its own environment, so a running binary
/// that `$PATH` would not find (or would resolve elsewhere) gets a warning.
pub fn resolve(explicit: Option<&str>) -> Result<String> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }
    let exe = std::env::current_exe().context("get executable path")?;
    match check_on_path(&exe, std::env::var_os("PATH")) {
        PathCheck::Matches => {}
        PathCheck::Missing => tracing::warn!(
            "The current executable is not in $PATH. This may lead to problems connecting to \
             your workspace via SSH. Please move {} to a location in your $PATH and run \
             `coder config-ssh` again.",
            exe.display()
        ),
        PathCheck::Differs(found) => tracing::warn!(
            current = %exe.display(),
            in_path = %found.display(),
            "The current executable path does not match the executable path found in $PATH. \
             This may cause issues connecting to your workspace via SSH."
        ),
    }
    Ok(exe.to_string_lossy().into_owned())
}

#[derive(Debug, PartialEq, Eq)]
enum PathCheck {
    Matches,
    Missing,
    Differs(PathBuf),
}

/// Look up the executable's file name in `paths` and compare the hit with
/// `exe`. Symlinks are resolved on both sides.
fn check_on_path(exe: &Path, paths: Option<OsString>) -> PathCheck {
    let Some(name) = exe.file_name() else {
        return PathCheck::Missing;
    };
    let cwd = std::env::current_dir().unwrap_or_default();
    match which::which_in(name, paths, cwd) {
        Ok(found) if clean(&found) == clean(exe) => PathCheck::Matches,
        Ok(found) => PathCheck::Differs(found),
        Err(e) => {
            tracing::debug!("{} not found in PATH: {e}", name.to_string_lossy());
            PathCheck::Missing
        }
    }
}

fn clean(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn relative_binary_path_is_rejected() {
        assert!(parse_binary_path("bin/coder").is_err());
        assert_eq!(
            parse_binary_path("/usr/local/bin/coder").unwrap(),
            "/usr/local/bin/coder"
        );
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(resolve(Some("/opt/coder")).unwrap(), "/opt/coder");
    }

    #[test]
    fn defaults_to_current_executable() {
        let resolved = resolve(None).unwrap();
        assert!(Path::new(&resolved).is_absolute());
    }

    #[cfg(unix)]
    mod lookup {
        use std::fs;
        use std::os::unix::fs::{symlink, PermissionsExt};

        use tempfile::TempDir;

        use super::super::*;

        fn install(dir: &Path) -> PathBuf {
            let bin = dir.join("coder");
            fs::write(&bin, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
            bin
        }

        #[test]
        fn same_binary_on_path_matches() {
            let dir = TempDir::new().unwrap();
            let exe = install(dir.path());
            let check = check_on_path(&exe, Some(dir.path().as_os_str().to_owned()));
            assert_eq!(check, PathCheck::Matches);
        }

        #[test]
        fn symlink_to_same_binary_matches() {
            let real = TempDir::new().unwrap();
            let linked = TempDir::new().unwrap();
            let exe = install(real.path());
            symlink(&exe, linked.path().join("coder")).unwrap();
            let check = check_on_path(&exe, Some(linked.path().as_os_str().to_owned()));
            assert_eq!(check, PathCheck::Matches);
        }

        #[test]
        fn other_binary_on_path_differs() {
            let running = TempDir::new().unwrap();
            let installed = TempDir::new().unwrap();
            let exe = install(running.path());
            let other = install(installed.path());
            let check = check_on_path(&exe, Some(installed.path().as_os_str().to_owned()));
            assert_eq!(check, PathCheck::Differs(other));
        }

        #[test]
        fn binary_absent_from_path_is_missing() {
            let running = TempDir::new().unwrap();
            let empty = TempDir::new().unwrap();
            let exe = install(running.path());
            let check = check_on_path(&exe, Some(empty.path().as_os_str().to_owned()));
            assert_eq!(check, PathCheck::Missing);
            assert_eq!(check_on_path(&exe, None), PathCheck::Missing);
        }
    }
}
