//! Reconciler: compares on-disk bytes with desired bytes.
//!
//! Byte equality is the only test for "no change"; no ssh config grammar
//! is parsed here. Diffs are rendered with `similar` and a file counts as
//! changed only if its diff has at least one hunk.

use std::path::{Path, PathBuf};

use similar::TextDiff;

use configssh_core::ManagedFile;

use crate::migrate::{Migration, INCLUDE_STATEMENT};

/// Old and new bytes for one managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    pub kind: ManagedFile,
    pub path: PathBuf,
    pub old: Vec<u8>,
    pub new: Vec<u8>,
}

impl FileState {
    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

/// A single file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub kind: ManagedFile,
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Pending changes for one run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// One-line descriptions, in a fixed order: legacy removal, include
    /// insertion or deduplication, managed file write/update.
    pub changes: Vec<String>,
    pub diffs: Vec<FileDiff>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn files_differ(&self) -> bool {
        !self.diffs.is_empty()
    }
}

/// Build the change list and diffs for the primary config and managed file.
pub fn reconcile(ssh: &FileState, coder: &FileState, migration: &Migration) -> ChangeSet {
    let mut changes = Vec::new();

    if migration.removed_legacy {
        changes.push(format!(
            "Remove old auto-generated coder config from {}",
            ssh.path.display()
        ));
    }
    if migration.added_include {
        changes.push(format!(
            "Add {INCLUDE_STATEMENT:?} to {}",
            ssh.path.display()
        ));
    }
    if migration.removed_duplicate_includes {
        changes.push(format!(
            "Remove duplicate {INCLUDE_STATEMENT:?} from {}",
            ssh.path.display()
        ));
    }
    if coder.is_changed() {
        if coder.old.is_empty() {
            changes.push(format!(
                "Write auto-generated coder config file to {}",
                coder.path.display()
            ));
        } else {
            changes.push(format!(
                "Update auto-generated coder config file in {}",
                coder.path.display()
            ));
        }
    }

    let diffs = [ssh, coder]
        .into_iter()
        .filter(|file| file.is_changed())
        .filter_map(|file| {
            unified_diff(&file.path, &file.old, &file.new).map(|unified_diff| FileDiff {
                kind: file.kind,
                path: file.path.clone(),
                unified_diff,
            })
        })
        .collect();

    ChangeSet { changes, diffs }
}

/// Unified diff of `old` → `new` labelled with `path`, or `None` when the
/// diff has no hunks.
pub fn unified_diff(path: &Path, old: &[u8], new: &[u8]) -> Option<String> {
    let old = String::from_utf8_lossy(old);
    let new = String::from_utf8_lossy(new);
    let label = path.display().to_string();

    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());
    let mut unified = diff.unified_diff();
    unified.context_radius(3).header(&label, &label);
    if unified.iter_hunks().next().is_none() {
        return None;
    }
    Some(unified.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(kind: ManagedFile, path: &str, old: &str, new: &str) -> FileState {
        FileState {
            kind,
            path: PathBuf::from(path),
            old: old.as_bytes().to_vec(),
            new: new.as_bytes().to_vec(),
        }
    }

    fn no_migration(bytes: &str) -> Migration {
        Migration {
            bytes: bytes.as_bytes().to_vec(),
            removed_legacy: false,
            added_include: false,
            removed_duplicate_includes: false,
        }
    }

    #[test]
    fn identical_files_produce_empty_changeset() {
        let ssh = state(ManagedFile::SshConfig, "/h/.ssh/config", "Include coder\n", "Include coder\n");
        let coder = state(ManagedFile::CoderConfig, "/h/.ssh/coder", "x\n", "x\n");
        let set = reconcile(&ssh, &coder, &no_migration("Include coder\n"));
        assert!(set.is_empty());
        assert!(!set.files_differ());
    }

    #[test]
    fn change_descriptions_follow_fixed_order() {
        let ssh = state(ManagedFile::SshConfig, "/h/.ssh/config", "old", "Include coder\n\nnew");
        let coder = state(ManagedFile::CoderConfig, "/h/.ssh/coder", "", "generated\n");
        let migration = Migration {
            bytes: ssh.new.clone(),
            removed_legacy: true,
            added_include: true,
            removed_duplicate_includes: false,
        };
        let set = reconcile(&ssh, &coder, &migration);
        assert_eq!(
            set.changes,
            vec![
                "Remove old auto-generated coder config from /h/.ssh/config".to_string(),
                "Add \"Include coder\" to /h/.ssh/config".to_string(),
                "Write auto-generated coder config file to /h/.ssh/coder".to_string(),
            ]
        );
        assert_eq!(set.diffs.len(), 2);
        assert_eq!(set.diffs[0].kind, ManagedFile::SshConfig);
        assert_eq!(set.diffs[1].kind, ManagedFile::CoderConfig);
    }

    #[test]
    fn existing_managed_file_is_updated_not_written() {
        let ssh = state(ManagedFile::SshConfig, "/c", "Include coder\n", "Include coder\n");
        let coder = state(ManagedFile::CoderConfig, "/m", "v1\n", "v2\n");
        let set = reconcile(&ssh, &coder, &no_migration("Include coder\n"));
        assert_eq!(set.changes, vec!["Update auto-generated coder config file in /m".to_string()]);
    }

    #[test]
    fn duplicate_include_removal_is_listed() {
        let ssh = state(
            ManagedFile::SshConfig,
            "/h/.ssh/config",
            "Include coder\nInclude coder\n",
            "Include coder\n",
        );
        let coder = state(ManagedFile::CoderConfig, "/h/.ssh/coder", "x\n", "x\n");
        let migration = Migration {
            bytes: ssh.new.clone(),
            removed_legacy: false,
            added_include: false,
            removed_duplicate_includes: true,
        };
        let set = reconcile(&ssh, &coder, &migration);
        assert_eq!(
            set.changes,
            vec!["Remove duplicate \"Include coder\" from /h/.ssh/config".to_string()]
        );
        assert_eq!(set.diffs.len(), 1);
        assert!(set.diffs[0].unified_diff.lines().any(|l| l == "-Include coder"));
    }

    #[test]
    fn unified_diff_has_headers_and_hunk() {
        let diff = unified_diff(Path::new("/h/.ssh/coder"), b"a\nb\n", b"a\nc\n").expect("diff");
        assert!(diff.contains("--- /h/.ssh/coder"));
        assert!(diff.contains("+++ /h/.ssh/coder"));
        assert!(diff.contains("@@"));
        assert!(diff.lines().any(|l| l == "-b"));
        assert!(diff.lines().any(|l| l == "+c"));
    }

    #[test]
    fn unified_diff_without_hunks_is_none() {
        assert!(unified_diff(Path::new("/x"), b"same\n", b"same\n").is_none());
        assert!(unified_diff(Path::new("/x"), b"", b"").is_none());
    }

    #[test]
    fn missing_trailing_newline_is_a_difference() {
        assert!(unified_diff(Path::new("/x"), b"a", b"a\n").is_some());
    }
}
