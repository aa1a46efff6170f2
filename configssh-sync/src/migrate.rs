//! Legacy migrator for the user's primary `~/.ssh/config`.
//!
//! Older releases wrote the host stanzas inline between two sentinel
//! comments. The current layout keeps them in `~/.ssh/coder` and pulls
//! them in with a single `Include coder` line, which must come before the
//! first `Host` or `Match` block or ssh would only apply it conditionally.
//! Repeated include lines are collapsed into that one.
//!
//! Nothing here can fail: unrecognised content is left untouched.

use std::ops::Range;
use std::sync::OnceLock;

use regex::bytes::Regex;

pub const LEGACY_START: &str = "# ------------START-CODER-----------";
pub const LEGACY_END: &str = "# ------------END-CODER------------";
pub const INCLUDE_STATEMENT: &str = "Include coder";

/// First `Host` / `Match` line. Keywords are case-insensitive and
/// indentation carries no meaning in ssh config.
fn host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[\t ]*(?i:host|match)[\t ]").expect("valid regex"))
}

/// An `Include coder` line including its line terminator.
fn include_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[\t ]*(?i:include)[\t ]+coder[\t ]*(?:\r?\n|\z)").expect("valid regex")
    })
}

/// Result of migrating the primary config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub bytes: Vec<u8>,
    pub removed_legacy: bool,
    pub added_include: bool,
    pub removed_duplicate_includes: bool,
}

impl Migration {
    pub fn changed(&self) -> bool {
        self.removed_legacy || self.added_include || self.removed_duplicate_includes
    }
}

/// What [`ensure_include`] did to the primary config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeEdit {
    Unchanged,
    /// A new include was written at the top; any misplaced or repeated
    /// ones were dropped.
    Added,
    /// The existing include was kept and repeats of it were dropped.
    Deduplicated,
}

/// Strip the legacy block and ensure the include directive.
///
/// Applying this to its own output is a no-op.
pub fn migrate(raw: &[u8]) -> Migration {
    let (stripped, removed_legacy) = strip_legacy_block(raw);
    let (bytes, edit) = ensure_include(&stripped);
    Migration {
        bytes,
        removed_legacy,
        added_include: edit == IncludeEdit::Added,
        removed_duplicate_includes: edit == IncludeEdit::Deduplicated,
    }
}

/// Remove everything from the start sentinel through the end sentinel.
///
/// Requires both sentinels with start before end; otherwise the input is
/// returned unchanged with `false`.
pub fn strip_legacy_block(raw: &[u8]) -> (Vec<u8>, bool) {
    let (Some(start), Some(end)) = (
        find_bytes(raw, LEGACY_START.as_bytes()),
        find_bytes(raw, LEGACY_END.as_bytes()),
    ) else {
        return (raw.to_vec(), false);
    };
    if start > end {
        return (raw.to_vec(), false);
    }

    // Take the line break before the block with it; if the block opens the
    // file, take the one after instead so no blank first line is left.
    let mut cut_from = start;
    let mut cut_to = end + LEGACY_END.len();
    let (before, after) = (&raw[..cut_from], &raw[cut_to..]);
    if before.ends_with(b"\n") {
        cut_from -= if before.ends_with(b"\r\n") { 2 } else { 1 };
    } else if after.starts_with(b"\r\n") {
        cut_to += 2;
    } else if after.starts_with(b"\n") {
        cut_to += 1;
    }

    let mut out = Vec::with_capacity(raw.len() - (cut_to - cut_from));
    out.extend_from_slice(&raw[..cut_from]);
    out.extend_from_slice(&raw[cut_to..]);
    (out, true)
}

/// Ensure exactly one `Include coder` appears, before the first
/// `Host`/`Match` line.
///
/// The first include is kept when it is already in place and every other
/// one is removed. Otherwise all of them go (a misplaced include sits
/// inside a conditional block) and a new include is written at the top,
/// separated from existing content by one blank line.
pub fn ensure_include(raw: &[u8]) -> (Vec<u8>, IncludeEdit) {
    let first_host = host_re().find(raw).map(|m| m.start());
    let includes: Vec<Range<usize>> = include_re().find_iter(raw).map(|m| m.range()).collect();
    let keep = includes
        .first()
        .filter(|inc| first_host.map_or(true, |host| inc.end <= host))
        .cloned();

    let mut data = raw.to_vec();
    let mut removed = false;
    for inc in includes.iter().rev() {
        if keep.as_ref() != Some(inc) {
            data.drain(inc.clone());
            removed = true;
        }
    }

    if keep.is_some() {
        let edit = if removed {
            IncludeEdit::Deduplicated
        } else {
            IncludeEdit::Unchanged
        };
        return (data, edit);
    }

    let separator: &[u8] = if data.is_empty() { b"\n" } else { b"\n\n" };
    let mut out = Vec::with_capacity(INCLUDE_STATEMENT.len() + separator.len() + data.len());
    out.extend_from_slice(INCLUDE_STATEMENT.as_bytes());
    out.extend_from_slice(separator);
    out.extend_from_slice(&data);
    (out, IncludeEdit::Added)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
