//! Escaping of paths embedded in `ProxyCommand` / `Match exec` lines.
//!
//! OpenSSH hands these commands to the user's shell, so the quoting rules
//! depend on the platform the config is consumed on:
//!
//! | Platform | Rejected          | Transformation                                      |
//! |----------|-------------------|-----------------------------------------------------|
//! | POSIX    | `\n`              | `\`, space, tab prefixed with `\` (in that order)   |
//! | Windows  | `\n`, `"`, `\t`   | paths with spaces wrapped via `[char]34` indirection |
//!
//! Both variants are total: every input yields an escaped string or an
//! [`EscapeError`], never a silently altered path.

use crate::error::EscapeError;

/// Target shell family for generated commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    /// The platform this binary is running on.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Build the escaper for this platform.
    pub fn escaper(self, options: EscapeOptions) -> Box<dyn Escaper> {
        match self {
            Platform::Posix => Box::new(PosixEscaper),
            Platform::Windows => Box::new(WindowsEscaper {
                force_unix_separators: options.force_unix_separators,
            }),
        }
    }
}

/// Per-run escaping configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeOptions {
    /// Rewrite `\` separators to `/` before escaping. Only meaningful on
    /// Windows hosts running a unix-like shell (e.g. git bash).
    pub force_unix_separators: bool,
    /// Hide `--force-unix-filepaths` from help output. Presentation only.
    pub hide_force_unix_slashes: bool,
}

impl EscapeOptions {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            force_unix_separators: false,
            hide_force_unix_slashes: platform == Platform::Posix,
        }
    }
}

/// Escapes a path for embedding in an ssh config command line.
pub trait Escaper: Send + Sync {
    fn escape(&self, path: &str) -> Result<String, EscapeError>;
}

/// Escaping for `/bin/sh`-style shells.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixEscaper;

impl Escaper for PosixEscaper {
    fn escape(&self, path: &str) -> Result<String, EscapeError> {
        if path.contains('\n') {
            return Err(EscapeError::Newline {
                path: path.to_string(),
            });
        }
        // Backslash first so the escapes added below are not doubled.
        let mut escaped = path.to_string();
        for c in ["\\", " ", "\t"] {
            escaped = escaped.replace(c, &format!("\\{c}"));
        }
        Ok(escaped)
    }
}

/// Escaping for `cmd.exe` as used by Win32-OpenSSH.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsEscaper {
    pub force_unix_separators: bool,
}

impl Escaper for WindowsEscaper {
    fn escape(&self, path: &str) -> Result<String, EscapeError> {
        let path = if self.force_unix_separators {
            path.replace('\\', "/")
        } else {
            path.to_string()
        };

        if path.contains('\n') {
            return Err(EscapeError::Newline { path });
        }
        if let Some(character) = path.chars().find(|c| matches!(c, '"' | '\t')) {
            return Err(EscapeError::Unsupported {
                path,
                platform: "Windows",
                character,
            });
        }

        // The Match exec tokenizer cannot carry a literal `"`, so produce
        // one at run time and use it to bracket the path.
        if path.contains(' ') {
            return Ok(format!(
                "for /f %a in ('powershell.exe -Command [char]34') do @cmd.exe /c %a{path}%a"
            ));
        }
        Ok(path)
    }
}
