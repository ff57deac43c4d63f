//! Hard-coded system protection list and lexical path normalisation.
//!
//! Paths under these prefixes are never scanned and never trashed, no matter
//! what a rule, allowlist or caller says.

use std::fs;
use std::path::{Path, PathBuf};

/// System locations that are off limits for both scanning and trashing.
pub const SYSTEM_PROTECTED_PREFIXES: &[&str] = &[
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/private/var/db",
    "/Library/Apple",
    "/.Trashes",
    "/.Spotlight-V100",
    "/.fseventsd",
    "/Volumes/.timemachine",
];

/// Lexically normalise a path: collapse `.`, `..` and repeated or trailing
/// separators. Symlinks are not resolved here.
pub fn standardize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().map_or(false, |last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    // relative paths keep leading `..`; absolute ones clamp at `/`
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// `true` when a standardized path equals or lies beneath a protected prefix.
pub fn is_protected_system_path(standardized: &str) -> bool {
    SYSTEM_PROTECTED_PREFIXES.iter().any(|prefix| {
        standardized == *prefix
            || standardized
                .strip_prefix(prefix)
                .map_or(false, |rest| rest.starts_with('/'))
    })
}

/// Resolve symlinks and return the canonical path, or `None` when the path
/// cannot be resolved (missing, permission denied).
pub fn canonical_path(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok()
}

/// Protection check for scan roots and for items right before they are moved.
/// Both the lexical form and the symlink-resolved form must be outside the
/// protected list, so a link swapped in after scanning cannot redirect a move.
pub fn is_protected_for_mutation(path: &Path) -> bool {
    let lexical = standardize_path(&path.to_string_lossy());
    if is_protected_system_path(&lexical) {
        return true;
    }
    match canonical_path(path) {
        Some(canonical) => is_protected_system_path(&standardize_path(&canonical.to_string_lossy())),
        None => false,
    }
}
