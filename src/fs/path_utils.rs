// src/fs/path_utils.rs

//! Path helpers shared by the file expander and the watcher.

use std::path::{Component, Path, PathBuf};

/// Render a relative path with forward slashes, the form glob patterns are
/// matched against.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Tries a direct `strip_prefix(root)` first, then retries on canonicalized
/// paths (symlinked temp dirs on macOS report `/private/var/...`).
///
/// Returns `None` if the path is not below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

/// Join a slash-separated relative path onto `base`, dropping `.` segments.
pub fn join_slash(base: &Path, rel: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for part in rel.split('/').filter(|p| !p.is_empty() && *p != ".") {
        out.push(part);
    }
    out
}

/// Lexically resolve `rel` (a URL path or user-supplied relative path) under
/// `base`. Returns `None` if it would escape `base`.
pub fn confined_join(base: &Path, rel: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for part in rel.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            p => {
                if Path::new(p)
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)))
                {
                    return None;
                }
                parts.push(p);
            }
        }
    }
    Some(parts.iter().fold(base.to_path_buf(), |acc, p| acc.join(p)))
}
