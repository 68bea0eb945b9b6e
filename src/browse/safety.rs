//! Confinement of user-supplied paths to the slides root.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::PathRejected;

fn reject(requested: &str, reason: &'static str) -> PathRejected {
    PathRejected {
        requested: requested.to_string(),
        reason,
    }
}

/// Resolve `requested` against `root` and accept it only if it stays inside.
///
/// Backslashes are treated as separators. An absolute `requested` is taken as
/// is and must itself lie under the root. Symlinks are resolved for every
/// existing component; a trailing part that does not exist yet is accepted so
/// the caller can report it as missing.
pub fn confine(root: &Path, requested: &str) -> Result<PathBuf, PathRejected> {
    if requested.contains('\0') {
        return Err(reject(requested, "embedded NUL byte"));
    }

    let root_abs =
        fs::canonicalize(root).map_err(|_| reject(requested, "root cannot be resolved"))?;

    let normalized = requested.replace('\\', "/");
    let joined = root_abs.join(&normalized);

    let lexical = normalize_lexically(&joined)
        .ok_or_else(|| reject(requested, "climbs above the filesystem root"))?;

    let resolved = resolve_existing_prefix(&lexical)
        .ok_or_else(|| reject(requested, "path cannot be resolved"))?;

    if resolved.starts_with(&root_abs) {
        Ok(resolved)
    } else {
        Err(reject(requested, "escapes the slides root"))
    }
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}

/// Canonicalize the longest existing ancestor and re-append the rest.
fn resolve_existing_prefix(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(mut resolved) => {
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Some(resolved);
            }
            Err(_) => {
                tail.push(existing.file_name()?.to_os_string());
                existing = existing.parent()?;
            }
        }
    }
}
