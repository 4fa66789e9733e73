use std::path::{Component, Path, PathBuf};

/// Return whether a path segment names an archive file (`.zip` or `.siard`, case-insensitive).
pub fn is_archive_name(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    lower.ends_with(".zip") || lower.ends_with(".siard")
}

/// The last path segment, or `""` for an empty path.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Resolve `.` and `..` components lexically, without touching the filesystem.
///
/// Layered archive URIs name members that don't exist on disk yet, so `std::fs::canonicalize`
/// cannot be used on them. `..` at the root is dropped.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    // Keep a leading `..` only for relative paths.
                    if !path.has_root() {
                        out.push("..");
                    }
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Join `child` onto `base` unless `child` is absolute, then normalize lexically.
pub fn normalize_join(base: &str, child: &str) -> PathBuf {
    if child.starts_with('/') {
        normalize(Path::new(child))
    } else if base.is_empty() {
        normalize(Path::new(child))
    } else {
        normalize(&Path::new(base).join(child))
    }
}
