// src/watch/path_utils.rs

use std::path::Path;

/// `path` relative to `root` as a `/`-separated string, the form the globs
/// are matched against.
///
/// Falls back to canonicalizing both sides, since notify may report paths
/// through a different prefix than the one we registered (macOS
/// `/private/var` vs `/var`). A path that no longer exists cannot be
/// canonicalized, so its parent is tried instead.
///
/// Returns `None` if the path is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(path_canon) = path.canonicalize() {
        return path_canon.strip_prefix(&root_canon).ok().map(to_slash);
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let rel_parent = parent.strip_prefix(&root_canon).ok()?;
    Some(to_slash(&rel_parent.join(path.file_name()?)))
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
