// src/watch/path_utils.rs

//! Utility functions for path handling in the notifier.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. the platform reports events under a different
///   absolute prefix for the same directory), we canonicalize the event path
///   and try again. Roots are canonical already.
///
/// The root itself maps to `"."`. Returns `None` if the path cannot be
/// related to `root` (e.g. it was already removed and lives elsewhere).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slash_string(rel));
    }

    if let Ok(path_canon) = path.canonicalize() {
        if let Ok(rel) = path_canon.strip_prefix(root) {
            return Some(slash_string(rel));
        }
    }

    None
}

fn slash_string(rel: &Path) -> String {
    let s = rel.to_string_lossy().replace('\\', "/");
    if s.is_empty() { ".".to_string() } else { s }
}
