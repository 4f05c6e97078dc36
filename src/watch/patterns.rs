// src/watch/patterns.rs

//! Turning user watch patterns into filesystem watch roots.
//!
//! A pattern such as `./cmd/**/*.go` is split at its first wildcard segment:
//! the literal prefix (`cmd`) becomes the directory we subscribe to, and the
//! remainder (`**/*.go`) is re-tested against every path reported under that
//! directory. Patterns without any wildcard watch their parent directory and
//! match on the final segment alone.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::{Result, RunwatchError};
use crate::fs::FileSystem;
use crate::watch::queue::ChangeEvent;

/// Characters that make a path segment a glob rather than a literal name.
const WILDCARD_CHARS: &[char] = &['*', '?', '[', '{'];

/// A pattern split into its literal watch root and the glob that remains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPattern {
    /// Slash-separated literal prefix; `"."` when the pattern starts with a
    /// wildcard or has a single segment.
    pub root: String,
    /// Pattern relative to `root`.
    pub glob: String,
}

/// Strip surrounding whitespace, one leading `./` and one trailing `/`.
pub fn normalize_pattern(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    to_slash(trimmed)
}

fn to_slash(s: &str) -> String {
    if std::path::MAIN_SEPARATOR == '\\' {
        s.replace('\\', "/")
    } else {
        s.to_string()
    }
}

/// Split a normalized pattern at its root boundary.
///
/// The boundary is the first segment containing a wildcard; without one it is
/// the last segment, so the root is the pattern's parent directory.
pub fn split_pattern(pattern: &str) -> SplitPattern {
    let segments: Vec<&str> = pattern.split('/').collect();
    let boundary = segments
        .iter()
        .position(|s| s.contains(WILDCARD_CHARS))
        .unwrap_or(segments.len() - 1);

    let root = segments[..boundary].join("/");
    if root.is_empty() && boundary == 0 {
        return SplitPattern {
            root: ".".to_string(),
            glob: pattern.to_string(),
        };
    }

    // A leading empty segment means an absolute pattern like `/etc/*.conf`.
    let root = if root.is_empty() { "/".to_string() } else { root };
    let glob = pattern
        .strip_prefix(root.as_str())
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(pattern)
        .to_string();

    SplitPattern { root, glob }
}

/// Compile a root-relative glob: `*` stays inside one segment, `**` spans
/// segments. Matching is case-sensitive.
pub fn compile_glob(glob: &str) -> Result<Glob> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|source| RunwatchError::InvalidPattern {
            pattern: glob.to_string(),
            source,
        })
}

/// Test a single root-relative path against a root-relative glob.
///
/// Compiles the glob on every call; for one-off checks and tests only.
/// Watch sessions match through the precompiled [`WatchRoot::matches`].
pub fn glob_matches(glob: &str, rel_path: &str) -> Result<bool> {
    Ok(compile_glob(glob)?.compile_matcher().is_match(rel_path))
}

/// Whether a root is subscribed recursively or as a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Directory,
    File,
}

/// One deduplicated, symlink-resolved location to subscribe to, together
/// with every glob that was resolved against it.
#[derive(Clone)]
pub struct WatchRoot {
    path: PathBuf,
    /// Literal prefix as first written by the user, for messages.
    label: String,
    kind: RootKind,
    globs: Vec<String>,
    matcher: GlobSet,
}

impl fmt::Debug for WatchRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRoot")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("globs", &self.globs)
            .finish_non_exhaustive()
    }
}

impl WatchRoot {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> RootKind {
        self.kind
    }

    /// Join a root-relative path back onto the prefix the user wrote.
    pub fn display_path(&self, rel_path: &str) -> String {
        match (self.label.as_str(), rel_path) {
            (".", rel) => rel.to_string(),
            (label, ".") => label.to_string(),
            (label, rel) => format!("{}/{}", label.trim_end_matches('/'), rel),
        }
    }

    /// Source globs of this root, as resolved (for logs and diagnostics).
    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    /// True if `rel_path` (relative to this root) matches any of its globs.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// The resolved set of roots for one watch session.
#[derive(Debug, Clone)]
pub struct WatchPlan {
    roots: Vec<WatchRoot>,
}

impl WatchPlan {
    /// Resolve every pattern against `base_dir`.
    ///
    /// Fails on the first pattern whose root cannot be resolved; nothing is
    /// retried.
    pub fn resolve(
        patterns: &[String],
        base_dir: &Path,
        fs: &dyn FileSystem,
    ) -> Result<Self> {
        let mut pending: Vec<(PathBuf, String, RootKind, Vec<String>)> = Vec::new();
        let mut index_by_path: HashMap<PathBuf, usize> = HashMap::new();

        for raw in patterns {
            let pattern = normalize_pattern(raw);
            if pattern.is_empty() {
                return Err(RunwatchError::Usage(format!(
                    "empty watch pattern '{raw}'"
                )));
            }

            let split = split_pattern(&pattern);
            let (path, kind) = resolve_root(&split.root, base_dir, fs)?;
            debug!(
                pattern = %pattern,
                root = ?path,
                glob = %split.glob,
                "resolved watch pattern"
            );

            match index_by_path.get(&path) {
                Some(&idx) => pending[idx].3.push(split.glob),
                None => {
                    index_by_path.insert(path.clone(), pending.len());
                    pending.push((path, split.root, kind, vec![split.glob]));
                }
            }
        }

        let mut roots = Vec::with_capacity(pending.len());
        for (path, label, kind, globs) in pending {
            let matcher = build_globset(&globs)?;
            roots.push(WatchRoot {
                path,
                label,
                kind,
                globs,
                matcher,
            });
        }

        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[WatchRoot] {
        &self.roots
    }

    /// The event's path as the user would write it, e.g. `cmd/b.go`.
    pub fn display_path(&self, event: &ChangeEvent) -> String {
        match self.roots.get(event.root) {
            Some(root) => root.display_path(&event.path),
            None => event.path.clone(),
        }
    }

    /// True if the event's path matches a glob of the root it came from.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.roots
            .get(event.root)
            .is_some_and(|root| root.matches(&event.path))
    }
}

fn resolve_root(
    root: &str,
    base_dir: &Path,
    fs: &dyn FileSystem,
) -> Result<(PathBuf, RootKind)> {
    let root_path = Path::new(root);
    let absolute = if root_path.is_absolute() {
        root_path.to_path_buf()
    } else {
        base_dir.join(root_path)
    };

    if !fs.exists(&absolute) {
        return Err(RunwatchError::missing_root(absolute));
    }

    let resolved = fs
        .canonicalize(&absolute)
        .map_err(|err| RunwatchError::WatchRoot {
            path: absolute.clone(),
            reason: format!("{err:#}"),
        })?;

    let kind = if fs.is_dir(&resolved) {
        RootKind::Directory
    } else if fs.is_file(&resolved) {
        RootKind::File
    } else {
        return Err(RunwatchError::WatchRoot {
            path: resolved,
            reason: "stat watch path: neither a file nor a directory".to_string(),
        });
    };

    Ok((resolved, kind))
}

fn build_globset(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(compile_glob(glob)?);
    }
    builder.build().map_err(|source| RunwatchError::InvalidPattern {
        pattern: globs.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn split(pattern: &str) -> (String, String) {
        let s = split_pattern(&normalize_pattern(pattern));
        (s.root, s.glob)
    }

    #[test]
    fn normalize_strips_dot_slash_and_trailing_slash() {
        assert_eq!(normalize_pattern("./src/"), "src");
        assert_eq!(normalize_pattern("  ./cmd/**/*.go "), "cmd/**/*.go");
        assert_eq!(normalize_pattern("src/**"), "src/**");
    }

    #[test]
    fn split_at_first_wildcard_segment() {
        assert_eq!(split("./cmd/**/*.go"), ("cmd".into(), "**/*.go".into()));
        assert_eq!(split("a/b/*.txt"), ("a/b".into(), "*.txt".into()));
        assert_eq!(split("src/ma?n.rs"), ("src".into(), "ma?n.rs".into()));
    }

    #[test]
    fn split_without_wildcard_uses_parent_directory() {
        assert_eq!(split("a/b/c.txt"), ("a/b".into(), "c.txt".into()));
        assert_eq!(split("Cargo.toml"), (".".into(), "Cargo.toml".into()));
    }

    #[test]
    fn split_leading_wildcard_roots_at_current_dir() {
        assert_eq!(split("**/*.rs"), (".".into(), "**/*.rs".into()));
    }

    #[test]
    fn split_absolute_pattern_keeps_absolute_root() {
        assert_eq!(split("/etc/app/*.conf"), ("/etc/app".into(), "*.conf".into()));
        assert_eq!(split("/*.conf"), ("/".into(), "*.conf".into()));
    }

    #[test]
    fn recursive_glob_matches_across_segments_only_with_double_star() {
        assert!(glob_matches("**/*.go", "a/b/main.go").unwrap());
        assert!(!glob_matches("**/*.go", "a/b/main.txt").unwrap());
        assert!(glob_matches("**/*.go", "main.go").unwrap());
        assert!(!glob_matches("*.go", "a/main.go").unwrap());
        assert!(!glob_matches("*.GO", "main.go").unwrap());
    }

    #[test]
    fn patterns_sharing_a_prefix_share_one_root() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/src/api");
        fs.add_dir("/work/docs");

        let patterns = vec![
            "src/**/*.go".to_string(),
            "./src/*.mod".to_string(),
            "src/go.sum".to_string(),
            "docs/*.md".to_string(),
        ];
        let plan = WatchPlan::resolve(&patterns, Path::new("/work"), &fs).unwrap();

        assert_eq!(plan.roots().len(), 2);
        let src = &plan.roots()[0];
        assert_eq!(src.path(), Path::new("/work/src"));
        assert_eq!(src.kind(), RootKind::Directory);
        assert_eq!(src.globs(), ["**/*.go", "*.mod", "go.sum"]);
        assert!(src.matches("api/v1/handler.go"));
        assert!(src.matches("go.sum"));
        assert!(!src.matches("api/README.md"));
    }

    #[test]
    fn symlinked_roots_resolve_to_the_real_location() {
        let fs = MockFileSystem::new();
        fs.add_dir("/real/cmd");
        fs.add_symlink("/work/cmd", "/real/cmd");

        let patterns = vec!["cmd/**/*.go".to_string(), "/real/cmd/*.go".to_string()];
        let plan = WatchPlan::resolve(&patterns, Path::new("/work"), &fs).unwrap();

        assert_eq!(plan.roots().len(), 1);
        assert_eq!(plan.roots()[0].path(), Path::new("/real/cmd"));
    }

    #[test]
    fn file_roots_are_watched_as_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/app.yaml");

        let plan =
            WatchPlan::resolve(&["app.yaml/*".to_string()], Path::new("/work"), &fs).unwrap();
        assert_eq!(plan.roots()[0].kind(), RootKind::File);
    }

    #[test]
    fn missing_root_is_a_setup_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work");

        let err = WatchPlan::resolve(&["nope/**/*.rs".to_string()], Path::new("/work"), &fs)
            .unwrap_err();
        match err {
            RunwatchError::WatchRoot { path, reason } => {
                assert_eq!(path, PathBuf::from("/work/nope"));
                assert!(reason.contains("must exist"));
            }
            other => panic!("expected WatchRoot error, got {other:?}"),
        }
    }

    #[test]
    fn event_only_matches_globs_of_its_own_root() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/a");
        fs.add_dir("/work/b");

        let patterns = vec!["a/*.rs".to_string(), "b/*.md".to_string()];
        let plan = WatchPlan::resolve(&patterns, Path::new("/work"), &fs).unwrap();

        let event = |root: usize, path: &str| ChangeEvent {
            root,
            path: path.to_string(),
        };
        assert!(plan.matches(&event(0, "lib.rs")));
        assert!(!plan.matches(&event(1, "lib.rs")));
        assert!(plan.matches(&event(1, "README.md")));
        assert!(!plan.matches(&event(7, "lib.rs")));
        assert_eq!(plan.display_path(&event(1, "README.md")), "b/README.md");
    }
}
