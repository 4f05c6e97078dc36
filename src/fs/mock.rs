// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir,
    Symlink(PathBuf),
}

/// In-memory tree of absolute paths.
///
/// Parent directories are created implicitly. Symlinks are resolved by
/// `canonicalize` component by component, like the real thing.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.insert(Path::new("/"), MockEntry::Dir);
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.insert(path, MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.insert(path, MockEntry::Dir);
    }

    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let link = link.as_ref();
        self.ensure_parents(link);
        self.insert(link, MockEntry::Symlink(target.as_ref().to_path_buf()));
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(path.to_path_buf(), entry);
    }

    fn ensure_parents(&self, path: &Path) {
        let mut entries = self.entries.lock().unwrap();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }

    fn entry(&self, path: &Path) -> Option<MockEntry> {
        let resolved = self.canonicalize(path).ok()?;
        let entries = self.entries.lock().unwrap();
        entries.get(&resolved).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.entry(path).is_some()
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entry(path), Some(MockEntry::File))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entry(path), Some(MockEntry::Dir))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_absolute() {
            return Err(anyhow!("mock filesystem only knows absolute paths: {:?}", path));
        }

        let entries = self.entries.lock().unwrap();
        let mut resolved = PathBuf::from("/");
        // Bound link chasing so a cyclic mock tree fails instead of spinning.
        let mut hops = 0;

        for component in path.components() {
            match component {
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::Normal(name) => {
                    resolved.push(name);
                    while let Some(MockEntry::Symlink(target)) = entries.get(&resolved) {
                        hops += 1;
                        if hops > 32 {
                            return Err(anyhow!("too many levels of symbolic links: {:?}", path));
                        }
                        resolved = target.clone();
                    }
                    if !entries.contains_key(&resolved) {
                        return Err(anyhow!("No such file or directory: {:?}", path));
                    }
                }
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_follows_symlinked_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/real/src/main.go");
        fs.add_symlink("/work/link", "/real");

        assert_eq!(
            fs.canonicalize(Path::new("/work/link/src")).unwrap(),
            PathBuf::from("/real/src")
        );
        assert!(fs.is_dir(Path::new("/work/link/src")));
        assert!(fs.is_file(Path::new("/work/link/src/main.go")));
        assert!(fs.canonicalize(Path::new("/work/missing")).is_err());
    }
}
