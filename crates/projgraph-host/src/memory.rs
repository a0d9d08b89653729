//! In-memory virtual file system.

use dashmap::{DashMap, DashSet};
use projgraph_core::{DirEntry, FileSystem, NormalizedPath, ProjectError, Result};
use std::collections::BTreeMap;

/// Virtual host keeping file contents in memory.
///
/// Directories exist implicitly for every ancestor of a stored file and can
/// also be created empty with [`MemoryFileSystem::add_directory`]. Uses
/// `DashMap` so a shared instance can be mutated from a test while the
/// service holds an `Arc` to it.
///
/// # Examples
///
/// ```
/// use projgraph_core::{FileSystem, NormalizedPath};
/// use projgraph_host::MemoryFileSystem;
///
/// let fs = MemoryFileSystem::new();
/// fs.add_file("/p/src/a.ts", "export const a = 1;").unwrap();
///
/// let dir = NormalizedPath::new("/p").unwrap();
/// assert!(fs.directory_exists(&dir));
/// assert_eq!(fs.read_dir(&dir).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: DashMap<NormalizedPath, String>,
    directories: DashSet<NormalizedPath>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a host from `(path, content)` pairs.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let fs = Self::new();
        for (path, content) in files {
            fs.add_file(path, content)?;
        }
        Ok(fs)
    }

    /// Creates or overwrites a file. Returns the normalized path.
    pub fn add_file(&self, path: &str, content: &str) -> Result<NormalizedPath> {
        let path = NormalizedPath::new(path)?;
        self.files.insert(path.clone(), content.to_string());
        Ok(path)
    }

    pub fn add_directory(&self, path: &str) -> Result<NormalizedPath> {
        let path = NormalizedPath::new(path)?;
        self.directories.insert(path.clone());
        Ok(path)
    }

    /// Removes a file; returns whether it existed.
    pub fn remove_file(&self, path: &NormalizedPath) -> bool {
        self.files.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &NormalizedPath) -> Result<String> {
        self.files.get(path).map(|entry| entry.value().clone()).ok_or_else(|| {
            ProjectError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {path}"),
            ))
        })
    }

    fn file_exists(&self, path: &NormalizedPath) -> bool {
        self.files.contains_key(path)
    }

    fn directory_exists(&self, path: &NormalizedPath) -> bool {
        if path.is_root() || self.directories.contains(path) {
            return true;
        }
        self.files
            .iter()
            .any(|entry| entry.key() != path && entry.key().starts_with_dir(path))
            || self
                .directories
                .iter()
                .any(|dir| dir.key() != path && dir.key().starts_with_dir(path))
    }

    fn read_dir(&self, path: &NormalizedPath) -> Result<Vec<DirEntry>> {
        if !self.directory_exists(path) {
            return Err(ProjectError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such directory: {path}"),
            )));
        }

        // child path -> is_dir
        let mut children: BTreeMap<NormalizedPath, bool> = BTreeMap::new();
        let mut note = |candidate: &NormalizedPath, is_file: bool| {
            let Some(rest) = candidate.relative_to(path) else {
                return;
            };
            if rest.is_empty() {
                return;
            }
            let (first, nested) = match rest.split_once('/') {
                Some((first, _)) => (first, true),
                None => (rest, !is_file),
            };
            if let Ok(child) = path.join(first) {
                let slot = children.entry(child).or_insert(nested);
                *slot |= nested;
            }
        };

        for entry in &self.files {
            note(entry.key(), true);
        }
        for dir in self.directories.iter() {
            note(dir.key(), false);
        }

        Ok(children
            .into_iter()
            .map(|(path, is_dir)| DirEntry { path, is_dir })
            .collect())
    }
}
