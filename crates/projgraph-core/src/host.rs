//! File system collaborator.
//!
//! The project graph never touches the disk directly. Everything it reads
//! goes through [`FileSystem`], and change notifications arrive as
//! [`FileEvent`] values that the project service translates into
//! edit/close-equivalent events.

use crate::error::Result;
use crate::path::NormalizedPath;
use serde::{Deserialize, Serialize};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: NormalizedPath,
    pub is_dir: bool,
}

/// Read access to the (real or virtual) file system.
///
/// Implementations must be cheap to call repeatedly; the graph builder
/// probes many candidate paths during module resolution.
pub trait FileSystem: Send + Sync {
    /// Reads a file as UTF-8 text.
    fn read_file(&self, path: &NormalizedPath) -> Result<String>;

    /// True when `path` names an existing file.
    fn file_exists(&self, path: &NormalizedPath) -> bool;

    /// True when `path` names an existing directory.
    fn directory_exists(&self, path: &NormalizedPath) -> bool;

    /// Lists the direct children of a directory, sorted by path.
    fn read_dir(&self, path: &NormalizedPath) -> Result<Vec<DirEntry>>;
}

/// Kind of change reported by the watch collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub path: NormalizedPath,
    pub kind: FileChangeKind,
}

impl FileEvent {
    pub fn new(path: NormalizedPath, kind: FileChangeKind) -> Self {
        Self { path, kind }
    }

    pub fn created(path: NormalizedPath) -> Self {
        Self::new(path, FileChangeKind::Created)
    }

    pub fn modified(path: NormalizedPath) -> Self {
        Self::new(path, FileChangeKind::Modified)
    }

    pub fn deleted(path: NormalizedPath) -> Self {
        Self::new(path, FileChangeKind::Deleted)
    }
}
