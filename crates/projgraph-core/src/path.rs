//! Canonical path keys.
//!
//! Every document, manifest and project root is keyed by a [`NormalizedPath`]:
//! an absolute, forward-slash path with `.` and `..` segments folded away.
//! Two spellings of the same file always normalize to the same key, which is
//! what the registry, the membership index and the graph builder's visited
//! set rely on.

use crate::error::{ProjectError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Absolute, normalized path used as the identity of tracked files.
///
/// # Examples
///
/// ```
/// use projgraph_core::NormalizedPath;
///
/// let path = NormalizedPath::new("/user/project/./src/../a.ts").unwrap();
/// assert_eq!(path.as_str(), "/user/project/a.ts");
/// assert_eq!(path.file_name(), "a.ts");
/// assert_eq!(path.parent().unwrap().as_str(), "/user/project");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedPath(String);

/// Splits an absolute path into its root (`/` or a drive like `c:`) and the rest.
fn split_root(raw: &str) -> Option<(String, &str)> {
    if let Some(rest) = raw.strip_prefix('/') {
        return Some(("/".to_string(), rest));
    }
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let rest = &raw[2..];
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let root = format!("{}/", raw[..2].to_ascii_lowercase());
        return Some((root, rest));
    }
    None
}

fn fold_segments<'a>(segments: impl Iterator<Item = &'a str>, out: &mut Vec<&'a str>) {
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                // `..` above the root stays at the root
                out.pop();
            }
            other => out.push(other),
        }
    }
}

impl NormalizedPath {
    /// Normalizes an absolute path.
    ///
    /// Backslashes are treated as separators. Relative input is rejected with
    /// [`ProjectError::InvalidPath`].
    pub fn new(raw: &str) -> Result<Self> {
        let unified = raw.replace('\\', "/");
        let Some((root, rest)) = split_root(&unified) else {
            return Err(ProjectError::InvalidPath(raw.to_string()));
        };

        let mut segments = Vec::new();
        fold_segments(rest.split('/'), &mut segments);

        let mut normalized = root;
        normalized.push_str(&segments.join("/"));
        Ok(Self(normalized))
    }

    /// Normalizes a filesystem path.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::new(&path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    /// True for a filesystem root such as `/` or `c:/`.
    pub fn is_root(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Returns the containing directory, or `None` for a root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let idx = self.0.rfind('/')?;
        let parent = &self.0[..=idx];
        if parent.len() > 1 && !is_drive_root(parent) {
            Some(Self(parent.trim_end_matches('/').to_string()))
        } else {
            Some(Self(parent.to_string()))
        }
    }

    /// Final path segment; empty for a root.
    pub fn file_name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Extension of the file name including compound declaration suffixes.
    ///
    /// `index.d.ts` yields `d.ts`, `a.ts` yields `ts`.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        for compound in ["d.ts", "d.mts", "d.cts"] {
            if name.len() > compound.len() + 1 && name.ends_with(&format!(".{compound}")) {
                return Some(&name[name.len() - compound.len()..]);
            }
        }
        let idx = name.rfind('.')?;
        if idx == 0 {
            return None;
        }
        Some(&name[idx + 1..])
    }

    /// True for ambient declaration files (`*.d.ts`).
    pub fn is_declaration_file(&self) -> bool {
        matches!(self.extension(), Some("d.ts" | "d.mts" | "d.cts"))
    }

    /// Resolves `relative` against this path treated as a directory.
    ///
    /// An absolute `relative` is normalized on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use projgraph_core::NormalizedPath;
    ///
    /// let dir = NormalizedPath::new("/p/src").unwrap();
    /// assert_eq!(dir.join("../lib/b.ts").unwrap().as_str(), "/p/lib/b.ts");
    /// assert_eq!(dir.join("/abs/c.ts").unwrap().as_str(), "/abs/c.ts");
    /// ```
    pub fn join(&self, relative: &str) -> Result<Self> {
        let unified = relative.replace('\\', "/");
        if split_root(&unified).is_some() {
            return Self::new(&unified);
        }
        if self.is_root() {
            Self::new(&format!("{}{}", self.0, unified))
        } else {
            Self::new(&format!("{}/{}", self.0, unified))
        }
    }

    /// This path followed by each of its ancestors up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self.clone()), Self::parent)
    }

    /// True when this path is `dir` or lies beneath it.
    pub fn starts_with_dir(&self, dir: &Self) -> bool {
        self.relative_to(dir).is_some()
    }

    /// Path remainder below `dir`, without a leading slash.
    ///
    /// Returns `Some("")` when the paths are equal and `None` when this path
    /// is not beneath `dir`.
    pub fn relative_to(&self, dir: &Self) -> Option<&str> {
        if self == dir {
            return Some("");
        }
        let rest = if dir.is_root() {
            self.0.strip_prefix(dir.0.as_str())?
        } else {
            self.0.strip_prefix(dir.0.as_str())?.strip_prefix('/')?
        };
        Some(rest)
    }
}

fn is_drive_root(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NormalizedPath {
    type Error = ProjectError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<NormalizedPath> for String {
    fn from(value: NormalizedPath) -> Self {
        value.0
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
