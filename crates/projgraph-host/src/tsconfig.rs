//! `tsconfig.json`-style manifest discovery.

use projgraph_core::{FileSystem, Manifest, ManifestLookup, ManifestProvider, NormalizedPath};
use std::sync::Arc;

/// Default manifest file name.
pub const DEFAULT_MANIFEST_NAME: &str = "tsconfig.json";

/// Reads JSON manifests through a [`FileSystem`].
///
/// The first file name that exists in a directory wins. Nothing is cached:
/// the project service decides when a manifest is stale and asks again.
///
/// # Examples
///
/// ```
/// use projgraph_core::{ManifestLookup, ManifestProvider, NormalizedPath};
/// use projgraph_host::{JsonManifestProvider, MemoryFileSystem};
/// use std::sync::Arc;
///
/// let fs = Arc::new(MemoryFileSystem::new());
/// fs.add_file("/p/tsconfig.json", "{}").unwrap();
///
/// let provider = JsonManifestProvider::new(fs);
/// let found = provider.lookup(&NormalizedPath::new("/p").unwrap());
/// assert!(matches!(found, ManifestLookup::Found(_)));
/// ```
pub struct JsonManifestProvider {
    fs: Arc<dyn FileSystem>,
    file_names: Vec<String>,
}

impl JsonManifestProvider {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_file_names(fs, vec![DEFAULT_MANIFEST_NAME.to_string()])
    }

    pub fn with_file_names(fs: Arc<dyn FileSystem>, file_names: Vec<String>) -> Self {
        Self { fs, file_names }
    }
}

impl std::fmt::Debug for JsonManifestProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonManifestProvider")
            .field("file_names", &self.file_names)
            .finish_non_exhaustive()
    }
}

impl ManifestProvider for JsonManifestProvider {
    fn file_names(&self) -> &[String] {
        &self.file_names
    }

    fn lookup(&self, directory: &NormalizedPath) -> ManifestLookup {
        for name in &self.file_names {
            let Ok(path) = directory.join(name) else {
                continue;
            };
            if !self.fs.file_exists(&path) {
                continue;
            }

            let text = match self.fs.read_file(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("cannot read manifest {}: {}", path, e);
                    return ManifestLookup::Failed {
                        path,
                        reason: e.to_string(),
                    };
                }
            };

            return match Manifest::parse(path.clone(), &text) {
                Ok(manifest) => {
                    tracing::debug!("loaded manifest {}", path);
                    ManifestLookup::Found(manifest)
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    ManifestLookup::Failed {
                        path,
                        reason: e.to_string(),
                    }
                }
            };
        }
        ManifestLookup::NotFound
    }
}
