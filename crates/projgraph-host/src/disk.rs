use projgraph_core::{DirEntry, FileSystem, NormalizedPath, Result};

/// File system backed by the real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl DiskFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for DiskFileSystem {
    fn read_file(&self, path: &NormalizedPath) -> Result<String> {
        Ok(std::fs::read_to_string(path.to_path_buf())?)
    }

    fn file_exists(&self, path: &NormalizedPath) -> bool {
        path.to_path_buf().is_file()
    }

    fn directory_exists(&self, path: &NormalizedPath) -> bool {
        path.to_path_buf().is_dir()
    }

    fn read_dir(&self, path: &NormalizedPath) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path.to_path_buf())? {
            let entry = entry?;
            let child = match NormalizedPath::from_path(&entry.path()) {
                Ok(child) => child,
                Err(e) => {
                    tracing::debug!("skipping unrepresentable entry: {}", e);
                    continue;
                }
            };
            entries.push(DirEntry {
                path: child,
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}
