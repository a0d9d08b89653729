//! Build configuration manifests.
//!
//! A manifest (`tsconfig.json` style) names the root files of a configured
//! project through explicit `files` and `include`/`exclude` patterns, and
//! carries compiler options that influence the graph build.

use crate::error::{ProjectError, Result};
use crate::host::FileSystem;
use crate::path::NormalizedPath;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashSet;

/// Directory names excluded when a manifest does not declare `exclude`.
const DEFAULT_EXCLUDES: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// Compiler options that matter to project management.
///
/// Unknown options are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Restricts automatic ambient declaration acquisition to these packages.
    #[serde(default)]
    pub types: Option<Vec<String>>,
    /// Suppresses the default library file.
    #[serde(default)]
    pub no_lib: bool,
    /// Creates the project with syntactic capability only.
    #[serde(default)]
    pub syntax_only: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    #[serde(default)]
    compiler_options: CompilerOptions,
}

/// A parsed build configuration manifest.
///
/// # Examples
///
/// ```
/// use projgraph_core::{Manifest, NormalizedPath};
///
/// let path = NormalizedPath::new("/p/tsconfig.json").unwrap();
/// let manifest = Manifest::parse(path, "{}").unwrap();
/// let exts = ["ts".to_string()];
/// assert!(manifest.covers(&NormalizedPath::new("/p/src/a.ts").unwrap(), &exts));
/// assert!(!manifest.covers(&NormalizedPath::new("/p/README.md").unwrap(), &exts));
/// assert!(!manifest.covers(&NormalizedPath::new("/p/node_modules/x/index.d.ts").unwrap(), &exts));
/// assert!(!manifest.covers(&NormalizedPath::new("/other/a.ts").unwrap(), &exts));
/// ```
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: NormalizedPath,
    pub directory: NormalizedPath,
    pub files: Vec<NormalizedPath>,
    pub options: CompilerOptions,
    include: GlobSet,
    exclude: GlobSet,
}

fn build_globset(patterns: &[String]) -> std::result::Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
        if trimmed.is_empty() {
            continue;
        }
        builder.add(GlobBuilder::new(trimmed).literal_separator(true).build()?);
        // a bare directory pattern also covers everything beneath it
        builder.add(
            GlobBuilder::new(&format!("{trimmed}/**"))
                .literal_separator(true)
                .build()?,
        );
    }
    builder.build()
}

impl Manifest {
    /// Parses manifest text located at `path`.
    ///
    /// Returns [`ProjectError::ConfigurationLoadFailure`] for malformed JSON or
    /// invalid patterns.
    pub fn parse(path: NormalizedPath, text: &str) -> Result<Self> {
        let failure = |reason: String| ProjectError::ConfigurationLoadFailure {
            manifest: path.to_string(),
            reason,
        };

        let raw: RawManifest = serde_json::from_str(text).map_err(|e| failure(e.to_string()))?;
        let directory = path
            .parent()
            .ok_or_else(|| failure("manifest has no parent directory".into()))?;

        let include = match (&raw.include, &raw.files) {
            (Some(include), _) => include.clone(),
            (None, Some(_)) => Vec::new(),
            (None, None) => vec!["**/*".to_string()],
        };
        let exclude = raw
            .exclude
            .clone()
            .unwrap_or_else(|| DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect());

        let files = raw
            .files
            .unwrap_or_default()
            .iter()
            .map(|f| directory.join(f))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include: build_globset(&include).map_err(|e| failure(e.to_string()))?,
            exclude: build_globset(&exclude).map_err(|e| failure(e.to_string()))?,
            path,
            directory,
            files,
            options: raw.compiler_options,
        })
    }

    /// True when the manifest's root rules name `file`.
    ///
    /// Explicit `files` always count; pattern matches must lie beneath the
    /// manifest directory, carry one of `extensions` and must not be
    /// excluded.
    pub fn covers(&self, file: &NormalizedPath, extensions: &[String]) -> bool {
        if self.files.contains(file) {
            return true;
        }
        if !has_extension(file, extensions) {
            return false;
        }
        let Some(relative) = file.relative_to(&self.directory) else {
            return false;
        };
        if relative.is_empty() {
            return false;
        }
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    fn is_excluded_dir(&self, dir: &NormalizedPath) -> bool {
        dir.relative_to(&self.directory)
            .is_some_and(|rel| !rel.is_empty() && self.exclude.is_match(rel))
    }

    /// Enumerates the root files named by this manifest.
    ///
    /// Explicit `files` come first in declaration order, followed by pattern
    /// matches in path order. Subdirectories holding their own manifest (one
    /// of `manifest_names`) are skipped since they form separate projects.
    pub fn enumerate(
        &self,
        fs: &dyn FileSystem,
        manifest_names: &[String],
        extensions: &[String],
    ) -> Vec<NormalizedPath> {
        let mut seen = HashSet::new();
        let mut roots = Vec::new();

        for file in &self.files {
            if fs.file_exists(file) && seen.insert(file.clone()) {
                roots.push(file.clone());
            }
        }

        let mut stack = vec![self.directory.clone()];
        while let Some(dir) = stack.pop() {
            let entries = match fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("cannot list {}: {}", dir, e);
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for entry in entries {
                if entry.is_dir {
                    if self.is_excluded_dir(&entry.path) {
                        continue;
                    }
                    let nested = manifest_names
                        .iter()
                        .filter_map(|name| entry.path.join(name).ok())
                        .any(|candidate| fs.file_exists(&candidate));
                    if nested {
                        tracing::debug!("skipping nested project directory {}", entry.path);
                        continue;
                    }
                    subdirs.push(entry.path);
                } else if self.covers(&entry.path, extensions)
                    && seen.insert(entry.path.clone())
                {
                    roots.push(entry.path);
                }
            }
            // reverse so the stack pops directories in path order
            stack.extend(subdirs.into_iter().rev());
        }

        roots
    }
}

/// True when `path` ends in one of `extensions` (given without a leading dot).
pub fn has_extension(path: &NormalizedPath, extensions: &[String]) -> bool {
    let name = path.file_name();
    extensions
        .iter()
        .any(|ext| name.len() > ext.len() + 1 && name.ends_with(&format!(".{ext}")))
}

/// Result of looking for a manifest in one directory.
#[derive(Debug, Clone)]
pub enum ManifestLookup {
    Found(Manifest),
    NotFound,
    /// A manifest file exists but could not be read or parsed.
    Failed {
        path: NormalizedPath,
        reason: String,
    },
}

/// Configuration manifest collaborator.
pub trait ManifestProvider: Send + Sync {
    /// File names recognized as manifests, in lookup priority order.
    fn file_names(&self) -> &[String];

    /// Looks for a manifest directly inside `directory`.
    fn lookup(&self, directory: &NormalizedPath) -> ManifestLookup;

    /// True when `path` has one of the manifest file names.
    fn is_manifest(&self, path: &NormalizedPath) -> bool {
        self.file_names().iter().any(|n| n == path.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> NormalizedPath {
        NormalizedPath::new(raw).unwrap()
    }

    fn exts() -> Vec<String> {
        vec!["ts".to_string(), "tsx".to_string(), "d.ts".to_string()]
    }

    fn manifest(text: &str) -> Manifest {
        Manifest::parse(p("/proj/tsconfig.json"), text).unwrap()
    }

    #[test]
    fn test_empty_manifest_includes_everything_but_node_modules() {
        let m = manifest("{}");
        assert_eq!(m.directory.as_str(), "/proj");
        assert!(m.covers(&p("/proj/a.ts"), &exts()));
        assert!(m.covers(&p("/proj/deep/nested/b.ts"), &exts()));
        assert!(!m.covers(&p("/proj/node_modules/something/index.d.ts"), &exts()));
        assert!(!m.covers(&p("/elsewhere/a.ts"), &exts()));
    }

    #[test]
    fn test_files_without_include_limits_roots() {
        let m = manifest(r#"{ "files": ["main.ts"] }"#);
        assert!(m.covers(&p("/proj/main.ts"), &exts()));
        assert!(!m.covers(&p("/proj/other.ts"), &exts()));
    }

    #[test]
    fn test_include_and_exclude_patterns() {
        let m = manifest(r#"{ "include": ["src"], "exclude": ["src/gen"] }"#);
        assert!(m.covers(&p("/proj/src/a.ts"), &exts()));
        assert!(m.covers(&p("/proj/src/x/y.ts"), &exts()));
        assert!(!m.covers(&p("/proj/src/gen/out.ts"), &exts()));
        assert!(!m.covers(&p("/proj/test/a.ts"), &exts()));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let m = manifest(r#"{ "include": ["src/*.ts"] }"#);
        assert!(m.covers(&p("/proj/src/a.ts"), &exts()));
        assert!(!m.covers(&p("/proj/src/inner/a.ts"), &exts()));
    }

    #[test]
    fn test_patterns_skip_non_source_files() {
        let m = manifest("{}");
        assert!(!m.covers(&p("/proj/README.md"), &exts()));
        assert!(!m.covers(&p("/proj/tsconfig.json"), &exts()));
        assert!(!m.covers(&p("/proj/src/logo.png"), &exts()));
        assert!(m.covers(&p("/proj/src/view.tsx"), &exts()));

        // an explicitly listed file is a root whatever its extension
        let m = manifest(r#"{ "files": ["notes.md"] }"#);
        assert!(m.covers(&p("/proj/notes.md"), &exts()));
    }

    #[test]
    fn test_compiler_options() {
        let m = manifest(r#"{ "compilerOptions": { "types": ["node"], "noLib": true, "strict": true } }"#);
        assert_eq!(m.options.types, Some(vec!["node".to_string()]));
        assert!(m.options.no_lib);
        assert!(!m.options.syntax_only);
    }

    #[test]
    fn test_malformed_manifest_is_load_failure() {
        let err = Manifest::parse(p("/proj/tsconfig.json"), "{ not json").unwrap_err();
        assert!(matches!(err, ProjectError::ConfigurationLoadFailure { .. }));
    }

    #[test]
    fn test_has_extension() {
        let exts = vec!["ts".to_string(), "d.ts".to_string()];
        assert!(has_extension(&p("/a/b.ts"), &exts));
        assert!(has_extension(&p("/a/b.d.ts"), &exts));
        assert!(!has_extension(&p("/a/b.json"), &exts));
        assert!(!has_extension(&p("/a/.ts"), &exts));
    }
}
