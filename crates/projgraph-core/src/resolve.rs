//! Static module and reference resolution.
//!
//! Each specifier resolves to exactly one target file or to nothing; an
//! unresolved specifier is not an error at this level, the graph builder
//! records it and moves on.

use crate::path::NormalizedPath;
use crate::references::{ReferenceKind, SourceReference};
use serde::Deserialize;

/// Source extensions probed during resolution, in priority order.
pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts", "mts", "cts", "d.mts", "d.cts"];

/// Script extensions that map onto a typed source with the same stem.
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

/// Read access needed by resolution.
///
/// The service layers open documents over the file system, so a file that
/// only exists in the editor still resolves.
pub trait ResolutionHost {
    fn file_exists(&self, path: &NormalizedPath) -> bool;
    fn read_file(&self, path: &NormalizedPath) -> Option<String>;
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    types: Option<String>,
    typings: Option<String>,
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// `@scope/name` becomes `scope__name` under `@types`.
fn mangle_scoped(name: &str) -> String {
    match name.strip_prefix('@') {
        Some(rest) => rest.replacen('/', "__", 1),
        None => name.to_string(),
    }
}

/// Resolves specifiers against a [`ResolutionHost`].
///
/// # Examples
///
/// ```
/// use projgraph_core::{ModuleResolver, NormalizedPath, ResolutionHost};
///
/// struct Files(Vec<&'static str>);
/// impl ResolutionHost for Files {
///     fn file_exists(&self, path: &NormalizedPath) -> bool {
///         self.0.contains(&path.as_str())
///     }
///     fn read_file(&self, _path: &NormalizedPath) -> Option<String> {
///         None
///     }
/// }
///
/// let host = Files(vec!["/p/b.ts", "/p/node_modules/lib/index.d.ts"]);
/// let extensions = ModuleResolver::<Files>::default_extensions();
/// let resolver = ModuleResolver::new(&host, &extensions);
/// let from = NormalizedPath::new("/p/a.ts").unwrap();
/// assert_eq!(resolver.resolve_module("./b", &from).unwrap().as_str(), "/p/b.ts");
/// assert_eq!(
///     resolver.resolve_module("lib", &from).unwrap().as_str(),
///     "/p/node_modules/lib/index.d.ts"
/// );
/// assert!(resolver.resolve_module("./missing", &from).is_none());
/// ```
pub struct ModuleResolver<'a, H: ResolutionHost + ?Sized> {
    host: &'a H,
    extensions: &'a [String],
}

impl<'a, H: ResolutionHost + ?Sized> ModuleResolver<'a, H> {
    pub fn new(host: &'a H, extensions: &'a [String]) -> Self {
        Self { host, extensions }
    }

    pub fn default_extensions() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect()
    }

    /// Resolves any kind of reference found in `containing`.
    pub fn resolve(
        &self,
        reference: &SourceReference,
        containing: &NormalizedPath,
    ) -> Option<NormalizedPath> {
        match reference.kind {
            ReferenceKind::Module => self.resolve_module(&reference.specifier, containing),
            ReferenceKind::Path => self.resolve_reference_path(&reference.specifier, containing),
            ReferenceKind::Types => self.resolve_type_reference(&reference.specifier, containing),
        }
    }

    /// Resolves an import/export/require specifier.
    pub fn resolve_module(
        &self,
        specifier: &str,
        containing: &NormalizedPath,
    ) -> Option<NormalizedPath> {
        let dir = containing.parent()?;
        if is_relative(specifier) {
            let base = dir.join(specifier).ok()?;
            return self.try_file(&base).or_else(|| self.try_directory(&base));
        }
        self.resolve_node_module(specifier, &dir)
    }

    /// Resolves `/// <reference path="..." />`.
    pub fn resolve_reference_path(
        &self,
        specifier: &str,
        containing: &NormalizedPath,
    ) -> Option<NormalizedPath> {
        let dir = containing.parent()?;
        let target = dir.join(specifier).ok()?;
        if self.host.file_exists(&target) {
            return Some(target);
        }
        self.try_with_extensions(&target)
    }

    /// Resolves `/// <reference types="..." />`.
    pub fn resolve_type_reference(
        &self,
        name: &str,
        containing: &NormalizedPath,
    ) -> Option<NormalizedPath> {
        let dir = containing.parent()?;
        for ancestor in dir.ancestors() {
            let Ok(package_dir) = ancestor.join(&format!("node_modules/@types/{}", mangle_scoped(name)))
            else {
                continue;
            };
            if let Some(found) = self.try_directory(&package_dir) {
                return Some(found);
            }
        }
        self.resolve_node_module(name, &dir)
    }

    fn resolve_node_module(&self, name: &str, from_dir: &NormalizedPath) -> Option<NormalizedPath> {
        for ancestor in from_dir.ancestors() {
            if ancestor.file_name() == "node_modules" {
                continue;
            }
            let Ok(modules) = ancestor.join("node_modules") else {
                continue;
            };
            if let Ok(candidate) = modules.join(name)
                && let Some(found) = self
                    .try_file(&candidate)
                    .or_else(|| self.try_directory(&candidate))
            {
                return Some(found);
            }
            if let Ok(typings) = modules.join(&format!("@types/{}", mangle_scoped(name)))
                && let Some(found) = self.try_directory(&typings)
            {
                return Some(found);
            }
        }
        tracing::trace!("no node_modules entry for '{}' above {}", name, from_dir);
        None
    }

    fn try_file(&self, base: &NormalizedPath) -> Option<NormalizedPath> {
        let name = base.file_name();
        if self.extensions.iter().any(|ext| name.ends_with(&format!(".{ext}")))
            && self.host.file_exists(base)
        {
            return Some(base.clone());
        }
        // `./b.js` written against a typed source `./b.ts`
        if let Some(ext) = base.extension()
            && SCRIPT_EXTENSIONS.contains(&ext)
        {
            let stem = &base.as_str()[..base.as_str().len() - ext.len() - 1];
            if let Ok(stem) = NormalizedPath::new(stem)
                && let Some(found) = self.try_with_extensions(&stem)
            {
                return Some(found);
            }
        }
        self.try_with_extensions(base)
    }

    fn try_with_extensions(&self, base: &NormalizedPath) -> Option<NormalizedPath> {
        self.extensions.iter().find_map(|ext| {
            let candidate = NormalizedPath::new(&format!("{}.{ext}", base.as_str())).ok()?;
            self.host.file_exists(&candidate).then_some(candidate)
        })
    }

    fn try_directory(&self, dir: &NormalizedPath) -> Option<NormalizedPath> {
        if let Ok(manifest) = dir.join("package.json")
            && let Some(text) = self.host.read_file(&manifest)
        {
            match serde_json::from_str::<PackageJson>(&text) {
                Ok(pkg) => {
                    if let Some(entry) = pkg.types.or(pkg.typings)
                        && let Ok(target) = dir.join(&entry)
                        && let Some(found) = self.try_file(&target)
                    {
                        return Some(found);
                    }
                }
                Err(e) => tracing::debug!("ignoring malformed {}: {}", manifest, e),
            }
        }
        let index = dir.join("index").ok()?;
        self.try_with_extensions(&index)
    }
}
