//! Automatic acquisition of ambient declaration packages.
//!
//! Packages under `node_modules/@types` in any ancestor directory of a root
//! are acquired without being referenced, the way a compiler picks up
//! global typings. Only full-semantic builds call into this module.

use crate::graph::GraphContext;
use indexmap::IndexMap;
use projgraph_core::{FileSystem, ModuleResolver, NormalizedPath};
use std::collections::HashSet;

/// One acquired declaration package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientDeclaration {
    /// Declared package name, e.g. `node` or `@scope/pkg`.
    pub package: String,
    /// Entry declaration file.
    pub entry: NormalizedPath,
}

/// `scope__pkg` under `@types` declares `@scope/pkg`.
fn package_name(dir_name: &str) -> String {
    match dir_name.split_once("__") {
        Some((scope, name)) => format!("@{scope}/{name}"),
        None => dir_name.to_string(),
    }
}

/// Lists `@types` packages visible from `dir` and its ancestors, nearest
/// first. `scanned` holds `@types` directories already listed.
fn scan_type_roots(
    fs: &dyn FileSystem,
    dir: &NormalizedPath,
    scanned: &mut HashSet<NormalizedPath>,
    found: &mut Vec<String>,
) {
    for ancestor in dir.ancestors() {
        let Ok(type_root) = ancestor.join("node_modules/@types") else {
            continue;
        };
        if !scanned.insert(type_root.clone()) || !fs.directory_exists(&type_root) {
            continue;
        }
        match fs.read_dir(&type_root) {
            Ok(entries) => found.extend(
                entries
                    .into_iter()
                    .filter(|e| e.is_dir)
                    .map(|e| package_name(e.path.file_name())),
            ),
            Err(e) => tracing::debug!("cannot list {}: {}", type_root, e),
        }
    }
}

/// Discovers ambient declarations for a project.
///
/// `restrict` mirrors `compilerOptions.types`: when present only those
/// packages are acquired. The service-wide acquisition policy is applied on
/// top, and the result is deduplicated by package name, keeping the
/// declaration nearest to the first root that sees it.
pub fn discover<'r>(
    ctx: &GraphContext<'_>,
    roots: impl IntoIterator<Item = &'r NormalizedPath>,
    restrict: Option<&[String]>,
) -> Vec<AmbientDeclaration> {
    let policy = &ctx.config.type_acquisition;
    if !policy.enabled {
        return Vec::new();
    }

    // package -> root it should be resolved from
    let mut candidates: IndexMap<String, NormalizedPath> = IndexMap::new();
    let roots: Vec<&NormalizedPath> = roots.into_iter().collect();
    let Some(first_root) = roots.first() else {
        return Vec::new();
    };

    match restrict {
        Some(names) => {
            for name in names {
                candidates
                    .entry(name.clone())
                    .or_insert_with(|| (*first_root).clone());
            }
        }
        None => {
            let mut scanned = HashSet::new();
            for root in &roots {
                let Some(dir) = root.parent() else { continue };
                let mut found = Vec::new();
                scan_type_roots(ctx.fs, &dir, &mut scanned, &mut found);
                for package in found {
                    candidates.entry(package).or_insert_with(|| (*root).clone());
                }
            }
        }
    }
    for name in &policy.include {
        candidates
            .entry(name.clone())
            .or_insert_with(|| (*first_root).clone());
    }

    let resolver = ModuleResolver::new(ctx, &ctx.config.resolution.extensions);
    candidates
        .into_iter()
        .filter(|(package, _)| policy.allows(package))
        .filter_map(|(package, from)| {
            let entry = resolver.resolve_type_reference(&package, &from);
            if entry.is_none() {
                tracing::debug!("no declaration entry for @types package {}", package);
            }
            entry.map(|entry| AmbientDeclaration { package, entry })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::document::DocumentRegistry;
    use projgraph_core::PatternScanner;
    use projgraph_host::MemoryFileSystem;

    fn p(raw: &str) -> NormalizedPath {
        NormalizedPath::new(raw).unwrap()
    }

    fn fixture() -> MemoryFileSystem {
        MemoryFileSystem::with_files([
            ("/proj/a.ts", ""),
            ("/proj/node_modules/@types/node/index.d.ts", ""),
            ("/node_modules/@types/node/index.d.ts", ""),
            ("/node_modules/@types/somemodule/index.d.ts", ""),
            ("/node_modules/@types/scope__pkg/index.d.ts", ""),
        ])
        .unwrap()
    }

    fn run(config: &ServiceConfig, restrict: Option<&[String]>) -> Vec<(String, String)> {
        let fs = fixture();
        let documents = DocumentRegistry::new();
        let ctx = GraphContext {
            fs: &fs,
            documents: &documents,
            scanner: &PatternScanner,
            config,
        };
        let roots = [p("/proj/a.ts")];
        discover(&ctx, &roots, restrict)
            .into_iter()
            .map(|d| (d.package, d.entry.to_string()))
            .collect()
    }

    #[test]
    fn test_nearest_declaration_wins_and_names_are_unique() {
        let found = run(&ServiceConfig::default(), None);
        assert_eq!(
            found,
            vec![
                ("node".to_string(), "/proj/node_modules/@types/node/index.d.ts".to_string()),
                ("@scope/pkg".to_string(), "/node_modules/@types/scope__pkg/index.d.ts".to_string()),
                ("somemodule".to_string(), "/node_modules/@types/somemodule/index.d.ts".to_string()),
            ]
        );
    }

    #[test]
    fn test_types_option_restricts_packages() {
        let restrict = vec!["somemodule".to_string()];
        let found = run(&ServiceConfig::default(), Some(&restrict));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "somemodule");
    }

    #[test]
    fn test_policy_exclude_and_disable() {
        let mut config = ServiceConfig::default();
        config.type_acquisition.exclude = vec!["node".into()];
        let found = run(&config, None);
        assert!(found.iter().all(|(name, _)| name != "node"));

        config.type_acquisition.enabled = false;
        assert!(run(&config, None).is_empty());
    }
}
