//! Project graph building.
//!
//! A build turns a project's root set into its derived file set. The
//! strategy is chosen by capability level and nothing else:
//!
//! - [`BuildStrategy::Identity`] (syntactic-only): the derived set is the
//!   root set, in root order. Sources are not even read.
//! - [`BuildStrategy::FullResolution`] (full-semantic): the closure of the
//!   roots under module specifiers and reference directives, followed by
//!   acquired ambient declarations and the default library.
//!
//! Builds are pure with respect to service state: files read from the host
//! during a build are returned in [`BuildOutput::discovered`] and the caller
//! decides what to record.

use crate::config::ServiceConfig;
use crate::document::DocumentRegistry;
use crate::typings;
use indexmap::IndexSet;
use projgraph_core::{
    CapabilityLevel, FileSystem, ModuleResolver, NormalizedPath, ProjectError, ReferenceKind,
    ReferenceScanner, ResolutionHost, SourceProvider,
};
use std::collections::{HashSet, VecDeque};

/// Read-only view of everything a build may consult.
pub struct GraphContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub documents: &'a DocumentRegistry,
    pub scanner: &'a dyn ReferenceScanner,
    pub config: &'a ServiceConfig,
}

impl ResolutionHost for GraphContext<'_> {
    fn file_exists(&self, path: &NormalizedPath) -> bool {
        self.documents.contains(path) || self.fs.file_exists(path)
    }

    fn read_file(&self, path: &NormalizedPath) -> Option<String> {
        match self.documents.source_text(path) {
            Some(text) => Some(text.to_string()),
            None => self.fs.read_file(path).ok(),
        }
    }
}

/// Rebuild strategy selected by a project's capability level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStrategy {
    Identity,
    FullResolution,
}

impl BuildStrategy {
    pub fn for_capability(capability: CapabilityLevel) -> Self {
        match capability {
            CapabilityLevel::FullSemantic => Self::FullResolution,
            CapabilityLevel::SyntacticOnly => Self::Identity,
        }
    }
}

/// Per-project knobs coming from its manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Restricts ambient acquisition to these packages.
    pub types: Option<Vec<String>>,
    /// Leaves the default library out.
    pub no_lib: bool,
}

/// A specifier that resolved to nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub from: NormalizedPath,
    pub specifier: String,
    pub kind: ReferenceKind,
}

impl UnresolvedReference {
    pub fn to_error(&self) -> ProjectError {
        ProjectError::ResolutionFailure {
            from: self.from.to_string(),
            specifier: self.specifier.clone(),
        }
    }
}

/// Result of one build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Derived file set in deterministic order.
    pub files: Vec<NormalizedPath>,
    /// Files read from the host because no document tracked them yet.
    pub discovered: Vec<(NormalizedPath, String)>,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Computes the derived file set of `roots`.
///
/// # Examples
///
/// ```
/// use indexmap::IndexSet;
/// use projgraph_core::{NormalizedPath, PatternScanner};
/// use projgraph_host::MemoryFileSystem;
/// use projgraph_server::config::ServiceConfig;
/// use projgraph_server::document::DocumentRegistry;
/// use projgraph_server::graph::{BuildOptions, BuildStrategy, GraphContext, build_graph};
///
/// let fs = MemoryFileSystem::with_files([
///     ("/p/a.ts", "import { b } from './b';"),
///     ("/p/b.ts", "export const b = 1;"),
/// ])
/// .unwrap();
/// let documents = DocumentRegistry::new();
/// let config = ServiceConfig::default();
/// let ctx = GraphContext { fs: &fs, documents: &documents, scanner: &PatternScanner, config: &config };
///
/// let roots: IndexSet<_> = [NormalizedPath::new("/p/a.ts").unwrap()].into_iter().collect();
/// let options = BuildOptions::default();
///
/// let full = build_graph(BuildStrategy::FullResolution, &roots, &options, &ctx);
/// assert_eq!(full.files.len(), 2);
///
/// let identity = build_graph(BuildStrategy::Identity, &roots, &options, &ctx);
/// assert_eq!(identity.files.len(), 1);
/// ```
pub fn build_graph(
    strategy: BuildStrategy,
    roots: &IndexSet<NormalizedPath>,
    options: &BuildOptions,
    ctx: &GraphContext<'_>,
) -> BuildOutput {
    match strategy {
        BuildStrategy::Identity => BuildOutput {
            files: roots.iter().cloned().collect(),
            ..BuildOutput::default()
        },
        BuildStrategy::FullResolution => Closure::new(ctx).run(roots, options),
    }
}

/// Breadth-first reference closure with a visited set keyed by path.
struct Closure<'c, 'a> {
    ctx: &'c GraphContext<'a>,
    resolver: ModuleResolver<'c, GraphContext<'a>>,
    visited: HashSet<NormalizedPath>,
    queue: VecDeque<(NormalizedPath, usize)>,
    output: BuildOutput,
}

impl<'c, 'a> Closure<'c, 'a> {
    fn new(ctx: &'c GraphContext<'a>) -> Self {
        Self {
            ctx,
            resolver: ModuleResolver::new(ctx, &ctx.config.resolution.extensions),
            visited: HashSet::new(),
            queue: VecDeque::new(),
            output: BuildOutput::default(),
        }
    }

    fn run(mut self, roots: &IndexSet<NormalizedPath>, options: &BuildOptions) -> BuildOutput {
        for root in roots {
            self.visit(root.clone(), 0);
            self.drain();
        }

        for declaration in typings::discover(self.ctx, roots, options.types.as_deref()) {
            tracing::debug!("acquired ambient declarations for {}", declaration.package);
            self.visit(declaration.entry, 0);
            self.drain();
        }

        if !options.no_lib
            && let Some(library) = &self.ctx.config.default_library
        {
            if self.ctx.file_exists(library) {
                self.visit(library.clone(), 0);
                self.drain();
            } else {
                tracing::debug!("default library {} not found", library);
            }
        }

        tracing::debug!(
            "full build: {} files, {} unresolved",
            self.output.files.len(),
            self.output.unresolved.len()
        );
        self.output
    }

    fn visit(&mut self, path: NormalizedPath, depth: usize) {
        if self.visited.insert(path.clone()) {
            self.output.files.push(path.clone());
            self.queue.push_back((path, depth));
        }
    }

    fn drain(&mut self) {
        while let Some((path, depth)) = self.queue.pop_front() {
            let Some(text) = self.text_of(&path) else {
                tracing::debug!("cannot read {}, not following its references", path);
                continue;
            };
            if self
                .ctx
                .config
                .resolution
                .max_depth
                .is_some_and(|max| depth >= max)
            {
                continue;
            }

            let references = self.ctx.scanner.scan(&text);
            for reference in references.iter() {
                match self.resolver.resolve(reference, &path) {
                    Some(target) => self.visit(target, depth + 1),
                    None => {
                        tracing::debug!("unresolved '{}' in {}", reference.specifier, path);
                        self.output.unresolved.push(UnresolvedReference {
                            from: path.clone(),
                            specifier: reference.specifier.clone(),
                            kind: reference.kind,
                        });
                    }
                }
            }
        }
    }

    fn text_of(&mut self, path: &NormalizedPath) -> Option<String> {
        if let Some(text) = self.ctx.documents.source_text(path) {
            return Some(text.to_string());
        }
        let text = self.ctx.fs.read_file(path).ok()?;
        self.output.discovered.push((path.clone(), text.clone()));
        Some(text)
    }
}
