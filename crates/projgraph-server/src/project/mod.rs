//! Projects: named root sets with a lazily rebuilt derived file set.
//!
//! All three variants share one struct. The variant tag decides lifecycle
//! policy in the service; the capability level alone decides how the
//! derived set is built.

pub mod membership;

pub use membership::MembershipIndex;

use crate::graph::{BuildOptions, BuildOutput, BuildStrategy, GraphContext, UnresolvedReference, build_graph};
use indexmap::IndexSet;
use projgraph_core::{
    CapabilityLevel, Manifest, ManifestLookup, ManifestProvider, NormalizedPath, ProjectError,
    has_extension,
};
use serde::Serialize;
use std::fmt;

/// Synthetic project identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProjectId(u32);

impl ProjectId {
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectKind {
    /// No manifest; created for open files and destroyed when empty.
    Inferred,
    /// Backed by a manifest; survives closes.
    Configured,
    /// Single-file stand-in serving syntactic requests for a path no other
    /// project owns.
    AuxiliarySyntaxOnly,
}

/// Row of `list_projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub kind: ProjectKind,
    pub capability: CapabilityLevel,
    pub root_count: usize,
    pub dirty: bool,
}

#[derive(Debug)]
pub struct Project {
    id: ProjectId,
    kind: ProjectKind,
    name: String,
    capability: CapabilityLevel,
    roots: IndexSet<NormalizedPath>,
    derived: Option<Vec<NormalizedPath>>,
    dirty: bool,
    manifest: Option<Manifest>,
    manifest_path: Option<NormalizedPath>,
    manifest_stale: bool,
    load_failure: Option<String>,
    options: BuildOptions,
    unresolved: Vec<UnresolvedReference>,
    build_count: u64,
}

impl Project {
    fn base(id: ProjectId, kind: ProjectKind, name: String, capability: CapabilityLevel) -> Self {
        Self {
            id,
            kind,
            name,
            capability,
            roots: IndexSet::new(),
            derived: None,
            dirty: true,
            manifest: None,
            manifest_path: None,
            manifest_stale: false,
            load_failure: None,
            options: BuildOptions::default(),
            unresolved: Vec::new(),
            build_count: 0,
        }
    }

    pub fn inferred(id: ProjectId, capability: CapabilityLevel) -> Self {
        Self::base(id, ProjectKind::Inferred, format!("inferred{id}"), capability)
    }

    /// Configured project from a loaded manifest. A manifest asking for
    /// `syntaxOnly` caps the capability level.
    pub fn configured(id: ProjectId, manifest: Manifest, capability: CapabilityLevel) -> Self {
        let capability = if manifest.options.syntax_only {
            CapabilityLevel::SyntacticOnly
        } else {
            capability
        };
        let mut project = Self::base(
            id,
            ProjectKind::Configured,
            manifest.path.to_string(),
            capability,
        );
        project.options = options_of(&manifest);
        project.manifest_path = Some(manifest.path.clone());
        project.manifest = Some(manifest);
        project
    }

    /// Configured project whose manifest could not be loaded. It starts
    /// syntactic-only and records the failure.
    pub fn configured_unloadable(id: ProjectId, manifest_path: NormalizedPath, reason: String) -> Self {
        let mut project = Self::base(
            id,
            ProjectKind::Configured,
            manifest_path.to_string(),
            CapabilityLevel::SyntacticOnly,
        );
        tracing::warn!(
            "configured project {} is syntactic-only: {}",
            manifest_path,
            reason
        );
        project.manifest_path = Some(manifest_path);
        project.load_failure = Some(reason);
        project
    }

    pub fn auxiliary(id: ProjectId, root: NormalizedPath) -> Self {
        let mut project = Self::base(
            id,
            ProjectKind::AuxiliarySyntaxOnly,
            format!("auxiliary{id}"),
            CapabilityLevel::SyntacticOnly,
        );
        project.roots.insert(root);
        project
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> CapabilityLevel {
        self.capability
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn roots(&self) -> &IndexSet<NormalizedPath> {
        &self.roots
    }

    pub fn has_root(&self, path: &NormalizedPath) -> bool {
        self.roots.contains(path)
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn manifest_path(&self) -> Option<&NormalizedPath> {
        self.manifest_path.as_ref()
    }

    /// Directory governed by this project's manifest.
    pub fn manifest_directory(&self) -> Option<NormalizedPath> {
        self.manifest_path.as_ref().and_then(NormalizedPath::parent)
    }

    /// The recorded configuration failure, if the manifest could not be
    /// loaded at some point.
    pub fn configuration_error(&self) -> Option<ProjectError> {
        let reason = self.load_failure.as_ref()?;
        Some(ProjectError::ConfigurationLoadFailure {
            manifest: self
                .manifest_path
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            reason: reason.clone(),
        })
    }

    /// References the last build could not resolve.
    pub fn unresolved(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }

    pub fn build_count(&self) -> u64 {
        self.build_count
    }

    /// True when the manifest's root rules claim `path`. An unloadable
    /// manifest claims its whole directory.
    pub fn covers(&self, path: &NormalizedPath, extensions: &[String]) -> bool {
        match (&self.manifest, self.manifest_directory()) {
            (Some(manifest), _) => manifest.covers(path, extensions),
            (None, Some(dir)) if self.kind == ProjectKind::Configured => {
                path.starts_with_dir(&dir) && has_extension(path, extensions)
            }
            _ => false,
        }
    }

    pub fn add_root(&mut self, path: NormalizedPath) -> bool {
        self.dirty = true;
        self.roots.insert(path)
    }

    pub fn remove_root(&mut self, path: &NormalizedPath) -> bool {
        self.dirty = true;
        self.roots.shift_remove(path)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Schedules a manifest reload for the next rebuild.
    pub fn mark_manifest_stale(&mut self) {
        self.manifest_stale = true;
        self.dirty = true;
    }

    /// The derived file set, or `None` while it is stale.
    pub fn files(&self) -> Option<&[NormalizedPath]> {
        if self.dirty {
            return None;
        }
        self.derived.as_deref()
    }

    /// Root or member of the last derived set.
    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.roots.contains(path) || self.derived.as_ref().is_some_and(|d| d.contains(path))
    }

    /// Every path this project currently holds a link to.
    pub fn members(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.roots
            .iter()
            .chain(self.derived.iter().flatten().filter(|p| !self.roots.contains(*p)))
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            capability: self.capability,
            root_count: self.roots.len(),
            dirty: self.dirty,
        }
    }

    /// Rebuilds the derived set if dirty.
    ///
    /// Returns the build output when a build ran. A stale manifest is
    /// reloaded first; if that fails the project is downgraded to
    /// syntactic-only and the build proceeds, so the project is never left
    /// dirty.
    pub fn ensure_up_to_date(
        &mut self,
        ctx: &GraphContext<'_>,
        manifests: &dyn ManifestProvider,
    ) -> Option<BuildOutput> {
        if !self.dirty {
            return None;
        }
        if self.manifest_stale {
            self.reload_manifest(ctx, manifests);
        }

        let strategy = BuildStrategy::for_capability(self.capability);
        let output = build_graph(strategy, &self.roots, &self.options, ctx);
        tracing::debug!(
            "rebuilt project {} ({:?}): {} roots, {} files",
            self.name,
            strategy,
            self.roots.len(),
            output.files.len()
        );

        self.derived = Some(output.files.clone());
        self.unresolved.clone_from(&output.unresolved);
        self.dirty = false;
        self.build_count += 1;
        Some(output)
    }

    fn reload_manifest(&mut self, ctx: &GraphContext<'_>, manifests: &dyn ManifestProvider) {
        self.manifest_stale = false;
        let (Some(path), Some(dir)) = (self.manifest_path.clone(), self.manifest_directory()) else {
            return;
        };

        match manifests.lookup(&dir) {
            ManifestLookup::Found(manifest) if manifest.path == path => {
                tracing::info!("reloaded manifest {}", path);
                if self.load_failure.take().is_some() {
                    tracing::info!("project {} recovered from a failed manifest load", self.name);
                }
                self.capability = if manifest.options.syntax_only {
                    CapabilityLevel::SyntacticOnly
                } else {
                    ctx.config.capability()
                };
                let mut roots: IndexSet<NormalizedPath> =
                    manifest_roots(&manifest, ctx).into_iter().collect();
                for root in &self.roots {
                    if ctx.documents.is_open(root) {
                        roots.insert(root.clone());
                    }
                }
                self.roots = roots;
                self.options = options_of(&manifest);
                self.manifest = Some(manifest);
            }
            ManifestLookup::Failed { reason, .. } => self.downgrade(reason),
            _ => self.downgrade(format!("{path} is no longer available")),
        }
    }

    fn downgrade(&mut self, reason: String) {
        if self.capability.is_semantic() {
            tracing::warn!(
                "downgrading project {} to syntactic-only: {}",
                self.name,
                reason
            );
        }
        self.capability = CapabilityLevel::SyntacticOnly;
        self.manifest = None;
        self.load_failure = Some(reason);
    }
}

fn options_of(manifest: &Manifest) -> BuildOptions {
    BuildOptions {
        types: manifest.options.types.clone(),
        no_lib: manifest.options.no_lib,
    }
}

/// Root files named by a manifest, per the service configuration.
pub fn manifest_roots(manifest: &Manifest, ctx: &GraphContext<'_>) -> Vec<NormalizedPath> {
    manifest.enumerate(
        ctx.fs,
        &ctx.config.manifest_file_names,
        &ctx.config.resolution.extensions,
    )
}
