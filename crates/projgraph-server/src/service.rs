//! The project service.
//!
//! Owns the document registry, every project, and the membership index.
//! All mutation funnels through here: open/close/edit events, file watch
//! events, and on-demand rebuilds. Nothing here runs concurrently; an
//! event is processed to completion before the next one is accepted.

use crate::config::ServiceConfig;
use crate::document::{Document, DocumentRegistry, TextChange};
use crate::graph::GraphContext;
use crate::project::{
    MembershipIndex, Project, ProjectId, ProjectKind, ProjectSummary, manifest_roots,
};
use projgraph_core::{
    FileChangeKind, FileEvent, FileSystem, Manifest, ManifestLookup, ManifestProvider,
    NormalizedPath, PatternScanner, ProgramView, ProjectError, ReferenceScanner, Result,
};
use projgraph_host::JsonManifestProvider;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Number of live projects per variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectCounts {
    pub inferred: usize,
    pub configured: usize,
    pub auxiliary: usize,
}

pub struct ProjectService {
    config: ServiceConfig,
    fs: Arc<dyn FileSystem>,
    manifests: Arc<dyn ManifestProvider>,
    scanner: Arc<dyn ReferenceScanner>,
    documents: DocumentRegistry,
    projects: BTreeMap<ProjectId, Project>,
    membership: MembershipIndex,
    next_id: u32,
}

impl std::fmt::Debug for ProjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectService")
            .field("config", &self.config)
            .field("documents", &self.documents.len())
            .field("projects", &self.projects.len())
            .finish_non_exhaustive()
    }
}

impl ProjectService {
    /// Service reading manifests named by `config` through `fs`, with the
    /// pattern-based reference scanner.
    pub fn new(config: ServiceConfig, fs: Arc<dyn FileSystem>) -> Self {
        let manifests = Arc::new(JsonManifestProvider::with_file_names(
            Arc::clone(&fs),
            config.manifest_file_names.clone(),
        ));
        Self::with_collaborators(config, fs, manifests, Arc::new(PatternScanner))
    }

    pub fn with_collaborators(
        config: ServiceConfig,
        fs: Arc<dyn FileSystem>,
        manifests: Arc<dyn ManifestProvider>,
        scanner: Arc<dyn ReferenceScanner>,
    ) -> Self {
        tracing::info!(
            "project service started (capability: {}, single inferred project: {})",
            config.capability(),
            config.use_single_inferred_project
        );
        Self {
            config,
            fs,
            manifests,
            scanner,
            documents: DocumentRegistry::new(),
            projects: BTreeMap::new(),
            membership: MembershipIndex::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    pub fn document(&self, path: &NormalizedPath) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn list_projects(&self) -> Vec<ProjectSummary> {
        self.projects.values().map(Project::summary).collect()
    }

    pub fn counts(&self) -> ProjectCounts {
        let mut counts = ProjectCounts::default();
        for project in self.projects.values() {
            match project.kind() {
                ProjectKind::Inferred => counts.inferred += 1,
                ProjectKind::Configured => counts.configured += 1,
                ProjectKind::AuxiliarySyntaxOnly => counts.auxiliary += 1,
            }
        }
        counts
    }

    /// Ids of inferred projects, oldest first.
    pub fn inferred_projects(&self) -> Vec<ProjectId> {
        self.ids_of(ProjectKind::Inferred)
    }

    pub fn configured_projects(&self) -> Vec<ProjectId> {
        self.ids_of(ProjectKind::Configured)
    }

    fn ids_of(&self, kind: ProjectKind) -> Vec<ProjectId> {
        self.projects
            .values()
            .filter(|p| p.kind() == kind)
            .map(Project::id)
            .collect()
    }

    /// Configured project backed by the manifest at `manifest`.
    pub fn configured_project(&self, manifest: &NormalizedPath) -> Option<ProjectId> {
        self.projects
            .values()
            .find(|p| p.kind() == ProjectKind::Configured && p.manifest_path() == Some(manifest))
            .map(Project::id)
    }

    /// Projects linked to `path`: those holding it as a root first, then
    /// those that only reached it through resolution.
    pub fn projects_for(&self, path: &NormalizedPath) -> Vec<ProjectId> {
        let mut owners = self.membership.owners(path);
        owners.sort_by_key(|id| {
            let is_root = self.projects.get(id).is_some_and(|p| p.has_root(path));
            (!is_root, *id)
        });
        owners
    }

    pub fn default_project_for(&self, path: &NormalizedPath) -> Option<ProjectId> {
        self.projects_for(path).into_iter().next()
    }

    // ---- event API -------------------------------------------------------

    /// Opens a document and assigns it to a project.
    ///
    /// The owning project is left dirty; call
    /// [`ensure_up_to_date`](Self::ensure_up_to_date) before reading it.
    pub fn open_document(&mut self, path: NormalizedPath, content: String) -> Result<ProjectId> {
        let outcome = self.documents.open(&path, content)?;
        tracing::debug!(
            "opened {} (new: {}, changed: {})",
            path,
            outcome.created,
            outcome.content_changed
        );

        self.discard_auxiliary(&path);
        if outcome.content_changed {
            self.mark_owners_dirty(&path);
        }

        if let Some(id) = self.root_owner(&path) {
            if let Some(project) = self.projects.get_mut(&id) {
                project.mark_dirty();
            }
            return Ok(id);
        }
        Ok(self.assign(&path))
    }

    /// Closes a document. Inferred projects lose it as a root and are
    /// destroyed once empty; configured projects are only marked dirty.
    pub fn close_document(&mut self, path: &NormalizedPath) -> Result<()> {
        self.documents.close(path)?;
        tracing::debug!("closed {}", path);

        let mut emptied = Vec::new();
        for id in self.membership.owners(path) {
            let Some(project) = self.projects.get_mut(&id) else {
                continue;
            };
            if project.kind() == ProjectKind::Inferred && project.has_root(path) {
                project.remove_root(path);
                if !project.contains(path) {
                    self.membership.remove(id, path);
                }
                if project.roots().is_empty() {
                    emptied.push(id);
                }
            } else {
                project.mark_dirty();
            }
        }
        for id in emptied {
            self.remove_project(id);
        }

        self.release_if_unowned(path);
        Ok(())
    }

    /// Applies an editor change. `version` must exceed the current one.
    pub fn edit_document(
        &mut self,
        path: &NormalizedPath,
        change: &TextChange,
        version: u32,
    ) -> Result<()> {
        if let Err(e) = self.documents.edit(path, change, version) {
            tracing::warn!("rejected edit of {}: {}", path, e);
            return Err(e);
        }
        self.mark_owners_dirty(path);
        Ok(())
    }

    /// Translates a watch notification into service events.
    pub fn on_file_event(&mut self, event: &FileEvent) -> Result<()> {
        let path = &event.path;
        tracing::debug!("file event {:?} {}", event.kind, path);
        if self.manifests.is_manifest(path) {
            self.on_manifest_event(path, event.kind);
            return Ok(());
        }

        match event.kind {
            FileChangeKind::Created => {
                for project in self.projects.values_mut() {
                    if project.capability().is_semantic() && !project.unresolved().is_empty() {
                        project.mark_dirty();
                    }
                }
                let extensions = &self.config.resolution.extensions;
                let claimed: Vec<ProjectId> = self
                    .projects
                    .values()
                    .filter(|p| {
                        p.kind() == ProjectKind::Configured
                            && p.manifest().is_some()
                            && p.covers(path, extensions)
                            && !p.has_root(path)
                    })
                    .map(Project::id)
                    .collect();
                for id in claimed {
                    self.add_root(id, path);
                    self.claim_open_roots(id);
                }
            }
            FileChangeKind::Modified => {
                if self.documents.contains(path) && !self.documents.is_open(path) {
                    let text = self.fs.read_file(path)?;
                    if self.documents.reload(path, text)? {
                        self.mark_owners_dirty(path);
                    }
                }
            }
            FileChangeKind::Deleted => {
                if self.documents.is_open(path) {
                    return Ok(());
                }
                let auxiliary: Vec<ProjectId> = self
                    .projects
                    .values()
                    .filter(|p| p.kind() == ProjectKind::AuxiliarySyntaxOnly && p.has_root(path))
                    .map(Project::id)
                    .collect();
                for id in auxiliary {
                    self.remove_project(id);
                }
                for id in self.membership.owners(path) {
                    if let Some(project) = self.projects.get_mut(&id) {
                        project.remove_root(path);
                        project.mark_dirty();
                    }
                    self.membership.remove(id, path);
                }
                self.documents.release(path);
            }
        }
        Ok(())
    }

    fn on_manifest_event(&mut self, manifest: &NormalizedPath, kind: FileChangeKind) {
        let existing = self.configured_project(manifest);
        match (kind, existing) {
            (FileChangeKind::Modified | FileChangeKind::Created, Some(id)) => {
                if let Some(project) = self.projects.get_mut(&id) {
                    project.mark_manifest_stale();
                }
            }
            (FileChangeKind::Deleted, Some(id)) => {
                let open_roots: Vec<NormalizedPath> = self
                    .projects
                    .get(&id)
                    .map(|p| {
                        p.roots()
                            .iter()
                            .filter(|r| self.documents.is_open(r))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                tracing::info!("manifest {} deleted, reassigning {} files", manifest, open_roots.len());
                self.remove_project(id);
                for root in open_roots {
                    self.assign(&root);
                }
            }
            (FileChangeKind::Created, None) => {
                if self.config.syntax_only {
                    return;
                }
                let Some(dir) = manifest.parent() else {
                    return;
                };
                let moved: Vec<NormalizedPath> = self
                    .documents
                    .open_paths()
                    .into_iter()
                    .filter(|doc| doc.starts_with_dir(&dir) && !self.has_nearer_configured_owner(doc, &dir))
                    .collect();
                for doc in moved {
                    self.detach(&doc);
                    self.assign(&doc);
                }
            }
            _ => {}
        }
    }

    /// True when `path` is a root of a configured project governed by
    /// `dir` or a directory beneath it.
    fn has_nearer_configured_owner(&self, path: &NormalizedPath, dir: &NormalizedPath) -> bool {
        self.membership.owners(path).iter().any(|id| {
            self.projects.get(id).is_some_and(|p| {
                p.kind() == ProjectKind::Configured
                    && p.has_root(path)
                    && p.manifest_directory().is_some_and(|d| d.starts_with_dir(dir))
            })
        })
    }

    // ---- query API -------------------------------------------------------

    /// Rebuilds a project if it is dirty and records what the build read.
    pub fn ensure_up_to_date(&mut self, id: ProjectId) -> Result<()> {
        let project = self
            .projects
            .get_mut(&id)
            .ok_or_else(|| ProjectError::UnknownProject(id.to_string()))?;
        let ctx = GraphContext {
            fs: self.fs.as_ref(),
            documents: &self.documents,
            scanner: self.scanner.as_ref(),
            config: &self.config,
        };
        let Some(output) = project.ensure_up_to_date(&ctx, self.manifests.as_ref()) else {
            return Ok(());
        };

        for (path, text) in output.discovered {
            self.documents.track(path, text);
        }
        let orphaned = self.membership.set_members(id, project.members());
        for path in orphaned {
            self.documents.release(&path);
        }
        // a reloaded manifest may have picked up files opened elsewhere
        if project.kind() == ProjectKind::Configured {
            self.claim_open_roots(id);
        }
        Ok(())
    }

    /// Brings every dirty project up to date.
    pub fn ensure_all_up_to_date(&mut self) -> Result<()> {
        let dirty: Vec<ProjectId> = self
            .projects
            .values()
            .filter(|p| p.is_dirty())
            .map(Project::id)
            .collect();
        for id in dirty {
            // claiming roots can tear down an inferred project queued here
            if self.projects.contains_key(&id) {
                self.ensure_up_to_date(id)?;
            }
        }
        Ok(())
    }

    /// The derived file set of a project, rebuilt first if needed.
    pub fn get_project_files(&mut self, id: ProjectId) -> Result<Vec<NormalizedPath>> {
        self.ensure_up_to_date(id)?;
        let project = self
            .projects
            .get(&id)
            .ok_or_else(|| ProjectError::UnknownProject(id.to_string()))?;
        Ok(project.files().map(<[_]>::to_vec).unwrap_or_default())
    }

    /// Project to serve requests for `path`, creating an auxiliary
    /// syntax-only project when nothing owns it but the host has the file.
    pub fn ensure_project_for(&mut self, path: &NormalizedPath) -> Result<ProjectId> {
        if let Some(id) = self.default_project_for(path) {
            return Ok(id);
        }
        if !self.documents.contains(path) {
            let text = self
                .fs
                .read_file(path)
                .map_err(|_| ProjectError::NoProject(path.to_string()))?;
            self.documents.track(path.clone(), text);
        }

        let id = self.allocate_id();
        let project = Project::auxiliary(id, path.clone());
        tracing::info!("created auxiliary project {} for {}", project.name(), path);
        self.projects.insert(id, project);
        self.membership.add(id, path);
        Ok(id)
    }

    /// Program view of an up-to-date project.
    pub fn program(&self, id: ProjectId) -> Result<ProgramView<'_>> {
        let project = self
            .projects
            .get(&id)
            .ok_or_else(|| ProjectError::UnknownProject(id.to_string()))?;
        let files = project.files().ok_or_else(|| {
            ProjectError::InvalidRequest(format!("project {} is not up to date", project.name()))
        })?;
        Ok(ProgramView {
            project: project.name(),
            capability: project.capability(),
            files,
            sources: &self.documents,
        })
    }

    // ---- assignment ------------------------------------------------------

    fn allocate_id(&mut self) -> ProjectId {
        self.next_id += 1;
        ProjectId::new(self.next_id)
    }

    /// Non-auxiliary project holding `path` as a root.
    fn root_owner(&self, path: &NormalizedPath) -> Option<ProjectId> {
        self.membership.owners(path).into_iter().find(|id| {
            self.projects
                .get(id)
                .is_some_and(|p| p.kind() != ProjectKind::AuxiliarySyntaxOnly && p.has_root(path))
        })
    }

    fn assign(&mut self, path: &NormalizedPath) -> ProjectId {
        if !self.config.syntax_only
            && let Some(id) = self.find_or_create_configured(path)
        {
            self.add_root(id, path);
            return id;
        }

        let id = match self.inferred_projects().first() {
            Some(id) if self.config.use_single_inferred_project => *id,
            _ => self.create_inferred(),
        };
        self.add_root(id, path);
        id
    }

    fn add_root(&mut self, id: ProjectId, path: &NormalizedPath) {
        if let Some(project) = self.projects.get_mut(&id) {
            project.add_root(path.clone());
            self.membership.add(id, path);
        }
    }

    fn create_inferred(&mut self) -> ProjectId {
        let id = self.allocate_id();
        let project = Project::inferred(id, self.config.capability());
        tracing::info!(
            "created inferred project {} ({})",
            project.name(),
            project.capability()
        );
        self.projects.insert(id, project);
        id
    }

    /// Nearest manifest above `path` whose rules cover it.
    fn find_or_create_configured(&mut self, path: &NormalizedPath) -> Option<ProjectId> {
        let dir = path.parent()?;
        for ancestor in dir.ancestors() {
            let existing = self.projects.values().find(|p| {
                p.kind() == ProjectKind::Configured
                    && p.manifest_directory().as_ref() == Some(&ancestor)
            });
            if let Some(project) = existing {
                if project.covers(path, &self.config.resolution.extensions) {
                    return Some(project.id());
                }
                continue;
            }

            match self.manifests.lookup(&ancestor) {
                ManifestLookup::NotFound => {}
                ManifestLookup::Found(manifest) => {
                    if manifest.covers(path, &self.config.resolution.extensions) {
                        return Some(self.create_configured(manifest));
                    }
                    tracing::debug!("{} does not cover {}", manifest.path, path);
                }
                ManifestLookup::Failed { path: manifest, reason } => {
                    let id = self.allocate_id();
                    self.projects.insert(
                        id,
                        Project::configured_unloadable(id, manifest, reason),
                    );
                    return Some(id);
                }
            }
        }
        None
    }

    fn create_configured(&mut self, manifest: Manifest) -> ProjectId {
        let id = self.allocate_id();
        let roots = {
            let ctx = GraphContext {
                fs: self.fs.as_ref(),
                documents: &self.documents,
                scanner: self.scanner.as_ref(),
                config: &self.config,
            };
            manifest_roots(&manifest, &ctx)
        };

        let mut project = Project::configured(id, manifest, self.config.capability());
        for root in roots {
            self.membership.add(id, &root);
            project.add_root(root);
        }
        tracing::info!(
            "created configured project {} ({}, {} roots)",
            project.name(),
            project.capability(),
            project.roots().len()
        );
        self.projects.insert(id, project);
        self.claim_open_roots(id);
        id
    }

    /// Takes every open root of configured project `id` away from the
    /// projects that held it before, so each open document keeps a single
    /// root owner.
    fn claim_open_roots(&mut self, id: ProjectId) {
        let Some(project) = self.projects.get(&id) else {
            return;
        };
        let contested: Vec<NormalizedPath> = project
            .roots()
            .iter()
            .filter(|root| {
                self.documents.is_open(root)
                    && self.membership.owners(root).iter().any(|other| {
                        *other != id && self.projects.get(other).is_some_and(|p| p.has_root(root))
                    })
            })
            .cloned()
            .collect();
        for root in contested {
            tracing::debug!("project {} claims {}", id, root);
            self.detach_except(&root, Some(id));
        }
    }

    // ---- teardown --------------------------------------------------------

    fn remove_project(&mut self, id: ProjectId) {
        let Some(project) = self.projects.remove(&id) else {
            return;
        };
        tracing::info!("removed project {}", project.name());
        for path in self.membership.remove_project(id) {
            self.documents.release(&path);
        }
    }

    /// Drops `path` as a root everywhere, destroying emptied inferred
    /// projects.
    fn detach(&mut self, path: &NormalizedPath) {
        self.detach_except(path, None);
    }

    fn detach_except(&mut self, path: &NormalizedPath, keep: Option<ProjectId>) {
        let mut emptied = Vec::new();
        for id in self.membership.owners(path) {
            if Some(id) == keep {
                continue;
            }
            let Some(project) = self.projects.get_mut(&id) else {
                continue;
            };
            if !project.has_root(path) {
                continue;
            }
            project.remove_root(path);
            if !project.contains(path) {
                self.membership.remove(id, path);
            }
            if project.kind() == ProjectKind::Inferred && project.roots().is_empty() {
                emptied.push(id);
            }
        }
        for id in emptied {
            self.remove_project(id);
        }
    }

    fn discard_auxiliary(&mut self, path: &NormalizedPath) {
        let auxiliary: Vec<ProjectId> = self
            .membership
            .owners(path)
            .into_iter()
            .filter(|id| {
                self.projects
                    .get(id)
                    .is_some_and(|p| p.kind() == ProjectKind::AuxiliarySyntaxOnly)
            })
            .collect();
        for id in auxiliary {
            self.remove_project(id);
        }
    }

    fn mark_owners_dirty(&mut self, path: &NormalizedPath) {
        for id in self.membership.owners(path) {
            if let Some(project) = self.projects.get_mut(&id) {
                project.mark_dirty();
            }
        }
    }

    fn release_if_unowned(&mut self, path: &NormalizedPath) {
        if !self.membership.is_owned(path) {
            self.documents.release(path);
        }
    }
}
