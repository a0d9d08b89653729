//! Document → project back-references.
//!
//! Documents never own or point at projects. Instead the service keeps this
//! index, updated on every root mutation and after every rebuild, and uses
//! it for invalidation fan-out and to decide when a document can be
//! released.

use super::ProjectId;
use projgraph_core::NormalizedPath;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct MembershipIndex {
    by_document: HashMap<NormalizedPath, BTreeSet<ProjectId>>,
    by_project: HashMap<ProjectId, HashSet<NormalizedPath>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, project: ProjectId, path: &NormalizedPath) {
        self.by_document
            .entry(path.clone())
            .or_default()
            .insert(project);
        self.by_project
            .entry(project)
            .or_default()
            .insert(path.clone());
    }

    /// Removes one link. Returns true when `path` has no owner left.
    pub fn remove(&mut self, project: ProjectId, path: &NormalizedPath) -> bool {
        if let Some(paths) = self.by_project.get_mut(&project) {
            paths.remove(path);
        }
        match self.by_document.get_mut(path) {
            Some(owners) => {
                owners.remove(&project);
                if owners.is_empty() {
                    self.by_document.remove(path);
                    true
                } else {
                    false
                }
            }
            None => true,
        }
    }

    /// Replaces the member set of `project`.
    ///
    /// Returns the paths that lost their last owner.
    pub fn set_members<'a>(
        &mut self,
        project: ProjectId,
        members: impl IntoIterator<Item = &'a NormalizedPath>,
    ) -> Vec<NormalizedPath> {
        let next: HashSet<NormalizedPath> = members.into_iter().cloned().collect();
        let previous = self.by_project.remove(&project).unwrap_or_default();

        let mut orphaned = Vec::new();
        for path in previous.difference(&next) {
            if let Some(owners) = self.by_document.get_mut(path) {
                owners.remove(&project);
                if owners.is_empty() {
                    self.by_document.remove(path);
                    orphaned.push(path.clone());
                }
            }
        }
        for path in &next {
            self.by_document
                .entry(path.clone())
                .or_default()
                .insert(project);
        }
        self.by_project.insert(project, next);
        orphaned.sort();
        orphaned
    }

    /// Forgets a project entirely. Returns the paths left without owner.
    pub fn remove_project(&mut self, project: ProjectId) -> Vec<NormalizedPath> {
        let orphaned = self.set_members(project, std::iter::empty());
        self.by_project.remove(&project);
        orphaned
    }

    /// Owner projects of `path`, in id order.
    pub fn owners(&self, path: &NormalizedPath) -> Vec<ProjectId> {
        self.by_document
            .get(path)
            .map(|owners| owners.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_owned(&self, path: &NormalizedPath) -> bool {
        self.by_document.contains_key(path)
    }

    pub fn members(&self, project: ProjectId) -> impl Iterator<Item = &NormalizedPath> {
        self.by_project.get(&project).into_iter().flatten()
    }
}
