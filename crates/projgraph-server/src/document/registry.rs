use super::state::{Document, TextChange};
use projgraph_core::{NormalizedPath, ProjectError, Result, SourceProvider};
use std::collections::HashMap;

/// What [`DocumentRegistry::open`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOutcome {
    /// The document did not exist before.
    pub created: bool,
    /// An existing document's content was replaced.
    pub content_changed: bool,
}

/// Storage for every document the service has touched.
///
/// Pure bookkeeping: no resolution happens here, and owner projects are
/// notified by the project service, not by the registry.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: HashMap<NormalizedPath, Document>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a document open, creating it at version 1 when absent.
    ///
    /// An existing document keeps its identity; its content is replaced
    /// (and the version bumped) only when the supplied text differs.
    pub fn open(&mut self, path: &NormalizedPath, content: String) -> Result<OpenOutcome> {
        match self.documents.get_mut(path) {
            Some(document) => {
                let content_changed = document.replace_content(content)?;
                document.set_open(true);
                Ok(OpenOutcome {
                    created: false,
                    content_changed,
                })
            }
            None => {
                let mut document = Document::new(path.clone(), content);
                document.set_open(true);
                self.documents.insert(path.clone(), document);
                Ok(OpenOutcome {
                    created: true,
                    content_changed: false,
                })
            }
        }
    }

    /// Marks a document closed. The record itself stays until
    /// [`release`](Self::release) is called for it.
    pub fn close(&mut self, path: &NormalizedPath) -> Result<()> {
        let document = self
            .documents
            .get_mut(path)
            .ok_or_else(|| ProjectError::UnknownDocument(path.to_string()))?;
        if !document.is_open() {
            return Err(ProjectError::DocumentNotOpen(path.to_string()));
        }
        document.set_open(false);
        Ok(())
    }

    /// Applies an editor change to an open document.
    pub fn edit(&mut self, path: &NormalizedPath, change: &TextChange, version: u32) -> Result<()> {
        let document = self
            .documents
            .get_mut(path)
            .ok_or_else(|| ProjectError::UnknownDocument(path.to_string()))?;
        if !document.is_open() {
            return Err(ProjectError::DocumentNotOpen(path.to_string()));
        }
        document.apply_edit(change, version)
    }

    /// Records a document discovered through reference resolution.
    ///
    /// Returns false if it was already tracked; tracked content is never
    /// overwritten by discovery.
    pub fn track(&mut self, path: NormalizedPath, content: String) -> bool {
        if self.documents.contains_key(&path) {
            return false;
        }
        self.documents
            .insert(path.clone(), Document::new(path, content));
        true
    }

    /// Refreshes a closed document from disk. Open documents belong to the
    /// editor and are left alone. Returns true when the content changed.
    pub fn reload(&mut self, path: &NormalizedPath, content: String) -> Result<bool> {
        match self.documents.get_mut(path) {
            Some(document) if !document.is_open() => document.replace_content(content),
            _ => Ok(false),
        }
    }

    /// Drops a closed document. Open documents are never released.
    pub fn release(&mut self, path: &NormalizedPath) -> Option<Document> {
        if self.is_open(path) {
            return None;
        }
        let released = self.documents.remove(path);
        if released.is_some() {
            tracing::debug!("released document {}", path);
        }
        released
    }

    pub fn get(&self, path: &NormalizedPath) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.documents.contains_key(path)
    }

    pub fn is_open(&self, path: &NormalizedPath) -> bool {
        self.documents.get(path).is_some_and(Document::is_open)
    }

    /// Paths of open documents, sorted.
    pub fn open_paths(&self) -> Vec<NormalizedPath> {
        let mut paths: Vec<_> = self
            .documents
            .values()
            .filter(|d| d.is_open())
            .map(|d| d.path().clone())
            .collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl SourceProvider for DocumentRegistry {
    fn source_text(&self, path: &NormalizedPath) -> Option<&str> {
        self.documents.get(path).map(Document::content)
    }
}
