//! Capability levels, request classification and the language-service seam.

use crate::error::{ProjectError, Result};
use crate::path::NormalizedPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Whether a project supports semantic analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapabilityLevel {
    FullSemantic,
    SyntacticOnly,
}

impl CapabilityLevel {
    pub fn is_semantic(self) -> bool {
        self == Self::FullSemantic
    }
}

impl fmt::Display for CapabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullSemantic => f.write_str("full-semantic"),
            Self::SyntacticOnly => f.write_str("syntactic-only"),
        }
    }
}

/// Coarse classification used for capability gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Document/project lifecycle handled by the session itself.
    Lifecycle,
    /// Answerable from a single syntax tree.
    Syntactic,
    /// Needs binding and type information across files.
    Semantic,
}

/// Commands understood by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    Open,
    Close,
    Change,
    ProjectInfo,
    SyntacticDiagnosticsSync,
    #[serde(rename = "navtree")]
    NavTree,
    OutliningSpans,
    Format,
    BraceMatching,
    Completions,
    CompletionEntryDetails,
    DefinitionAndBoundSpan,
    References,
    Rename,
    #[serde(rename = "quickinfo")]
    QuickInfo,
    SemanticDiagnosticsSync,
    SuggestionDiagnosticsSync,
}

impl CommandKind {
    pub fn class(self) -> RequestClass {
        match self {
            Self::Open | Self::Close | Self::Change | Self::ProjectInfo => RequestClass::Lifecycle,
            Self::SyntacticDiagnosticsSync
            | Self::NavTree
            | Self::OutliningSpans
            | Self::Format
            | Self::BraceMatching => RequestClass::Syntactic,
            Self::Completions
            | Self::CompletionEntryDetails
            | Self::DefinitionAndBoundSpan
            | Self::References
            | Self::Rename
            | Self::QuickInfo
            | Self::SemanticDiagnosticsSync
            | Self::SuggestionDiagnosticsSync => RequestClass::Semantic,
        }
    }

    pub fn is_semantic(self) -> bool {
        self.class() == RequestClass::Semantic
    }

    /// Wire name of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Change => "change",
            Self::ProjectInfo => "projectInfo",
            Self::SyntacticDiagnosticsSync => "syntacticDiagnosticsSync",
            Self::NavTree => "navtree",
            Self::OutliningSpans => "outliningSpans",
            Self::Format => "format",
            Self::BraceMatching => "braceMatching",
            Self::Completions => "completions",
            Self::CompletionEntryDetails => "completionEntryDetails",
            Self::DefinitionAndBoundSpan => "definitionAndBoundSpan",
            Self::References => "references",
            Self::Rename => "rename",
            Self::QuickInfo => "quickinfo",
            Self::SemanticDiagnosticsSync => "semanticDiagnosticsSync",
            Self::SuggestionDiagnosticsSync => "suggestionDiagnosticsSync",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-based line/offset position inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub offset: u32,
}

/// A request forwarded to the language service.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRequest {
    pub command: CommandKind,
    pub file: NormalizedPath,
    pub location: Option<Location>,
}

/// Text lookup for files of a program.
pub trait SourceProvider {
    fn source_text(&self, path: &NormalizedPath) -> Option<&str>;
}

/// The view of a project handed to the language service.
pub struct ProgramView<'a> {
    pub project: &'a str,
    pub capability: CapabilityLevel,
    pub files: &'a [NormalizedPath],
    pub sources: &'a dyn SourceProvider,
}

impl ProgramView<'_> {
    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.files.contains(path)
    }

    pub fn source_text(&self, path: &NormalizedPath) -> Option<&str> {
        self.sources.source_text(path)
    }
}

/// Language-service collaborator.
///
/// Given a program (derived file set plus capability level) it answers
/// per-document requests. Its result payload is returned to the caller
/// unchanged.
pub trait LanguageService: Send + Sync {
    fn execute(
        &self,
        program: &ProgramView<'_>,
        request: &LanguageRequest,
    ) -> Result<serde_json::Value>;
}

/// Rejects semantic commands against a syntactic-only project.
///
/// # Examples
///
/// ```
/// use projgraph_core::{ensure_supported, CapabilityLevel, CommandKind};
///
/// assert!(ensure_supported(CommandKind::NavTree, CapabilityLevel::SyntacticOnly, "p").is_ok());
/// assert!(ensure_supported(CommandKind::Completions, CapabilityLevel::SyntacticOnly, "p").is_err());
/// assert!(ensure_supported(CommandKind::Completions, CapabilityLevel::FullSemantic, "p").is_ok());
/// ```
pub fn ensure_supported(
    command: CommandKind,
    capability: CapabilityLevel,
    project: &str,
) -> Result<()> {
    if command.is_semantic() && !capability.is_semantic() {
        return Err(ProjectError::UnsupportedInCapabilityMode {
            command: command.as_str().to_string(),
            project: project.to_string(),
        });
    }
    Ok(())
}

/// Language service handle bound to one project's capability level.
///
/// Every call is gated, so a semantic operation issued directly against a
/// syntactic-only project fails the same way it does through the session.
#[derive(Clone)]
pub struct GatedLanguageService {
    inner: Arc<dyn LanguageService>,
    capability: CapabilityLevel,
    project: String,
}

impl GatedLanguageService {
    pub fn new(inner: Arc<dyn LanguageService>, capability: CapabilityLevel, project: String) -> Self {
        Self {
            inner,
            capability,
            project,
        }
    }

    pub fn capability(&self) -> CapabilityLevel {
        self.capability
    }

    pub fn execute(
        &self,
        program: &ProgramView<'_>,
        request: &LanguageRequest,
    ) -> Result<serde_json::Value> {
        ensure_supported(request.command, self.capability, &self.project)?;
        self.inner.execute(program, request)
    }

    pub fn semantic_diagnostics(
        &self,
        program: &ProgramView<'_>,
        file: &NormalizedPath,
    ) -> Result<serde_json::Value> {
        self.execute(
            program,
            &LanguageRequest {
                command: CommandKind::SemanticDiagnosticsSync,
                file: file.clone(),
                location: None,
            },
        )
    }

    pub fn syntactic_diagnostics(
        &self,
        program: &ProgramView<'_>,
        file: &NormalizedPath,
    ) -> Result<serde_json::Value> {
        self.execute(
            program,
            &LanguageRequest {
                command: CommandKind::SyntacticDiagnosticsSync,
                file: file.clone(),
                location: None,
            },
        )
    }
}

impl fmt::Debug for GatedLanguageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedLanguageService")
            .field("capability", &self.capability)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}
