use serde::Serialize;
use thiserror::Error;

/// Error types for the projgraph core and service.
///
/// Every failure mode of the project graph is representable as a value of
/// this enum so that it can be returned to whichever caller triggered it.
/// Nothing originating inside graph building or capability gating is allowed
/// to escape as a panic.
///
/// # Examples
///
/// ```
/// use projgraph_core::error::{ErrorKind, ProjectError};
///
/// let error = ProjectError::VersionOrderingViolation {
///     path: "/src/a.ts".into(),
///     current: 3,
///     attempted: 2,
/// };
/// assert_eq!(error.kind(), ErrorKind::VersionOrderingViolation);
/// ```
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("command '{command}' is not supported by project {project} in syntactic mode")]
    UnsupportedInCapabilityMode { command: String, project: String },

    #[error("failed to load configuration {manifest}: {reason}")]
    ConfigurationLoadFailure { manifest: String, reason: String },

    #[error("cannot resolve '{specifier}' from {from}")]
    ResolutionFailure { from: String, specifier: String },

    #[error("version {attempted} of {path} is not newer than current version {current}")]
    VersionOrderingViolation {
        path: String,
        current: u32,
        attempted: u32,
    },

    #[error("unknown document: {0}")]
    UnknownDocument(String),

    #[error("document is not open: {0}")]
    DocumentNotOpen(String),

    #[error("unknown project: {0}")]
    UnknownProject(String),

    #[error("no project contains {0}")]
    NoProject(String),

    #[error("invalid edit for {path}: {reason}")]
    InvalidEdit { path: String, reason: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("language service error: {0}")]
    LanguageService(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("project service has stopped")]
    ServiceStopped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable tag carried by structured error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UnsupportedInCapabilityMode,
    ConfigurationLoadFailure,
    ResolutionFailure,
    VersionOrderingViolation,
    UnknownDocument,
    DocumentNotOpen,
    UnknownProject,
    NoProject,
    InvalidEdit,
    InvalidPath,
    LanguageService,
    InvalidRequest,
    ServiceStopped,
    Io,
    Json,
}

impl ProjectError {
    /// Returns the tag used when this error is surfaced in a response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedInCapabilityMode { .. } => ErrorKind::UnsupportedInCapabilityMode,
            Self::ConfigurationLoadFailure { .. } => ErrorKind::ConfigurationLoadFailure,
            Self::ResolutionFailure { .. } => ErrorKind::ResolutionFailure,
            Self::VersionOrderingViolation { .. } => ErrorKind::VersionOrderingViolation,
            Self::UnknownDocument(_) => ErrorKind::UnknownDocument,
            Self::DocumentNotOpen(_) => ErrorKind::DocumentNotOpen,
            Self::UnknownProject(_) => ErrorKind::UnknownProject,
            Self::NoProject(_) => ErrorKind::NoProject,
            Self::InvalidEdit { .. } => ErrorKind::InvalidEdit,
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::LanguageService(_) => ErrorKind::LanguageService,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::ServiceStopped => ErrorKind::ServiceStopped,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    /// True for errors that come from capability gating rather than from
    /// bad input or a broken collaborator.
    pub fn is_capability_rejection(&self) -> bool {
        matches!(self, Self::UnsupportedInCapabilityMode { .. })
    }
}

/// Convenience type alias for `Result<T, ProjectError>`.
///
/// This is the standard `Result` type used throughout the projgraph crates.
///
/// # Examples
///
/// ```
/// use projgraph_core::error::{ProjectError, Result};
///
/// fn find(path: &str) -> Result<()> {
///     Err(ProjectError::UnknownDocument(path.into()))
/// }
/// assert!(find("/a.ts").is_err());
/// ```
pub type Result<T> = std::result::Result<T, ProjectError>;
