//! Project graph service.
//!
//! Tracks which source files belong to which logical project, keeps each
//! project's file graph current as documents are opened, edited and closed,
//! and dispatches language requests to the right project while refusing
//! semantic work on projects that only have syntactic capability.
//!
//! # Examples
//!
//! ```
//! use projgraph_core::{CommandKind, NormalizedPath};
//! use projgraph_host::MemoryFileSystem;
//! use projgraph_server::{EchoLanguageService, ProjectService, ServiceConfig, Session};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let fs = Arc::new(MemoryFileSystem::new());
//! let service = ProjectService::new(ServiceConfig::syntax_only(), fs);
//! let mut session = Session::new(service, Arc::new(EchoLanguageService));
//!
//! let open = session.execute_command(
//!     CommandKind::Open,
//!     json!({ "file": "/src/a.ts", "fileContent": "let a = 1;" }),
//! );
//! assert!(open.success);
//!
//! let completions = session.execute_command(
//!     CommandKind::Completions,
//!     json!({ "file": "/src/a.ts", "line": 1, "offset": 5 }),
//! );
//! assert!(!completions.success);
//! ```

pub mod actor;
pub mod config;
pub mod document;
pub mod graph;
pub mod language;
pub mod log;
pub mod project;
pub mod service;
pub mod session;
pub mod typings;

pub use actor::ServiceHandle;
pub use config::{ResolutionConfig, ServiceConfig, TypeAcquisitionConfig};
pub use document::{Document, DocumentRegistry, OpenOutcome, TextChange};
pub use graph::{
    BuildOptions, BuildOutput, BuildStrategy, GraphContext, UnresolvedReference, build_graph,
};
pub use language::EchoLanguageService;
pub use log::{LogEntry, MemoryLog, Outcome, SessionLog, TracingLog};
pub use project::{Project, ProjectId, ProjectKind, ProjectSummary};
pub use service::{ProjectCounts, ProjectService};
pub use session::{Request, Response, ResponseError, Session};
