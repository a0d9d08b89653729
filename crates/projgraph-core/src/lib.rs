//! Core abstractions for projgraph.
//!
//! This crate provides the building blocks shared by the host collaborators
//! and the project service: canonical paths, the error taxonomy, the
//! collaborator traits the service consumes, and the pure pieces of the
//! graph build (reference scanning and module resolution).
//!
//! # Architecture
//!
//! projgraph-core defines:
//! - **Collaborator traits**: `FileSystem`, `ManifestProvider`,
//!   `ReferenceScanner`, `LanguageService`
//! - **Manifest model**: `Manifest` with `globset`-backed include/exclude rules
//! - **Resolution**: `ModuleResolver` over any `ResolutionHost`
//! - **Capability gating**: `CapabilityLevel`, `CommandKind`, `ensure_supported`
//! - **Error Types**: `ProjectError` shared by every crate
//!
//! # Examples
//!
//! Resolving the first import of a document against an in-memory host:
//!
//! ```
//! use projgraph_core::{
//!     ModuleResolver, NormalizedPath, PatternScanner, ReferenceScanner, ResolutionHost,
//! };
//! use std::collections::HashMap;
//!
//! struct Files(HashMap<&'static str, &'static str>);
//!
//! impl ResolutionHost for Files {
//!     fn file_exists(&self, path: &NormalizedPath) -> bool {
//!         self.0.contains_key(path.as_str())
//!     }
//!     fn read_file(&self, path: &NormalizedPath) -> Option<String> {
//!         self.0.get(path.as_str()).map(|s| (*s).to_string())
//!     }
//! }
//!
//! let host = Files(HashMap::from([
//!     ("/p/a.ts", "import { y } from './b';"),
//!     ("/p/b.ts", "export const y = 1;"),
//! ]));
//! let a = NormalizedPath::new("/p/a.ts").unwrap();
//! let refs = PatternScanner.scan(&host.read_file(&a).unwrap());
//!
//! let extensions = ModuleResolver::<Files>::default_extensions();
//! let resolver = ModuleResolver::new(&host, &extensions);
//! let target = resolver.resolve(&refs.modules[0], &a).unwrap();
//! assert_eq!(target.as_str(), "/p/b.ts");
//! ```

pub mod error;
pub mod host;
pub mod language;
pub mod manifest;
pub mod path;
pub mod references;
pub mod resolve;

// Re-export commonly used types
pub use error::{ErrorKind, ProjectError, Result};
pub use host::{DirEntry, FileChangeKind, FileEvent, FileSystem};
pub use language::{
    CapabilityLevel, CommandKind, GatedLanguageService, LanguageRequest, LanguageService,
    Location, ProgramView, RequestClass, SourceProvider, ensure_supported,
};
pub use manifest::{CompilerOptions, Manifest, ManifestLookup, ManifestProvider, has_extension};
pub use path::NormalizedPath;
pub use references::{
    PatternScanner, ReferenceKind, ReferenceScanner, SourceReference, SourceReferences,
};
pub use resolve::{DEFAULT_EXTENSIONS, ModuleResolver, ResolutionHost};
