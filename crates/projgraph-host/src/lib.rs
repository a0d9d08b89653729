//! Host collaborators for projgraph.
//!
//! Concrete implementations of the file system and manifest traits from
//! `projgraph-core`: [`DiskFileSystem`] for real use, [`MemoryFileSystem`]
//! as a virtual host for tests and embedding, and [`JsonManifestProvider`]
//! for `tsconfig.json`-style manifests.

pub mod disk;
pub mod memory;
pub mod tsconfig;

pub use disk::DiskFileSystem;
pub use memory::MemoryFileSystem;
pub use tsconfig::{DEFAULT_MANIFEST_NAME, JsonManifestProvider};
