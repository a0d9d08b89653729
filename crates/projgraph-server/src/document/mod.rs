//! Document tracking.
//!
//! - `state`: the per-path [`Document`] record and [`TextChange`] edits
//! - `registry`: [`DocumentRegistry`], the process-wide path → document map

pub mod registry;
pub mod state;

pub use registry::{DocumentRegistry, OpenOutcome};
pub use state::{Document, TextChange};
