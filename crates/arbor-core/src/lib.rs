//! Arbor core: the program model for the compilation-assembly front end.
//!
//! This crate owns the immutable building blocks: source inputs and units,
//! identity, the persistent program snapshot, compile options, diagnostics,
//! resources and diagnostic filters. The parse front-end and transformer
//! pipeline live in `arbor-pipeline`.

pub mod diagnostics;
pub mod error;
pub mod options;
pub mod resource;
pub mod snapshot;
pub mod source;
pub mod span;

// Re-export commonly used items for convenience
pub use tracing;

pub use diagnostics::{
    Diagnostic, DiagnosticFilter, DiagnosticLevel, DiagnosticManager, DiagnosticReport,
    FilterAction,
};
pub use error::{Error, Result};
pub use options::{CompileOptions, TreeConfig};
pub use resource::Resource;
pub use snapshot::ProgramSnapshot;
pub use source::{SourceInput, SourceKind, SourceUnit, TrackingMark, UnitId};
pub use span::Span;
