//! Source inputs and source units.
//!
//! A [`SourceInput`] is one file the caller wants compiled; a [`SourceUnit`]
//! is its parsed form. Units carry a [`UnitId`] minted from a global counter:
//! identity, never content, is what every downstream map is keyed on. Two
//! units parsed from identical text are still distinct units.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TRACKING_MARK: AtomicU64 = AtomicU64::new(1);

/// Identity of one source unit. Never reused within a process.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[display("unit#{_0}")]
pub struct UnitId(u64);

impl UnitId {
    /// Mint a fresh identity from the global counter.
    pub fn fresh() -> UnitId {
        UnitId(NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Whether a file is an ordinary source file or a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    Regular,
    Script,
}

/// Whole-tree marker stamped onto every original unit at the start of a
/// pipeline run, so downstream stages can tell "lightly modified original"
/// from "wholly synthesized". Provenance never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackingMark(u64);

impl TrackingMark {
    /// One mark per pipeline run.
    pub fn fresh() -> TrackingMark {
        TrackingMark(NEXT_TRACKING_MARK.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where an input's text comes from.
#[derive(Debug, Clone)]
enum SourceText {
    Memory(Arc<str>),
    Disk,
}

/// One file the caller listed for compilation. Immutable; read exactly once
/// by the parse front-end.
#[derive(Debug, Clone)]
pub struct SourceInput {
    path: PathBuf,
    kind: SourceKind,
    text: SourceText,
}

impl SourceInput {
    /// An input whose text is read from `path` at parse time.
    pub fn from_file(path: impl Into<PathBuf>, kind: SourceKind) -> SourceInput {
        SourceInput {
            path: path.into(),
            kind,
            text: SourceText::Disk,
        }
    }

    /// An input with in-memory text, keyed by a display path.
    pub fn from_text(
        path: impl Into<PathBuf>,
        kind: SourceKind,
        text: impl Into<Arc<str>>,
    ) -> SourceInput {
        SourceInput {
            path: path.into(),
            kind,
            text: SourceText::Memory(text.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn read(&self) -> io::Result<Arc<str>> {
        match &self.text {
            SourceText::Memory(text) => Ok(text.clone()),
            SourceText::Disk => fs::read_to_string(&self.path).map(Arc::from),
        }
    }

    /// Case-insensitive path form used for duplicate detection.
    pub fn normalized_path(&self) -> String {
        self.path.to_string_lossy().to_lowercase()
    }
}

/// The parsed form of one source input.
///
/// Immutable once created. Deriving a unit (`with_text`,
/// `with_tracking_mark`) always mints a fresh identity: a rewritten tree is
/// a new unit even when the edit is small.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    id: UnitId,
    path: PathBuf,
    kind: SourceKind,
    text: Arc<str>,
    mark: Option<TrackingMark>,
}

impl SourceUnit {
    pub fn new(
        path: impl Into<PathBuf>,
        kind: SourceKind,
        text: impl Into<Arc<str>>,
    ) -> SourceUnit {
        SourceUnit {
            id: UnitId::fresh(),
            path: path.into(),
            kind,
            text: text.into(),
            mark: None,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn text(&self) -> &Arc<str> {
        &self.text
    }

    pub fn tracking_mark(&self) -> Option<TrackingMark> {
        self.mark
    }

    /// Derive a unit with rewritten text. Keeps path, kind and mark.
    pub fn with_text(&self, text: impl Into<Arc<str>>) -> SourceUnit {
        SourceUnit {
            id: UnitId::fresh(),
            path: self.path.clone(),
            kind: self.kind,
            text: text.into(),
            mark: self.mark,
        }
    }

    /// Derive a unit carrying a whole-tree tracking mark.
    pub fn with_tracking_mark(&self, mark: TrackingMark) -> SourceUnit {
        SourceUnit {
            id: UnitId::fresh(),
            path: self.path.clone(),
            kind: self.kind,
            text: self.text.clone(),
            mark: Some(mark),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_text_gets_distinct_identities() {
        let a = SourceUnit::new("a.arb", SourceKind::Regular, "fn main() {}");
        let b = SourceUnit::new("a.arb", SourceKind::Regular, "fn main() {}");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn derived_units_are_new_identities() {
        let unit = SourceUnit::new("a.arb", SourceKind::Regular, "x");
        let rewritten = unit.with_text("y");
        assert_ne!(unit.id(), rewritten.id());
        assert_eq!(rewritten.path(), unit.path());

        let marked = unit.with_tracking_mark(TrackingMark::fresh());
        assert_ne!(unit.id(), marked.id());
        assert_eq!(marked.text(), unit.text());
        assert!(marked.tracking_mark().is_some());
        assert!(unit.tracking_mark().is_none());
    }

    #[test]
    fn memory_input_reads_back_its_text() {
        let input = SourceInput::from_text("mem.arb", SourceKind::Script, "(print 1)");
        assert_eq!(input.read().unwrap().as_ref(), "(print 1)");
    }

    #[test]
    fn disk_input_surfaces_read_errors() {
        let input = SourceInput::from_file("/nonexistent/arbor/input.arb", SourceKind::Regular);
        assert!(input.read().is_err());
    }

    #[test]
    fn normalized_path_folds_case() {
        let upper = SourceInput::from_text("A.ARB", SourceKind::Regular, "");
        let lower = SourceInput::from_text("a.arb", SourceKind::Regular, "");
        assert_eq!(upper.normalized_path(), lower.normalized_path());
    }
}
