//! Diagnostics collected while assembling a compilation.
//!
//! Every stage reports through [`Diagnostic`] values gathered by a
//! [`DiagnosticManager`]. The manager is cheaply clonable and safe to share
//! across the parse worker threads; during the sequential transformer loop it
//! doubles as the per-invocation sink handed to plugin code.

use crate::span::Span;
use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: Option<Span>,
    pub code: Option<String>,
    pub source_context: Option<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: None,
            code: None,
            source_context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// Wrap into a `miette::Report` for fancy terminal rendering.
    pub fn into_report(self) -> miette::Report {
        let severity = match self.level {
            DiagnosticLevel::Error => miette::Severity::Error,
            DiagnosticLevel::Warning => miette::Severity::Warning,
            DiagnosticLevel::Info => miette::Severity::Advice,
        };
        let help = if self.suggestions.is_empty() {
            None
        } else {
            Some(self.suggestions.join("; "))
        };
        miette::Report::new(Rendered {
            message: self.message,
            code: self.code,
            help,
            severity,
        })
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.source_context {
            write!(f, "[{}] ", context)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct Rendered {
    message: String,
    code: Option<String>,
    help: Option<String>,
    severity: miette::Severity,
}

impl miette::Diagnostic for Rendered {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.code
            .as_ref()
            .map(|c| Box::new(c) as Box<dyn Display + 'a>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn Display + 'a>)
    }
}

/// Thread-safe, shareable diagnostic sink.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticManager {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            tracing::debug!(message = %diagnostic, "error diagnostic reported");
        }
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }

    pub fn extend(&self, new_diagnostics: Vec<Diagnostic>) {
        if new_diagnostics.is_empty() {
            return;
        }
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.extend(new_diagnostics);
        }
    }

    /// Marker for `diagnostics_since`.
    pub fn snapshot(&self) -> usize {
        self.diagnostics.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn diagnostics_since(&self, snapshot: usize) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.iter().skip(snapshot).cloned().collect())
            .unwrap_or_default()
    }

    pub fn take_all(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|mut d| std::mem::take(&mut *d))
            .unwrap_or_default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .map(|d| d.iter().any(Diagnostic::is_error))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().map(|d| d.is_empty()).unwrap_or(true)
    }
}

/// Outcome of a stage that either yields a value or explains why it could
/// not, and may carry non-fatal diagnostics either way.
#[derive(Debug, Clone)]
pub struct DiagnosticReport<T> {
    pub value: Option<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> DiagnosticReport<T> {
    pub fn success(value: T) -> Self {
        Self {
            value: Some(value),
            diagnostics: Vec::new(),
        }
    }

    pub fn success_with_diagnostics(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            value: Some(value),
            diagnostics,
        }
    }

    pub fn failure(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            value: None,
            diagnostics,
        }
    }

    pub fn into_result(self) -> Result<(T, Vec<Diagnostic>), Vec<Diagnostic>> {
        match self.value {
            Some(value) => Ok((value, self.diagnostics)),
            None => Err(self.diagnostics),
        }
    }
}

/// How a matching diagnostic should be treated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Suppress,
    Demote,
}

/// A transformer-contributed rule altering how diagnostics are later
/// treated. Filters accumulate in declaration order for the whole run and
/// are never removed; their order is their precedence.
#[derive(Debug, Clone)]
pub struct DiagnosticFilter {
    pub owner: String,
    pub codes: Vec<String>,
    pub action: FilterAction,
}

impl DiagnosticFilter {
    pub fn suppress(owner: impl Into<String>, codes: Vec<String>) -> Self {
        Self {
            owner: owner.into(),
            codes,
            action: FilterAction::Suppress,
        }
    }

    pub fn demote(owner: impl Into<String>, codes: Vec<String>) -> Self {
        Self {
            owner: owner.into(),
            codes,
            action: FilterAction::Demote,
        }
    }

    pub fn applies_to(&self, diagnostic: &Diagnostic) -> bool {
        diagnostic
            .code
            .as_deref()
            .is_some_and(|code| self.codes.iter().any(|c| c == code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn manager_snapshot_drains_only_new_entries() {
        let manager = DiagnosticManager::new();
        manager.add(Diagnostic::warning("old"));
        let mark = manager.snapshot();
        manager.add(Diagnostic::error("new"));

        let since = manager.diagnostics_since(mark);
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].message, "new");
        assert!(manager.has_errors());
    }

    #[test]
    fn filter_matches_by_code() {
        let filter = DiagnosticFilter::suppress("nullable-rewriter", vec!["ARB0042".to_string()]);
        let hit = Diagnostic::warning("possible null").with_code("ARB0042");
        let miss = Diagnostic::warning("unused").with_code("ARB0007");
        let uncoded = Diagnostic::warning("bare");

        assert!(filter.applies_to(&hit));
        assert!(!filter.applies_to(&miss));
        assert!(!filter.applies_to(&uncoded));
    }

    #[test]
    fn report_into_result_splits_success_and_failure() {
        let ok: DiagnosticReport<u32> =
            DiagnosticReport::success_with_diagnostics(7, vec![Diagnostic::warning("w")]);
        let (value, diags) = ok.into_result().unwrap();
        assert_eq!(value, 7);
        assert_eq!(diags.len(), 1);

        let failed: DiagnosticReport<u32> =
            DiagnosticReport::failure(vec![Diagnostic::error("boom")]);
        assert!(failed.into_result().is_err());
    }

    #[test]
    fn rendered_report_carries_code_and_severity() {
        let report = Diagnostic::error("bad tree")
            .with_code("ARB0001")
            .with_suggestion("re-run with verbose output")
            .into_report();
        let text = format!("{report:?}");
        assert!(text.contains("bad tree"));
        assert!(text.contains("ARB0001"));
    }
}
