//! The transformer plugin contract.
//!
//! A transformer is an opaque third-party rewrite pass. It sees the current
//! program snapshot through a fresh [`TransformContext`], reports the trees
//! it replaced or synthesized as [`TreeTransformation`] records, and may
//! contribute resources and diagnostic filters. It never mutates the
//! snapshot itself; the driver merges its effects after the call returns.

use arbor_core::{
    Diagnostic, DiagnosticFilter, DiagnosticManager, ProgramSnapshot, Resource, SourceUnit, UnitId,
};
use std::collections::HashMap;

/// One reported rewrite: `replaces = None` means the unit is freshly
/// synthesized with no ancestor in the original input.
#[derive(Debug, Clone)]
pub struct TreeTransformation {
    pub unit: SourceUnit,
    pub replaces: Option<UnitId>,
}

impl TreeTransformation {
    pub fn replacement(unit: SourceUnit, old: UnitId) -> Self {
        Self {
            unit,
            replaces: Some(old),
        }
    }

    pub fn addition(unit: SourceUnit) -> Self {
        Self {
            unit,
            replaces: None,
        }
    }
}

/// Everything a transformer declares as the outcome of one invocation.
#[derive(Debug, Default)]
pub struct TransformEffects {
    pub transformations: Vec<TreeTransformation>,
    pub resources: Vec<Resource>,
    pub filters: Vec<DiagnosticFilter>,
}

impl TransformEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(mut self, unit: SourceUnit, old: UnitId) -> Self {
        self.transformations
            .push(TreeTransformation::replacement(unit, old));
        self
    }

    pub fn add(mut self, unit: SourceUnit) -> Self {
        self.transformations.push(TreeTransformation::addition(unit));
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_filter(mut self, filter: DiagnosticFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty() && self.resources.is_empty() && self.filters.is_empty()
    }
}

/// Per-invocation view handed to a transformer. Built fresh before each
/// call and discarded afterwards; the resources slice covers all *prior*
/// transformers of this run, never the caller's own.
pub struct TransformContext<'run> {
    snapshot: &'run ProgramSnapshot,
    transformer_names: &'run [String],
    resources: &'run [Resource],
    config: &'run HashMap<String, String>,
    diagnostics: DiagnosticManager,
}

impl<'run> TransformContext<'run> {
    pub(crate) fn new(
        snapshot: &'run ProgramSnapshot,
        transformer_names: &'run [String],
        resources: &'run [Resource],
        config: &'run HashMap<String, String>,
        diagnostics: DiagnosticManager,
    ) -> Self {
        Self {
            snapshot,
            transformer_names,
            resources,
            config,
            diagnostics,
        }
    }

    /// The working snapshot as of this transformer's turn.
    pub fn snapshot(&self) -> &ProgramSnapshot {
        self.snapshot
    }

    /// Names of every transformer in the run, in declared order.
    pub fn transformer_names(&self) -> &[String] {
        self.transformer_names
    }

    /// Resources accumulated by prior transformers.
    pub fn resources(&self) -> &[Resource] {
        self.resources
    }

    /// Global key/value configuration for the run.
    pub fn config(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.add(diagnostic);
    }
}

/// An external rewrite pass. Implementations are third-party plugins; the
/// pipeline treats both an `Err` return and a panic as an isolated fault of
/// this transformer alone.
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, ctx: &mut TransformContext<'_>) -> eyre::Result<TransformEffects>;
}
