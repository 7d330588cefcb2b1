//! The transformer pipeline driver.
//!
//! One run walks the states annotate → source-only analysis → run each
//! transformer → assemble. Transformers execute strictly in declared order;
//! transformer `i + 1` never starts before `i`'s effects are fully merged,
//! because its context must observe the cumulative snapshot and resources
//! of all predecessors. The provenance map and the effect accumulators are
//! owned by this single sequential loop, so no locking is involved anywhere
//! past the parse stage.

use crate::error::{PipelineError, Result};
use crate::isolate::{invoke_isolated, CrashReport};
use crate::provenance::ProvenanceMap;
use crate::transform::{TransformContext, Transformer, TreeTransformation};
use arbor_core::{
    Diagnostic, DiagnosticFilter, DiagnosticManager, ProgramSnapshot, Resource, SourceUnit,
    TrackingMark, TreeConfig, UnitId,
};
use itertools::Itertools;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

static DEFAULT_CRASH_DIR: Lazy<PathBuf> = Lazy::new(|| env::temp_dir().join("arbor-crashes"));

#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    /// Keep transformed code debuggable: skip the whole-tree tracking
    /// annotation of originals.
    pub transformed_code: bool,
    pub verbose: bool,
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub debug: DebugOptions,
    /// Directory receiving per-fault crash files.
    pub crash_dir: PathBuf,
    /// Global key/value configuration exposed to every transformer.
    pub config: HashMap<String, String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            debug: DebugOptions::default(),
            crash_dir: DEFAULT_CRASH_DIR.clone(),
            config: HashMap::new(),
        }
    }
}

/// Optional pre-transformer hook (analyzers / source generators): runs at
/// most once and its output becomes the working snapshot. The pipeline does
/// no provenance bookkeeping for it beyond adopting the swap.
pub type SourceAnalysis =
    dyn Fn(ProgramSnapshot, &PipelineOptions) -> eyre::Result<ProgramSnapshot> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Done,
    /// At least one transformer faulted and was skipped.
    PartialFailure,
}

/// Everything downstream stages need from one run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub snapshot: ProgramSnapshot,
    /// Final (new, old-or-none) records: changed originals in listing
    /// order, then surviving synthesized trees in insertion order.
    pub transformations: Vec<TreeTransformation>,
    pub filters: Vec<DiagnosticFilter>,
    pub resources: Vec<Resource>,
    pub diagnostics: Vec<Diagnostic>,
    pub crash_reports: Vec<CrashReport>,
    /// Per-tree analyzer configuration remapped onto current trees. Empty
    /// on the zero-transformer fast path, where the input snapshot's own
    /// association is still authoritative.
    pub tree_configs: HashMap<UnitId, Arc<TreeConfig>>,
    pub status: PipelineStatus,
}

pub struct TransformPipeline {
    transformers: Vec<Arc<dyn Transformer>>,
    source_analysis: Option<Box<SourceAnalysis>>,
    options: PipelineOptions,
}

impl TransformPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            transformers: Vec::new(),
            source_analysis: None,
            options,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn with_transformers(
        mut self,
        transformers: impl IntoIterator<Item = Arc<dyn Transformer>>,
    ) -> Self {
        self.transformers.extend(transformers);
        self
    }

    pub fn with_source_analysis(mut self, analysis: Box<SourceAnalysis>) -> Self {
        self.source_analysis = Some(analysis);
        self
    }

    /// Run the pipeline over `snapshot`.
    ///
    /// Transformer faults never fail the run; they surface as diagnostics
    /// plus crash reports on the outcome. Only a failing source-analysis
    /// hook or an internal snapshot contract breach returns `Err`.
    pub fn run(&self, snapshot: ProgramSnapshot) -> Result<PipelineOutcome> {
        // Guaranteed O(1) identity for the common no-transformer build.
        if self.transformers.is_empty() && self.source_analysis.is_none() {
            return Ok(PipelineOutcome {
                snapshot,
                transformations: Vec::new(),
                filters: Vec::new(),
                resources: Vec::new(),
                diagnostics: Vec::new(),
                crash_reports: Vec::new(),
                tree_configs: HashMap::new(),
                status: PipelineStatus::Done,
            });
        }

        let span = info_span!("transform_pipeline", transformers = self.transformers.len());
        let _guard = span.enter();

        let input_snapshot = snapshot.clone();
        let originals: Vec<SourceUnit> = snapshot.units().cloned().collect();
        let mut working = snapshot;

        let mut provenance = ProvenanceMap::new();
        // Assembling compares each original's current tree against this
        // baseline; the annotation rewrite alone does not count as a change.
        let mut baseline: HashMap<UnitId, UnitId> = HashMap::new();
        let mut original_order: Vec<UnitId> = Vec::new();

        if self.options.debug.transformed_code {
            for original in &originals {
                provenance.seed(original.id(), original.id());
                baseline.insert(original.id(), original.id());
                original_order.push(original.id());
            }
        } else {
            let mark = TrackingMark::fresh();
            for original in &originals {
                let annotated = original.with_tracking_mark(mark);
                provenance.seed(original.id(), annotated.id());
                baseline.insert(original.id(), annotated.id());
                original_order.push(original.id());
                working = working.replace_unit(original.id(), annotated)?;
            }
            debug!(annotated = originals.len(), "annotated original units");
        }

        if let Some(analysis) = &self.source_analysis {
            working = analysis(working, &self.options).map_err(PipelineError::Analysis)?;
            // Trees the analysis introduced have no pre-run ancestor; they
            // join the run as originals of themselves.
            for unit in working.units() {
                if !provenance.is_tracked(unit.id()) {
                    provenance.seed(unit.id(), unit.id());
                    baseline.insert(unit.id(), unit.id());
                    original_order.push(unit.id());
                }
            }
        }

        let names: Vec<String> = self
            .transformers
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        debug!(order = %names.iter().join(" -> "), "running transformers");

        if let Err(err) = fs::create_dir_all(&self.options.crash_dir) {
            warn!(error = %err, dir = %self.options.crash_dir.display(), "failed to create crash directory");
        }

        let mut resources: Vec<Resource> = Vec::new();
        let mut filters: Vec<DiagnosticFilter> = Vec::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut crash_reports: Vec<CrashReport> = Vec::new();

        for transformer in &self.transformers {
            debug!(transformer = transformer.name(), "invoking transformer");
            let sink = DiagnosticManager::new();
            let invocation = {
                let mut ctx = TransformContext::new(
                    &working,
                    &names,
                    &resources,
                    &self.options.config,
                    sink.clone(),
                );
                invoke_isolated(transformer.as_ref(), &mut ctx, &self.options.crash_dir)
            };
            match invocation {
                Ok(effects) => {
                    for record in effects.transformations {
                        let TreeTransformation { unit, replaces } = record;
                        match replaces {
                            Some(old) => {
                                // Panics when `old` was never a tree of
                                // this run: contract breach by the plugin.
                                provenance.record_replacement(old, unit.id());
                                working = working.replace_unit(old, unit)?;
                            }
                            None => {
                                provenance.record_addition(unit.id());
                                working = working.add_unit(unit)?;
                            }
                        }
                    }
                    // Order is precedence for filters; resources become
                    // visible to the *next* transformer only.
                    filters.extend(effects.filters);
                    resources.extend(effects.resources);
                }
                Err(report) => {
                    diagnostics.push(report.diagnostic.clone());
                    crash_reports.push(report);
                }
            }
            diagnostics.extend(sink.take_all());
        }

        // Assembling.
        let mut transformations: Vec<TreeTransformation> = Vec::new();
        for original in &original_order {
            let Some(current) = provenance.current_of(*original) else {
                continue;
            };
            if baseline.get(original) == Some(&current) {
                continue;
            }
            match working.unit(current) {
                Some(unit) => transformations
                    .push(TreeTransformation::replacement(unit.clone(), *original)),
                // The analysis hook dropped this lineage from the snapshot.
                None => debug!(original = %original, "original lineage absent from final snapshot"),
            }
        }
        for added in provenance.added() {
            if let Some(unit) = working.unit(*added) {
                transformations.push(TreeTransformation::addition(unit.clone()));
            }
        }

        let mut tree_configs: HashMap<UnitId, Arc<TreeConfig>> = HashMap::new();
        for unit in working.units() {
            let id = unit.id();
            let config = match provenance.ancestor_of(id) {
                Some(ancestor) => input_snapshot
                    .tree_config(ancestor)
                    .or_else(|| working.tree_config(id)),
                None => working.tree_config(id),
            };
            if let Some(config) = config {
                tree_configs.insert(id, config);
            }
        }

        let status = if crash_reports.is_empty() {
            PipelineStatus::Done
        } else {
            PipelineStatus::PartialFailure
        };

        Ok(PipelineOutcome {
            snapshot: working,
            transformations,
            filters,
            resources,
            diagnostics,
            crash_reports,
            tree_configs,
            status,
        })
    }
}
