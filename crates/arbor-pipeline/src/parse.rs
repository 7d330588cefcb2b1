//! The parallel parse front-end.
//!
//! Turns a listing of source inputs into the initial program snapshot by
//! running a caller-supplied pure parser over every input. Parses are
//! independent: with `concurrent_build` on they fan out over scoped worker
//! threads, each owning a disjoint slice of the pre-sized output, so the
//! result (slot `i` holds the parse of input `i`) is identical to a
//! sequential run in both ordering and diagnostics.
//!
//! Error policy is two-tiered: any read or parse failure fails the whole
//! step (no snapshot is constructed), while duplicate paths merely warn and
//! drop the later occurrence.

use arbor_core::{
    CompileOptions, Diagnostic, DiagnosticReport, ProgramSnapshot, SourceInput, SourceUnit,
};
use dashmap::DashMap;
use itertools::Itertools;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::debug;

pub const READ_FAILURE_CODE: &str = "ARB1001";
pub const DUPLICATE_PATH_CODE: &str = "ARB1002";
pub const PARSE_FAILURE_CODE: &str = "ARB1003";

/// Parse every input and assemble the initial snapshot.
///
/// `parse` must be pure and safe to call concurrently; it receives the
/// input's text, the compile options and the input's path.
pub fn parse_program<P>(
    name: &str,
    inputs: &[SourceInput],
    options: Arc<CompileOptions>,
    parse: P,
) -> DiagnosticReport<ProgramSnapshot>
where
    P: Fn(&str, &CompileOptions, &Path) -> arbor_core::Result<SourceUnit> + Sync,
{
    let total = inputs.len();
    let mut slots: Vec<Option<SourceUnit>> = (0..total).map(|_| None).collect();
    let diagnostics_by_input: DashMap<usize, Vec<Diagnostic>> = DashMap::new();

    let parse_one = |index: usize, input: &SourceInput, slot: &mut Option<SourceUnit>| {
        let context = input.path().display().to_string();
        let text = match input.read() {
            Ok(text) => text,
            Err(err) => {
                diagnostics_by_input.entry(index).or_default().push(
                    Diagnostic::error(format!(
                        "failed to read '{}': {}",
                        input.path().display(),
                        err
                    ))
                    .with_code(READ_FAILURE_CODE)
                    .with_source_context(context),
                );
                return;
            }
        };
        match parse(&text, &options, input.path()) {
            Ok(unit) => *slot = Some(unit),
            Err(err) => diagnostics_by_input.entry(index).or_default().push(
                Diagnostic::error(err.to_string())
                    .with_code(PARSE_FAILURE_CODE)
                    .with_source_context(context),
            ),
        }
    };

    let concurrent = options.concurrent_build && total > 1;
    debug!(files = total, concurrent, "parsing source inputs");

    if concurrent {
        let workers = thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1)
            .min(total);
        let chunk_size = total.div_ceil(workers);
        thread::scope(|scope| {
            for (chunk_index, (input_chunk, slot_chunk)) in inputs
                .chunks(chunk_size)
                .zip(slots.chunks_mut(chunk_size))
                .enumerate()
            {
                let parse_one = &parse_one;
                let base = chunk_index * chunk_size;
                scope.spawn(move || {
                    for (offset, (input, slot)) in
                        input_chunk.iter().zip(slot_chunk.iter_mut()).enumerate()
                    {
                        parse_one(base + offset, input, slot);
                    }
                });
            }
        });
    } else {
        for (index, (input, slot)) in inputs.iter().zip(slots.iter_mut()).enumerate() {
            parse_one(index, input, slot);
        }
    }

    // Per-input diagnostics drain in input order, so concurrent and
    // sequential builds report identically.
    let mut diagnostics = Vec::new();
    for index in 0..total {
        if let Some((_, input_diagnostics)) = diagnostics_by_input.remove(&index) {
            diagnostics.extend(input_diagnostics);
        }
    }

    // All-or-nothing: any read or parse failure means no compilation.
    if diagnostics.iter().any(Diagnostic::is_error) {
        return DiagnosticReport::failure(diagnostics);
    }

    // Duplicate paths degrade gracefully: keep the first, warn per extra.
    let mut first_by_path: HashMap<String, usize> = HashMap::new();
    let mut dropped: Vec<String> = Vec::new();
    for (index, input) in inputs.iter().enumerate() {
        match first_by_path.entry(input.normalized_path()) {
            Entry::Vacant(entry) => {
                entry.insert(index);
            }
            Entry::Occupied(_) => {
                slots[index] = None;
                dropped.push(input.path().display().to_string());
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "source file '{}' specified multiple times; the duplicate is ignored",
                        input.path().display()
                    ))
                    .with_code(DUPLICATE_PATH_CODE),
                );
            }
        }
    }
    if !dropped.is_empty() {
        debug!(dropped = %dropped.iter().join(", "), "dropped duplicate source files");
    }

    let units: Vec<SourceUnit> = slots.into_iter().flatten().collect();
    match ProgramSnapshot::new(name, units, options) {
        Ok(snapshot) => DiagnosticReport::success_with_diagnostics(snapshot, diagnostics),
        Err(err) => {
            diagnostics.push(Diagnostic::error(err.to_string()));
            DiagnosticReport::failure(diagnostics)
        }
    }
}
