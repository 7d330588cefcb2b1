//! The fault boundary around each transformer invocation.
//!
//! A transformer that returns `Err` or panics must not take the run down
//! with it: the isolator captures the failure text, synthesizes one
//! diagnostic naming the transformer, persists the full text to a
//! per-fault crash file (best effort), and hands the driver empty effects
//! so the next transformer still runs. No partial effects from a faulted
//! call are ever applied.

use crate::transform::{TransformContext, TransformEffects, Transformer};
use arbor_core::Diagnostic;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

pub const CRASH_DIAGNOSTIC_CODE: &str = "ARB2001";

/// Record of one isolated transformer fault. Created only on failure;
/// never retried.
#[derive(Debug)]
pub struct CrashReport {
    pub transformer: String,
    pub error_text: String,
    pub diagnostic: Diagnostic,
    pub path: PathBuf,
}

/// Run one transformer inside the fault boundary.
pub(crate) fn invoke_isolated(
    transformer: &dyn Transformer,
    ctx: &mut TransformContext<'_>,
    crash_dir: &Path,
) -> Result<TransformEffects, CrashReport> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| transformer.execute(ctx)));
    let error_text = match outcome {
        Ok(Ok(effects)) => return Ok(effects),
        Ok(Err(report)) => format!("{report:?}"),
        Err(payload) => panic_text(payload),
    };

    let name = transformer.name().to_string();
    let path = crash_dir.join(format!("arbor-crash-{}.txt", Uuid::new_v4()));
    let diagnostic = Diagnostic::error(format!(
        "transformer '{}' failed and its output was discarded; details at {}",
        name,
        path.display()
    ))
    .with_code(CRASH_DIAGNOSTIC_CODE)
    .with_source_context(name.clone());

    // Best effort: losing the crash file must not escalate the fault.
    if let Err(err) = fs::write(&path, &error_text) {
        warn!(error = %err, path = %path.display(), "failed to persist crash report");
    }

    Err(CrashReport {
        transformer: name,
        error_text,
        diagnostic,
        path,
    })
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "transformer panicked with a non-string payload".to_string()
    }
}
