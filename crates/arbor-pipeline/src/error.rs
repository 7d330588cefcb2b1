use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source-only analysis hook failed; the run cannot continue
    /// because its output would have become the working snapshot.
    #[error("source-only analysis failed: {0}")]
    Analysis(eyre::Report),
    #[error(transparent)]
    Core(#[from] arbor_core::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
