use crate::source::UnitId;
use std::path::PathBuf;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{id} is not part of the snapshot")]
    UnknownUnit { id: UnitId },
    #[error("{id} is already part of the snapshot")]
    DuplicateUnit { id: UnitId },
    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, Error>;

// Opaque third-party failures (plugin code) arrive as eyre reports.
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
