use std::result;

use thiserror::Error;

use crate::diagnostics::Diagnostic;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Diagnostic(Diagnostic),
    #[error("{} diagnostics reported", .0.len())]
    Diagnostics(Vec<Diagnostic>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Generic error: {0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    /// Diagnostics carried by this error, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Error::Diagnostic(diagnostic) => vec![diagnostic.clone()],
            Error::Diagnostics(diagnostics) => diagnostics.clone(),
            Error::Io(err) => vec![Diagnostic::error(err.to_string())],
            Error::Generic(message) => vec![Diagnostic::error(message.clone())],
        }
    }
}

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

impl From<Diagnostic> for Error {
    fn from(diagnostic: Diagnostic) -> Self {
        Error::Diagnostic(diagnostic)
    }
}
