// crates/engine/src/error.rs
use filters::ParseError;
use std::fmt::Display;
use std::io;
use thiserror::Error;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Bad arguments, detected before anything is scanned.
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Filter(#[from] ParseError),
    /// One of the endpoints went away.
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Classifies an I/O error, keeping connection loss apart from
    /// ordinary failures.
    pub fn from_io(err: io::Error) -> Self {
        if transport::is_connection_error(&err) {
            EngineError::Connection(err.to_string())
        } else {
            EngineError::Io(err)
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, EngineError::Connection(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Prefixes `err` with the path it concerns.
pub fn io_context(path: &impl Display, err: io::Error) -> EngineError {
    EngineError::from_io(io::Error::new(err.kind(), format!("{path}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_split_out() {
        let err = EngineError::from_io(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(err.is_connection());
        let err = io_context(&"a/b", io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(!err.is_connection());
        assert_eq!(err.to_string(), "a/b: missing");
    }
}
