//! The central error channel of the solver.
//!
//! Hard errors carry a kind, the subsystem they were raised in and a message. The search loop
//! does not recover from these; they abandon the search and surface as a fatal result to the
//! host. Recoverable conditions (timeout, memory budget, unsat, tautologies and duplicates in the
//! input) are results or silent discards, not errors.
use thiserror::Error;

/// What went wrong.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NoError,
    IoError,
    MemoryError,
    InternalError,
    VerifyError,
}

/// The subsystem an error was raised in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorLocation {
    NoLocation,
    ExtendProp,
    RetractProp,
    Bcp,
    Mlf,
    Heuristic,
    Backjump,
    Learning,
    Consistency,
}

/// A fatal solver error.
#[derive(Debug, Error)]
#[error("{kind:?} at {location:?}: {message}")]
pub struct SolverError {
    pub kind: ErrorKind,
    pub location: ErrorLocation,
    pub message: String,
}

impl SolverError {
    pub fn new(kind: ErrorKind, location: ErrorLocation, message: impl Into<String>) -> SolverError {
        let message = message.into();
        log::error!("{:?} at {:?}: {}", kind, location, message);
        SolverError {
            kind,
            location,
            message,
        }
    }

    pub fn internal(location: ErrorLocation, message: impl Into<String>) -> SolverError {
        SolverError::new(ErrorKind::InternalError, location, message)
    }

    pub fn verify(message: impl Into<String>) -> SolverError {
        SolverError::new(ErrorKind::VerifyError, ErrorLocation::Consistency, message)
    }
}
