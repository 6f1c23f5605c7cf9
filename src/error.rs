//! Error types for hintcrack
//!
//! This module defines the error hierarchy for:
//! - Coordinator state invariants (registry, worker pool, candidates)
//! - Input parsing and configuration
//! - Worker, reader and collector threads
//!
//! The registry and pool errors describe coordination bugs rather than
//! transient conditions. The coordinator logs them at error level and keeps
//! processing events; only a lost collaborator channel ends a run.

use crate::master::pool::WorkerId;
use crate::master::registry::RecordId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the hintcrack application
#[derive(Error, Debug)]
pub enum CrackError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input file errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Password registry invariant violations
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Worker pool invariant violations
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    /// Candidate alphabet generation errors
    #[error("Candidate error: {0}")]
    Combination(#[from] CombinationError),

    /// Coordinator event loop errors
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// Worker thread errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Report sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// Input file missing
    #[error("Input file '{path}' does not exist")]
    InputNotFound { path: PathBuf },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Field delimiter unusable
    #[error("Invalid delimiter {delimiter:?}: {reason}")]
    InvalidDelimiter { delimiter: char, reason: String },
}

/// Errors parsing a password line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A required column is absent
    #[error("Line {line}: missing field '{field}'")]
    MissingField { line: usize, field: &'static str },

    /// A numeric column did not parse
    #[error("Line {line}: field '{field}' is not a number: '{value}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Password registry invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A record with this ID already exists
    #[error("Record {id} already exists")]
    DuplicateId { id: RecordId },

    /// No record with this ID
    #[error("Record {id} is unknown")]
    UnknownRecord { id: RecordId },

    /// The record has no hint with this encrypted value
    #[error("Record {id} has no hint '{hint}'")]
    UnknownHint { id: RecordId, hint: String },
}

/// Worker pool invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Identity never registered (or already removed)
    #[error("{id} is not registered")]
    UnknownWorker { id: WorkerId },

    /// Identity registered twice
    #[error("{id} is already registered")]
    AlreadyRegistered { id: WorkerId },
}

/// Candidate alphabet generation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombinationError {
    /// The target must be strictly shorter than the alphabet
    #[error("Target length {target} must be shorter than the alphabet ({alphabet} characters)")]
    TargetTooLong { target: usize, alphabet: usize },

    /// The removal recursion would emit more candidates than can be queued
    #[error("Reducing {alphabet} characters to {target} yields more than {max} candidates")]
    TooManyCandidates {
        target: usize,
        alphabet: usize,
        max: usize,
    },
}

/// Coordinator event loop errors
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// The ingestion reader hung up
    #[error("Reader channel closed unexpectedly")]
    ReaderClosed,

    /// The report sink hung up
    #[error("Sink channel closed unexpectedly")]
    SinkClosed,

    /// Every event sender was dropped before shutdown
    #[error("Event channel closed before shutdown")]
    EventsClosed,
}

/// Worker, reader and collector thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread panicked
    #[error("Thread '{name}' panicked")]
    Panicked { name: String },

    /// Thread could not be spawned
    #[error("Failed to spawn thread '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    /// The coordinator's event channel is gone
    #[error("Event channel closed unexpectedly")]
    EventsClosed,
}

/// Report sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing the report failed
    #[error("Failed to write report: {0}")]
    Write(#[from] std::io::Error),

    /// Collector thread panicked
    #[error("Collector thread panicked")]
    Panicked,
}

/// Result type alias for CrackError
pub type Result<T> = std::result::Result<T, CrackError>;

/// Result type alias for RegistryError
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type alias for PoolError
pub type PoolResult<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err = RegistryError::UnknownRecord { id: 7 };
        let top: CrackError = err.into();
        assert!(matches!(top, CrackError::Registry(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = PoolError::AlreadyRegistered { id: WorkerId(3) };
        assert_eq!(err.to_string(), "worker-3 is already registered");

        let err = InputError::InvalidNumber {
            line: 4,
            field: "ID",
            value: "x".into(),
        };
        assert_eq!(err.to_string(), "Line 4: field 'ID' is not a number: 'x'");
    }
}
