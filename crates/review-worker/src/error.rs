//! Worker error types

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use sgf_core::{ConversionError, ExtractError, FormatError};
use thiserror::Error;

/// The engine answered, but not with something we can use.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("engine reported an error for request {id}: {message}")]
    Engine { id: String, message: String },

    #[error("unparseable engine response {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response id {got:?} does not match request {expected:?}")]
    IdMismatch { expected: String, got: String },

    #[error("response for request {id} has no candidate moves")]
    NoCandidates { id: String },

    #[error("no analysis received for ply {ply}")]
    MissingResponse { ply: usize },
}

/// Starting or talking to the engine process failed.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start engine {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("engine {0} pipe was not captured")]
    MissingPipe(&'static str),

    #[error("failed to write to engine: {0}")]
    Write(#[source] io::Error),

    #[error("failed to read from engine: {0}")]
    Read(#[source] io::Error),

    #[error("engine closed its output")]
    Closed,

    #[error("engine adapter is no longer running")]
    AdapterGone,

    #[error("engine did not answer request {id} within {after:?}")]
    Timeout { id: String, after: Duration },
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Conversion error in {key}: {source}")]
    Conversion {
        key: String,
        #[source]
        source: ConversionError,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ExtractError> for ReviewError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Format(e) => ReviewError::Format(e),
            ExtractError::Conversion { key, source } => ReviewError::Conversion { key, source },
        }
    }
}
