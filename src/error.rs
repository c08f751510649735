// src/error.rs
//! Public error types for the entire crate

use std::path::PathBuf;

use thiserror::Error;

use crate::enums::ResultCode;
use crate::session::{Operation, SessionState};

/// Errors reported by the session façade
///
/// Precondition and state errors are produced synchronously, before anything
/// reaches the storage engine. `Engine` wraps failures the engine reported
/// after a round trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a database is already open (session is {state})")]
    AlreadyOpen { state: SessionState },

    #[error("database is already closed")]
    AlreadyClosed,

    #[error("no database is open (session is {state})")]
    NotOpened { state: SessionState },

    #[error("cannot {operation} while the session is {state}")]
    Busy {
        operation: Operation,
        state: SessionState,
    },

    #[error("database file not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("key file not found: {}", .0.display())]
    KeyFilePathNotFound(PathBuf),

    #[error("could not create directory {}: {message}", .path.display())]
    PathCreationFailed { path: PathBuf, message: String },

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("storage engine worker has terminated")]
    EngineTerminated,
}

impl SessionError {
    pub fn code(&self) -> ResultCode {
        match self {
            Self::AlreadyOpen { .. } => ResultCode::AlreadyOpen,
            Self::AlreadyClosed => ResultCode::AlreadyClosed,
            Self::NotOpened { .. } => ResultCode::NotOpened,
            Self::Busy { .. } => ResultCode::Busy,
            Self::PathNotFound(_) => ResultCode::PathNotFound,
            Self::KeyFilePathNotFound(_) => ResultCode::KeyFilePathNotFound,
            Self::PathCreationFailed { .. } => ResultCode::PathCreationFailed,
            Self::Engine(err) => err.code,
            Self::EngineTerminated => ResultCode::EngineTerminated,
        }
    }

    /// `AlreadyClosed` lets callers close defensively without treating it as a failure
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyClosed)
    }
}

/// Failure reported by a storage engine for a single request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct EngineError {
    pub code: ResultCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error carrying the code's default description as its message
    pub fn from_code(code: ResultCode) -> Self {
        Self::new(code, code.description())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings persistence failures
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not persist settings: {0}")]
    Persist(#[from] tempfile::PersistError),
}
