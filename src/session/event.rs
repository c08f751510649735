// src/session/event.rs
//! Events delivered to the caller

use crate::enums::{CipherAlgorithm, ResultCode};
use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    DatabaseOpened,
    NewDatabaseCreated,
    DatabaseClosed,
    CredentialsChanged,
    KeyDerivationRoundsChanged(u64),
    CipherAlgorithmChanged(CipherAlgorithm),
    ErrorOccurred { code: ResultCode, message: String },
}

impl SessionEvent {
    pub fn error(code: ResultCode, message: impl Into<String>) -> Self {
        SessionEvent::ErrorOccurred {
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionEvent::ErrorOccurred { .. })
    }

    pub fn error_code(&self) -> Option<ResultCode> {
        match self {
            SessionEvent::ErrorOccurred { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<&SessionError> for SessionEvent {
    fn from(err: &SessionError) -> Self {
        let message = match err {
            SessionError::Engine(engine) => engine.message.clone(),
            other => other.to_string(),
        };
        SessionEvent::error(err.code(), message)
    }
}
