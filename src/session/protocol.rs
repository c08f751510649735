// src/session/protocol.rs
//! Messages exchanged between the caller context and the engine worker
//!
//! # Message Flow
//!
//! 1. The façade validates a request and hands it to the dispatcher
//! 2. The dispatcher tags it with a fresh [`RequestId`] and moves it into the
//!    request channel as an [`Envelope`]
//! 3. The worker executes it against the engine and answers with exactly one
//!    [`EngineNotification::Completed`] carrying the same id
//! 4. The relay correlates the id with the pending operation and updates the
//!    session
//!
//! Notifications without an id (`KeyDerivationRoundsChanged`,
//! `CipherAlgorithmChanged`, `DatabaseClosed`) originate from the engine on
//! its own.

use std::fmt;
use std::path::PathBuf;

use crate::credentials::Credentials;
use crate::enums::{CipherAlgorithm, DatabaseType};
use crate::error::EngineError;
use crate::session::state::Operation;
use crate::settings::ViewSetting;

/// Correlates a completion with the request that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An operation request, carrying only what its variant needs
#[derive(Debug)]
pub enum EngineRequest {
    Open {
        path: PathBuf,
        credentials: Credentials,
        read_only: bool,
        database_type: DatabaseType,
    },
    Create {
        path: PathBuf,
        credentials: Credentials,
        database_type: DatabaseType,
        cipher_algorithm: CipherAlgorithm,
        key_derivation_rounds: u64,
    },
    Close,
    ChangeCredentials {
        credentials: Credentials,
    },
    SetKeyDerivationRounds(u64),
    SetCipherAlgorithm(CipherAlgorithm),
    /// Fire-and-forget; never answered
    ApplySetting(ViewSetting),
}

impl EngineRequest {
    /// `None` for fire-and-forget requests
    pub fn operation(&self) -> Option<Operation> {
        match self {
            EngineRequest::Open { .. } => Some(Operation::Open),
            EngineRequest::Create { .. } => Some(Operation::Create),
            EngineRequest::Close => Some(Operation::Close),
            EngineRequest::ChangeCredentials { .. } => Some(Operation::ChangeCredentials),
            EngineRequest::SetKeyDerivationRounds(_) => Some(Operation::SetKeyDerivationRounds),
            EngineRequest::SetCipherAlgorithm(_) => Some(Operation::SetCipherAlgorithm),
            EngineRequest::ApplySetting(_) => None,
        }
    }
}

/// What crosses the request channel
#[derive(Debug)]
pub struct Envelope {
    /// `None` when no completion is expected
    pub id: Option<RequestId>,
    pub request: EngineRequest,
}

/// Properties an engine reports for an open database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseProperties {
    pub database_type: DatabaseType,
    pub key_derivation_rounds: u64,
    pub cipher_algorithm: CipherAlgorithm,
}

/// Successful result of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Opened(DatabaseProperties),
    Created(DatabaseProperties),
    Closed,
    CredentialsChanged,
    KeyDerivationRoundsChanged(u64),
    CipherAlgorithmChanged(CipherAlgorithm),
}

/// What crosses the notification channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineNotification {
    Completed {
        id: RequestId,
        outcome: Result<Completion, EngineError>,
    },
    KeyDerivationRoundsChanged(u64),
    CipherAlgorithmChanged(CipherAlgorithm),
    /// The engine dropped the open database on its own
    DatabaseClosed {
        reason: String,
    },
}
