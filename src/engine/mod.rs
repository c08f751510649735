// src/engine/mod.rs
//! Storage engine boundary
//!
//! A [`StorageEngine`] performs the actual database I/O and cryptography. It
//! is moved onto a dedicated worker thread when the session starts and only
//! ever runs one request at a time. Anything it wants to report on its own
//! goes through the [`Notifier`] handed to it by [`StorageEngine::attach`].
//!
//! [`FileEngine`] is the bundled engine, storing each database as a single
//! encrypted container file.

mod crypto;
mod file;
mod format;
mod model;
pub(crate) mod worker;

pub use file::FileEngine;
pub use format::{ContainerHeader, FormatError};
pub use model::{DatabaseContent, Entry, Group};

use std::path::Path;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::credentials::Credentials;
use crate::enums::{CipherAlgorithm, DatabaseType};
use crate::error::{EngineError, EngineResult};
use crate::session::{DatabaseProperties, EngineNotification, RequestId};
use crate::settings::ViewSetting;

/// Operations the session forwards to the worker
///
/// Every method runs on the worker thread. Errors carry the result code the
/// caller will see in `ErrorOccurred`.
pub trait StorageEngine: Send + 'static {
    /// Called once on the worker thread before the first request
    fn attach(&mut self, notifier: Notifier) {
        let _ = notifier;
    }

    fn open_database(
        &mut self,
        path: &Path,
        credentials: &Credentials,
        read_only: bool,
        database_type: DatabaseType,
    ) -> EngineResult<DatabaseProperties>;

    fn create_new_database(
        &mut self,
        path: &Path,
        credentials: &Credentials,
        database_type: DatabaseType,
        cipher_algorithm: CipherAlgorithm,
        key_derivation_rounds: u64,
    ) -> EngineResult<DatabaseProperties>;

    fn close_database(&mut self) -> EngineResult<()>;

    fn change_credentials(&mut self, credentials: &Credentials) -> EngineResult<()>;

    /// Returns the rounds now in effect
    fn change_key_derivation_rounds(&mut self, rounds: u64) -> EngineResult<u64>;

    /// Returns the cipher now in effect
    fn change_cipher_algorithm(
        &mut self,
        cipher_algorithm: CipherAlgorithm,
    ) -> EngineResult<CipherAlgorithm>;

    /// View preference mirrored from the caller; never answered
    fn apply_setting(&mut self, setting: ViewSetting) {
        debug!(?setting, "view setting ignored by engine");
    }
}

/// Engine-side handle on the notification channel
///
/// Sends are fire-and-forget: once the session is gone they are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: UnboundedSender<EngineNotification>,
}

impl Notifier {
    pub(crate) fn new(tx: UnboundedSender<EngineNotification>) -> Self {
        Self { tx }
    }

    pub fn key_derivation_rounds_changed(&self, rounds: u64) {
        self.send(EngineNotification::KeyDerivationRoundsChanged(rounds));
    }

    pub fn cipher_algorithm_changed(&self, cipher_algorithm: CipherAlgorithm) {
        self.send(EngineNotification::CipherAlgorithmChanged(cipher_algorithm));
    }

    /// The engine dropped the open database without being asked to
    pub fn database_closed(&self, reason: impl Into<String>) {
        self.send(EngineNotification::DatabaseClosed {
            reason: reason.into(),
        });
    }

    pub(crate) fn complete(
        &self,
        id: RequestId,
        outcome: Result<crate::session::Completion, EngineError>,
    ) {
        self.send(EngineNotification::Completed { id, outcome });
    }

    fn send(&self, notification: EngineNotification) {
        if self.tx.send(notification).is_err() {
            debug!("session is gone, notification dropped");
        }
    }
}
