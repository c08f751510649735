// src/session/mod.rs
//! Session façade: the single public handle on the credential database
//!
//! Operations return as soon as the request is validated and forwarded; their
//! outcome arrives later as a [`SessionEvent`]. Getters read cached state and
//! never block. Precondition and state errors are detected synchronously:
//! they are returned as `Err` *and* queued as `ErrorOccurred`, so both `?`
//! callers and event-driven callers observe them.
//!
//! The session lives on the caller's context and is driven by awaiting
//! [`Session::next_event`] (or polling [`Session::try_next_event`]). The
//! storage engine runs on its own worker thread; the two sides only exchange
//! messages.

mod cache;
mod dispatcher;
mod event;
mod protocol;
mod relay;
mod state;

pub use cache::{Cached, PropertyCache};
pub use event::SessionEvent;
pub use protocol::{
    Completion, DatabaseProperties, EngineNotification, EngineRequest, Envelope, RequestId,
};
pub use state::{Operation, SessionState, StateMachine};

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::{self, Config, CreateDefaults};
use crate::credentials::Credentials;
use crate::engine::{self, Notifier, StorageEngine};
use crate::enums::{CipherAlgorithm, DatabaseType};
use crate::error::SessionError;
use crate::settings::{
    MemorySettingsStore, SettingsStore, TomlSettingsStore, ViewSetting, ViewSettings,
};

use dispatcher::Dispatcher;
use relay::Relay;

/// Where the open database lives and how it was opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub path: PathBuf,
    pub database_type: DatabaseType,
    pub read_only: bool,
}

/// Caller-side state the relay mutates
pub(crate) struct SessionCore {
    pub(crate) machine: StateMachine,
    pub(crate) properties: PropertyCache,
    pub(crate) database: Option<DatabaseInfo>,
    /// Target of an in-flight open/create
    pub(crate) pending_database: Option<DatabaseInfo>,
    pub(crate) events: VecDeque<SessionEvent>,
    defaults: CreateDefaults,
}

impl SessionCore {
    fn new(defaults: CreateDefaults) -> Self {
        Self {
            machine: StateMachine::new(),
            properties: PropertyCache::new(
                defaults.key_derivation_rounds,
                defaults.cipher_algorithm,
            ),
            database: None,
            pending_database: None,
            events: VecDeque::new(),
            defaults,
        }
    }

    /// Forgets the open database; cached properties fall back to the defaults
    pub(crate) fn clear_database(&mut self) {
        self.database = None;
        self.properties.reset(
            self.defaults.key_derivation_rounds,
            self.defaults.cipher_algorithm,
        );
    }
}

pub struct Session {
    core: SessionCore,
    dispatcher: Dispatcher,
    relay: Relay,
    view: ViewSettings,
    settings_store: Box<dyn SettingsStore>,
    worker: Option<JoinHandle<()>>,
}

/// Configures a [`Session`] before its worker starts
pub struct SessionBuilder {
    config: Config,
    settings_store: Option<Box<dyn SettingsStore>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn settings_store(mut self, store: impl SettingsStore + 'static) -> Self {
        self.settings_store = Some(Box::new(store));
        self
    }

    /// Spawns the engine worker and mirrors the current view settings to it
    pub fn build<E: StorageEngine>(self, engine: E) -> Result<Session, SessionError> {
        let settings_store: Box<dyn SettingsStore> = match self.settings_store {
            Some(store) => store,
            None => match &self.config.paths.settings_file {
                Some(path) => Box::new(TomlSettingsStore::new(path)),
                None => Box::new(MemorySettingsStore::new()),
            },
        };

        let view = match settings_store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => self.config.view,
            Err(err) => {
                warn!(%err, "could not load view settings, using configured defaults");
                self.config.view
            }
        };

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let worker = engine::worker::spawn(engine, request_rx, Notifier::new(notification_tx))
            .map_err(|err| {
                error!(%err, "could not spawn storage engine worker");
                SessionError::EngineTerminated
            })?;

        let dispatcher = Dispatcher::new(request_tx);
        for change in view.as_changes() {
            dispatcher.post(EngineRequest::ApplySetting(change))?;
        }

        Ok(Session {
            core: SessionCore::new(self.config.create),
            dispatcher,
            relay: Relay::new(notification_rx),
            view,
            settings_store,
            worker: Some(worker),
        })
    }
}

impl Session {
    /// Session over `engine` with the process-wide configuration
    pub fn new<E: StorageEngine>(engine: E) -> Result<Self, SessionError> {
        Self::builder().build(engine)
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            config: config::load().clone(),
            settings_store: None,
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Lifecycle operations
    // ──────────────────────────────────────────────────────────────

    /// Opens an existing database
    ///
    /// The session is `Opening` when this returns `Ok`; `DatabaseOpened` or
    /// `ErrorOccurred` follows.
    pub fn open(
        &mut self,
        database_type: DatabaseType,
        path: impl Into<PathBuf>,
        credentials: Credentials,
        read_only: bool,
    ) -> Result<(), SessionError> {
        let path = path.into();
        let result = self.try_open(database_type, path, credentials, read_only);
        self.report(result)
    }

    /// Creates a new database and leaves it open
    ///
    /// Cipher and rounds come from the configured creation defaults; an
    /// `Unknown` type selects the configured default type.
    pub fn create(
        &mut self,
        database_type: DatabaseType,
        path: impl Into<PathBuf>,
        credentials: Credentials,
    ) -> Result<(), SessionError> {
        let path = path.into();
        let result = self.try_create(database_type, path, credentials);
        self.report(result)
    }

    /// Closes the open database; `AlreadyClosed` when there is none
    pub fn close(&mut self) -> Result<(), SessionError> {
        let result = self.try_close();
        self.report(result)
    }

    /// Replaces the credential material of the open database
    pub fn change_credentials(&mut self, credentials: Credentials) -> Result<(), SessionError> {
        let result = self.try_change_credentials(credentials);
        self.report(result)
    }

    /// Requests new key-derivation rounds; the cached value moves on confirmation
    pub fn set_key_derivation_rounds(&mut self, rounds: u64) -> Result<(), SessionError> {
        let result = self.try_set_property(Operation::SetKeyDerivationRounds, || {
            EngineRequest::SetKeyDerivationRounds(rounds)
        });
        self.report(result)
    }

    /// Requests a new cipher; the cached value moves on confirmation
    pub fn set_cipher_algorithm(&mut self, cipher: CipherAlgorithm) -> Result<(), SessionError> {
        let result = self.try_set_property(Operation::SetCipherAlgorithm, || {
            EngineRequest::SetCipherAlgorithm(cipher)
        });
        self.report(result)
    }

    fn try_open(
        &mut self,
        database_type: DatabaseType,
        path: PathBuf,
        credentials: Credentials,
        read_only: bool,
    ) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.core.machine.check(Operation::Open)?;
        if !path.exists() {
            return Err(SessionError::PathNotFound(path));
        }
        check_key_file(&credentials)?;

        self.core.machine.begin(Operation::Open)?;
        self.core.pending_database = Some(DatabaseInfo {
            path: path.clone(),
            database_type,
            read_only,
        });
        self.forward(
            Operation::Open,
            EngineRequest::Open {
                path,
                credentials,
                read_only,
                database_type,
            },
        )
    }

    fn try_create(
        &mut self,
        database_type: DatabaseType,
        path: PathBuf,
        credentials: Credentials,
    ) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.core.machine.check(Operation::Create)?;
        check_key_file(&credentials)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.is_dir() {
            std::fs::create_dir_all(&dir).map_err(|err| SessionError::PathCreationFailed {
                path: dir.clone(),
                message: err.to_string(),
            })?;
            debug!(dir = %dir.display(), "created database directory");
        }

        let defaults = self.core.defaults.clone();
        let database_type = match database_type {
            DatabaseType::Unknown => defaults.database_type,
            other => other,
        };

        self.core.machine.begin(Operation::Create)?;
        self.core.pending_database = Some(DatabaseInfo {
            path: path.clone(),
            database_type,
            read_only: false,
        });
        self.forward(
            Operation::Create,
            EngineRequest::Create {
                path,
                credentials,
                database_type,
                cipher_algorithm: defaults.cipher_algorithm,
                key_derivation_rounds: defaults.key_derivation_rounds,
            },
        )
    }

    fn try_close(&mut self) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.core.machine.begin(Operation::Close)?;
        self.forward(Operation::Close, EngineRequest::Close)
    }

    fn try_change_credentials(&mut self, credentials: Credentials) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.core.machine.check(Operation::ChangeCredentials)?;
        check_key_file(&credentials)?;

        self.core.machine.begin(Operation::ChangeCredentials)?;
        self.forward(
            Operation::ChangeCredentials,
            EngineRequest::ChangeCredentials { credentials },
        )
    }

    fn try_set_property(
        &mut self,
        operation: Operation,
        request: impl FnOnce() -> EngineRequest,
    ) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.core.machine.begin(operation)?;
        match operation {
            Operation::SetKeyDerivationRounds => {
                self.core.properties.key_derivation_rounds.request()
            }
            _ => self.core.properties.cipher_algorithm.request(),
        }
        self.forward(operation, request())
    }

    /// Hands a validated request to the dispatcher, undoing the entry transition if it cannot be sent
    fn forward(&mut self, operation: Operation, request: EngineRequest) -> Result<(), SessionError> {
        match self.dispatcher.submit(request) {
            Ok(id) => {
                self.relay.track(id, operation);
                Ok(())
            }
            Err(err) => {
                match operation {
                    Operation::SetKeyDerivationRounds => {
                        self.core.properties.key_derivation_rounds.reject()
                    }
                    Operation::SetCipherAlgorithm => {
                        self.core.properties.cipher_algorithm.reject()
                    }
                    _ => {
                        self.core.machine.finish(operation, false);
                        self.core.pending_database = None;
                    }
                }
                Err(err)
            }
        }
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        if self.relay.is_terminated() {
            return Err(SessionError::EngineTerminated);
        }
        Ok(())
    }

    fn report(&mut self, result: Result<(), SessionError>) -> Result<(), SessionError> {
        if let Err(err) = &result {
            if err.is_benign() {
                debug!(%err, "request not needed");
            } else {
                warn!(%err, code = %err.code(), "request rejected");
            }
            self.core.events.push_back(SessionEvent::from(err));
        }
        result
    }

    // ──────────────────────────────────────────────────────────────
    // Events
    // ──────────────────────────────────────────────────────────────

    /// Next event, waiting for the engine if none is queued
    ///
    /// There is no timeout: if nothing is in flight and the engine stays
    /// silent this waits indefinitely. Returns `None` once the worker has
    /// terminated and every queued event was delivered.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.core.events.pop_front() {
                return Some(event);
            }
            if self.relay.is_terminated() {
                return None;
            }
            self.relay.pump(&mut self.core).await;
        }
    }

    /// Next event if one is available right now
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.core.events.pop_front() {
                return Some(event);
            }
            if !self.relay.pump_now(&mut self.core) {
                return None;
            }
        }
    }

    /// Waits until every forwarded request has completed and drains the queued events
    pub async fn settle(&mut self) -> Vec<SessionEvent> {
        while self.relay.has_in_flight() && !self.relay.is_terminated() {
            self.relay.pump(&mut self.core).await;
        }
        while self.relay.pump_now(&mut self.core) {}
        self.core.events.drain(..).collect()
    }

    /// Stops the worker after it finished what was already sent
    ///
    /// Blocks the calling thread until the worker exits.
    pub fn shutdown(self) {
        let Session {
            dispatcher, worker, ..
        } = self;
        drop(dispatcher);
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("storage engine worker panicked");
            }
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Cached state
    // ──────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.core.machine.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Format of the open database; `Unknown` unless the session is `Open`
    pub fn database_type(&self) -> DatabaseType {
        match (&self.core.database, self.state()) {
            (Some(database), SessionState::Open) => database.database_type,
            _ => DatabaseType::Unknown,
        }
    }

    pub fn database(&self) -> Option<&DatabaseInfo> {
        self.core.database.as_ref()
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.core.database.as_ref().map(|db| db.path.as_path())
    }

    pub fn is_read_only(&self) -> bool {
        self.core.database.as_ref().is_some_and(|db| db.read_only)
    }

    pub fn key_derivation_rounds(&self) -> u64 {
        self.core.properties.key_derivation_rounds.get()
    }

    pub fn cipher_algorithm(&self) -> CipherAlgorithm {
        self.core.properties.cipher_algorithm.get()
    }

    pub fn is_key_derivation_rounds_pending(&self) -> bool {
        self.core.properties.key_derivation_rounds.is_pending()
    }

    pub fn is_cipher_algorithm_pending(&self) -> bool {
        self.core.properties.cipher_algorithm.is_pending()
    }

    /// True while a forwarded request has not completed yet
    pub fn has_pending_requests(&self) -> bool {
        self.relay.has_in_flight()
    }

    // ──────────────────────────────────────────────────────────────
    // View settings
    // ──────────────────────────────────────────────────────────────

    pub fn view_settings(&self) -> ViewSettings {
        self.view
    }

    pub fn show_credentials_in_list(&self) -> bool {
        self.view.show_credentials_in_list
    }

    pub fn set_show_credentials_in_list(&mut self, value: bool) {
        self.apply_view_setting(ViewSetting::ShowCredentialsInList(value));
    }

    pub fn sort_alphabetically(&self) -> bool {
        self.view.sort_alphabetically
    }

    pub fn set_sort_alphabetically(&mut self, value: bool) {
        self.apply_view_setting(ViewSetting::SortAlphabetically(value));
    }

    fn apply_view_setting(&mut self, setting: ViewSetting) {
        self.view.apply(setting);
        if let Err(err) = self.settings_store.save(&self.view) {
            warn!(%err, "could not persist view settings");
        }
        if self
            .dispatcher
            .post(EngineRequest::ApplySetting(setting))
            .is_err()
        {
            debug!(?setting, "view setting not mirrored, worker is gone");
        }
    }
}

fn check_key_file(credentials: &Credentials) -> Result<(), SessionError> {
    match credentials.key_file() {
        Some(key_file) if !key_file.exists() => {
            Err(SessionError::KeyFilePathNotFound(key_file.to_path_buf()))
        }
        _ => Ok(()),
    }
}
