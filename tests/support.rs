// tests/support.rs
//! Test utilities: a scriptable spy engine and session constructors

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use vault_session::config::Config;
use vault_session::engine::Notifier;
use vault_session::{
    CipherAlgorithm, Credentials, DatabaseProperties, DatabaseType, EngineError, EngineResult,
    MemorySettingsStore, ResultCode, Session, StorageEngine, ViewSetting,
};

/// One call the worker made into the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Open {
        path: PathBuf,
        read_only: bool,
        database_type: DatabaseType,
    },
    Create {
        path: PathBuf,
        database_type: DatabaseType,
        cipher_algorithm: CipherAlgorithm,
        key_derivation_rounds: u64,
    },
    Close,
    ChangeCredentials,
    SetKeyDerivationRounds(u64),
    SetCipherAlgorithm(CipherAlgorithm),
    ApplySetting(ViewSetting),
}

impl EngineCall {
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, EngineCall::ApplySetting(_))
    }
}

/// Test-side view of a [`SpyEngine`] running on the worker
#[derive(Clone, Default)]
pub struct SpyHandle {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    notifier: Arc<Mutex<Option<Notifier>>>,
}

impl SpyHandle {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Everything except mirrored view settings
    pub fn lifecycle_calls(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(EngineCall::is_lifecycle)
            .collect()
    }

    /// Notifier the worker attached; only available once the session is built
    pub fn notifier(&self) -> Notifier {
        self.notifier
            .lock()
            .unwrap()
            .clone()
            .expect("engine not attached yet")
    }
}

pub struct SpyEngine {
    handle: SpyHandle,
    properties: DatabaseProperties,
    password: String,
    open: bool,
    close_failure: Option<EngineError>,
    rounds_failure: Option<EngineError>,
    closure_on_open: Option<String>,
}

pub fn default_properties() -> DatabaseProperties {
    DatabaseProperties {
        database_type: DatabaseType::CurrentFormat,
        key_derivation_rounds: 60_000,
        cipher_algorithm: CipherAlgorithm::ChaCha20Poly1305,
    }
}

impl SpyEngine {
    pub fn new() -> (Self, SpyHandle) {
        let handle = SpyHandle::default();
        let engine = Self {
            handle: handle.clone(),
            properties: default_properties(),
            password: "secret".into(),
            open: false,
            close_failure: None,
            rounds_failure: None,
            closure_on_open: None,
        };
        (engine, handle)
    }

    pub fn with_properties(mut self, properties: DatabaseProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn failing_close(mut self, err: EngineError) -> Self {
        self.close_failure = Some(err);
        self
    }

    pub fn failing_rounds(mut self, err: EngineError) -> Self {
        self.rounds_failure = Some(err);
        self
    }

    /// Reports a closure, then fails, on the next open
    pub fn reporting_closure_on_open(mut self, reason: &str) -> Self {
        self.closure_on_open = Some(reason.to_string());
        self
    }

    fn record(&self, call: EngineCall) {
        self.handle.calls.lock().unwrap().push(call);
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(EngineError::from_code(ResultCode::NotOpened))
        }
    }
}

impl StorageEngine for SpyEngine {
    fn attach(&mut self, notifier: Notifier) {
        *self.handle.notifier.lock().unwrap() = Some(notifier);
    }

    fn open_database(
        &mut self,
        path: &Path,
        credentials: &Credentials,
        read_only: bool,
        database_type: DatabaseType,
    ) -> EngineResult<DatabaseProperties> {
        self.record(EngineCall::Open {
            path: path.to_path_buf(),
            read_only,
            database_type,
        });
        if let Some(reason) = self.closure_on_open.take() {
            self.handle.notifier().database_closed(reason);
            return Err(EngineError::new(ResultCode::FileError, "file vanished"));
        }
        if credentials.password() != self.password {
            return Err(EngineError::new(ResultCode::LoadError, "wrong password"));
        }
        self.open = true;
        Ok(self.properties)
    }

    fn create_new_database(
        &mut self,
        path: &Path,
        credentials: &Credentials,
        database_type: DatabaseType,
        cipher_algorithm: CipherAlgorithm,
        key_derivation_rounds: u64,
    ) -> EngineResult<DatabaseProperties> {
        self.record(EngineCall::Create {
            path: path.to_path_buf(),
            database_type,
            cipher_algorithm,
            key_derivation_rounds,
        });
        self.password = credentials.password().to_string();
        self.properties = DatabaseProperties {
            database_type,
            key_derivation_rounds,
            cipher_algorithm,
        };
        self.open = true;
        Ok(self.properties)
    }

    fn close_database(&mut self) -> EngineResult<()> {
        self.record(EngineCall::Close);
        self.ensure_open()?;
        if let Some(err) = self.close_failure.take() {
            return Err(err);
        }
        self.open = false;
        Ok(())
    }

    fn change_credentials(&mut self, credentials: &Credentials) -> EngineResult<()> {
        self.record(EngineCall::ChangeCredentials);
        self.ensure_open()?;
        self.password = credentials.password().to_string();
        Ok(())
    }

    fn change_key_derivation_rounds(&mut self, rounds: u64) -> EngineResult<u64> {
        self.record(EngineCall::SetKeyDerivationRounds(rounds));
        self.ensure_open()?;
        if let Some(err) = self.rounds_failure.take() {
            return Err(err);
        }
        self.properties.key_derivation_rounds = rounds;
        Ok(rounds)
    }

    fn change_cipher_algorithm(
        &mut self,
        cipher_algorithm: CipherAlgorithm,
    ) -> EngineResult<CipherAlgorithm> {
        self.record(EngineCall::SetCipherAlgorithm(cipher_algorithm));
        self.ensure_open()?;
        self.properties.cipher_algorithm = cipher_algorithm;
        Ok(cipher_algorithm)
    }

    fn apply_setting(&mut self, setting: ViewSetting) {
        self.record(EngineCall::ApplySetting(setting));
    }
}

/// Built-in defaults with settings kept in memory
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.paths.settings_file = None;
    config
}

pub fn session_with<E: StorageEngine>(engine: E) -> Session {
    Session::builder()
        .config(test_config())
        .settings_store(MemorySettingsStore::new())
        .build(engine)
        .expect("session starts")
}

/// Spy-backed session plus the handle to inspect the engine
pub fn spy_session() -> (Session, SpyHandle) {
    let (engine, handle) = SpyEngine::new();
    (session_with(engine), handle)
}

/// Writes an empty file that stands in for a database on disk
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").unwrap();
    path
}
