// src/lib.rs
//! vault-session: session coordinator for an encrypted credential database
//!
//! Features:
//! - Single `Session` façade with an explicit lifecycle state machine
//! - Storage engine on a dedicated worker thread, message passing only
//! - Cached database properties with change events
//! - Bundled `FileEngine`: AES-256 (AES Crypt v3) or ChaCha20-Poly1305 containers
//! - Full secure-gate v0.5 integration for credential material

pub mod aliases;
pub mod config;
pub mod consts;
pub mod credentials;
pub mod engine;
pub mod enums;
pub mod error;
pub mod session;
pub mod settings;

// Re-export everything users need at the crate root
pub use config::load as load_config;
pub use credentials::Credentials;
pub use engine::{FileEngine, Notifier, StorageEngine};
pub use enums::{CipherAlgorithm, DatabaseType, ResultCode};
pub use error::{EngineError, EngineResult, SessionError};
pub use session::{DatabaseProperties, Session, SessionBuilder, SessionEvent, SessionState};
pub use settings::{MemorySettingsStore, SettingsStore, TomlSettingsStore, ViewSetting, ViewSettings};
