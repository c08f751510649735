// src/enums.rs
//! Public enum types shared by the session façade and the storage engine
//!
//! Central location for every enumeration that crosses the worker boundary:
//! database format variants, cipher choices and the result-code taxonomy.
//! Both sides import these definitions; nothing is mirrored or duplicated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// On-disk format variant of a credential database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DatabaseType {
    #[default]
    Unknown,
    LegacyFormat,
    CurrentFormat,
}

impl DatabaseType {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::LegacyFormat => 1,
            Self::CurrentFormat => 2,
        }
    }
}

impl TryFrom<i32> for DatabaseType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::LegacyFormat),
            2 => Ok(Self::CurrentFormat),
            other => Err(other),
        }
    }
}

/// Cipher used to encrypt the database body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CipherAlgorithm {
    #[default]
    Aes256,
    ChaCha20Poly1305,
}

impl CipherAlgorithm {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Aes256 => 0,
            Self::ChaCha20Poly1305 => 1,
        }
    }
}

impl TryFrom<i32> for CipherAlgorithm {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Aes256),
            1 => Ok(Self::ChaCha20Poly1305),
            other => Err(other),
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes256 => f.write_str("AES-256"),
            Self::ChaCha20Poly1305 => f.write_str("ChaCha20-Poly1305"),
        }
    }
}

/// Outcome classification surfaced to callers as `(code, message)`
///
/// The integer values are stable and follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResultCode {
    Ok = 0,
    LoadError,
    SaveError,
    NotOpened,
    AlreadyOpen,
    AlreadyClosed,
    CloseFailed,
    FileError,
    SetKeyError,
    SetPasswordError,
    SetKeyFileError,
    BackupGroupCreationError,
    PathNotFound,
    KeyFilePathNotFound,
    PathCreationFailed,
    /// Another lifecycle transition is still in progress
    Busy,
    /// The storage engine worker is gone; the session cannot recover
    EngineTerminated,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Human-readable default message for this code
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "no error",
            Self::LoadError => "error loading data from database",
            Self::SaveError => "error saving data into database",
            Self::NotOpened => "database is not opened",
            Self::AlreadyOpen => "another database is currently open, close it first",
            Self::AlreadyClosed => "database already closed",
            Self::CloseFailed => "closing the database failed",
            Self::FileError => "file path error",
            Self::SetKeyError => "error setting the database key",
            Self::SetPasswordError => "error setting the database password",
            Self::SetKeyFileError => "error setting the database key file",
            Self::BackupGroupCreationError => "error creating the backup group",
            Self::PathNotFound => "database file does not exist",
            Self::KeyFilePathNotFound => "key file does not exist",
            Self::PathCreationFailed => "path to database file could not be created",
            Self::Busy => "another database operation is in progress",
            Self::EngineTerminated => "storage engine is no longer running",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
