// src/credentials.rs
//! Credential material supplied per operation
//!
//! A `Credentials` value is moved into the request that needs it and dropped
//! (zeroizing the password) as soon as the storage engine has consumed it.
//! It is deliberately not `Clone`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::aliases::MasterPassword;

pub struct Credentials {
    password: MasterPassword,
    key_file: Option<PathBuf>,
}

impl Credentials {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: MasterPassword::new(password.into()),
            key_file: None,
        }
    }

    pub fn with_key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    /// Sets the key file only when one is given
    pub fn with_optional_key_file(mut self, key_file: Option<PathBuf>) -> Self {
        self.key_file = key_file;
        self
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret().as_str()
    }

    pub fn key_file(&self) -> Option<&Path> {
        self.key_file.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &"[REDACTED]")
            .field("key_file", &self.key_file)
            .finish()
    }
}
