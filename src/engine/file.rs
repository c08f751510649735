// src/engine/file.rs
//! Bundled storage engine: one encrypted container file per database
//!
//! Every mutation rewrites the whole container atomically (temporary file in
//! the same directory, then rename). The decrypted content and the composite
//! key live only on the worker thread and are wiped when the database is
//! closed or the engine dropped.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::crypto::{self, composite_key};
use super::format::ContainerHeader;
use super::model::DatabaseContent;
use super::{Notifier, StorageEngine};
use crate::aliases::{CompositeKey32, PlainBody, RandomSalt32, SecureRandomExt};
use crate::credentials::Credentials;
use crate::enums::{CipherAlgorithm, DatabaseType, ResultCode};
use crate::error::{EngineError, EngineResult};
use crate::session::DatabaseProperties;

struct OpenDatabase {
    path: PathBuf,
    header: ContainerHeader,
    composite: CompositeKey32,
    content: DatabaseContent,
    read_only: bool,
}

impl OpenDatabase {
    fn properties(&self) -> DatabaseProperties {
        DatabaseProperties {
            database_type: self.header.database_type,
            key_derivation_rounds: self.header.key_derivation_rounds,
            cipher_algorithm: self.header.cipher_algorithm,
        }
    }
}

#[derive(Default)]
pub struct FileEngine {
    database: Option<OpenDatabase>,
    notifier: Option<Notifier>,
}

impl FileEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_closed(&self) -> EngineResult<()> {
        match &self.database {
            Some(db) => Err(EngineError::new(
                ResultCode::AlreadyOpen,
                format!("{} is already open", db.path.display()),
            )),
            None => Ok(()),
        }
    }

    fn opened(&self) -> EngineResult<&OpenDatabase> {
        self.database
            .as_ref()
            .ok_or_else(|| EngineError::from_code(ResultCode::NotOpened))
    }

    /// The open database, if it may be modified
    fn writable(&mut self) -> EngineResult<&mut OpenDatabase> {
        let db = self
            .database
            .as_mut()
            .ok_or_else(|| EngineError::from_code(ResultCode::NotOpened))?;
        if db.read_only {
            return Err(EngineError::new(
                ResultCode::SaveError,
                "database was opened read-only",
            ));
        }
        Ok(db)
    }

    fn write(&mut self) -> Result<(), WriteError> {
        let db = self
            .database
            .as_mut()
            .ok_or_else(|| EngineError::from_code(ResultCode::NotOpened))?;
        db.content.touch();
        write_container(&db.path, &db.header, &db.composite, &db.content)
    }

    /// Writes the open database, reporting a vanished directory as a closure
    fn save(&mut self) -> EngineResult<()> {
        match self.write() {
            Ok(()) => Ok(()),
            Err(WriteError::DirectoryGone(dir)) => {
                let reason = directory_gone(&dir);
                warn!(%reason, "dropping open database");
                self.database = None;
                if let Some(notifier) = &self.notifier {
                    notifier.database_closed(reason.clone());
                }
                Err(EngineError::new(ResultCode::SaveError, reason))
            }
            Err(WriteError::Engine(err)) => Err(err),
        }
    }

    /// Applies `change` to the header, saves, and restores the old header if saving fails
    fn rewrite_header(
        &mut self,
        change: impl FnOnce(&mut ContainerHeader),
    ) -> EngineResult<DatabaseProperties> {
        let db = self.writable()?;
        let previous = db.header.clone();
        let mut header = previous.clone();
        change(&mut header);
        crypto::validate(&header)?;
        db.header = header;

        if let Err(err) = self.save() {
            if let Some(db) = self.database.as_mut() {
                db.header = previous;
            }
            return Err(err);
        }
        self.opened().map(OpenDatabase::properties)
    }
}

enum WriteError {
    DirectoryGone(PathBuf),
    Engine(EngineError),
}

impl From<EngineError> for WriteError {
    fn from(err: EngineError) -> Self {
        WriteError::Engine(err)
    }
}

fn directory_gone(dir: &Path) -> String {
    format!("database directory {} no longer exists", dir.display())
}

fn save_error(path: &Path, err: io::Error) -> EngineError {
    EngineError::new(
        ResultCode::SaveError,
        format!("could not write {}: {err}", path.display()),
    )
}

fn write_container(
    path: &Path,
    header: &ContainerHeader,
    composite: &CompositeKey32,
    content: &DatabaseContent,
) -> Result<(), WriteError> {
    let header_bytes = header
        .encode()
        .map_err(|err| EngineError::new(ResultCode::SaveError, err.to_string()))?;
    let body = serde_json::to_vec(content)
        .map(PlainBody::new)
        .map_err(|err| EngineError::new(ResultCode::SaveError, err.to_string()))?;
    let sealed = crypto::seal(&body, composite, header, &header_bytes)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.is_dir() {
        return Err(WriteError::DirectoryGone(dir));
    }

    let write = |tmp: &mut NamedTempFile| -> io::Result<()> {
        tmp.write_all(&header_bytes)?;
        tmp.write_all(&sealed)?;
        tmp.as_file().sync_all()
    };
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|err| save_error(path, err))?;
    write(&mut tmp).map_err(|err| save_error(path, err))?;
    tmp.persist(path)
        .map_err(|err| save_error(path, err.error))?;
    debug!(path = %path.display(), bytes = header_bytes.len() + sealed.len(), "database written");
    Ok(())
}

impl StorageEngine for FileEngine {
    fn attach(&mut self, notifier: Notifier) {
        self.notifier = Some(notifier);
    }

    fn open_database(
        &mut self,
        path: &Path,
        credentials: &Credentials,
        read_only: bool,
        database_type: DatabaseType,
    ) -> EngineResult<DatabaseProperties> {
        self.ensure_closed()?;

        let data = std::fs::read(path).map_err(|err| {
            EngineError::new(
                ResultCode::FileError,
                format!("could not read {}: {err}", path.display()),
            )
        })?;
        let (header, body) = ContainerHeader::decode(&data)
            .map_err(|err| EngineError::new(ResultCode::LoadError, err.to_string()))?;
        if database_type != DatabaseType::Unknown && database_type != header.database_type {
            return Err(EngineError::new(
                ResultCode::LoadError,
                format!(
                    "expected a {database_type:?} database, found {:?}",
                    header.database_type
                ),
            ));
        }

        let composite = composite_key(credentials)?;
        let plain = crypto::unseal(body, &composite, &header, &data[..data.len() - body.len()])?;
        let content: DatabaseContent = serde_json::from_slice(plain.expose_secret())
            .map_err(|err| EngineError::new(ResultCode::LoadError, format!("corrupt database: {err}")))?;

        info!(
            path = %path.display(),
            read_only,
            groups = content.groups.len(),
            entries = content.entry_count(),
            "database opened"
        );
        let db = OpenDatabase {
            path: path.to_path_buf(),
            header,
            composite,
            content,
            read_only,
        };
        let properties = db.properties();
        self.database = Some(db);
        Ok(properties)
    }

    fn create_new_database(
        &mut self,
        path: &Path,
        credentials: &Credentials,
        database_type: DatabaseType,
        cipher_algorithm: CipherAlgorithm,
        key_derivation_rounds: u64,
    ) -> EngineResult<DatabaseProperties> {
        self.ensure_closed()?;
        if path.exists() {
            return Err(EngineError::new(
                ResultCode::FileError,
                format!("{} already exists", path.display()),
            ));
        }

        let database_type = match database_type {
            DatabaseType::Unknown => DatabaseType::CurrentFormat,
            other => other,
        };
        let header = ContainerHeader {
            database_type,
            cipher_algorithm,
            key_derivation_rounds,
            salt: **RandomSalt32::new(),
        };
        crypto::validate(&header)?;
        let composite = composite_key(credentials)?;
        let content = DatabaseContent::with_default_groups().map_err(|err| {
            EngineError::new(ResultCode::BackupGroupCreationError, err.to_string())
        })?;

        self.database = Some(OpenDatabase {
            path: path.to_path_buf(),
            header,
            composite,
            content,
            read_only: false,
        });
        // Never reported as a closure: nothing was open yet
        if let Err(err) = self.write() {
            self.database = None;
            return Err(match err {
                WriteError::DirectoryGone(dir) => {
                    EngineError::new(ResultCode::SaveError, directory_gone(&dir))
                }
                WriteError::Engine(err) => err,
            });
        }

        info!(path = %path.display(), ?database_type, %cipher_algorithm, "database created");
        self.opened().map(OpenDatabase::properties)
    }

    fn close_database(&mut self) -> EngineResult<()> {
        match self.database.take() {
            Some(db) => {
                info!(path = %db.path.display(), "database closed");
                Ok(())
            }
            None => Err(EngineError::from_code(ResultCode::NotOpened)),
        }
    }

    fn change_credentials(&mut self, credentials: &Credentials) -> EngineResult<()> {
        self.writable()?;
        let composite = composite_key(credentials)?;

        let db = self.writable()?;
        let previous_key = std::mem::replace(&mut db.composite, composite);
        let previous_salt = std::mem::replace(&mut db.header.salt, **RandomSalt32::new());

        if let Err(err) = self.save() {
            if let Some(db) = self.database.as_mut() {
                db.composite = previous_key;
                db.header.salt = previous_salt;
            }
            return Err(err);
        }
        info!("database credentials replaced");
        Ok(())
    }

    fn change_key_derivation_rounds(&mut self, rounds: u64) -> EngineResult<u64> {
        let properties = self.rewrite_header(|header| header.key_derivation_rounds = rounds)?;
        debug!(rounds, "key derivation rounds changed");
        Ok(properties.key_derivation_rounds)
    }

    fn change_cipher_algorithm(
        &mut self,
        cipher_algorithm: CipherAlgorithm,
    ) -> EngineResult<CipherAlgorithm> {
        let properties = self.rewrite_header(|header| header.cipher_algorithm = cipher_algorithm)?;
        debug!(%cipher_algorithm, "cipher changed");
        Ok(properties.cipher_algorithm)
    }
}
