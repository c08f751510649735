// src/engine/format.rs
//! Database container header
//!
//! ```text
//! +-------+--------+--------+------------+-----------+------------------+
//! | magic | format | cipher | rounds     | salt      | encrypted body   |
//! | VSDB  | u8     | u8     | u64 (BE)   | 32 bytes  | ...              |
//! +-------+--------+--------+------------+-----------+------------------+
//! ```
//!
//! The header is stored in the clear; everything after it is ciphertext.

use thiserror::Error;

use crate::consts::{
    CONTAINER_HEADER_LEN, CONTAINER_MAGIC, FORMAT_CURRENT, FORMAT_LEGACY,
    MAX_KEY_DERIVATION_ROUNDS, SALT_LEN,
};
use crate::enums::{CipherAlgorithm, DatabaseType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("file is too short to be a database ({0} bytes)")]
    Truncated(usize),

    #[error("not a database container (bad magic)")]
    BadMagic,

    #[error("unsupported container format {0}")]
    UnsupportedFormat(u8),

    #[error("unknown cipher id {0}")]
    UnknownCipher(u8),

    #[error("key derivation rounds must be at least 1")]
    ZeroRounds,

    #[error("{0} key derivation rounds exceed the limit of {max}", max = MAX_KEY_DERIVATION_ROUNDS)]
    TooManyRounds(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub database_type: DatabaseType,
    pub cipher_algorithm: CipherAlgorithm,
    pub key_derivation_rounds: u64,
    pub salt: [u8; SALT_LEN],
}

impl ContainerHeader {
    pub fn encode(&self) -> Result<[u8; CONTAINER_HEADER_LEN], FormatError> {
        let format = match self.database_type {
            DatabaseType::LegacyFormat => FORMAT_LEGACY,
            DatabaseType::CurrentFormat => FORMAT_CURRENT,
            DatabaseType::Unknown => return Err(FormatError::UnsupportedFormat(0)),
        };
        if self.key_derivation_rounds == 0 {
            return Err(FormatError::ZeroRounds);
        }

        let mut out = [0u8; CONTAINER_HEADER_LEN];
        out[..4].copy_from_slice(CONTAINER_MAGIC);
        out[4] = format;
        out[5] = self.cipher_algorithm.as_i32() as u8;
        out[6..14].copy_from_slice(&self.key_derivation_rounds.to_be_bytes());
        out[14..].copy_from_slice(&self.salt);
        Ok(out)
    }

    /// Splits `data` into its header and the encrypted body
    pub fn decode(data: &[u8]) -> Result<(Self, &[u8]), FormatError> {
        if data.len() < CONTAINER_HEADER_LEN {
            return Err(FormatError::Truncated(data.len()));
        }
        let (header, body) = data.split_at(CONTAINER_HEADER_LEN);
        if &header[..4] != CONTAINER_MAGIC {
            return Err(FormatError::BadMagic);
        }

        let database_type = match header[4] {
            FORMAT_LEGACY => DatabaseType::LegacyFormat,
            FORMAT_CURRENT => DatabaseType::CurrentFormat,
            other => return Err(FormatError::UnsupportedFormat(other)),
        };
        let cipher_algorithm = CipherAlgorithm::try_from(i32::from(header[5]))
            .map_err(|_| FormatError::UnknownCipher(header[5]))?;

        let mut rounds = [0u8; 8];
        rounds.copy_from_slice(&header[6..14]);
        let key_derivation_rounds = u64::from_be_bytes(rounds);
        if key_derivation_rounds == 0 {
            return Err(FormatError::ZeroRounds);
        }
        if key_derivation_rounds > MAX_KEY_DERIVATION_ROUNDS {
            return Err(FormatError::TooManyRounds(key_derivation_rounds));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&header[14..]);

        Ok((
            Self {
                database_type,
                cipher_algorithm,
                key_derivation_rounds,
                salt,
            },
            body,
        ))
    }
}
