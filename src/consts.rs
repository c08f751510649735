// src/consts.rs
//! Shared constants: container layout and defaults

/// Default key-derivation rounds for newly created databases
// ~50k SHA-256 transforms / PBKDF2 iterations: well under a second on a phone
pub const DEFAULT_KEY_DERIVATION_ROUNDS: u64 = 50_000;

/// Upper bound on key-derivation rounds accepted for any cipher
// A few seconds of SHA-256 on a desktop; the worker cannot be interrupted
pub const MAX_KEY_DERIVATION_ROUNDS: u64 = 10_000_000;

/// Magic bytes at the start of every database container
pub const CONTAINER_MAGIC: &[u8; 4] = b"VSDB";

/// Container format byte for legacy databases
pub const FORMAT_LEGACY: u8 = 1;

/// Container format byte for current databases
pub const FORMAT_CURRENT: u8 = 2;

/// Salt length used by the key transform
pub const SALT_LEN: usize = 32;

/// ChaCha20-Poly1305 nonce length
pub const NONCE_LEN: usize = 12;

/// magic + format + cipher + rounds + salt
pub const CONTAINER_HEADER_LEN: usize = 4 + 1 + 1 + 8 + SALT_LEN;

/// Title of the group every new database gets for regular entries
pub const DEFAULT_GROUP_TITLE: &str = "General";

/// Title of the group that receives backups of edited entries
pub const BACKUP_GROUP_TITLE: &str = "Backup";

/// Default file extension for databases created through the CLI
pub const DATABASE_EXTENSION: &str = "vsdb";

/// Name of the directory under the platform config dir
pub const CONFIG_DIR_NAME: &str = "vault-session";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "VSESSION_CONFIG";
