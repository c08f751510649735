// src/aliases.rs
//! Re-exports secure-gate's ergonomic secret types
//!
//! These are the canonical secret wrappers used throughout vault-session.
//! All of them zeroize their contents on drop.

pub use secure_gate::{
    dynamic_alias, fixed_alias, random_alias, SecureConversionsExt, SecureRandomExt,
};

// Fixed-size secrets
fixed_alias!(CompositeKey32, 32); // SHA-256 over password hash ‖ key-file hash
fixed_alias!(MasterKey32, 32); // transformed key fed to the body cipher

// Dynamic secrets
dynamic_alias!(MasterPassword, String); // user-entered database password
dynamic_alias!(KeyFileBytes, Vec<u8>); // raw key-file content while hashing
dynamic_alias!(PlainBody, Vec<u8>); // serialized database content before encryption

// Random secrets
random_alias!(RandomSalt32, 32); // per-save key transform salt
random_alias!(RandomNonce12, 12); // ChaCha20-Poly1305 nonce
