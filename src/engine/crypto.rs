// src/engine/crypto.rs
//! Key derivation and body encryption: no I/O apart from reading key files
//!
//! All functions work on in-memory buffers. The container header is passed
//! in so the body cipher can use its salt, rounds and cipher choice.

use std::io::Cursor;

use aescrypt_rs::aliases::Password;
use aescrypt_rs::{decrypt, encrypt};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use super::format::ContainerHeader;
use crate::aliases::{
    CompositeKey32, KeyFileBytes, MasterKey32, PlainBody, RandomNonce12, SecureRandomExt,
};
use crate::consts::{CONTAINER_HEADER_LEN, MAX_KEY_DERIVATION_ROUNDS, NONCE_LEN};
use crate::credentials::Credentials;
use crate::enums::{CipherAlgorithm, DatabaseType, ResultCode};
use crate::error::{EngineError, EngineResult};

/// SHA-256 over SHA-256(password) ‖ SHA-256(key file)
///
/// Either part may be absent, not both.
pub fn composite_key(credentials: &Credentials) -> EngineResult<CompositeKey32> {
    let password = credentials.password();
    if password.is_empty() && credentials.key_file().is_none() {
        return Err(EngineError::new(
            ResultCode::SetPasswordError,
            "a password or a key file is required",
        ));
    }

    let mut hasher = Sha256::new();
    if !password.is_empty() {
        hasher.update(Sha256::digest(password.as_bytes()));
    }
    if let Some(key_file) = credentials.key_file() {
        let bytes = std::fs::read(key_file).map(KeyFileBytes::new).map_err(|err| {
            EngineError::new(
                ResultCode::SetKeyFileError,
                format!("could not read key file {}: {err}", key_file.display()),
            )
        })?;
        hasher.update(Sha256::digest(bytes.expose_secret()));
    }
    Ok(CompositeKey32::new(hasher.finalize().into()))
}

/// Applies SHA-256 `rounds` times over salt ‖ key
fn transform_key(composite: &CompositeKey32, header: &ContainerHeader) -> MasterKey32 {
    let mut state = Zeroizing::new(*composite.expose_secret());
    for _ in 0..header.key_derivation_rounds {
        let mut hasher = Sha256::new();
        hasher.update(header.salt);
        hasher.update(state.as_slice());
        *state = hasher.finalize().into();
    }
    MasterKey32::new(*state)
}

fn aescrypt_password(composite: &CompositeKey32) -> Password {
    Password::new(hex::encode(composite.expose_secret()))
}

fn aescrypt_iterations(rounds: u64) -> EngineResult<u32> {
    u32::try_from(rounds).map_err(|_| {
        EngineError::new(
            ResultCode::SetKeyError,
            format!("{rounds} key derivation rounds exceed the AES-256 limit"),
        )
    })
}

/// Checks that `header` describes a combination the body cipher supports
pub fn validate(header: &ContainerHeader) -> EngineResult<()> {
    if header.key_derivation_rounds == 0 {
        return Err(EngineError::new(
            ResultCode::SetKeyError,
            "key derivation rounds must be at least 1",
        ));
    }
    if header.key_derivation_rounds > MAX_KEY_DERIVATION_ROUNDS {
        return Err(EngineError::new(
            ResultCode::SetKeyError,
            format!(
                "{} key derivation rounds exceed the limit of {MAX_KEY_DERIVATION_ROUNDS}",
                header.key_derivation_rounds
            ),
        ));
    }
    match header.cipher_algorithm {
        CipherAlgorithm::Aes256 => aescrypt_iterations(header.key_derivation_rounds).map(|_| ()),
        CipherAlgorithm::ChaCha20Poly1305
            if header.database_type == DatabaseType::LegacyFormat =>
        {
            Err(EngineError::new(
                ResultCode::SetKeyError,
                "ChaCha20-Poly1305 is not available for legacy databases",
            ))
        }
        CipherAlgorithm::ChaCha20Poly1305 => Ok(()),
    }
}

/// Encrypts `body`; the result is what follows the header on disk
pub fn seal(
    body: &PlainBody,
    composite: &CompositeKey32,
    header: &ContainerHeader,
    header_bytes: &[u8; CONTAINER_HEADER_LEN],
) -> EngineResult<Vec<u8>> {
    let save_error = |what: &str| EngineError::new(ResultCode::SaveError, what.to_string());

    match header.cipher_algorithm {
        CipherAlgorithm::Aes256 => {
            let iterations = aescrypt_iterations(header.key_derivation_rounds)?;
            let mut out = Vec::new();
            encrypt(
                Cursor::new(body.expose_secret()),
                &mut out,
                &aescrypt_password(composite),
                iterations,
            )
            .map_err(|err| save_error(&format!("AES-256 encryption failed: {err}")))?;
            Ok(out)
        }
        CipherAlgorithm::ChaCha20Poly1305 => {
            let key = transform_key(composite, header);
            let cipher = ChaCha20Poly1305::new_from_slice(key.expose_secret())
                .map_err(|_| save_error("invalid ChaCha20-Poly1305 key length"))?;
            let nonce_bytes = RandomNonce12::new();
            let nonce = Nonce::from_slice(nonce_bytes.expose_secret());
            let ciphertext = cipher
                .encrypt(
                    nonce,
                    Payload {
                        msg: body.expose_secret(),
                        aad: header_bytes,
                    },
                )
                .map_err(|_| save_error("ChaCha20-Poly1305 encryption failed"))?;

            let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
            out.extend_from_slice(nonce_bytes.expose_secret());
            out.extend_from_slice(&ciphertext);
            Ok(out)
        }
    }
}

/// Decrypts the bytes following the header
///
/// Wrong credentials and a damaged body are indistinguishable here; both
/// are reported as `LoadError`.
pub fn unseal(
    ciphertext: &[u8],
    composite: &CompositeKey32,
    header: &ContainerHeader,
    header_bytes: &[u8],
) -> EngineResult<PlainBody> {
    let load_error = || {
        EngineError::new(
            ResultCode::LoadError,
            "invalid credentials or damaged database",
        )
    };

    match header.cipher_algorithm {
        CipherAlgorithm::Aes256 => {
            let mut out = Vec::new();
            decrypt(
                Cursor::new(ciphertext),
                &mut out,
                &aescrypt_password(composite),
            )
            .map_err(|err| {
                debug!(%err, "AES-256 decryption failed");
                load_error()
            })?;
            Ok(PlainBody::new(out))
        }
        CipherAlgorithm::ChaCha20Poly1305 => {
            if ciphertext.len() < NONCE_LEN {
                return Err(load_error());
            }
            let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
            let key = transform_key(composite, header);
            let cipher =
                ChaCha20Poly1305::new_from_slice(key.expose_secret()).map_err(|_| load_error())?;
            let plain = cipher
                .decrypt(
                    Nonce::from_slice(nonce),
                    Payload {
                        msg: sealed,
                        aad: header_bytes,
                    },
                )
                .map_err(|_| load_error())?;
            Ok(PlainBody::new(plain))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SALT_LEN;

    fn header(cipher_algorithm: CipherAlgorithm) -> ContainerHeader {
        ContainerHeader {
            database_type: DatabaseType::CurrentFormat,
            cipher_algorithm,
            key_derivation_rounds: 100,
            salt: [3u8; SALT_LEN],
        }
    }

    #[test]
    fn composite_key_depends_on_password() {
        let a = composite_key(&Credentials::new("alpha")).unwrap();
        let b = composite_key(&Credentials::new("beta")).unwrap();
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn composite_key_requires_some_material() {
        let err = composite_key(&Credentials::new("")).unwrap_err();
        assert_eq!(err.code, ResultCode::SetPasswordError);
    }

    #[test]
    fn missing_key_file_is_a_key_file_error() {
        let credentials = Credentials::new("pw").with_key_file("/definitely/not/here.key");
        let err = composite_key(&credentials).unwrap_err();
        assert_eq!(err.code, ResultCode::SetKeyFileError);
    }

    #[test]
    fn chacha_body_round_trips_and_binds_header() {
        let h = header(CipherAlgorithm::ChaCha20Poly1305);
        let header_bytes = h.encode().unwrap();
        let key = composite_key(&Credentials::new("pw")).unwrap();
        let body = PlainBody::new(b"{\"groups\":[]}".to_vec());

        let sealed = seal(&body, &key, &h, &header_bytes).unwrap();
        let opened = unseal(&sealed, &key, &h, &header_bytes).unwrap();
        assert_eq!(opened.expose_secret(), body.expose_secret());

        let mut tampered = header_bytes;
        tampered[CONTAINER_HEADER_LEN - 1] ^= 1;
        let err = unseal(&sealed, &key, &h, &tampered).unwrap_err();
        assert_eq!(err.code, ResultCode::LoadError);
    }

    #[test]
    fn aes_body_rejects_wrong_password() {
        let h = header(CipherAlgorithm::Aes256);
        let header_bytes = h.encode().unwrap();
        let key = composite_key(&Credentials::new("right")).unwrap();
        let sealed = seal(&PlainBody::new(b"data".to_vec()), &key, &h, &header_bytes).unwrap();

        let wrong = composite_key(&Credentials::new("wrong")).unwrap();
        let err = unseal(&sealed, &wrong, &h, &header_bytes).unwrap_err();
        assert_eq!(err.code, ResultCode::LoadError);
    }

    #[test]
    fn legacy_databases_cannot_use_chacha() {
        let mut h = header(CipherAlgorithm::ChaCha20Poly1305);
        h.database_type = DatabaseType::LegacyFormat;
        assert_eq!(validate(&h).unwrap_err().code, ResultCode::SetKeyError);
    }

    #[test]
    fn rounds_are_capped_for_every_cipher() {
        for cipher in [CipherAlgorithm::Aes256, CipherAlgorithm::ChaCha20Poly1305] {
            let mut h = header(cipher);
            h.key_derivation_rounds = MAX_KEY_DERIVATION_ROUNDS;
            assert!(validate(&h).is_ok());

            h.key_derivation_rounds = u64::MAX;
            assert_eq!(validate(&h).unwrap_err().code, ResultCode::SetKeyError);
        }
    }

    #[test]
    fn every_seal_uses_a_fresh_nonce() {
        let h = header(CipherAlgorithm::ChaCha20Poly1305);
        let header_bytes = h.encode().unwrap();
        let key = composite_key(&Credentials::new("pw")).unwrap();
        let body = PlainBody::new(b"same".to_vec());

        let first = seal(&body, &key, &h, &header_bytes).unwrap();
        let second = seal(&body, &key, &h, &header_bytes).unwrap();
        assert_ne!(&first[..NONCE_LEN], &second[..NONCE_LEN]);
    }
}
