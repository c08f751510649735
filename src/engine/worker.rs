// src/engine/worker.rs
//! Worker thread driving a [`StorageEngine`]
//!
//! Requests are executed strictly in arrival order. The loop ends when the
//! session drops its request sender.

use std::io;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use super::{Notifier, StorageEngine};
use crate::error::EngineResult;
use crate::session::{Completion, EngineRequest, Envelope};

pub(crate) const WORKER_THREAD_NAME: &str = "storage-engine";

pub(crate) fn spawn<E: StorageEngine>(
    mut engine: E,
    mut requests: UnboundedReceiver<Envelope>,
    notifier: Notifier,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.into())
        .spawn(move || {
            engine.attach(notifier.clone());
            debug!("storage engine worker started");

            while let Some(Envelope { id, request }) = requests.blocking_recv() {
                let operation = request.operation();
                let outcome = execute(&mut engine, request);
                match (id, outcome) {
                    (Some(id), Some(outcome)) => {
                        debug!(%id, ?operation, ok = outcome.is_ok(), "request finished");
                        notifier.complete(id, outcome);
                    }
                    (None, Some(Err(err))) => {
                        warn!(?operation, %err, "unanswered request failed");
                    }
                    _ => {}
                }
            }

            // Dropping the engine releases whatever it still holds
            drop(engine);
            info!("storage engine worker stopped");
        })
}

/// Runs one request; `None` for fire-and-forget requests
fn execute<E: StorageEngine>(
    engine: &mut E,
    request: EngineRequest,
) -> Option<EngineResult<Completion>> {
    let outcome = match request {
        EngineRequest::Open {
            path,
            credentials,
            read_only,
            database_type,
        } => engine
            .open_database(&path, &credentials, read_only, database_type)
            .map(Completion::Opened),
        EngineRequest::Create {
            path,
            credentials,
            database_type,
            cipher_algorithm,
            key_derivation_rounds,
        } => engine
            .create_new_database(
                &path,
                &credentials,
                database_type,
                cipher_algorithm,
                key_derivation_rounds,
            )
            .map(Completion::Created),
        EngineRequest::Close => engine.close_database().map(|()| Completion::Closed),
        EngineRequest::ChangeCredentials { credentials } => engine
            .change_credentials(&credentials)
            .map(|()| Completion::CredentialsChanged),
        EngineRequest::SetKeyDerivationRounds(rounds) => engine
            .change_key_derivation_rounds(rounds)
            .map(Completion::KeyDerivationRoundsChanged),
        EngineRequest::SetCipherAlgorithm(cipher_algorithm) => engine
            .change_cipher_algorithm(cipher_algorithm)
            .map(Completion::CipherAlgorithmChanged),
        EngineRequest::ApplySetting(setting) => {
            engine.apply_setting(setting);
            return None;
        }
    };
    Some(outcome)
}
