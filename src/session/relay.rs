// src/session/relay.rs
//! Completion / notification relay: caller side of the notification channel
//!
//! Correlates completions with the operations that caused them, finishes the
//! matching state transition, refreshes the property cache and queues the
//! events the caller will see. Unsolicited notifications go through the same
//! path and only produce an event when they change a cached value of an open
//! database.

use std::collections::BTreeMap;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::enums::ResultCode;
use crate::error::EngineError;
use crate::session::event::SessionEvent;
use crate::session::protocol::{Completion, EngineNotification, RequestId};
use crate::session::state::{Operation, SessionState};
use crate::session::SessionCore;

pub(crate) struct Relay {
    notifications: UnboundedReceiver<EngineNotification>,
    in_flight: BTreeMap<RequestId, Operation>,
    terminated: bool,
}

impl Relay {
    pub(crate) fn new(notifications: UnboundedReceiver<EngineNotification>) -> Self {
        Self {
            notifications,
            in_flight: BTreeMap::new(),
            terminated: false,
        }
    }

    pub(crate) fn track(&mut self, id: RequestId, operation: Operation) {
        self.in_flight.insert(id, operation);
    }

    pub(crate) fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Waits for the next notification and applies it
    pub(crate) async fn pump(&mut self, core: &mut SessionCore) {
        if self.terminated {
            return;
        }
        match self.notifications.recv().await {
            Some(notification) => self.apply(notification, core),
            None => self.terminate(core),
        }
    }

    /// Applies one notification if one is already waiting; true if anything happened
    pub(crate) fn pump_now(&mut self, core: &mut SessionCore) -> bool {
        if self.terminated {
            return false;
        }
        match self.notifications.try_recv() {
            Ok(notification) => {
                self.apply(notification, core);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.terminate(core);
                true
            }
        }
    }

    pub(crate) fn apply(&mut self, notification: EngineNotification, core: &mut SessionCore) {
        match notification {
            EngineNotification::Completed { id, outcome } => self.complete(id, outcome, core),
            EngineNotification::KeyDerivationRoundsChanged(_)
            | EngineNotification::CipherAlgorithmChanged(_)
                if core.machine.state() != SessionState::Open =>
            {
                debug!(state = %core.machine.state(), ?notification, "ignoring property report");
            }
            EngineNotification::KeyDerivationRoundsChanged(value) => {
                if core.properties.key_derivation_rounds.observe(value) {
                    core.events
                        .push_back(SessionEvent::KeyDerivationRoundsChanged(value));
                }
            }
            EngineNotification::CipherAlgorithmChanged(value) => {
                if core.properties.cipher_algorithm.observe(value) {
                    core.events.push_back(SessionEvent::CipherAlgorithmChanged(value));
                }
            }
            EngineNotification::DatabaseClosed { reason } => self.database_lost(reason, core),
        }
    }

    fn complete(
        &mut self,
        id: RequestId,
        outcome: Result<Completion, EngineError>,
        core: &mut SessionCore,
    ) {
        let Some(operation) = self.in_flight.remove(&id) else {
            // Orphaned by a forced closure; failures are still worth reporting
            match outcome {
                Ok(completion) => debug!(%id, ?completion, "dropping completion of untracked request"),
                Err(err) => {
                    warn!(%id, code = %err.code, "untracked request failed");
                    core.events.push_back(SessionEvent::error(err.code, err.message));
                }
            }
            return;
        };

        match outcome {
            Ok(completion) => self.succeeded(operation, completion, core),
            Err(err) => self.failed(operation, err, core),
        }
    }

    fn succeeded(&mut self, operation: Operation, completion: Completion, core: &mut SessionCore) {
        match (operation, completion) {
            (Operation::Open, Completion::Opened(properties))
            | (Operation::Create, Completion::Created(properties)) => {
                core.machine.finish(operation, true);
                core.database = core.pending_database.take().map(|mut database| {
                    database.database_type = properties.database_type;
                    database
                });

                let (rounds_changed, cipher_changed) = core.properties.observe(&properties);
                if rounds_changed {
                    core.events.push_back(SessionEvent::KeyDerivationRoundsChanged(
                        properties.key_derivation_rounds,
                    ));
                }
                if cipher_changed {
                    core.events.push_back(SessionEvent::CipherAlgorithmChanged(
                        properties.cipher_algorithm,
                    ));
                }

                info!(?operation, ?properties, "database ready");
                core.events.push_back(if operation == Operation::Open {
                    SessionEvent::DatabaseOpened
                } else {
                    SessionEvent::NewDatabaseCreated
                });
            }
            (Operation::Close, Completion::Closed) => {
                core.machine.finish(operation, true);
                core.clear_database();
                info!("database closed");
                core.events.push_back(SessionEvent::DatabaseClosed);
            }
            (Operation::ChangeCredentials, Completion::CredentialsChanged) => {
                core.machine.finish(operation, true);
                info!("database credentials changed");
                core.events.push_back(SessionEvent::CredentialsChanged);
            }
            (Operation::SetKeyDerivationRounds, Completion::KeyDerivationRoundsChanged(value)) => {
                if core.properties.key_derivation_rounds.confirm(value) {
                    core.events
                        .push_back(SessionEvent::KeyDerivationRoundsChanged(value));
                }
            }
            (Operation::SetCipherAlgorithm, Completion::CipherAlgorithmChanged(value)) => {
                if core.properties.cipher_algorithm.confirm(value) {
                    core.events.push_back(SessionEvent::CipherAlgorithmChanged(value));
                }
            }
            (operation, completion) => {
                error!(?operation, ?completion, "engine answered with a mismatched completion");
                let err = EngineError::new(
                    failure_code(operation),
                    format!("unexpected engine response to {operation}"),
                );
                self.failed(operation, err, core);
            }
        }
    }

    fn failed(&mut self, operation: Operation, err: EngineError, core: &mut SessionCore) {
        let mut code = err.code;
        match operation {
            Operation::Open | Operation::Create => {
                core.machine.finish(operation, false);
                core.pending_database = None;
            }
            Operation::Close => {
                core.machine.finish(operation, false);
                code = ResultCode::CloseFailed;
            }
            Operation::ChangeCredentials => {
                core.machine.finish(operation, false);
            }
            Operation::SetKeyDerivationRounds => core.properties.key_derivation_rounds.reject(),
            Operation::SetCipherAlgorithm => core.properties.cipher_algorithm.reject(),
        }
        warn!(?operation, %code, message = %err.message, "engine request failed");
        core.events.push_back(SessionEvent::error(code, err.message));
    }

    fn database_lost(&mut self, reason: String, core: &mut SessionCore) {
        match core.machine.state() {
            SessionState::Closed => {
                debug!(%reason, "engine reported a closure while already closed");
                return;
            }
            // The pending open or create still answers with its own outcome
            SessionState::Opening => {
                debug!(%reason, "engine reported a closure before anything was opened");
                return;
            }
            _ => {}
        }
        warn!(%reason, "storage engine closed the database");
        core.machine.force_closed();
        core.clear_database();
        core.pending_database = None;
        self.in_flight.clear();

        core.events.push_back(SessionEvent::DatabaseClosed);
        core.events.push_back(SessionEvent::error(
            ResultCode::NotOpened,
            format!("database closed by storage engine: {reason}"),
        ));
    }

    fn terminate(&mut self, core: &mut SessionCore) {
        error!("storage engine worker terminated");
        self.terminated = true;
        let was_closed = core.machine.state() == SessionState::Closed;
        core.machine.force_closed();
        core.clear_database();
        core.pending_database = None;
        self.in_flight.clear();

        if !was_closed {
            core.events.push_back(SessionEvent::DatabaseClosed);
        }
        core.events.push_back(SessionEvent::error(
            ResultCode::EngineTerminated,
            ResultCode::EngineTerminated.description(),
        ));
    }
}

/// Code reported when `operation` fails without a more specific one
fn failure_code(operation: Operation) -> ResultCode {
    match operation {
        Operation::Open => ResultCode::LoadError,
        Operation::Create => ResultCode::SaveError,
        Operation::Close => ResultCode::CloseFailed,
        Operation::ChangeCredentials => ResultCode::SetKeyError,
        Operation::SetKeyDerivationRounds | Operation::SetCipherAlgorithm => {
            ResultCode::SetKeyError
        }
    }
}
