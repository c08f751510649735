// src/session/state.rs
//! Session state machine
//!
//! Gates every request on the current state and performs the caller-side
//! transition synchronously, before anything is sent to the worker. A request
//! that is not legal from the current state is rejected here and never
//! forwarded.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
    ChangingCredentials,
}

impl SessionState {
    /// The legal edge set of the session lifecycle
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Closed, Opening)
                | (Opening, Open)
                | (Opening, Closed)
                | (Open, Closing)
                | (Closing, Closed)
                | (Closing, Open)
                | (Open, ChangingCredentials)
                | (ChangingCredentials, Open)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Closed => "closed",
            SessionState::Opening => "opening",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::ChangingCredentials => "changing credentials",
        };
        f.write_str(name)
    }
}

/// Tag of an operation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Create,
    Close,
    ChangeCredentials,
    SetKeyDerivationRounds,
    SetCipherAlgorithm,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Create => "create",
            Operation::Close => "close",
            Operation::ChangeCredentials => "change credentials",
            Operation::SetKeyDerivationRounds => "set key derivation rounds",
            Operation::SetCipherAlgorithm => "set cipher algorithm",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct StateMachine {
    state: SessionState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Checks whether `operation` may start from the current state
    ///
    /// Returns the state the operation would move to, or `None` for property
    /// setters, which leave the state alone.
    pub fn check(&self, operation: Operation) -> Result<Option<SessionState>, SessionError> {
        let state = self.state;
        let next = match (operation, state) {
            (Operation::Open | Operation::Create, SessionState::Closed) => SessionState::Opening,
            (Operation::Open | Operation::Create, _) => {
                return Err(SessionError::AlreadyOpen { state })
            }

            (Operation::Close, SessionState::Open) => SessionState::Closing,
            (Operation::Close, SessionState::Closed) => return Err(SessionError::AlreadyClosed),

            (Operation::ChangeCredentials, SessionState::Open) => {
                SessionState::ChangingCredentials
            }
            (Operation::SetKeyDerivationRounds | Operation::SetCipherAlgorithm, SessionState::Open) => {
                return Ok(None)
            }

            (_, SessionState::Closed) => return Err(SessionError::NotOpened { state }),
            (operation, state) => return Err(SessionError::Busy { operation, state }),
        };
        Ok(Some(next))
    }

    /// Accepts `operation` from the current state and performs its entry transition
    pub fn begin(&mut self, operation: Operation) -> Result<(), SessionError> {
        if let Some(next) = self.check(operation)? {
            self.move_to(next);
        }
        Ok(())
    }

    /// Applies the exit transition of `operation` once its outcome is known
    ///
    /// Returns `false` when the machine is not in the state `operation` left
    /// it in (for example after a forced closure); nothing changes then.
    pub fn finish(&mut self, operation: Operation, succeeded: bool) -> bool {
        let next = match (operation, self.state, succeeded) {
            (Operation::Open | Operation::Create, SessionState::Opening, true) => SessionState::Open,
            (Operation::Open | Operation::Create, SessionState::Opening, false) => {
                SessionState::Closed
            }
            (Operation::Close, SessionState::Closing, true) => SessionState::Closed,
            (Operation::Close, SessionState::Closing, false) => SessionState::Open,
            (Operation::ChangeCredentials, SessionState::ChangingCredentials, _) => {
                SessionState::Open
            }
            (Operation::SetKeyDerivationRounds | Operation::SetCipherAlgorithm, SessionState::Open, _) => {
                return true
            }
            _ => return false,
        };
        self.move_to(next);
        true
    }

    /// Unconditionally returns to `Closed` (engine-initiated closure)
    pub fn force_closed(&mut self) {
        if self.state != SessionState::Closed {
            debug!(from = %self.state, "forcing session closed");
            self.state = SessionState::Closed;
        }
    }

    fn move_to(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal session transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "session transition");
        self.state = next;
    }
}
