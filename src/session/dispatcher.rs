// src/session/dispatcher.rs
//! Request dispatcher: caller side of the request channel

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::error::SessionError;
use crate::session::protocol::{EngineRequest, Envelope, RequestId};

pub(crate) struct Dispatcher {
    requests: UnboundedSender<Envelope>,
    next_id: u64,
}

impl Dispatcher {
    pub(crate) fn new(requests: UnboundedSender<Envelope>) -> Self {
        Self {
            requests,
            next_id: 1,
        }
    }

    /// Forwards a request that expects a completion
    ///
    /// The request, credentials included, is moved into the channel. If the
    /// worker is gone the request is dropped here, zeroizing its secrets.
    pub(crate) fn submit(&mut self, request: EngineRequest) -> Result<RequestId, SessionError> {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        debug!(%id, operation = ?request.operation(), "dispatching request");
        self.send(Envelope {
            id: Some(id),
            request,
        })?;
        Ok(id)
    }

    /// Forwards a fire-and-forget request
    pub(crate) fn post(&self, request: EngineRequest) -> Result<(), SessionError> {
        debug!(?request, "posting request");
        self.send(Envelope { id: None, request })
    }

    fn send(&self, envelope: Envelope) -> Result<(), SessionError> {
        self.requests.send(envelope).map_err(|_| {
            error!("storage engine worker is gone, request dropped");
            SessionError::EngineTerminated
        })
    }
}
