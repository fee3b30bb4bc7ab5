//! Relay router: forwards events between the two ends of a session.

use serde_json::Value;
use tether_common::ConnectionId;

use crate::protocol::{Delivery, EventName, ServerFrame};
use crate::session::{PairingEngine, PairingError, Role, Transport};

impl PairingEngine {
    /// Forward an event using the delivery rule for its name.
    pub fn relay(
        &self,
        event: EventName,
        args: Vec<Value>,
        caller: &ConnectionId,
        transport: &mut impl Transport,
    ) -> Result<(), PairingError> {
        match event.delivery() {
            Delivery::Forward => self.forward(event, args, caller, transport),
            Delivery::Peered => self.forward_if_peered(event, args, caller, transport),
        }
    }

    /// Send to the caller's peer, if it has one.
    pub fn forward(
        &self,
        event: EventName,
        args: Vec<Value>,
        caller: &ConnectionId,
        transport: &mut impl Transport,
    ) -> Result<(), PairingError> {
        let (session, role) = self.session_of(caller).ok_or(PairingError::NoPeer)?;
        let peer = match role {
            Role::Host => session.guest().ok_or(PairingError::NoPeer)?,
            Role::Guest => session.host(),
        };
        deliver(peer, event, args, transport)
    }

    /// Like [`forward`](Self::forward), but the caller must be one end of an
    /// established session and the peer must be the other end.
    pub fn forward_if_peered(
        &self,
        event: EventName,
        args: Vec<Value>,
        caller: &ConnectionId,
        transport: &mut impl Transport,
    ) -> Result<(), PairingError> {
        let (session, role) = self.session_of(caller).ok_or(PairingError::NoPeer)?;
        let guest = session.guest().ok_or(PairingError::NoPeer)?;
        let host = session.host();

        let (me, peer) = match role {
            Role::Host => (host, guest),
            Role::Guest => (guest, host),
        };
        if me != caller || peer == caller {
            tracing::warn!(session = %session.key(), conn = %caller, "Role bookkeeping mismatch, dropping event");
            return Err(PairingError::NoPeer);
        }
        deliver(peer, event, args, transport)
    }
}

fn deliver(
    peer: &ConnectionId,
    event: EventName,
    args: Vec<Value>,
    transport: &mut impl Transport,
) -> Result<(), PairingError> {
    if !transport.is_live(peer) {
        return Err(PairingError::NoPeer);
    }
    transport.send(peer, ServerFrame::Event { event, args });
    Ok(())
}
