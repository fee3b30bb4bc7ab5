//! Pairing engine: the connection registry and session table, and the
//! create/join/close/disconnect transitions across them.
//!
//! Everything here is synchronous. The hub owns one engine and feeds it one
//! command at a time, so the two tables never need a lock.

use std::collections::HashMap;

use serde_json::Value;
use tether_common::ConnectionId;
use tokio::sync::oneshot;

use crate::protocol::ServerFrame;

/// Outcome of a join: the host's auxiliary values, or why it failed.
pub type JoinReply = Result<Vec<Value>, PairingError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("session key already in use")]
    KeyTaken,

    #[error("connection already holds a role")]
    AlreadyPaired,

    #[error("no session with that key")]
    SessionNotFound,

    #[error("session already has a guest")]
    GuestSlotTaken,

    #[error("host connection is gone")]
    HostUnavailable,

    #[error("host rejected the join")]
    Rejected,

    #[error("host did not answer in time")]
    TimedOut,

    #[error("join cancelled")]
    Cancelled,

    #[error("no peer to deliver to")]
    NoPeer,

    #[error("unknown connection")]
    UnknownConnection,
}

/// Outbound side of the transport, addressed by connection id only.
pub trait Transport {
    /// Whether the connection can still receive frames.
    fn is_live(&self, conn: &ConnectionId) -> bool;

    /// Queue a frame for one connection. Undeliverable frames are dropped.
    fn send(&mut self, conn: &ConnectionId, frame: ServerFrame);
}

/// Role a connection plays in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// Per-connection pairing state. Sessions are referenced by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Idle,
    Joining(String),
    Host(String),
    Guest(String),
}

/// A join waiting on the host's decision. Holding one of these in the guest
/// slot is what keeps a second join out.
#[derive(Debug)]
struct PendingJoin {
    guest: ConnectionId,
    request_id: u64,
    reply: oneshot::Sender<JoinReply>,
}

#[derive(Debug)]
enum GuestSlot {
    Empty,
    Reserved(PendingJoin),
    Occupied(ConnectionId),
}

impl GuestSlot {
    fn occupant(&self) -> Option<&ConnectionId> {
        match self {
            GuestSlot::Occupied(conn) => Some(conn),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    key: String,
    host: ConnectionId,
    guest: GuestSlot,
}

impl Session {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn host(&self) -> &ConnectionId {
        &self.host
    }

    /// The established guest, if any. A reserved slot has no guest yet.
    pub fn guest(&self) -> Option<&ConnectionId> {
        self.guest.occupant()
    }
}

/// Deferred result of a join. Resolves when the host answers, the join
/// expires, or the host goes away.
#[derive(Debug)]
pub struct JoinTicket {
    pub key: String,
    pub request_id: u64,
    pub reply: oneshot::Receiver<JoinReply>,
}

#[derive(Debug, Default)]
pub struct PairingEngine {
    connections: HashMap<ConnectionId, Membership>,
    sessions: HashMap<String, Session>,
    next_request_id: u64,
}

impl PairingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly opened connection with no role.
    pub fn connect(&mut self, conn: ConnectionId) {
        self.connections.entry(conn).or_insert(Membership::Idle);
    }

    pub fn membership(&self, conn: &ConnectionId) -> Option<&Membership> {
        self.connections.get(conn)
    }

    pub fn session_exists(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Open a session under `key` with the caller as host.
    pub fn create_session(&mut self, key: &str, caller: &ConnectionId) -> Result<(), PairingError> {
        if self.sessions.contains_key(key) {
            return Err(PairingError::KeyTaken);
        }
        match self.connections.get(caller) {
            None => return Err(PairingError::UnknownConnection),
            Some(Membership::Idle) => {}
            Some(_) => return Err(PairingError::AlreadyPaired),
        }

        self.sessions.insert(
            key.to_string(),
            Session {
                key: key.to_string(),
                host: caller.clone(),
                guest: GuestSlot::Empty,
            },
        );
        self.connections
            .insert(caller.clone(), Membership::Host(key.to_string()));

        tracing::info!(session = %key, host = %caller, "Session created");
        Ok(())
    }

    /// Reserve the guest slot of `key` for the caller and ask the host to
    /// validate `passcode`.
    pub fn join_session(
        &mut self,
        key: &str,
        passcode: Value,
        caller: &ConnectionId,
        transport: &mut impl Transport,
    ) -> Result<JoinTicket, PairingError> {
        let session = self
            .sessions
            .get_mut(key)
            .ok_or(PairingError::SessionNotFound)?;
        if !matches!(session.guest, GuestSlot::Empty) {
            return Err(PairingError::GuestSlotTaken);
        }
        match self.connections.get(caller) {
            None => return Err(PairingError::UnknownConnection),
            Some(Membership::Idle) => {}
            Some(_) => return Err(PairingError::AlreadyPaired),
        }
        // Host gone but its disconnect not processed yet.
        if !transport.is_live(&session.host) {
            return Err(PairingError::HostUnavailable);
        }

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let (reply_tx, reply_rx) = oneshot::channel();

        session.guest = GuestSlot::Reserved(PendingJoin {
            guest: caller.clone(),
            request_id,
            reply: reply_tx,
        });
        self.connections
            .insert(caller.clone(), Membership::Joining(key.to_string()));

        transport.send(
            &session.host,
            ServerFrame::UserJoined {
                request_id,
                passcode,
            },
        );

        tracing::debug!(session = %key, guest = %caller, request_id, "Join awaiting host");
        Ok(JoinTicket {
            key: key.to_string(),
            request_id,
            reply: reply_rx,
        })
    }

    /// Apply the host's answer to a pending join. `aux` is `Some` on accept.
    pub fn resolve_join(
        &mut self,
        host: &ConnectionId,
        request_id: u64,
        aux: Option<Vec<Value>>,
        transport: &mut impl Transport,
    ) -> Result<(), PairingError> {
        let key = match self.connections.get(host) {
            Some(Membership::Host(key)) => key.clone(),
            Some(_) => return Err(PairingError::SessionNotFound),
            None => return Err(PairingError::UnknownConnection),
        };
        let session = self
            .sessions
            .get_mut(&key)
            .ok_or(PairingError::SessionNotFound)?;

        let pending = match std::mem::replace(&mut session.guest, GuestSlot::Empty) {
            GuestSlot::Reserved(pending) if pending.request_id == request_id => pending,
            other => {
                // Stale answer: the join already expired or was cancelled.
                // A host that accepted it must not be left expecting a guest.
                if aux.is_some() && other.occupant().is_none() {
                    transport.send(host, ServerFrame::UserLeft);
                }
                session.guest = other;
                return Err(PairingError::Cancelled);
            }
        };

        let guest = pending.guest;
        let Some(aux) = aux else {
            let _ = pending.reply.send(Err(PairingError::Rejected));
            if let Some(state) = self.connections.get_mut(&guest) {
                *state = Membership::Idle;
            }
            tracing::info!(session = %key, guest = %guest, "Join rejected by host");
            return Err(PairingError::Rejected);
        };

        if pending.reply.send(Ok(aux)).is_err() {
            // Nobody is waiting on the result any more.
            if let Some(state) = self.connections.get_mut(&guest) {
                *state = Membership::Idle;
            }
            transport.send(host, ServerFrame::UserLeft);
            return Err(PairingError::Cancelled);
        }

        session.guest = GuestSlot::Occupied(guest.clone());
        if let Some(state) = self.connections.get_mut(&guest) {
            *state = Membership::Guest(key.clone());
        }
        tracing::info!(session = %key, guest = %guest, "Guest joined");
        Ok(())
    }

    /// Fail a join that the host did not answer in time. Returns false when
    /// the join had already been settled.
    pub fn expire_join(&mut self, key: &str, request_id: u64) -> bool {
        self.release_reservation(key, |pending| pending.request_id == request_id, PairingError::TimedOut)
    }

    /// End the caller's current role. A no-op for idle connections.
    pub fn close_session(&mut self, caller: &ConnectionId, transport: &mut impl Transport) {
        let Some(membership) = self.connections.get(caller).cloned() else {
            return;
        };
        self.end_role(caller, membership, transport);
        if let Some(state) = self.connections.get_mut(caller) {
            *state = Membership::Idle;
        }
    }

    /// Terminal cleanup for a closed connection. Returns false when the
    /// connection was already gone.
    pub fn disconnect(&mut self, conn: &ConnectionId, transport: &mut impl Transport) -> bool {
        let Some(membership) = self.connections.remove(conn) else {
            return false;
        };
        self.end_role(conn, membership, transport);
        true
    }

    fn end_role(&mut self, conn: &ConnectionId, membership: Membership, transport: &mut impl Transport) {
        match membership {
            Membership::Idle => {}
            Membership::Joining(key) => {
                self.release_reservation(&key, |pending| &pending.guest == conn, PairingError::Cancelled);
            }
            Membership::Guest(key) => self.detach_guest(&key, conn, transport),
            Membership::Host(key) => self.teardown(&key, transport),
        }
    }

    fn release_reservation(
        &mut self,
        key: &str,
        matches: impl Fn(&PendingJoin) -> bool,
        reason: PairingError,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(key) else {
            return false;
        };
        let pending = match std::mem::replace(&mut session.guest, GuestSlot::Empty) {
            GuestSlot::Reserved(pending) if matches(&pending) => pending,
            other => {
                session.guest = other;
                return false;
            }
        };

        tracing::debug!(session = %key, guest = %pending.guest, %reason, "Join released");
        if let Some(state) = self.connections.get_mut(&pending.guest) {
            *state = Membership::Idle;
        }
        let _ = pending.reply.send(Err(reason));
        true
    }

    /// Guest leaves; the session stays open for the next join.
    fn detach_guest(&mut self, key: &str, guest: &ConnectionId, transport: &mut impl Transport) {
        let Some(session) = self.sessions.get_mut(key) else {
            return;
        };
        if session.guest.occupant() != Some(guest) {
            return;
        }
        session.guest = GuestSlot::Empty;
        transport.send(&session.host, ServerFrame::UserLeft);
        tracing::info!(session = %key, guest = %guest, "Guest left");
    }

    /// Host leaves; the session goes with it.
    fn teardown(&mut self, key: &str, transport: &mut impl Transport) {
        let Some(session) = self.sessions.remove(key) else {
            return;
        };
        match session.guest {
            GuestSlot::Empty => {}
            GuestSlot::Occupied(guest) => {
                transport.send(&guest, ServerFrame::ServerClosed);
                if let Some(state) = self.connections.get_mut(&guest) {
                    *state = Membership::Idle;
                }
            }
            GuestSlot::Reserved(pending) => {
                if let Some(state) = self.connections.get_mut(&pending.guest) {
                    *state = Membership::Idle;
                }
                let _ = pending.reply.send(Err(PairingError::HostUnavailable));
            }
        }
        tracing::info!(session = %key, host = %session.host, "Session closed");
    }

    /// The caller's session and the role it plays there.
    pub(crate) fn session_of(&self, caller: &ConnectionId) -> Option<(&Session, Role)> {
        let (key, role) = match self.connections.get(caller)? {
            Membership::Host(key) => (key, Role::Host),
            Membership::Guest(key) => (key, Role::Guest),
            Membership::Idle | Membership::Joining(_) => return None,
        };
        self.sessions.get(key).map(|session| (session, role))
    }
}
