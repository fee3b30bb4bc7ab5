//! Hub actor: owns the pairing engine and every connection's outbound
//! channel, and applies commands strictly one at a time.

use std::collections::HashMap;
use std::time::Duration;

use tether_common::{ConnectionId, TetherError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

use crate::protocol::{ClientFrame, ServerFrame};
use crate::session::{JoinReply, JoinTicket, PairingEngine, PairingError, Transport};

const COMMAND_BUFFER: usize = 1024;

pub enum HubCommand {
    Connect {
        conn: ConnectionId,
        tx: mpsc::Sender<String>,
    },
    Disconnect {
        conn: ConnectionId,
    },
    Frame {
        conn: ConnectionId,
        frame: ClientFrame,
    },
    ExpireJoin {
        key: String,
        request_id: u64,
    },
    SessionExists {
        key: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Handle to the hub. Cheap to clone.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Register a new connection and the channel its frames go out on.
    pub async fn connect(&self, conn: ConnectionId, tx: mpsc::Sender<String>) -> Result<(), TetherError> {
        self.send(HubCommand::Connect { conn, tx }).await
    }

    pub async fn disconnect(&self, conn: ConnectionId) {
        if self.send(HubCommand::Disconnect { conn }).await.is_err() {
            tracing::debug!("Hub gone before disconnect");
        }
    }

    pub async fn frame(&self, conn: ConnectionId, frame: ClientFrame) -> Result<(), TetherError> {
        self.send(HubCommand::Frame { conn, frame }).await
    }

    pub async fn session_exists(&self, key: &str) -> Result<bool, TetherError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(HubCommand::SessionExists {
            key: key.to_string(),
            reply,
        })
        .await?;
        reply_rx.await.map_err(|_| TetherError::HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), TetherError> {
        self.tx.send(command).await.map_err(|_| TetherError::HubClosed)
    }
}

/// Outbound channels by connection id.
#[derive(Default)]
pub struct Peers {
    senders: HashMap<ConnectionId, mpsc::Sender<String>>,
}

impl Transport for Peers {
    fn is_live(&self, conn: &ConnectionId) -> bool {
        self.senders.get(conn).is_some_and(|tx| !tx.is_closed())
    }

    fn send(&mut self, conn: &ConnectionId, frame: ServerFrame) {
        let Some(tx) = self.senders.get(conn) else {
            tracing::trace!(conn = %conn, "No channel for connection, dropping frame");
            return;
        };
        match tx.try_send(frame.to_json()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn = %conn, "Outbound buffer full, dropping frame");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(conn = %conn, "Connection closed, dropping frame");
            }
        }
    }
}

/// A join whose ticket the hub is holding until it settles.
struct AwaitingJoin {
    guest: ConnectionId,
    seq: u64,
    ticket: JoinTicket,
}

pub struct Hub {
    engine: PairingEngine,
    peers: Peers,
    awaiting: Vec<AwaitingJoin>,
    join_timeout: Duration,
    self_tx: mpsc::WeakSender<HubCommand>,
}

/// Start the hub task and return its handle. The task ends once every
/// handle is dropped.
pub fn spawn(join_timeout: Duration) -> HubHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let hub = Hub {
        engine: PairingEngine::new(),
        peers: Peers::default(),
        awaiting: Vec::new(),
        join_timeout,
        self_tx: tx.downgrade(),
    };
    tokio::spawn(hub.run(rx));
    HubHandle { tx }
}

impl Hub {
    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
            self.settle_joins();
        }
        tracing::debug!("Hub stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { conn, tx } => {
                self.peers.senders.insert(conn.clone(), tx);
                self.engine.connect(conn);
            }
            HubCommand::Disconnect { conn } => {
                let membership = self.engine.membership(&conn).cloned();
                self.engine.disconnect(&conn, &mut self.peers);
                self.peers.senders.remove(&conn);
                tracing::debug!(
                    conn = %conn,
                    ?membership,
                    sessions = self.engine.session_count(),
                    connections = self.engine.connection_count(),
                    "Connection cleaned up"
                );
            }
            HubCommand::Frame { conn, frame } => self.handle_frame(conn, frame),
            HubCommand::ExpireJoin { key, request_id } => {
                if self.engine.expire_join(&key, request_id) {
                    tracing::info!(session = %key, request_id, "Join timed out");
                }
            }
            HubCommand::SessionExists { key, reply } => {
                let _ = reply.send(self.engine.session_exists(&key));
            }
        }
    }

    fn handle_frame(&mut self, conn: ConnectionId, frame: ClientFrame) {
        match frame {
            ClientFrame::CreateSession { seq, key } => {
                let result = self.engine.create_session(&key, &conn);
                if let Err(e) = &result {
                    tracing::debug!(conn = %conn, session = %key, error = %e, "Create refused");
                }
                self.peers.send(&conn, ServerFrame::ack(seq, result.is_ok()));
            }
            ClientFrame::CloseSession { seq } => {
                self.engine.close_session(&conn, &mut self.peers);
                self.peers.send(&conn, ServerFrame::ack(seq, true));
            }
            ClientFrame::JoinSession { seq, key, passcode } => {
                match self.engine.join_session(&key, passcode, &conn, &mut self.peers) {
                    Ok(ticket) => self.await_join(conn, seq, ticket),
                    Err(e) => {
                        tracing::debug!(conn = %conn, session = %key, error = %e, "Join refused");
                        self.peers.send(&conn, ServerFrame::ack(seq, false));
                    }
                }
            }
            ClientFrame::JoinDecision {
                request_id,
                accepted,
                aux,
            } => {
                let aux = accepted.then_some(aux);
                if let Err(e) = self.engine.resolve_join(&conn, request_id, aux, &mut self.peers) {
                    tracing::debug!(conn = %conn, request_id, error = %e, "Join decision not applied");
                }
            }
            ClientFrame::Event { event, args } => {
                if let Err(e) = self.engine.relay(event, args, &conn, &mut self.peers) {
                    tracing::trace!(conn = %conn, ?event, error = %e, "Event dropped");
                }
            }
            ClientFrame::Ping => self.peers.send(&conn, ServerFrame::Pong),
        }
    }

    /// Hold the ticket and arm its timeout.
    fn await_join(&mut self, guest: ConnectionId, seq: u64, ticket: JoinTicket) {
        let hub = self.self_tx.clone();
        let key = ticket.key.clone();
        let request_id = ticket.request_id;
        let timeout = self.join_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(hub) = hub.upgrade() {
                let _ = hub.send(HubCommand::ExpireJoin { key, request_id }).await;
            }
        });

        self.awaiting.push(AwaitingJoin { guest, seq, ticket });
    }

    /// Acknowledge every join that settled during the last command. Runs in
    /// the same step as the settling command, so the guest sees its ack
    /// before any event relayed afterwards.
    fn settle_joins(&mut self) {
        let peers = &mut self.peers;
        self.awaiting.retain_mut(|pending| {
            let outcome: JoinReply = match pending.ticket.reply.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Closed) => Err(PairingError::Cancelled),
            };

            let frame = match outcome {
                Ok(aux) => ServerFrame::Ack {
                    seq: pending.seq,
                    ok: true,
                    aux,
                },
                Err(e) => {
                    tracing::debug!(
                        conn = %pending.guest,
                        session = %pending.ticket.key,
                        error = %e,
                        "Join failed"
                    );
                    ServerFrame::ack(pending.seq, false)
                }
            };
            peers.send(&pending.guest, frame);
            false
        });
    }
}
