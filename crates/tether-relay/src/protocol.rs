//! Relay wire protocol. Every WebSocket text frame is one JSON object tagged
//! by `type`. Event arguments are forwarded as opaque JSON values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events the relay forwards between paired connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventName {
    KeyBoardEvent,
    MouseLeftDown,
    MouseLeftUp,
    MouseRightDown,
    MouseRightUp,
    File,
    ScreenShot,
}

/// How strictly an event's sender is checked before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Input events: sent to whichever peer the caller currently has.
    Forward,
    /// Payload events: the session must be fully established.
    Peered,
}

impl EventName {
    pub fn delivery(self) -> Delivery {
        match self {
            EventName::File | EventName::ScreenShot => Delivery::Peered,
            _ => Delivery::Forward,
        }
    }
}

/// Frames received from a connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "create_session")]
    CreateSession { seq: u64, key: String },

    #[serde(rename = "close_session")]
    CloseSession { seq: u64 },

    #[serde(rename = "join_session")]
    JoinSession {
        seq: u64,
        key: String,
        /// Opaque to the relay; the host decides what counts as valid.
        #[serde(default)]
        passcode: Value,
    },

    /// Host's answer to a `user_joined` request.
    #[serde(rename = "join_decision")]
    JoinDecision {
        request_id: u64,
        accepted: bool,
        #[serde(default)]
        aux: Vec<Value>,
    },

    #[serde(rename = "event")]
    Event {
        event: EventName,
        #[serde(default)]
        args: Vec<Value>,
    },

    #[serde(rename = "ping")]
    Ping,
}

/// Frames the relay sends to a connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Answer to a request frame carrying `seq`.
    #[serde(rename = "ack")]
    Ack {
        seq: u64,
        ok: bool,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        aux: Vec<Value>,
    },

    /// Sent to a host: a guest wants in. Answer with `join_decision`.
    #[serde(rename = "user_joined")]
    UserJoined { request_id: u64, passcode: Value },

    #[serde(rename = "user_left")]
    UserLeft,

    #[serde(rename = "server_closed")]
    ServerClosed,

    #[serde(rename = "event")]
    Event { event: EventName, args: Vec<Value> },

    #[serde(rename = "pong")]
    Pong,

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerFrame {
    pub fn ack(seq: u64, ok: bool) -> Self {
        ServerFrame::Ack {
            seq,
            ok,
            aux: Vec::new(),
        }
    }

    pub fn to_json(&self) -> String {
        // Every variant holds only strings, numbers, and JSON values.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!("{{\"type\":\"error\",\"message\":\"encode failed: {e}\"}}")
        })
    }
}
