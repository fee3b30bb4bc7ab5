//! Per-connection handler: register with the hub, then pump frames both ways
//! until the socket ends.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tether_common::ConnectionId;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::hub::HubHandle;
use crate::protocol::{ClientFrame, ServerFrame};

/// Accept WebSocket clients forever.
pub async fn accept_loop(listener: TcpListener, hub: HubHandle, outbound_buffer: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, hub, outbound_buffer).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

/// Handle a single WebSocket connection.
pub async fn handle_connection(
    ws: tokio_tungstenite::WebSocketStream<TcpStream>,
    addr: SocketAddr,
    hub: HubHandle,
    outbound_buffer: usize,
) {
    let conn = ConnectionId::new();
    let (mut sink, mut stream) = ws.split();

    // The hub holds the only sender; `rx` ends when the hub drops it.
    let (tx, mut rx) = mpsc::channel::<String>(outbound_buffer);
    if hub.connect(conn.clone(), tx).await.is_err() {
        tracing::warn!(peer = %addr, "Hub unavailable, closing connection");
        return;
    }

    tracing::info!(peer = %addr, conn = %conn, "Client connected");

    loop {
        tokio::select! {
            // Frames queued by the hub -> this client's WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client's WebSocket -> hub
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => {
                                if hub.frame(conn.clone(), frame).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::debug!(conn = %conn, error = %e, "Invalid frame");
                                let reply = ServerFrame::Error {
                                    message: format!("invalid frame: {e}"),
                                };
                                if sink.send(Message::Text(reply.to_json().into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(conn = %conn, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(conn = %conn, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // Cleanup runs however the loop ended.
    hub.disconnect(conn.clone()).await;
    tracing::info!(peer = %addr, conn = %conn, "Client disconnected");
}
