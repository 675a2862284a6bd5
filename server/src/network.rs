//! WebSocket transport gateway.
//!
//! Accepts connections, performs the handshake, and runs one reader and one
//! writer task per socket. The gateway holds no game state: inbound text
//! frames are parsed into typed events and forwarded to the coordinator
//! channel; outbound events arrive on a per-connection channel and are
//! serialized to text frames. A malformed frame is logged and dropped and
//! affects only its own connection.

use crate::registry::ConnectionId;
use crate::session::Inbound;
use futures::{SinkExt, StreamExt};
use log::{error, info, warn};
use shared::{ClientEvent, ServerEvent};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Accept loop: assigns connection ids and spawns a handler per socket.
/// Runs until the process exits.
pub async fn run_gateway(listener: TcpListener, inbound_tx: mpsc::UnboundedSender<Inbound>) {
    let mut next_conn_id: ConnectionId = 1;

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let conn_id = next_conn_id;
                next_conn_id += 1;
                tokio::spawn(handle_connection(stream, addr, conn_id, inbound_tx.clone()));
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn_id: ConnectionId,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };
    info!("Connection {} accepted from {}", conn_id, addr);

    let (mut sink, mut source) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    if inbound_tx
        .send(Inbound::Connected {
            conn_id,
            sender: outbound_tx,
        })
        .is_err()
    {
        // Coordinator is gone; the server is shutting down.
        return;
    }

    // Writer: drain the coordinator's events into text frames.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    error!("Failed to serialize event for connection {}: {}", conn_id, e);
                    continue;
                }
            };
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Reader: parse frames into events until the peer goes away.
    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if inbound_tx
                        .send(Inbound::Event { conn_id, event })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Unparseable frame from connection {}: {}", conn_id, e);
                }
            },
            // tungstenite queues the pong reply itself; nothing to do here
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                warn!("Ignoring non-text frame from connection {}", conn_id);
            }
            Err(e) => {
                warn!("Error reading from connection {}: {}", conn_id, e);
                break;
            }
        }
    }

    let _ = inbound_tx.send(Inbound::Disconnected { conn_id });
    writer.abort();
}
