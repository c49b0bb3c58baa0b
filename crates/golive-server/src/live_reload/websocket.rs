//! WebSocket handler for live reload.
//!
//! Each connection registers with the [`Broadcaster`] and forwards reload
//! signals to the browser as `"reload"` text frames.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::Response;

use super::broadcaster::{Broadcaster, ClientMessage};

/// Text payload understood by the injected client.
pub(crate) const RELOAD_PAYLOAD: &str = "reload";

/// Accept a WebSocket upgrade for live reload.
pub(crate) fn ws_handler(ws: WebSocketUpgrade, broadcaster: Arc<Broadcaster>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let Some((id, mut messages)) = broadcaster.register() else {
        // Server is shutting down
        let _ = socket.send(close_message()).await;
        return;
    };

    loop {
        tokio::select! {
            // Forward broadcaster messages to the client
            message = messages.recv() => {
                match message {
                    Some(ClientMessage::Reload) => {
                        if socket.send(Message::Text(RELOAD_PAYLOAD.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(ClientMessage::Close) | None => {
                        let _ = socket.send(close_message()).await;
                        break;
                    }
                }
            }
            // Client messages are ignored; close or error ends the connection
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    broadcaster.unregister(id);
}

fn close_message() -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::AWAY,
        reason: "Live server stopped".into(),
    }))
}
