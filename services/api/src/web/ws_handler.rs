//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each client gets the current store on connect, can dispatch actions, and is
//! pushed every later state change.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn send(sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode server message: {:?}", e);
            return false;
        }
    };
    sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // Subscribe before reading the current store so no change falls in between.
    let mut changes = app_state.subscribe();
    let initial = ServerMessage::StateChanged {
        store: app_state.current().await,
    };
    if !send(&ws_sender, &initial).await {
        error!("Failed to send the initial store.");
        return;
    }

    // --- 1. Forward every state change to this client ---
    let token = CancellationToken::new();
    let forward_task = {
        let ws_sender = ws_sender.clone();
        let app_state = app_state.clone();
        let token = token.clone();
        tokio::spawn(async move {
            loop {
                let store = tokio::select! {
                    _ = token.cancelled() => break,
                    received = changes.recv() => match received {
                        Ok(store) => store,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Client fell behind by {} change(s); resending the latest store.", skipped);
                            app_state.current().await
                        }
                        Err(RecvError::Closed) => break,
                    },
                };
                if !send(&ws_sender, &ServerMessage::StateChanged { store }).await {
                    break;
                }
            }
        })
    };

    // --- 2. Main Message Loop ---
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Dispatch { action }) => {
                    app_state.dispatch(action).await;
                }
                Err(e) => {
                    warn!("Ignoring malformed client message: {}", e);
                    let reply = ServerMessage::Error {
                        message: format!("Could not read message: {e}"),
                    };
                    if !send(&ws_sender, &reply).await {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {:?}", e);
                break;
            }
        }
    }

    token.cancel();
    if let Err(e) = forward_task.await {
        error!("State forwarding task failed: {:?}", e);
    }
    info!("WebSocket connection closed.");
}
