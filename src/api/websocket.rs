use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};

use super::state::AppState;
use crate::models::RecordingStatus;

/// Requests a client may send over the socket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
    Status,
}

/// Direct answers, sent alongside the recorder event feed
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Reply {
    Pong,
    Status { status: RecordingStatus },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("Event stream requested by {}", client_id);
    ws.on_upgrade(move |socket| serve_events(socket, client_id, state))
}

async fn serve_events(socket: WebSocket, client_id: String, state: Arc<AppState>) {
    let mut events = state.attach(&client_id).await;
    let (mut sink, mut stream) = socket.split();
    let (reply_tx, mut replies) = mpsc::channel::<Reply>(8);

    let forward_state = Arc::clone(&state);
    let forward_id = client_id.clone();
    let mut forward = tokio::spawn(async move {
        loop {
            let (payload, is_event) = tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => (serde_json::to_string(&event), true),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("{} fell behind, {} events dropped", forward_id, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(reply) = replies.recv() => (serde_json::to_string(&reply), false),
            };

            let Ok(json) = payload else { continue };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
            if is_event {
                forward_state.mark_forwarded(&forward_id);
            }
        }
    });

    let listen_state = Arc::clone(&state);
    let mut listen = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            let Message::Text(text) = message else { continue };
            let reply = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => Reply::Pong,
                Ok(ClientMessage::Status) => Reply::Status {
                    status: listen_state.recorder.status().await,
                },
                Err(e) => {
                    tracing::debug!("Ignoring client message: {}", e);
                    continue;
                }
            };
            if reply_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    // Either side ending closes the stream
    tokio::select! {
        _ = &mut forward => listen.abort(),
        _ = &mut listen => forward.abort(),
    }

    state.detach(&client_id);
    tracing::info!("Event stream closed for {}", client_id);
}
