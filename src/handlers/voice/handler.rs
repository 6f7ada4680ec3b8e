//! Voice session WebSocket handler
//!
//! Owns the socket for one session: a sender task drains the outgoing route
//! channel, while the receive loop feeds the [`SessionController`] and
//! watches for pipeline events and idle connections.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::messages::{IncomingMessage, MessageRoute, OutgoingMessage, MAX_AUDIO_FRAME_SIZE};
use super::session::{spawn_session, SessionController};
use crate::errors::SessionError;
use crate::state::AppState;

/// Outgoing route channel depth per connection
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Maximum WebSocket frame size (base64 inflates audio by ~4/3)
const MAX_WS_FRAME_SIZE: usize = 2 * MAX_AUDIO_FRAME_SIZE;

/// How often the receive loop wakes to check for staleness
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// GET /ws - upgrade to a voice session
pub async fn voice_session_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_FRAME_SIZE)
        .on_upgrade(move |socket| handle_voice_socket(socket, state))
}

async fn handle_voice_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    info!(%session_id, "voice session established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let result = match route {
                MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("failed to serialize outgoing message: {e}");
                        continue;
                    }
                },
                MessageRoute::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if let Err(e) = result {
                error!("failed to send WebSocket message: {e}");
                break;
            }
        }
    });

    let (mut controller, mut events) = match spawn_session(app_state.clone(), message_tx.clone()) {
        Ok(session) => session,
        Err(e) => {
            error!(%session_id, "failed to start session: {e}");
            let _ = message_tx
                .send(MessageRoute::Outgoing(OutgoingMessage::Error {
                    message: format!("session setup failed: {e}"),
                }))
                .await;
            let _ = message_tx.send(MessageRoute::Close).await;
            drop(message_tx);
            let _ = sender_task.await;
            return;
        }
    };

    let idle_timeout = Duration::from_secs(app_state.config.session_idle_timeout_seconds);
    let mut last_activity = std::time::Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = std::time::Instant::now();
                match msg_result {
                    Some(Ok(msg)) => {
                        if !process_socket_message(msg, &mut controller, &message_tx).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%session_id, "WebSocket error: {e}");
                        break;
                    }
                    None => {
                        info!(%session_id, "connection closed by client");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Some(event) => controller.handle_event(event).await,
                    None => {
                        // Pipeline task ended; nothing left to drive.
                        warn!(%session_id, "recognition pipeline terminated");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => {
                if last_activity.elapsed() > idle_timeout {
                    warn!(
                        %session_id,
                        idle_secs = last_activity.elapsed().as_secs(),
                        "closing idle session"
                    );
                    let _ = message_tx
                        .send(MessageRoute::Outgoing(OutgoingMessage::Error {
                            message: "connection closed due to inactivity".to_string(),
                        }))
                        .await;
                    let _ = message_tx.send(MessageRoute::Close).await;
                    break;
                }
                debug!(%session_id, "idle check, session still active");
            }
        }
    }

    // Dropping the controller closes the chunk channel, which winds down the
    // pipeline, synthesis, and forwarder tasks in turn.
    let chunks_cut = controller.chunks_cut();
    drop(controller);
    sender_task.abort();
    info!(%session_id, chunks_cut, "voice session terminated");
}

/// Feed one socket message to the controller.
///
/// Returns false to terminate the connection.
async fn process_socket_message(
    msg: Message,
    controller: &mut SessionController,
    message_tx: &mpsc::Sender<MessageRoute>,
) -> bool {
    let result = match msg {
        Message::Text(text) => match serde_json::from_str::<IncomingMessage>(&text) {
            Ok(incoming) => controller.handle_message(incoming).await,
            Err(e) => Err(SessionError::Protocol(format!("invalid message: {e}"))),
        },
        Message::Binary(data) => controller.handle_binary(data.to_vec()),
        Message::Ping(_) | Message::Pong(_) => Ok(()),
        Message::Close(_) => {
            debug!("close frame received");
            return false;
        }
    };

    if let Err(e) = result {
        warn!("session error: {e}");
        let _ = message_tx
            .send(MessageRoute::Outgoing(OutgoingMessage::Error {
                message: e.to_string(),
            }))
            .await;
        // Protocol violations are reported but the session stays open;
        // transport failures end it.
        if matches!(e, SessionError::Transport(_)) {
            let _ = message_tx.send(MessageRoute::Close).await;
            return false;
        }
    }
    true
}
