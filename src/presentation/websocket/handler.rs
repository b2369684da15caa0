//! Chat Stream Handler
//!
//! `GET /api/v1/chats/{chat_id}/stream` upgrades to a WebSocket that carries
//! every message posted to the chat from the moment of connection. The
//! listener is registered before the upgrade completes, so nothing posted
//! after a successful membership check is missed.

use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message as WsMessage, WebSocket},
        Extension, Path, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::time::interval;

use super::messages::{ClientFrame, HelloPayload, OpCode, StreamFrame};
use super::session::StreamSession;
use crate::application::dto::response::MessageResponse;
use crate::infrastructure::realtime::Subscription;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::parse_id;
use crate::startup::AppState;

/// Grace period on top of the heartbeat interval before a silent client is dropped
const HEARTBEAT_GRACE: Duration = Duration::from_secs(10);

/// WebSocket upgrade handler
///
/// Membership is checked before the upgrade headers, so a non-member gets
/// 404 whether or not the request is a valid upgrade.
pub async fn stream_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    state.assembly.ensure_readable(auth.user_id, chat_id).await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let subscription = state.registry.register(chat_id, auth.user_id);
    let heartbeat_interval_ms = state.settings.websocket.heartbeat_interval_ms;

    Ok(ws
        .max_message_size(state.settings.websocket.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, subscription, heartbeat_interval_ms)))
}

/// Pump a subscription into the socket until either side goes away
async fn handle_socket(socket: WebSocket, mut subscription: Subscription, heartbeat_interval_ms: u64) {
    let mut session = StreamSession::new(subscription.user_id(), subscription.chat_id());
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(
        user_id = %session.user_id,
        chat_id = %session.chat_id,
        "Stream opened"
    );

    let hello = StreamFrame::hello(HelloPayload {
        heartbeat_interval: heartbeat_interval_ms,
        chat_id: session.chat_id.to_string(),
    });
    if let Err(e) = send_frame(&mut sender, &hello).await {
        tracing::debug!(error = %e, "Failed to send Hello");
        return;
    }

    let timeout = Duration::from_millis(heartbeat_interval_ms) + HEARTBEAT_GRACE;
    let mut heartbeat_check = interval(timeout);
    heartbeat_check.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            message = subscription.recv() => {
                let Some(message) = message else {
                    tracing::info!(
                        user_id = %session.user_id,
                        chat_id = %session.chat_id,
                        "Listener closed by registry"
                    );
                    break;
                };
                let frame = StreamFrame::message_create(
                    MessageResponse::from(message.as_ref()),
                    session.next_sequence(),
                );
                if send_frame(&mut sender, &frame).await.is_err() {
                    break;
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        if handle_client_frame(text.as_str(), &mut session, &mut sender).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket error");
                        break;
                    }
                    // Pong is handled automatically by axum
                    Some(Ok(_)) => {}
                }
            }

            _ = heartbeat_check.tick() => {
                if !session.is_alive(timeout) {
                    tracing::info!(
                        user_id = %session.user_id,
                        chat_id = %session.chat_id,
                        "Heartbeat timeout, closing stream"
                    );
                    break;
                }
            }
        }
    }

    let _ = sender.close().await;
    drop(subscription);

    tracing::info!(
        user_id = %session.user_id,
        chat_id = %session.chat_id,
        "Stream closed"
    );
}

/// React to a client frame. Unknown or malformed frames are ignored.
async fn handle_client_frame(
    text: &str,
    session: &mut StreamSession,
    sender: &mut SplitSink<WebSocket, WsMessage>,
) -> Result<(), axum::Error> {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed frame");
            return Ok(());
        }
    };

    match OpCode::from_u8(frame.op) {
        Some(OpCode::Heartbeat) => {
            session.heartbeat();
            send_frame(sender, &StreamFrame::heartbeat_ack()).await
        }
        _ => {
            tracing::debug!(op = frame.op, "Ignoring unexpected opcode");
            Ok(())
        }
    }
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, WsMessage>,
    frame: &StreamFrame,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sender.send(WsMessage::Text(text.into())).await
}
