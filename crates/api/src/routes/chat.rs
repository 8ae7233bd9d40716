use std::collections::HashSet;
use std::time::Duration;

use axum::Json;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Extension, Path, Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::time::interval;

use skillswap_domain::chat::{ChatMessage, MessageWindow};
use skillswap_domain::identity::ActorIdentity;

use crate::error::{ApiError, map_domain_error};
use crate::middleware::AuthContext;
use crate::observability;
use crate::routes::actor_identity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    since_ms: Option<i64>,
    limit: Option<usize>,
}

impl HistoryQuery {
    fn window(&self) -> MessageWindow {
        MessageWindow::new(self.since_ms, self.limit)
    }
}

pub async fn history(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let messages = state
        .chat_service()
        .history(&request_id, query.window())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    content: String,
}

/// HTTP fallback for clients without a socket. Persists and broadcasts
/// exactly like an inbound socket frame.
pub async fn send(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let actor = actor_identity(&state, &auth).await?;
    let message = persist_and_broadcast(&state, &actor, &request_id, &payload.content)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(message))
}

async fn persist_and_broadcast(
    state: &AppState,
    actor: &ActorIdentity,
    request_id: &str,
    content: &str,
) -> skillswap_domain::DomainResult<ChatMessage> {
    let message = state
        .chat_service()
        .send(&actor.user_id, &actor.name, request_id, content)
        .await?;
    // Persist first, then fan out: broadcast order equals receipt order.
    state.realtime.publish(request_id, message.clone()).await;
    Ok(message)
}

/// Subscribes before reading the backlog so a message landing between the
/// two reads shows up on at least one side; the socket loop drops the
/// overlap by message id.
pub(crate) async fn open_stream_session(
    state: &AppState,
    request_id: &str,
    window: MessageWindow,
) -> skillswap_domain::DomainResult<(
    Vec<ChatMessage>,
    tokio::sync::broadcast::Receiver<ChatMessage>,
)> {
    let receiver = state.realtime.subscribe(request_id).await;
    let backlog = state.chat_service().history(request_id, window).await?;
    Ok((backlog, receiver))
}

pub async fn stream(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    Extension(auth): Extension<AuthContext>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let actor = actor_identity(&state, &auth).await?;
    let (backlog, receiver) = open_stream_session(&state, &request_id, query.window())
        .await
        .map_err(map_domain_error)?;
    observability::register_chat_realtime_event("join");
    Ok(ws.on_upgrade(move |socket| async move {
        handle_chat_socket(socket, state, request_id, actor, backlog, receiver).await;
    }))
}

#[derive(Debug, Deserialize)]
struct IncomingFrame {
    content: String,
}

fn message_payload(message: &ChatMessage) -> String {
    json!({ "event_type": "message", "message": message }).to_string()
}

fn error_payload(detail: &str) -> String {
    json!({ "event_type": "error", "message": detail }).to_string()
}

async fn handle_chat_socket(
    socket: WebSocket,
    state: AppState,
    request_id: String,
    actor: ActorIdentity,
    mut backlog: Vec<ChatMessage>,
    mut receiver: tokio::sync::broadcast::Receiver<ChatMessage>,
) {
    let (mut sender, mut incoming) = socket.split();
    let mut seen = HashSet::new();

    for message in backlog.drain(..) {
        seen.insert(message.message_id.clone());
        if sender
            .send(Message::Text(message_payload(&message)))
            .await
            .is_err()
        {
            return;
        }
    }

    let mut heartbeat = interval(Duration::from_secs(15));
    loop {
        tokio::select! {
            event = receiver.recv() => {
                match event {
                    Ok(message) => {
                        if !seen.insert(message.message_id.clone()) {
                            continue;
                        }
                        if sender.send(Message::Text(message_payload(&message))).await.is_err() {
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        let _ = sender
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::AWAY,
                                reason: "stream closed".into(),
                            })))
                            .await;
                        return;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        // No redelivery protocol; the client is told to
                        // refetch history and reconnect.
                        observability::register_chat_realtime_event("lagged");
                        if sender
                            .send(Message::Text(error_payload("missed_messages")))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
            }
            frame = incoming.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let parsed: Result<IncomingFrame, _> = serde_json::from_str(&text);
                        let content = match parsed {
                            Ok(frame) => frame.content,
                            Err(_) => {
                                if sender
                                    .send(Message::Text(error_payload("malformed_frame")))
                                    .await
                                    .is_err()
                                {
                                    return;
                                }
                                continue;
                            }
                        };
                        if let Err(err) =
                            persist_and_broadcast(&state, &actor, &request_id, &content).await
                        {
                            tracing::warn!(error = %err, request_id, "chat send over socket failed");
                            let detail = match &err {
                                skillswap_domain::error::DomainError::Upstream(_) => {
                                    "internal_error".to_string()
                                }
                                other => other.to_string(),
                            };
                            if sender
                                .send(Message::Text(error_payload(&detail)))
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => {}
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    return;
                }
            }
        }
    }
}
