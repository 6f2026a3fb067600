// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presence websocket.
//!
//! One task owns each socket and waits on the next frame, the heartbeat tick,
//! the read deadline and server shutdown. Every exit path saves the user
//! offline before the task ends.

use crate::error::AppError;
use crate::middleware::auth::{authenticate, bearer_token, subprotocol_token, AuthUser, BEARER_PROTOCOL};
use crate::services::presence::HEARTBEAT_INTERVAL;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, timeout, Instant};

pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_MESSAGE_SIZE: usize = 1 << 20;

const SUPPORTED_EVENTS: [&str; 4] = [
    "get_amount_online_users",
    "get_online_users_list",
    "ping",
    "pong",
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/ws/health", get(ws_health))
}

/// Upgrade after authenticating from the `Authorization` header or, for
/// browsers, the `Sec-WebSocket-Protocol` offer. A header token that fails
/// to verify falls through to the subprotocol token.
async fn ws_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let user = upgrade_identity(&state, &headers)?;

    let sockets = state.sockets.clone();
    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .protocols([BEARER_PROTOCOL])
        .on_upgrade(move |socket| {
            sockets.track_future(run_connection(state, user, socket))
        }))
}

fn upgrade_identity(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let header_err = match bearer_token(headers).map(|token| authenticate(state, token)) {
        Some(Ok(user)) => return Ok(user),
        Some(Err(e)) => Some(e),
        None => None,
    };
    match subprotocol_token(headers) {
        Some(token) => authenticate(state, token),
        None => Err(header_err
            .unwrap_or_else(|| AppError::Unauthorized("missing access token".to_string()))),
    }
}

async fn ws_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.presence.online_count().await {
        Ok(online_users) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "online_users": online_users,
                "total_connections": state.presence.open_connections(),
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Presence store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy"})),
            )
        }
    }
}

// ─── Connection task ─────────────────────────────────────────

#[derive(Deserialize)]
struct ClientFrame {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug)]
enum Exit {
    ClientClosed,
    ReadDeadline,
    Shutdown,
    Transport(String),
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

fn frame(kind: &str, data: Value) -> Message {
    Message::Text(json!({"type": kind, "data": data}).to_string().into())
}

fn error_frame(code: &str, message: &str) -> Message {
    frame("error", json!({"code": code, "message": message}))
}

async fn send(socket: &mut WebSocket, msg: Message) -> Result<(), Exit> {
    match timeout(WRITE_TIMEOUT, socket.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Exit::Transport(e.to_string())),
        Err(_) => Err(Exit::Transport("write timed out".to_string())),
    }
}

async fn run_connection(state: Arc<AppState>, user: AuthUser, mut socket: WebSocket) {
    let guard = match state.presence.connect(user.user_id, &user.email).await {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!(user_id = %user.user_id, error = %e, "Failed to mark user online");
            let _ = send(&mut socket, error_frame("INTERNAL_ERROR", "Failed to go online")).await;
            return;
        }
    };

    let exit = serve(&state, &user, &mut socket).await;
    match &exit {
        Exit::Transport(reason) => {
            tracing::warn!(user_id = %user.user_id, %reason, "Websocket closed on error")
        }
        other => tracing::info!(user_id = %user.user_id, exit = ?other, "Websocket closed"),
    }

    if let Err(e) = state.presence.disconnect(user.user_id, &user.email).await {
        tracing::error!(user_id = %user.user_id, error = %e, "Failed to mark user offline");
    }
    drop(guard);
}

async fn serve(state: &AppState, user: &AuthUser, socket: &mut WebSocket) -> Exit {
    let welcome = frame(
        "connection_established",
        json!({
            "user_id": user.user_id,
            "status": "online",
            "endpoint": "/ws",
            "message": "Connected to online status service",
            "supported_events": SUPPORTED_EVENTS,
            "ts": now_ts(),
        }),
    );
    if let Err(exit) = send(socket, welcome).await {
        return exit;
    }

    let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    let deadline = state.config.ws_read_deadline;
    let read_deadline = sleep(deadline);
    tokio::pin!(read_deadline);

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = send(socket, Message::Close(None)).await;
                return Exit::Shutdown;
            }
            _ = &mut read_deadline => {
                return Exit::ReadDeadline;
            }
            _ = heartbeat.tick() => {
                if let Err(exit) = send(socket, Message::Ping(Vec::new().into())).await {
                    return exit;
                }
                if let Err(e) = state.presence.heartbeat(user.user_id, &user.email).await {
                    tracing::warn!(user_id = %user.user_id, error = %e, "Presence refresh failed");
                }
            }
            inbound = socket.recv() => {
                let msg = match inbound {
                    None => return Exit::ClientClosed,
                    Some(Err(e)) => return Exit::Transport(e.to_string()),
                    Some(Ok(msg)) => msg,
                };
                read_deadline.as_mut().reset(Instant::now() + deadline);

                let reply = match msg {
                    Message::Text(text) => handle_text(state, user, text.as_str()).await,
                    Message::Binary(_) => Some(error_frame("INVALID_MESSAGE", "Invalid JSON format")),
                    Message::Pong(_) => {
                        touch(state, user).await;
                        None
                    }
                    Message::Ping(_) => None,
                    Message::Close(_) => return Exit::ClientClosed,
                };
                if let Some(reply) = reply {
                    if let Err(exit) = send(socket, reply).await {
                        return exit;
                    }
                }
            }
        }
    }
}

async fn touch(state: &AppState, user: &AuthUser) {
    if let Err(e) = state.presence.touch(user.user_id).await {
        tracing::warn!(user_id = %user.user_id, error = %e, "Failed to update last seen");
    }
}

async fn handle_text(state: &AppState, user: &AuthUser, text: &str) -> Option<Message> {
    let Ok(request) = serde_json::from_str::<ClientFrame>(text) else {
        return Some(error_frame("INVALID_MESSAGE", "Invalid JSON format"));
    };

    match request.kind.as_str() {
        "ping" => {
            touch(state, user).await;
            Some(frame("pong", json!({"ts": now_ts()})))
        }
        "pong" => {
            touch(state, user).await;
            None
        }
        "get_amount_online_users" => Some(match state.presence.online_count().await {
            Ok(count) => frame("amount_online_users", json!({"count": count, "ts": now_ts()})),
            Err(e) => {
                tracing::error!(error = %e, "Failed to count online users");
                error_frame("INTERNAL_ERROR", "Failed to get online users")
            }
        }),
        "get_online_users_list" => Some(match state.presence.online_users().await {
            Ok(users) => frame(
                "online_users_list",
                json!({"count": users.len(), "users": users, "ts": now_ts()}),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list online users");
                error_frame("INTERNAL_ERROR", "Failed to get online users")
            }
        }),
        other => {
            tracing::debug!(user_id = %user.user_id, kind = other, "Unsupported message type");
            Some(error_frame("UNKNOWN_TYPE", "Unsupported message type"))
        }
    }
}
