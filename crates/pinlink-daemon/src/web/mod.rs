//! HTTP and WebSocket API for browser hosts.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pinlink_proto::{Command, Message, Reading};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::state::{AppState, BoardSnapshot};

/// Body for input injection.
#[derive(Deserialize)]
struct InputBody {
    value: i64,
}

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/command", post(command))
        .route("/pins/:pin/input", post(pin_input))
        .route("/ws", get(ws_upgrade))
        // Sketches are served from other origins
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /status - Board snapshot
async fn status(State(state): State<Arc<AppState>>) -> Json<BoardSnapshot> {
    Json(state.snapshot())
}

/// POST /command - Dispatch a command message, reply with readings
async fn command(
    State(state): State<Arc<AppState>>,
    Json(msg): Json<Message<Command>>,
) -> Json<Message<Reading>> {
    debug!("HTTP: {} commands", msg.data.len());
    Json(Message::new(state.handle_message(&msg)))
}

/// POST /pins/:pin/input - Simulate an input signal
async fn pin_input(
    State(state): State<Arc<AppState>>,
    Path(pin): Path<u8>,
    Json(body): Json<InputBody>,
) -> Response {
    if state.inject_input(pin, body.value) {
        debug!("HTTP: pin {} input {}", pin, body.value);
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            format!("Board has no pin {} ({} pins)", pin, state.pin_count()),
        )
            .into_response()
    }
}

/// GET /ws - WebSocket session
async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

async fn ws_session(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket session opened");
    let mut readings = state.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(WsMessage::Text(text))) => match state.handle_line(&text) {
                    Ok(replies) if !replies.is_empty() => {
                        if send(&mut socket, &Message::new(replies)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!("WebSocket: {:#}", e),
                },
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
            },
            msg = readings.recv() => match msg {
                Ok(msg) => {
                    if send(&mut socket, &msg).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket fell behind, skipped {} reading batches", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("WebSocket session closed");
}

async fn send(socket: &mut WebSocket, msg: &Message<Reading>) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(WsMessage::Text(text)).await
}
