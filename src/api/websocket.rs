//! Websocket result channel.
//!
//! Clients send `{"event": "frame", "data": "<base64>"}` and receive exactly one
//! reply per message: `frame_return` with the verdict, `no_subject`, or
//! `frame_error`. Messages are handled one at a time and share no state.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use crate::api::dto::{ClientEvent, ErrorBody, ServerEvent};
use crate::api::state::AppState;
use crate::error::PostureError;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("websocket client connected");

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "websocket receive failed");
                break
            }
        };

        let reply = match message {
            Message::Text(text) => handle_text_message(&state, &text).await,
            Message::Binary(_) => ServerEvent::FrameError(ErrorBody::invalid_message("binary messages are not supported")),
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => break,
        };

        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize websocket reply");
                continue
            }
        };
        if sender.send(Message::Text(json)).await.is_err() {
            break
        }
    }

    tracing::debug!("websocket client disconnected");
}

/// handle_text_message answers a single client message.
///
/// # Arguments
/// * `state` - shared application state
/// * `text` - raw JSON text of the message
///
/// # Returns
/// * `ServerEvent` - always exactly one reply
pub async fn handle_text_message(state: &AppState, text: &str) -> ServerEvent {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => return ServerEvent::FrameError(ErrorBody::invalid_message(err.to_string())),
    };

    match event {
        ClientEvent::Frame(payload) => {
            let result = state
                .pipeline
                .classify_posture_with_timeout(payload.as_str(), state.request_timeout)
                .await;
            match result {
                Ok(verdict) => ServerEvent::FrameReturn(verdict),
                Err(err @ PostureError::NoSubjectDetected) => ServerEvent::NoSubject(ErrorBody::from(&err)),
                Err(err) => ServerEvent::FrameError(ErrorBody::from(&err)),
            }
        }
    }
}
