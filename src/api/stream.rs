//! `GET /v1/metrics/stream` - periodic metrics over a WebSocket.
//!
//! Each event is one JSON text frame. The last frame is
//! `{"type":"closed","reason":"cancelled"|"shutdown"}`, followed by a close
//! frame. The subscription is cancelled when the client goes away.

use super::{ApiError, AppState, StreamQuery};
use crate::streaming::{MetricsSubscription, StreamEvent};
use axum::{
    extract::{
        rejection::QueryRejection,
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

/// The query is validated and the subscription started before the upgrade,
/// so a bad request gets a regular JSON error response.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StreamQuery>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let subscription = match subscribe(&state, query) {
        Ok(subscription) => subscription,
        Err(e) => return e.into_response(),
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, subscription)),
        Err(rejection) => rejection.into_response(),
    }
}

fn subscribe(
    state: &AppState,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> Result<MetricsSubscription, ApiError> {
    let Query(query) = query?;
    let request = query.into_request()?;
    Ok(state.service.stream_metrics(request)?)
}

/// Serialize one event as a text frame.
pub fn event_message(event: &StreamEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            tracing::error!("Failed to serialize metrics event: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, subscription: MetricsSubscription) {
    let (mut sender, mut receiver) = socket.split();
    let cancel = subscription.cancellation_token();

    let mut send_task = tokio::spawn(async move {
        let events = subscription.into_stream();
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            let terminal = event.is_terminal();
            if let Some(message) = event_message(&event) {
                if sender.send(message).await.is_err() {
                    break;
                }
            }
            if terminal {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    // Client frames are ignored apart from close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => {
            tracing::debug!("Metrics stream client disconnected");
            cancel.cancel();
            if let Err(e) = send_task.await {
                tracing::warn!(error = %e, "Metrics stream sender failed");
            }
        }
    }
}
