//! Advisory heartbeat channel.
//!
//! Emits `{"message": "update"}` on a fixed interval so connected viewers
//! can refresh. The cadence is independent of actual pipeline ticks and the
//! message carries no payload guarantees — it must never be treated as a
//! tick-completion signal.

use crate::interfaces::http::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::{Router, extract::State, routing::get};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tracing::debug;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let heartbeat = state.heartbeat;
    ws.on_upgrade(move |socket| handle(socket, heartbeat))
}

async fn handle(socket: WebSocket, heartbeat: Duration) {
    let (mut sender, mut receiver) = socket.split();

    // Drain inbound frames so a client close is noticed promptly.
    let mut drain = tokio::spawn(async move { while receiver.next().await.is_some() {} });

    let mut ticker = tokio::time::interval(heartbeat);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let payload = serde_json::json!({ "message": "update" }).to_string();
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            _ = &mut drain => break,
        }
    }

    drain.abort();
    debug!("Heartbeat client disconnected");
}
