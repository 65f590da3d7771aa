// WebSocket handler: pushes every published snapshot to the client

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::NetworkSnapshot;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the connection count on drop (connect = +1, drop = -1).
struct WsConnectionGuard(Arc<AtomicUsize>);

impl Drop for WsConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_network(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let conn_count = state.ws_network_connections.clone();
    ws.on_upgrade(move |socket| async move {
        let rx = store.subscribe();
        if let Err(e) = stream_network(socket, rx, conn_count).await {
            tracing::info!("Network stream error: {}", e);
        }
    })
}

async fn stream_network(
    socket: WebSocket,
    mut rx: watch::Receiver<Arc<NetworkSnapshot>>,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, Ordering::Relaxed);
    let _guard = WsConnectionGuard(conn_count);
    tracing::info!("Client connected to network stream");

    let (mut sender, mut receiver) = socket.split();

    // New clients get the current snapshot without waiting a full cycle.
    let initial = rx.borrow_and_update().clone();
    if !send_snapshot(&mut sender, &initial).await? {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval_at(
        tokio::time::Instant::now() + WS_PING_INTERVAL,
        WS_PING_INTERVAL,
    );
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if !send_snapshot(&mut sender, &snapshot).await? {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    tracing::info!("Client disconnected from network stream");
    Ok(())
}

/// `Ok(false)` when the client is gone or too slow to take the message.
async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    snapshot: &NetworkSnapshot,
) -> anyhow::Result<bool> {
    let json = serde_json::to_string(snapshot)?;
    let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}
