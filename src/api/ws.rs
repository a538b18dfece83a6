// =============================================================================
// WebSocket Handler — Push-based dashboard updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate DashboardSnapshot on connect.
//   2. A fresh snapshot whenever the state_version has moved since the last
//      push, checked every 500 ms.
//
// Ping frames are answered with Pong; text frames are ignored. The connection
// closes on Close, on a receive error, or when a send fails.
// =============================================================================

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

/// How often a session checks for a new state version.
const PUSH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();
    run_session(sender, receiver, state).await;
}

/// Drive one session over any frame sink/stream pair until the client goes
/// away or a send fails.
pub(crate) async fn run_session<S, R>(mut sender: S, mut receiver: R, state: Arc<AppState>)
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let clients = state.ws_clients.fetch_add(1, Ordering::SeqCst) + 1;
    info!(clients, "WebSocket client connected");

    let mut sequence: u64 = 0;

    let mut last_sent_version = match send_snapshot(&mut sender, &state, &mut sequence).await {
        Ok(version) => version,
        Err(e) => {
            warn!(error = %e, "Failed to send initial WebSocket snapshot");
            cleanup(&state);
            return;
        }
    };

    let mut push_interval = interval(PUSH_CHECK_INTERVAL);

    loop {
        tokio::select! {
            _ = push_interval.tick() => {
                if state.current_state_version() != last_sent_version {
                    match send_snapshot(&mut sender, &state, &mut sequence).await {
                        Ok(version) => last_sent_version = version,
                        Err(e) => {
                            debug!(error = %e, "WebSocket send failed — disconnecting");
                            break;
                        }
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "Failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    cleanup(&state);
}

/// Serialize and send the current snapshot. Returns the state version the
/// snapshot was built from.
async fn send_snapshot<S>(
    sender: &mut S,
    state: &Arc<AppState>,
    sequence: &mut u64,
) -> Result<u64, axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    *sequence += 1;

    let snapshot = state.build_snapshot();

    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            debug!(
                version = snapshot.state_version,
                seq = *sequence,
                "WebSocket snapshot sent"
            );
        }
        Err(e) => {
            // Not a network error; keep the session.
            warn!(error = %e, "Failed to serialize snapshot");
        }
    }
    Ok(snapshot.state_version)
}

fn cleanup(state: &Arc<AppState>) {
    let remaining = state.ws_clients.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
    info!(clients = remaining, "WebSocket client disconnected");
}

// =============================================================================
// Tests
// =============================================================================
