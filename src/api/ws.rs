// =============================================================================
// WebSocket Handler — Push-based market updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. The current dashboard view on connect.
//   2. A fresh view every 500 ms whenever the state_version has changed
//      since the last push.
//
// The handler also answers Ping frames with Pong frames, accepts
// `{"select_pair": "ETH-USD"}` / `{"timeframe": "1h"}` text commands, and
// tracks a global `ws_sequence_number` that increments on every push.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::error::SimResult;
use crate::market_data::Timeframe;

const PUSH_INTERVAL_MS: u64 = 500;

// =============================================================================
// Client commands
// =============================================================================

/// Selection commands a client may send as text frames.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum ClientCommand {
    SelectPair(String),
    Timeframe(String),
}

fn apply_command(state: &AppState, command: ClientCommand) -> SimResult<()> {
    match command {
        ClientCommand::SelectPair(symbol) => {
            state.select_pair(&symbol)?;
        }
        ClientCommand::Timeframe(raw) => {
            state.set_timeframe(raw.parse::<Timeframe>()?);
        }
    }
    Ok(())
}

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

/// Axum handler for the WebSocket upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("WebSocket connection accepted, upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

// =============================================================================
// Connection handler
// =============================================================================

/// Manages a single WebSocket connection lifecycle.
///
/// Runs two concurrent branches via `tokio::select!`:
///   1. **Push**: every 500 ms, send a new view if state_version changed.
///   2. **Recv**: handle client frames (Ping, Close, selection commands).
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut sequence: u64 = 0;

    if let Err(e) = send_view(&mut sender, &state, &mut sequence).await {
        warn!(error = %e, "Failed to send initial WebSocket view");
        return;
    }
    let mut last_sent_version = state.current_state_version();

    let mut push_interval = interval(Duration::from_millis(PUSH_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = push_interval.tick() => {
                let current_version = state.current_state_version();
                if current_version != last_sent_version {
                    match send_view(&mut sender, &state, &mut sequence).await {
                        Ok(()) => {
                            last_sent_version = current_version;
                        }
                        Err(e) => {
                            debug!(error = %e, "WebSocket send failed, disconnecting");
                            break;
                        }
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(command) => {
                                if let Err(e) = apply_command(&state, command) {
                                    warn!(error = %e, "WebSocket command rejected");
                                }
                            }
                            Err(_) => debug!(msg = %text, "WebSocket text message ignored"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "Failed to send Pong, disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error, disconnecting");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!(pushed = sequence, "WebSocket connection closed");
}

// =============================================================================
// Helpers
// =============================================================================

/// Serialize and send the current dashboard view over the WebSocket.
async fn send_view<S>(
    sender: &mut S,
    state: &Arc<AppState>,
    sequence: &mut u64,
) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    state
        .ws_sequence_number
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    *sequence += 1;

    let snapshot = state.snapshot();
    let view = state.view(snapshot.as_deref());

    match serde_json::to_string(&view) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            debug!(version = view.state_version, seq = *sequence, "WebSocket view sent");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize dashboard view");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::tests::test_state;

    #[test]
    fn parses_client_commands() {
        let cmd: ClientCommand = serde_json::from_str(r#"{"select_pair":"ETH-USD"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::SelectPair("ETH-USD".into()));
        let cmd: ClientCommand = serde_json::from_str(r#"{"timeframe":"1d"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::Timeframe("1d".into()));
        assert!(serde_json::from_str::<ClientCommand>("ping").is_err());
    }

    #[test]
    fn commands_update_selection() {
        let state = test_state();
        apply_command(&state, ClientCommand::SelectPair("OP-USD".into())).unwrap();
        assert_eq!(state.snapshot().unwrap().pair.symbol, "OP-USD");

        apply_command(&state, ClientCommand::Timeframe("1w".into())).unwrap();
        assert_eq!(state.selected_timeframe(), Timeframe::W1);

        assert!(apply_command(&state, ClientCommand::Timeframe("7m".into())).is_err());
    }
}
