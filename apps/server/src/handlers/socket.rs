//! WebSocket upgrade and the per-connection read/write loop. One
//! connection runs three cooperating tasks — downstream, upstream, and
//! an internal dispatch worker — so a slow database round trip on one
//! inbound action never stalls outbound delivery.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use mines_models::ClientMessage;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::services::dispatcher::ActionDispatcher;
use crate::services::lifecycle::ConnectionLifecycle;
use crate::state::{AppState, TransportId};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);
const INBOUND_BUFFER_CAPACITY: usize = 32;
const OUTBOUND_BUFFER_CAPACITY: usize = 64;

pub async fn upgrade(websocket_upgrade: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    websocket_upgrade.on_upgrade(move |socket| handle_connection(socket, state))
}

/// A player id is, for now, simply a fresh random identity per
/// connection — there is no authentication, so there is nothing else
/// to derive one from.
fn mint_player_id() -> String {
    Uuid::new_v4().to_string()
}

#[instrument(skip(socket, state))]
async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let transport_id = TransportId::new();
    let player_id = mint_player_id();

    let (outbound_sender, mut outbound_receiver) = mpsc::channel(OUTBOUND_BUFFER_CAPACITY);

    let lifecycle = ConnectionLifecycle::new(&state.registry, &state.cells, &state.players);
    if let Err(source) = lifecycle.on_connect(transport_id, player_id.clone(), outbound_sender).await {
        error!(player_id, %source, "failed to establish session");
        return;
    }

    let (inbound_sender, mut inbound_receiver) = mpsc::channel::<ClientMessage>(INBOUND_BUFFER_CAPACITY);

    let worker_state = state.clone();
    let worker_player_id = player_id.clone();
    let mut worker_task = tokio::spawn(async move {
        let dispatcher = ActionDispatcher::new(&worker_state.registry, &worker_state.engine, &worker_state.players);
        while let Some(message) = inbound_receiver.recv().await {
            dispatcher.dispatch(&worker_player_id, message).await;
        }
    });

    let mut downstream_task = tokio::spawn(async move {
        let mut keepalive = interval(KEEPALIVE_INTERVAL);
        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if socket_sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                outbound = outbound_receiver.recv() => {
                    match outbound {
                        Some(message) => {
                            let payload = match serde_json::to_string(&message) {
                                Ok(payload) => payload,
                                Err(source) => {
                                    error!(%source, "failed to encode outbound message");
                                    continue;
                                }
                            };
                            if socket_sender.send(Message::Text(payload)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let upstream_player_id = player_id.clone();
    let mut upstream_task = tokio::spawn(async move {
        while let Some(frame) = socket_receiver.next().await {
            match frame {
                Ok(Message::Text(raw)) => match serde_json::from_str::<ClientMessage>(&raw) {
                    Ok(message) => {
                        if inbound_sender.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(source) => {
                        debug!(player_id = %upstream_player_id, %source, "dropping malformed inbound message");
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(source) => {
                    warn!(player_id = %upstream_player_id, %source, "websocket read error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut downstream_task => {
            upstream_task.abort();
            worker_task.abort();
        }
        _ = &mut upstream_task => {
            downstream_task.abort();
            worker_task.abort();
        }
        _ = &mut worker_task => {
            downstream_task.abort();
            upstream_task.abort();
        }
    }

    let lifecycle = ConnectionLifecycle::new(&state.registry, &state.cells, &state.players);
    if let Err(source) = lifecycle.on_disconnect(transport_id).await {
        error!(player_id, %source, "failed to clean up session");
    }
}
