use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use hockey_shared::protocol::{ClientMsg, MatchId, ServerMsg};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::game_loop::{GameBroadcast, GameCommand};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub broadcast_tx: broadcast::Sender<GameBroadcast>,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

/// Follow the connection's match through its control messages. Returns true
/// once the match is over and the socket should close.
fn track_match(msg: &ServerMsg, my_match: &mut Option<MatchId>) -> bool {
    match msg {
        ServerMsg::Init(init) => {
            *my_match = Some(init.match_id);
            false
        }
        ServerMsg::Ended(_) => {
            *my_match = None;
            true
        }
        _ => false,
    }
}

/// Ticks of the connection's own match; everything else is skipped.
fn tick_for(broadcast: &GameBroadcast, my_match: Option<MatchId>) -> Option<ServerMsg> {
    match broadcast {
        GameBroadcast::Tick { match_id, msg } if Some(*match_id) == my_match => {
            Some(ServerMsg::Tick(msg.clone()))
        }
        _ => None,
    }
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before joining so no tick of the first match is missed
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ServerMsg>();

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::PlayerJoin {
            response: resp_tx,
            outbox: outbox_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send PlayerJoin command");
        return;
    }

    let (my_id, welcome) = match resp_rx.await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("Failed to receive welcome");
            return;
        }
    };

    tracing::info!("Player {} connected", my_id);

    let welcome_sent = match serde_json::to_string(&ServerMsg::Welcome(welcome)) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize welcome: {}", e);
            false
        }
    };

    let mut my_match: Option<MatchId> = None;

    while welcome_sent {
        tokio::select! {
            // Control messages first, so `start` precedes the match's ticks
            biased;

            // Server -> Client (reliable)
            Some(msg) = outbox_rx.recv() => {
                let close = track_match(&msg, &mut my_match);
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                if close {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }

            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let cmd = match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(ClientMsg::Move { direction }) => {
                                GameCommand::Move { id: my_id, direction }
                            }
                            Ok(ClientMsg::Ready) => GameCommand::Ready { id: my_id },
                            Err(e) => {
                                tracing::warn!("Player {} sent malformed message: {}", my_id, e);
                                continue;
                            }
                        };
                        if app_state.game_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Player {} socket error: {}", my_id, e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (ticks)
            result = broadcast_rx.recv() => {
                match result {
                    Ok(broadcast) => {
                        let Some(msg) = tick_for(&broadcast, my_match) else {
                            continue;
                        };
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Ticks are snapshots; a later one supersedes what was lost
                        tracing::warn!("Player {} lagged by {} ticks", my_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::PlayerLeave { id: my_id })
        .await;
    tracing::info!("Player {} disconnected", my_id);
}
