use crate::config::ServerConfig;
use crate::state::ServerState;
use hockey_shared::protocol::{MatchId, PlayerId, ServerMsg, TickMsg, Vec2Wire, WelcomeMsg};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from client connections to the game loop
pub enum GameCommand {
    PlayerJoin {
        response: oneshot::Sender<(PlayerId, WelcomeMsg)>,
        /// Reliable channel for this connection's control messages
        outbox: mpsc::UnboundedSender<ServerMsg>,
    },
    PlayerLeave {
        id: PlayerId,
    },
    Ready {
        id: PlayerId,
    },
    Move {
        id: PlayerId,
        direction: Vec2Wire,
    },
}

/// Lossy fan-out to every connection; each keeps the ticks of its own match.
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    Tick { match_id: MatchId, msg: TickMsg },
}

/// What the lobby wants delivered.
#[derive(Debug, Clone)]
pub enum Outgoing {
    /// Control message for one player. Never dropped while the connection lives.
    Direct { player_id: PlayerId, msg: ServerMsg },
    Broadcast(GameBroadcast),
}

fn dispatch(
    outgoing: Vec<Outgoing>,
    outboxes: &HashMap<PlayerId, mpsc::UnboundedSender<ServerMsg>>,
    broadcast_tx: &broadcast::Sender<GameBroadcast>,
) {
    for out in outgoing {
        match out {
            Outgoing::Direct { player_id, msg } => {
                if let Some(outbox) = outboxes.get(&player_id) {
                    // A closed outbox means the connection is leaving
                    let _ = outbox.send(msg);
                }
            }
            Outgoing::Broadcast(b) => {
                // No subscribers is fine
                let _ = broadcast_tx.send(b);
            }
        }
    }
}

/// Run the main game loop. Owns all sessions.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    server_config: ServerConfig,
) {
    let mut state = ServerState::new(&server_config);
    let mut outboxes: HashMap<PlayerId, mpsc::UnboundedSender<ServerMsg>> = HashMap::new();

    let dt = server_config.fixed_dt();
    let mut tick_interval = tokio::time::interval(Duration::from_secs_f64(dt));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                dispatch(state.tick(dt), &outboxes, &broadcast_tx);
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    GameCommand::PlayerJoin { response, outbox } => {
                        if response.is_closed() {
                            tracing::debug!("Join abandoned before it was handled");
                            continue;
                        }
                        let (player_id, welcome, mut outgoing) = state.add_player();
                        outboxes.insert(player_id, outbox);
                        if response.send((player_id, welcome)).is_err() {
                            tracing::warn!("Player {} left before welcome", player_id);
                            outboxes.remove(&player_id);
                            outgoing.extend(state.remove_player(player_id));
                        } else {
                            tracing::info!("Player {} joined", player_id);
                        }
                        dispatch(outgoing, &outboxes, &broadcast_tx);
                    }
                    GameCommand::PlayerLeave { id } => {
                        outboxes.remove(&id);
                        dispatch(state.remove_player(id), &outboxes, &broadcast_tx);
                        tracing::info!("Player {} left", id);
                    }
                    GameCommand::Ready { id } => {
                        dispatch(state.set_ready(id), &outboxes, &broadcast_tx);
                    }
                    GameCommand::Move { id, direction } => {
                        state.move_player(id, direction);
                    }
                }
            }

            else => break,
        }
    }

    tracing::info!("Game loop ended");
}
