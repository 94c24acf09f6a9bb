use crate::config::ServerConfig;
use crate::game_loop::{GameBroadcast, Outgoing};
use crate::session::Session;
use hockey_shared::config::{GameSize, PhysicsOptions};
use hockey_shared::protocol::{
    EndReason, MatchId, PlayerId, ServerMsg, StartMsg, TeamSide, Vec2Wire, WelcomeMsg,
    PROTOCOL_VERSION,
};
use rapier2d::prelude::Real;
use std::collections::HashMap;

/// Lobby and every running session, owned by the game loop task.
pub struct ServerState {
    /// Single-slot pairing queue.
    waiting: Option<PlayerId>,
    sessions: HashMap<MatchId, Session>,
    player_match: HashMap<PlayerId, MatchId>,
    next_player_id: PlayerId,
    next_match_id: MatchId,
    goals_to_win: u32,
    max_sub_steps: usize,
    game_size: GameSize,
    physics: PhysicsOptions,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            waiting: None,
            sessions: HashMap::new(),
            player_match: HashMap::new(),
            next_player_id: 1,
            next_match_id: 1,
            goals_to_win: config.goals_to_win,
            max_sub_steps: config.max_sub_steps,
            game_size: config.game_size,
            physics: config.physics,
        }
    }

    /// Register a connection. Pairs it with the queued player if there is one.
    pub fn add_player(&mut self) -> (PlayerId, WelcomeMsg, Vec<Outgoing>) {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let welcome = WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            self_id: id,
        };

        let outgoing = match self.waiting.take() {
            None => {
                self.waiting = Some(id);
                tracing::info!("Player {} waiting for an opponent", id);
                Vec::new()
            }
            Some(opponent) => self.create_session([opponent, id]),
        };

        (id, welcome, outgoing)
    }

    fn create_session(&mut self, players: [PlayerId; 2]) -> Vec<Outgoing> {
        let match_id = self.next_match_id;
        self.next_match_id += 1;

        let session = Session::new(
            match_id,
            players,
            self.goals_to_win,
            &self.game_size,
            &self.physics,
        );
        let outgoing = players
            .iter()
            .map(|&player_id| Outgoing::Direct {
                player_id,
                msg: ServerMsg::Init(session.init_for(player_id)),
            })
            .collect();

        for &player_id in &players {
            self.player_match.insert(player_id, match_id);
        }
        self.sessions.insert(match_id, session);
        tracing::info!(
            "Match {} created for players {} and {}",
            match_id,
            players[0],
            players[1]
        );
        outgoing
    }

    /// Drop a connection. A player in a match ends it for the opponent.
    pub fn remove_player(&mut self, id: PlayerId) -> Vec<Outgoing> {
        if self.waiting == Some(id) {
            self.waiting = None;
            return Vec::new();
        }

        let Some(match_id) = self.player_match.remove(&id) else {
            return Vec::new();
        };
        let Some(mut session) = self.sessions.remove(&match_id) else {
            return Vec::new();
        };
        let players = session.players();
        for player_id in players {
            self.player_match.remove(&player_id);
        }

        let remaining = if players[0] == id {
            TeamSide::Right
        } else {
            TeamSide::Left
        };
        let msg = session.end(EndReason::OpponentLeft, Some(remaining));
        tracing::info!("Match {} ended: player {} left", match_id, id);
        to_players(players, ServerMsg::Ended(msg))
    }

    pub fn set_ready(&mut self, id: PlayerId) -> Vec<Outgoing> {
        let Some(session) = self.session_of(id) else {
            tracing::warn!("Ready from player {} outside any match", id);
            return Vec::new();
        };
        if session.set_ready(id) {
            tracing::info!("Match {} started", session.id);
            to_players(session.players(), ServerMsg::Start(StartMsg {}))
        } else {
            Vec::new()
        }
    }

    pub fn move_player(&mut self, id: PlayerId, direction: Vec2Wire) {
        match self.session_of(id) {
            Some(session) => session.move_player(id, direction),
            None => tracing::debug!("Move from player {} outside any match", id),
        }
    }

    /// Advance every in-progress session by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Vec<Outgoing> {
        let mut outgoing = Vec::new();
        let mut finished = Vec::new();

        for (&match_id, session) in self.sessions.iter_mut() {
            let Some(out) = session.tick(dt as Real, self.max_sub_steps) else {
                continue;
            };
            let players = session.players();
            outgoing.push(Outgoing::Broadcast(GameBroadcast::Tick {
                match_id,
                msg: out.tick,
            }));
            for msg in out.scored {
                outgoing.extend(to_players(players, ServerMsg::Scored(msg)));
            }
            if let Some(msg) = out.finished {
                outgoing.extend(to_players(players, ServerMsg::Ended(msg)));
                finished.push(match_id);
            }
        }

        for match_id in finished {
            if let Some(session) = self.sessions.remove(&match_id) {
                for player_id in session.players() {
                    self.player_match.remove(&player_id);
                }
            }
        }

        outgoing
    }

    pub fn waiting_player(&self) -> Option<PlayerId> {
        self.waiting
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn match_of(&self, id: PlayerId) -> Option<MatchId> {
        self.player_match.get(&id).copied()
    }

    fn session_of(&mut self, id: PlayerId) -> Option<&mut Session> {
        let match_id = self.player_match.get(&id)?;
        self.sessions.get_mut(match_id)
    }
}

fn to_players(players: [PlayerId; 2], msg: ServerMsg) -> Vec<Outgoing> {
    players
        .iter()
        .map(|&player_id| Outgoing::Direct {
            player_id,
            msg: msg.clone(),
        })
        .collect()
}
