use crate::events::Subscription;
use crate::game::{Match, MatchPhase, ScoringEvent};
use hockey_shared::config::{GameSize, PhysicsOptions};
use hockey_shared::protocol::{
    EndReason, EndedMsg, InitMsg, MatchId, PlayerId, ScoreWire, ScoredMsg, TeamSide, TickMsg,
    Vec2Wire,
};
use rapier2d::prelude::*;
use tokio::sync::mpsc;

/// What one heartbeat of a session produced.
#[derive(Debug, Clone)]
pub struct SessionTick {
    pub tick: TickMsg,
    pub scored: Vec<ScoredMsg>,
    /// Set when a side reached the goal limit; the match is already cleared.
    pub finished: Option<EndedMsg>,
}

/// A match plus its running score.
pub struct Session {
    pub id: MatchId,
    game: Match,
    score: ScoreWire,
    goals_to_win: u32,
    scored_rx: mpsc::UnboundedReceiver<ScoringEvent>,
    _scoring: Subscription,
}

impl Session {
    pub fn new(
        id: MatchId,
        players: [PlayerId; 2],
        goals_to_win: u32,
        size: &GameSize,
        options: &PhysicsOptions,
    ) -> Self {
        let game = Match::new(players[0], players[1], size, options);
        let (scored_tx, scored_rx) = mpsc::unbounded_channel();
        let subscription = game.on_scored(move |event| {
            let _ = scored_tx.send(event.clone());
        });
        Self {
            id,
            game,
            score: ScoreWire::default(),
            goals_to_win,
            scored_rx,
            _scoring: subscription,
        }
    }

    pub fn players(&self) -> [PlayerId; 2] {
        self.game.player_ids()
    }

    pub fn score(&self) -> ScoreWire {
        self.score
    }

    pub fn phase(&self) -> MatchPhase {
        self.game.phase()
    }

    pub fn init_for(&self, player_id: PlayerId) -> InitMsg {
        InitMsg {
            match_id: self.id,
            self_id: player_id,
            ..self.game.get_init()
        }
    }

    /// Returns true if this call started the match.
    pub fn set_ready(&mut self, player_id: PlayerId) -> bool {
        let was_waiting = self.game.phase() == MatchPhase::AwaitingReady;
        let all_ready = self.game.set_player_ready(player_id);
        was_waiting && all_ready
    }

    pub fn move_player(&mut self, player_id: PlayerId, direction: Vec2Wire) {
        self.game.move_player(
            player_id,
            vector![direction.x as Real, direction.y as Real],
        );
    }

    /// Run one heartbeat. `None` unless the match is in progress.
    pub fn tick(&mut self, dt: Real, max_sub_steps: usize) -> Option<SessionTick> {
        if self.game.phase() != MatchPhase::InProgress {
            return None;
        }
        self.game.on_heartbeat(dt, max_sub_steps);
        let tick = self.game.get_tick();

        let mut scored = Vec::new();
        let mut winner = None;
        while let Ok(event) = self.scored_rx.try_recv() {
            let count = match event.team_that_scored {
                TeamSide::Left => &mut self.score.left,
                TeamSide::Right => &mut self.score.right,
            };
            *count += 1;
            if *count >= self.goals_to_win {
                winner = Some(event.team_that_scored);
            }
            scored.push(event.to_wire(self.score));
        }

        let finished = winner.map(|side| {
            tracing::info!(
                "Match {} won by {:?} ({}-{})",
                self.id,
                side,
                self.score.left,
                self.score.right
            );
            self.end(EndReason::GoalLimit, Some(side))
        });

        Some(SessionTick {
            tick,
            scored,
            finished,
        })
    }

    /// Tear the match down and describe the outcome.
    pub fn end(&mut self, reason: EndReason, winner: Option<TeamSide>) -> EndedMsg {
        self.game.clear();
        EndedMsg {
            reason,
            winner,
            score: self.score,
        }
    }
}
