//! One air-hockey match: arena, entities and the rules that tie them together.
//!
//! A match is driven from outside: the host calls [`Match::on_heartbeat`] at a
//! fixed rate and feeds player commands in between. Nothing here blocks.

use crate::ball::{Ball, BALL_DIAMETER, BALL_KICKOFF_SPEED};
use crate::events::{EventChannel, Subscription};
use crate::goal::{Goal, GOAL_DEPTH, GOAL_OPENING, GOAL_WALL_THICKNESS};
use crate::physics::PhysicsWorld;
use crate::player::{Player, PLAYER_DIAMETER};
use crate::team::Team;
use hockey_shared::config::{GameSize, PhysicsOptions};
use hockey_shared::protocol::{InitMsg, PlayerId, ScoreWire, ScoredMsg, TeamSide, TickMsg};
use rapier2d::prelude::*;

/// Emitted once per goal.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringEvent {
    pub team_that_scored: TeamSide,
    pub all_teams: [Team; 2],
}

impl ScoringEvent {
    pub fn to_wire(&self, score: ScoreWire) -> ScoredMsg {
        ScoredMsg {
            team_that_scored: self.team_that_scored,
            all_teams: self.all_teams.iter().map(Team::to_wire).collect(),
            score,
        }
    }
}

/// Lifecycle of a match. Setup happens inside [`Match::new`] and a goal is
/// handled within the heartbeat that detects it, so neither is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Built, waiting for both players to signal ready.
    AwaitingReady,
    InProgress,
    /// Resources released; no further ticks.
    Ended,
}

/// Decide whether a begin-contact pair is a goal.
///
/// `sensors` lists each goal sensor with the side that defends it. A ball
/// entering a team's net scores for the opponent. Pairs without the ball are
/// ignored; if both sensors match, the first entry wins.
pub fn classify_contact<H: PartialEq>(
    pair: (H, H),
    ball: H,
    sensors: [(H, TeamSide); 2],
) -> Option<TeamSide> {
    let (a, b) = pair;
    if a != ball && b != ball {
        return None;
    }
    sensors
        .iter()
        .find(|(sensor, _)| a == *sensor || b == *sensor)
        .map(|(_, defender)| defender.opponent())
}

pub struct Match {
    phase: MatchPhase,
    size: GameSize,
    options: PhysicsOptions,
    world: PhysicsWorld,
    teams: [Team; 2],
    players: [Player; 2],
    ball: Ball,
    goals: [Goal; 2],
    scoring: EventChannel<ScoringEvent>,
}

impl Match {
    /// Build the arena. `p1` plays on the left, `p2` on the right.
    pub fn new(p1: PlayerId, p2: PlayerId, size: &GameSize, options: &PhysicsOptions) -> Self {
        let mut world = PhysicsWorld::new(options, size);
        let teams = [Team::new(TeamSide::Left), Team::new(TeamSide::Right)];

        let players = [
            Player::new(&mut world, p1, &teams[0], player_spawn(TeamSide::Left, size)),
            Player::new(&mut world, p2, &teams[1], player_spawn(TeamSide::Right, size)),
        ];
        let ball = Ball::new(&mut world, ball_spawn(size));
        let goals = [
            Goal::build(&mut world, TeamSide::Left, size),
            Goal::build(&mut world, TeamSide::Right, size),
        ];

        tracing::info!("Match set up for players {} and {}", p1, p2);

        Self {
            phase: MatchPhase::AwaitingReady,
            size: *size,
            options: *options,
            world,
            teams,
            players,
            ball,
            goals,
            scoring: EventChannel::new(),
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Subscribe to goals. The handler stays registered while the handle lives.
    pub fn on_scored<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&ScoringEvent) + Send + 'static,
    {
        self.scoring.on(handler)
    }

    pub fn teams(&self) -> &[Team; 2] {
        &self.teams
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_ids(&self) -> [PlayerId; 2] {
        [self.players[0].id, self.players[1].id]
    }

    /// Mark a player ready. Returns true once both players are ready; the
    /// first such call starts the match.
    pub fn set_player_ready(&mut self, id: PlayerId) -> bool {
        if self.phase == MatchPhase::Ended {
            tracing::debug!("Ignoring ready from {} on ended match", id);
            return false;
        }
        let Some(player) = self.players.iter_mut().find(|p| p.id == id) else {
            tracing::warn!("Ready from unknown player {}", id);
            return false;
        };
        if player.mark_ready() {
            tracing::info!("Player {} ready", id);
        }

        let all_ready = self.players.iter().all(Player::is_ready);
        if all_ready && self.phase == MatchPhase::AwaitingReady {
            self.phase = MatchPhase::InProgress;
            tracing::info!("Match started");
        }
        all_ready
    }

    /// Stage a movement direction, applied on the next heartbeat.
    pub fn move_player(&mut self, id: PlayerId, direction: Vector<Real>) {
        if self.phase != MatchPhase::InProgress {
            tracing::debug!("Dropping move from {} in phase {:?}", id, self.phase);
            return;
        }
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) => player.set_direction(direction),
            None => tracing::warn!("Move from unknown player {}", id),
        }
    }

    /// Advance the simulation by one tick.
    pub fn on_heartbeat(&mut self, dt: Real, max_sub_steps: usize) {
        if self.phase != MatchPhase::InProgress {
            return;
        }

        for player in &self.players {
            player.on_update(&mut self.world);
        }
        self.ball.on_update(&mut self.world);

        let contacts = self.world.step(dt, max_sub_steps);

        // Collisions during the step may have sped the ball up
        self.ball.on_update(&mut self.world);

        let sensors = [
            (self.goals[0].sensor.collider, self.goals[0].side),
            (self.goals[1].sensor.collider, self.goals[1].side),
        ];
        let ball = self.ball.collider();
        let scorer = contacts
            .into_iter()
            .find_map(|pair| classify_contact(pair, ball, sensors));

        if let Some(team) = scorer {
            self.goal_scored(team);
        }
    }

    fn goal_scored(&mut self, team: TeamSide) {
        tracing::info!("Goal for {:?}", team);
        self.ball.reset_velocity(&mut self.world, None);
        self.reset(Some(team));
        self.scoring.emit(&ScoringEvent {
            team_that_scored: team,
            all_teams: self.teams,
        });
    }

    /// Re-centre the ball and both players.
    ///
    /// With `scored_by`, the ball kicks off towards the team that conceded;
    /// without it the ball starts at rest.
    pub fn reset(&mut self, scored_by: Option<TeamSide>) {
        for player in &self.players {
            player.set_position(&mut self.world, player_spawn(player.team, &self.size));
        }
        self.ball.set_position(&mut self.world, ball_spawn(&self.size));

        let kickoff = scored_by.map(|scorer| {
            let conceded = Team::new(scorer.opponent());
            conceded.direction_sign() * BALL_KICKOFF_SPEED
        });
        self.ball.reset_velocity(&mut self.world, kickoff);
    }

    /// Delta snapshot: positions and velocities only.
    pub fn get_tick(&self) -> TickMsg {
        TickMsg {
            players: self
                .players
                .iter()
                .map(|p| p.to_update_network_player(&self.world))
                .collect(),
            ball: self.ball.to_ball_update(&self.world),
        }
    }

    /// Full snapshot. `match_id` and `self_id` are left for the host to fill.
    pub fn get_init(&self) -> InitMsg {
        InitMsg {
            match_id: 0,
            self_id: 0,
            physics_options: self.options,
            players: self
                .players
                .iter()
                .map(|p| p.to_new_network_player(&self.world))
                .collect(),
            game_size: self.size,
            ball: self.ball.to_new_ball(&self.world),
            goals: self.goals.iter().map(Goal::to_wire).collect(),
        }
    }

    /// End the match: release every body and drop every scoring listener.
    pub fn clear(&mut self) {
        self.world.clear();
        self.scoring.remove_all_listeners();
        self.phase = MatchPhase::Ended;
        tracing::info!(
            "Match between {} and {} cleared",
            self.players[0].id,
            self.players[1].id
        );
    }
}

/// Left player at a quarter of the width, right player at four fifths minus
/// its radius, both vertically centred.
pub fn player_spawn(side: TeamSide, size: &GameSize) -> Vector<Real> {
    let cy = size.height as Real / 2.0;
    let width = size.width as Real;
    match side {
        TeamSide::Left => vector![width / 4.0, cy],
        TeamSide::Right => vector![width * 4.0 / 5.0 - PLAYER_DIAMETER / 2.0, cy],
    }
}

pub fn ball_spawn(size: &GameSize) -> Vector<Real> {
    let (cx, cy) = size.center();
    vector![cx as Real, cy as Real]
}

/// Check that an arena can hold both goals and the kickoff layout: the goal
/// mouth plus its posts fits vertically, and every spawn disc stays clear of
/// the nets and of the other discs.
pub fn check_arena(size: &GameSize) -> Result<(), String> {
    let min_height = GOAL_OPENING + 2.0 * GOAL_WALL_THICKNESS;
    if (size.height as Real) < min_height {
        return Err(format!(
            "arena height {} is below the goal height {}",
            size.height, min_height
        ));
    }

    let width = size.width as Real;
    let player_r = PLAYER_DIAMETER / 2.0;
    let ball_r = BALL_DIAMETER / 2.0;
    let left = player_spawn(TeamSide::Left, size).x;
    let right = player_spawn(TeamSide::Right, size).x;
    let ball = ball_spawn(size).x;

    let fits = left - player_r >= GOAL_DEPTH
        && right + player_r <= width - GOAL_DEPTH
        && left + player_r <= ball - ball_r
        && right - player_r >= ball + ball_r;
    if !fits {
        return Err(format!(
            "arena width {} is too narrow for both goals and the kickoff layout",
            size.width
        ));
    }
    Ok(())
}
