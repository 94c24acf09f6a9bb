use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::{GameSize, PhysicsOptions};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

pub type PlayerId = u32;
pub type MatchId = u32;

// === Shared value types ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Left,
    Right,
}

impl TeamSide {
    pub fn opponent(self) -> Self {
        match self {
            TeamSide::Left => TeamSide::Right,
            TeamSide::Right => TeamSide::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct Vec2Wire {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned rectangle; `x`/`y` is the centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct RectWire {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct ScoreWire {
    pub left: u32,
    pub right: u32,
}

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "init")]
    Init(InitMsg),
    #[serde(rename = "start")]
    Start(StartMsg),
    #[serde(rename = "tick")]
    Tick(TickMsg),
    #[serde(rename = "scored")]
    Scored(ScoredMsg),
    #[serde(rename = "ended")]
    Ended(EndedMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: PlayerId,
}

/// Full match description, sent once when a player joins a match.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct InitMsg {
    #[serde(default)]
    pub match_id: MatchId,
    #[serde(default)]
    pub self_id: PlayerId,
    pub physics_options: PhysicsOptions,
    pub players: Vec<NewPlayerWire>,
    pub game_size: GameSize,
    pub ball: NewBallWire,
    pub goals: Vec<GoalWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct NewPlayerWire {
    pub id: PlayerId,
    pub color: u32,
    pub team: TeamSide,
    pub diameter: f64,
    pub position: Vec2Wire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct NewBallWire {
    pub color: u32,
    pub diameter: f64,
    pub mass: f64,
    pub max_velocity: f64,
    pub position: Vec2Wire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct GoalWire {
    pub top: RectWire,
    pub bottom: RectWire,
    pub back: RectWire,
    /// The scoring sensor
    pub goal: RectWire,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct StartMsg {}

/// Per-heartbeat delta. Fields constant for the whole match live in [`InitMsg`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct TickMsg {
    pub players: Vec<PlayerUpdateWire>,
    pub ball: BallUpdateWire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct PlayerUpdateWire {
    pub id: PlayerId,
    pub position: Vec2Wire,
    pub velocity: Vec2Wire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct BallUpdateWire {
    pub position: Vec2Wire,
    pub velocity: Vec2Wire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct TeamWire {
    pub side: TeamSide,
    pub color: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ScoredMsg {
    pub team_that_scored: TeamSide,
    pub all_teams: Vec<TeamWire>,
    pub score: ScoreWire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    GoalLimit,
    OpponentLeft,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct EndedMsg {
    pub reason: EndReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub winner: Option<TeamSide>,
    pub score: ScoreWire,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "move")]
    Move { direction: Vec2Wire },
    #[serde(rename = "ready")]
    Ready,
}

// === Conversion helpers ===

/// Round to 2 decimal places (sub-pixel precision is plenty for pixel-unit arenas)
#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl Vec2Wire {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn rounded(x: f64, y: f64) -> Self {
        Self {
            x: round2(x),
            y: round2(y),
        }
    }
}
