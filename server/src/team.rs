use hockey_shared::protocol::{TeamSide, TeamWire};
use rapier2d::prelude::Real;

pub const LEFT_TEAM_COLOR: u32 = 0x3b82f6;
pub const RIGHT_TEAM_COLOR: u32 = 0xef4444;

/// One side of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    pub side: TeamSide,
    pub color: u32,
}

impl Team {
    pub fn new(side: TeamSide) -> Self {
        let color = match side {
            TeamSide::Left => LEFT_TEAM_COLOR,
            TeamSide::Right => RIGHT_TEAM_COLOR,
        };
        Self { side, color }
    }

    /// Sign of the x axis pointing at this team's half of the arena.
    pub fn direction_sign(&self) -> Real {
        match self.side {
            TeamSide::Left => -1.0,
            TeamSide::Right => 1.0,
        }
    }

    pub fn to_wire(&self) -> TeamWire {
        TeamWire {
            side: self.side,
            color: self.color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teams_have_distinct_colors() {
        assert_ne!(
            Team::new(TeamSide::Left).color,
            Team::new(TeamSide::Right).color
        );
    }

    #[test]
    fn direction_points_at_own_half() {
        assert!(Team::new(TeamSide::Left).direction_sign() < 0.0);
        assert!(Team::new(TeamSide::Right).direction_sign() > 0.0);
    }
}
