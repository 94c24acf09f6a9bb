use crate::physics::{DiscHandles, PhysicsWorld};
use crate::team::Team;
use hockey_shared::protocol::{
    round2, NewPlayerWire, PlayerId, PlayerUpdateWire, TeamSide, Vec2Wire,
};
use rapier2d::prelude::*;

pub const PLAYER_DIAMETER: Real = 60.0;
/// Pixels per second at full stick deflection
pub const PLAYER_MAX_SPEED: Real = 400.0;
pub const PLAYER_MASS: Real = 10.0;

/// A participant, bound to a dynamic disc in the physics world.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub color: u32,
    pub team: TeamSide,
    /// Desired movement, applied to velocity on the next `on_update`
    direction: Vector<Real>,
    ready: bool,
    handles: DiscHandles,
}

impl Player {
    pub fn new(
        world: &mut PhysicsWorld,
        id: PlayerId,
        team: &Team,
        position: Vector<Real>,
    ) -> Self {
        let handles = world.add_disc(position, PLAYER_DIAMETER, PLAYER_MASS);
        Self {
            id,
            color: team.color,
            team: team.side,
            direction: Vector::zeros(),
            ready: false,
            handles,
        }
    }

    /// Stage a movement direction. Vectors longer than 1 are normalised and
    /// non-finite input stops the player.
    pub fn set_direction(&mut self, direction: Vector<Real>) {
        if !direction.x.is_finite() || !direction.y.is_finite() {
            self.direction = Vector::zeros();
            return;
        }
        let len = direction.norm();
        self.direction = if len > 1.0 { direction / len } else { direction };
    }

    pub fn direction(&self) -> Vector<Real> {
        self.direction
    }

    /// Returns true if this call changed the flag.
    pub fn mark_ready(&mut self) -> bool {
        let changed = !self.ready;
        self.ready = true;
        changed
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Pre-step update: turn the staged direction into velocity.
    pub fn on_update(&self, world: &mut PhysicsWorld) {
        world.set_velocity(self.handles.body, self.direction * PLAYER_MAX_SPEED);
    }

    /// Teleport, used for resets. Zeroes the body's velocity.
    pub fn set_position(&self, world: &mut PhysicsWorld, position: Vector<Real>) {
        world.teleport(self.handles.body, position);
    }

    pub fn position(&self, world: &PhysicsWorld) -> Vector<Real> {
        world.position(self.handles.body).unwrap_or_else(Vector::zeros)
    }

    pub fn velocity(&self, world: &PhysicsWorld) -> Vector<Real> {
        world.velocity(self.handles.body).unwrap_or_else(Vector::zeros)
    }

    pub fn collider(&self) -> ColliderHandle {
        self.handles.collider
    }

    pub fn to_new_network_player(&self, world: &PhysicsWorld) -> NewPlayerWire {
        NewPlayerWire {
            id: self.id,
            color: self.color,
            team: self.team,
            diameter: round2(PLAYER_DIAMETER as f64),
            position: to_wire(self.position(world)),
        }
    }

    pub fn to_update_network_player(&self, world: &PhysicsWorld) -> PlayerUpdateWire {
        PlayerUpdateWire {
            id: self.id,
            position: to_wire(self.position(world)),
            velocity: to_wire(self.velocity(world)),
        }
    }
}

pub(crate) fn to_wire(v: Vector<Real>) -> Vec2Wire {
    Vec2Wire::rounded(v.x as f64, v.y as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hockey_shared::config::{GameSize, PhysicsOptions};

    fn setup() -> (PhysicsWorld, Player) {
        let mut world = PhysicsWorld::new(&PhysicsOptions::default(), &GameSize::default());
        let player = Player::new(
            &mut world,
            1,
            &Team::new(TeamSide::Left),
            vector![300.0, 300.0],
        );
        (world, player)
    }

    #[test]
    fn new_player_takes_team_color() {
        let (_, player) = setup();
        assert_eq!(player.color, Team::new(TeamSide::Left).color);
        assert_eq!(player.team, TeamSide::Left);
        assert!(!player.is_ready());
    }

    #[test]
    fn set_direction_normalizes_long_vectors() {
        let (_, mut player) = setup();
        player.set_direction(vector![3.0, 4.0]);
        assert!((player.direction().norm() - 1.0).abs() < 1e-6);
        assert!((player.direction().x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn set_direction_keeps_partial_deflection() {
        let (_, mut player) = setup();
        player.set_direction(vector![0.5, 0.0]);
        assert_eq!(player.direction(), vector![0.5, 0.0]);
    }

    #[test]
    fn set_direction_rejects_nan() {
        let (_, mut player) = setup();
        player.set_direction(vector![Real::NAN, 1.0]);
        assert_eq!(player.direction(), Vector::zeros());
    }

    #[test]
    fn direction_is_staged_until_update() {
        let (mut world, mut player) = setup();
        player.set_direction(vector![1.0, 0.0]);
        assert_eq!(player.velocity(&world), Vector::zeros());
        player.on_update(&mut world);
        assert_eq!(player.velocity(&world), vector![PLAYER_MAX_SPEED, 0.0]);
    }

    #[test]
    fn mark_ready_is_one_way() {
        let (_, mut player) = setup();
        assert!(player.mark_ready());
        assert!(!player.mark_ready());
        assert!(player.is_ready());
    }

    #[test]
    fn set_position_teleports_and_stops() {
        let (mut world, mut player) = setup();
        player.set_direction(vector![0.0, 1.0]);
        player.on_update(&mut world);
        player.set_position(&mut world, vector![100.0, 100.0]);
        assert_eq!(player.position(&world), vector![100.0, 100.0]);
        assert_eq!(player.velocity(&world), Vector::zeros());
        // Staged input survives the teleport
        assert_eq!(player.direction(), vector![0.0, 1.0]);
    }

    #[test]
    fn network_descriptors() {
        let (world, player) = setup();
        let full = player.to_new_network_player(&world);
        assert_eq!(full.id, 1);
        assert_eq!(full.diameter, 60.0);
        assert_eq!(full.position, Vec2Wire::new(300.0, 300.0));

        let delta = player.to_update_network_player(&world);
        assert_eq!(delta.id, 1);
        assert_eq!(delta.velocity, Vec2Wire::new(0.0, 0.0));
    }
}
