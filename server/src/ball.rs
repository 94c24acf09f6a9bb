use crate::physics::{DiscHandles, PhysicsWorld};
use crate::player::to_wire;
use hockey_shared::protocol::{round2, BallUpdateWire, NewBallWire};
use rapier2d::prelude::*;

pub const BALL_DIAMETER: Real = 30.0;
pub const BALL_MASS: Real = 1.0;
/// Speed cap in pixels per second
pub const BALL_MAX_VELOCITY: Real = 900.0;
/// Horizontal speed given to the ball on kickoff after a goal
pub const BALL_KICKOFF_SPEED: Real = 300.0;
pub const BALL_COLOR: u32 = 0xffffff;

/// The puck. Shared by both players and carries no identifier.
#[derive(Debug, Clone)]
pub struct Ball {
    handles: DiscHandles,
}

impl Ball {
    pub fn new(world: &mut PhysicsWorld, position: Vector<Real>) -> Self {
        Self {
            handles: world.add_disc(position, BALL_DIAMETER, BALL_MASS),
        }
    }

    /// Clamp velocity to [`BALL_MAX_VELOCITY`]. Run before and after every step.
    pub fn on_update(&self, world: &mut PhysicsWorld) {
        let velocity = self.velocity(world);
        let speed = velocity.norm();
        if speed > BALL_MAX_VELOCITY {
            world.set_velocity(self.handles.body, velocity * (BALL_MAX_VELOCITY / speed));
        }
    }

    /// Zero the velocity, or send the ball horizontally at `signed_speed`
    /// (positive = towards the right edge).
    pub fn reset_velocity(&self, world: &mut PhysicsWorld, signed_speed: Option<Real>) {
        let velocity = match signed_speed {
            Some(speed) => vector![speed, 0.0],
            None => Vector::zeros(),
        };
        world.set_velocity(self.handles.body, velocity);
    }

    pub fn set_position(&self, world: &mut PhysicsWorld, position: Vector<Real>) {
        world.teleport(self.handles.body, position);
    }

    pub fn position(&self, world: &PhysicsWorld) -> Vector<Real> {
        world.position(self.handles.body).unwrap_or_else(Vector::zeros)
    }

    pub fn velocity(&self, world: &PhysicsWorld) -> Vector<Real> {
        world.velocity(self.handles.body).unwrap_or_else(Vector::zeros)
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.handles.body
    }

    pub fn collider(&self) -> ColliderHandle {
        self.handles.collider
    }

    pub fn to_ball_update(&self, world: &PhysicsWorld) -> BallUpdateWire {
        BallUpdateWire {
            position: to_wire(self.position(world)),
            velocity: to_wire(self.velocity(world)),
        }
    }

    pub fn to_new_ball(&self, world: &PhysicsWorld) -> NewBallWire {
        NewBallWire {
            color: BALL_COLOR,
            diameter: round2(BALL_DIAMETER as f64),
            mass: round2(BALL_MASS as f64),
            max_velocity: round2(BALL_MAX_VELOCITY as f64),
            position: to_wire(self.position(world)),
        }
    }
}
