//! Rigid-body world wrapping rapier2d.
//!
//! Owns every body and collider of a match and advances them with a fixed
//! timestep. Collision classification is left to callers: `step` only
//! reports which collider pairs started touching.

use hockey_shared::config::{GameSize, PhysicsOptions};
use hockey_shared::protocol::{round2, RectWire};
use rapier2d::crossbeam::channel::{unbounded, Receiver, Sender};
use rapier2d::na::Unit;
use rapier2d::prelude::*;
use std::f32::consts::{FRAC_PI_2, PI};
use std::num::NonZeroUsize;

/// Axis-aligned box in world units; `x`/`y` is the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Real,
    pub y: Real,
    pub width: Real,
    pub height: Real,
}

impl Rect {
    /// Build from edges instead of centre + size.
    pub fn from_edges(min_x: Real, min_y: Real, max_x: Real, max_y: Real) -> Self {
        Self {
            x: (min_x + max_x) / 2.0,
            y: (min_y + max_y) / 2.0,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn min_x(&self) -> Real {
        self.x - self.width / 2.0
    }

    pub fn max_x(&self) -> Real {
        self.x + self.width / 2.0
    }

    pub fn min_y(&self) -> Real {
        self.y - self.height / 2.0
    }

    pub fn max_y(&self) -> Real {
        self.y + self.height / 2.0
    }

    pub fn to_wire(&self) -> RectWire {
        RectWire {
            x: round2(self.x as f64),
            y: round2(self.y as f64),
            width: round2(self.width as f64),
            height: round2(self.height as f64),
        }
    }
}

/// Handles of a dynamic disc (player or ball).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscHandles {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// Contact material applied to every collider in the world.
#[derive(Debug, Clone, Copy)]
struct Material {
    restitution: Real,
    friction: Real,
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    material: Material,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collision_send: Sender<CollisionEvent>,
    collision_recv: Receiver<CollisionEvent>,
    contact_force_send: Sender<ContactForceEvent>,
    contact_force_recv: Receiver<ContactForceEvent>,
    bounds: Vec<ColliderHandle>,
}

impl PhysicsWorld {
    /// Create a world with the given material and four inward-facing bounds.
    pub fn new(options: &PhysicsOptions, size: &GameSize) -> Self {
        let (collision_send, collision_recv) = unbounded();
        let (contact_force_send, contact_force_recv) = unbounded();

        let mut world = Self {
            gravity: vector![options.gravity[0] as Real, options.gravity[1] as Real],
            material: Material {
                restitution: options.restitution as Real,
                friction: options.friction as Real,
            },
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collision_send,
            collision_recv,
            contact_force_send,
            contact_force_recv,
            bounds: Vec::with_capacity(4),
        };
        world.add_bounds(size.width as Real, size.height as Real);
        world
    }

    /// Four half-planes enclosing `[0, width] x [0, height]`.
    ///
    /// A rapier half-space is solid below its normal; each one starts from a
    /// +Y normal and is rotated so it points into the arena.
    fn add_bounds(&mut self, width: Real, height: Real) {
        let planes = [
            (vector![0.0, 0.0], 0.0),         // bottom, normal +Y
            (vector![0.0, height], PI),       // top, normal -Y
            (vector![0.0, 0.0], -FRAC_PI_2),  // left, normal +X
            (vector![width, 0.0], FRAC_PI_2), // right, normal -X
        ];
        for (translation, angle) in planes {
            let collider = self
                .with_material(ColliderBuilder::halfspace(Unit::new_normalize(vector![0.0, 1.0])))
                .position(Isometry::new(translation, angle))
                .build();
            let handle = self.colliders.insert(collider);
            self.bounds.push(handle);
        }
    }

    fn with_material(&self, builder: ColliderBuilder) -> ColliderBuilder {
        builder
            .restitution(self.material.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .friction(self.material.friction)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .active_events(ActiveEvents::COLLISION_EVENTS)
    }

    /// Insert a dynamic, non-rotating disc.
    pub fn add_disc(&mut self, position: Vector<Real>, diameter: Real, mass: Real) -> DiscHandles {
        let body = RigidBodyBuilder::dynamic()
            .translation(position)
            .lock_rotations()
            .linear_damping(0.0)
            .can_sleep(false)
            .ccd_enabled(true)
            .build();
        let body = self.bodies.insert(body);
        let collider = self
            .with_material(ColliderBuilder::ball(diameter / 2.0))
            .mass(mass)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        DiscHandles { body, collider }
    }

    /// Insert a fixed box that blocks moving bodies.
    pub fn add_static_box(&mut self, rect: Rect) -> ColliderHandle {
        let collider = self
            .with_material(ColliderBuilder::cuboid(rect.width / 2.0, rect.height / 2.0))
            .translation(vector![rect.x, rect.y])
            .build();
        self.colliders.insert(collider)
    }

    /// Insert a fixed box that reports overlaps without blocking anything.
    pub fn add_sensor_box(&mut self, rect: Rect) -> ColliderHandle {
        let collider = self
            .with_material(ColliderBuilder::cuboid(rect.width / 2.0, rect.height / 2.0))
            .translation(vector![rect.x, rect.y])
            .sensor(true)
            .build();
        self.colliders.insert(collider)
    }

    pub fn position(&self, body: RigidBodyHandle) -> Option<Vector<Real>> {
        self.bodies.get(body).map(|b| *b.translation())
    }

    pub fn velocity(&self, body: RigidBodyHandle) -> Option<Vector<Real>> {
        self.bodies.get(body).map(|b| *b.linvel())
    }

    pub fn set_velocity(&mut self, body: RigidBodyHandle, velocity: Vector<Real>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_linvel(velocity, true);
        }
    }

    /// Move a body and zero its velocity.
    pub fn teleport(&mut self, body: RigidBodyHandle, position: Vector<Real>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_translation(position, true);
            b.set_linvel(Vector::zeros(), true);
            b.set_angvel(0.0, true);
        }
    }

    /// Advance the world by one tick of `dt` seconds, split into at most
    /// `max_sub_steps` solver substeps. Returns the collider pairs that
    /// started touching during the step.
    pub fn step(&mut self, dt: Real, max_sub_steps: usize) -> Vec<(ColliderHandle, ColliderHandle)> {
        if !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }
        self.integration_parameters.dt = dt;
        self.integration_parameters.num_solver_iterations =
            NonZeroUsize::new(max_sub_steps).unwrap_or(NonZeroUsize::MIN);

        let events = ChannelEventCollector::new(
            self.collision_send.clone(),
            self.contact_force_send.clone(),
        );

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &events,
        );

        while self.contact_force_recv.try_recv().is_ok() {}

        let mut started = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            if event.started() {
                started.push((event.collider1(), event.collider2()));
            }
        }
        started
    }

    /// Drop every body and collider, including the bounds.
    pub fn clear(&mut self) {
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.islands = IslandManager::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.ccd_solver = CCDSolver::new();
        self.bounds.clear();
        while self.collision_recv.try_recv().is_ok() {}
        while self.contact_force_recv.try_recv().is_ok() {}
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn bounds(&self) -> &[ColliderHandle] {
        &self.bounds
    }
}
