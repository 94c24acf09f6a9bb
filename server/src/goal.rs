use crate::ball::BALL_DIAMETER;
use crate::physics::{PhysicsWorld, Rect};
use hockey_shared::config::GameSize;
use hockey_shared::protocol::{GoalWire, TeamSide};
use rapier2d::prelude::*;

/// Height of the goal mouth
pub const GOAL_OPENING: Real = 200.0;
/// How far the posts reach into the field
pub const GOAL_DEPTH: Real = 80.0;
pub const GOAL_WALL_THICKNESS: Real = 10.0;

/// Static collider plus the rectangle it was built from.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub collider: ColliderHandle,
    pub rect: Rect,
}

/// Rectangles making up one goal, before they are inserted into a world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalLayout {
    pub back: Rect,
    pub top: Rect,
    pub bottom: Rect,
    pub sensor: Rect,
}

impl GoalLayout {
    /// Net defended by `side`. Screen convention: `top` is the post with the
    /// smaller y.
    ///
    /// The sensor runs from the back wall's inner face to one ball diameter
    /// short of the mouth, so only a ball wholly past the posts touches it.
    pub fn new(side: TeamSide, size: &GameSize) -> Self {
        let t = GOAL_WALL_THICKNESS;
        let cy = size.height as Real / 2.0;
        let mouth_top = cy - GOAL_OPENING / 2.0;
        let mouth_bottom = cy + GOAL_OPENING / 2.0;

        let left = Self {
            back: Rect::from_edges(0.0, mouth_top, t, mouth_bottom),
            top: Rect::from_edges(0.0, mouth_top - t, GOAL_DEPTH, mouth_top),
            bottom: Rect::from_edges(0.0, mouth_bottom, GOAL_DEPTH, mouth_bottom + t),
            sensor: Rect::from_edges(t, mouth_top, GOAL_DEPTH - BALL_DIAMETER, mouth_bottom),
        };

        match side {
            TeamSide::Left => left,
            TeamSide::Right => {
                let width = size.width as Real;
                let mirror = |r: Rect| Rect { x: width - r.x, ..r };
                Self {
                    back: mirror(left.back),
                    top: mirror(left.top),
                    bottom: mirror(left.bottom),
                    sensor: mirror(left.sensor),
                }
            }
        }
    }
}

/// Net enclosure plus scoring sensor for one team. Data only.
#[derive(Debug, Clone, Copy)]
pub struct Goal {
    pub side: TeamSide,
    pub back: Obstacle,
    pub top: Obstacle,
    pub bottom: Obstacle,
    pub sensor: Obstacle,
}

impl Goal {
    pub fn build(world: &mut PhysicsWorld, side: TeamSide, size: &GameSize) -> Self {
        let layout = GoalLayout::new(side, size);
        let mut solid = |rect: Rect| Obstacle {
            collider: world.add_static_box(rect),
            rect,
        };
        let back = solid(layout.back);
        let top = solid(layout.top);
        let bottom = solid(layout.bottom);
        let sensor = Obstacle {
            collider: world.add_sensor_box(layout.sensor),
            rect: layout.sensor,
        };
        Self {
            side,
            back,
            top,
            bottom,
            sensor,
        }
    }

    pub fn to_wire(&self) -> GoalWire {
        GoalWire {
            top: self.top.rect.to_wire(),
            bottom: self.bottom.rect.to_wire(),
            back: self.back.rect.to_wire(),
            goal: self.sensor.rect.to_wire(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hockey_shared::config::PhysicsOptions;

    #[test]
    fn left_sensor_lies_behind_mouth_and_between_posts() {
        let layout = GoalLayout::new(TeamSide::Left, &GameSize::default());
        let s = layout.sensor;
        assert!(s.min_x() >= layout.back.max_x());
        assert!(s.max_x() + BALL_DIAMETER <= GOAL_DEPTH + 1e-3);
        assert!(s.min_y() >= layout.top.max_y());
        assert!(s.max_y() <= layout.bottom.min_y());
        assert!(s.width > 0.0);
    }

    #[test]
    fn right_goal_mirrors_left() {
        let size = GameSize::default();
        let left = GoalLayout::new(TeamSide::Left, &size);
        let right = GoalLayout::new(TeamSide::Right, &size);
        assert_eq!(right.sensor.x, 1200.0 - left.sensor.x);
        assert_eq!(right.sensor.y, left.sensor.y);
        assert_eq!(right.back.max_x(), 1200.0);
        assert!(right.sensor.max_x() <= right.back.min_x() + 1e-3);
    }

    #[test]
    fn goal_is_vertically_centered() {
        let layout = GoalLayout::new(TeamSide::Left, &GameSize::default());
        assert_eq!(layout.sensor.y, 300.0);
        assert_eq!(layout.top.max_y(), 200.0);
        assert_eq!(layout.bottom.min_y(), 400.0);
    }

    #[test]
    fn build_inserts_four_colliders() {
        let size = GameSize::default();
        let mut world = PhysicsWorld::new(&PhysicsOptions::default(), &size);
        let before = world.collider_count();
        let goal = Goal::build(&mut world, TeamSide::Right, &size);
        assert_eq!(world.collider_count(), before + 4);
        assert_eq!(goal.side, TeamSide::Right);

        let wire = goal.to_wire();
        assert_eq!(wire.goal.x as Real, goal.sensor.rect.x);
        assert_eq!(wire.back.width as Real, GOAL_WALL_THICKNESS);
    }
}
