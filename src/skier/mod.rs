// ┌──────────────────────────────────────────────────────────────────────┐
// │                           skier/                                     │
// ├──────────────────┬───────────────────────────────────────────────────┤
// │ mod.rs           │ Skier: physics, steering, crash + score state     │
// │ pose.rs          │ Poses: angle + sprite per steering position       │
// │ state.rs         │ Condition: skiing / fallen / recovering / done    │
// │ keyboard.rs      │ Keyboard layouts and the pool skiers lock from    │
// └──────────────────┴───────────────────────────────────────────────────┘
pub mod keyboard;
pub mod pose;
pub mod state;

use crate::config::WorldConfig;
use crate::engine::input::KeyState;
use crate::engine::{Point, Rect, Size};
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use uuid::Uuid;

use self::keyboard::Keyboard;
use self::pose::{Pose, Poses};
use self::state::{Condition, Event};

pub struct Skier {
    id: Uuid,
    keyboard: Keyboard,
    // every skier shares the same table
    poses: Rc<Poses>,
    pose: usize,

    position: Point,
    velocity: Point,
    bounding_box: Rect,
    collision_box: Rect,
    condition: Condition,

    score: usize,
    last_scored_gate: Option<usize>,
}

impl Skier {
    pub const COLLISION_BOX_SIZE: f64 = 15.0;
    /// collision box sits this far below the sprite's center
    pub const COLLISION_BOX_DROP: f64 = 5.0;

    /// Starts facing straight downhill, `velocity` keeps its speed but is
    /// turned to match
    pub fn new(id: Uuid, keyboard: Keyboard, poses: Rc<Poses>, position: Point, velocity: Point) -> Self {
        let pose = poses.initial();
        let mut skier = Skier {
            id,
            keyboard,
            poses,
            pose,
            position,
            velocity,
            bounding_box: Rect::default(),
            collision_box: Rect::default(),
            condition: Condition::Skiing,
            score: 0,
            last_scored_gate: None,
        };
        skier.set_pose(pose as isize);
        skier.place_boxes();
        skier
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn pose(&self) -> &Pose {
        self.poses.get(self.pose)
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn bounding_box(&self) -> Rect {
        self.bounding_box
    }

    pub fn collision_box(&self) -> Rect {
        self.collision_box
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn is_down(&self) -> bool {
        self.condition.is_down()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at().is_some()
    }

    pub fn finished_at(&self) -> Option<f64> {
        self.condition.finished_at()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn last_scored_gate(&self) -> Option<usize> {
        self.last_scored_gate
    }

    /// Sprite size for the current frame, down sprite included
    pub fn sprite_size(&self) -> Size {
        if self.is_down() {
            self.poses.down_size()
        } else {
            self.pose().size
        }
    }

    pub fn turn_left(&mut self) {
        if self.is_down() {
            return;
        }
        self.set_pose(self.pose as isize - 1);
    }

    pub fn turn_right(&mut self) {
        if self.is_down() {
            return;
        }
        self.set_pose(self.pose as isize + 1);
    }

    pub fn steer(&mut self, keys: &KeyState) {
        if self.keyboard.is_turning_left(keys) {
            self.turn_left();
        }
        if self.keyboard.is_turning_right(keys) {
            self.turn_right();
        }
    }

    /// Switch pose, keeping the speed but pointing it along the new skis
    fn set_pose(&mut self, index: isize) {
        self.pose = self.poses.clamp(index);
        let pose = self.poses.get(self.pose);
        self.velocity = pose.direction() * self.velocity.length();
        self.bounding_box = self.bounding_box.with_size(pose.size).with_center(self.position);
    }

    /// Gravity along the slope projected on the skis, minus friction
    pub fn acceleration(&self, config: &WorldConfig) -> Point {
        let angle = self.pose().angle.to_radians();
        Point::new(
            0.5 * config.gravity * (2.0 * angle).sin(),
            config.gravity * angle.cos().powi(2),
        ) - self.velocity * config.friction
    }

    /// One step of `dt` simulated seconds
    pub fn update(&mut self, dt: f64, config: &WorldConfig) {
        if self.is_finished() {
            return;
        }

        if !self.is_down() {
            let acceleration = self.acceleration(config);
            self.velocity += acceleration * dt;
            self.position += self.velocity * dt;

            // keep the whole sprite on the slope
            let half_width = self.bounding_box.width() / 2.0;
            let min_x = half_width;
            let max_x = config.width - half_width;
            if self.position.x < min_x || self.position.x > max_x {
                self.position.x = self.position.x.max(min_x).min(max_x);
                self.velocity.x = 0.0;
            }
        }

        self.condition = self.condition.transition(Event::Tick(dt));
        self.place_boxes();
    }

    fn place_boxes(&mut self) {
        self.bounding_box = self.bounding_box.with_center(self.position);
        self.collision_box = Rect::new(
            Point::default(),
            Size::new(Self::COLLISION_BOX_SIZE, Self::COLLISION_BOX_SIZE),
        )
        .with_mid_bottom(self.position)
        .translated(0.0, Self::COLLISION_BOX_DROP);
    }

    /// Knock the skier down. Does nothing unless they are skiing normally,
    /// so returns whether the crash happened.
    pub fn crash(&mut self) -> bool {
        if !self.condition.can_crash() {
            return false;
        }
        self.velocity = Point::default();
        self.condition = self.condition.transition(Event::Crash);
        true
    }

    /// Count gate `gate`, unless it was the last one counted
    pub fn score_gate(&mut self, gate: usize) -> bool {
        if self.last_scored_gate == Some(gate) {
            return false;
        }
        self.score += 1;
        self.last_scored_gate = Some(gate);
        true
    }

    pub fn finish(&mut self, millis: f64) {
        self.condition = self.condition.transition(Event::Finish(millis));
    }
}

impl PartialEq for Skier {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Skier {}

impl Hash for Skier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
