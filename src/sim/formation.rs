//! Invader formation movement
//!
//! The whole swarm moves as one unit on a fixed cadence. Hitting a side wall
//! costs one full step of pure descent before the swarm heads back the other
//! way, and every wall hit makes the cadence faster (down to a floor).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Category, Entities};
use crate::settings::Settings;

/// Direction the formation will move on its next step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Left,
    /// Drop one step now, head left on the step after
    DescendThenLeft,
    /// Drop one step now, head right on the step after
    DescendThenRight,
    /// Frozen; the formation no longer moves
    None,
}

impl Direction {
    /// Offset applied to every invader for one step of size `step`
    pub fn displacement(self, step: f32) -> Vec2 {
        match self {
            Direction::Right => Vec2::new(step, 0.0),
            Direction::Left => Vec2::new(-step, 0.0),
            Direction::DescendThenLeft | Direction::DescendThenRight => Vec2::new(0.0, -step),
            Direction::None => Vec2::ZERO,
        }
    }
}

/// What a call to [`Formation::step`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Offset applied to every live invader (zero when the step did not fire)
    pub displacement: Vec2,
    /// Number of invaders moved
    pub moved: usize,
    /// Set when this step changed the direction
    pub new_direction: Option<Direction>,
}

impl StepOutcome {
    pub fn idle() -> Self {
        Self {
            displacement: Vec2::ZERO,
            moved: 0,
            new_direction: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.moved == 0 && self.new_direction.is_none()
    }
}

impl Default for StepOutcome {
    fn default() -> Self {
        Self::idle()
    }
}

/// Collective movement state of the invader swarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    direction: Direction,
    /// Seconds between steps; never increases during a match
    step_interval: f64,
    time_of_last_step: f64,
    /// Set while the host has the match paused
    paused_at: Option<f64>,
}

impl Formation {
    /// Formation heading right, with its step clock starting at `now`
    pub fn new(settings: &Settings, now: f64) -> Self {
        Self {
            direction: Direction::Right,
            step_interval: settings.initial_step_interval,
            time_of_last_step: now,
            paused_at: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn step_interval(&self) -> f64 {
        self.step_interval
    }

    pub fn time_of_last_step(&self) -> f64 {
        self.time_of_last_step
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Whether a step would fire at `now`
    pub fn is_due(&self, now: f64) -> bool {
        self.paused_at.is_none() && now - self.time_of_last_step >= self.step_interval
    }

    /// Advance the formation if its interval has elapsed
    pub fn step(&mut self, now: f64, entities: &mut Entities, settings: &Settings) -> StepOutcome {
        if !self.is_due(now) || !entities.any(Category::Invader) {
            return StepOutcome::idle();
        }

        // Direction must be settled before anything moves
        let previous = self.direction;
        self.resolve_direction(entities, settings);

        let displacement = self.direction.displacement(settings.invader_step);
        let mut moved = 0;
        if displacement != Vec2::ZERO {
            for invader in entities.of_mut(Category::Invader) {
                invader.pos += displacement;
                moved += 1;
            }
        }

        self.time_of_last_step = now;

        let new_direction = (self.direction != previous).then_some(self.direction);
        if let Some(direction) = new_direction {
            log::debug!(
                "Formation turned {:?} -> {:?} (interval {:.3}s)",
                previous,
                direction,
                self.step_interval
            );
        }

        StepOutcome {
            displacement,
            moved,
            new_direction,
        }
    }

    fn resolve_direction(&mut self, entities: &Entities, settings: &Settings) {
        match self.direction {
            Direction::Right => {
                let wall = settings.field_width - settings.edge_margin;
                if entities.of(Category::Invader).any(|e| e.max().x >= wall) {
                    self.direction = Direction::DescendThenLeft;
                    self.speed_up(settings);
                }
            }
            Direction::Left => {
                let wall = settings.edge_margin;
                if entities.of(Category::Invader).any(|e| e.min().x <= wall) {
                    self.direction = Direction::DescendThenRight;
                    self.speed_up(settings);
                }
            }
            Direction::DescendThenLeft => self.direction = Direction::Left,
            Direction::DescendThenRight => self.direction = Direction::Right,
            Direction::None => {}
        }
    }

    fn speed_up(&mut self, settings: &Settings) {
        let shrunk = (self.step_interval * settings.step_shrink_factor).max(settings.min_step_interval);
        if shrunk < self.step_interval {
            self.step_interval = shrunk;
        }
    }

    /// Stop the step clock; nothing fires until [`Formation::resume`]
    pub fn pause(&mut self, now: f64) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Restart the step clock. Time spent paused does not count toward the next step.
    pub fn resume(&mut self, now: f64) {
        if let Some(at) = self.paused_at.take() {
            self.time_of_last_step += (now - at).max(0.0);
        }
    }

    /// Freeze the formation for good
    pub fn halt(&mut self) {
        self.direction = Direction::None;
    }
}
