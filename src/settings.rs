//! Match settings
//!
//! Play field geometry and balance constants. Loaded from a JSON file when
//! present, defaults otherwise.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{KILL_REWARD, MIN_STEP_INTERVAL, STARTING_LIVES, STEP_SHRINK_FACTOR};

/// Tunable parameters for a single match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Play field ===
    /// Play field width (y-up coordinates, origin bottom-left)
    pub field_width: f32,
    /// Play field height
    pub field_height: f32,
    /// Height of the control strip along the bottom (buttons live here)
    pub control_zone_height: f32,
    /// Distance from the side walls that counts as touching them
    pub edge_margin: f32,
    /// An invader whose lower edge drops below this line ends the match
    pub invader_min_height: f32,

    // === Formation ===
    pub invader_rows: u32,
    pub invader_columns: u32,
    pub invader_size: Vec2,
    pub invader_spacing: Vec2,
    /// Distance travelled per formation step, both across and down
    pub invader_step: f32,
    /// Seconds between steps at the start of a match
    pub initial_step_interval: f64,
    /// Interval multiplier applied on every wall hit
    pub step_shrink_factor: f64,
    /// The interval never drops below this
    pub min_step_interval: f64,

    // === Cannon ===
    pub cannon_size: Vec2,
    /// Pixels moved per tick while a direction is held
    pub cannon_speed: f32,

    // === Bullets ===
    pub bullet_size: Vec2,
    /// Pixels per second, upward
    pub player_bullet_speed: f32,
    /// Pixels per second, downward
    pub invader_bullet_speed: f32,

    // === Rules ===
    pub starting_lives: u32,
    pub kill_reward: u64,
    /// Seed for invader fire selection
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let button_offset = 15.0;
        let button_height = 60.0;
        Self {
            field_width: 375.0,
            field_height: 667.0,
            control_zone_height: 2.0 * button_offset + button_height,
            edge_margin: 1.0,
            invader_min_height: 3.0 * button_offset + button_height,

            invader_rows: 6,
            invader_columns: 5,
            invader_size: Vec2::new(24.0, 16.0),
            invader_spacing: Vec2::new(12.0, 12.0),
            invader_step: 10.0,
            initial_step_interval: 1.0,
            step_shrink_factor: STEP_SHRINK_FACTOR,
            min_step_interval: MIN_STEP_INTERVAL,

            cannon_size: Vec2::new(30.0, 16.0),
            cannon_speed: 3.0,

            bullet_size: Vec2::new(4.0, 8.0),
            player_bullet_speed: 667.0,
            invader_bullet_speed: 300.0,

            starting_lives: STARTING_LIVES,
            kill_reward: KILL_REWARD,
            seed: 0x5EED,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Ignoring invalid settings in {}: {}", path.display(), err);
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!(
                    "Could not read settings from {}, using defaults: {}",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Clamp values that would make the simulation degenerate
    pub fn sanitized(mut self) -> Self {
        if self.min_step_interval.is_nan() || self.min_step_interval <= 0.0 {
            self.min_step_interval = MIN_STEP_INTERVAL;
        }
        if !(0.0..=1.0).contains(&self.step_shrink_factor) || self.step_shrink_factor == 0.0 {
            self.step_shrink_factor = STEP_SHRINK_FACTOR;
        }
        if self.initial_step_interval < self.min_step_interval {
            self.initial_step_interval = self.min_step_interval;
        }
        self.starting_lives = self.starting_lives.max(1);
        self
    }

    /// Where the cannon spawns (and respawns)
    pub fn cannon_start(&self) -> Vec2 {
        Vec2::new(
            self.field_width / 2.0,
            self.cannon_size.y / 2.0 + self.control_zone_height,
        )
    }

    /// Lower-left anchor of the formation (row 0 would sit here)
    pub fn formation_origin(&self) -> Vec2 {
        Vec2::new(
            self.field_width / 3.0,
            self.field_height / 2.0 + self.control_zone_height,
        )
    }
}
