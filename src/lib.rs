//! Space Invaders - the simulation core of an arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (formation, contacts, match bookkeeping)
//! - `settings`: Data-driven play field and balance constants
//! - `highscores`: The single persisted high score slot

pub mod highscores;
pub mod settings;
pub mod sim;

pub use highscores::{FileStore, HighScoreStore, MemoryStore, StoreError};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Host frame rate the native driver runs at
    pub const FRAME_DT: f64 = 1.0 / 60.0;
    /// Largest frame delta a single tick will integrate; longer stalls are dropped
    pub const MAX_FRAME_DT: f64 = 0.1;

    /// Starting lives for a match
    pub const STARTING_LIVES: u32 = 3;
    /// Points per destroyed invader
    pub const KILL_REWARD: u64 = 100;

    /// Formation step multiplier applied on each boundary hit
    pub const STEP_SHRINK_FACTOR: f64 = 0.8;
    /// Fastest the formation is ever allowed to step (seconds per step)
    pub const MIN_STEP_INTERVAL: f64 = 0.03;
}
