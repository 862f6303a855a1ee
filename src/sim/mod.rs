//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Host-supplied monotonic clock only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod contact;
pub mod formation;
pub mod game;
pub mod state;
pub mod tick;

pub use collision::{detect_contacts, invaders_landed, is_outside_field};
pub use contact::{Contact, ContactQueue, Resolution, Signal, resolve};
pub use formation::{Direction, Formation, StepOutcome};
pub use game::{BulletSpec, Game, GamePhase, Side};
pub use state::{
    Category, EndReason, Entities, Entity, EntityId, EntityKind, InvaderKind, MatchState, Snapshot,
};
pub use tick::{TickInput, TickReport, tick};
