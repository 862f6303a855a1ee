//! Per-frame simulation tick
//!
//! One call per rendered frame. Order within a tick is fixed: bullets,
//! formation, contacts, cannon, firing, end-of-match check.

use super::collision::detect_contacts;
use super::contact::Resolution;
use super::formation::StepOutcome;
use super::game::{BulletSpec, Game, GamePhase, Side};
use super::state::{EndReason, EntityId};
use crate::highscores::HighScoreStore;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Left button held
    pub move_left: bool,
    /// Right button held
    pub move_right: bool,
    /// Fire button pressed this frame
    pub fire: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Everything that changed during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub formation: StepOutcome,
    pub resolution: Resolution,
    /// Bullets that left the play field
    pub expired: Vec<EntityId>,
    /// Bullets spawned this tick
    pub fired: Vec<BulletSpec>,
    /// Set on the tick the match ended
    pub ended: Option<EndReason>,
}

/// Advance the match to `now` (seconds, monotonic)
pub fn tick<S: HighScoreStore>(game: &mut Game<S>, input: &TickInput, now: f64) -> TickReport {
    let mut report = TickReport::default();

    if input.pause {
        game.toggle_pause(now);
    }

    // Don't tick if paused or game over
    if game.phase != GamePhase::Playing {
        return report;
    }

    let dt = game.frame_delta(now);
    report.expired = game.advance_bullets(dt);

    report.formation = game.advance_formation(now);

    let contacts = detect_contacts(&game.entities);
    report.resolution = game.submit_contacts(contacts);

    if !game.is_match_ended() {
        if input.move_left && !input.move_right {
            game.move_cannon(-1.0);
        } else if input.move_right && !input.move_left {
            game.move_cannon(1.0);
        }

        if input.fire {
            report.fired.extend(game.request_fire(Side::Player));
        }
        report.fired.extend(game.request_fire(Side::Invaders));

        game.check_end();
    }

    if game.is_match_ended() {
        report.ended = game.end_reason();
    }

    report
}
