//! Match facade
//!
//! Owns everything one match needs and exposes the operations a host calls:
//! advance the formation, submit contacts, request fire, query state. The
//! host drives it with a monotonic clock; see [`super::tick`] for the
//! per-frame ordering.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{detect_contacts, invaders_landed, is_outside_field, max_bullet_travel};
use super::contact::{self, Contact, ContactQueue, Resolution, Signal};
use super::formation::{Formation, StepOutcome};
use super::state::{Category, EndReason, Entities, EntityId, EntityKind, MatchState, Snapshot};
use crate::consts::MAX_FRAME_DT;
use crate::highscores::HighScoreStore;
use crate::settings::Settings;

/// Current phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Host paused; nothing advances
    Paused,
    /// Match ended (latched)
    GameOver,
}

/// Who is shooting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Player,
    Invaders,
}

impl Side {
    fn bullet(self) -> EntityKind {
        match self {
            Side::Player => EntityKind::PlayerBullet,
            Side::Invaders => EntityKind::InvaderBullet,
        }
    }
}

/// A bullet that was just spawned, for the host to render
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulletSpec {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub vel: Vec2,
}

/// One match in progress
pub struct Game<S: HighScoreStore> {
    pub settings: Settings,
    pub entities: Entities,
    pub formation: Formation,
    pub state: MatchState,
    pub phase: GamePhase,
    contacts: ContactQueue,
    rng: Pcg32,
    store: S,
    last_tick: f64,
}

impl<S: HighScoreStore> Game<S> {
    /// Set up a fresh match starting at `now`
    pub fn new(settings: Settings, store: S, now: f64) -> Self {
        let settings = settings.sanitized();

        let high_score = store.load().unwrap_or_else(|err| {
            log::warn!("Could not load high score, starting from 0: {}", err);
            0
        });

        let mut entities = Entities::new();
        entities.spawn_formation(&settings);
        entities.spawn_cannon(&settings);

        log::info!(
            "Match started: {} invaders, {} lives, high score {}",
            entities.count(Category::Invader),
            settings.starting_lives,
            high_score
        );

        Self {
            formation: Formation::new(&settings, now),
            state: MatchState::new(high_score, settings.starting_lives),
            phase: GamePhase::Playing,
            contacts: ContactQueue::new(),
            rng: Pcg32::seed_from_u64(settings.seed),
            entities,
            settings,
            store,
            last_tick: now,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_match_ended(&self) -> bool {
        self.state.is_ended()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.state.end_reason()
    }

    pub fn query_state(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Seconds since the previous frame, clamped
    pub(crate) fn frame_delta(&mut self, now: f64) -> f64 {
        let dt = (now - self.last_tick).clamp(0.0, MAX_FRAME_DT);
        self.last_tick = now;
        dt
    }

    // === Pause ===

    pub fn pause(&mut self, now: f64) {
        if self.phase == GamePhase::Playing {
            self.phase = GamePhase::Paused;
            self.formation.pause(now);
            log::info!("Paused");
        }
    }

    pub fn resume(&mut self, now: f64) {
        if self.phase == GamePhase::Paused {
            self.phase = GamePhase::Playing;
            self.formation.resume(now);
            self.last_tick = now;
            log::info!("Resumed");
        }
    }

    pub fn toggle_pause(&mut self, now: f64) {
        match self.phase {
            GamePhase::Playing => self.pause(now),
            GamePhase::Paused => self.resume(now),
            GamePhase::GameOver => {}
        }
    }

    // === Formation ===

    /// Step the formation if it is due
    pub fn advance_formation(&mut self, now: f64) -> StepOutcome {
        if self.phase != GamePhase::Playing {
            return StepOutcome::idle();
        }
        self.formation.step(now, &mut self.entities, &self.settings)
    }

    // === Contacts ===

    /// Queue a contact for the next resolution. False if the pair is already queued.
    pub fn queue_contact(&mut self, contact: Contact) -> bool {
        self.contacts.push(contact)
    }

    /// Resolve a batch (plus anything already queued) and act on the signals
    pub fn submit_contacts(&mut self, batch: impl IntoIterator<Item = Contact>) -> Resolution {
        if self.state.is_ended() {
            self.contacts.take();
            return Resolution::default();
        }

        self.contacts.extend(batch);
        let mut resolution = contact::resolve(
            &mut self.contacts,
            &mut self.entities,
            &mut self.state,
            &self.settings,
        );

        for signal in &resolution.signals {
            match *signal {
                Signal::RespawnCannon => {
                    self.entities.spawn_cannon(&self.settings);
                    log::debug!("Cannon respawned, {} lives left", self.state.lives);
                }
                Signal::PersistHighScore(value) => self.persist(value),
                Signal::MatchEnded(reason) => self.on_ended(reason),
            }
        }

        if let Some(reason) = self.check_end() {
            resolution.signals.push(Signal::MatchEnded(reason));
        }

        resolution
    }

    fn persist(&mut self, high_score: u64) {
        if let Err(err) = self.store.save(high_score) {
            log::warn!("Failed to save high score {}: {}", high_score, err);
        }
    }

    // === Firing ===

    /// Spawn a bullet for `side` unless one of its bullets is already live
    pub fn request_fire(&mut self, side: Side) -> Option<BulletSpec> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let kind = side.bullet();
        if self.entities.any(kind.category()) {
            return None;
        }

        let bullet_size = self.settings.bullet_size;
        let (pos, vel) = match side {
            Side::Player => {
                let cannon = self.entities.of(Category::PlayerCannon).next()?;
                (
                    Vec2::new(cannon.pos.x, cannon.pos.y + cannon.size.y - bullet_size.y / 2.0),
                    Vec2::new(0.0, self.settings.player_bullet_speed),
                )
            }
            Side::Invaders => {
                let count = self.entities.count(Category::Invader);
                if count == 0 {
                    return None;
                }
                let pick = self.rng.random_range(0..count);
                let shooter = self.entities.of(Category::Invader).nth(pick)?;
                (
                    Vec2::new(
                        shooter.pos.x,
                        shooter.pos.y - shooter.size.y / 2.0 + bullet_size.y / 2.0,
                    ),
                    Vec2::new(0.0, -self.settings.invader_bullet_speed),
                )
            }
        };

        let id = self.entities.spawn(kind, pos, bullet_size, vel);
        log::debug!("{:?} fired {} from ({:.1}, {:.1})", side, id, pos.x, pos.y);
        Some(BulletSpec { id, kind, pos, vel })
    }

    /// Move bullets by `dt` seconds and drop the ones that left the field
    ///
    /// Movement is split into sub-steps short enough that no bullet can jump
    /// over a target. Contacts found along the way are queued for the next
    /// [`Self::submit_contacts`], and a bullet that struck something stops
    /// where it hit.
    pub fn advance_bullets(&mut self, dt: f64) -> Vec<EntityId> {
        let speed = self
            .settings
            .player_bullet_speed
            .abs()
            .max(self.settings.invader_bullet_speed.abs());
        let travel = speed * dt.max(0.0) as f32;
        let steps = (travel / max_bullet_travel(&self.settings)).ceil().max(1.0) as u32;
        let sub_dt = (dt / steps as f64) as f32;

        for _ in 0..steps {
            let struck = self.queue_bullet_contacts();
            for category in [Category::PlayerBullet, Category::InvaderBullet] {
                for bullet in self.entities.of_mut(category) {
                    if !struck.contains(&bullet.id) {
                        bullet.pos += bullet.vel * sub_dt;
                    }
                }
            }
        }
        self.queue_bullet_contacts();

        let settings = &self.settings;
        self.entities.remove_where(|e| {
            matches!(e.category(), Category::PlayerBullet | Category::InvaderBullet)
                && is_outside_field(e, settings)
        })
    }

    /// Queue every bullet-vs-target overlap; returns the bullets involved
    fn queue_bullet_contacts(&mut self) -> Vec<EntityId> {
        let found = detect_contacts(&self.entities);
        let struck = found.iter().map(|contact| contact.a).collect();
        self.contacts.extend(found);
        struck
    }

    // === Cannon ===

    /// Nudge the cannon one tick's worth left (negative) or right (positive)
    pub fn move_cannon(&mut self, direction: f32) {
        if self.phase != GamePhase::Playing || direction == 0.0 {
            return;
        }
        let speed = self.settings.cannon_speed;
        let margin = self.settings.edge_margin;
        let right_wall = self.settings.field_width - margin;

        for cannon in self.entities.of_mut(Category::PlayerCannon) {
            if direction < 0.0 && cannon.min().x > margin {
                cannon.pos.x -= speed;
            } else if direction > 0.0 && cannon.max().x < right_wall {
                cannon.pos.x += speed;
            }
        }
    }

    // === End of match ===

    /// Evaluate the end conditions; returns the reason if the match just ended
    pub fn check_end(&mut self) -> Option<EndReason> {
        if self.state.is_ended() {
            return None;
        }

        let reason = if !self.entities.any(Category::Invader) {
            EndReason::InvadersDefeated
        } else if !self.entities.any(Category::PlayerCannon) && self.state.lives == 0 {
            EndReason::CannonDestroyed
        } else if invaders_landed(&self.entities, &self.settings) {
            EndReason::InvadersLanded
        } else {
            return None;
        };

        self.state.end(reason).then(|| {
            self.on_ended(reason);
            reason
        })
    }

    fn on_ended(&mut self, reason: EndReason) {
        self.phase = GamePhase::GameOver;
        self.formation.halt();
        self.contacts.take();
        log::info!("Match over ({}): {}", reason, self.state.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::{MemoryStore, StoreError};
    use crate::sim::formation::Direction;
    use crate::sim::state::InvaderKind;

    fn game() -> Game<MemoryStore> {
        Game::new(Settings::default(), MemoryStore::default(), 0.0)
    }

    fn single_invader_game(high_score: u64) -> Game<MemoryStore> {
        let settings = Settings {
            invader_rows: 1,
            invader_columns: 1,
            ..Default::default()
        };
        Game::new(settings, MemoryStore::new(high_score), 0.0)
    }

    fn first(game: &Game<impl HighScoreStore>, category: Category) -> EntityId {
        game.entities.of(category).next().unwrap().id
    }

    struct FailingStore;

    impl HighScoreStore for FailingStore {
        fn load(&self) -> Result<u64, StoreError> {
            Err(StoreError::Io(std::io::Error::other("no storage")))
        }

        fn save(&mut self, _high_score: u64) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_new_match_layout() {
        let game = Game::new(Settings::default(), MemoryStore::new(500), 0.0);
        assert_eq!(game.entities.count(Category::Invader), 30);
        assert_eq!(game.entities.count(Category::PlayerCannon), 1);
        assert_eq!(
            game.query_state(),
            Snapshot {
                score: 0,
                high_score: 500,
                lives: 3
            }
        );
        assert!(!game.is_match_ended());
    }

    #[test]
    fn test_cannon_hit_respawns_cannon() {
        let mut game = Game::new(Settings::default(), MemoryStore::new(500), 0.0);
        let cannon = first(&game, Category::PlayerCannon);
        let bullet = game.request_fire(Side::Invaders).unwrap();

        let out = game.submit_contacts([Contact::new(cannon, bullet.id)]);

        assert_eq!(game.state.lives, 2);
        assert!(out.contains(Signal::RespawnCannon));
        assert!(!game.is_match_ended());
        let respawned = game.entities.of(Category::PlayerCannon).next().unwrap();
        assert_ne!(respawned.id, cannon);
        assert_eq!(respawned.pos, game.settings.cannon_start());
    }

    #[test]
    fn test_last_kill_ends_match() {
        let mut game = single_invader_game(0);
        let invader = first(&game, Category::Invader);
        let bullet = game.request_fire(Side::Player).unwrap();

        let out = game.submit_contacts([Contact::new(invader, bullet.id)]);

        assert!(game.is_match_ended());
        assert_eq!(game.end_reason(), Some(EndReason::InvadersDefeated));
        assert_eq!(game.phase, GamePhase::GameOver);
        assert!(out.contains(Signal::MatchEnded(EndReason::InvadersDefeated)));
        assert!(out.contains(Signal::PersistHighScore(100)));
        assert_eq!(game.store().load().unwrap(), 100);
        assert_eq!(game.store().saves, 1);
    }

    #[test]
    fn test_losing_every_life_ends_match_once() {
        let mut game = game();
        let mut ended_signals = 0;

        for _ in 0..3 {
            let cannon = first(&game, Category::PlayerCannon);
            let bullet = game.request_fire(Side::Invaders).unwrap();
            let out = game.submit_contacts([Contact::new(bullet.id, cannon)]);
            ended_signals += out
                .signals
                .iter()
                .filter(|s| matches!(s, Signal::MatchEnded(_)))
                .count();
        }

        assert_eq!(ended_signals, 1);
        assert_eq!(game.state.lives, 0);
        assert_eq!(game.end_reason(), Some(EndReason::CannonDestroyed));
        assert!(!game.entities.any(Category::PlayerCannon));
        assert_eq!(game.formation.direction(), Direction::None);
    }

    #[test]
    fn test_queued_contacts_resolve_with_next_batch() {
        let mut game = game();
        let invader = first(&game, Category::Invader);
        let bullet = game.request_fire(Side::Player).unwrap();

        assert!(game.queue_contact(Contact::new(invader, bullet.id)));
        assert!(!game.queue_contact(Contact::new(bullet.id, invader)));

        let out = game.submit_contacts(Vec::<Contact>::new());
        assert_eq!(out.destroyed, vec![invader, bullet.id]);
        assert_eq!(game.query_state().score, 100);
    }

    #[test]
    fn test_one_bullet_per_side() {
        let mut game = game();
        assert!(game.request_fire(Side::Player).is_some());
        assert!(game.request_fire(Side::Player).is_none());
        assert!(game.request_fire(Side::Invaders).is_some());
        assert!(game.request_fire(Side::Invaders).is_none());
        assert_eq!(game.entities.count(Category::PlayerBullet), 1);
        assert_eq!(game.entities.count(Category::InvaderBullet), 1);
    }

    #[test]
    fn test_player_bullet_spawns_above_cannon() {
        let mut game = game();
        let bullet = game.request_fire(Side::Player).unwrap();
        // 98 + 16 - 4
        assert_eq!(bullet.pos, Vec2::new(187.5, 110.0));
        assert!(bullet.vel.y > 0.0);
    }

    #[test]
    fn test_invader_fire_is_seeded() {
        let mut a = game();
        let mut b = game();
        for _ in 0..10 {
            let shot_a = a.request_fire(Side::Invaders).unwrap();
            let shot_b = b.request_fire(Side::Invaders).unwrap();
            assert_eq!(shot_a.pos, shot_b.pos);
            a.entities.destroy(shot_a.id);
            b.entities.destroy(shot_b.id);
        }
    }

    #[test]
    fn test_no_player_fire_without_cannon() {
        let mut game = game();
        let cannon = first(&game, Category::PlayerCannon);
        game.entities.destroy(cannon);
        assert!(game.request_fire(Side::Player).is_none());
    }

    #[test]
    fn test_bullets_expire_off_field() {
        let mut game = game();
        // Clear of the formation's leftmost column
        for _ in 0..200 {
            game.move_cannon(-1.0);
        }
        let bullet = game.request_fire(Side::Player).unwrap();

        let mut expired = Vec::new();
        for _ in 0..20 {
            expired.extend(game.advance_bullets(0.1));
        }
        assert_eq!(expired, vec![bullet.id]);
        assert!(game.request_fire(Side::Player).is_some());
    }

    #[test]
    fn test_slow_frames_do_not_skip_invaders() {
        for dt in [0.05, 0.1] {
            let mut game = game();
            game.entities = Entities::new();
            game.entities.spawn_cannon(&game.settings);
            let invader = game.entities.spawn(
                EntityKind::Invader(InvaderKind::A),
                Vec2::new(187.5, 400.0),
                game.settings.invader_size,
                Vec2::ZERO,
            );
            let bullet = game.entities.spawn(
                EntityKind::PlayerBullet,
                Vec2::new(187.5, 380.0),
                game.settings.bullet_size,
                Vec2::new(0.0, game.settings.player_bullet_speed),
            );

            let mut expired = Vec::new();
            for _ in 0..20 {
                expired.extend(game.advance_bullets(dt));
                game.submit_contacts(detect_contacts(&game.entities));
                if game.is_match_ended() {
                    break;
                }
            }

            assert!(expired.is_empty(), "dt {dt}: bullet left the field");
            assert!(!game.entities.is_live(invader), "dt {dt}");
            assert!(!game.entities.is_live(bullet), "dt {dt}");
            assert_eq!(game.query_state().score, 100, "dt {dt}");
            assert_eq!(game.end_reason(), Some(EndReason::InvadersDefeated));
        }
    }

    #[test]
    fn test_slow_frames_do_not_skip_cannon() {
        let mut game = game();
        let cannon = first(&game, Category::PlayerCannon);
        // One 30 px jump per frame would carry it from above the cannon to below
        game.entities.spawn(
            EntityKind::InvaderBullet,
            Vec2::new(187.5, 145.0),
            game.settings.bullet_size,
            Vec2::new(0.0, -game.settings.invader_bullet_speed),
        );

        let mut out = Resolution::default();
        for _ in 0..5 {
            game.advance_bullets(0.1);
            out.merge(game.submit_contacts(detect_contacts(&game.entities)));
        }

        assert_eq!(game.state.lives, 2);
        assert!(out.destroyed.contains(&cannon));
        assert!(out.contains(Signal::RespawnCannon));
    }

    #[test]
    fn test_cannon_stops_at_walls() {
        let mut game = game();
        for _ in 0..200 {
            game.move_cannon(-1.0);
        }
        let cannon = game.entities.of(Category::PlayerCannon).next().unwrap();
        assert!(cannon.min().x <= game.settings.edge_margin);
        assert!(cannon.min().x > game.settings.edge_margin - game.settings.cannon_speed);

        for _ in 0..200 {
            game.move_cannon(1.0);
        }
        let cannon = game.entities.of(Category::PlayerCannon).next().unwrap();
        let wall = game.settings.field_width - game.settings.edge_margin;
        assert!(cannon.max().x >= wall);
        assert!(cannon.max().x < wall + game.settings.cannon_speed);
    }

    #[test]
    fn test_landing_ends_match() {
        let settings = Settings {
            invader_min_height: 500.0,
            ..Default::default()
        };
        let mut game = Game::new(settings, MemoryStore::default(), 0.0);
        assert_eq!(game.check_end(), Some(EndReason::InvadersLanded));
        assert_eq!(game.check_end(), None);
    }

    #[test]
    fn test_nothing_happens_after_end() {
        let mut game = single_invader_game(0);
        let invader = first(&game, Category::Invader);
        let bullet = game.request_fire(Side::Player).unwrap();
        game.submit_contacts([Contact::new(invader, bullet.id)]);
        assert!(game.is_match_ended());

        assert!(game.request_fire(Side::Player).is_none());
        assert!(game.advance_formation(100.0).is_idle());
        let cannon = first(&game, Category::PlayerCannon);
        assert_eq!(game.submit_contacts([Contact::new(cannon, cannon)]), Resolution::default());
    }

    #[test]
    fn test_paused_game_does_not_fire_or_step() {
        let mut game = game();
        game.pause(0.5);
        assert!(game.request_fire(Side::Player).is_none());
        assert!(game.advance_formation(3.0).is_idle());
        game.resume(3.0);
        // 0.5s played before the pause
        assert!(game.advance_formation(3.4).is_idle());
        assert!(!game.advance_formation(3.5).is_idle());
    }

    #[test]
    fn test_store_failures_are_not_fatal() {
        let settings = Settings {
            invader_rows: 1,
            invader_columns: 2,
            ..Default::default()
        };
        let mut game = Game::new(settings, FailingStore, 0.0);
        assert_eq!(game.state.high_score, 0);

        let invader = first(&game, Category::Invader);
        let bullet = game.request_fire(Side::Player).unwrap();
        let out = game.submit_contacts([Contact::new(invader, bullet.id)]);

        assert!(out.contains(Signal::PersistHighScore(100)));
        assert_eq!(game.state.high_score, 100);
        assert!(!game.is_match_ended());
    }
}
