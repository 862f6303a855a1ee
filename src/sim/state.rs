//! Entity registry and match bookkeeping
//!
//! Liveness is registry membership: destroying an entity removes it for good,
//! and ids are never reused within a match.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Stable identity of an entity within one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Invader appearance, chosen by row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvaderKind {
    A,
    B,
    C,
}

impl InvaderKind {
    /// Variant for a 1-based row out of `rows`
    pub fn for_row(row: u32, rows: u32) -> Self {
        if row * 3 <= rows {
            InvaderKind::A
        } else if row * 3 <= rows * 2 {
            InvaderKind::B
        } else {
            InvaderKind::C
        }
    }
}

/// What an entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Invader(InvaderKind),
    PlayerCannon,
    InvaderBullet,
    PlayerBullet,
}

/// Category used for queries and contact classification (ignores invader variant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Invader,
    PlayerCannon,
    InvaderBullet,
    PlayerBullet,
}

impl EntityKind {
    pub fn category(&self) -> Category {
        match self {
            EntityKind::Invader(_) => Category::Invader,
            EntityKind::PlayerCannon => Category::PlayerCannon,
            EntityKind::InvaderBullet => Category::InvaderBullet,
            EntityKind::PlayerBullet => Category::PlayerBullet,
        }
    }
}

/// A live game object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Center position
    pub pos: Vec2,
    /// Full bounding box size
    pub size: Vec2,
    /// Velocity in pixels per second (bullets only; zero otherwise)
    pub vel: Vec2,
}

impl Entity {
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Lower-left corner of the bounding box
    pub fn min(&self) -> Vec2 {
        self.pos - self.size * 0.5
    }

    /// Upper-right corner of the bounding box
    pub fn max(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Axis-aligned overlap test (touching edges do not count)
    pub fn overlaps(&self, other: &Entity) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && b_min.x < a_max.x && a_min.y < b_max.y && b_min.y < a_max.y
    }
}

/// The set of active entities for the current match, sorted by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    entities: Vec<Entity>,
    next_id: u32,
}

impl Entities {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Add an entity and return its id
    pub fn spawn(&mut self, kind: EntityKind, pos: Vec2, size: Vec2, vel: Vec2) -> EntityId {
        // Default-constructed registries start at 0; skip it so ids stay non-zero
        let id = EntityId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        // Ids only grow, so pushing keeps the vec sorted
        self.entities.push(Entity {
            id,
            kind,
            pos,
            size,
            vel,
        });
        id
    }

    /// Lay out the invader formation (row 1 is the lowest)
    pub fn spawn_formation(&mut self, settings: &Settings) -> Vec<EntityId> {
        let origin = settings.formation_origin();
        let size = settings.invader_size;
        let mut ids = Vec::with_capacity((settings.invader_rows * settings.invader_columns) as usize);

        for row in 1..=settings.invader_rows {
            let kind = InvaderKind::for_row(row, settings.invader_rows);
            let y = row as f32 * (size.y * 2.0) + origin.y;
            for col in 0..settings.invader_columns {
                let x = origin.x + col as f32 * (size.x + settings.invader_spacing.x);
                ids.push(self.spawn(
                    EntityKind::Invader(kind),
                    Vec2::new(x, y),
                    size,
                    Vec2::ZERO,
                ));
            }
        }

        ids
    }

    /// Place a fresh cannon at the start position
    pub fn spawn_cannon(&mut self, settings: &Settings) -> EntityId {
        self.spawn(
            EntityKind::PlayerCannon,
            settings.cannon_start(),
            settings.cannon_size,
            Vec2::ZERO,
        )
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|i| &self.entities[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(|i| &mut self.entities[i])
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.index_of(id).is_some()
    }

    /// Remove an entity permanently; `None` if it was already gone
    pub fn destroy(&mut self, id: EntityId) -> Option<Entity> {
        self.index_of(id).map(|i| self.entities.remove(i))
    }

    /// Drop every entity the predicate rejects, returning the removed ids
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Entity) -> bool) -> Vec<EntityId> {
        let mut removed = Vec::new();
        self.entities.retain(|e| {
            if pred(e) {
                removed.push(e.id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// Live entities of one category, in id order
    pub fn of(&self, category: Category) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.category() == category)
    }

    pub fn of_mut(&mut self, category: Category) -> impl Iterator<Item = &mut Entity> {
        self.entities
            .iter_mut()
            .filter(move |e| e.category() == category)
    }

    pub fn count(&self, category: Category) -> usize {
        self.of(category).count()
    }

    pub fn any(&self, category: Category) -> bool {
        self.of(category).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Every invader was destroyed
    InvadersDefeated,
    /// The last life was lost
    CannonDestroyed,
    /// The formation reached the control zone
    InvadersLanded,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::InvadersDefeated => write!(f, "invaders defeated"),
            EndReason::CannonDestroyed => write!(f, "cannon destroyed"),
            EndReason::InvadersLanded => write!(f, "invaders landed"),
        }
    }
}

/// Score, lives and the end-of-match latch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub score: u64,
    /// Never decreases; raised whenever `score` passes it
    pub high_score: u64,
    pub lives: u32,
    end_reason: Option<EndReason>,
}

impl MatchState {
    pub fn new(high_score: u64, lives: u32) -> Self {
        Self {
            score: 0,
            high_score,
            lives,
            end_reason: None,
        }
    }

    /// Add points. Returns the new high score if it was beaten.
    pub fn add_score(&mut self, points: u64) -> Option<u64> {
        self.score = self.score.saturating_add(points);
        if self.score > self.high_score {
            self.high_score = self.score;
            Some(self.high_score)
        } else {
            None
        }
    }

    /// Take one life (floored at 0) and return how many remain
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Latch the end of the match. Only the first call has any effect.
    pub fn end(&mut self, reason: EndReason) -> bool {
        if self.end_reason.is_some() {
            return false;
        }
        self.end_reason = Some(reason);
        true
    }

    pub fn is_ended(&self) -> bool {
        self.end_reason.is_some()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            score: self.score,
            high_score: self.high_score,
            lives: self.lives,
        }
    }
}

/// Read-only view of the numbers a HUD shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub score: u64,
    pub high_score: u64,
    pub lives: u32,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Score: {:04}  High Score: {:04}  Lives: {}",
            self.score, self.high_score, self.lives
        )
    }
}
