//! Contact resolution
//!
//! Contacts are gathered during a tick and resolved in one batch, in the
//! order they arrived. Anything a contact refers to may already have been
//! destroyed by an earlier contact in the same batch; such contacts are
//! dropped without side effects.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::state::{Category, EndReason, Entities, Entity, EntityId, MatchState};
use crate::settings::Settings;

/// Two entities found overlapping during a tick (unordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
}

impl Contact {
    pub fn new(a: EntityId, b: EntityId) -> Self {
        Self { a, b }
    }

    /// Order-independent identity of the pair
    pub fn key(&self) -> (EntityId, EntityId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

/// Pending contacts for one tick; each pair is queued at most once
#[derive(Debug, Clone, Default)]
pub struct ContactQueue {
    contacts: Vec<Contact>,
    seen: HashSet<(EntityId, EntityId)>,
}

impl ContactQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a contact. Returns false if the same pair is already queued.
    pub fn push(&mut self, contact: Contact) -> bool {
        if !self.seen.insert(contact.key()) {
            return false;
        }
        self.contacts.push(contact);
        true
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter()
    }

    /// Take every queued contact in arrival order, leaving the queue empty
    pub fn take(&mut self) -> Vec<Contact> {
        self.seen.clear();
        std::mem::take(&mut self.contacts)
    }
}

impl Extend<Contact> for ContactQueue {
    fn extend<I: IntoIterator<Item = Contact>>(&mut self, iter: I) {
        for contact in iter {
            self.push(contact);
        }
    }
}

impl IntoIterator for ContactQueue {
    type Item = Contact;
    type IntoIter = std::vec::IntoIter<Contact>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.into_iter()
    }
}

impl FromIterator<Contact> for ContactQueue {
    fn from_iter<I: IntoIterator<Item = Contact>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

/// Advisory outcome for the host to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// A life was lost but some remain; put a fresh cannon at the start position
    RespawnCannon,
    /// The high score was beaten; store this value
    PersistHighScore(u64),
    MatchEnded(EndReason),
}

/// Everything one batch of contacts changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Entities removed, in the order they were destroyed
    pub destroyed: Vec<EntityId>,
    pub score_delta: u64,
    pub lives_lost: u32,
    pub signals: Vec<Signal>,
}

impl Resolution {
    pub fn contains(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }

    /// High score values to persist, in order
    pub fn persisted(&self) -> impl Iterator<Item = u64> + '_ {
        self.signals.iter().filter_map(|s| match s {
            Signal::PersistHighScore(value) => Some(*value),
            _ => None,
        })
    }

    /// Fold a later resolution into this one
    pub fn merge(&mut self, other: Resolution) {
        self.destroyed.extend(other.destroyed);
        self.score_delta += other.score_delta;
        self.lives_lost += other.lives_lost;
        self.signals.extend(other.signals);
    }
}

/// The two contact pairs that mean anything
enum Hit {
    /// An invader bullet struck the cannon
    Cannon,
    /// A player bullet struck an invader
    Invader,
}

fn classify(a: &Entity, b: &Entity) -> Option<Hit> {
    let pair = if a.category() <= b.category() {
        (a.category(), b.category())
    } else {
        (b.category(), a.category())
    };
    match pair {
        (Category::PlayerCannon, Category::InvaderBullet) => Some(Hit::Cannon),
        (Category::Invader, Category::PlayerBullet) => Some(Hit::Invader),
        _ => None,
    }
}

/// Resolve every queued contact once, in arrival order, and clear the queue
pub fn resolve(
    queue: &mut ContactQueue,
    entities: &mut Entities,
    state: &mut MatchState,
    settings: &Settings,
) -> Resolution {
    let mut out = Resolution::default();

    for contact in queue.take() {
        if state.is_ended() {
            break;
        }

        let hit = match (entities.get(contact.a), entities.get(contact.b)) {
            (Some(a), Some(b)) => classify(a, b),
            _ => {
                log::trace!("Skipping stale contact {} / {}", contact.a, contact.b);
                continue;
            }
        };
        let Some(hit) = hit else {
            continue;
        };

        entities.destroy(contact.a);
        entities.destroy(contact.b);
        out.destroyed.push(contact.a);
        out.destroyed.push(contact.b);

        match hit {
            Hit::Cannon => {
                out.lives_lost += 1;
                if state.lose_life() > 0 {
                    out.signals.push(Signal::RespawnCannon);
                } else if state.end(EndReason::CannonDestroyed) {
                    out.signals.push(Signal::MatchEnded(EndReason::CannonDestroyed));
                }
            }
            Hit::Invader => {
                out.score_delta += settings.kill_reward;
                if let Some(high_score) = state.add_score(settings.kill_reward) {
                    out.signals.push(Signal::PersistHighScore(high_score));
                }
            }
        }
    }

    out
}
