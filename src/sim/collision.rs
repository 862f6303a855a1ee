//! Overlap detection
//!
//! Bullets are the only moving hitters, so each tick tests every bullet
//! against the category it can strike: player bullets against invaders,
//! invader bullets against the cannon. Pairs are found in id order, which
//! keeps the contact batch, and therefore its resolution, deterministic.

use super::contact::{Contact, ContactQueue};
use super::state::{Category, Entities, Entity};
use crate::settings::Settings;

/// Which category a bullet category can strike
fn target_of(bullet: Category) -> Option<Category> {
    match bullet {
        Category::PlayerBullet => Some(Category::Invader),
        Category::InvaderBullet => Some(Category::PlayerCannon),
        _ => None,
    }
}

/// Furthest a bullet may move between two overlap tests and still land
/// inside the thinnest target it can strike
pub fn max_bullet_travel(settings: &Settings) -> f32 {
    let thinnest = settings.invader_size.y.min(settings.cannon_size.y);
    ((thinnest + settings.bullet_size.y) / 2.0).max(1.0)
}

/// Collect this tick's contacts between bullets and their targets.
/// Each contact names the bullet first.
pub fn detect_contacts(entities: &Entities) -> ContactQueue {
    let mut queue = ContactQueue::new();

    for bullet_category in [Category::PlayerBullet, Category::InvaderBullet] {
        let Some(target_category) = target_of(bullet_category) else {
            continue;
        };
        for bullet in entities.of(bullet_category) {
            for target in entities.of(target_category) {
                if bullet.overlaps(target) {
                    queue.push(Contact::new(bullet.id, target.id));
                }
            }
        }
    }

    queue
}

/// Whether an entity has fully left the play field
pub fn is_outside_field(entity: &Entity, settings: &Settings) -> bool {
    let (min, max) = (entity.min(), entity.max());
    max.y < 0.0 || min.y > settings.field_height || max.x < 0.0 || min.x > settings.field_width
}

/// Whether any invader has dropped below the landing line
pub fn invaders_landed(entities: &Entities, settings: &Settings) -> bool {
    entities
        .of(Category::Invader)
        .any(|invader| invader.min().y < settings.invader_min_height)
}
