//! Space Invaders headless driver
//!
//! Plays one match with a simple autopilot on a fixed 60 Hz clock and logs
//! the outcome. Usage: `space-invaders [settings.json] [seed]`.
//! Set `RUST_LOG=debug` to watch the formation and the shots.

use std::path::Path;

use space_invaders::consts::FRAME_DT;
use space_invaders::sim::{Category, Game, Resolution, TickInput, tick};
use space_invaders::{FileStore, HighScoreStore, Settings};

/// Ten simulated minutes
const MAX_TICKS: u64 = 60 * 60 * 10;

const HIGH_SCORE_FILE: &str = "space_invaders_highscore.json";

fn main() {
    env_logger::init();
    log::info!("Space Invaders (headless) starting...");

    let mut args = std::env::args().skip(1);
    let mut settings = args
        .next()
        .map(|path| Settings::load(Path::new(&path)))
        .unwrap_or_default();
    if let Some(seed) = args.next() {
        match seed.parse() {
            Ok(seed) => settings.seed = seed,
            Err(_) => log::warn!("Ignoring invalid seed {:?}", seed),
        }
    }

    let mut game = Game::new(settings, FileStore::new(HIGH_SCORE_FILE), 0.0);
    let mut totals = Resolution::default();
    let mut ticks = 0;

    while !game.is_match_ended() && ticks < MAX_TICKS {
        ticks += 1;
        let input = autopilot(&game);
        let report = tick(&mut game, &input, ticks as f64 * FRAME_DT);
        totals.merge(report.resolution);
    }

    match game.end_reason() {
        Some(reason) => log::info!("Match ended after {} ticks: {}", ticks, reason),
        None => log::info!("Stopped after {} ticks with the match still running", ticks),
    }
    log::info!(
        "{} entities destroyed, {} lives lost",
        totals.destroyed.len(),
        totals.lives_lost
    );
    println!("{}", game.query_state());
}

/// Chase the lowest invader column and keep firing
fn autopilot<S: HighScoreStore>(game: &Game<S>) -> TickInput {
    let Some(cannon) = game.entities.of(Category::PlayerCannon).next() else {
        return TickInput::default();
    };

    let target = game
        .entities
        .of(Category::Invader)
        .min_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .map(|invader| invader.pos.x);

    let mut input = TickInput {
        fire: true,
        ..Default::default()
    };
    if let Some(x) = target {
        let offset = x - cannon.pos.x;
        if offset.abs() > game.settings.cannon_speed {
            input.move_left = offset < 0.0;
            input.move_right = offset > 0.0;
        }
    }
    input
}
