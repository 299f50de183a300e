//! Tilequest entry point
//!
//! Runs a headless session driven by the autopilot. The draw list goes to a
//! logging renderer and sound cues are logged instead of played.

use std::time::Instant;

use tilequest::assets::AssetCache;
use tilequest::input::{Autopilot, InputSource};
use tilequest::render::{LogRenderer, Renderer, build_draw_list};
use tilequest::settings::Settings;
use tilequest::sim::{Control, GameEvent, GamePhase, GameSession, tick};

/// Fixed frame step for the headless loop (ms)
const FRAME_MS: f32 = 16.0;
/// Give up after this many frames (about ten minutes of play)
const MAX_FRAMES: u64 = 60 * 60 * 10;

/// Session plus everything that drives and presents it
struct Game {
    session: GameSession,
    assets: AssetCache,
    settings: Settings,
    input: Autopilot,
    renderer: LogRenderer,
    // FPS tracking
    frame_times: [Option<Instant>; 60],
    frame_index: usize,
    fps: u32,
}

impl Game {
    fn new(settings: Settings) -> Self {
        let mut assets = AssetCache::new(settings.asset_dir.clone());
        assets.preload();
        let seed = settings.seed();
        log::info!("Starting session with seed {seed}");
        Self {
            session: GameSession::new(settings.session_config(), seed),
            assets,
            settings,
            input: Autopilot::new(),
            renderer: LogRenderer::default(),
            frame_times: [None; 60],
            frame_index: 0,
            fps: 0,
        }
    }

    /// One frame: input, simulation, sounds, drawing
    fn frame(&mut self) -> Control {
        let input = self.input.poll(&self.session);
        let control = tick(&mut self.session, &input, FRAME_MS);

        for event in &self.session.events {
            match event {
                GameEvent::LevelUp { level } => log::info!("Level up! Now level {level}"),
                GameEvent::Victory => log::info!("All enemies defeated"),
                GameEvent::GameOver => log::info!("Player defeated"),
                other => log::debug!("{other:?}"),
            }
            if let Some(sound) = self.assets.sound_for(event) {
                if let Some(path) = self.assets.sound_path(sound) {
                    log::debug!("Play {}", path.display());
                }
            }
        }

        self.track_fps();
        let fps = self.settings.show_fps.then_some(self.fps);
        let commands = build_draw_list(&self.session, &self.assets, self.settings.viewport(), fps);
        self.renderer.render(&commands);
        control
    }

    fn track_fps(&mut self) {
        let now = Instant::now();
        self.frame_times[self.frame_index] = Some(now);
        self.frame_index = (self.frame_index + 1) % self.frame_times.len();

        // Oldest slot is the one about to be overwritten
        if let Some(oldest) = self.frame_times[self.frame_index] {
            let elapsed = now.duration_since(oldest).as_secs_f64();
            if elapsed > 0.0 {
                self.fps = (self.frame_times.len() as f64 / elapsed).round() as u32;
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Tilequest starting...");

    let mut game = Game::new(Settings::load());
    let mut frames = 0;
    while frames < MAX_FRAMES {
        frames += 1;
        if game.frame() == Control::Quit {
            log::info!("Quit requested");
            break;
        }
        if game.session.phase != GamePhase::Playing {
            break;
        }
    }

    let stats = &game.session.stats;
    log::info!(
        "Finished after {} frames: {:?}, level {}, {} enemies defeated, {} hearts left",
        frames,
        game.session.phase,
        stats.level,
        stats.enemies_defeated,
        game.session.player.hearts
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No browser front end; the library is driven by an embedding host
}
