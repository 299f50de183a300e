//! Asset cache
//!
//! One cache is built per run and handed to whoever draws or plays sounds.
//! Missing or broken files never fail the session: sprites fall back to a
//! generated placeholder and sounds to `None`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::animation::AnimationSet;
use crate::consts::*;
use crate::sim::{
    EnemyId, GameEvent,
    entity::{ENEMY_SPRITE, PLAYER_SPRITE},
};

/// Edge of the generated placeholder sprite
pub const PLACEHOLDER_SIZE: u32 = 32;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("could not load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u32);

#[derive(Debug, Clone)]
pub struct Sprite {
    pub name: String,
    pub image: RgbaImage,
    pub placeholder: bool,
}

impl Sprite {
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// How a sprite sheet is divided into frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetLayout {
    /// Fixed frame size in pixels
    FrameSize(u32, u32),
    /// Fixed number of columns and rows
    Grid(u32, u32),
}

impl SheetLayout {
    pub fn frame_size(&self, sheet: (u32, u32)) -> (u32, u32) {
        match *self {
            SheetLayout::FrameSize(w, h) => (w.max(1), h.max(1)),
            SheetLayout::Grid(cols, rows) => ((sheet.0 / cols.max(1)).max(1), (sheet.1 / rows.max(1)).max(1)),
        }
    }
}

pub const PLAYER_SHEET: SheetLayout = SheetLayout::FrameSize(PLAYER_SPRITE_SIZE as u32, PLAYER_SPRITE_SIZE as u32);
pub const ENEMY_SHEET: SheetLayout = SheetLayout::Grid(8, 4);

/// Sound cues every session can emit
const SOUND_CUES: [GameEvent; 7] = [
    GameEvent::PlayerAttacked,
    GameEvent::EnemyHit {
        id: EnemyId(0),
        damage: 0,
    },
    GameEvent::EnemyDefeated {
        id: EnemyId(0),
    },
    GameEvent::PlayerHurt {
        hearts_lost: 0,
        hearts_left: 0,
    },
    GameEvent::LevelUp { level: 0 },
    GameEvent::Victory,
    GameEvent::GameOver,
];

pub fn load_png(path: &Path) -> Result<RgbaImage, AssetError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Semi-transparent magenta square with a black outline
pub fn placeholder_image(size: u32) -> RgbaImage {
    let size = size.max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        if x == 0 || y == 0 || x == size - 1 || y == size - 1 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 0, 255, 128])
        }
    })
}

/// Loaded sprites, sounds and animation sets, keyed by logical name
#[derive(Debug, Default)]
pub struct AssetCache {
    dir: PathBuf,
    sprites: Vec<Sprite>,
    sprite_names: HashMap<String, SpriteHandle>,
    sound_paths: Vec<PathBuf>,
    sounds: HashMap<String, Option<SoundHandle>>,
    animations: HashMap<String, AnimationSet>,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sprite handle for `name` (`<dir>/<name>.png`), loading on first use
    pub fn sprite(&mut self, name: &str) -> SpriteHandle {
        if let Some(&handle) = self.sprite_names.get(name) {
            return handle;
        }

        let path = self.dir.join(format!("{name}.png"));
        let sprite = match load_png(&path) {
            Ok(image) => {
                log::info!("Loaded sprite {} ({}x{})", path.display(), image.width(), image.height());
                Sprite {
                    name: name.to_string(),
                    image,
                    placeholder: false,
                }
            }
            Err(e) => {
                log::warn!("{e}; using placeholder");
                Sprite {
                    name: name.to_string(),
                    image: placeholder_image(PLACEHOLDER_SIZE),
                    placeholder: true,
                }
            }
        };

        let handle = SpriteHandle(self.sprites.len() as u32);
        self.sprites.push(sprite);
        self.sprite_names.insert(name.to_string(), handle);
        handle
    }

    pub fn get(&self, handle: SpriteHandle) -> Option<&Sprite> {
        self.sprites.get(handle.0 as usize)
    }

    /// Sound handle for `name` (`<dir>/<name>.wav`), `None` when absent
    pub fn sound(&mut self, name: &str) -> Option<SoundHandle> {
        if let Some(&cached) = self.sounds.get(name) {
            return cached;
        }
        let path = self.dir.join(format!("{name}.wav"));
        let handle = if path.is_file() {
            let handle = SoundHandle(self.sound_paths.len() as u32);
            self.sound_paths.push(path);
            Some(handle)
        } else {
            log::warn!("Could not load {}", path.display());
            None
        };
        self.sounds.insert(name.to_string(), handle);
        handle
    }

    pub fn sound_path(&self, handle: SoundHandle) -> Option<&Path> {
        self.sound_paths.get(handle.0 as usize).map(PathBuf::as_path)
    }

    /// Sound for a game event, if it has a cue and the file exists
    pub fn sound_for(&mut self, event: &GameEvent) -> Option<SoundHandle> {
        event.sound_cue().and_then(|cue| self.sound(cue))
    }

    /// Directional animation for a sprite sheet
    pub fn animation(&mut self, name: &str, layout: SheetLayout, frames: usize) -> &AnimationSet {
        if !self.animations.contains_key(name) {
            let handle = self.sprite(name);
            let set = match self.get(handle) {
                Some(sprite) if !sprite.placeholder => {
                    let size = sprite.size();
                    AnimationSet::from_sheet(handle, size, layout.frame_size(size), frames)
                }
                Some(sprite) => AnimationSet::still(handle, sprite.size()),
                None => AnimationSet::default(),
            };
            if set.is_empty() {
                log::warn!("Sprite sheet {name} has no usable frames");
            }
            self.animations.insert(name.to_string(), set);
        }
        // Inserted above when missing
        self.animations.entry(name.to_string()).or_default()
    }

    /// Animation previously built by `animation`
    pub fn cached_animation(&self, name: &str) -> Option<&AnimationSet> {
        self.animations.get(name)
    }

    /// Load everything a session draws or plays
    pub fn preload(&mut self) {
        self.animation(PLAYER_SPRITE, PLAYER_SHEET, PLAYER_ANIM_FRAMES);
        self.animation(ENEMY_SPRITE, ENEMY_SHEET, ENEMY_ANIM_FRAMES);
        for event in &SOUND_CUES {
            self.sound_for(event);
        }
    }
}
