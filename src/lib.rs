//! Tilequest - a top-down tile-map action game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (motion, collisions, AI, combat, session state)
//! - `assets`: Asset cache with placeholder fallbacks
//! - `animation`: Directional frame sets and the frame animator
//! - `input`: Per-tick input contract
//! - `render`: Draw-list construction for an external renderer
//! - `settings`: Configuration loaded from JSON

pub mod animation;
pub mod assets;
pub mod input;
pub mod render;
pub mod settings;
pub mod sim;

pub use assets::AssetCache;
pub use input::{InputSource, TickInput};
pub use settings::{Settings, SettingsError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Reference frame length; velocities are expressed per reference frame
    pub const REFERENCE_FRAME_MS: f32 = 16.0;
    /// Largest delta time a single tick will integrate
    pub const MAX_FRAME_MS: f32 = 100.0;

    /// Map defaults
    pub const TILE_SIZE: u32 = 32;
    pub const PLACEHOLDER_MAP_TILES: u32 = 50;
    pub const PLACEHOLDER_OBSTACLE_CHANCE: f64 = 0.02;
    pub const BOUNDARY_WALL_THICKNESS: i32 = 32;
    /// Largest accepted map side and object coordinate (pixels)
    pub const MAX_MAP_EXTENT: i32 = 1 << 15;
    /// Largest accepted tile count
    pub const MAX_MAP_TILES: u64 = 1 << 20;
    /// Frame used when a map yields no blocked geometry at all
    pub const FALLBACK_FRAME_WIDTH: i32 = 800;
    pub const FALLBACK_FRAME_HEIGHT: i32 = 600;

    /// Spatial partition cell edge (pixels)
    pub const SPATIAL_CELL_SIZE: i32 = 64;

    /// Enemy bounce restitution on the blocked axis
    pub const RESTITUTION: f32 = 0.8;

    /// Player body
    pub const PLAYER_SPRITE_SIZE: i32 = 32;
    pub const PLAYER_BOX_INSET: i32 = 4;
    pub const PLAYER_SPEED: f32 = 1.5;
    pub const PLAYER_SPAWN: (f32, f32) = (100.0, 100.0);
    /// Diagonal movement scale (~1/sqrt(2))
    pub const DIAGONAL_SCALE: f32 = 0.7071;

    /// Player health is counted in hearts
    pub const MAX_HEARTS: u32 = 6;
    pub const HEALTH_PER_HEART: u32 = 17;
    pub const PLAYER_INVINCIBLE_MS: f32 = 1000.0;
    pub const PLAYER_ATTACK_COOLDOWN_MS: f32 = 500.0;
    pub const PLAYER_ATTACK_RANGE: f32 = 100.0;
    /// Melee hitbox geometry (facing-relative)
    pub const ATTACK_REACH: i32 = 50;
    pub const ATTACK_WIDTH: i32 = 40;
    pub const ATTACK_SWING_MS: f32 = 150.0;

    /// Enemy body
    pub const ENEMY_SPRITE_SIZE: i32 = 64;
    pub const ENEMY_BOX_INSET: i32 = 4;
    pub const ENEMY_MIN_BOX: i32 = 20;
    pub const ENEMY_SPEED: f32 = 0.8;
    pub const ENEMY_HEALTH: i32 = 30;
    pub const ENEMY_ATTACK_POWER: i32 = 5;
    pub const ENEMY_INVINCIBLE_MS: f32 = 200.0;
    pub const ENEMY_ATTACK_COOLDOWN_MS: f32 = 1000.0;
    pub const DETECTION_RADIUS: f32 = 150.0;
    pub const ATTACK_RADIUS: f32 = 40.0;
    /// Dead band added to a radius before an enemy gives up a state
    pub const AI_HYSTERESIS: f32 = 4.0;
    pub const KNOCKBACK_DISTANCE: f32 = 25.0;
    pub const KNOCKBACK_MS: f32 = 100.0;
    /// Wander interval bounds (seconds) and speed fraction
    pub const WANDER_MIN_SECS: f32 = 1.0;
    pub const WANDER_MAX_SECS: f32 = 3.0;
    pub const WANDER_SPEED_FACTOR: f32 = 0.5;

    /// Spawning
    pub const DEFAULT_ENEMY_COUNT: u32 = 5;
    pub const SPAWN_ATTEMPTS: u32 = 100;
    pub const SPAWN_MARGIN: i32 = 50;
    pub const SPAWN_FALLBACK: (i32, i32) = (100, 100);

    /// Progression
    pub const EXP_PER_KILL: u32 = 10;
    pub const START_EXP_TO_LEVEL: u32 = 100;
    pub const START_HEALTH: i32 = 100;
    pub const START_ATTACK: i32 = 10;
    pub const START_DEFENSE: i32 = 5;
    pub const LEVEL_HEALTH_BONUS: i32 = 20;
    pub const LEVEL_ATTACK_BONUS: i32 = 5;
    pub const LEVEL_DEFENSE_BONUS: i32 = 2;

    /// Animation strips
    pub const PLAYER_ANIM_FRAMES: usize = 3;
    pub const PLAYER_FRAME_MS: f32 = 200.0;
    pub const ENEMY_ANIM_FRAMES: usize = 4;
    pub const ENEMY_FRAME_MS: f32 = 150.0;

    /// Enemy health bar
    pub const HEALTH_BAR_WIDTH: i32 = 30;
    pub const HEALTH_BAR_HEIGHT: i32 = 4;
    pub const HEALTH_BAR_GAP: i32 = 5;

    /// Sprite alpha while invincible
    pub const HURT_ALPHA: u8 = 128;
}

/// Clamp a raw frame delta to the range the simulation integrates safely
#[inline]
pub fn clamp_frame_ms(dt_ms: f32, max_ms: f32) -> f32 {
    if dt_ms.is_finite() { dt_ms.clamp(0.0, max_ms) } else { 0.0 }
}

/// Unit vector from `from` toward `to`, zero when the points coincide
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}
