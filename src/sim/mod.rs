//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Whole-pixel motion resolved against a static collision world
//! - Seeded RNG only (one generator per session)
//! - Stable iteration order (enemies sorted by id)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod combat;
pub mod entity;
pub mod map;
pub mod rect;
pub mod spatial;
pub mod state;
pub mod tick;

pub use ai::{AiState, Wander};
pub use collision::{Body, MoveOutcome, Response, SubPixel, integrate, resolve_step, shove};
pub use combat::{AttackResult, Attacker, Damageable, Health, Invincibility, Timer};
pub use entity::{Drawable, Enemy, EnemyId, EntityRef, Facing, Movable, Player};
pub use map::{CollisionWorld, MapError, TileMap};
pub use rect::Rect;
pub use spatial::SpatialIndex;
pub use state::{GameEvent, GamePhase, GameSession, SessionConfig, Stats};
pub use tick::{Control, TickInput, tick};
