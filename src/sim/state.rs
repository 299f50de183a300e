//! Game session state
//!
//! A `GameSession` owns everything a run needs: map, collision world,
//! player, enemies, stats and the session RNG. Restarting builds a fresh
//! session with `reset()`.

use std::path::PathBuf;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Enemy, EnemyId, EntityRef, Player};
use super::map::{CollisionWorld, TileMap};
use super::rect::Rect;
use super::spatial::SpatialIndex;
use crate::consts::*;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Player ran out of hearts
    GameOver,
    /// Every enemy was defeated
    Victory,
}

impl GamePhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GamePhase::Playing)
    }
}

/// Notable things that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    PlayerAttacked,
    EnemyHit { id: EnemyId, damage: u32 },
    EnemyDefeated { id: EnemyId },
    PlayerHurt { hearts_lost: u32, hearts_left: u32 },
    LevelUp { level: u32 },
    Victory,
    GameOver,
    Restarted,
}

impl GameEvent {
    /// Sound effect name for this event, if any
    pub fn sound_cue(&self) -> Option<&'static str> {
        match self {
            GameEvent::PlayerAttacked => Some("attack"),
            GameEvent::EnemyHit { .. } => Some("hit"),
            GameEvent::EnemyDefeated { .. } => Some("enemy_death"),
            GameEvent::PlayerHurt { .. } => Some("hurt"),
            GameEvent::LevelUp { .. } => Some("level_up"),
            GameEvent::Victory => Some("victory"),
            GameEvent::GameOver => Some("game_over"),
            GameEvent::Restarted => None,
        }
    }
}

/// Progression stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub level: u32,
    pub exp: u32,
    pub exp_to_level: u32,
    pub health: i32,
    pub max_health: i32,
    pub attack: i32,
    pub defense: i32,
    pub enemies_defeated: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            level: 1,
            exp: 0,
            exp_to_level: START_EXP_TO_LEVEL,
            health: START_HEALTH,
            max_health: START_HEALTH,
            attack: START_ATTACK,
            defense: START_DEFENSE,
            enemies_defeated: 0,
        }
    }
}

impl Stats {
    /// Add experience; applies at most one level-up. Returns true if it did.
    pub fn gain_exp(&mut self, amount: u32) -> bool {
        self.exp += amount;
        if self.exp >= self.exp_to_level {
            self.level_up();
            true
        } else {
            false
        }
    }

    pub fn level_up(&mut self) {
        self.level += 1;
        self.exp = 0;
        self.exp_to_level = (self.exp_to_level as f32 * 1.5) as u32;
        self.max_health += LEVEL_HEALTH_BONUS;
        self.health = self.max_health;
        self.attack += LEVEL_ATTACK_BONUS;
        self.defense += LEVEL_DEFENSE_BONUS;
    }

    /// One-line HUD summary
    pub fn hud_line(&self) -> String {
        format!(
            "Level: {} | ATK: {} | DEF: {} | EXP: {}/{}",
            self.level, self.attack, self.defense, self.exp, self.exp_to_level
        )
    }
}

/// Session parameters that come from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub enemy_count: u32,
    pub map_path: Option<PathBuf>,
    pub max_frame_ms: f32,
    pub ai_hysteresis: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enemy_count: DEFAULT_ENEMY_COUNT,
            map_path: None,
            max_frame_ms: MAX_FRAME_MS,
            ai_hysteresis: AI_HYSTERESIS,
        }
    }
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub config: SessionConfig,
    pub phase: GamePhase,
    pub stats: Stats,
    pub map: TileMap,
    pub world: CollisionWorld,
    pub player: Player,
    /// Live enemies, sorted by id
    pub enemies: Vec<Enemy>,
    /// Broad-phase index over live entities, rebuilt every tick
    pub spatial: SpatialIndex<EntityRef>,
    /// Events produced by the last tick
    pub events: Vec<GameEvent>,
    /// Simulation tick counter
    pub time_ticks: u64,
    next_enemy_id: u32,
}

impl GameSession {
    /// Build a session, loading the configured map or generating one
    pub fn new(config: SessionConfig, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let map = TileMap::load_or_placeholder(config.map_path.as_deref(), &mut rng);
        Self::build(config, seed, rng, map)
    }

    /// Build a session on a given map
    pub fn with_map(config: SessionConfig, seed: u64, map: TileMap) -> Self {
        let rng = Pcg32::seed_from_u64(seed);
        Self::build(config, seed, rng, map)
    }

    /// Session on a given map with no enemies spawned (scenarios, tests)
    pub fn empty(config: SessionConfig, seed: u64, map: TileMap) -> Self {
        let config = SessionConfig {
            enemy_count: 0,
            ..config
        };
        Self::with_map(config, seed, map)
    }

    fn build(config: SessionConfig, seed: u64, rng: Pcg32, map: TileMap) -> Self {
        let world = CollisionWorld::from_map(&map);
        let enemy_count = config.enemy_count;
        let mut session = Self {
            seed,
            rng,
            config,
            phase: GamePhase::Playing,
            stats: Stats::default(),
            map,
            world,
            player: Player::new(Vec2::new(PLAYER_SPAWN.0, PLAYER_SPAWN.1)),
            enemies: Vec::new(),
            spatial: SpatialIndex::new(SPATIAL_CELL_SIZE),
            events: Vec::new(),
            time_ticks: 0,
            next_enemy_id: 1,
        };

        if !session.world.is_free(&session.player.body.rect()) {
            let pos = session.find_player_spawn();
            log::warn!("Player spawn blocked, moving to ({}, {})", pos.x, pos.y);
            session.player = Player::new(pos);
        }

        session.spawn_enemies(enemy_count);
        log::info!(
            "Session {} ready: {} enemies, {} blocked rects",
            seed,
            session.enemies.len(),
            session.world.len()
        );
        session
    }

    /// Fresh session for a restart; the next seed follows from this one
    pub fn reset(&self) -> GameSession {
        let seed = self.seed.wrapping_add(1);
        log::info!("Restarting with seed {}", seed);
        if self.map.placeholder {
            GameSession::new(self.config.clone(), seed)
        } else {
            GameSession::with_map(self.config.clone(), seed, self.map.clone())
        }
    }

    fn next_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId(self.next_enemy_id);
        self.next_enemy_id += 1;
        id
    }

    /// Sample a sprite position whose enemy box is clear of the world,
    /// falling back to a fixed point
    pub fn find_spawn_position(&mut self) -> Vec2 {
        self.sample_clear_position(Enemy::box_at).unwrap_or_else(|| {
            log::debug!("No clear spawn point found, using fallback");
            Vec2::new(SPAWN_FALLBACK.0 as f32, SPAWN_FALLBACK.1 as f32)
        })
    }

    fn find_player_spawn(&mut self) -> Vec2 {
        self.sample_clear_position(Player::box_at)
            .unwrap_or(Vec2::new(PLAYER_SPAWN.0, PLAYER_SPAWN.1))
    }

    /// Rejection-sample a sprite position inside the map margins whose box,
    /// as given by `box_at`, overlaps no blocked rect
    fn sample_clear_position(&mut self, box_at: impl Fn(Vec2) -> Rect) -> Option<Vec2> {
        let lo = SPAWN_MARGIN;
        let hi_x = self.map.pixel_width() - SPAWN_MARGIN;
        let hi_y = self.map.pixel_height() - SPAWN_MARGIN;
        if hi_x < lo || hi_y < lo {
            return None;
        }
        (0..SPAWN_ATTEMPTS).find_map(|_| {
            let x = self.rng.random_range(lo..=hi_x);
            let y = self.rng.random_range(lo..=hi_y);
            let pos = Vec2::new(x as f32, y as f32);
            self.world.is_free(&box_at(pos)).then_some(pos)
        })
    }

    /// Spawn up to `count` enemies at clear positions within the attempt budget
    pub fn spawn_enemies(&mut self, count: u32) {
        let mut spawned = 0;
        let mut attempts = 0;
        while spawned < count && attempts < SPAWN_ATTEMPTS {
            let pos = self.find_spawn_position();
            if self.world.is_free(&Enemy::box_at(pos)) {
                self.spawn_enemy_at(pos);
                spawned += 1;
            }
            attempts += 1;
        }
        if spawned < count {
            log::warn!("Spawned {} of {} enemies", spawned, count);
        }
    }

    /// Place an enemy with its sprite's top-left at `sprite_pos`
    pub fn spawn_enemy_at(&mut self, sprite_pos: Vec2) -> EnemyId {
        let id = self.next_enemy_id();
        let enemy = Enemy::new(id, sprite_pos, &mut self.rng);
        log::debug!("Spawned enemy {:?} at ({}, {})", id, sprite_pos.x, sprite_pos.y);
        self.enemies.push(enemy);
        self.normalize_order();
        id
    }

    pub fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    /// Keep enemies sorted by id for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.enemies.sort_by_key(|e| e.id);
    }
}
