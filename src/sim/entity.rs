//! Player and enemy entities
//!
//! Both variants share the same capabilities: `Movable` (integrated through
//! the collision resolver), `Damageable`, and `Drawable`. Enemies also
//! implement `Attacker`; the player's attack is area-based and resolved by
//! the session.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ai::{AiState, Wander};
use super::collision::{Body, MoveOutcome, Response, integrate};
use super::combat::{Attacker, Damageable, Health, Invincibility, Timer, hearts_for_damage};
use super::map::CollisionWorld;
use super::rect::Rect;
use crate::animation::Animator;
use crate::consts::*;

pub const PLAYER_SPRITE: &str = "Player";
pub const ENEMY_SPRITE: &str = "Slime_Green";

/// Facing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Down,
    Left,
    Right,
    Up,
}

impl Facing {
    /// Facing for an input request; vertical wins when both axes are held
    pub fn from_request(v: Vec2) -> Option<Self> {
        if v.y < 0.0 {
            Some(Facing::Up)
        } else if v.y > 0.0 {
            Some(Facing::Down)
        } else if v.x > 0.0 {
            Some(Facing::Right)
        } else if v.x < 0.0 {
            Some(Facing::Left)
        } else {
            None
        }
    }

    /// Facing for autonomous motion; the dominant axis wins
    pub fn from_velocity(v: Vec2) -> Option<Self> {
        if v == Vec2::ZERO {
            None
        } else if v.x.abs() > v.y.abs() {
            Some(if v.x < 0.0 { Facing::Left } else { Facing::Right })
        } else {
            Some(if v.y < 0.0 { Facing::Up } else { Facing::Down })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Reference to a live entity, as stored in the spatial index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player,
    Enemy(EnemyId),
}

/// Something the collision resolver moves
pub trait Movable {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;
    /// Displacement per reference frame
    fn velocity(&self) -> Vec2;
    fn response(&self) -> Response;

    fn after_move(&mut self, _outcome: &MoveOutcome) {}

    fn center(&self) -> Vec2 {
        self.body().center()
    }

    /// Integrate one tick; `scale` is elapsed time in reference frames
    fn step(&mut self, scale: f32, world: &CollisionWorld) -> MoveOutcome {
        let vel = self.velocity();
        let response = self.response();
        let outcome = integrate(self.body_mut(), vel, scale, world, response);
        self.after_move(&outcome);
        outcome
    }
}

/// What a renderer needs to draw an entity
pub trait Drawable {
    fn sprite_name(&self) -> &str;
    fn sprite_rect(&self) -> Rect;
    /// Collision box, used to anchor overlays
    fn bounds(&self) -> Rect;
    fn facing(&self) -> Facing;
    fn frame_index(&self) -> usize;
    fn alpha(&self) -> u8;

    /// Painter's-order key: lower on screen draws later
    fn depth(&self) -> i32 {
        self.bounds().center().y
    }

    /// Health bar fill, when one should be shown
    fn health_fraction(&self) -> Option<f32> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub body: Body,
    /// Requested displacement per reference frame (this tick's input)
    pub request: Vec2,
    pub facing: Facing,
    pub hearts: u32,
    pub max_hearts: u32,
    pub invincibility: Invincibility,
    pub attack_cooldown: Timer,
    pub attack_range: f32,
    /// Remaining time of the visible attack swing
    pub swing: Timer,
    pub animator: Animator,
}

impl Player {
    pub fn new(sprite_pos: Vec2) -> Self {
        Self {
            body: Body::from_sprite(sprite_pos, PLAYER_SPRITE_SIZE, PLAYER_BOX_INSET, 1),
            request: Vec2::ZERO,
            facing: Facing::Down,
            hearts: MAX_HEARTS,
            max_hearts: MAX_HEARTS,
            invincibility: Invincibility::default(),
            attack_cooldown: Timer::default(),
            attack_range: PLAYER_ATTACK_RANGE,
            swing: Timer::default(),
            animator: Animator::new(PLAYER_ANIM_FRAMES, PLAYER_FRAME_MS),
        }
    }

    /// Collision box a player would have with its sprite at `sprite_pos`
    pub fn box_at(sprite_pos: Vec2) -> Rect {
        Body::from_sprite(sprite_pos, PLAYER_SPRITE_SIZE, PLAYER_BOX_INSET, 1).rect()
    }

    /// Health-point equivalent of the remaining hearts
    pub fn health(&self) -> i32 {
        (self.hearts * HEALTH_PER_HEART) as i32
    }

    pub fn max_health(&self) -> i32 {
        (self.max_hearts * HEALTH_PER_HEART) as i32
    }

    /// Set this tick's movement request and turn to face it, even if the
    /// move ends up blocked
    pub fn set_request(&mut self, request: Vec2) {
        self.request = request;
        if let Some(facing) = Facing::from_request(request) {
            if facing != self.facing {
                self.facing = facing;
                self.animator.reset();
            }
        }
    }

    pub fn is_moving(&self) -> bool {
        self.request != Vec2::ZERO
    }

    pub fn heal(&mut self, amount: i32) {
        self.hearts = (self.hearts + hearts_for_damage(amount)).min(self.max_hearts);
    }

    pub fn restore_hearts(&mut self) {
        self.hearts = self.max_hearts;
    }

    pub fn is_swinging(&self) -> bool {
        self.swing.is_running()
    }

    /// Melee hitbox in front of the collision box
    pub fn attack_rect(&self) -> Rect {
        let b = self.body.rect();
        let c = b.center();
        match self.facing {
            Facing::Up => Rect::new(c.x - ATTACK_WIDTH / 2, b.top() - ATTACK_REACH, ATTACK_WIDTH, ATTACK_REACH),
            Facing::Down => Rect::new(c.x - ATTACK_WIDTH / 2, b.bottom(), ATTACK_WIDTH, ATTACK_REACH),
            Facing::Left => Rect::new(b.left() - ATTACK_REACH, c.y - ATTACK_WIDTH / 2, ATTACK_REACH, ATTACK_WIDTH),
            Facing::Right => Rect::new(b.right(), c.y - ATTACK_WIDTH / 2, ATTACK_REACH, ATTACK_WIDTH),
        }
    }
}

impl Movable for Player {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn velocity(&self) -> Vec2 {
        self.request
    }

    fn response(&self) -> Response {
        Response::Snap
    }
}

impl Damageable for Player {
    fn invincibility(&self) -> &Invincibility {
        &self.invincibility
    }

    fn take_damage(&mut self, amount: i32) -> u32 {
        if self.is_invincible() {
            return 0;
        }
        self.invincibility.start(PLAYER_INVINCIBLE_MS);
        let lost = hearts_for_damage(amount).min(self.hearts);
        self.hearts -= lost;
        lost
    }

    fn is_defeated(&self) -> bool {
        self.hearts == 0
    }

    fn tick_timers(&mut self, dt_ms: f32) {
        self.invincibility.tick(dt_ms);
        self.attack_cooldown.tick(dt_ms);
        self.swing.tick(dt_ms);
    }
}

impl Drawable for Player {
    fn sprite_name(&self) -> &str {
        PLAYER_SPRITE
    }

    fn sprite_rect(&self) -> Rect {
        self.body.sprite_rect()
    }

    fn bounds(&self) -> Rect {
        self.body.rect()
    }

    fn facing(&self) -> Facing {
        self.facing
    }

    fn frame_index(&self) -> usize {
        self.animator.frame
    }

    fn alpha(&self) -> u8 {
        self.invincibility.alpha()
    }
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EnemyId,
    pub body: Body,
    /// Displacement per reference frame
    pub vel: Vec2,
    pub speed: f32,
    pub facing: Facing,
    pub health: Health,
    pub attack_power: i32,
    pub invincibility: Invincibility,
    pub attack_cooldown: Timer,
    /// Lockout after knockback; AI and motion are suspended while running
    pub knockback: Timer,
    pub ai: AiState,
    pub detection_radius: f32,
    pub attack_radius: f32,
    pub wander: Wander,
    /// Broad-phase neighbours from the last spatial rebuild
    pub neighbors: Vec<EntityRef>,
    pub animator: Animator,
}

impl Enemy {
    pub fn new<R: Rng>(id: EnemyId, sprite_pos: Vec2, rng: &mut R) -> Self {
        Self {
            id,
            body: Body::from_sprite(sprite_pos, ENEMY_SPRITE_SIZE, ENEMY_BOX_INSET, ENEMY_MIN_BOX),
            vel: Vec2::ZERO,
            speed: ENEMY_SPEED,
            facing: Facing::Down,
            health: Health::full(ENEMY_HEALTH),
            attack_power: ENEMY_ATTACK_POWER,
            invincibility: Invincibility::default(),
            attack_cooldown: Timer::default(),
            knockback: Timer::default(),
            ai: AiState::Idle,
            detection_radius: DETECTION_RADIUS,
            attack_radius: ATTACK_RADIUS,
            wander: Wander::new(rng),
            neighbors: Vec::new(),
            animator: Animator::new(ENEMY_ANIM_FRAMES, ENEMY_FRAME_MS),
        }
    }

    /// Collision box an enemy would have with its sprite at `sprite_pos`
    pub fn box_at(sprite_pos: Vec2) -> Rect {
        Body::from_sprite(sprite_pos, ENEMY_SPRITE_SIZE, ENEMY_BOX_INSET, ENEMY_MIN_BOX).rect()
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback.is_running()
    }

    pub fn is_moving(&self) -> bool {
        self.vel != Vec2::ZERO
    }
}

impl Movable for Enemy {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn velocity(&self) -> Vec2 {
        self.vel
    }

    fn response(&self) -> Response {
        Response::Bounce
    }

    fn after_move(&mut self, outcome: &MoveOutcome) {
        if outcome.blocked_x || outcome.blocked_y {
            self.vel = outcome.bounce(self.vel);
        }
        if let Some(facing) = Facing::from_velocity(self.vel) {
            self.facing = facing;
        }
    }
}

impl Damageable for Enemy {
    fn invincibility(&self) -> &Invincibility {
        &self.invincibility
    }

    fn take_damage(&mut self, amount: i32) -> u32 {
        if self.is_invincible() {
            return 0;
        }
        let dealt = self.health.apply(amount.max(1));
        self.invincibility.start(ENEMY_INVINCIBLE_MS);
        dealt as u32
    }

    fn is_defeated(&self) -> bool {
        self.health.is_depleted()
    }

    fn tick_timers(&mut self, dt_ms: f32) {
        self.invincibility.tick(dt_ms);
        self.attack_cooldown.tick(dt_ms);
        self.knockback.tick(dt_ms);
    }
}

impl Attacker for Enemy {
    fn attack_power(&self) -> i32 {
        self.attack_power
    }

    fn attack_cooldown(&mut self) -> &mut Timer {
        &mut self.attack_cooldown
    }

    fn attack_cooldown_ms(&self) -> f32 {
        ENEMY_ATTACK_COOLDOWN_MS
    }
}

impl Drawable for Enemy {
    fn sprite_name(&self) -> &str {
        ENEMY_SPRITE
    }

    fn sprite_rect(&self) -> Rect {
        self.body.sprite_rect()
    }

    fn bounds(&self) -> Rect {
        self.body.rect()
    }

    fn facing(&self) -> Facing {
        self.facing
    }

    fn frame_index(&self) -> usize {
        self.animator.frame
    }

    fn alpha(&self) -> u8 {
        self.invincibility.alpha()
    }

    fn health_fraction(&self) -> Option<f32> {
        (self.health.current < self.health.max).then(|| self.health.fraction())
    }
}
