//! Combat primitives: health, timers, damage intake and single-target attacks
//!
//! Invincibility is the only gate on damage intake. Defense and range checks
//! belong to the caller.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Integer health pool, `0 <= current <= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Remove `amount` (clamped at zero); returns what was requested
    pub fn apply(&mut self, amount: i32) -> i32 {
        self.current = (self.current - amount).max(0);
        amount
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

/// Countdown in milliseconds that never goes below zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    remaining_ms: f32,
}

impl Timer {
    pub fn start(&mut self, ms: f32) {
        self.remaining_ms = ms.max(0.0);
    }

    /// Negative or NaN deltas count as zero
    pub fn tick(&mut self, dt_ms: f32) {
        self.remaining_ms = (self.remaining_ms - dt_ms.max(0.0)).max(0.0);
    }

    pub fn remaining_ms(&self) -> f32 {
        self.remaining_ms
    }

    pub fn is_running(&self) -> bool {
        self.remaining_ms > 0.0
    }

    pub fn is_ready(&self) -> bool {
        !self.is_running()
    }
}

/// Post-hit damage immunity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Invincibility {
    pub active: bool,
    pub remaining_ms: f32,
}

impl Invincibility {
    pub fn start(&mut self, ms: f32) {
        self.active = true;
        self.remaining_ms = ms.max(0.0);
    }

    pub fn tick(&mut self, dt_ms: f32) {
        if !self.active {
            return;
        }
        self.remaining_ms = (self.remaining_ms - dt_ms.max(0.0)).max(0.0);
        if self.remaining_ms <= 0.0 {
            self.active = false;
        }
    }

    /// Sprite alpha while the window is open
    pub fn alpha(&self) -> u8 {
        if self.active { HURT_ALPHA } else { u8::MAX }
    }
}

/// Hearts removed by a hit of `amount` health points (at least one)
pub fn hearts_for_damage(amount: i32) -> u32 {
    (amount.max(0) as u32 / HEALTH_PER_HEART).max(1)
}

/// Something that can be hurt
pub trait Damageable {
    fn invincibility(&self) -> &Invincibility;

    fn is_invincible(&self) -> bool {
        self.invincibility().active
    }

    /// Apply a hit. Returns the amount lost in the entity's own units
    /// (health points or hearts), or 0 when the hit was ignored.
    fn take_damage(&mut self, amount: i32) -> u32;

    fn is_defeated(&self) -> bool;

    /// Advance invincibility and any other combat timers
    fn tick_timers(&mut self, dt_ms: f32);
}

/// Something that hits a single target on a cooldown
pub trait Attacker {
    fn attack_power(&self) -> i32;
    fn attack_cooldown(&mut self) -> &mut Timer;
    fn attack_cooldown_ms(&self) -> f32;
}

/// Outcome of a single-target attack attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackResult {
    /// Attacker still cooling down; nothing changed
    CoolingDown,
    /// Attack fired; `dealt` is what the target reported losing
    Fired { dealt: u32 },
}

/// Fire `attacker` at `target` if its cooldown allows
pub fn attack<A, T>(attacker: &mut A, target: &mut T) -> AttackResult
where
    A: Attacker + ?Sized,
    T: Damageable + ?Sized,
{
    if attacker.attack_cooldown().is_running() {
        return AttackResult::CoolingDown;
    }
    let dealt = target.take_damage(attacker.attack_power().max(1));
    let ms = attacker.attack_cooldown_ms();
    attacker.attack_cooldown().start(ms);
    AttackResult::Fired { dealt }
}

/// Knockback offset pushing the attacker away from its target
pub fn knockback_offset(attacker_center: Vec2, target_center: Vec2) -> Vec2 {
    let away = attacker_center - target_center;
    let distance = away.length().max(1.0);
    away / distance * KNOCKBACK_DISTANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Dummy {
        health: Health,
        inv: Invincibility,
    }

    impl Damageable for Dummy {
        fn invincibility(&self) -> &Invincibility {
            &self.inv
        }

        fn take_damage(&mut self, amount: i32) -> u32 {
            if self.is_invincible() {
                return 0;
            }
            self.inv.start(200.0);
            self.health.apply(amount.max(1)) as u32
        }

        fn is_defeated(&self) -> bool {
            self.health.is_depleted()
        }

        fn tick_timers(&mut self, dt_ms: f32) {
            self.inv.tick(dt_ms);
        }
    }

    struct Hitter {
        power: i32,
        cooldown: Timer,
    }

    impl Attacker for Hitter {
        fn attack_power(&self) -> i32 {
            self.power
        }
        fn attack_cooldown(&mut self) -> &mut Timer {
            &mut self.cooldown
        }
        fn attack_cooldown_ms(&self) -> f32 {
            1000.0
        }
    }

    #[test]
    fn test_hearts_for_damage() {
        assert_eq!(hearts_for_damage(10), 1);
        assert_eq!(hearts_for_damage(40), 2);
        assert_eq!(hearts_for_damage(0), 1);
        assert_eq!(hearts_for_damage(17), 1);
        assert_eq!(hearts_for_damage(34), 2);
    }

    #[test]
    fn test_attack_respects_cooldown() {
        let mut hitter = Hitter { power: 0, cooldown: Timer::default() };
        let mut dummy = Dummy { health: Health::full(30), inv: Invincibility::default() };

        assert_eq!(attack(&mut hitter, &mut dummy), AttackResult::Fired { dealt: 1 });
        assert_eq!(dummy.health.current, 29);
        assert_eq!(hitter.cooldown.remaining_ms(), 1000.0);

        dummy.tick_timers(500.0);
        assert_eq!(attack(&mut hitter, &mut dummy), AttackResult::CoolingDown);
        assert_eq!(dummy.health.current, 29);
    }

    #[test]
    fn test_invincibility_expires_and_clamps() {
        let mut inv = Invincibility::default();
        inv.start(200.0);
        assert_eq!(inv.alpha(), HURT_ALPHA);
        inv.tick(150.0);
        assert!(inv.active);
        inv.tick(150.0);
        assert!(!inv.active);
        assert_eq!(inv.remaining_ms, 0.0);
        assert_eq!(inv.alpha(), 255);
    }

    #[test]
    fn test_knockback_points_away_from_target() {
        let off = knockback_offset(Vec2::new(110.0, 100.0), Vec2::new(100.0, 100.0));
        assert!((off - Vec2::new(KNOCKBACK_DISTANCE, 0.0)).length() < 1e-4);
        assert_eq!(knockback_offset(Vec2::ONE, Vec2::ONE), Vec2::ZERO);
    }

    fn any_dt() -> impl Strategy<Value = f32> {
        prop_oneof![
            Just(f32::NAN),
            Just(f32::INFINITY),
            -500.0f32..0.0,
            0.0f32..400.0,
        ]
    }

    proptest! {
        #[test]
        fn prop_enemy_health_and_timers_never_negative(
            hits in proptest::collection::vec((-50i32..200, any_dt()), 1..50)
        ) {
            use crate::sim::entity::{Enemy, EnemyId};
            use rand::SeedableRng;

            let mut rng = rand_pcg::Pcg32::seed_from_u64(1);
            let mut enemy = Enemy::new(EnemyId(1), Vec2::ZERO, &mut rng);
            for (amount, dt) in hits {
                enemy.take_damage(amount);
                enemy.attack_cooldown.start(amount as f32);
                enemy.tick_timers(dt);
                enemy.attack_cooldown.tick(dt);
                prop_assert!(enemy.health.current >= 0);
                prop_assert!(enemy.health.current <= enemy.health.max);
                prop_assert!(enemy.invincibility.remaining_ms >= 0.0);
                prop_assert!(enemy.attack_cooldown.remaining_ms() >= 0.0);
                prop_assert!(enemy.knockback.remaining_ms() >= 0.0);
            }
        }

        #[test]
        fn prop_player_hearts_stay_in_range(
            hits in proptest::collection::vec((-50i32..200, any_dt()), 1..50)
        ) {
            use crate::sim::entity::Player;

            let mut player = Player::new(Vec2::ZERO);
            for (amount, dt) in hits {
                player.take_damage(amount);
                player.tick_timers(dt);
                prop_assert!(player.hearts <= player.max_hearts);
                prop_assert!(player.invincibility.remaining_ms >= 0.0);
                prop_assert!(!player.invincibility.remaining_ms.is_nan());
            }
        }
    }
}
