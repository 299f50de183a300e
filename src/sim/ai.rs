//! Enemy behaviour: Idle (wander), Chasing, Attacking
//!
//! The state is re-derived from the distance to the player every tick. A
//! dead band above each radius keeps an enemy in its current state until it
//! has clearly left the range, so it does not flicker at the boundary.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::entity::{Enemy, EntityRef, Movable};
use crate::consts::*;
use crate::direction_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiState {
    #[default]
    Idle,
    Chasing,
    Attacking,
}

impl AiState {
    /// State for a distance with no history
    pub fn classify(distance: f32, attack_radius: f32, detection_radius: f32) -> Self {
        if distance < attack_radius {
            AiState::Attacking
        } else if distance < detection_radius {
            AiState::Chasing
        } else {
            AiState::Idle
        }
    }

    /// Next state given the current one. Entry uses the plain radii; leaving
    /// an engaged state needs `band` extra pixels.
    pub fn next(self, distance: f32, attack_radius: f32, detection_radius: f32, band: f32) -> Self {
        let band = band.max(0.0);
        match self {
            AiState::Idle => Self::classify(distance, attack_radius, detection_radius),
            AiState::Chasing => {
                if distance < attack_radius {
                    AiState::Attacking
                } else if distance < detection_radius + band {
                    AiState::Chasing
                } else {
                    AiState::Idle
                }
            }
            AiState::Attacking => {
                if distance < attack_radius + band {
                    AiState::Attacking
                } else if distance < detection_radius + band {
                    AiState::Chasing
                } else {
                    AiState::Idle
                }
            }
        }
    }
}

/// Random drift timer for idle enemies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wander {
    pub elapsed_secs: f32,
    pub interval_secs: f32,
}

impl Wander {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        Self {
            elapsed_secs: 0.0,
            interval_secs: rng.random_range(WANDER_MIN_SECS..=WANDER_MAX_SECS),
        }
    }

    /// Advance the timer; returns a fresh drift velocity when it fires
    pub fn update<R: Rng>(&mut self, dt_ms: f32, speed: f32, rng: &mut R) -> Option<Vec2> {
        self.elapsed_secs += dt_ms / 1000.0;
        if self.elapsed_secs < self.interval_secs {
            return None;
        }
        self.elapsed_secs = 0.0;
        self.interval_secs = rng.random_range(WANDER_MIN_SECS..=WANDER_MAX_SECS);
        let dx = rng.random_range(-1.0f32..=1.0);
        let dy = rng.random_range(-1.0f32..=1.0);
        Some(Vec2::new(dx, dy) * speed * WANDER_SPEED_FACTOR)
    }
}

/// Run one enemy's behaviour for this tick. Returns true when it wants to
/// attack the player.
pub fn think<R: Rng>(enemy: &mut Enemy, player_center: Vec2, dt_ms: f32, band: f32, rng: &mut R) -> bool {
    if enemy.is_knocked_back() {
        return false;
    }

    let center = enemy.center();
    let distance = center.distance(player_center);
    let mut next = enemy.ai.next(distance, enemy.attack_radius, enemy.detection_radius, band);

    // Attacking also needs the player among the broad-phase neighbours
    if next == AiState::Attacking && !enemy.neighbors.contains(&EntityRef::Player) {
        next = AiState::Chasing;
    }

    if next != enemy.ai {
        log::trace!("Enemy {:?}: {:?} -> {:?} at {:.1}px", enemy.id, enemy.ai, next, distance);
        if next == AiState::Idle {
            enemy.vel = Vec2::ZERO;
        }
        enemy.ai = next;
    }

    match next {
        // Velocity is left as it was; only the attack is attempted
        AiState::Attacking => true,
        AiState::Chasing => {
            enemy.vel = direction_to(center, player_center) * enemy.speed;
            false
        }
        AiState::Idle => {
            if let Some(vel) = enemy.wander.update(dt_ms, enemy.speed, rng) {
                enemy.vel = vel;
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EnemyId;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn enemy_near(rng: &mut Pcg32) -> Enemy {
        let mut e = Enemy::new(EnemyId(1), Vec2::new(0.0, 0.0), rng);
        e.neighbors.push(EntityRef::Player);
        e
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(AiState::classify(39.9, 40.0, 150.0), AiState::Attacking);
        assert_eq!(AiState::classify(40.0, 40.0, 150.0), AiState::Chasing);
        assert_eq!(AiState::classify(149.9, 40.0, 150.0), AiState::Chasing);
        assert_eq!(AiState::classify(150.0, 40.0, 150.0), AiState::Idle);
    }

    #[test]
    fn test_hysteresis_holds_engaged_states() {
        assert_eq!(AiState::Chasing.next(152.0, 40.0, 150.0, 4.0), AiState::Chasing);
        assert_eq!(AiState::Chasing.next(154.0, 40.0, 150.0, 4.0), AiState::Idle);
        assert_eq!(AiState::Idle.next(152.0, 40.0, 150.0, 4.0), AiState::Idle);
        assert_eq!(AiState::Attacking.next(42.0, 40.0, 150.0, 4.0), AiState::Attacking);
        assert_eq!(AiState::Attacking.next(44.0, 40.0, 150.0, 4.0), AiState::Chasing);
    }

    #[test]
    fn test_chase_moves_toward_player() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut e = enemy_near(&mut rng);
        let player = e.center() + Vec2::new(100.0, 0.0);
        let attack = think(&mut e, player, 16.0, 0.0, &mut rng);
        assert!(!attack);
        assert_eq!(e.ai, AiState::Chasing);
        assert!((e.vel - Vec2::new(ENEMY_SPEED, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_attack_requires_neighbor() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut e = enemy_near(&mut rng);
        let player = e.center() + Vec2::new(20.0, 0.0);
        assert!(think(&mut e, player, 16.0, 0.0, &mut rng));
        assert_eq!(e.ai, AiState::Attacking);

        e.neighbors.clear();
        e.ai = AiState::Idle;
        assert!(!think(&mut e, player, 16.0, 0.0, &mut rng));
        assert_eq!(e.ai, AiState::Chasing);
    }

    #[test]
    fn test_attacking_keeps_velocity() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut e = enemy_near(&mut rng);
        e.ai = AiState::Chasing;
        e.vel = Vec2::new(0.0, -ENEMY_SPEED);
        let player = e.center() + Vec2::new(20.0, 0.0);

        assert!(think(&mut e, player, 16.0, 0.0, &mut rng));
        assert_eq!(e.ai, AiState::Attacking);
        assert_eq!(e.vel, Vec2::new(0.0, -ENEMY_SPEED));
    }

    #[test]
    fn test_entering_idle_stops_and_wander_fires() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut e = enemy_near(&mut rng);
        e.ai = AiState::Chasing;
        e.vel = Vec2::new(0.8, 0.0);
        let far = e.center() + Vec2::new(500.0, 0.0);

        think(&mut e, far, 16.0, 0.0, &mut rng);
        assert_eq!(e.ai, AiState::Idle);
        assert_eq!(e.vel, Vec2::ZERO);

        // Past the longest wander interval a new drift must have been picked
        let mut fired = false;
        for _ in 0..200 {
            think(&mut e, far, 16.0, 0.0, &mut rng);
            fired |= e.vel != Vec2::ZERO;
        }
        assert!(fired);
        let limit = ENEMY_SPEED * WANDER_SPEED_FACTOR;
        assert!(e.vel.x.abs() <= limit && e.vel.y.abs() <= limit);
    }

    #[test]
    fn test_knockback_suspends_ai() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut e = enemy_near(&mut rng);
        e.knockback.start(KNOCKBACK_MS);
        let player = e.center() + Vec2::new(10.0, 0.0);
        assert!(!think(&mut e, player, 16.0, 0.0, &mut rng));
        assert_eq!(e.ai, AiState::Idle);
    }

    proptest! {
        #[test]
        fn prop_zero_band_matches_classify(d in 0.0f32..400.0, prev in 0usize..3) {
            let prev = [AiState::Idle, AiState::Chasing, AiState::Attacking][prev];
            prop_assert_eq!(prev.next(d, 40.0, 150.0, 0.0), AiState::classify(d, 40.0, 150.0));
        }

        #[test]
        fn prop_wander_interval_in_range(seed in any::<u64>()) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let w = Wander::new(&mut rng);
            prop_assert!((WANDER_MIN_SECS..=WANDER_MAX_SECS).contains(&w.interval_secs));
        }
    }
}
