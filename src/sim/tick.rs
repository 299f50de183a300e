//! Per-frame simulation tick
//!
//! One call advances the session by the (clamped) frame delta:
//! timers, player and enemy motion, spatial rebuild, enemy behaviour and
//! attacks, the game-over check, the player's attack and the victory check.

use glam::Vec2;

use super::ai;
use super::collision::shove;
use super::combat::{AttackResult, Damageable, attack, knockback_offset};
use super::entity::{EntityRef, Movable};
use super::state::{GameEvent, GamePhase, GameSession};
use crate::clamp_frame_ms;
use crate::consts::*;

/// Input for a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Held movement keys
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Attack pressed this tick
    pub attack: bool,
    /// Restart pressed this tick (terminal phases only)
    pub restart: bool,
    /// Quit requested
    pub quit: bool,
}

impl TickInput {
    /// Requested player displacement per reference frame
    pub fn movement(&self, speed: f32) -> Vec2 {
        let axis = |neg: bool, pos: bool| (pos as i32 - neg as i32) as f32;
        let mut v = Vec2::new(axis(self.left, self.right), axis(self.up, self.down)) * speed;
        if v.x != 0.0 && v.y != 0.0 {
            v *= DIAGONAL_SCALE;
        }
        v
    }
}

/// What the caller should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Advance the session by one frame of `dt_ms` milliseconds
pub fn tick(session: &mut GameSession, input: &TickInput, dt_ms: f32) -> Control {
    session.events.clear();

    if input.quit {
        log::info!("Quit requested");
        return Control::Quit;
    }

    if session.phase.is_terminal() {
        if input.restart {
            *session = session.reset();
            session.events.push(GameEvent::Restarted);
        }
        return Control::Continue;
    }

    let dt = clamp_frame_ms(dt_ms, session.config.max_frame_ms);
    let scale = dt / REFERENCE_FRAME_MS;
    session.time_ticks += 1;

    update_timers(session, dt);
    move_player(session, input, dt, scale);
    move_enemies(session, dt, scale);
    rebuild_spatial(session);
    run_enemies(session, dt);

    if session.player.is_defeated() {
        session.phase = GamePhase::GameOver;
        session.events.push(GameEvent::GameOver);
        log::info!(
            "Game over at level {} with {} enemies defeated",
            session.stats.level,
            session.stats.enemies_defeated
        );
        return Control::Continue;
    }

    if input.attack && session.player.attack_cooldown.is_ready() {
        player_attack(session);
    }

    Control::Continue
}

fn update_timers(session: &mut GameSession, dt: f32) {
    session.player.tick_timers(dt);
    for enemy in &mut session.enemies {
        enemy.tick_timers(dt);
    }
}

fn move_player(session: &mut GameSession, input: &TickInput, dt: f32, scale: f32) {
    let player = &mut session.player;
    player.set_request(input.movement(PLAYER_SPEED));
    if player.is_moving() {
        player.step(scale, &session.world);
    }
    let moving = player.is_moving();
    player.animator.advance(dt, moving);
}

fn move_enemies(session: &mut GameSession, dt: f32, scale: f32) {
    for enemy in &mut session.enemies {
        if !enemy.is_knocked_back() {
            enemy.step(scale, &session.world);
        }
        let moving = enemy.is_moving();
        enemy.animator.advance(dt, moving);
    }
}

fn rebuild_spatial(session: &mut GameSession) {
    let GameSession {
        spatial,
        player,
        enemies,
        ..
    } = session;

    spatial.rebuild(
        std::iter::once((EntityRef::Player, player.body.rect()))
            .chain(enemies.iter().map(|e| (EntityRef::Enemy(e.id), e.body.rect()))),
    );
    for enemy in enemies.iter_mut() {
        enemy.neighbors = spatial.neighbors(EntityRef::Enemy(enemy.id), enemy.body.rect().center());
    }
}

fn run_enemies(session: &mut GameSession, dt: f32) {
    let GameSession {
        rng,
        config,
        world,
        player,
        enemies,
        events,
        ..
    } = session;

    for enemy in enemies.iter_mut() {
        let target = player.center();
        if !ai::think(enemy, target, dt, config.ai_hysteresis, rng) {
            continue;
        }
        if let AttackResult::Fired { dealt } = attack(enemy, player) {
            let offset = knockback_offset(enemy.center(), target);
            shove(&mut enemy.body, offset, world);
            enemy.knockback.start(KNOCKBACK_MS);
            if dealt > 0 {
                log::debug!("Enemy {:?} hit player for {} heart(s)", enemy.id, dealt);
                events.push(GameEvent::PlayerHurt {
                    hearts_lost: dealt,
                    hearts_left: player.hearts,
                });
            }
        }
    }
}

/// Area attack around the player: every live enemy within range is hit
fn player_attack(session: &mut GameSession) {
    session.player.attack_cooldown.start(PLAYER_ATTACK_COOLDOWN_MS);
    session.player.swing.start(ATTACK_SWING_MS);
    session.events.push(GameEvent::PlayerAttacked);

    let origin = session.player.center();
    let range = session.player.attack_range;
    let power = session.stats.attack;

    let mut defeated = Vec::new();
    for enemy in &mut session.enemies {
        if enemy.center().distance(origin) >= range {
            continue;
        }
        let damage = enemy.take_damage(power);
        if damage > 0 {
            session.events.push(GameEvent::EnemyHit { id: enemy.id, damage });
        }
        if enemy.is_defeated() {
            defeated.push(enemy.id);
        }
    }

    for id in defeated {
        session.enemies.retain(|e| e.id != id);
        session.stats.enemies_defeated += 1;
        session.events.push(GameEvent::EnemyDefeated { id });
        log::info!("Enemy defeated! Total: {}", session.stats.enemies_defeated);

        if session.stats.gain_exp(EXP_PER_KILL) {
            session.player.restore_hearts();
            session.events.push(GameEvent::LevelUp {
                level: session.stats.level,
            });
            log::info!("Level up! Reached level {}", session.stats.level);
        }

        if session.enemies.is_empty() && session.phase == GamePhase::Playing {
            session.phase = GamePhase::Victory;
            session.events.push(GameEvent::Victory);
            log::info!("Victory with {} enemies defeated", session.stats.enemies_defeated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::combat::Invincibility;
    use crate::sim::map::TileMap;
    use crate::sim::state::SessionConfig;
    use proptest::prelude::*;

    const DT: f32 = 16.0;

    fn arena() -> GameSession {
        GameSession::empty(SessionConfig::default(), 12345, TileMap::open(40, 40, TILE_SIZE, TILE_SIZE))
    }

    fn held(f: impl FnOnce(&mut TickInput)) -> TickInput {
        let mut input = TickInput::default();
        f(&mut input);
        input
    }

    #[test]
    fn test_movement_request() {
        let right = held(|i| i.right = true);
        assert_eq!(right.movement(1.5), Vec2::new(1.5, 0.0));

        let diag = held(|i| {
            i.left = true;
            i.down = true;
        });
        let v = diag.movement(1.5);
        assert!((v.x + 1.5 * DIAGONAL_SCALE).abs() < 1e-6);
        assert!((v.y - 1.5 * DIAGONAL_SCALE).abs() < 1e-6);

        let opposed = held(|i| {
            i.left = true;
            i.right = true;
        });
        assert_eq!(opposed.movement(1.5), Vec2::ZERO);
    }

    #[test]
    fn test_player_moves_with_dt() {
        let mut session = arena();
        let start = session.player.body.rect();
        let input = held(|i| i.right = true);
        // 1.5 px per 16 ms: 32 ms covers 3 px
        tick(&mut session, &input, 32.0);
        assert_eq!(session.player.body.rect().x, start.x + 3);
        assert_eq!(session.player.facing, crate::sim::Facing::Right);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let mut session = arena();
        let start = session.player.body.rect();
        let input = held(|i| i.down = true);
        tick(&mut session, &input, 10_000.0);
        // 100 ms at 1.5 px per 16 ms
        let moved = session.player.body.rect().y - start.y;
        assert_eq!(moved, 9);
    }

    #[test]
    fn test_attack_kills_and_awards_exp() {
        let mut session = arena();
        let near = session.player.body.pos + Vec2::new(30.0, -16.0);
        let id = session.spawn_enemy_at(near);
        session.spawn_enemy_at(Vec2::new(900.0, 900.0));
        session.enemies.iter_mut().for_each(|e| e.health.current = 5);

        let attack = held(|i| i.attack = true);
        tick(&mut session, &attack, DT);

        assert!(session.enemy(id).is_none());
        assert_eq!(session.enemies.len(), 1);
        assert_eq!(session.stats.enemies_defeated, 1);
        assert_eq!(session.stats.exp, EXP_PER_KILL);
        assert!(session.events.contains(&GameEvent::EnemyDefeated { id }));
        assert_eq!(session.phase, GamePhase::Playing);
        assert!(session.player.is_swinging());
    }

    #[test]
    fn test_attack_cooldown_blocks_second_swing() {
        let mut session = arena();
        let near = session.player.body.pos + Vec2::new(30.0, -16.0);
        let id = session.spawn_enemy_at(near);
        let attack = held(|i| i.attack = true);

        tick(&mut session, &attack, DT);
        let after_first = session.enemy(id).map(|e| e.health.current);
        assert_eq!(after_first, Some(ENEMY_HEALTH - START_ATTACK));

        // Enemy invincibility has lapsed but the player cooldown has not
        session.enemies[0].invincibility = Invincibility::default();
        tick(&mut session, &attack, DT);
        assert_eq!(session.enemy(id).map(|e| e.health.current), after_first);
        assert!(!session.events.contains(&GameEvent::PlayerAttacked));
    }

    #[test]
    fn test_enemy_attack_knocks_enemy_back() {
        let mut session = arena();
        let player_center = session.player.center();
        // Enemy box center 20 px right of the player's
        let sprite = player_center + Vec2::new(20.0, 0.0) - Vec2::splat(32.0);
        session.spawn_enemy_at(sprite);
        let before = session.enemies[0].center();

        tick(&mut session, &TickInput::default(), DT);

        assert_eq!(session.player.hearts, MAX_HEARTS - 1);
        assert!(session.player.invincibility.active);
        let enemy = &session.enemies[0];
        assert!(enemy.is_knocked_back());
        assert!(enemy.attack_cooldown.is_running());
        assert!(enemy.center().x > before.x + 20.0);
        assert!(session.events.iter().any(|e| matches!(e, GameEvent::PlayerHurt { .. })));
    }

    #[test]
    fn test_game_over_suppresses_player() {
        let mut session = arena();
        session.player.hearts = 1;
        session.player.take_damage(200);
        assert_eq!(session.player.hearts, 0);

        tick(&mut session, &TickInput::default(), DT);
        assert_eq!(session.phase, GamePhase::GameOver);
        assert!(session.events.contains(&GameEvent::GameOver));

        let pos = session.player.body.rect();
        let input = held(|i| {
            i.right = true;
            i.attack = true;
        });
        tick(&mut session, &input, DT);
        assert_eq!(session.player.body.rect(), pos);
        assert!(session.events.is_empty());
        assert!(!session.player.is_swinging());
    }

    #[test]
    fn test_restart_only_from_terminal_phase() {
        let mut session = arena();
        let restart = held(|i| i.restart = true);
        tick(&mut session, &restart, DT);
        assert_eq!(session.seed, 12345);

        session.phase = GamePhase::Victory;
        tick(&mut session, &restart, DT);
        assert_eq!(session.phase, GamePhase::Playing);
        assert_eq!(session.seed, 12346);
        assert_eq!(session.events, vec![GameEvent::Restarted]);
    }

    #[test]
    fn test_quit() {
        let mut session = arena();
        let quit = held(|i| i.quit = true);
        assert_eq!(tick(&mut session, &quit, DT), Control::Quit);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameSession::new(SessionConfig::default(), 99999);
        let mut b = GameSession::new(SessionConfig::default(), 99999);

        let inputs = [
            held(|i| i.right = true),
            held(|i| i.attack = true),
            held(|i| i.down = true),
            TickInput::default(),
        ];

        for step in 0..400 {
            let input = &inputs[step % inputs.len()];
            tick(&mut a, input, DT);
            tick(&mut b, input, DT);
        }

        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.player.body.rect(), b.player.body.rect());
        let ea: Vec<_> = a.enemies.iter().map(|e| (e.id, e.body.rect(), e.ai)).collect();
        let eb: Vec<_> = b.enemies.iter().map(|e| (e.id, e.body.rect(), e.ai)).collect();
        assert_eq!(ea, eb);
    }

    fn any_input() -> impl Strategy<Value = TickInput> {
        (any::<[bool; 5]>(), prop::bool::weighted(0.05)).prop_map(|([up, down, left, right, attack], restart)| {
            TickInput {
                up,
                down,
                left,
                right,
                attack,
                restart,
                quit: false,
            }
        })
    }

    fn any_dt() -> impl Strategy<Value = f32> {
        prop_oneof![
            Just(f32::NAN),
            Just(f32::INFINITY),
            -100.0f32..0.0,
            0.0f32..250.0,
        ]
    }

    proptest! {
        #[test]
        fn prop_session_counters_stay_in_range(
            seed in any::<u64>(),
            steps in prop::collection::vec((any_input(), any_dt()), 1..120)
        ) {
            let mut session = GameSession::empty(
                SessionConfig::default(),
                seed,
                TileMap::open(20, 20, TILE_SIZE, TILE_SIZE),
            );
            let center = session.player.center();
            for offset in [Vec2::new(40.0, 0.0), Vec2::new(-30.0, 20.0), Vec2::new(0.0, 90.0)] {
                session.spawn_enemy_at(center + offset - Vec2::splat(32.0));
            }

            for (input, dt) in steps {
                tick(&mut session, &input, dt);
                let player = &session.player;
                prop_assert!(player.hearts <= player.max_hearts);
                prop_assert!(player.invincibility.remaining_ms >= 0.0);
                prop_assert!(player.attack_cooldown.remaining_ms() >= 0.0);
                for enemy in &session.enemies {
                    prop_assert!(enemy.health.current >= 0);
                    prop_assert!(enemy.invincibility.remaining_ms >= 0.0);
                    prop_assert!(enemy.knockback.remaining_ms() >= 0.0);
                    prop_assert!(enemy.attack_cooldown.remaining_ms() >= 0.0);
                }
            }
        }
    }
}
