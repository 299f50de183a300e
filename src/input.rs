//! Input sources
//!
//! A source is polled once per tick and returns the held movement keys plus
//! the discrete attack/restart/quit actions for that tick.

use std::collections::VecDeque;

use glam::Vec2;

pub use crate::sim::TickInput;
use crate::sim::{GamePhase, GameSession, Movable, Rect};

pub trait InputSource {
    fn poll(&mut self, session: &GameSession) -> TickInput;
}

/// Replays a fixed list of inputs, then idles
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: VecDeque<TickInput>,
}

impl ScriptedInput {
    pub fn new(inputs: impl IntoIterator<Item = TickInput>) -> Self {
        Self {
            queue: inputs.into_iter().collect(),
        }
    }

    /// Hold `input` for `ticks` ticks
    pub fn hold(mut self, input: TickInput, ticks: usize) -> Self {
        self.queue.extend(std::iter::repeat_n(input, ticks));
        self
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, _session: &GameSession) -> TickInput {
        self.queue.pop_front().unwrap_or_default()
    }
}

/// Ticks without progress before the autopilot sidesteps
const STUCK_TICKS: u32 = 20;
/// Length of a sidestep
const DETOUR_TICKS: u32 = 30;
/// Dead zone when lining up with a target (px)
const ALIGN_EPSILON: f32 = 4.0;

/// Walks toward the nearest enemy and attacks when in range
#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    last_rect: Option<Rect>,
    stuck: u32,
    detour: u32,
    detour_dir: Vec2,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    fn steer(input: &mut TickInput, dir: Vec2) {
        input.left = dir.x < -ALIGN_EPSILON;
        input.right = dir.x > ALIGN_EPSILON;
        input.up = dir.y < -ALIGN_EPSILON;
        input.down = dir.y > ALIGN_EPSILON;
    }
}

impl InputSource for Autopilot {
    fn poll(&mut self, session: &GameSession) -> TickInput {
        let mut input = TickInput::default();
        if session.phase != GamePhase::Playing {
            return input;
        }

        let player = &session.player;
        let origin = player.center();
        let nearest = session
            .enemies
            .iter()
            .map(|e| e.center())
            .min_by(|a, b| a.distance_squared(origin).total_cmp(&b.distance_squared(origin)));
        let Some(target) = nearest else {
            return input;
        };

        let to_target = target - origin;
        input.attack = to_target.length() < player.attack_range * 0.8;

        let rect = player.body.rect();
        if self.detour > 0 {
            self.detour -= 1;
            Self::steer(&mut input, self.detour_dir);
        } else {
            Self::steer(&mut input, to_target);
            let requesting = input.left || input.right || input.up || input.down;
            if requesting && self.last_rect == Some(rect) {
                self.stuck += 1;
            } else {
                self.stuck = 0;
            }
            if self.stuck >= STUCK_TICKS {
                self.stuck = 0;
                self.detour = DETOUR_TICKS;
                // Perpendicular to the blocked heading
                self.detour_dir = Vec2::new(-to_target.y, to_target.x).normalize_or_zero() * (ALIGN_EPSILON * 4.0);
                log::debug!("Autopilot stuck at ({}, {}), sidestepping", rect.x, rect.y);
            }
        }
        self.last_rect = Some(rect);
        input
    }
}
