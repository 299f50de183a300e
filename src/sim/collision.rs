//! Entity motion and collision resolution against the static world
//!
//! Bodies move in whole-pixel steps. Fractional velocity is banked in a
//! per-axis remainder and paid out once it reaches a full pixel, so slow
//! movers keep their average speed. Each axis is resolved on its own, X
//! first, then Y from the already-resolved X position.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::map::CollisionWorld;
use super::rect::Rect;
use crate::consts::RESTITUTION;

/// Remainders this close to a whole pixel are treated as whole
const SNAP_EPSILON: f32 = 1e-4;

/// Sub-pixel accumulator, one remainder per axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubPixel {
    pub remainder: Vec2,
}

impl SubPixel {
    /// Bank `delta` and return the whole-pixel step now due on each axis
    pub fn push(&mut self, delta: Vec2) -> IVec2 {
        let (sx, rx) = Self::settle(self.remainder.x + delta.x);
        let (sy, ry) = Self::settle(self.remainder.y + delta.y);
        self.remainder = Vec2::new(rx, ry);
        IVec2::new(sx, sy)
    }

    fn settle(v: f32) -> (i32, f32) {
        let nearest = v.round();
        let v = if (v - nearest).abs() < SNAP_EPSILON { nearest } else { v };
        if v.abs() >= 1.0 {
            let whole = v.trunc();
            (whole as i32, v - whole)
        } else {
            (0, v)
        }
    }

    pub fn clear_x(&mut self) {
        self.remainder.x = 0.0;
    }

    pub fn clear_y(&mut self) {
        self.remainder.y = 0.0;
    }
}

/// Collision box of an entity, inset inside its sprite footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Top-left of the collision box (authoritative)
    pub pos: Vec2,
    pub size: IVec2,
    /// Margin between the collision box and the sprite footprint
    pub inset: i32,
    pub sub: SubPixel,
}

impl Body {
    /// Body for a square sprite whose top-left is at `sprite_pos`
    pub fn from_sprite(sprite_pos: Vec2, sprite_size: i32, inset: i32, min_box: i32) -> Self {
        let side = (sprite_size - 2 * inset).max(min_box);
        let inset = (sprite_size - side) / 2;
        Self {
            pos: sprite_pos + Vec2::splat(inset as f32),
            size: IVec2::splat(side),
            inset,
            sub: SubPixel::default(),
        }
    }

    /// Integer collision box derived from the float position
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.pos.x.floor() as i32,
            self.pos.y.floor() as i32,
            self.size.x,
            self.size.y,
        )
    }

    pub fn sprite_rect(&self) -> Rect {
        self.rect().outset(self.inset)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center_f32()
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.pos = Vec2::new(rect.x as f32, rect.y as f32);
    }
}

/// How a body reacts when an axis is blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Stop flush against the blocking face
    Snap,
    /// Stay put on that axis; the caller reflects its velocity
    Bounce,
}

/// Result of resolving one requested step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub rect: Rect,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

impl MoveOutcome {
    /// Velocity after a bounce: blocked axes are inverted and damped
    pub fn bounce(&self, vel: Vec2) -> Vec2 {
        Vec2::new(
            if self.blocked_x { -vel.x * RESTITUTION } else { vel.x },
            if self.blocked_y { -vel.y * RESTITUTION } else { vel.y },
        )
    }
}

/// Resolve a whole-pixel step against the world, X then Y
pub fn resolve_step(rect: Rect, step: IVec2, world: &CollisionWorld, response: Response) -> MoveOutcome {
    let mut out = MoveOutcome {
        rect,
        blocked_x: false,
        blocked_y: false,
    };

    if step.x != 0 {
        let (x, blocked) = resolve_axis(out.rect, step.x, Axis::X, world, response);
        out.rect.x = x;
        out.blocked_x = blocked;
    }
    if step.y != 0 {
        let (y, blocked) = resolve_axis(out.rect, step.y, Axis::Y, world, response);
        out.rect.y = y;
        out.blocked_y = blocked;
    }
    out
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn resolve_axis(rect: Rect, delta: i32, axis: Axis, world: &CollisionWorld, response: Response) -> (i32, bool) {
    let (start, size, moved) = match axis {
        Axis::X => (rect.x, rect.w, rect.translated(delta, 0)),
        Axis::Y => (rect.y, rect.h, rect.translated(0, delta)),
    };
    if world.is_free(&moved) {
        return (start + delta, false);
    }
    if response == Response::Bounce {
        return (start, true);
    }

    // Snap to the nearest face among everything the moved box touches
    let faces = world.overlapping(moved).map(|wall| match (axis, delta > 0) {
        (Axis::X, true) => wall.left() - size,
        (Axis::X, false) => wall.right(),
        (Axis::Y, true) => wall.top() - size,
        (Axis::Y, false) => wall.bottom(),
    });
    let snapped = if delta > 0 {
        faces.min().unwrap_or(start).clamp(start, start + delta)
    } else {
        faces.max().unwrap_or(start).clamp(start + delta, start)
    };
    (snapped, true)
}

/// Integrate `vel * scale` into `body` and resolve against the world
pub fn integrate(body: &mut Body, vel: Vec2, scale: f32, world: &CollisionWorld, response: Response) -> MoveOutcome {
    let step = body.sub.push(vel * scale);
    let rect = body.rect();
    if step == IVec2::ZERO {
        return MoveOutcome {
            rect,
            blocked_x: false,
            blocked_y: false,
        };
    }
    let out = resolve_step(rect, step, world, response);
    if out.blocked_x {
        body.sub.clear_x();
    }
    if out.blocked_y {
        body.sub.clear_y();
    }
    body.set_rect(out.rect);
    out
}

/// Displace a body by an externally imposed offset (knockback)
pub fn shove(body: &mut Body, offset: Vec2, world: &CollisionWorld) -> MoveOutcome {
    let step = offset.round().as_ivec2();
    let out = resolve_step(body.rect(), step, world, Response::Snap);
    body.set_rect(out.rect);
    out
}
