//! Sprite animation
//!
//! `AnimationSet` maps a facing direction to a strip of frames cut from a
//! sprite sheet. `Animator` is the per-entity frame clock the simulation
//! advances; it knows nothing about pixels.

use serde::{Deserialize, Serialize};

use crate::assets::SpriteHandle;
use crate::sim::{Facing, Rect};

/// One frame: a source rect inside a sprite sheet, optionally mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub sprite: SpriteHandle,
    pub src: Rect,
    pub flip_x: bool,
}

impl Frame {
    pub fn mirrored(self) -> Self {
        Self {
            flip_x: !self.flip_x,
            ..self
        }
    }
}

/// Frames for each of the four facings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationSet {
    down: Vec<Frame>,
    left: Vec<Frame>,
    right: Vec<Frame>,
    up: Vec<Frame>,
}

impl AnimationSet {
    /// Build from per-direction strips (down, left, right, up). Empty strips
    /// are filled from their neighbours.
    pub fn from_strips(down: Vec<Frame>, left: Vec<Frame>, right: Vec<Frame>, up: Vec<Frame>) -> Self {
        let mut set = Self { down, left, right, up };
        set.fill_missing();
        set
    }

    /// Cut a sheet laid out as rows down/left/right/up, `frames` per row.
    /// Sheets with fewer rows reuse what is there.
    pub fn from_sheet(sprite: SpriteHandle, sheet: (u32, u32), frame: (u32, u32), frames: usize) -> Self {
        let (fw, fh) = (frame.0.max(1), frame.1.max(1));
        let rows = (sheet.1 / fh) as usize;
        let cols = ((sheet.0 / fw) as usize).min(frames);

        let strip = |row: usize| -> Vec<Frame> {
            if row >= rows {
                return Vec::new();
            }
            (0..cols)
                .map(|col| Frame {
                    sprite,
                    src: Rect::new((col as u32 * fw) as i32, (row as u32 * fh) as i32, fw as i32, fh as i32),
                    flip_x: false,
                })
                .collect()
        };

        Self::from_strips(strip(0), strip(1), strip(2), strip(3))
    }

    /// The same still frame for every facing
    pub fn still(sprite: SpriteHandle, size: (u32, u32)) -> Self {
        let frame = Frame {
            sprite,
            src: Rect::new(0, 0, size.0 as i32, size.1 as i32),
            flip_x: false,
        };
        Self::from_strips(vec![frame], Vec::new(), Vec::new(), Vec::new())
    }

    fn fill_missing(&mut self) {
        if self.right.is_empty() && !self.left.is_empty() {
            log::debug!("Animation: right frames mirrored from left");
            self.right = self.left.iter().map(|f| f.mirrored()).collect();
        }
        if self.left.is_empty() && !self.right.is_empty() {
            log::debug!("Animation: left frames mirrored from right");
            self.left = self.right.iter().map(|f| f.mirrored()).collect();
        }
        if self.up.is_empty() && !self.down.is_empty() {
            log::debug!("Animation: up frames copied from down");
            self.up = self.down.clone();
        }

        let donor = [&self.down, &self.left, &self.right, &self.up]
            .into_iter()
            .find(|strip| !strip.is_empty())
            .cloned();
        if let Some(donor) = donor {
            for strip in [&mut self.down, &mut self.left, &mut self.right, &mut self.up] {
                if strip.is_empty() {
                    *strip = donor.clone();
                }
            }
        }
    }

    pub fn frames(&self, facing: Facing) -> &[Frame] {
        match facing {
            Facing::Down => &self.down,
            Facing::Left => &self.left,
            Facing::Right => &self.right,
            Facing::Up => &self.up,
        }
    }

    /// Frame for a facing; out-of-range indices clamp to the last frame
    pub fn frame(&self, facing: Facing, index: usize) -> Option<Frame> {
        let frames = self.frames(facing);
        let last = frames.len().checked_sub(1)?;
        frames.get(index.min(last)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.down.is_empty()
    }
}

/// Frame clock: advances only while the owner is moving
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    pub frame: usize,
    elapsed_ms: f32,
    frame_ms: f32,
    frame_count: usize,
}

impl Animator {
    pub fn new(frame_count: usize, frame_ms: f32) -> Self {
        Self {
            frame: 0,
            elapsed_ms: 0.0,
            frame_ms: frame_ms.max(1.0),
            frame_count: frame_count.max(1),
        }
    }

    pub fn advance(&mut self, dt_ms: f32, moving: bool) {
        if !moving {
            self.reset();
            return;
        }
        self.elapsed_ms += dt_ms.max(0.0);
        while self.elapsed_ms >= self.frame_ms {
            self.elapsed_ms -= self.frame_ms;
            self.frame = (self.frame + 1) % self.frame_count;
        }
    }

    pub fn reset(&mut self) {
        self.frame = 0;
        self.elapsed_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SpriteHandle {
        SpriteHandle(0)
    }

    #[test]
    fn test_animator_cycles_while_moving() {
        let mut anim = Animator::new(3, 200.0);
        anim.advance(150.0, true);
        assert_eq!(anim.frame, 0);
        anim.advance(100.0, true);
        assert_eq!(anim.frame, 1);
        anim.advance(400.0, true);
        assert_eq!(anim.frame, 0);
    }

    #[test]
    fn test_animator_resets_when_idle() {
        let mut anim = Animator::new(4, 150.0);
        anim.advance(160.0, true);
        assert_eq!(anim.frame, 1);
        anim.advance(16.0, false);
        assert_eq!(anim.frame, 0);
    }

    #[test]
    fn test_short_sheet_fills_directions() {
        // Two rows: down and left only
        let set = AnimationSet::from_sheet(handle(), (96, 64), (32, 32), 3);
        assert_eq!(set.frames(Facing::Left).len(), 3);
        let right = set.frames(Facing::Right);
        assert_eq!(right.len(), 3);
        assert!(right.iter().all(|f| f.flip_x));
        assert_eq!(right[0].src, set.frames(Facing::Left)[0].src);
        assert_eq!(set.frames(Facing::Up), set.frames(Facing::Down));
    }

    #[test]
    fn test_full_sheet_uses_own_rows() {
        let set = AnimationSet::from_sheet(handle(), (512, 256), (64, 64), 4);
        assert_eq!(set.frames(Facing::Up)[0].src, Rect::new(0, 192, 64, 64));
        assert_eq!(set.frames(Facing::Right)[3].src, Rect::new(192, 128, 64, 64));
        assert!(!set.frames(Facing::Right)[0].flip_x);
    }

    #[test]
    fn test_frame_index_is_clamped() {
        let set = AnimationSet::still(handle(), (32, 32));
        assert_eq!(set.frame(Facing::Left, 7), set.frame(Facing::Left, 0));
        assert!(set.frame(Facing::Up, 2).is_some());
        assert!(AnimationSet::default().frame(Facing::Down, 0).is_none());
    }
}
