//! Draw-list construction
//!
//! The core does not rasterize anything. Each frame it produces a flat list
//! of `DrawCommand`s in screen space, back to front, and hands it to a
//! `Renderer`. Entities are ordered by the vertical center of their box
//! (painter's algorithm: lower on screen draws later).

use glam::{IVec2, UVec2};

use crate::animation::Frame;
use crate::assets::AssetCache;
use crate::consts::*;
use crate::sim::{Drawable, GamePhase, GameSession, Rect};

pub type Color = [u8; 4];

pub const WALL_COLOR: Color = [139, 69, 19, 255];
pub const HEALTH_BAR_BACK: Color = [255, 0, 0, 255];
pub const HEALTH_BAR_FILL: Color = [0, 255, 0, 255];
pub const SWING_COLOR: Color = [255, 255, 255, 96];
pub const OVERLAY_COLOR: Color = [0, 0, 0, 180];
pub const TEXT_COLOR: Color = [255, 255, 255, 255];
const HEART_SIZE: i32 = 16;
const HEART_SPACING: i32 = 2;
const HUD_ORIGIN: IVec2 = IVec2::new(20, 20);

/// Screen-space drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Entity sprite; `frame` is `None` when no animation was loaded
    Sprite {
        name: String,
        frame: Option<Frame>,
        dest: Rect,
        alpha: u8,
    },
    Fill { dest: Rect, color: Color },
    Heart { dest: Rect, full: bool },
    Text {
        pos: IVec2,
        text: String,
        size: u32,
        color: Color,
        centered: bool,
    },
}

pub trait Renderer {
    fn render(&mut self, commands: &[DrawCommand]);
}

/// View onto the world, centered on the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    pub offset: IVec2,
    pub viewport: UVec2,
}

impl Camera {
    pub fn follow(target: Rect, viewport: UVec2) -> Self {
        Self {
            offset: target.center() - (viewport / 2).as_ivec2(),
            viewport,
        }
    }

    pub fn to_screen(&self, rect: Rect) -> Rect {
        rect.translated(-self.offset.x, -self.offset.y)
    }

    pub fn screen_rect(&self) -> Rect {
        Rect::new(0, 0, self.viewport.x as i32, self.viewport.y as i32)
    }

    pub fn is_visible(&self, world_rect: Rect) -> bool {
        self.to_screen(world_rect).intersects(&self.screen_rect())
    }
}

/// Everything to draw for one frame
pub fn build_draw_list(session: &GameSession, assets: &AssetCache, viewport: UVec2, fps: Option<u32>) -> Vec<DrawCommand> {
    let camera = Camera::follow(session.player.body.rect(), viewport);
    let mut out = Vec::new();

    for wall in session.world.rects() {
        if camera.is_visible(*wall) {
            out.push(DrawCommand::Fill {
                dest: camera.to_screen(*wall),
                color: WALL_COLOR,
            });
        }
    }

    let mut drawables: Vec<&dyn Drawable> = Vec::with_capacity(session.enemies.len() + 1);
    drawables.push(&session.player);
    drawables.extend(session.enemies.iter().map(|e| e as &dyn Drawable));
    drawables.sort_by_key(|d| d.depth());

    for d in drawables {
        if !camera.is_visible(d.sprite_rect()) {
            continue;
        }
        let frame = assets
            .cached_animation(d.sprite_name())
            .and_then(|set| set.frame(d.facing(), d.frame_index()));
        out.push(DrawCommand::Sprite {
            name: d.sprite_name().to_string(),
            frame,
            dest: camera.to_screen(d.sprite_rect()),
            alpha: d.alpha(),
        });
        if let Some(fraction) = d.health_fraction() {
            push_health_bar(&mut out, camera.to_screen(d.bounds()), fraction);
        }
    }

    if session.player.is_swinging() {
        out.push(DrawCommand::Fill {
            dest: camera.to_screen(session.player.attack_rect()),
            color: SWING_COLOR,
        });
    }

    push_hud(&mut out, session, viewport, fps);
    if session.phase.is_terminal() {
        push_overlay(&mut out, session, viewport);
    }
    out
}

/// 30x4 bar centered over `anchor`, its bottom 5 px above the box
fn push_health_bar(out: &mut Vec<DrawCommand>, anchor: Rect, fraction: f32) {
    let x = anchor.center().x - HEALTH_BAR_WIDTH / 2;
    let y = anchor.top() - HEALTH_BAR_GAP - HEALTH_BAR_HEIGHT;
    let fill = (fraction.clamp(0.0, 1.0) * HEALTH_BAR_WIDTH as f32) as i32;
    out.push(DrawCommand::Fill {
        dest: Rect::new(x, y, HEALTH_BAR_WIDTH, HEALTH_BAR_HEIGHT),
        color: HEALTH_BAR_BACK,
    });
    out.push(DrawCommand::Fill {
        dest: Rect::new(x, y, fill, HEALTH_BAR_HEIGHT),
        color: HEALTH_BAR_FILL,
    });
}

fn push_hud(out: &mut Vec<DrawCommand>, session: &GameSession, viewport: UVec2, fps: Option<u32>) {
    let player = &session.player;
    for i in 0..player.max_hearts {
        let x = HUD_ORIGIN.x + (HEART_SIZE + HEART_SPACING) * i as i32;
        out.push(DrawCommand::Heart {
            dest: Rect::new(x, HUD_ORIGIN.y, HEART_SIZE, HEART_SIZE),
            full: i < player.hearts,
        });
    }

    out.push(DrawCommand::Text {
        pos: IVec2::new(HUD_ORIGIN.x, HUD_ORIGIN.y + 30),
        text: session.stats.hud_line(),
        size: 24,
        color: TEXT_COLOR,
        centered: false,
    });
    out.push(DrawCommand::Text {
        pos: IVec2::new(HUD_ORIGIN.x, viewport.y as i32 - 40),
        text: "WASD: Move | SPACE: Attack | ESC: Quit".to_string(),
        size: 24,
        color: [200, 200, 200, 255],
        centered: false,
    });
    if let Some(fps) = fps {
        out.push(DrawCommand::Text {
            pos: IVec2::new(viewport.x as i32 - 90, 10),
            text: format!("FPS: {fps}"),
            size: 24,
            color: TEXT_COLOR,
            centered: false,
        });
    }
}

fn push_overlay(out: &mut Vec<DrawCommand>, session: &GameSession, viewport: UVec2) {
    let center = (viewport / 2).as_ivec2();
    let (title, color) = match session.phase {
        GamePhase::Victory => ("VICTORY!", [0, 255, 0, 255]),
        _ => ("GAME OVER", [255, 0, 0, 255]),
    };

    out.push(DrawCommand::Fill {
        dest: Rect::new(0, 0, viewport.x as i32, viewport.y as i32),
        color: OVERLAY_COLOR,
    });
    let lines = [
        (title.to_string(), 72, color, -80),
        (
            format!(
                "Level {} | Enemies Defeated: {}",
                session.stats.level, session.stats.enemies_defeated
            ),
            36,
            TEXT_COLOR,
            0,
        ),
        ("Press R to play again".to_string(), 36, [200, 200, 255, 255], 60),
    ];
    for (text, size, color, dy) in lines {
        out.push(DrawCommand::Text {
            pos: center + IVec2::new(0, dy),
            text,
            size,
            color,
            centered: true,
        });
    }
}

/// Renderer that only logs what it was asked to draw
#[derive(Debug, Default)]
pub struct LogRenderer {
    pub frames: u64,
    last_overlay: Option<String>,
}

impl Renderer for LogRenderer {
    fn render(&mut self, commands: &[DrawCommand]) {
        self.frames += 1;
        log::trace!("Frame {}: {} draw commands", self.frames, commands.len());

        let overlay = commands.iter().find_map(|c| match c {
            DrawCommand::Text {
                text, centered: true, ..
            } => Some(text.clone()),
            _ => None,
        });
        if overlay != self.last_overlay {
            if let Some(text) = &overlay {
                log::info!("Screen: {text}");
            }
            self.last_overlay = overlay;
        }
    }
}
