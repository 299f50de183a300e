//! Tile maps and the static collision world built from them
//!
//! Map files and the generated placeholder both produce the same `TileMap`
//! value. The `CollisionWorld` derived from it is read-only for the rest of
//! the session.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rect::Rect;
use super::spatial::SpatialIndex;
use crate::consts::*;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("could not read map file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse map file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("map is {width}x{height} tiles but carries {found} {layer} entries")]
    LayerSize {
        layer: &'static str,
        width: u32,
        height: u32,
        found: usize,
    },
    #[error("map has zero-sized tiles or dimensions")]
    Degenerate,
    #[error("map is {width_px}x{height_px} px over {tiles} tiles, larger than supported")]
    TooLarge { width_px: u64, height_px: u64, tiles: u64 },
    #[error("collision object {index} ({rect:?}) is outside the supported range")]
    ObjectOutOfRange { index: usize, rect: Rect },
}

/// Saturating conversion from map pixel units
fn px(v: u64) -> i32 {
    v.min(i32::MAX as u64) as i32
}

/// Tile grid, collision grid and dimensions of a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    pub tile_width: u32,
    pub tile_height: u32,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Row-major tile ids (0 = ground)
    #[serde(default)]
    pub tiles: Vec<u32>,
    /// Row-major blocked flags; may be empty when `objects` carries the geometry
    #[serde(default)]
    pub collision: Vec<bool>,
    /// Free-form blocked rectangles in pixels
    #[serde(default)]
    pub objects: Vec<Rect>,
    /// Generated rather than loaded
    #[serde(default)]
    pub placeholder: bool,
}

impl TileMap {
    /// Map with every tile open
    pub fn open(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            tile_width,
            tile_height,
            width,
            height,
            tiles: vec![0; n],
            collision: vec![false; n],
            objects: Vec::new(),
            placeholder: false,
        }
    }

    /// Generated level: blocked border plus scattered single-tile obstacles
    pub fn placeholder<R: Rng>(rng: &mut R) -> Self {
        let n = PLACEHOLDER_MAP_TILES;
        let mut map = Self::open(n, n, TILE_SIZE, TILE_SIZE);
        map.placeholder = true;

        for x in 0..n {
            map.set_blocked(x, 0, true);
            map.set_blocked(x, n - 1, true);
        }
        for y in 1..n - 1 {
            map.set_blocked(0, y, true);
            map.set_blocked(n - 1, y, true);
            for x in 1..n - 1 {
                if rng.random::<f64>() < PLACEHOLDER_OBSTACLE_CHANCE {
                    map.set_blocked(x, y, true);
                }
            }
        }
        for (tile, &blocked) in map.tiles.iter_mut().zip(&map.collision) {
            *tile = u32::from(blocked);
        }
        map
    }

    /// Parse a JSON map document
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let map: TileMap = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    pub fn load_json(path: &Path) -> Result<Self, MapError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load `path` if given, otherwise (or on any failure) generate a placeholder
    pub fn load_or_placeholder<R: Rng>(path: Option<&Path>, rng: &mut R) -> Self {
        if let Some(path) = path {
            match Self::load_json(path) {
                Ok(map) => {
                    log::info!(
                        "Loaded map {} ({}x{} tiles, {} objects)",
                        path.display(),
                        map.width,
                        map.height,
                        map.objects.len()
                    );
                    return map;
                }
                Err(e) => {
                    log::warn!("Error loading map {}: {e}; using placeholder", path.display());
                }
            }
        }
        Self::placeholder(rng)
    }

    fn validate(&self) -> Result<(), MapError> {
        if self.width == 0 || self.height == 0 || self.tile_width == 0 || self.tile_height == 0 {
            return Err(MapError::Degenerate);
        }
        let width_px = u64::from(self.width) * u64::from(self.tile_width);
        let height_px = u64::from(self.height) * u64::from(self.tile_height);
        let tiles = u64::from(self.width) * u64::from(self.height);
        let extent = MAX_MAP_EXTENT as u64;
        if width_px > extent || height_px > extent || tiles > MAX_MAP_TILES {
            return Err(MapError::TooLarge {
                width_px,
                height_px,
                tiles,
            });
        }
        for (index, rect) in self.objects.iter().enumerate() {
            let in_range = |v: i32| (-MAX_MAP_EXTENT..=MAX_MAP_EXTENT).contains(&v);
            let sized = (0..=MAX_MAP_EXTENT).contains(&rect.w) && (0..=MAX_MAP_EXTENT).contains(&rect.h);
            if !sized || !in_range(rect.x) || !in_range(rect.y) {
                return Err(MapError::ObjectOutOfRange { index, rect: *rect });
            }
        }

        let n = tiles as usize;
        for (layer, len) in [("tile", self.tiles.len()), ("collision", self.collision.len())] {
            if len != 0 && len != n {
                return Err(MapError::LayerSize {
                    layer,
                    width: self.width,
                    height: self.height,
                    found: len,
                });
            }
        }
        Ok(())
    }

    pub fn pixel_width(&self) -> i32 {
        px(u64::from(self.width) * u64::from(self.tile_width))
    }

    pub fn pixel_height(&self) -> i32 {
        px(u64::from(self.height) * u64::from(self.tile_height))
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn is_blocked(&self, x: u32, y: u32) -> bool {
        self.index(x, y)
            .and_then(|i| self.collision.get(i).copied())
            .unwrap_or(false)
    }

    pub fn set_blocked(&mut self, x: u32, y: u32, blocked: bool) {
        let n = self.width as usize * self.height as usize;
        if self.collision.len() != n {
            self.collision.resize(n, false);
        }
        if let Some(i) = self.index(x, y) {
            self.collision[i] = blocked;
        }
    }

    /// Pixel rect of one tile
    pub fn tile_rect(&self, x: u32, y: u32) -> Rect {
        Rect::new(
            px(u64::from(x) * u64::from(self.tile_width)),
            px(u64::from(y) * u64::from(self.tile_height)),
            px(u64::from(self.tile_width)),
            px(u64::from(self.tile_height)),
        )
    }
}

/// Four walls of `thickness` lining the inside of a `width` x `height` frame
pub fn boundary_walls(width: i32, height: i32, thickness: i32) -> [Rect; 4] {
    [
        Rect::new(0, 0, width, thickness),
        Rect::new(0, 0, thickness, height),
        Rect::new(0, height - thickness, width, thickness),
        Rect::new(width - thickness, 0, thickness, height),
    ]
}

/// Immutable set of blocked rectangles plus a static broad-phase grid
#[derive(Debug, Clone)]
pub struct CollisionWorld {
    rects: Vec<Rect>,
    grid: SpatialIndex<usize>,
    bounds: Rect,
}

impl CollisionWorld {
    pub fn new(rects: Vec<Rect>) -> Self {
        let mut grid = SpatialIndex::new(SPATIAL_CELL_SIZE);
        grid.rebuild(rects.iter().copied().enumerate());
        let bounds = rects.iter().fold(None::<Rect>, |acc, r| {
            Some(match acc {
                None => *r,
                Some(b) => {
                    let x0 = b.left().min(r.left());
                    let y0 = b.top().min(r.top());
                    let x1 = b.right().max(r.right());
                    let y1 = b.bottom().max(r.bottom());
                    Rect::new(x0, y0, x1 - x0, y1 - y0)
                }
            })
        });
        Self {
            rects,
            grid,
            bounds: bounds.unwrap_or_default(),
        }
    }

    /// Blocked geometry for a map: object layer first, then blocked tiles,
    /// then boundary walls for generated maps, then a fixed fallback frame
    pub fn from_map(map: &TileMap) -> Self {
        let mut rects = map.objects.clone();
        if !rects.is_empty() {
            log::info!("Loaded {} collision objects", rects.len());
        } else {
            for y in 0..map.height {
                for x in 0..map.width {
                    if map.is_blocked(x, y) {
                        rects.push(map.tile_rect(x, y));
                    }
                }
            }
            if !rects.is_empty() {
                log::info!("Generated {} collision rectangles from tiles", rects.len());
            }
        }

        if map.placeholder {
            rects.extend(boundary_walls(
                map.pixel_width(),
                map.pixel_height(),
                BOUNDARY_WALL_THICKNESS,
            ));
            log::debug!("Added placeholder walls around map edges");
        }

        if rects.is_empty() {
            log::warn!("No collision rects were found, creating basic boundaries");
            rects.extend(boundary_walls(
                FALLBACK_FRAME_WIDTH,
                FALLBACK_FRAME_HEIGHT,
                BOUNDARY_WALL_THICKNESS,
            ));
        }

        Self::new(rects)
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Union of all blocked rects
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Blocked rects overlapping `rect`, in list order
    ///
    /// The grid narrows the candidates; every candidate is still tested exactly.
    pub fn overlapping(&self, rect: Rect) -> impl Iterator<Item = &Rect> + '_ {
        let mut candidates = self.grid.query_rect(&rect);
        candidates.sort_unstable();
        candidates
            .into_iter()
            .map(move |i| &self.rects[i])
            .filter(move |r| r.intersects(&rect))
    }

    pub fn first_overlap(&self, rect: &Rect) -> Option<&Rect> {
        self.overlapping(*rect).next()
    }

    pub fn is_free(&self, rect: &Rect) -> bool {
        self.first_overlap(rect).is_none()
    }
}
