//! Uniform-grid spatial index
//!
//! Broad-phase only: membership says "maybe close", never "exists". The
//! index is rebuilt from scratch whenever the bodies it tracks move.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use glam::IVec2;

use super::rect::Rect;

pub type CellCoord = (i32, i32);

/// Grid bucketing of keyed rectangles by cell
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    cell_size: i32,
    cells: HashMap<CellCoord, Vec<K>>,
}

impl<K: Copy + Eq + Hash> SpatialIndex<K> {
    pub fn new(cell_size: i32) -> Self {
        Self {
            cell_size: cell_size.max(1),
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Cell containing a pixel (floor division, so negative coordinates work)
    pub fn cell_of(&self, p: IVec2) -> CellCoord {
        (p.x.div_euclid(self.cell_size), p.y.div_euclid(self.cell_size))
    }

    /// Inclusive cell range covered by a rect's pixels
    fn cell_span(&self, rect: &Rect) -> (CellCoord, CellCoord) {
        let min = self.cell_of(IVec2::new(rect.left(), rect.top()));
        if rect.is_empty() {
            return (min, min);
        }
        let max = self.cell_of(IVec2::new(rect.right() - 1, rect.bottom() - 1));
        (min, max)
    }

    /// Insert `key` into every cell `rect` overlaps
    pub fn insert(&mut self, key: K, rect: &Rect) {
        let ((x0, y0), (x1, y1)) = self.cell_span(rect);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(key);
            }
        }
    }

    /// Replace the whole contents with a fresh set of keyed rects
    pub fn rebuild<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, Rect)>,
    {
        self.clear();
        for (key, rect) in items {
            self.insert(key, &rect);
        }
    }

    pub fn cell(&self, coord: &CellCoord) -> &[K] {
        self.cells.get(coord).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Keys in the 3x3 block of cells around `center`, without `key` itself
    /// and without duplicates
    pub fn neighbors(&self, key: K, center: IVec2) -> Vec<K> {
        let (cx, cy) = self.cell_of(center);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for &k in self.cell(&(cx + dx, cy + dy)) {
                    if k != key && seen.insert(k) {
                        out.push(k);
                    }
                }
            }
        }
        out
    }

    /// Keys sharing at least one cell with `rect`, without duplicates
    pub fn query_rect(&self, rect: &Rect) -> Vec<K> {
        let ((x0, y0), (x1, y1)) = self.cell_span(rect);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                for &k in self.cell(&(cx, cy)) {
                    if seen.insert(k) {
                        out.push(k);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_multi_cell_membership() {
        let mut index = SpatialIndex::new(64);
        // Straddles the x=64 and y=64 boundaries
        index.insert(7u32, &Rect::new(50, 50, 30, 30));
        assert_eq!(index.cell(&(0, 0)), &[7]);
        assert_eq!(index.cell(&(1, 0)), &[7]);
        assert_eq!(index.cell(&(0, 1)), &[7]);
        assert_eq!(index.cell(&(1, 1)), &[7]);
        assert_eq!(index.occupied_cells(), 4);
    }

    #[test]
    fn test_rect_ending_on_boundary_stays_in_one_cell() {
        let mut index = SpatialIndex::new(64);
        index.insert(1u32, &Rect::new(0, 0, 64, 64));
        assert_eq!(index.occupied_cells(), 1);
    }

    #[test]
    fn test_neighbors_excludes_self_and_dedups() {
        let mut index = SpatialIndex::new(64);
        index.insert(1u32, &Rect::new(60, 60, 10, 10));
        index.insert(2u32, &Rect::new(50, 50, 40, 40));
        let near = index.neighbors(1, IVec2::new(65, 65));
        assert_eq!(near, vec![2]);
    }

    #[test]
    fn test_neighbors_ignores_far_cells() {
        let mut index = SpatialIndex::new(64);
        index.insert(1u32, &Rect::new(0, 0, 10, 10));
        index.insert(2u32, &Rect::new(300, 300, 10, 10));
        assert!(index.neighbors(1, IVec2::new(5, 5)).is_empty());
    }

    #[test]
    fn test_negative_coordinates() {
        let index: SpatialIndex<u32> = SpatialIndex::new(64);
        assert_eq!(index.cell_of(IVec2::new(-1, -64)), (-1, -1));
        assert_eq!(index.cell_of(IVec2::new(-65, 0)), (-2, 0));
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = SpatialIndex::new(64);
        index.insert(1u32, &Rect::new(0, 0, 10, 10));
        index.rebuild([(2u32, Rect::new(200, 200, 10, 10))]);
        assert!(index.cell(&(0, 0)).is_empty());
        assert_eq!(index.cell(&(3, 3)), &[2]);
    }

    proptest! {
        #[test]
        fn prop_close_centers_see_each_other(
            ax in -500i32..500, ay in -500i32..500,
            ox in -63i32..64, oy in -63i32..64,
            w in 1i32..80, h in 1i32..80,
        ) {
            let a = Rect::new(ax, ay, w, h);
            // Place b so that its center is within one cell of a's center
            let target = a.center() + IVec2::new(ox, oy);
            let b = Rect::new(target.x - w / 2, target.y - h / 2, w, h);
            prop_assume!(b.center() == target);

            let mut index = SpatialIndex::new(64);
            index.insert(0u32, &a);
            index.insert(1u32, &b);

            prop_assert!(index.neighbors(0, a.center()).contains(&1));
            prop_assert!(index.neighbors(1, b.center()).contains(&0));
        }

        #[test]
        fn prop_query_rect_has_no_duplicates(
            rects in proptest::collection::vec((-300i32..300, -300i32..300, 1i32..200, 1i32..200), 1..20)
        ) {
            let mut index = SpatialIndex::new(64);
            for (i, &(x, y, w, h)) in rects.iter().enumerate() {
                index.insert(i, &Rect::new(x, y, w, h));
            }
            let hits = index.query_rect(&Rect::new(-300, -300, 600, 600));
            let unique: HashSet<_> = hits.iter().copied().collect();
            prop_assert_eq!(unique.len(), hits.len());
            prop_assert_eq!(hits.len(), rects.len());
        }
    }
}
