//! Cylindrical map geometry and the shared neighbor iteration.

use serde::{Deserialize, Serialize};

use crate::{Direction, TilePos};

/// Dimensions of a map that wraps along the x-axis and is bounded along y.
///
/// Every component that walks the eight neighbors of a tile goes through
/// [`MapGeometry::adjacent`], so wrapping and edge handling live in one place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapGeometry {
    width: u32,
    height: u32,
}

impl MapGeometry {
    /// Creates a geometry with the provided dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of columns in the map.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the map.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of tiles, or zero when the dimensions overflow `usize`.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        let width = usize::try_from(self.width).unwrap_or(0);
        let height = usize::try_from(self.height).unwrap_or(0);
        width.checked_mul(height).unwrap_or(0)
    }

    /// Reports whether the position lies on the map.
    #[must_use]
    pub const fn contains(&self, pos: TilePos) -> bool {
        pos.x() < self.width && pos.y() < self.height
    }

    /// Row-major index of the position, if it lies on the map.
    #[must_use]
    pub fn index(&self, pos: TilePos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(pos.x()).ok()?;
        let row = usize::try_from(pos.y()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Position stored at the provided row-major index.
    #[must_use]
    pub fn pos_at(&self, index: usize) -> Option<TilePos> {
        if index >= self.tile_count() {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let x = u32::try_from(index % width).ok()?;
        let y = u32::try_from(index / width).ok()?;
        Some(TilePos::new(x, y))
    }

    /// Tile reached by a single step in `dir`, wrapping across the x-axis.
    ///
    /// Returns `None` when the step would leave the map vertically or when the
    /// origin is not on the map.
    #[must_use]
    pub fn step(&self, pos: TilePos, dir: Direction) -> Option<TilePos> {
        if !self.contains(pos) {
            return None;
        }
        let (dx, dy) = dir.offset();
        let y = i64::from(pos.y()) + i64::from(dy);
        if y < 0 || y >= i64::from(self.height) {
            return None;
        }
        let x = (i64::from(pos.x()) + i64::from(dx)).rem_euclid(i64::from(self.width));
        Some(TilePos::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?))
    }

    /// Iterates the on-map neighbors of `pos` in [`Direction::ALL`] order.
    #[must_use]
    pub fn adjacent(&self, pos: TilePos) -> Adjacent {
        Adjacent {
            geometry: *self,
            origin: pos,
            cursor: 0,
        }
    }

    /// Shortest signed displacement from `from` to `to`, honoring the x wrap.
    #[must_use]
    pub fn distance_vector(&self, from: TilePos, to: TilePos) -> (i32, i32) {
        let width = i64::from(self.width);
        let mut dx = i64::from(to.x()) - i64::from(from.x());
        if width > 0 {
            dx = dx.rem_euclid(width);
            if dx > width / 2 {
                dx -= width;
            }
        }
        let dy = i64::from(to.y()) - i64::from(from.y());
        (
            i32::try_from(dx).unwrap_or(i32::MAX),
            i32::try_from(dy).unwrap_or(i32::MAX),
        )
    }

    /// Number of single steps separating two tiles under 8-directional movement.
    #[must_use]
    pub fn real_distance(&self, from: TilePos, to: TilePos) -> u32 {
        let (dx, dy) = self.distance_vector(from, to);
        dx.unsigned_abs().max(dy.unsigned_abs())
    }

    /// Direction leading from `from` to the adjacent tile `to`.
    #[must_use]
    pub fn direction_for_step(&self, from: TilePos, to: TilePos) -> Option<Direction> {
        self.adjacent(from)
            .find(|&(_, neighbor)| neighbor == to)
            .map(|(dir, _)| dir)
    }

    /// Iterates every position on the map in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = TilePos> {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| TilePos::new(x, y)))
    }
}

/// Iterator over the on-map neighbors of a tile.
#[derive(Clone, Debug)]
pub struct Adjacent {
    geometry: MapGeometry,
    origin: TilePos,
    cursor: usize,
}

impl Iterator for Adjacent {
    type Item = (Direction, TilePos);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(dir) = Direction::from_index(self.cursor) {
            self.cursor += 1;
            if let Some(neighbor) = self.geometry.step(self.origin, dir) {
                return Some((dir, neighbor));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_wraps_horizontally() {
        let geometry = MapGeometry::new(5, 5);
        assert_eq!(
            geometry.step(TilePos::new(4, 2), Direction::East),
            Some(TilePos::new(0, 2))
        );
        assert_eq!(
            geometry.step(TilePos::new(0, 2), Direction::West),
            Some(TilePos::new(4, 2))
        );
    }

    #[test]
    fn step_stops_at_vertical_edges() {
        let geometry = MapGeometry::new(5, 5);
        assert_eq!(geometry.step(TilePos::new(2, 0), Direction::North), None);
        assert_eq!(geometry.step(TilePos::new(2, 4), Direction::SouthEast), None);
    }

    #[test]
    fn corner_tiles_have_five_neighbors() {
        let geometry = MapGeometry::new(6, 4);
        assert_eq!(geometry.adjacent(TilePos::new(0, 0)).count(), 5);
        assert_eq!(geometry.adjacent(TilePos::new(3, 2)).count(), 8);
    }

    #[test]
    fn distance_vector_takes_the_short_way_round() {
        let geometry = MapGeometry::new(10, 4);
        assert_eq!(
            geometry.distance_vector(TilePos::new(1, 0), TilePos::new(9, 3)),
            (-2, 3)
        );
        assert_eq!(geometry.real_distance(TilePos::new(1, 0), TilePos::new(9, 3)), 3);
    }

    #[test]
    fn index_round_trips_through_positions() {
        let geometry = MapGeometry::new(7, 3);
        for pos in geometry.positions() {
            let index = geometry.index(pos).expect("on map");
            assert_eq!(geometry.pos_at(index), Some(pos));
        }
        assert_eq!(geometry.index(TilePos::new(7, 0)), None);
    }
}
