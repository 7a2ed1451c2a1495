//! Dense per-tile cost storage.

use warmap_core::{is_dist_finite, MapGeometry, TilePos, MAX_COST};

/// One small unsigned cost per tile, with [`MAX_COST`] marking unreached tiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostGrid {
    geometry: MapGeometry,
    costs: Vec<u8>,
}

impl CostGrid {
    /// Creates a grid with every tile unreached.
    #[must_use]
    pub fn new(geometry: MapGeometry) -> Self {
        Self {
            geometry,
            costs: vec![MAX_COST; geometry.tile_count()],
        }
    }

    /// Marks every tile unreached, resizing the grid to `geometry` if needed.
    pub fn reset(&mut self, geometry: MapGeometry) {
        self.geometry = geometry;
        self.costs.clear();
        self.costs.resize(geometry.tile_count(), MAX_COST);
    }

    /// Dimensions the grid covers.
    #[must_use]
    pub const fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    /// Cost recorded for the tile, or [`MAX_COST`] off the map.
    #[must_use]
    pub fn get(&self, pos: TilePos) -> u8 {
        self.geometry
            .index(pos)
            .and_then(|index| self.costs.get(index).copied())
            .unwrap_or(MAX_COST)
    }

    /// Records a cost for the tile. Positions off the map are ignored.
    pub fn set(&mut self, pos: TilePos, cost: u8) {
        if let Some(slot) = self
            .geometry
            .index(pos)
            .and_then(|index| self.costs.get_mut(index))
        {
            *slot = cost;
        }
    }

    /// Reports whether the tile has a finite cost.
    #[must_use]
    pub fn is_reached(&self, pos: TilePos) -> bool {
        is_dist_finite(self.get(pos))
    }

    /// Costs in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.costs
    }

    /// Formats each row with fixed-width cells, printing `.` for unreached tiles.
    #[must_use]
    pub fn render_rows(&self) -> Vec<String> {
        let width = usize::try_from(self.geometry.width()).unwrap_or(0);
        if width == 0 {
            return Vec::new();
        }
        self.costs
            .chunks(width)
            .map(|row| {
                row.iter()
                    .map(|&cost| {
                        if is_dist_finite(cost) {
                            format!("{cost:>4}")
                        } else {
                            format!("{:>4}", '.')
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_map_tiles_read_as_unreached() {
        let mut grid = CostGrid::new(MapGeometry::new(3, 2));
        grid.set(TilePos::new(1, 1), 6);
        grid.set(TilePos::new(5, 5), 1);

        assert_eq!(grid.get(TilePos::new(1, 1)), 6);
        assert_eq!(grid.get(TilePos::new(5, 5)), MAX_COST);
        assert!(!grid.is_reached(TilePos::new(0, 0)));
        assert_eq!(grid.render_rows()[1], "   .   6   .");
    }
}
