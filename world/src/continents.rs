//! Continent labelling for the world's land masses.

use std::collections::VecDeque;

use warmap_core::{ContinentId, MapGeometry, Terrain};

/// Assigns a continent id to every land tile using a breadth-first flood fill.
///
/// Land masses are numbered from 1 in row-major order of their first tile and
/// are connected through all eight neighbors, including across the x-axis
/// wrap. Water tiles receive [`ContinentId::NONE`].
pub(crate) fn label_continents(geometry: MapGeometry, terrain: &[Terrain]) -> Vec<ContinentId> {
    let tile_count = geometry.tile_count().min(terrain.len());
    let mut labels = vec![ContinentId::NONE; tile_count];
    let mut next_label: u16 = 1;
    let mut queue = VecDeque::new();

    for seed in 0..tile_count {
        if terrain[seed].is_ocean() || labels[seed] != ContinentId::NONE {
            continue;
        }

        let label = ContinentId::new(next_label);
        next_label = next_label.saturating_add(1);
        labels[seed] = label;
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            let Some(pos) = geometry.pos_at(current) else {
                continue;
            };

            for (_, neighbor) in geometry.adjacent(pos) {
                let Some(index) = geometry.index(neighbor) else {
                    continue;
                };
                if index >= tile_count
                    || terrain[index].is_ocean()
                    || labels[index] != ContinentId::NONE
                {
                    continue;
                }
                labels[index] = label;
                queue.push_back(index);
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use warmap_core::TilePos;

    fn parse(rows: &[&str]) -> (MapGeometry, Vec<Terrain>) {
        let width = u32::try_from(rows[0].len()).expect("width");
        let height = u32::try_from(rows.len()).expect("height");
        let terrain = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|glyph| Terrain::from_glyph(glyph).expect("glyph"))
            .collect();
        (MapGeometry::new(width, height), terrain)
    }

    #[test]
    fn separate_islands_get_distinct_labels() {
        let (geometry, terrain) = parse(&["gg~~~", "~~~~~", "~~~pp"]);
        let labels = label_continents(geometry, &terrain);

        let west = labels[geometry.index(TilePos::new(0, 0)).expect("on map")];
        let east = labels[geometry.index(TilePos::new(4, 2)).expect("on map")];
        assert_eq!(west, ContinentId::new(1));
        assert_eq!(east, ContinentId::new(2));
        assert_eq!(
            labels[geometry.index(TilePos::new(2, 1)).expect("on map")],
            ContinentId::NONE
        );
    }

    #[test]
    fn land_connects_across_the_wrap() {
        let (geometry, terrain) = parse(&["g~~g", "~~~~"]);
        let labels = label_continents(geometry, &terrain);
        assert_eq!(labels[0], labels[3], "wrapped land should share a continent");
    }

    #[test]
    fn diagonal_contact_joins_land() {
        let (geometry, terrain) = parse(&["g~~", "~g~", "~~~"]);
        let labels = label_continents(geometry, &terrain);
        assert_eq!(labels[0], labels[4]);
    }
}
