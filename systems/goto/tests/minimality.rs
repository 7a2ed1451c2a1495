use std::{cmp::Reverse, collections::BinaryHeap};

use proptest::{collection::vec, prelude::*};
use warmap_core::{
    Command, Direction, DirectionSet, MapView, PlayerId, Specials, Terrain, TilePos, UnitId,
    UnitKind, MAX_COST,
};
use warmap_system_goto::{GotoTuning, PathPlanner};
use warmap_system_legality::{land_edge, sea_edge, EdgeContext};
use warmap_world::{self as world, World};

const TERRAIN: [Terrain; 5] = [
    Terrain::Grassland,
    Terrain::Hills,
    Terrain::Forest,
    Terrain::Mountains,
    Terrain::Ocean,
];

#[derive(Clone, Debug)]
struct Scenario {
    width: u32,
    height: u32,
    terrain: Vec<usize>,
    features: Vec<u8>,
    known: Vec<bool>,
    ai: bool,
    kind: usize,
    dest: usize,
    stranger: usize,
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (3u32..8, 2u32..6).prop_flat_map(|(width, height)| {
        let tiles = usize::try_from(width * height).unwrap_or(1);
        (
            Just(width),
            Just(height),
            vec(0usize..TERRAIN.len(), tiles),
            vec(0u8..4, tiles),
            vec(proptest::bool::weighted(0.8), tiles),
            any::<bool>(),
            0usize..3,
            0..tiles,
            0..tiles,
        )
            .prop_map(
                |(width, height, terrain, features, known, ai, kind, dest, stranger)| Scenario {
                    width,
                    height,
                    terrain,
                    features,
                    known,
                    ai,
                    kind,
                    dest,
                    stranger,
                },
            )
    })
}

fn restrict_knowledge(world: &mut World, player: PlayerId, known: &[bool]) {
    world.conceal_all(player);
    let mut events = Vec::new();
    let positions: Vec<TilePos> = world.geometry().positions().collect();
    for (pos, _) in positions.into_iter().zip(known).filter(|(_, known)| **known) {
        world::apply(world, Command::RevealTile { player, pos }, &mut events);
    }
}

/// Mixed terrain with roads and railroads, and a land unit at the origin.
fn overland(scenario: &Scenario) -> (World, UnitId) {
    let mut world = World::new(scenario.width, scenario.height, Terrain::Grassland);
    let origin = TilePos::new(0, 0);
    let positions: Vec<TilePos> = world.geometry().positions().collect();
    for (index, pos) in positions.into_iter().enumerate() {
        let terrain = if pos == origin {
            Terrain::Plains
        } else {
            TERRAIN[scenario.terrain[index]]
        };
        world.set_terrain(pos, terrain);
        let specials = match scenario.features[index] {
            1 => Specials {
                road: true,
                ..Specials::NONE
            },
            2 => Specials {
                road: true,
                railroad: true,
                fortress: false,
            },
            _ => Specials::NONE,
        };
        world.set_specials(pos, specials);
    }

    let red = world.add_player("red", scenario.ai);
    let kind = [UnitKind::Warriors, UnitKind::Explorer, UnitKind::Horsemen][scenario.kind];
    let unit = world.spawn_unit(red, kind, origin).expect("land origin");
    restrict_knowledge(&mut world, red, &scenario.known);
    (world, unit)
}

/// Islands in open sea, a ship at the origin and unarmed strangers ashore.
fn seaborne(scenario: &Scenario) -> (World, UnitId) {
    let mut world = World::new(scenario.width, scenario.height, Terrain::Ocean);
    let origin = TilePos::new(0, 0);
    let positions: Vec<TilePos> = world.geometry().positions().collect();
    for (index, pos) in positions.iter().copied().enumerate() {
        if pos != origin && scenario.terrain[index] < 2 {
            world.set_terrain(pos, Terrain::Grassland);
        }
    }

    let red = world.add_player("red", scenario.ai);
    let blue = world.add_player("blue", false);
    let kind = [UnitKind::Transport, UnitKind::Frigate, UnitKind::Trireme][scenario.kind];
    let ship = world.spawn_unit(red, kind, origin).expect("ocean origin");
    if kind == UnitKind::Transport {
        let _ = world.spawn_unit(red, UnitKind::Warriors, origin);
    }
    let ashore = positions[scenario.stranger];
    if !world.is_ocean(ashore) {
        let _ = world.spawn_unit(blue, UnitKind::Settlers, ashore);
    }
    restrict_knowledge(&mut world, red, &scenario.known);
    (world, ship)
}

/// Cheapest cost from `origin` to `dest` over the provided edge costs.
fn exhaustive_cost<F>(world: &World, origin: TilePos, dest: TilePos, edge: F) -> u8
where
    F: Fn(TilePos, Direction, TilePos) -> Option<u16>,
{
    let geometry = world.geometry();
    let mut best = vec![u32::MAX; geometry.tile_count()];
    let mut heap = BinaryHeap::new();
    let start = geometry.index(origin).expect("origin on map");
    best[start] = 0;
    heap.push(Reverse((0u32, start)));

    while let Some(Reverse((cost, index))) = heap.pop() {
        if cost > best[index] {
            continue;
        }
        let pos = geometry.pos_at(index).expect("index on map");
        for (dir, neighbor) in geometry.adjacent(pos) {
            let Some(step) = edge(pos, dir, neighbor) else {
                continue;
            };
            let next = cost + u32::from(step);
            let slot = geometry.index(neighbor).expect("neighbor on map");
            if next < best[slot] {
                best[slot] = next;
                heap.push(Reverse((next, slot)));
            }
        }
    }

    let found = best[geometry.index(dest).expect("destination on map")];
    if found < u32::from(MAX_COST) {
        u8::try_from(found).unwrap_or(MAX_COST)
    } else {
        MAX_COST
    }
}

fn planned_cost(world: &World, unit: UnitId, dest: TilePos) -> (bool, u8) {
    let snapshot = world.unit(unit).expect("unit exists");
    let mut planner = PathPlanner::default();
    let found = planner.plan(world, &snapshot, dest, &GotoTuning::default());
    (found, planner.destination_cost())
}

proptest! {
    #[test]
    fn land_routes_cost_what_exhaustive_search_finds(scenario in scenario()) {
        let (world, unit) = overland(&scenario);
        let snapshot = world.unit(unit).expect("unit exists");
        let dest = world.geometry().pos_at(scenario.dest).expect("on map");
        let ctx = EdgeContext::new(&world, snapshot, dest, GotoTuning::default().deterrents());

        let expected = exhaustive_cost(&world, snapshot.pos, dest, |from, dir, to| {
            land_edge(&world, &ctx, from, dir, to, DirectionSet::EMPTY).cost()
        });
        let (found, cost) = planned_cost(&world, unit, dest);
        prop_assert_eq!(cost, expected, "route to {}", dest);
        prop_assert_eq!(found, expected != MAX_COST);
    }

    #[test]
    fn sea_routes_cost_what_exhaustive_search_finds(scenario in scenario()) {
        let (world, ship) = seaborne(&scenario);
        let snapshot = world.unit(ship).expect("ship exists");
        let dest = world.geometry().pos_at(scenario.dest).expect("on map");
        let ctx = EdgeContext::new(&world, snapshot, dest, GotoTuning::default().deterrents());

        let expected = exhaustive_cost(&world, snapshot.pos, dest, |from, dir, to| {
            sea_edge(&world, &ctx, from, dir, to).cost()
        });
        let (found, cost) = planned_cost(&world, ship, dest);
        prop_assert_eq!(cost, expected, "route to {}", dest);
        prop_assert_eq!(found, expected != MAX_COST);
    }
}
