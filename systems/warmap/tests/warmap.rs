use warmap_core::{Command, MapView, MoveType, Specials, Terrain, TilePos, UnitKind, MAX_COST};
use warmap_system_warmap::{
    turns_to_reach, Generation, Warmap, WarmapSource, WarmapTuning,
};
use warmap_world::{self as world, World};

#[test]
fn uniform_map_costs_are_symmetric_across_the_wrap() {
    let mut world = World::new(10, 5, Terrain::Grassland);
    let red = world.add_player("red", false);
    let warriors = world
        .spawn_unit(red, UnitKind::Warriors, TilePos::new(0, 2))
        .expect("warriors");

    let mut warmap = Warmap::default();
    let _ = warmap.generate(&world, WarmapSource::Unit(warriors));

    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(8, 2)), 6);
    for y in 0..5 {
        for x in 1..10 {
            let direct = warmap.cost(MoveType::Land, TilePos::new(x, y));
            let mirrored = warmap.cost(MoveType::Land, TilePos::new(10 - x, y));
            assert_eq!(direct, mirrored, "({x}, {y}) differs from its mirror");
        }
    }
}

#[test]
fn recomputing_an_unchanged_source_is_idempotent() {
    let mut world = World::new(8, 6, Terrain::Plains);
    world.set_terrain(TilePos::new(3, 2), Terrain::Mountains);
    world.set_terrain(TilePos::new(4, 3), Terrain::Swamp);
    world.set_terrain(TilePos::new(5, 1), Terrain::Ocean);
    let red = world.add_player("red", false);
    let source = WarmapSource::Point {
        pos: TilePos::new(1, 1),
        owner: red,
    };

    let mut warmap = Warmap::default();
    assert_eq!(warmap.generate(&world, source), Generation::Computed);
    let land = warmap.land_costs().clone();
    let sea = warmap.sea_costs().clone();

    warmap.invalidate();
    assert_eq!(warmap.generate(&world, source), Generation::Computed);
    assert_eq!(warmap.land_costs(), &land);
    assert_eq!(warmap.sea_costs(), &sea);
}

#[test]
fn a_transport_bridges_the_strait() {
    let mut world = World::new(7, 3, Terrain::Grassland);
    for y in 0..3 {
        world.set_terrain(TilePos::new(3, y), Terrain::Ocean);
        world.set_terrain(TilePos::new(6, y), Terrain::Ocean);
    }
    let red = world.add_player("red", false);
    let warriors = world
        .spawn_unit(red, UnitKind::Warriors, TilePos::new(1, 1))
        .expect("warriors");
    let across = TilePos::new(5, 1);

    let mut warmap = Warmap::default();
    assert_eq!(warmap.move_cost_to(&world, warriors, across), MAX_COST);

    let _ = world
        .spawn_unit(red, UnitKind::Transport, TilePos::new(3, 1))
        .expect("transport");
    let cost = warmap.move_cost_to(&world, warriors, across);
    assert_eq!(cost, 12, "two steps to board, one to land, one more inland");
    assert_eq!(turns_to_reach(cost, 3), Some(4));
}

#[test]
fn an_unchanged_unit_reuses_its_warmap() {
    let mut world = World::new(6, 4, Terrain::Grassland);
    let red = world.add_player("red", false);
    let warriors = world
        .spawn_unit(red, UnitKind::Warriors, TilePos::new(2, 2))
        .expect("warriors");

    let mut warmap = Warmap::default();
    assert_eq!(
        warmap.generate(&world, WarmapSource::Unit(warriors)),
        Generation::Computed
    );
    assert_eq!(
        warmap.generate(&world, WarmapSource::Unit(warriors)),
        Generation::Reused
    );

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::MoveUnit {
            unit: warriors,
            to: TilePos::new(3, 2),
        },
        &mut events,
    );
    assert_eq!(
        warmap.generate(&world, WarmapSource::Unit(warriors)),
        Generation::Computed
    );
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(3, 2)), 0);
}

#[test]
fn point_sources_fill_both_domains() {
    let mut world = World::new(7, 4, Terrain::Ocean);
    for y in 0..4 {
        for x in [0, 1, 2, 6] {
            world.set_terrain(TilePos::new(x, y), Terrain::Plains);
        }
    }
    let red = world.add_player("red", true);
    world.found_city(TilePos::new(2, 1), red, 0);

    let mut warmap = Warmap::default();
    let _ = warmap.generate(
        &world,
        WarmapSource::Point {
            pos: TilePos::new(2, 1),
            owner: red,
        },
    );

    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(0, 1)), 6);
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(3, 1)), MAX_COST);
    assert_eq!(warmap.cost(MoveType::Sea, TilePos::new(4, 1)), 6);
    assert_eq!(
        warmap.cost(MoveType::Sea, TilePos::new(1, 1)),
        3,
        "land next to the harbor is costed for landings"
    );
    assert_eq!(
        warmap.cost(MoveType::Sea, TilePos::new(0, 1)),
        MAX_COST,
        "shore tiles are never expanded"
    );
}

#[test]
fn ships_cost_shore_tiles_without_sailing_inland() {
    let mut world = World::new(6, 3, Terrain::Ocean);
    world.set_terrain(TilePos::new(3, 1), Terrain::Grassland);
    world.set_terrain(TilePos::new(4, 1), Terrain::Grassland);
    let red = world.add_player("red", false);
    let frigate = world
        .spawn_unit(red, UnitKind::Frigate, TilePos::new(1, 1))
        .expect("frigate");

    let mut warmap = Warmap::default();
    let _ = warmap.generate(&world, WarmapSource::Unit(frigate));

    assert_eq!(warmap.cost(MoveType::Sea, TilePos::new(3, 1)), 6);
    assert_eq!(warmap.cost(MoveType::Sea, TilePos::new(4, 1)), 9);
    assert_eq!(
        warmap.cost(MoveType::Land, TilePos::new(1, 1)),
        MAX_COST,
        "a ship only computes its own domain"
    );
}

#[test]
fn terrain_ignoring_units_pay_a_third() {
    let mut world = World::new(6, 3, Terrain::Mountains);
    let red = world.add_player("red", false);
    let explorer = world
        .spawn_unit(red, UnitKind::Explorer, TilePos::new(0, 1))
        .expect("explorer");

    let mut warmap = Warmap::default();
    assert_eq!(warmap.move_cost_to(&world, explorer, TilePos::new(3, 1)), 3);
}

#[test]
fn relaxation_stops_at_the_cost_bound() {
    let mut world = World::new(60, 1, Terrain::Grassland);
    let red = world.add_player("red", false);
    let warriors = world
        .spawn_unit(red, UnitKind::Warriors, TilePos::new(0, 0))
        .expect("warriors");
    let settlers = world
        .spawn_unit(red, UnitKind::Settlers, TilePos::new(0, 0))
        .expect("settlers");

    let mut warmap = Warmap::default();
    let _ = warmap.generate(&world, WarmapSource::Unit(warriors));
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(24, 0)), 72);
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(25, 0)), MAX_COST);

    let _ = warmap.generate(&world, WarmapSource::Unit(settlers));
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(12, 0)), 36);
    assert_eq!(
        warmap.cost(MoveType::Land, TilePos::new(13, 0)),
        MAX_COST,
        "single-move settlers search half as far"
    );
}

#[test]
fn dense_relaxation_reports_queue_overflow() {
    let mut world = World::new(20, 20, Terrain::Grassland);
    let red = world.add_player("red", false);
    let mut warmap = Warmap::new(WarmapTuning {
        queue_capacity_hint: 4,
        ..WarmapTuning::default()
    });
    let _ = warmap.generate(
        &world,
        WarmapSource::Point {
            pos: TilePos::new(10, 10),
            owner: red,
        },
    );

    let stats = warmap.stats();
    assert!(stats.overflow_warnings >= 1, "expected an overflow warning");
    assert!(stats.peak_queue_len > 4);
    assert_eq!(stats.pushes, stats.pops, "every queued tile must be relaxed");
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(13, 10)), 9);
}

#[test]
fn railroads_are_free_and_roads_cheap() {
    let mut world = World::new(8, 3, Terrain::Hills);
    let red = world.add_player("red", false);
    for x in 0..4 {
        world.set_specials(
            TilePos::new(x, 1),
            Specials {
                road: true,
                railroad: true,
                fortress: false,
            },
        );
    }
    for x in 4..7 {
        world.set_specials(
            TilePos::new(x, 1),
            Specials {
                road: true,
                ..Specials::NONE
            },
        );
    }
    let horsemen = world
        .spawn_unit(red, UnitKind::Horsemen, TilePos::new(0, 1))
        .expect("horsemen");

    let mut warmap = Warmap::default();
    let _ = warmap.generate(&world, WarmapSource::Unit(horsemen));
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(3, 1)), 0);
    assert_eq!(warmap.cost(MoveType::Land, TilePos::new(6, 1)), 3);
    assert_eq!(
        warmap.cost(MoveType::Land, TilePos::new(3, 0)),
        6,
        "leaving the railroad onto hills costs a full hills move"
    );
    assert!(world.revision() > 0);
}
