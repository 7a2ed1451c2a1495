#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Warmap engine.
//!
//! The world owns the map, the players and their units. Systems read it
//! through [`MapView`] and mutate it exclusively through [`apply`].

mod continents;
mod scenario;

use std::collections::BTreeMap;

use tracing::debug;
use warmap_core::{
    can_step_wrt_zoc, land_step_cost, CitySnapshot, Command, ContinentId, CostSource, Direction,
    Event, MapGeometry, MapView, MoveRejection, MoveType, PlayerId, Relation, Specials, StepCost,
    Terrain, TilePos, TileSummary, UnitId, UnitKind, UnitSnapshot, SINGLE_MOVE,
};

pub use scenario::{Scenario, ScenarioError, TuningOverrides};

/// Represents the authoritative world state.
#[derive(Clone, Debug)]
pub struct World {
    geometry: MapGeometry,
    tiles: Vec<Tile>,
    move_costs: Vec<[StepCost; 8]>,
    cities: BTreeMap<TilePos, City>,
    players: Vec<Player>,
    relations: BTreeMap<(PlayerId, PlayerId), Relation>,
    units: Vec<Unit>,
    next_unit_id: u32,
    turn: u32,
    revision: u64,
}

impl World {
    /// Creates a world of the provided size covered in a single terrain.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: Terrain) -> Self {
        let geometry = MapGeometry::new(width, height);
        let tiles = vec![
            Tile {
                terrain: fill,
                specials: Specials::NONE,
                continent: ContinentId::NONE,
            };
            geometry.tile_count()
        ];
        let mut world = Self {
            geometry,
            tiles,
            move_costs: Vec::new(),
            cities: BTreeMap::new(),
            players: Vec::new(),
            relations: BTreeMap::new(),
            units: Vec::new(),
            next_unit_id: 0,
            turn: 0,
            revision: 0,
        };
        world.rebuild_terrain_caches();
        world
    }

    /// Replaces the terrain of a tile. Positions off the map are ignored.
    pub fn set_terrain(&mut self, pos: TilePos, terrain: Terrain) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.terrain = terrain;
            self.rebuild_terrain_caches();
        }
    }

    /// Replaces the man-made features of a tile. Positions off the map are ignored.
    pub fn set_specials(&mut self, pos: TilePos, specials: Specials) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.specials = specials;
            self.refresh_move_costs_around(pos);
        }
    }

    /// Registers a player. New players know the whole map.
    pub fn add_player(&mut self, name: impl Into<String>, ai: bool) -> PlayerId {
        let id = PlayerId::new(u32::try_from(self.players.len()).unwrap_or(u32::MAX));
        self.players.push(Player {
            name: name.into(),
            ai,
            known: vec![true; self.geometry.tile_count()],
        });
        self.touch();
        id
    }

    /// Sets the diplomatic state between two distinct players.
    pub fn set_relation(&mut self, a: PlayerId, b: PlayerId, relation: Relation) {
        if a == b {
            return;
        }
        let _ = self.relations.insert(relation_key(a, b), relation);
        self.touch();
    }

    /// Forgets every tile the player has explored.
    pub fn conceal_all(&mut self, player: PlayerId) {
        if let Some(player) = self.player_mut(player) {
            player.known.fill(false);
            self.touch();
        }
    }

    /// Places a city on a land tile. Water and off-map positions are ignored.
    pub fn found_city(&mut self, pos: TilePos, owner: PlayerId, defense_bonus_percent: u16) {
        if !self.geometry.contains(pos) || self.is_ocean(pos) {
            return;
        }
        let _ = self.cities.insert(
            pos,
            City {
                owner,
                defense_bonus_percent,
            },
        );
        self.refresh_move_costs_around(pos);
    }

    /// Creates a unit at full strength.
    ///
    /// Land units placed on water board an allied transport with free space.
    /// Ships may only be placed on water or in a city. Returns `None` when the
    /// placement is impossible.
    pub fn spawn_unit(&mut self, owner: PlayerId, kind: UnitKind, pos: TilePos) -> Option<UnitId> {
        if !self.geometry.contains(pos) || self.player(owner).is_none() {
            return None;
        }
        let unit_type = kind.unit_type();
        let transported_by = match unit_type.move_type {
            MoveType::Land if self.is_ocean(pos) => Some(self.free_transport(pos, owner)?),
            MoveType::Land => None,
            MoveType::Sea if self.is_ocean(pos) || self.cities.contains_key(&pos) => None,
            MoveType::Sea => return None,
        };

        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id = self.next_unit_id.saturating_add(1);
        self.units.push(Unit {
            id,
            owner,
            kind,
            pos,
            moves_left: unit_type.move_rate,
            hp: unit_type.hit_points,
            transported_by,
        });
        self.touch();
        Some(id)
    }

    /// Sets the movement points a unit has left this turn.
    pub fn set_moves_left(&mut self, unit: UnitId, moves_left: u16) {
        if let Some(unit) = self.unit_mut(unit) {
            unit.moves_left = moves_left;
            self.touch();
        }
    }

    /// Moves a unit directly to any tile, bypassing movement rules.
    ///
    /// Models outside interference such as a retreat after combat. Returns
    /// `false` when the unit or tile does not exist.
    pub fn relocate_unit(&mut self, unit: UnitId, to: TilePos) -> bool {
        if !self.geometry.contains(to) {
            return false;
        }
        let Some(index) = self.unit_index(unit) else {
            return false;
        };
        self.units[index].pos = to;
        self.units[index].transported_by = None;
        for passenger in self.units.iter_mut() {
            if passenger.transported_by == Some(unit) {
                passenger.pos = to;
            }
        }
        self.touch();
        true
    }

    /// Removes a unit together with any passengers it carries.
    pub fn disband_unit(&mut self, unit: UnitId) {
        let before = self.units.len();
        self.units
            .retain(|candidate| candidate.id != unit && candidate.transported_by != Some(unit));
        if self.units.len() != before {
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.geometry
            .index(pos)
            .and_then(|index| self.tiles.get(index))
    }

    fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        let index = self.geometry.index(pos)?;
        self.tiles.get_mut(index)
    }

    fn player(&self, player: PlayerId) -> Option<&Player> {
        self.players.get(usize::try_from(player.get()).ok()?)
    }

    fn player_mut(&mut self, player: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(usize::try_from(player.get()).ok()?)
    }

    fn unit_index(&self, unit: UnitId) -> Option<usize> {
        self.units.iter().position(|candidate| candidate.id == unit)
    }

    fn unit_mut(&mut self, unit: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|candidate| candidate.id == unit)
    }

    fn summary(&self, pos: TilePos) -> Option<TileSummary> {
        self.tile(pos).map(|tile| TileSummary {
            terrain: tile.terrain,
            specials: tile.specials,
            has_city: self.cities.contains_key(&pos),
        })
    }

    fn rebuild_terrain_caches(&mut self) {
        let terrain: Vec<Terrain> = self.tiles.iter().map(|tile| tile.terrain).collect();
        let labels = continents::label_continents(self.geometry, &terrain);
        for (tile, label) in self.tiles.iter_mut().zip(labels) {
            tile.continent = label;
        }

        self.move_costs = self
            .geometry
            .positions()
            .map(|pos| self.compute_move_costs(pos))
            .collect();
        self.touch();
        debug!(
            width = self.geometry.width(),
            height = self.geometry.height(),
            "rebuilt terrain caches"
        );
    }

    fn refresh_move_costs_around(&mut self, pos: TilePos) {
        let affected: Vec<TilePos> = std::iter::once(pos)
            .chain(self.geometry.adjacent(pos).map(|(_, neighbor)| neighbor))
            .collect();
        for tile in affected {
            let costs = self.compute_move_costs(tile);
            if let Some(slot) = self
                .geometry
                .index(tile)
                .and_then(|index| self.move_costs.get_mut(index))
            {
                *slot = costs;
            }
        }
        self.touch();
    }

    fn compute_move_costs(&self, pos: TilePos) -> [StepCost; 8] {
        let mut costs = [StepCost::Shore; 8];
        let Some(from) = self.summary(pos) else {
            return costs;
        };
        for (dir, neighbor) in self.geometry.adjacent(pos) {
            if let Some(to) = self.summary(neighbor) {
                costs[dir.index()] = StepCost::between(from, to);
            }
        }
        costs
    }

    fn snapshot(&self, unit: &Unit) -> UnitSnapshot {
        UnitSnapshot {
            id: unit.id,
            owner: unit.owner,
            kind: unit.kind,
            unit_type: unit.kind.unit_type(),
            pos: unit.pos,
            moves_left: unit.moves_left,
            hp: unit.hp,
            transported_by: unit.transported_by,
        }
    }

    fn free_transport(&self, pos: TilePos, owner: PlayerId) -> Option<UnitId> {
        self.units
            .iter()
            .filter(|carrier| carrier.pos == pos && self.is_allied(carrier.owner, owner))
            .find(|carrier| {
                let capacity = usize::from(carrier.kind.unit_type().transport_capacity);
                let aboard = self
                    .units
                    .iter()
                    .filter(|unit| unit.transported_by == Some(carrier.id))
                    .count();
                capacity > aboard
            })
            .map(|carrier| carrier.id)
    }

    fn validate_move(
        &self,
        unit: &UnitSnapshot,
        to: TilePos,
    ) -> Result<(Direction, u16), MoveRejection> {
        let dir = self
            .geometry
            .direction_for_step(unit.pos, to)
            .ok_or(MoveRejection::NotAdjacent)?;
        if unit.moves_left == 0 {
            return Err(MoveRejection::NoMovesLeft);
        }
        if self.has_non_allied_unit(to, unit.owner) {
            return Err(MoveRejection::EnemyOccupied);
        }
        if self.has_non_allied_city(to, unit.owner) {
            return Err(MoveRejection::NonAlliedCity);
        }

        match unit.move_type() {
            MoveType::Land => {
                if self.is_ocean(to) && self.free_transport(to, unit.owner).is_none() {
                    return Err(MoveRejection::NoTransportCapacity);
                }
                if !can_step_wrt_zoc(self, unit, unit.pos, to) {
                    return Err(MoveRejection::ZoneOfControl);
                }
                let cost = land_step_cost(self, &CostSource::of(unit), unit.pos, dir, to)
                    .unwrap_or(SINGLE_MOVE);
                Ok((dir, cost))
            }
            MoveType::Sea => {
                if !self.is_ocean(to) && !self.has_allied_city(to, unit.owner) {
                    return Err(MoveRejection::TerrainIncompatible);
                }
                Ok((dir, SINGLE_MOVE))
            }
        }
    }

    fn execute_move(&mut self, unit: UnitId, to: TilePos) -> Result<(TilePos, u16), MoveRejection> {
        let snapshot = self
            .unit(unit)
            .ok_or(MoveRejection::UnknownUnit)?;
        let (_, cost) = self.validate_move(&snapshot, to)?;

        let transported_by = match snapshot.move_type() {
            MoveType::Land if self.is_ocean(to) => self.free_transport(to, snapshot.owner),
            MoveType::Land | MoveType::Sea => None,
        };

        let from = snapshot.pos;
        let moves_left = snapshot.moves_left.saturating_sub(cost);
        for candidate in self.units.iter_mut() {
            if candidate.id == unit {
                candidate.pos = to;
                candidate.moves_left = moves_left;
                candidate.transported_by = transported_by;
            } else if candidate.transported_by == Some(unit) {
                candidate.pos = to;
            }
        }
        self.touch();
        Ok((from, moves_left))
    }

    fn reveal(&mut self, player: PlayerId, pos: TilePos) -> bool {
        let Some(index) = self.geometry.index(pos) else {
            return false;
        };
        let Some(known) = self
            .player_mut(player)
            .and_then(|player| player.known.get_mut(index))
        else {
            return false;
        };
        if *known {
            return false;
        }
        *known = true;
        self.touch();
        true
    }

    fn reveal_around(&mut self, player: PlayerId, pos: TilePos, out_events: &mut Vec<Event>) {
        let around: Vec<TilePos> = std::iter::once(pos)
            .chain(self.geometry.adjacent(pos).map(|(_, neighbor)| neighbor))
            .collect();
        for tile in around {
            if self.reveal(player, tile) {
                out_events.push(Event::TileRevealed { player, pos: tile });
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MoveUnit { unit, to } => match world.execute_move(unit, to) {
            Ok((from, moves_left)) => {
                debug!(unit = unit.get(), %from, %to, moves_left, "unit moved");
                out_events.push(Event::UnitMoved {
                    unit,
                    from,
                    to,
                    moves_left,
                });
                if let Some(owner) = world.unit(unit).map(|snapshot| snapshot.owner) {
                    world.reveal_around(owner, to, out_events);
                }
            }
            Err(reason) => {
                debug!(unit = unit.get(), %to, %reason, "move rejected");
                out_events.push(Event::UnitMoveRejected { unit, to, reason });
            }
        },
        Command::BeginTurn => {
            world.turn = world.turn.saturating_add(1);
            for unit in world.units.iter_mut() {
                unit.moves_left = unit.kind.unit_type().move_rate;
            }
            world.touch();
            out_events.push(Event::TurnBegan { turn: world.turn });
        }
        Command::RevealTile { player, pos } => {
            if world.reveal(player, pos) {
                out_events.push(Event::TileRevealed { player, pos });
            }
        }
    }
}

impl MapView for World {
    fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn terrain(&self, pos: TilePos) -> Terrain {
        self.tile(pos).map_or(Terrain::Ocean, |tile| tile.terrain)
    }

    fn specials(&self, pos: TilePos) -> Specials {
        self.tile(pos).map_or(Specials::NONE, |tile| tile.specials)
    }

    fn step_cost(&self, pos: TilePos, dir: Direction) -> StepCost {
        self.geometry
            .index(pos)
            .and_then(|index| self.move_costs.get(index))
            .map_or(StepCost::Shore, |costs| costs[dir.index()])
    }

    fn continent(&self, pos: TilePos) -> ContinentId {
        self.tile(pos)
            .map_or(ContinentId::NONE, |tile| tile.continent)
    }

    fn city(&self, pos: TilePos) -> Option<CitySnapshot> {
        self.cities.get(&pos).map(|city| CitySnapshot {
            owner: city.owner,
            defense_bonus_percent: city.defense_bonus_percent,
        })
    }

    fn is_known(&self, player: PlayerId, pos: TilePos) -> bool {
        let Some(index) = self.geometry.index(pos) else {
            return false;
        };
        self.player(player)
            .and_then(|player| player.known.get(index).copied())
            .unwrap_or(false)
    }

    fn is_ai(&self, player: PlayerId) -> bool {
        self.player(player).is_some_and(|player| player.ai)
    }

    fn relation(&self, a: PlayerId, b: PlayerId) -> Relation {
        if a == b {
            return Relation::Alliance;
        }
        self.relations
            .get(&relation_key(a, b))
            .copied()
            .unwrap_or(Relation::War)
    }

    fn unit(&self, unit: UnitId) -> Option<UnitSnapshot> {
        self.units
            .iter()
            .find(|candidate| candidate.id == unit)
            .map(|candidate| self.snapshot(candidate))
    }

    fn units_at(&self, pos: TilePos) -> Vec<UnitSnapshot> {
        self.units
            .iter()
            .filter(|unit| unit.pos == pos)
            .map(|unit| self.snapshot(unit))
            .collect()
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use warmap_core::{MapView, PlayerId, TilePos, UnitSnapshot};

    use super::World;

    /// Number of the current turn, starting at zero.
    #[must_use]
    pub fn turn(world: &World) -> u32 {
        world.turn
    }

    /// Snapshots of every unit in identifier order.
    #[must_use]
    pub fn units(world: &World) -> Vec<UnitSnapshot> {
        world.units.iter().map(|unit| world.snapshot(unit)).collect()
    }

    /// Identifiers of every registered player.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerId> {
        (0..world.players.len())
            .filter_map(|index| u32::try_from(index).ok())
            .map(PlayerId::new)
            .collect()
    }

    /// Display name of a player.
    #[must_use]
    pub fn player_name(world: &World, player: PlayerId) -> Option<&str> {
        world.player(player).map(|player| player.name.as_str())
    }

    /// Looks up a player by display name.
    #[must_use]
    pub fn player_by_name(world: &World, name: &str) -> Option<PlayerId> {
        players(world)
            .into_iter()
            .find(|&player| player_name(world, player) == Some(name))
    }

    /// Renders the map as glyph rows, marking cities with `#` and units with `@`.
    #[must_use]
    pub fn render_rows(world: &World) -> Vec<String> {
        let geometry = world.geometry();
        (0..geometry.height())
            .map(|y| {
                (0..geometry.width())
                    .map(|x| {
                        let pos = TilePos::new(x, y);
                        if !world.units_at(pos).is_empty() {
                            '@'
                        } else if world.city(pos).is_some() {
                            '#'
                        } else {
                            world.terrain(pos).glyph()
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
struct Tile {
    terrain: Terrain,
    specials: Specials,
    continent: ContinentId,
}

#[derive(Clone, Copy, Debug)]
struct City {
    owner: PlayerId,
    defense_bonus_percent: u16,
}

#[derive(Clone, Debug)]
struct Player {
    name: String,
    ai: bool,
    known: Vec<bool>,
}

#[derive(Clone, Copy, Debug)]
struct Unit {
    id: UnitId,
    owner: PlayerId,
    kind: UnitKind,
    pos: TilePos,
    moves_left: u16,
    hp: u16,
    transported_by: Option<UnitId>,
}

fn relation_key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duel() -> (World, PlayerId, PlayerId) {
        let mut world = World::new(6, 5, Terrain::Grassland);
        let red = world.add_player("red", false);
        let blue = world.add_player("blue", true);
        (world, red, blue)
    }

    #[test]
    fn move_costs_follow_terrain_and_roads() {
        let mut world = World::new(4, 3, Terrain::Grassland);
        world.set_terrain(TilePos::new(2, 1), Terrain::Mountains);
        assert_eq!(
            world.step_cost(TilePos::new(1, 1), Direction::East),
            StepCost::Land(9)
        );

        let road = Specials {
            road: true,
            ..Specials::NONE
        };
        world.set_specials(TilePos::new(1, 1), road);
        world.set_specials(TilePos::new(2, 1), road);
        assert_eq!(
            world.step_cost(TilePos::new(1, 1), Direction::East),
            StepCost::Land(1)
        );
        assert_eq!(
            world.step_cost(TilePos::new(2, 1), Direction::West),
            StepCost::Land(1)
        );
    }

    #[test]
    fn begin_turn_restores_movement() {
        let (mut world, red, _) = duel();
        let unit = world
            .spawn_unit(red, UnitKind::Horsemen, TilePos::new(1, 1))
            .expect("spawn");
        world.set_moves_left(unit, 0);

        let mut events = Vec::new();
        apply(&mut world, Command::BeginTurn, &mut events);

        assert_eq!(events, vec![Event::TurnBegan { turn: 1 }]);
        assert_eq!(world.unit(unit).map(|snapshot| snapshot.moves_left), Some(6));
    }

    #[test]
    fn relations_are_symmetric_and_default_to_war() {
        let (mut world, red, blue) = duel();
        assert_eq!(world.relation(red, blue), Relation::War);
        assert_eq!(world.relation(red, red), Relation::Alliance);

        world.set_relation(blue, red, Relation::Peace);
        assert_eq!(world.relation(red, blue), Relation::Peace);
    }

    #[test]
    fn revision_advances_on_every_move() {
        let (mut world, red, _) = duel();
        let unit = world
            .spawn_unit(red, UnitKind::Warriors, TilePos::new(1, 1))
            .expect("spawn");
        let before = world.revision();

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveUnit {
                unit,
                to: TilePos::new(2, 2),
            },
            &mut events,
        );

        assert!(world.revision() > before, "a move must bump the revision");
    }

    #[test]
    fn ships_cannot_spawn_inland() {
        let (mut world, red, _) = duel();
        assert_eq!(
            world.spawn_unit(red, UnitKind::Trireme, TilePos::new(2, 2)),
            None
        );
    }
}
