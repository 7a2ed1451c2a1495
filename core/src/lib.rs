#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Warmap engine.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the movement systems and adapters. The world answers [`MapView`] queries
//! and executes [`Command`] values through its `apply` entry point, then
//! broadcasts [`Event`] values. Systems read the map through [`MapView`],
//! produce cost grids and direction vectors, and drive units by handing
//! [`Command`] values back to the world.

mod geometry;
mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use geometry::{Adjacent, MapGeometry};
pub use rules::{can_step_wrt_zoc, is_my_zoc, land_step_cost, CostSource};

/// Move fragments making up one full movement point.
pub const SINGLE_MOVE: u16 = 3;
/// Cost of a step along a road shared by both tiles.
pub const MOVE_COST_ROAD: u16 = 1;
/// Cost of a step along a railroad shared by both tiles.
pub const MOVE_COST_RAIL: u16 = 0;
/// Divisor applied to a full move for units that ignore terrain.
pub const IGTER_DIVISOR: u16 = 3;
/// Sentinel cost marking a tile as unreached.
pub const MAX_COST: u8 = u8::MAX;

/// Reports whether a cost grid entry refers to a reachable tile.
#[must_use]
pub const fn is_dist_finite(cost: u8) -> bool {
    cost < MAX_COST
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests that a unit step onto an adjacent tile.
    MoveUnit {
        /// Unit attempting the step.
        unit: UnitId,
        /// Adjacent tile the unit wants to enter.
        to: TilePos,
    },
    /// Starts a new turn, restoring every unit's movement points.
    BeginTurn,
    /// Marks a tile as explored for the provided player.
    RevealTile {
        /// Player gaining knowledge of the tile.
        player: PlayerId,
        /// Tile being revealed.
        pos: TilePos,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a unit moved between two adjacent tiles.
    UnitMoved {
        /// Unit that moved.
        unit: UnitId,
        /// Tile occupied before the step.
        from: TilePos,
        /// Tile occupied after the step.
        to: TilePos,
        /// Move fragments remaining after paying for the step.
        moves_left: u16,
    },
    /// Reports that a step request was refused.
    UnitMoveRejected {
        /// Unit whose step was refused.
        unit: UnitId,
        /// Tile the unit attempted to enter.
        to: TilePos,
        /// Specific reason the step failed.
        reason: MoveRejection,
    },
    /// Announces the start of a new turn.
    TurnBegan {
        /// Number of the turn that started.
        turn: u32,
    },
    /// Confirms that a tile became known to a player.
    TileRevealed {
        /// Player that learned about the tile.
        player: PlayerId,
        /// Tile that was revealed.
        pos: TilePos,
    },
}

/// Reasons a single-tile step may be refused by the world.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error,
)]
pub enum MoveRejection {
    /// No unit with the provided identifier exists.
    #[error("unit does not exist")]
    UnknownUnit,
    /// The requested tile is not adjacent to the unit.
    #[error("destination is not adjacent")]
    NotAdjacent,
    /// The unit has no movement points left this turn.
    #[error("unit has no moves left")]
    NoMovesLeft,
    /// The unit cannot exist on the destination terrain.
    #[error("terrain is incompatible with the unit")]
    TerrainIncompatible,
    /// A land unit tried to board a tile without free transport space.
    #[error("no transport with free capacity")]
    NoTransportCapacity,
    /// The destination holds a non-allied unit.
    #[error("destination is occupied by a non-allied unit")]
    EnemyOccupied,
    /// The step would move between two tiles in enemy zone of control.
    #[error("zone of control forbids the step")]
    ZoneOfControl,
    /// The destination is a city belonging to a non-allied player.
    #[error("destination is a non-allied city")]
    NonAlliedCity,
}

/// Location of a single map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    x: u32,
    y: u32,
}

impl TilePos {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The eight compass directions, in the fixed order used by direction masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Up and to the left.
    NorthWest,
    /// Toward decreasing rows.
    North,
    /// Up and to the right.
    NorthEast,
    /// Toward decreasing columns.
    West,
    /// Toward increasing columns.
    East,
    /// Down and to the left.
    SouthWest,
    /// Toward increasing rows.
    South,
    /// Down and to the right.
    SouthEast,
}

impl Direction {
    /// Every direction in mask order.
    pub const ALL: [Direction; 8] = [
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
        Direction::West,
        Direction::East,
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
    ];

    /// Position of the direction within [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Direction stored at the provided mask index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Column and row displacement of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::NorthWest => (-1, -1),
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
            Self::SouthWest => (-1, 1),
            Self::South => (0, 1),
            Self::SouthEast => (1, 1),
        }
    }

    /// Direction pointing back the way this one came.
    #[must_use]
    pub const fn reverse(self) -> Self {
        Self::ALL[7 - self.index()]
    }

    /// Reports whether the direction moves along a single axis.
    #[must_use]
    pub const fn is_cardinal(self) -> bool {
        matches!(self, Self::North | Self::West | Self::East | Self::South)
    }

    /// Short human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NorthWest => "NW",
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::West => "W",
            Self::East => "E",
            Self::SouthWest => "SW",
            Self::South => "S",
            Self::SouthEast => "SE",
        }
    }
}

/// Eight-bit mask holding one flag per [`Direction`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionSet(u8);

impl DirectionSet {
    /// Mask with no direction set.
    pub const EMPTY: Self = Self(0);

    /// Wraps a raw bit pattern.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bit pattern of the mask.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Mask holding exactly one direction.
    #[must_use]
    pub const fn only(dir: Direction) -> Self {
        Self(1 << dir.index())
    }

    /// Reports whether the direction is set.
    #[must_use]
    pub const fn contains(self, dir: Direction) -> bool {
        self.0 & (1 << dir.index()) != 0
    }

    /// Sets the direction.
    pub fn insert(&mut self, dir: Direction) {
        self.0 |= 1 << dir.index();
    }

    /// Clears the direction.
    pub fn remove(&mut self, dir: Direction) {
        self.0 &= !(1 << dir.index());
    }

    /// Clears every direction.
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Reports whether no direction is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of directions set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// The only direction set, if exactly one is.
    #[must_use]
    pub fn single(self) -> Option<Direction> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    /// Iterates the set directions in mask order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |dir| self.contains(*dir))
    }
}

/// Terrain categories with their movement and defense characteristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Shallow water near the coast.
    Ocean,
    /// Open sea far from land.
    DeepOcean,
    /// Open grassland.
    Grassland,
    /// Open plains.
    Plains,
    /// Dry desert.
    Desert,
    /// Cold tundra.
    Tundra,
    /// Dense forest.
    Forest,
    /// Tropical jungle.
    Jungle,
    /// Wet swamp.
    Swamp,
    /// Rolling hills.
    Hills,
    /// Impassable-looking but climbable mountains.
    Mountains,
    /// Polar ice.
    Glacier,
}

impl Terrain {
    /// Reports whether the terrain is water.
    #[must_use]
    pub const fn is_ocean(self) -> bool {
        matches!(self, Self::Ocean | Self::DeepOcean)
    }

    /// Whole movement points needed to enter the terrain.
    #[must_use]
    pub const fn movement_cost(self) -> u16 {
        match self {
            Self::Ocean
            | Self::DeepOcean
            | Self::Grassland
            | Self::Plains
            | Self::Desert
            | Self::Tundra => 1,
            Self::Forest | Self::Jungle | Self::Swamp | Self::Hills | Self::Glacier => 2,
            Self::Mountains => 3,
        }
    }

    /// Percentage added to a defender's strength on this terrain.
    #[must_use]
    pub const fn defense_bonus_percent(self) -> u16 {
        match self {
            Self::Forest | Self::Jungle | Self::Swamp => 25,
            Self::Hills => 50,
            Self::Mountains => 100,
            _ => 0,
        }
    }

    /// Single character used by scenario files and map dumps.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Ocean => '~',
            Self::DeepOcean => ':',
            Self::Grassland => 'g',
            Self::Plains => 'p',
            Self::Desert => 'd',
            Self::Tundra => 't',
            Self::Forest => 'f',
            Self::Jungle => 'j',
            Self::Swamp => 's',
            Self::Hills => 'h',
            Self::Mountains => 'm',
            Self::Glacier => 'a',
        }
    }

    /// Parses a scenario glyph.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '~' => Some(Self::Ocean),
            ':' => Some(Self::DeepOcean),
            'g' => Some(Self::Grassland),
            'p' => Some(Self::Plains),
            'd' => Some(Self::Desert),
            't' => Some(Self::Tundra),
            'f' => Some(Self::Forest),
            'j' => Some(Self::Jungle),
            's' => Some(Self::Swamp),
            'h' => Some(Self::Hills),
            'm' => Some(Self::Mountains),
            'a' => Some(Self::Glacier),
            _ => None,
        }
    }
}

/// Man-made features present on a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specials {
    /// Road connecting the tile to its neighbors.
    #[serde(default)]
    pub road: bool,
    /// Railroad connecting the tile to its neighbors.
    #[serde(default)]
    pub railroad: bool,
    /// Fortress doubling defensive strength.
    #[serde(default)]
    pub fortress: bool,
}

impl Specials {
    /// Tile without any features.
    pub const NONE: Self = Self {
        road: false,
        railroad: false,
        fortress: false,
    };
}

/// Unit-independent summary of a tile used to build step costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileSummary {
    /// Terrain of the tile.
    pub terrain: Terrain,
    /// Features on the tile.
    pub specials: Specials,
    /// Whether a city stands on the tile.
    pub has_city: bool,
}

/// Unit-independent cost of stepping from a tile to one of its neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepCost {
    /// Land step costing the provided move fragments.
    Land(u16),
    /// Valid sea step: both tiles are water, or one of them holds a city.
    SeaLane,
    /// Water meets land without a harbor.
    Shore,
}

impl StepCost {
    /// Computes the cost of stepping from `from` onto `to`.
    #[must_use]
    pub const fn between(from: TileSummary, to: TileSummary) -> Self {
        let from_ocean = from.terrain.is_ocean();
        let to_ocean = to.terrain.is_ocean();
        if from_ocean && to_ocean {
            return Self::SeaLane;
        }
        if (from_ocean && to.has_city) || (to_ocean && from.has_city) {
            return Self::SeaLane;
        }
        if from_ocean || to_ocean {
            return Self::Shore;
        }
        if from.specials.railroad && to.specials.railroad {
            return Self::Land(MOVE_COST_RAIL);
        }
        if from.specials.road && to.specials.road {
            return Self::Land(MOVE_COST_ROAD);
        }
        Self::Land(to.terrain.movement_cost() * SINGLE_MOVE)
    }

    /// Land cost of the step, if it is a land step.
    #[must_use]
    pub const fn land_cost(self) -> Option<u16> {
        match self {
            Self::Land(cost) => Some(cost),
            Self::SeaLane | Self::Shore => None,
        }
    }

    /// Reports whether a ship may take the step.
    #[must_use]
    pub const fn is_sea_lane(self) -> bool {
        matches!(self, Self::SeaLane)
    }
}

/// Movement domain of a unit and of a cost grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveType {
    /// Ground movement.
    Land,
    /// Naval movement.
    Sea,
}

/// Static characteristics shared by every unit of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitType {
    /// Movement domain.
    pub move_type: MoveType,
    /// Move fragments restored at the start of each turn.
    pub move_rate: u16,
    /// Attack strength.
    pub attack: u16,
    /// Defense strength.
    pub defense: u16,
    /// Hit points of a healthy unit.
    pub hit_points: u16,
    /// Treats every non-railroad step as a third of a move.
    pub ignores_terrain: bool,
    /// Exempt from zone of control.
    pub ignores_zoc: bool,
    /// Number of land units the unit can carry.
    pub transport_capacity: u16,
    /// Risks sinking when it ends a turn away from the coast.
    pub coast_bound: bool,
}

impl UnitType {
    /// Reports whether the unit is able to attack.
    #[must_use]
    pub const fn is_military(&self) -> bool {
        self.attack > 0
    }
}

/// Unit presets understood by the world and scenario files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Cheap foot soldiers.
    Warriors,
    /// Defensive foot soldiers.
    Phalanx,
    /// Non-combat city founders.
    Settlers,
    /// Scouts that ignore terrain and zones of control.
    Explorer,
    /// Fast mounted troops.
    Horsemen,
    /// Early coast-hugging ship.
    Trireme,
    /// Large unarmed cargo ship.
    Transport,
    /// Armed sailing ship with a small hold.
    Frigate,
}

impl UnitKind {
    /// Characteristics of the preset.
    #[must_use]
    pub const fn unit_type(self) -> UnitType {
        const fn land(move_rate: u16, attack: u16, defense: u16, hit_points: u16) -> UnitType {
            UnitType {
                move_type: MoveType::Land,
                move_rate,
                attack,
                defense,
                hit_points,
                ignores_terrain: false,
                ignores_zoc: false,
                transport_capacity: 0,
                coast_bound: false,
            }
        }

        const fn sea(move_rate: u16, attack: u16, defense: u16, capacity: u16) -> UnitType {
            UnitType {
                move_type: MoveType::Sea,
                move_rate,
                attack,
                defense,
                hit_points: 20,
                ignores_terrain: false,
                ignores_zoc: true,
                transport_capacity: capacity,
                coast_bound: false,
            }
        }

        match self {
            Self::Warriors => land(SINGLE_MOVE, 1, 1, 10),
            Self::Phalanx => land(SINGLE_MOVE, 1, 2, 10),
            Self::Settlers => land(SINGLE_MOVE, 0, 1, 20),
            Self::Explorer => UnitType {
                ignores_terrain: true,
                ignores_zoc: true,
                ..land(SINGLE_MOVE, 0, 1, 10)
            },
            Self::Horsemen => land(2 * SINGLE_MOVE, 2, 1, 10),
            Self::Trireme => UnitType {
                coast_bound: true,
                hit_points: 10,
                ..sea(3 * SINGLE_MOVE, 1, 1, 2)
            },
            Self::Transport => UnitType {
                hit_points: 30,
                ..sea(5 * SINGLE_MOVE, 0, 3, 8)
            },
            Self::Frigate => sea(4 * SINGLE_MOVE, 4, 2, 2),
        }
    }

    /// Scenario name of the preset.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Warriors => "warriors",
            Self::Phalanx => "phalanx",
            Self::Settlers => "settlers",
            Self::Explorer => "explorer",
            Self::Horsemen => "horsemen",
            Self::Trireme => "trireme",
            Self::Transport => "transport",
            Self::Frigate => "frigate",
        }
    }
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a connected land mass. Water tiles carry [`ContinentId::NONE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContinentId(u16);

impl ContinentId {
    /// Continent id assigned to water.
    pub const NONE: Self = Self(0);

    /// Creates a new continent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Diplomatic state between two players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Open hostilities.
    War,
    /// Neither allied nor hostile.
    Peace,
    /// Shared movement and defense.
    Alliance,
}

impl Relation {
    /// Reports whether units of the two players may share tiles.
    #[must_use]
    pub const fn is_allied(self) -> bool {
        matches!(self, Self::Alliance)
    }

    /// Reports whether the two players are enemies.
    #[must_use]
    pub const fn is_at_war(self) -> bool {
        matches!(self, Self::War)
    }
}

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitSnapshot {
    /// Unique identifier assigned to the unit.
    pub id: UnitId,
    /// Player owning the unit.
    pub owner: PlayerId,
    /// Preset the unit was created from.
    pub kind: UnitKind,
    /// Static characteristics of the unit.
    pub unit_type: UnitType,
    /// Tile currently occupied by the unit.
    pub pos: TilePos,
    /// Move fragments left this turn.
    pub moves_left: u16,
    /// Current hit points.
    pub hp: u16,
    /// Transport carrying the unit, if any.
    pub transported_by: Option<UnitId>,
}

impl UnitSnapshot {
    /// Movement domain of the unit.
    #[must_use]
    pub const fn move_type(&self) -> MoveType {
        self.unit_type.move_type
    }

    /// Move fragments restored each turn.
    #[must_use]
    pub const fn move_rate(&self) -> u16 {
        self.unit_type.move_rate
    }

    /// Reports whether the unit moves over land.
    #[must_use]
    pub const fn is_ground(&self) -> bool {
        matches!(self.unit_type.move_type, MoveType::Land)
    }
}

/// Immutable representation of a city used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CitySnapshot {
    /// Player owning the city.
    pub owner: PlayerId,
    /// Defensive bonus granted by the city's walls and garrison buildings.
    pub defense_bonus_percent: u16,
}

/// Read-only queries served by the grid/terrain collaborator and unit registry.
///
/// Positions passed to the required methods are expected to lie on the map;
/// implementations answer with neutral values (ocean, unknown, no units)
/// for anything else.
pub trait MapView {
    /// Dimensions and wrapping rules of the map.
    fn geometry(&self) -> MapGeometry;

    /// Counter bumped on every mutation, used to validate cached results.
    fn revision(&self) -> u64;

    /// Terrain of the tile.
    fn terrain(&self, pos: TilePos) -> Terrain;

    /// Features present on the tile.
    fn specials(&self, pos: TilePos) -> Specials;

    /// Unit-independent cost of stepping from `pos` in direction `dir`.
    fn step_cost(&self, pos: TilePos, dir: Direction) -> StepCost;

    /// Land mass the tile belongs to.
    fn continent(&self, pos: TilePos) -> ContinentId;

    /// City standing on the tile, if any.
    fn city(&self, pos: TilePos) -> Option<CitySnapshot>;

    /// Reports whether the player has explored the tile.
    fn is_known(&self, player: PlayerId, pos: TilePos) -> bool;

    /// Reports whether the player is computer controlled.
    fn is_ai(&self, player: PlayerId) -> bool;

    /// Diplomatic state between two players. A player is allied with itself.
    fn relation(&self, a: PlayerId, b: PlayerId) -> Relation;

    /// Snapshot of a unit, if it still exists.
    fn unit(&self, unit: UnitId) -> Option<UnitSnapshot>;

    /// Units standing on the tile in deterministic order.
    fn units_at(&self, pos: TilePos) -> Vec<UnitSnapshot>;

    /// Reports whether the tile is water.
    fn is_ocean(&self, pos: TilePos) -> bool {
        self.terrain(pos).is_ocean()
    }

    /// Reports whether any neighbor of the tile is water.
    fn is_ocean_near(&self, pos: TilePos) -> bool {
        self.geometry()
            .adjacent(pos)
            .any(|(_, neighbor)| self.is_ocean(neighbor))
    }

    /// Reports whether the two players are allied.
    fn is_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        self.relation(a, b).is_allied()
    }

    /// Reports whether the tile holds a unit allied with `player`.
    fn has_allied_unit(&self, pos: TilePos, player: PlayerId) -> bool {
        self.units_at(pos)
            .iter()
            .any(|unit| self.is_allied(unit.owner, player))
    }

    /// Reports whether the tile holds a unit not allied with `player`.
    fn has_non_allied_unit(&self, pos: TilePos, player: PlayerId) -> bool {
        self.units_at(pos)
            .iter()
            .any(|unit| !self.is_allied(unit.owner, player))
    }

    /// Reports whether the tile holds a unit at war with `player`.
    fn has_enemy_unit(&self, pos: TilePos, player: PlayerId) -> bool {
        self.units_at(pos)
            .iter()
            .any(|unit| self.relation(unit.owner, player).is_at_war())
    }

    /// Reports whether the tile holds a city not allied with `player`.
    fn has_non_allied_city(&self, pos: TilePos, player: PlayerId) -> bool {
        self.city(pos)
            .is_some_and(|city| !self.is_allied(city.owner, player))
    }

    /// Reports whether the tile holds a city allied with `player`.
    fn has_allied_city(&self, pos: TilePos, player: PlayerId) -> bool {
        self.city(pos)
            .is_some_and(|city| self.is_allied(city.owner, player))
    }

    /// Free space for land units aboard transports allied with `player`.
    ///
    /// Every allied transport contributes its capacity and every allied land
    /// unit already on the tile consumes one slot, so the result may be
    /// negative on crowded tiles.
    fn transport_capacity(&self, pos: TilePos, player: PlayerId) -> i32 {
        let mut available = 0i32;
        for unit in self.units_at(pos) {
            if !self.is_allied(unit.owner, player) {
                continue;
            }
            if unit.move_type() == MoveType::Sea {
                available += i32::from(unit.unit_type.transport_capacity);
            } else {
                available -= 1;
            }
        }
        available
    }

    /// Units carried by the provided transport.
    fn passengers(&self, transport: UnitId) -> Vec<UnitSnapshot> {
        let Some(carrier) = self.unit(transport) else {
            return Vec::new();
        };
        self.units_at(carrier.pos)
            .into_iter()
            .filter(|unit| unit.transported_by == Some(transport))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_directions_pair_up() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.offset();
            let (rx, ry) = dir.reverse().offset();
            assert_eq!((dx + rx, dy + ry), (0, 0), "{} is not reversed", dir.name());
            assert_eq!(dir.reverse().reverse(), dir);
        }
    }

    #[test]
    fn direction_set_tracks_membership() {
        let mut set = DirectionSet::EMPTY;
        set.insert(Direction::East);
        set.insert(Direction::SouthEast);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Direction::East));
        assert_eq!(set.single(), None);

        set.remove(Direction::East);
        assert_eq!(set.single(), Some(Direction::SouthEast));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Direction::SouthEast]
        );
    }

    #[test]
    fn roads_and_rails_reduce_step_cost() {
        let plain = TileSummary {
            terrain: Terrain::Hills,
            specials: Specials::NONE,
            has_city: false,
        };
        let road = TileSummary {
            specials: Specials {
                road: true,
                ..Specials::NONE
            },
            ..plain
        };
        let rail = TileSummary {
            specials: Specials {
                road: true,
                railroad: true,
                fortress: false,
            },
            ..plain
        };

        assert_eq!(StepCost::between(plain, plain), StepCost::Land(6));
        assert_eq!(StepCost::between(road, road), StepCost::Land(MOVE_COST_ROAD));
        assert_eq!(StepCost::between(rail, rail), StepCost::Land(MOVE_COST_RAIL));
        assert_eq!(StepCost::between(road, plain), StepCost::Land(6));
    }

    #[test]
    fn harbors_open_sea_lanes() {
        let water = TileSummary {
            terrain: Terrain::Ocean,
            specials: Specials::NONE,
            has_city: false,
        };
        let shore = TileSummary {
            terrain: Terrain::Plains,
            specials: Specials::NONE,
            has_city: false,
        };
        let port = TileSummary {
            has_city: true,
            ..shore
        };

        assert_eq!(StepCost::between(water, water), StepCost::SeaLane);
        assert_eq!(StepCost::between(water, shore), StepCost::Shore);
        assert_eq!(StepCost::between(water, port), StepCost::SeaLane);
        assert_eq!(StepCost::between(port, water), StepCost::SeaLane);
    }

    #[test]
    fn terrain_glyphs_round_trip() {
        for glyph in "~:gpdtfjshma".chars() {
            let terrain = Terrain::from_glyph(glyph).expect("known glyph");
            assert_eq!(terrain.glyph(), glyph);
        }
        assert_eq!(Terrain::from_glyph('x'), None);
    }

    #[test]
    fn move_rejection_survives_bincode() {
        let bytes = bincode::serialize(&MoveRejection::ZoneOfControl).expect("serialize");
        let restored: MoveRejection = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, MoveRejection::ZoneOfControl);
        assert_eq!(
            restored.to_string(),
            "zone of control forbids the step"
        );
    }
}
