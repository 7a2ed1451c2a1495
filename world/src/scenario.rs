//! TOML scenario files describing a complete world.
//!
//! ```toml
//! [map]
//! rows = ["~~gg", "~ggh"]
//! roads = [[2, 0], [3, 0]]
//!
//! [[players]]
//! name = "red"
//!
//! [[units]]
//! owner = "red"
//! kind = "warriors"
//! at = [2, 0]
//! ```

use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};

use serde::Deserialize;
use tracing::info;
use warmap_core::{PlayerId, Relation, Specials, Terrain, TilePos, UnitId, UnitKind};

use crate::World;

/// Errors raised while loading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The scenario file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The scenario is not valid TOML or does not match the expected layout.
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    /// The map section contains no tiles.
    #[error("scenario map has no tiles")]
    EmptyMap,
    /// A map row differs in length from the first row.
    #[error("map row {row} has {found} tiles, expected {expected}")]
    DimensionMismatch {
        /// Zero-based index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A map glyph does not name a terrain.
    #[error("unknown terrain glyph {glyph:?} at ({x}, {y})")]
    UnknownTerrain {
        /// Unrecognized glyph.
        glyph: char,
        /// Column of the glyph.
        x: u32,
        /// Row of the glyph.
        y: u32,
    },
    /// A section refers to a player that was never declared.
    #[error("unknown player {0:?}")]
    UnknownPlayer(String),
    /// A position lies outside the map.
    #[error("position ({x}, {y}) lies outside the map")]
    OutOfBounds {
        /// Column of the position.
        x: u32,
        /// Row of the position.
        y: u32,
    },
    /// A unit cannot stand on the requested tile.
    #[error("cannot place {kind} at ({x}, {y})")]
    InvalidPlacement {
        /// Scenario name of the unit kind.
        kind: &'static str,
        /// Column of the position.
        x: u32,
        /// Row of the position.
        y: u32,
    },
}

/// Optional overrides for the planners' tuning knobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuningOverrides {
    /// Relaxation depth bound for warmaps.
    pub max_cost: Option<u8>,
    /// Queue length above which relaxation warns about overflow.
    pub queue_capacity_hint: Option<usize>,
    /// Step cost charged for unexplored tiles.
    pub unknown_deterrent: Option<u16>,
    /// Step cost charged for dangerous tiles.
    pub danger_move: Option<u16>,
    /// Step cost charged for landing passengers outside their zone of control.
    pub landing_penalty: Option<u16>,
    /// Seed for the executor's tie-breaks.
    pub seed: Option<u64>,
}

/// A world loaded from a scenario file.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// The fully populated world.
    pub world: World,
    /// Units in the order the file declares them.
    pub units: Vec<UnitId>,
    /// Tuning overrides carried by the file.
    pub tuning: TuningOverrides,
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = Self::from_toml_str(&text)?;
        info!(path = %path.display(), units = scenario.units.len(), "loaded scenario");
        Ok(scenario)
    }

    /// Parses a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = toml::from_str(text)?;
        file.build()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    map: MapSection,
    #[serde(default)]
    players: Vec<PlayerSection>,
    #[serde(default)]
    relations: Vec<RelationSection>,
    #[serde(default)]
    cities: Vec<CitySection>,
    #[serde(default)]
    units: Vec<UnitSection>,
    #[serde(default)]
    tuning: TuningOverrides,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapSection {
    rows: Vec<String>,
    #[serde(default)]
    roads: Vec<[u32; 2]>,
    #[serde(default)]
    railroads: Vec<[u32; 2]>,
    #[serde(default)]
    fortresses: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerSection {
    name: String,
    #[serde(default)]
    ai: bool,
    #[serde(default)]
    fog: bool,
    #[serde(default)]
    known: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationSection {
    between: [String; 2],
    state: Relation,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CitySection {
    owner: String,
    at: [u32; 2],
    #[serde(default)]
    defense_bonus: u16,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitSection {
    owner: String,
    kind: UnitKind,
    at: [u32; 2],
    moves_left: Option<u16>,
}

impl ScenarioFile {
    fn build(self) -> Result<Scenario, ScenarioError> {
        let terrain = parse_rows(&self.map.rows)?;
        let height = u32::try_from(terrain.len()).map_err(|_| ScenarioError::EmptyMap)?;
        let width = terrain
            .first()
            .and_then(|row| u32::try_from(row.len()).ok())
            .ok_or(ScenarioError::EmptyMap)?;

        let mut world = World::new(width, height, Terrain::Ocean);
        for (tile, kind) in world.tiles.iter_mut().zip(terrain.iter().flatten()) {
            tile.terrain = *kind;
        }
        world.rebuild_terrain_caches();

        let mut specials: BTreeMap<TilePos, Specials> = BTreeMap::new();
        for &at in &self.map.roads {
            specials.entry(locate(&world, at)?).or_default().road = true;
        }
        for &at in &self.map.railroads {
            let entry = specials.entry(locate(&world, at)?).or_default();
            entry.road = true;
            entry.railroad = true;
        }
        for &at in &self.map.fortresses {
            specials.entry(locate(&world, at)?).or_default().fortress = true;
        }
        for (pos, features) in specials {
            world.set_specials(pos, features);
        }

        let mut players: BTreeMap<String, PlayerId> = BTreeMap::new();
        for section in &self.players {
            let id = world.add_player(section.name.clone(), section.ai);
            let _ = players.insert(section.name.clone(), id);
        }
        let lookup = |name: &str| {
            players
                .get(name)
                .copied()
                .ok_or_else(|| ScenarioError::UnknownPlayer(name.to_owned()))
        };

        for relation in &self.relations {
            let a = lookup(&relation.between[0])?;
            let b = lookup(&relation.between[1])?;
            world.set_relation(a, b, relation.state);
        }

        for city in &self.cities {
            let owner = lookup(&city.owner)?;
            let pos = locate(&world, city.at)?;
            world.found_city(pos, owner, city.defense_bonus);
        }

        let mut units = Vec::with_capacity(self.units.len());
        for section in &self.units {
            let owner = lookup(&section.owner)?;
            let pos = locate(&world, section.at)?;
            let id = world.spawn_unit(owner, section.kind, pos).ok_or(
                ScenarioError::InvalidPlacement {
                    kind: section.kind.name(),
                    x: pos.x(),
                    y: pos.y(),
                },
            )?;
            if let Some(moves_left) = section.moves_left {
                world.set_moves_left(id, moves_left);
            }
            units.push(id);
        }

        for section in self.players.iter().filter(|section| section.fog) {
            let player = lookup(&section.name)?;
            world.conceal_all(player);
            let mut visible = Vec::new();
            for &at in &section.known {
                visible.push(locate(&world, at)?);
            }
            visible.extend(
                world
                    .units
                    .iter()
                    .filter(|unit| unit.owner == player)
                    .map(|unit| unit.pos),
            );
            visible.extend(
                world
                    .cities
                    .iter()
                    .filter(|(_, city)| city.owner == player)
                    .map(|(pos, _)| *pos),
            );
            let mut revealed = Vec::new();
            for pos in visible {
                world.reveal_around(player, pos, &mut revealed);
            }
        }

        Ok(Scenario {
            world,
            units,
            tuning: self.tuning,
        })
    }
}

fn parse_rows(rows: &[String]) -> Result<Vec<Vec<Terrain>>, ScenarioError> {
    let expected = rows.first().map_or(0, |row| row.chars().count());
    if expected == 0 {
        return Err(ScenarioError::EmptyMap);
    }

    let mut parsed = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != expected {
            return Err(ScenarioError::DimensionMismatch {
                row: row_index,
                expected,
                found,
            });
        }
        let y = u32::try_from(row_index).unwrap_or(u32::MAX);
        let mut terrain = Vec::with_capacity(found);
        for (column, glyph) in row.chars().enumerate() {
            let x = u32::try_from(column).unwrap_or(u32::MAX);
            terrain.push(
                Terrain::from_glyph(glyph).ok_or(ScenarioError::UnknownTerrain { glyph, x, y })?,
            );
        }
        parsed.push(terrain);
    }
    Ok(parsed)
}

fn locate(world: &World, [x, y]: [u32; 2]) -> Result<TilePos, ScenarioError> {
    let pos = TilePos::new(x, y);
    if world.geometry.contains(pos) {
        Ok(pos)
    } else {
        Err(ScenarioError::OutOfBounds { x, y })
    }
}
