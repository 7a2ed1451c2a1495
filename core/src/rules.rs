//! Movement rules the world enforces on every executed step.
//!
//! Systems build their planning rules on top of these, so a planned route and
//! an executed move never disagree about zone of control or base step costs.

use crate::{
    Direction, MapView, PlayerId, TilePos, UnitSnapshot, IGTER_DIVISOR, MOVE_COST_ROAD,
    SINGLE_MOVE,
};

/// Reports whether `player` controls the zone around `pos`.
///
/// The zone is controlled when no land tile in the 3x3 square centred on
/// `pos` holds a unit of a player that is not allied with `player`.
#[must_use]
pub fn is_my_zoc<V: MapView + ?Sized>(view: &V, player: PlayerId, pos: TilePos) -> bool {
    let geometry = view.geometry();
    std::iter::once(pos)
        .chain(geometry.adjacent(pos).map(|(_, neighbor)| neighbor))
        .filter(|tile| !view.is_ocean(*tile))
        .all(|tile| !view.has_non_allied_unit(tile, player))
}

/// Decides whether zone of control allows `unit` to step from `from` to `to`.
#[must_use]
pub fn can_step_wrt_zoc<V: MapView + ?Sized>(
    view: &V,
    unit: &UnitSnapshot,
    from: TilePos,
    to: TilePos,
) -> bool {
    if unit.unit_type.ignores_zoc || !unit.is_ground() {
        return true;
    }
    if view.has_allied_unit(to, unit.owner) {
        return true;
    }
    if view.city(from).is_some() || view.city(to).is_some() {
        return true;
    }
    if view.is_ocean(from) || view.is_ocean(to) {
        return true;
    }
    is_my_zoc(view, unit.owner, from) || is_my_zoc(view, unit.owner, to)
}

/// Origin of a land cost computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostSource {
    /// A mobile unit with its own movement characteristics.
    Unit {
        /// Player owning the unit.
        owner: PlayerId,
        /// Move fragments the unit regains each turn.
        move_rate: u16,
        /// Whether the unit ignores terrain costs.
        ignores_terrain: bool,
    },
    /// A stationary point such as a city.
    Point,
}

impl CostSource {
    /// Cost source describing the provided unit.
    #[must_use]
    pub const fn of(unit: &UnitSnapshot) -> Self {
        Self::Unit {
            owner: unit.owner,
            move_rate: unit.unit_type.move_rate,
            ignores_terrain: unit.unit_type.ignores_terrain,
        }
    }
}

/// Unit-aware base cost of a land step, before legality and deterrents.
///
/// Returns `None` when the step cannot be taken over land: entering water
/// without an allied transport with free space, or any water step for a
/// stationary source.
#[must_use]
pub fn land_step_cost<V: MapView + ?Sized>(
    view: &V,
    source: &CostSource,
    from: TilePos,
    dir: Direction,
    to: TilePos,
) -> Option<u16> {
    if view.is_ocean(to) {
        return match *source {
            CostSource::Unit { owner, .. } if view.transport_capacity(to, owner) > 0 => {
                Some(SINGLE_MOVE)
            }
            _ => None,
        };
    }

    if view.is_ocean(from) {
        let base = view.terrain(to).movement_cost() * SINGLE_MOVE;
        return Some(match *source {
            CostSource::Unit {
                ignores_terrain: true,
                ..
            } => MOVE_COST_ROAD,
            CostSource::Unit { move_rate, .. } => base.min(move_rate),
            CostSource::Point => base,
        });
    }

    let forward = view.step_cost(from, dir).land_cost()?;
    Some(match *source {
        CostSource::Unit {
            ignores_terrain: true,
            ..
        } => {
            if forward == 0 {
                0
            } else {
                SINGLE_MOVE / IGTER_DIVISOR
            }
        }
        CostSource::Unit { move_rate, .. } => forward.min(move_rate),
        CostSource::Point => {
            let backward = view
                .step_cost(to, dir.reverse())
                .land_cost()
                .unwrap_or(forward);
            (forward + backward + u16::from(forward > backward)) / 2
        }
    })
}
