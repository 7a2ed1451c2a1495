#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Route legality, sanity and risk rules used by the planners.
//!
//! Every rule here is a pure function of a [`MapView`]. The world enforces
//! [`can_step_wrt_zoc`] and [`land_step_cost`] from the core crate when it
//! executes a move; the planners fold [`land_edge`] and [`sea_edge`] verdicts,
//! which add route-only rules and deterrents on top, into their edge costs.

mod edge;

use warmap_core::{
    ContinentId, DirectionSet, MapView, PlayerId, TilePos, UnitSnapshot, SINGLE_MOVE,
};

pub use edge::{land_edge, sea_edge, EdgeContext, EdgeVerdict};
pub use warmap_core::{can_step_wrt_zoc, is_my_zoc, land_step_cost, CostSource};

/// Loss percentage applied to coast-bound ships far from land.
pub const COAST_BOUND_LOSS_PCT: u8 = 50;

/// Cost additions applied to legal but discouraged steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deterrents {
    /// Step cost charged for entering a tile a human player has not explored.
    pub unknown: u16,
    /// Step cost charged for entering a tile where the unit risks being lost.
    pub danger: u16,
    /// Step cost charged for landing a passenger outside its own zone of control.
    pub landing: u16,
}

impl Default for Deterrents {
    fn default() -> Self {
        Self {
            unknown: 5 * SINGLE_MOVE,
            danger: 2 * SINGLE_MOVE + 1,
            landing: 20 * SINGLE_MOVE,
        }
    }
}

/// Zone-of-control check used while planning a goto.
///
/// Beyond [`can_step_wrt_zoc`], a planned route may pass a tile whose
/// hostile neighbors all lie in the `came_from` directions, because the
/// route is assumed to have cleared them.
#[must_use]
pub fn goto_zoc_ok<V: MapView + ?Sized>(
    view: &V,
    unit: &UnitSnapshot,
    from: TilePos,
    to: TilePos,
    came_from: DirectionSet,
) -> bool {
    if can_step_wrt_zoc(view, unit, from, to) {
        return true;
    }
    if from == unit.pos && !view.has_non_allied_unit(to, unit.owner) {
        return false;
    }
    !view.geometry().adjacent(from).any(|(dir, neighbor)| {
        !came_from.contains(dir)
            && !view.is_ocean(neighbor)
            && view.has_enemy_unit(neighbor, unit.owner)
    })
}

/// Chance, in percent, that `unit` is lost when it ends its turn on `pos`.
#[must_use]
pub fn unit_loss_pct<V: MapView + ?Sized>(view: &V, unit: &UnitSnapshot, pos: TilePos) -> u8 {
    if unit.unit_type.coast_bound && view.is_ocean(pos) && !has_adjacent_land(view, pos) {
        COAST_BOUND_LOSS_PCT
    } else {
        0
    }
}

/// Reports whether an armed unit at war with `player` stands next to `pos`.
#[must_use]
pub fn enemies_at<V: MapView + ?Sized>(view: &V, player: PlayerId, pos: TilePos) -> bool {
    view.geometry().adjacent(pos).any(|(_, neighbor)| {
        view.units_at(neighbor).iter().any(|other| {
            other.unit_type.is_military() && view.relation(other.owner, player).is_at_war()
        })
    })
}

/// Reports whether `player` knows of a land tile adjacent to `pos`.
#[must_use]
pub fn is_coast_seen<V: MapView + ?Sized>(view: &V, player: PlayerId, pos: TilePos) -> bool {
    view.geometry()
        .adjacent(pos)
        .any(|(_, neighbor)| view.is_known(player, neighbor) && !view.is_ocean(neighbor))
}

/// Cheap pre-check rejecting destinations the unit should not head for.
///
/// Stricter than reachability: a land unit bound for another continent must
/// already stand on, or next to, that continent, even when an allied
/// transport could ferry it across. A ground unit bound for water needs an
/// allied transport with free space there, on the shore of its own
/// continent. Ships need water on or next to the destination.
///
/// With `omniscient` unset, destinations the owner has not explored are
/// assumed reachable.
#[must_use]
pub fn goto_is_sane<V: MapView + ?Sized>(
    view: &V,
    unit: &UnitSnapshot,
    dest: TilePos,
    omniscient: bool,
) -> bool {
    if unit.pos == dest {
        return true;
    }
    if !view.geometry().contains(dest) {
        return false;
    }
    if !omniscient && !view.is_known(unit.owner, dest) {
        return true;
    }

    if unit.is_ground() {
        if view.is_ocean(dest) {
            let own_continent = view.continent(unit.pos);
            view.transport_capacity(dest, unit.owner) > 0
                && touches_continent(view, dest, own_continent)
        } else {
            let dest_continent = view.continent(dest);
            view.continent(unit.pos) == dest_continent
                || touches_continent(view, unit.pos, dest_continent)
        }
    } else {
        view.is_ocean(dest) || view.is_ocean_near(dest)
    }
}

fn has_adjacent_land<V: MapView + ?Sized>(view: &V, pos: TilePos) -> bool {
    view.geometry()
        .adjacent(pos)
        .any(|(_, neighbor)| !view.is_ocean(neighbor))
}

fn touches_continent<V: MapView + ?Sized>(view: &V, pos: TilePos, continent: ContinentId) -> bool {
    continent != ContinentId::NONE
        && view
            .geometry()
            .adjacent(pos)
            .any(|(_, neighbor)| view.continent(neighbor) == continent)
}
