#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cost-grid generator producing land and sea warmaps.
//!
//! A warmap holds the cheapest known cost, in move fragments, from a source to
//! every tile. Costs are relaxed with a FIFO label-correcting pass: a tile is
//! re-queued whenever its recorded cost drops, regardless of whether it was
//! expanded before.

mod grid;
mod queue;

use tracing::debug;
use warmap_core::{
    land_step_cost, CostSource, MapView, MoveType, PlayerId, TilePos, UnitId, UnitKind,
    UnitSnapshot, MAX_COST, SINGLE_MOVE,
};

pub use grid::CostGrid;
pub use queue::{RelaxationQueue, RelaxationStats, DEFAULT_QUEUE_CAPACITY_HINT};
pub use warmap_core::is_dist_finite;

/// Base distance unit used to size the default relaxation bound.
pub const THRESHOLD: u8 = 12;

/// Tuning knobs for warmap generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WarmapTuning {
    /// Candidates at or above this cost are never recorded.
    pub max_cost: u8,
    /// Queue length above which relaxation logs an overflow warning.
    pub queue_capacity_hint: usize,
}

impl Default for WarmapTuning {
    fn default() -> Self {
        Self {
            max_cost: THRESHOLD * 6 + 2,
            queue_capacity_hint: DEFAULT_QUEUE_CAPACITY_HINT,
        }
    }
}

/// Origin of a warmap computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarmapSource {
    /// A unit; only its own movement domain is computed.
    Unit(UnitId),
    /// A stationary point such as a city; both domains are computed.
    Point {
        /// Tile the costs are measured from.
        pos: TilePos,
        /// Player whose transports and relations apply.
        owner: PlayerId,
    },
}

/// Whether [`Warmap::generate`] recomputed the grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generation {
    /// The previous grids still describe the source.
    Reused,
    /// The grids were recomputed from scratch.
    Computed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CacheKey {
    source: WarmapSource,
    revision: u64,
}

/// Cached land and sea cost grids for the most recent source.
#[derive(Clone, Debug)]
pub struct Warmap {
    tuning: WarmapTuning,
    land: CostGrid,
    sea: CostGrid,
    queue: RelaxationQueue,
    cached: Option<CacheKey>,
    stats: RelaxationStats,
}

impl Warmap {
    /// Creates an empty warmap using the provided tuning.
    #[must_use]
    pub fn new(tuning: WarmapTuning) -> Self {
        let empty = CostGrid::new(warmap_core::MapGeometry::new(0, 0));
        Self {
            tuning,
            land: empty.clone(),
            sea: empty,
            queue: RelaxationQueue::with_capacity_hint(tuning.queue_capacity_hint),
            cached: None,
            stats: RelaxationStats::default(),
        }
    }

    /// Tuning used by this warmap.
    #[must_use]
    pub const fn tuning(&self) -> WarmapTuning {
        self.tuning
    }

    /// Brings the grids up to date for `source`, reusing them when possible.
    ///
    /// A unit source is reused while it is the same unit, its tile still has
    /// cost zero in its domain and the world has not changed. A point source is
    /// reused while the position, owner and world revision match. A unit that
    /// no longer exists leaves both grids unreached.
    pub fn generate<V: MapView + ?Sized>(&mut self, view: &V, source: WarmapSource) -> Generation {
        let key = CacheKey {
            source,
            revision: view.revision(),
        };
        if self.cached == Some(key) && self.source_still_valid(view, source) {
            debug!(?source, "reusing warmap");
            return Generation::Reused;
        }

        let geometry = view.geometry();
        self.land.reset(geometry);
        self.sea.reset(geometry);
        self.queue.reset();
        self.stats = RelaxationStats::default();

        match source {
            WarmapSource::Unit(id) => {
                if let Some(unit) = view.unit(id) {
                    let max_cost = unit_max_cost(self.tuning.max_cost, &unit);
                    match unit.move_type() {
                        MoveType::Land => {
                            self.relax_land(view, unit.pos, CostSource::of(&unit), max_cost);
                        }
                        MoveType::Sea => self.relax_sea(view, unit.pos, max_cost),
                    }
                }
            }
            WarmapSource::Point { pos, .. } => {
                let max_cost = self.tuning.max_cost;
                self.relax_land(view, pos, CostSource::Point, max_cost);
                self.relax_sea(view, pos, max_cost);
            }
        }

        self.cached = Some(key);
        debug!(
            ?source,
            pushes = self.stats.pushes,
            pops = self.stats.pops,
            peak = self.stats.peak_queue_len,
            "generated warmap"
        );
        Generation::Computed
    }

    /// Cost recorded for `pos` in the provided domain.
    #[must_use]
    pub fn cost(&self, domain: MoveType, pos: TilePos) -> u8 {
        match domain {
            MoveType::Land => self.land.get(pos),
            MoveType::Sea => self.sea.get(pos),
        }
    }

    /// Most recent land grid.
    #[must_use]
    pub const fn land_costs(&self) -> &CostGrid {
        &self.land
    }

    /// Most recent sea grid.
    #[must_use]
    pub const fn sea_costs(&self) -> &CostGrid {
        &self.sea
    }

    /// Counters from the most recent computation, summed over both domains.
    #[must_use]
    pub const fn stats(&self) -> RelaxationStats {
        self.stats
    }

    /// Forces the next [`Warmap::generate`] call to recompute.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Generates the unit's warmap and returns the cost of reaching `dest`.
    ///
    /// Returns [`MAX_COST`] when the unit does not exist.
    pub fn move_cost_to<V: MapView + ?Sized>(
        &mut self,
        view: &V,
        unit: UnitId,
        dest: TilePos,
    ) -> u8 {
        let Some(snapshot) = view.unit(unit) else {
            return MAX_COST;
        };
        let _ = self.generate(view, WarmapSource::Unit(unit));
        self.cost(snapshot.move_type(), dest)
    }

    fn source_still_valid<V: MapView + ?Sized>(&self, view: &V, source: WarmapSource) -> bool {
        match source {
            WarmapSource::Unit(id) => view
                .unit(id)
                .is_some_and(|unit| self.cost(unit.move_type(), unit.pos) == 0),
            WarmapSource::Point { .. } => true,
        }
    }

    fn relax_land<V: MapView + ?Sized>(
        &mut self,
        view: &V,
        origin: TilePos,
        source: CostSource,
        max_cost: u8,
    ) {
        let geometry = view.geometry();
        self.land.set(origin, 0);
        self.queue.push(origin);

        while let Some(pos) = self.queue.pop() {
            let cost = self.land.get(pos);
            for (dir, neighbor) in geometry.adjacent(pos) {
                if self.land.get(neighbor) <= cost {
                    continue;
                }
                let Some(step) = land_step_cost(view, &source, pos, dir, neighbor) else {
                    continue;
                };
                let Some(total) = bounded_total(cost, step, max_cost) else {
                    continue;
                };
                if total < self.land.get(neighbor) {
                    self.land.set(neighbor, total);
                    self.queue.push(neighbor);
                }
            }
        }
        self.absorb_queue_stats();
    }

    fn relax_sea<V: MapView + ?Sized>(&mut self, view: &V, origin: TilePos, max_cost: u8) {
        let geometry = view.geometry();
        self.sea.set(origin, 0);
        self.queue.push(origin);

        while let Some(pos) = self.queue.pop() {
            let cost = self.sea.get(pos);
            for (dir, neighbor) in geometry.adjacent(pos) {
                let Some(total) = bounded_total(cost, SINGLE_MOVE, max_cost) else {
                    continue;
                };
                if total >= self.sea.get(neighbor) {
                    continue;
                }
                // Shore tiles are costed for bombardment and landings but never expanded.
                self.sea.set(neighbor, total);
                if view.step_cost(pos, dir).is_sea_lane() {
                    self.queue.push(neighbor);
                }
            }
        }
        self.absorb_queue_stats();
    }

    fn absorb_queue_stats(&mut self) {
        let pass = self.queue.stats();
        self.stats.pushes += pass.pushes;
        self.stats.pops += pass.pops;
        self.stats.peak_queue_len = self.stats.peak_queue_len.max(pass.peak_queue_len);
        self.stats.overflow_warnings += pass.overflow_warnings;
        self.queue.reset();
    }
}

impl Default for Warmap {
    fn default() -> Self {
        Self::new(WarmapTuning::default())
    }
}

/// Whole turns needed to spend `cost` move fragments at `move_rate` per turn.
///
/// Returns `None` for unreached tiles and for units that cannot move.
#[must_use]
pub fn turns_to_reach(cost: u8, move_rate: u16) -> Option<u32> {
    if !is_dist_finite(cost) || move_rate == 0 {
        return None;
    }
    Some(u32::from(u16::from(cost).div_ceil(move_rate)))
}

/// Relaxation bound for a unit. Single-move city founders search half as far.
fn unit_max_cost(max_cost: u8, unit: &UnitSnapshot) -> u8 {
    if unit.kind == UnitKind::Settlers && unit.move_rate() == SINGLE_MOVE {
        max_cost / 2
    } else {
        max_cost
    }
}

/// Sum of a recorded cost and a step, if it stays strictly below `max_cost`.
fn bounded_total(cost: u8, step: u16, max_cost: u8) -> Option<u8> {
    let total = u16::from(cost).saturating_add(step);
    if total < u16::from(max_cost) {
        u8::try_from(total).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_round_up() {
        assert_eq!(turns_to_reach(0, 3), Some(0));
        assert_eq!(turns_to_reach(3, 3), Some(1));
        assert_eq!(turns_to_reach(4, 3), Some(2));
        assert_eq!(turns_to_reach(MAX_COST, 3), None);
        assert_eq!(turns_to_reach(9, 0), None);
    }

    #[test]
    fn totals_stay_below_the_bound() {
        assert_eq!(bounded_total(70, 3, 74), Some(73));
        assert_eq!(bounded_total(71, 3, 74), None);
        assert_eq!(bounded_total(250, 9, MAX_COST), None);
    }

    #[test]
    fn default_bound_matches_threshold() {
        assert_eq!(WarmapTuning::default().max_cost, 74);
    }
}
