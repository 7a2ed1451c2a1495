//! Shortest-route search recording every optimal first step per tile.

use tracing::debug;
use warmap_core::{
    is_dist_finite, Direction, DirectionSet, MapGeometry, MapView, MoveType, TilePos,
    UnitSnapshot, MAX_COST,
};
use warmap_system_legality::{enemies_at, land_edge, sea_edge, EdgeContext};
use warmap_system_warmap::{CostGrid, RelaxationQueue, DEFAULT_QUEUE_CAPACITY_HINT};

use crate::GotoTuning;

/// Owned scratch state for planning a single unit's route.
///
/// After a successful [`PathPlanner::plan`], every tile on some cheapest
/// route carries the directions that continue along a cheapest route.
#[derive(Clone, Debug)]
pub struct PathPlanner {
    geometry: MapGeometry,
    costs: CostGrid,
    local: Vec<DirectionSet>,
    vector: Vec<DirectionSet>,
    queue: RelaxationQueue,
    route: Option<(TilePos, TilePos)>,
}

impl PathPlanner {
    /// Creates an empty planner whose queue warns above `queue_capacity_hint`.
    #[must_use]
    pub fn new(queue_capacity_hint: usize) -> Self {
        let geometry = MapGeometry::new(0, 0);
        Self {
            geometry,
            costs: CostGrid::new(geometry),
            local: Vec::new(),
            vector: Vec::new(),
            queue: RelaxationQueue::with_capacity_hint(queue_capacity_hint),
            route: None,
        }
    }

    /// Searches for the cheapest routes from the unit's tile to `dest`.
    ///
    /// Returns `false` when no route exists; the direction vector is then
    /// left empty.
    pub fn plan<V: MapView + ?Sized>(
        &mut self,
        view: &V,
        unit: &UnitSnapshot,
        dest: TilePos,
        tuning: &GotoTuning,
    ) -> bool {
        self.reset(view.geometry());
        if unit.pos == dest {
            self.costs.set(dest, 0);
            self.route = Some((unit.pos, dest));
            return true;
        }
        if !self.geometry.contains(unit.pos) || !self.geometry.contains(dest) {
            return false;
        }

        let ctx = EdgeContext::new(view, *unit, dest, tuning.deterrents());
        self.forward(view, &ctx);

        let cost = self.costs.get(dest);
        if !is_dist_finite(cost) {
            debug!(unit = unit.id.get(), %dest, "no route found");
            self.vector.fill(DirectionSet::EMPTY);
            return false;
        }

        self.backtrace(dest);
        self.route = Some((unit.pos, dest));
        debug!(unit = unit.id.get(), from = %unit.pos, %dest, cost, "route planned");
        true
    }

    /// Directions that continue along a cheapest route from `pos`.
    #[must_use]
    pub fn direction_vector(&self, pos: TilePos) -> DirectionSet {
        self.geometry
            .index(pos)
            .and_then(|index| self.vector.get(index).copied())
            .unwrap_or(DirectionSet::EMPTY)
    }

    /// Cost of the cheapest route found, or [`MAX_COST`] without one.
    #[must_use]
    pub fn destination_cost(&self) -> u8 {
        match self.route {
            Some((_, dest)) => self.costs.get(dest),
            None => MAX_COST,
        }
    }

    /// Cost recorded for `pos` by the most recent forward pass.
    #[must_use]
    pub fn cost(&self, pos: TilePos) -> u8 {
        self.costs.get(pos)
    }

    /// One representative route, excluding the starting tile.
    ///
    /// Follows the lowest-index marked direction from the source until the
    /// destination is reached. Empty without a planned route.
    #[must_use]
    pub fn path(&self) -> Vec<TilePos> {
        let Some((source, dest)) = self.route else {
            return Vec::new();
        };
        let mut tiles = Vec::new();
        let mut current = source;
        while current != dest && tiles.len() < self.geometry.tile_count() {
            let Some(next) = self
                .direction_vector(current)
                .iter()
                .next()
                .and_then(|dir| self.geometry.step(current, dir))
            else {
                break;
            };
            tiles.push(next);
            current = next;
        }
        tiles
    }

    fn reset(&mut self, geometry: MapGeometry) {
        self.geometry = geometry;
        self.costs.reset(geometry);
        self.local.clear();
        self.local.resize(geometry.tile_count(), DirectionSet::EMPTY);
        self.vector.clear();
        self.vector.resize(geometry.tile_count(), DirectionSet::EMPTY);
        self.queue.reset();
        self.route = None;
    }

    fn forward<V: MapView + ?Sized>(&mut self, view: &V, ctx: &EdgeContext) {
        let unit = *ctx.unit();
        let dest = ctx.destination();
        let dissuade_ship = unit.move_type() == MoveType::Sea && ctx.is_ai();
        let caution = if unit.unit_type.transport_capacity > unit.unit_type.attack {
            3
        } else {
            2
        };
        let mut max_cost = u16::from(MAX_COST);

        self.costs.set(unit.pos, 0);
        self.queue.push(unit.pos);

        while let Some(pos) = self.queue.pop() {
            let cost = self.costs.get(pos);
            let came_from = self.local_at(pos);
            for (dir, neighbor) in self.geometry.adjacent(pos) {
                if self.costs.get(neighbor) <= cost {
                    continue;
                }
                let verdict = match unit.move_type() {
                    MoveType::Land => land_edge(view, ctx, pos, dir, neighbor, came_from),
                    MoveType::Sea => sea_edge(view, ctx, pos, dir, neighbor),
                };
                let Some(step) = verdict.cost() else {
                    continue;
                };
                let mut total = u16::from(cost).saturating_add(step);

                if dissuade_ship
                    && u16::from(cost) < unit.moves_left
                    && total < max_cost
                    && i32::from(total) >= i32::from(unit.moves_left) - caution
                    && enemies_at(view, unit.owner, neighbor)
                {
                    total = total.saturating_add(unit.move_rate());
                }

                if total >= max_cost {
                    continue;
                }
                let Ok(total) = u8::try_from(total) else {
                    continue;
                };
                let recorded = self.costs.get(neighbor);
                if total < recorded {
                    self.costs.set(neighbor, total);
                    self.queue.push(neighbor);
                    self.set_local(neighbor, DirectionSet::only(dir.reverse()));
                    debug!(from = %pos, to = %neighbor, cost = total, "candidate");
                } else if total == recorded {
                    let mut local = self.local_at(neighbor);
                    local.insert(dir.reverse());
                    self.set_local(neighbor, local);
                    debug!(from = %pos, to = %neighbor, cost = total, "co-candidate");
                }

                if neighbor == dest && max_cost > u16::from(total) {
                    max_cost = u16::from(total) + 1;
                }
            }
        }
    }

    fn backtrace(&mut self, dest: TilePos) {
        self.vector.fill(DirectionSet::EMPTY);
        self.queue.reset();
        self.queue.push(dest);

        while let Some(pos) = self.queue.pop() {
            let pending = self.local_at(pos);
            self.set_local(pos, DirectionSet::EMPTY);
            for dir in pending.iter() {
                let Some(previous) = self.geometry.step(pos, dir) else {
                    continue;
                };
                self.mark(previous, dir.reverse());
                self.queue.push(previous);
            }
        }
    }

    fn local_at(&self, pos: TilePos) -> DirectionSet {
        self.geometry
            .index(pos)
            .and_then(|index| self.local.get(index).copied())
            .unwrap_or(DirectionSet::EMPTY)
    }

    fn set_local(&mut self, pos: TilePos, set: DirectionSet) {
        if let Some(slot) = self
            .geometry
            .index(pos)
            .and_then(|index| self.local.get_mut(index))
        {
            *slot = set;
        }
    }

    fn mark(&mut self, pos: TilePos, dir: Direction) {
        if let Some(slot) = self
            .geometry
            .index(pos)
            .and_then(|index| self.vector.get_mut(index))
        {
            slot.insert(dir);
        }
    }
}

impl Default for PathPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY_HINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_unplanned_planner_has_no_route() {
        let planner = PathPlanner::default();
        assert!(planner.path().is_empty());
        assert_eq!(planner.destination_cost(), MAX_COST);
        assert!(planner.direction_vector(TilePos::new(0, 0)).is_empty());
    }
}
