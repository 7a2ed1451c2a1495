//! Per-edge verdicts folding legality and deterrents into a single cost.

use tracing::trace;
use warmap_core::{
    is_my_zoc, land_step_cost, CostSource, Direction, DirectionSet, MapView, PlayerId, TilePos,
    UnitSnapshot, SINGLE_MOVE,
};

use crate::{goto_zoc_ok, unit_loss_pct, Deterrents};

/// Outcome of evaluating a single step for a planned route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeVerdict {
    /// The step is legal and costs the provided move fragments.
    Allowed(u16),
    /// The step is legal but discouraged by an added cost.
    Deterred {
        /// Cost the step would have without the deterrent.
        base: u16,
        /// Cost added on top of the base.
        deterrent: u16,
    },
    /// The step must never appear on a planned route.
    Blocked,
}

impl EdgeVerdict {
    /// Collapses the verdict to the numeric encoding used during relaxation.
    #[must_use]
    pub const fn cost(self) -> Option<u16> {
        match self {
            Self::Allowed(cost) => Some(cost),
            Self::Deterred { base, deterrent } => Some(base.saturating_add(deterrent)),
            Self::Blocked => None,
        }
    }

    /// Reports whether the step may be taken at all.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }

    /// Raises the step cost to `level`, leaving cheaper-than-level steps deterred.
    fn deterred(base: u16, level: u16) -> Self {
        if level > base {
            Self::Deterred {
                base,
                deterrent: level - base,
            }
        } else {
            Self::Allowed(base)
        }
    }
}

/// Everything a planned route needs to know about its mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeContext {
    unit: UnitSnapshot,
    destination: TilePos,
    ai_controlled: bool,
    landing_cargo_owner: Option<PlayerId>,
    deterrents: Deterrents,
}

impl EdgeContext {
    /// Captures the mover, its destination and the deterrents to apply.
    ///
    /// For a ship carrying passengers, the first passenger's owner is kept
    /// when landing at `destination` would put it next to non-allied units
    /// outside an allied city and outside its own zone of control.
    #[must_use]
    pub fn new<V: MapView + ?Sized>(
        view: &V,
        unit: UnitSnapshot,
        destination: TilePos,
        deterrents: Deterrents,
    ) -> Self {
        let landing_cargo_owner = if unit.is_ground() {
            None
        } else {
            view.passengers(unit.id)
                .first()
                .map(|cargo| cargo.owner)
                .filter(|&owner| {
                    !view.is_ocean(destination)
                        && view.has_non_allied_unit(destination, owner)
                        && !view.has_allied_city(destination, owner)
                        && !is_my_zoc(view, owner, destination)
                })
        };

        Self {
            unit,
            destination,
            ai_controlled: view.is_ai(unit.owner),
            landing_cargo_owner,
            deterrents,
        }
    }

    /// Unit the route is planned for.
    #[must_use]
    pub const fn unit(&self) -> &UnitSnapshot {
        &self.unit
    }

    /// Tile the route leads to.
    #[must_use]
    pub const fn destination(&self) -> TilePos {
        self.destination
    }

    /// Reports whether the unit's owner is computer controlled.
    #[must_use]
    pub const fn is_ai(&self) -> bool {
        self.ai_controlled
    }

    /// Owner of the passenger whose landing is penalized, if any.
    #[must_use]
    pub const fn landing_cargo_owner(&self) -> Option<PlayerId> {
        self.landing_cargo_owner
    }

    /// Deterrents applied by this context.
    #[must_use]
    pub const fn deterrents(&self) -> Deterrents {
        self.deterrents
    }

    fn hides<V: MapView + ?Sized>(&self, view: &V, pos: TilePos) -> bool {
        !self.ai_controlled && !view.is_known(self.unit.owner, pos)
    }
}

/// Verdict for a land unit stepping from `from` to `to` in direction `dir`.
///
/// `came_from` holds the directions leading from `from` back toward the
/// route's origin.
#[must_use]
pub fn land_edge<V: MapView + ?Sized>(
    view: &V,
    ctx: &EdgeContext,
    from: TilePos,
    dir: Direction,
    to: TilePos,
    came_from: DirectionSet,
) -> EdgeVerdict {
    let unit = ctx.unit();
    let Some(base) = land_step_cost(view, &CostSource::of(unit), from, dir, to) else {
        return EdgeVerdict::Blocked;
    };

    if ctx.hides(view, to) {
        return EdgeVerdict::deterred(base, ctx.deterrents.unknown);
    }

    let at_destination = to == ctx.destination;
    if view.has_non_allied_unit(to, unit.owner) {
        if view.is_ocean(from) || !at_destination {
            trace!(unit = unit.id.get(), %to, "occupied tile blocks the route");
            return EdgeVerdict::Blocked;
        }
        return EdgeVerdict::Allowed(SINGLE_MOVE);
    }

    if view.has_non_allied_city(to, unit.owner) {
        if view.is_ocean(from) || !at_destination {
            return EdgeVerdict::Blocked;
        }
        return if unit_loss_pct(view, unit, to) > 0 {
            EdgeVerdict::deterred(SINGLE_MOVE, ctx.deterrents.danger)
        } else {
            EdgeVerdict::Allowed(SINGLE_MOVE)
        };
    }

    if !goto_zoc_ok(view, unit, from, to, came_from) {
        trace!(unit = unit.id.get(), %from, %to, "zone of control blocks the route");
        return EdgeVerdict::Blocked;
    }

    EdgeVerdict::Allowed(base)
}

/// Verdict for a ship stepping from `from` to `to` in direction `dir`.
#[must_use]
pub fn sea_edge<V: MapView + ?Sized>(
    view: &V,
    ctx: &EdgeContext,
    from: TilePos,
    dir: Direction,
    to: TilePos,
) -> EdgeVerdict {
    let unit = ctx.unit();
    let at_destination = to == ctx.destination;
    if !view.step_cost(from, dir).is_sea_lane() && !at_destination {
        return EdgeVerdict::Blocked;
    }

    let mut verdict = if unit_loss_pct(view, unit, to) > 0 {
        EdgeVerdict::deterred(SINGLE_MOVE, ctx.deterrents.danger)
    } else {
        EdgeVerdict::Allowed(SINGLE_MOVE)
    };

    if at_destination {
        if let Some(owner) = ctx.landing_cargo_owner {
            let landing = ctx.deterrents.landing;
            if verdict.cost().is_some_and(|cost| cost < landing) && !is_my_zoc(view, owner, from)
            {
                verdict = EdgeVerdict::deterred(SINGLE_MOVE, landing);
            }
        }
    }

    if ctx.hides(view, to) {
        verdict = EdgeVerdict::deterred(SINGLE_MOVE, ctx.deterrents.unknown);
    }

    if !at_destination
        && (view.has_non_allied_unit(to, unit.owner) || view.has_non_allied_city(to, unit.owner))
    {
        return EdgeVerdict::Blocked;
    }

    verdict
}
