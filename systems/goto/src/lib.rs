#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Route planning and turn-by-turn execution of unit goto orders.

mod direction;
mod planner;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use warmap_core::{Command, Event, MapView, TilePos, UnitId};
use warmap_system_legality::{goto_is_sane, Deterrents};

pub use planner::PathPlanner;

/// Tuning knobs for planning and executing goto orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GotoTuning {
    /// Step cost charged for entering a tile a human player has not explored.
    pub unknown_deterrent: u16,
    /// Step cost charged for entering a tile where the unit risks being lost.
    pub danger_move: u16,
    /// Step cost charged for landing a passenger outside its own zone of control.
    pub landing_penalty: u16,
    /// Share of a candidate's fitness lost per unexplored neighbor when the
    /// unit cannot step again this turn.
    pub unknown_fitness_penalty_percent: u16,
    /// Fitness bonus for candidates with a road or railroad.
    pub road_fitness_bonus: u16,
}

impl GotoTuning {
    /// Deterrents handed to the edge evaluation.
    #[must_use]
    pub const fn deterrents(&self) -> Deterrents {
        Deterrents {
            unknown: self.unknown_deterrent,
            danger: self.danger_move,
            landing: self.landing_penalty,
        }
    }
}

impl Default for GotoTuning {
    fn default() -> Self {
        let deterrents = Deterrents::default();
        Self {
            unknown_deterrent: deterrents.unknown,
            danger_move: deterrents.danger,
            landing_penalty: deterrents.landing,
            unknown_fitness_penalty_percent: 6,
            road_fitness_bonus: 10,
        }
    }
}

/// Result of advancing a goto order for one turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GotoOutcome {
    /// Movement points ran out; the order stays active.
    Continuing,
    /// The unit stands on its destination.
    Arrived,
    /// The order cannot proceed and the unit idles.
    Blocked(BlockReason),
    /// A step did not land where expected.
    Interrupted(InterruptReason),
}

/// Why a goto order was abandoned before moving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockReason {
    /// The destination can never be reached by the unit's movement domain.
    NotSane,
    /// No legal route exists.
    NoPath,
    /// Every next step would expose the unit to undue risk.
    NoSafeDirection,
}

/// Why a goto order stopped after issuing a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptReason {
    /// The unit no longer exists.
    UnitLost,
    /// The world refused the step.
    MoveRejected,
    /// The unit ended up somewhere other than the intended tile.
    Displaced,
}

/// Drives units along planned routes, one turn at a time.
#[derive(Clone, Debug)]
pub struct GotoExecutor {
    planner: PathPlanner,
    rng: ChaCha8Rng,
    tuning: GotoTuning,
}

impl GotoExecutor {
    /// Creates an executor with default tuning whose tie-breaks follow `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, GotoTuning::default())
    }

    /// Creates an executor using the provided tuning.
    #[must_use]
    pub fn with_tuning(seed: u64, tuning: GotoTuning) -> Self {
        Self {
            planner: PathPlanner::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tuning,
        }
    }

    /// Tuning applied to every order.
    #[must_use]
    pub const fn tuning(&self) -> GotoTuning {
        self.tuning
    }

    /// Planner holding the most recent route.
    #[must_use]
    pub const fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    /// Moves `unit` toward `dest` as far as this turn's movement allows.
    ///
    /// Every step is issued as a [`Command::MoveUnit`] handed to `apply`,
    /// which executes it against `world` and reports the resulting events.
    pub fn advance<W, A>(
        &mut self,
        world: &mut W,
        unit: UnitId,
        dest: TilePos,
        mut apply: A,
    ) -> GotoOutcome
    where
        W: MapView + ?Sized,
        A: FnMut(&mut W, Command, &mut Vec<Event>),
    {
        let Some(snapshot) = world.unit(unit) else {
            return report(unit, GotoOutcome::Interrupted(InterruptReason::UnitLost));
        };
        if snapshot.pos == dest {
            return report(unit, GotoOutcome::Arrived);
        }
        if !goto_is_sane(&*world, &snapshot, dest, false) {
            return report(unit, GotoOutcome::Blocked(BlockReason::NotSane));
        }
        if snapshot.moves_left == 0 {
            return report(unit, GotoOutcome::Continuing);
        }

        debug!(unit = unit.get(), from = %snapshot.pos, %dest, "planning");
        if !self.planner.plan(&*world, &snapshot, dest, &self.tuning) {
            info!(unit = unit.get(), from = %snapshot.pos, %dest, "no route to destination");
            return report(unit, GotoOutcome::Blocked(BlockReason::NoPath));
        }

        let mut events = Vec::new();
        let mut current = snapshot;
        loop {
            if current.pos == dest {
                return report(unit, GotoOutcome::Arrived);
            }
            if current.moves_left == 0 {
                return report(unit, GotoOutcome::Continuing);
            }

            let Some(dir) = direction::find_a_direction(
                &*world,
                &self.planner,
                &current,
                dest,
                &self.tuning,
                &mut self.rng,
            ) else {
                debug!(unit = unit.get(), at = %current.pos, "stalling to stay safe");
                return report(unit, GotoOutcome::Blocked(BlockReason::NoSafeDirection));
            };
            let Some(target) = world.geometry().step(current.pos, dir) else {
                return report(unit, GotoOutcome::Blocked(BlockReason::NoSafeDirection));
            };

            debug!(unit = unit.get(), dir = dir.name(), %target, "stepping");
            events.clear();
            apply(&mut *world, Command::MoveUnit { unit, to: target }, &mut events);

            let Some(after) = world.unit(unit) else {
                return report(unit, GotoOutcome::Interrupted(InterruptReason::UnitLost));
            };
            let rejected = events.iter().any(|event| {
                matches!(event, Event::UnitMoveRejected { unit: rejected, .. } if *rejected == unit)
            });
            if rejected {
                return report(unit, GotoOutcome::Interrupted(InterruptReason::MoveRejected));
            }
            if after.pos != target {
                return report(unit, GotoOutcome::Interrupted(InterruptReason::Displaced));
            }
            current = after;
        }
    }
}

fn report(unit: UnitId, outcome: GotoOutcome) -> GotoOutcome {
    debug!(unit = unit.get(), ?outcome, "goto finished for this turn");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning_mirrors_edge_deterrents() {
        let tuning = GotoTuning::default();
        assert_eq!(tuning.deterrents(), Deterrents::default());
        assert_eq!(tuning.unknown_fitness_penalty_percent, 6);
        assert_eq!(tuning.road_fitness_bonus, 10);
    }
}
