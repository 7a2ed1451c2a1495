//! Tie-breaking between equally cheap first steps.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;
use warmap_core::{Direction, MapView, TilePos, UnitSnapshot, MOVE_COST_ROAD, SINGLE_MOVE};
use warmap_system_legality::{is_coast_seen, unit_loss_pct};

use crate::{GotoTuning, PathPlanner};

/// Multiplier applied to raw attack and defense strengths.
const POWER_FACTOR: i64 = 10;

/// Picks the next step for `unit` among the planner's marked directions.
///
/// Returns `None` when every marked direction would put the unit at undue risk.
pub(crate) fn find_a_direction<V, R>(
    view: &V,
    planner: &PathPlanner,
    unit: &UnitSnapshot,
    dest: TilePos,
    tuning: &GotoTuning,
    rng: &mut R,
) -> Option<Direction>
where
    V: MapView + ?Sized,
    R: Rng + ?Sized,
{
    let geometry = view.geometry();
    let available = planner.direction_vector(unit.pos);
    let afraid_of_sinking = unit.unit_type.coast_bound;

    if !afraid_of_sinking {
        if let Some(dir) = geometry.direction_for_step(unit.pos, dest) {
            if available.contains(dir) {
                return Some(dir);
            }
        }
        if let Some(dir) = available.single() {
            return Some(dir);
        }
    }

    let passenger = if view.is_ocean(unit.pos) {
        view.passengers(unit.id).into_iter().next()
    } else {
        None
    };
    let human = !view.is_ai(unit.owner);
    let moves_left = i64::from(unit.moves_left);
    let single = i64::from(SINGLE_MOVE);

    let mut scored: Vec<(Direction, i64)> = Vec::new();
    for dir in available.iter() {
        let Some(target) = geometry.step(unit.pos, dir) else {
            continue;
        };

        let mut base = if unit.is_ground() {
            i64::from(
                view.step_cost(unit.pos, dir)
                    .land_cost()
                    .unwrap_or(SINGLE_MOVE),
            )
        } else {
            single
        };
        if unit.unit_type.ignores_terrain && base >= i64::from(MOVE_COST_ROAD) {
            base = i64::from(MOVE_COST_ROAD);
        }

        let (mut fitness, best_defense) = tile_fitness(view, unit, target);
        let specials = view.specials(target);
        if specials.road || specials.railroad {
            fitness += i64::from(tuning.road_fitness_bonus);
        }

        let mut forbidden = false;
        for (_, around) in geometry.adjacent(target) {
            if !view.is_known(unit.owner, around) {
                if moves_left < base {
                    fitness -= fitness * i64::from(tuning.unknown_fitness_penalty_percent) / 100;
                } else {
                    fitness += 1;
                }
                continue;
            }
            if moves_left >= base + single {
                continue;
            }
            for enemy in view.units_at(around) {
                if enemy.unit_type.attack == 0 || !view.relation(enemy.owner, unit.owner).is_at_war()
                {
                    continue;
                }
                if passenger.is_some() && !enemy.is_ground() {
                    forbidden = true;
                    break;
                }
                let attack = i64::from(enemy.unit_type.attack) * POWER_FACTOR;
                let attack_sq = attack * attack;
                fitness -= best_defense * i64::from(enemy.hp) * attack_sq
                    / (attack_sq + best_defense * best_defense);
            }
            if forbidden {
                break;
            }
        }
        if forbidden {
            trace!(unit = unit.id.get(), dir = dir.name(), "direction forbidden by hostile ships");
            continue;
        }

        if afraid_of_sinking && !is_coast_seen(view, unit.owner, target) {
            if moves_left < 2 * single {
                continue;
            }
            fitness = 1;
        }

        if fitness < 1 && (human || passenger.is_none() || moves_left >= 2 * single) {
            fitness = 1;
        }
        if fitness < 0 {
            continue;
        }
        trace!(unit = unit.id.get(), dir = dir.name(), fitness, "scored direction");
        scored.push((dir, fitness));
    }

    if scored.is_empty() && afraid_of_sinking && unit_loss_pct(view, unit, unit.pos) > 0 {
        for (dir, around) in geometry.adjacent(unit.pos) {
            let enterable = view.is_ocean(around) || view.has_allied_city(around, unit.owner);
            if enterable && is_coast_seen(view, unit.owner, around) {
                scored.push((dir, 1));
            }
        }
    }

    let best = scored.iter().map(|&(_, fitness)| fitness).max()?;
    let finalists: Vec<Direction> = scored
        .into_iter()
        .filter(|&(_, fitness)| fitness == best)
        .map(|(dir, _)| dir)
        .collect();
    finalists.choose(rng).copied()
}

/// Estimated staying power on `target` and the best defense standing there.
fn tile_fitness<V: MapView + ?Sized>(view: &V, unit: &UnitSnapshot, target: TilePos) -> (i64, i64) {
    let own_rating = rating(view, unit, target);
    let own_defense = defense(view, unit, target);

    let allies: Vec<UnitSnapshot> = view
        .units_at(target)
        .into_iter()
        .filter(|other| other.id != unit.id && view.is_allied(other.owner, unit.owner))
        .collect();
    let mut strongest: Option<(&UnitSnapshot, i64)> = None;
    for ally in &allies {
        let ally_rating = rating(view, ally, target);
        if strongest.map_or(true, |(_, best)| ally_rating > best) {
            strongest = Some((ally, ally_rating));
        }
    }
    let Some((best_ally, ally_rating)) = strongest else {
        return (own_rating, own_defense);
    };

    let best_defense = own_defense.max(defense(view, best_ally, target));
    let count = i64::try_from(allies.len()).unwrap_or(0);

    let sheltered = view.city(target).is_some() || view.specials(target).fortress;
    let fitness = if sheltered {
        own_rating.max(ally_rating)
    } else if own_rating <= ally_rating {
        ally_rating * count / (count + 1)
    } else {
        (own_rating * (count + 1))
            .min(own_rating * own_rating * count / (count + 1).max(ally_rating * (count + 1)))
    };
    (fitness, best_defense)
}

/// Defense of `unit` if it stood on `tile`, including terrain and city bonuses.
fn defense<V: MapView + ?Sized>(view: &V, unit: &UnitSnapshot, tile: TilePos) -> i64 {
    if unit.is_ground() && view.is_ocean(tile) {
        return 0;
    }
    let fortress = if view.specials(tile).fortress { 100 } else { 0 };
    let bonus = 100 + i64::from(view.terrain(tile).defense_bonus_percent()) + fortress;
    let power = i64::from(unit.unit_type.defense) * POWER_FACTOR * bonus / 100;
    let multiplier = 2 + view
        .city(tile)
        .map_or(0, |city| i64::from(city.defense_bonus_percent) / 100);
    power * multiplier / 2
}

fn rating<V: MapView + ?Sized>(view: &V, unit: &UnitSnapshot, tile: TilePos) -> i64 {
    defense(view, unit, tile) * i64::from(unit.hp)
}
