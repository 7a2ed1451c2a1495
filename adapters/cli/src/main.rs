#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that inspects warmaps and runs goto orders on scenario files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use warmap_core::{Command as WorldCommand, MapView, MoveType, TilePos, UnitId};
use warmap_system_goto::{GotoExecutor, GotoOutcome, GotoTuning, PathPlanner};
use warmap_system_warmap::{
    turns_to_reach, Warmap, WarmapSource, WarmapTuning, DEFAULT_QUEUE_CAPACITY_HINT,
};
use warmap_world::{self as world, query, Scenario, TuningOverrides, World};

#[derive(Debug, Parser)]
#[command(name = "warmap")]
#[command(about = "Movement costs and goto orders on scenario maps", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG overrides it
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the cost grid from a unit or a fixed tile
    Warmap {
        /// Scenario file to load
        scenario: PathBuf,

        /// Unit to measure from, by position in the scenario's unit list
        #[arg(long, conflicts_with = "at")]
        unit: Option<usize>,

        /// Fixed tile to measure from, as X,Y
        #[arg(long, value_parser = parse_pos, requires = "owner")]
        at: Option<TilePos>,

        /// Player whose transports and relations apply to a fixed tile
        #[arg(long)]
        owner: Option<String>,

        /// Grid to print for a fixed tile
        #[arg(long, value_enum, default_value_t = Domain::Land)]
        domain: Domain,
    },

    /// Plan a route and print it without moving
    Plan {
        #[command(flatten)]
        order: Order,
    },

    /// Execute a goto order turn by turn
    Goto {
        #[command(flatten)]
        order: Order,

        /// Turns to simulate before giving up
        #[arg(long, default_value_t = 10)]
        turns: u32,

        /// Seed for tie-breaks, overriding the scenario's
        #[arg(long)]
        seed: Option<u64>,

        /// Print the turn log as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct Order {
    /// Scenario file to load
    scenario: PathBuf,

    /// Unit to move, by position in the scenario's unit list
    #[arg(long)]
    unit: usize,

    /// Destination tile, as X,Y
    #[arg(long, value_parser = parse_pos)]
    to: TilePos,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Domain {
    Land,
    Sea,
}

impl From<Domain> for MoveType {
    fn from(domain: Domain) -> Self {
        match domain {
            Domain::Land => Self::Land,
            Domain::Sea => Self::Sea,
        }
    }
}

#[derive(Debug, Serialize)]
struct TurnReport {
    turn: u32,
    outcome: String,
    x: u32,
    y: u32,
    moves_left: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Warmap {
            scenario,
            unit,
            at,
            owner,
            domain,
        } => print_warmap(&scenario, unit, at, owner.as_deref(), domain),
        Commands::Plan { order } => print_plan(&order),
        Commands::Goto {
            order,
            turns,
            seed,
            json,
        } => run_goto(&order, turns, seed, json),
    }
}

fn print_warmap(
    path: &Path,
    unit: Option<usize>,
    at: Option<TilePos>,
    owner: Option<&str>,
    domain: Domain,
) -> Result<()> {
    let scenario = load(path)?;
    let (source, domain) = match (unit, at) {
        (Some(index), _) => {
            let id = unit_id(&scenario, index)?;
            let snapshot = scenario
                .world
                .unit(id)
                .with_context(|| format!("unit #{index} vanished from the world"))?;
            (WarmapSource::Unit(id), snapshot.move_type())
        }
        (None, Some(pos)) => {
            let name = owner.context("--owner is required with --at")?;
            let owner = query::player_by_name(&scenario.world, name)
                .with_context(|| format!("scenario declares no player named {name:?}"))?;
            (WarmapSource::Point { pos, owner }, MoveType::from(domain))
        }
        (None, None) => bail!("either --unit or --at is required"),
    };

    let mut warmap = Warmap::new(warmap_tuning(&scenario.tuning));
    let _ = warmap.generate(&scenario.world, source);
    let grid = match domain {
        MoveType::Land => warmap.land_costs(),
        MoveType::Sea => warmap.sea_costs(),
    };

    println!("{domain:?} costs from {source:?}");
    for row in grid.render_rows() {
        println!("{row}");
    }
    let stats = warmap.stats();
    info!(
        pushes = stats.pushes,
        pops = stats.pops,
        peak = stats.peak_queue_len,
        overflow_warnings = stats.overflow_warnings,
        "relaxation finished"
    );
    Ok(())
}

fn print_plan(order: &Order) -> Result<()> {
    let scenario = load(&order.scenario)?;
    let id = unit_id(&scenario, order.unit)?;
    let unit = scenario
        .world
        .unit(id)
        .with_context(|| format!("unit #{} vanished from the world", order.unit))?;

    let mut planner = PathPlanner::new(
        scenario
            .tuning
            .queue_capacity_hint
            .unwrap_or(DEFAULT_QUEUE_CAPACITY_HINT),
    );
    if !planner.plan(&scenario.world, &unit, order.to, &goto_tuning(&scenario.tuning)) {
        println!("no route from {} to {}", unit.pos, order.to);
        return Ok(());
    }

    let cost = planner.destination_cost();
    let path = planner.path();
    match turns_to_reach(cost, unit.move_rate()) {
        Some(turns) => println!("cost {cost} over {} steps, {turns} turn(s)", path.len()),
        None => println!("cost {cost} over {} steps", path.len()),
    }
    let route: Vec<String> = path.iter().map(ToString::to_string).collect();
    println!("route: {}", route.join(" -> "));
    for row in overlay_route(&scenario.world, &path) {
        println!("{row}");
    }
    Ok(())
}

fn run_goto(order: &Order, turns: u32, seed: Option<u64>, json: bool) -> Result<()> {
    let mut scenario = load(&order.scenario)?;
    let id = unit_id(&scenario, order.unit)?;
    let seed = seed.or(scenario.tuning.seed).unwrap_or_default();
    let mut executor = GotoExecutor::with_tuning(seed, goto_tuning(&scenario.tuning));

    let mut reports = Vec::new();
    let mut events = Vec::new();
    for _ in 0..turns {
        let outcome = executor.advance(&mut scenario.world, id, order.to, world::apply);
        let (pos, moves_left) = scenario
            .world
            .unit(id)
            .map_or((None, 0), |unit| (Some(unit.pos), unit.moves_left));
        let report = TurnReport {
            turn: query::turn(&scenario.world),
            outcome: format!("{outcome:?}"),
            x: pos.map_or(0, |pos| pos.x()),
            y: pos.map_or(0, |pos| pos.y()),
            moves_left,
        };
        if !json {
            match pos {
                Some(pos) => println!("turn {}: {} at {pos}", report.turn, report.outcome),
                None => println!("turn {}: {}", report.turn, report.outcome),
            }
        }
        reports.push(report);
        if outcome != GotoOutcome::Continuing {
            break;
        }
        events.clear();
        world::apply(&mut scenario.world, WorldCommand::BeginTurn, &mut events);
    }

    if json {
        let text = serde_json::to_string_pretty(&reports).context("encoding the turn log")?;
        println!("{text}");
    }
    Ok(())
}

fn load(path: &Path) -> Result<Scenario> {
    Scenario::load(path).with_context(|| format!("loading scenario {}", path.display()))
}

fn unit_id(scenario: &Scenario, index: usize) -> Result<UnitId> {
    scenario.units.get(index).copied().with_context(|| {
        format!(
            "scenario declares {} unit(s), there is no unit #{index}",
            scenario.units.len()
        )
    })
}

fn warmap_tuning(overrides: &TuningOverrides) -> WarmapTuning {
    let defaults = WarmapTuning::default();
    WarmapTuning {
        max_cost: overrides.max_cost.unwrap_or(defaults.max_cost),
        queue_capacity_hint: overrides
            .queue_capacity_hint
            .unwrap_or(defaults.queue_capacity_hint),
    }
}

fn goto_tuning(overrides: &TuningOverrides) -> GotoTuning {
    let defaults = GotoTuning::default();
    GotoTuning {
        unknown_deterrent: overrides
            .unknown_deterrent
            .unwrap_or(defaults.unknown_deterrent),
        danger_move: overrides.danger_move.unwrap_or(defaults.danger_move),
        landing_penalty: overrides.landing_penalty.unwrap_or(defaults.landing_penalty),
        ..defaults
    }
}

/// Map rows with the route drawn as `*`.
fn overlay_route(world: &World, path: &[TilePos]) -> Vec<String> {
    query::render_rows(world)
        .into_iter()
        .zip(0u32..)
        .map(|(row, y)| {
            row.chars()
                .zip(0u32..)
                .map(|(glyph, x)| {
                    if path.contains(&TilePos::new(x, y)) {
                        '*'
                    } else {
                        glyph
                    }
                })
                .collect()
        })
        .collect()
}

fn parse_pos(value: &str) -> Result<TilePos, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {value:?}"))?;
    let x = x
        .trim()
        .parse()
        .map_err(|err| format!("bad column {x:?}: {err}"))?;
    let y = y
        .trim()
        .parse()
        .map_err(|err| format!("bad row {y:?}: {err}"))?;
    Ok(TilePos::new(x, y))
}
