use anyhow::{Result, anyhow};
use clap::Parser;
use predprey_core::{SimConfig, Simulation};
use tracing::info;

/// Headless driver for the predator/prey lattice simulation.
///
/// Stands in for the animation-timer collaborator: it configures an engine,
/// steps it a fixed number of times, and reports the aggregate counters.
#[derive(Parser, Debug)]
#[command(name = "predprey", version, about = "Run a headless predator/prey simulation")]
struct Cli {
    /// Number of time steps to execute.
    #[arg(long, default_value_t = 500)]
    steps: u64,

    /// Lattice rows.
    #[arg(long, default_value_t = 16)]
    rows: u32,

    /// Lattice columns.
    #[arg(long, default_value_t = 16)]
    cols: u32,

    /// Predators placed at reset.
    #[arg(long, default_value_t = 20)]
    predators: u32,

    /// Prey placed at reset.
    #[arg(long, default_value_t = 20)]
    prey: u32,

    /// RNG seed for a reproducible run; omit for an entropy seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Emit a progress event every this many steps.
    #[arg(long, default_value_t = 50)]
    sample_interval: u64,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = SimConfig {
        rows: cli.rows,
        cols: cli.cols,
        initial_predators: cli.predators,
        initial_prey: cli.prey,
        rng_seed: cli.seed,
        ..SimConfig::default()
    };

    let mut sim = Simulation::new(config).map_err(|errors| {
        let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow!("configuration rejected: {}", rendered.join("; "))
    })?;

    info!(
        rows = cli.rows,
        cols = cli.cols,
        predators = sim.predator_count(),
        prey = sim.prey_count(),
        total_food = sim.total_food(),
        "simulation initialized",
    );

    let interval = cli.sample_interval.max(1);
    for _ in 0..cli.steps {
        let summary = sim.step();
        if summary.tick.0 % interval == 0 {
            info!(
                tick = summary.tick.0,
                predators = summary.predators,
                prey = summary.prey,
                total_food = summary.total_food,
                "sampled step",
            );
        }
        if summary.predators == 0 && summary.prey == 0 {
            info!(tick = summary.tick.0, "population extinct, stopping early");
            break;
        }
    }

    let last = sim.summary();
    info!(
        tick = last.tick.0,
        predators = last.predators,
        prey = last.prey,
        predator_pct = sim.predator_percentage(),
        prey_pct = sim.prey_percentage(),
        food_pct = sim.food_percentage(),
        "run complete",
    );

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
