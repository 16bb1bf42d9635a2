// Prints predictions for a few circuits.
//
// Usage: cargo run --bin demo [trials]

use std::time::Instant;

use anyhow::Context;
use race_engine::{sampling::fresh_seed, summarize};
use race_predictor::config::ServiceConfig;
use tracing_subscriber::EnvFilter;

const TRACKS: [&str; 3] = ["Monaco", "Great Britain", "Belgium"];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let trials: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse().with_context(|| format!("bad trial count {}", arg))?,
        None => 2000,
    };

    let cfg = ServiceConfig::from_env()?;
    let sim = cfg.load_simulator()?;

    println!("F1 Monte Carlo Race Predictor - {} season", sim.tables().season());
    println!("{}", "=".repeat(50));

    for track in TRACKS {
        let seed = fresh_seed();
        let started = Instant::now();
        let result = sim.run_simulation_parallel(track, trials, seed, cfg.workers)?;
        let elapsed = started.elapsed();

        println!();
        print!("{}", summarize(&result, sim.tables()));
        println!("(seed {}, {:.2}s)", seed, elapsed.as_secs_f64());
        println!("{}", "-".repeat(50));
    }
    Ok(())
}
