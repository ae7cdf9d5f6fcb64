//! Instinct CLI.
//!
//! - `instinct simulate` - run the headless arena and report what the creatures did
//! - `instinct profile` - print the effective balance profile

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use instinct_runtime::{BalanceConfig, RuntimeConfig};
use instinct_sim::Simulation;

#[derive(Parser)]
#[command(name = "instinct")]
#[command(about = "Creature behavior tree simulator", version)]
struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the headless arena scenario
    Simulate {
        /// Number of ticks to run
        #[arg(long, default_value_t = 600)]
        ticks: u64,

        /// Seconds per tick
        #[arg(long, default_value_t = 0.1)]
        dt: f32,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective (clamped) balance profile as YAML
    Profile,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate {
            ticks,
            dt,
            seed,
            json,
        } => simulate(cli.config.as_deref(), ticks, dt, seed, json),
        Commands::Profile => show_profile(cli.config.as_deref()),
    }
}

fn simulate(
    config_path: Option<&Path>,
    ticks: u64,
    dt: f32,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {dt}");
    }
    let mut config = load_config(config_path)?;
    if let Some(seed) = seed {
        config.seed = seed;
    }

    tracing::info!(ticks, dt, seed = config.seed, "Starting simulation");
    let mut sim = Simulation::standard(&config);
    let report = sim.run(ticks, dt);

    if json {
        let value = serde_json::json!({
            "ticks": report.ticks,
            "root_failures": report.root_failures,
            "skipped": report.skipped,
            "kills": report.kills.iter().map(|target| target.0).collect::<Vec<_>>(),
            "actions": report.actions,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Instinct simulation");
    println!("===================");
    println!();
    println!("Ticks: {} ({:.1}s simulated)", report.ticks, report.ticks as f32 * dt);
    println!("Kills: {}", report.kills.len());
    println!("Root failures: {}", report.root_failures);
    println!("Skipped agent ticks: {}", report.skipped);
    println!();
    println!("Actions entered:");
    for (label, count) in &report.actions {
        println!("  {label:<24} {count}");
    }
    Ok(())
}

fn show_profile(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let balance = BalanceConfig::from(config.profile());
    print!("{}", serde_yaml::to_string(&balance)?);
    Ok(())
}

/// An explicit `--config` must exist; without one the defaults apply.
fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path),
        None => Ok(RuntimeConfig::default()),
    }
}
