//! Fleet demo: run a synthetic vehicle fleet through the aftersales workflow.
//!
//! Generates deterministic telemetry for a mix of healthy and degrading
//! vehicles, optionally trains the autoencoder on healthy windows first
//! (epochs = 0 runs the untrained random-weight model, which still exercises
//! every stage), then prints each terminal state as JSON.
//!
//! # Usage
//! ```bash
//! fleet-demo --vehicles 6 --epochs 10 --seed 42
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aftersense::batch::run_batch;
use aftersense::config::WorkflowConfig;
use aftersense::model::{train, LstmAutoencoder, ModelHandle};
use aftersense::pipeline::WorkflowExecutor;
use aftersense::synthetic::{initial_state, normal_training_pairs, Scenario};
use aftersense::types::WorkflowState;

#[derive(Parser, Debug)]
#[command(name = "fleet-demo")]
#[command(about = "Synthetic fleet run through the aftersales workflow")]
#[command(version = "1.0")]
struct Args {
    /// Number of vehicles in the fleet
    #[arg(short, long, default_value = "6", value_parser = clap::value_parser!(u32).range(1..=10_000))]
    vehicles: u32,

    /// Telemetry steps per vehicle window
    #[arg(long, default_value = "30")]
    steps: usize,

    /// Training epochs over healthy windows (0 = untrained model)
    #[arg(short, long, default_value = "0")]
    epochs: usize,

    /// Random seed for model init and synthetic telemetry
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Override the anomaly error threshold from config
    #[arg(long)]
    threshold: Option<f64>,

    /// Path to a workflow TOML config (defaults to the loading order)
    #[arg(long, env = "AFTERSENSE_CONFIG")]
    config: Option<String>,

    /// Emit the full audit log per vehicle
    #[arg(long)]
    logs: bool,
}

fn build_fleet(args: &Args) -> Vec<WorkflowState> {
    (0..args.vehicles as usize)
        .map(|i| {
            // Every third vehicle degrades, alternating battery and coolant
            let scenario = match i % 3 {
                2 if i % 2 == 0 => Scenario::BatteryDegradation,
                2 => Scenario::CoolantOverheat,
                _ => Scenario::Normal,
            };
            initial_state(i, scenario, args.seed, args.steps)
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WorkflowConfig::from_file(path)?,
        None => WorkflowConfig::load()?,
    };
    if let Some(threshold) = args.threshold {
        config.model.anomaly_threshold = threshold;
    }
    config.validate()?;

    let mut epochs_cfg = config.model.clone();
    epochs_cfg.epochs = args.epochs;

    let model = if args.epochs > 0 {
        info!(epochs = args.epochs, "training autoencoder on healthy windows");
        let pairs = normal_training_pairs(&epochs_cfg, 16, args.steps, args.seed ^ 0xA5A5);
        let artifacts = train(&pairs, &epochs_cfg, args.seed).context("autoencoder training")?;
        info!(
            first_loss = ?artifacts.losses.first(),
            final_loss = ?artifacts.losses.last(),
            "training complete"
        );
        artifacts.model
    } else {
        info!("running untrained random-weight model");
        LstmAutoencoder::new(&config.model, args.seed)
    };

    let executor = WorkflowExecutor::new(ModelHandle::new(model), config);
    let fleet = build_fleet(&args);
    info!(vehicles = fleet.len(), "invoking workflow per vehicle");

    for result in run_batch(&executor, fleet) {
        match result {
            Ok(mut state) => {
                if !args.logs {
                    state.logs.clear();
                }
                println!(
                    "{}",
                    serde_json::to_string_pretty(&state).context("serialize terminal state")?
                );
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    Ok(())
}
