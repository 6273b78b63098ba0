//! egreedy — epsilon-greedy arm selection from the command line.
//!
//! State is read as a snapshot JSON document (file or stdin) and results are
//! written to stdout as JSON; logs go to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use egreedy_core::config::AppConfig;
use egreedy_core::error::BanditError;
use egreedy_core::types::{EGreedyOptions, Snapshot};
use egreedy_rl_engine::{EGreedy, SharedEGreedy, Simulation};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "egreedy")]
#[command(about = "Epsilon-greedy multi-armed bandit selector")]
#[command(version)]
struct Cli {
    /// RNG seed (overrides config)
    #[arg(long, global = true, env = "EGREEDY__BANDIT__SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh snapshot
    Init(BanditArgs),
    /// Pick the next arm for a stored snapshot
    Select(StateArgs),
    /// Record a reward and print the updated snapshot
    Reward {
        #[command(flatten)]
        state: StateArgs,
        /// Arm index the reward belongs to
        #[arg(long)]
        arm: usize,
        /// Observed reward
        #[arg(long, allow_negative_numbers = true)]
        reward: f64,
    },
    /// Run the one-winning-arm convergence simulation
    Simulate {
        #[command(flatten)]
        bandit: BanditArgs,
        /// Arm that pays 1.0; every other arm pays 0.0
        #[arg(long)]
        rewarded_arm: Option<usize>,
        /// Number of select/reward rounds (default: arms * 100)
        #[arg(long)]
        iterations: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct BanditArgs {
    /// Number of arms (overrides config)
    #[arg(long)]
    arms: Option<usize>,

    /// Exploration probability (overrides config)
    #[arg(long)]
    epsilon: Option<f64>,
}

#[derive(Args, Debug)]
struct StateArgs {
    /// Snapshot JSON file; stdin when omitted
    #[arg(long)]
    state: Option<PathBuf>,
}

#[derive(Serialize)]
struct SelectOutput {
    arm: usize,
}

fn read_snapshot(args: &StateArgs) -> anyhow::Result<Snapshot> {
    let snapshot = match &args.state {
        Some(path) => std::fs::File::open(path)
            .map_err(BanditError::from)
            .and_then(Snapshot::from_reader)
            .with_context(|| format!("reading snapshot from {}", path.display()))?,
        None => Snapshot::from_reader(std::io::stdin().lock())
            .context("reading snapshot from stdin")?,
    };
    Ok(snapshot)
}

fn restore(snapshot: Snapshot, seed: Option<u64>) -> anyhow::Result<SharedEGreedy> {
    let options = EGreedyOptions::from(snapshot);
    let bandit = match seed {
        Some(seed) => SharedEGreedy::with_seed(options, seed)?,
        None => SharedEGreedy::new(options)?,
    };
    Ok(bandit)
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let loaded = AppConfig::load();
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    if let Some(seed) = cli.seed {
        config.bandit.seed = Some(seed);
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    if let Err(e) = &loaded {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    if config.bandit.seed.is_none() {
        info!("no seed configured, using entropy");
    }

    match cli.command {
        Command::Init(bandit) => {
            let options = EGreedyOptions::new()
                .with_arms(bandit.arms.unwrap_or(config.bandit.arms))
                .with_epsilon(bandit.epsilon.unwrap_or(config.bandit.epsilon));
            let estimator = EGreedy::new(options)?;
            emit(&estimator.serialize())?;
        }
        Command::Select(state) => {
            let bandit = restore(read_snapshot(&state)?, config.bandit.seed)?;
            let arm = bandit.select().await;
            info!(arm, "arm selected");
            emit(&SelectOutput { arm })?;
        }
        Command::Reward { state, arm, reward } => {
            let bandit = restore(read_snapshot(&state)?, config.bandit.seed)?;
            let snapshot = bandit.reward(arm, reward).await?.serialize().await;
            info!(
                arm,
                count = snapshot.counts[arm],
                value = snapshot.values[arm],
                "reward recorded"
            );
            emit(&snapshot)?;
        }
        Command::Simulate {
            bandit,
            rewarded_arm,
            iterations,
        } => {
            let simulation = Simulation {
                arms: bandit.arms.unwrap_or(config.bandit.arms),
                epsilon: bandit.epsilon.unwrap_or(config.bandit.epsilon),
                rewarded_arm: rewarded_arm.unwrap_or(config.simulation.rewarded_arm),
                iterations: iterations.or(config.simulation.iterations),
                seed: config.bandit.seed,
            };
            let report = simulation.run()?;
            if !report.converged {
                warn!(
                    counts = ?report.snapshot.counts,
                    "rewarded arm did not dominate; try more iterations"
                );
            }
            emit(&report)?;
        }
    }

    Ok(())
}
