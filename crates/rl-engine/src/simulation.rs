//! Offline convergence check: run select/reward against a world where exactly
//! one arm pays 1.0 and every other arm pays 0.0.

use crate::bandits::EGreedy;
use egreedy_core::error::{BanditError, BanditResult};
use egreedy_core::types::{EGreedyOptions, Snapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub arms: usize,
    pub epsilon: f64,
    pub rewarded_arm: usize,
    /// Defaults to `arms * 100`.
    pub iterations: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub rewarded_arm: usize,
    pub best_arm: usize,
    pub iterations: usize,
    pub explorations: usize,
    /// The rewarded arm was pulled strictly more often than any other arm.
    pub converged: bool,
    pub snapshot: Snapshot,
}

impl Simulation {
    pub fn run(&self) -> BanditResult<SimulationReport> {
        let options = EGreedyOptions::new()
            .with_arms(self.arms)
            .with_epsilon(self.epsilon);
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut estimator = EGreedy::with_rng(options, rng)?;

        if self.rewarded_arm >= estimator.arms() {
            return Err(BanditError::config("rewarded arm out of bounds"));
        }

        let iterations = self.iterations.unwrap_or(self.arms * 100);
        let mut explorations = 0;
        for _ in 0..iterations {
            let selection = estimator.select_detailed();
            if selection.explored {
                explorations += 1;
            }
            let reward = if selection.arm == self.rewarded_arm { 1.0 } else { 0.0 };
            estimator.reward(selection.arm, reward)?;
        }

        let snapshot = estimator.serialize();
        let leader = snapshot.counts[self.rewarded_arm];
        let converged = snapshot
            .counts
            .iter()
            .enumerate()
            .all(|(arm, &count)| arm == self.rewarded_arm || count < leader);

        tracing::info!(
            arms = self.arms,
            epsilon = self.epsilon,
            iterations,
            explorations,
            converged,
            "simulation finished"
        );

        Ok(SimulationReport {
            rewarded_arm: self.rewarded_arm,
            best_arm: estimator.best_arm(),
            iterations,
            explorations,
            converged,
            snapshot,
        })
    }
}
