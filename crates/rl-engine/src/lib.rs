//! Epsilon-greedy bandit engine: the estimator, a thread-safe async handle,
//! a registry of concurrent experiments, and an offline convergence harness.

pub mod bandits;
pub mod engine;
pub mod shared;
pub mod simulation;

pub use bandits::{EGreedy, Selection};
pub use engine::{BanditEngine, ExperimentState};
pub use shared::SharedEGreedy;
pub use simulation::{Simulation, SimulationReport};
