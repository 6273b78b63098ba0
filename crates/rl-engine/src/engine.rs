//! Registry of independent epsilon-greedy experiments keyed by id.

use crate::bandits::EGreedy;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use egreedy_core::error::{BanditError, BanditResult};
use egreedy_core::types::{EGreedyOptions, Snapshot};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentState {
    pub experiment_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

struct Experiment {
    estimator: EGreedy<StdRng>,
    registered_at: DateTime<Utc>,
}

pub struct BanditEngine {
    experiments: DashMap<Uuid, Experiment>,
    /// Seeds per-experiment generators when the engine itself is seeded.
    seeder: Option<Mutex<StdRng>>,
}

impl BanditEngine {
    pub fn new() -> Self {
        Self {
            experiments: DashMap::new(),
            seeder: None,
        }
    }

    /// Every experiment registered afterwards gets a generator derived from
    /// `seed`, so a replayed registration order replays the same picks.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            experiments: DashMap::new(),
            seeder: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn build(&self, options: EGreedyOptions) -> BanditResult<EGreedy<StdRng>> {
        match &self.seeder {
            Some(seeder) => {
                let seed = seeder.lock().gen::<u64>();
                EGreedy::with_seed(options, seed)
            }
            None => EGreedy::new(options),
        }
    }

    pub fn register(&self, options: EGreedyOptions) -> BanditResult<Uuid> {
        let id = Uuid::new_v4();
        self.insert(id, options)?;
        Ok(id)
    }

    /// Recreate an experiment from a stored snapshot under its original id,
    /// replacing any live experiment with that id.
    pub fn restore(&self, experiment_id: Uuid, snapshot: Snapshot) -> BanditResult<()> {
        self.insert(experiment_id, snapshot.into())
    }

    fn insert(&self, experiment_id: Uuid, options: EGreedyOptions) -> BanditResult<()> {
        let estimator = self.build(options)?;
        tracing::info!(
            experiment_id = %experiment_id,
            arms = estimator.arms(),
            epsilon = estimator.epsilon(),
            observations = estimator.total_count(),
            "experiment registered"
        );
        self.experiments.insert(
            experiment_id,
            Experiment {
                estimator,
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn select(&self, experiment_id: &Uuid) -> BanditResult<usize> {
        let mut experiment = self
            .experiments
            .get_mut(experiment_id)
            .ok_or(BanditError::ExperimentNotFound(*experiment_id))?;
        Ok(experiment.estimator.select())
    }

    pub fn reward(&self, experiment_id: &Uuid, arm: usize, reward: f64) -> BanditResult<()> {
        let mut experiment = self
            .experiments
            .get_mut(experiment_id)
            .ok_or(BanditError::ExperimentNotFound(*experiment_id))?;
        experiment.estimator.reward(arm, reward)?;
        Ok(())
    }

    pub fn snapshot(&self, experiment_id: &Uuid) -> BanditResult<ExperimentState> {
        let experiment = self
            .experiments
            .get(experiment_id)
            .ok_or(BanditError::ExperimentNotFound(*experiment_id))?;
        Ok(ExperimentState {
            experiment_id: *experiment_id,
            registered_at: experiment.registered_at,
            snapshot: experiment.estimator.serialize(),
        })
    }

    pub fn snapshot_all(&self) -> Vec<ExperimentState> {
        let mut states: Vec<ExperimentState> = self
            .experiments
            .iter()
            .map(|entry| ExperimentState {
                experiment_id: *entry.key(),
                registered_at: entry.registered_at,
                snapshot: entry.estimator.serialize(),
            })
            .collect();
        states.sort_by_key(|s| (s.registered_at, s.experiment_id));
        states
    }

    pub fn remove(&self, experiment_id: &Uuid) -> Option<Snapshot> {
        let (_, experiment) = self.experiments.remove(experiment_id)?;
        tracing::info!(experiment_id = %experiment_id, "experiment removed");
        Some(experiment.estimator.serialize())
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

impl Default for BanditEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(arms: usize) -> EGreedyOptions {
        EGreedyOptions::new().with_arms(arms).with_epsilon(0.2)
    }

    #[test]
    fn test_register_and_reward() {
        let engine = BanditEngine::with_seed(1);
        let id = engine.register(options(3)).unwrap();
        assert_eq!(engine.len(), 1);

        let arm = engine.select(&id).unwrap();
        assert!(arm < 3);
        engine.reward(&id, arm, 1.0).unwrap();

        let state = engine.snapshot(&id).unwrap();
        assert_eq!(state.experiment_id, id);
        assert_eq!(state.snapshot.counts[arm], 1);
        assert_eq!(state.snapshot.total_count(), 1);
    }

    #[test]
    fn test_experiments_are_independent() {
        let engine = BanditEngine::new();
        let a = engine.register(options(2)).unwrap();
        let b = engine.register(options(4)).unwrap();

        engine.reward(&a, 1, 0.5).unwrap();
        assert_eq!(engine.snapshot(&a).unwrap().snapshot.counts, vec![0, 1]);
        assert_eq!(engine.snapshot(&b).unwrap().snapshot.counts, vec![0, 0, 0, 0]);
        assert_eq!(engine.snapshot_all().len(), 2);
    }

    #[test]
    fn test_invalid_options_do_not_register() {
        let engine = BanditEngine::new();
        let err = engine.register(options(0)).unwrap_err();
        assert!(err.is_invalid_configuration());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_unknown_experiment() {
        let engine = BanditEngine::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            engine.select(&id),
            Err(BanditError::ExperimentNotFound(missing)) if missing == id
        ));
        assert!(matches!(
            engine.reward(&id, 0, 1.0),
            Err(BanditError::ExperimentNotFound(_))
        ));
        assert!(engine.snapshot(&id).is_err());
        assert!(engine.remove(&id).is_none());
    }

    #[test]
    fn test_reward_errors_pass_through() {
        let engine = BanditEngine::new();
        let id = engine.register(options(2)).unwrap();
        let err = engine.reward(&id, 2, 1.0).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(engine.snapshot(&id).unwrap().snapshot.total_count(), 0);
    }

    #[test]
    fn test_remove_then_restore() {
        let engine = BanditEngine::new();
        let id = engine.register(options(2)).unwrap();
        engine.reward(&id, 0, 0.25).unwrap();

        let snapshot = engine.remove(&id).unwrap();
        assert!(engine.is_empty());

        engine.restore(id, snapshot.clone()).unwrap();
        assert_eq!(engine.snapshot(&id).unwrap().snapshot, snapshot);
    }

    #[test]
    fn test_seeded_engines_replay() {
        let picks = |engine: &BanditEngine| {
            let id = engine.register(options(5)).unwrap();
            (0..40)
                .map(|_| {
                    let arm = engine.select(&id).unwrap();
                    engine.reward(&id, arm, if arm == 2 { 1.0 } else { 0.0 }).unwrap();
                    arm
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(&BanditEngine::with_seed(9)), picks(&BanditEngine::with_seed(9)));
    }
}
