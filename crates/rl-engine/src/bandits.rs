//! Epsilon-greedy multi-armed bandit: explore a uniformly random arm with
//! probability epsilon, otherwise exploit the arm with the best running mean
//! reward.

use egreedy_core::error::{BanditError, BanditResult};
use egreedy_core::types::{EGreedyOptions, Snapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const INVALID_ARM: &str = "missing or invalid required parameter: arm";
const INVALID_REWARD: &str = "missing or invalid required parameter: reward";
const ARM_OUT_OF_BOUNDS: &str = "arm index out of bounds";
const ARM_COUNT_OVERFLOW: &str = "arm count overflow";

/// Largest accepted arm count, the length limit of a JavaScript array.
pub const MAX_ARMS: i64 = u32::MAX as i64;

/// Outcome of a single draw, including which branch produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub arm: usize,
    pub explored: bool,
}

/// Epsilon-greedy estimator over a fixed number of arms.
///
/// The random source is a type parameter so callers can inject a seeded
/// generator; [`EGreedy::new`] uses an entropy-seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct EGreedy<R = StdRng> {
    arms: usize,
    epsilon: f64,
    counts: Vec<u64>,
    values: Vec<f64>,
    rng: R,
}

impl EGreedy<StdRng> {
    pub fn new(options: EGreedyOptions) -> BanditResult<Self> {
        Self::with_rng(options, StdRng::from_entropy())
    }

    /// Reproducible selection: same seed and same state give the same picks.
    pub fn with_seed(options: EGreedyOptions, seed: u64) -> BanditResult<Self> {
        Self::with_rng(options, StdRng::seed_from_u64(seed))
    }

    pub fn from_snapshot(snapshot: Snapshot) -> BanditResult<Self> {
        Self::new(snapshot.into())
    }
}

impl<R: Rng> EGreedy<R> {
    /// Validate `options` and build the estimator. Restored `counts`/`values`
    /// are copied; the estimator never aliases caller data.
    pub fn with_rng(options: EGreedyOptions, rng: R) -> BanditResult<Self> {
        let arms = options.resolve_arms()?;
        let epsilon = options.resolve_epsilon()?;

        if arms < 1 {
            return Err(BanditError::config("invalid arms: cannot be less than 1"));
        } else if arms > MAX_ARMS {
            return Err(BanditError::config(format!(
                "invalid arms: cannot be greater than {MAX_ARMS}"
            )));
        } else if epsilon < 0.0 {
            return Err(BanditError::config("invalid epsilon: cannot be less than 0"));
        } else if epsilon > 1.0 {
            return Err(BanditError::config(
                "invalid epsilon: cannot be greater than 1",
            ));
        }

        let arms = usize::try_from(arms)
            .map_err(|_| BanditError::config("invalid arms: expected an integer"))?;

        let (counts, values) = match (&options.counts, &options.values) {
            (Some(counts), Some(values)) => {
                let counts = counts
                    .as_items()
                    .ok_or_else(|| BanditError::config("counts must be an array"))?;
                let values = values
                    .as_items()
                    .ok_or_else(|| BanditError::config("values must be an array"))?;

                if counts.len() != arms {
                    return Err(BanditError::config(
                        "arms and counts.length must be identical",
                    ));
                } else if values.len() != arms {
                    return Err(BanditError::config(
                        "arms and values.length must be identical",
                    ));
                }

                (counts.to_vec(), values.to_vec())
            }
            // A lone counts or values is ignored.
            _ => (vec![0; arms], vec![0.0; arms]),
        };

        Ok(Self {
            arms,
            epsilon,
            counts,
            values,
            rng,
        })
    }

    /// Pick the arm to try next.
    pub fn select(&mut self) -> usize {
        self.select_detailed().arm
    }

    /// Pick the arm to try next and report whether it came from exploration.
    ///
    /// Exploration is forced while no reward has been recorded. Exploitation
    /// returns the lowest index among tied best values.
    pub fn select_detailed(&mut self) -> Selection {
        let r: f64 = self.rng.gen();
        let cold = self.counts.iter().all(|&c| c == 0);

        let selection = if self.epsilon > r || cold {
            Selection {
                arm: self.rng.gen_range(0..self.arms),
                explored: true,
            }
        } else {
            Selection {
                arm: self.best_arm(),
                explored: false,
            }
        };

        tracing::debug!(
            arm = selection.arm,
            explored = selection.explored,
            "arm selected"
        );
        selection
    }

    /// Record `reward` for `arm`, updating its running mean in place.
    pub fn reward(&mut self, arm: usize, reward: f64) -> BanditResult<&mut Self> {
        if arm >= self.arms {
            return Err(BanditError::argument(ARM_OUT_OF_BOUNDS));
        } else if !reward.is_finite() {
            return Err(BanditError::argument(INVALID_REWARD));
        }

        let count = self.counts[arm]
            .checked_add(1)
            .ok_or_else(|| BanditError::argument(ARM_COUNT_OVERFLOW))?;
        let prior = self.values[arm];
        let n = count as f64;

        self.counts[arm] = count;
        self.values[arm] = ((n - 1.0) / n) * prior + (1.0 / n) * reward;

        tracing::debug!(arm, count, value = self.values[arm], "reward recorded");
        Ok(self)
    }

    /// Loosely-typed reward, for payloads where `arm` or `reward` may be
    /// missing (`null`), strings, or otherwise not numbers.
    pub fn reward_value(&mut self, arm: &Value, reward: &Value) -> BanditResult<&mut Self> {
        let index = match arm {
            Value::Number(n) => n.as_f64().ok_or_else(|| BanditError::argument(INVALID_ARM))?,
            _ => return Err(BanditError::argument(INVALID_ARM)),
        };
        if index < 0.0 || index >= self.arms as f64 {
            return Err(BanditError::argument(ARM_OUT_OF_BOUNDS));
        } else if index.fract() != 0.0 {
            return Err(BanditError::argument(INVALID_ARM));
        }

        let reward = match reward {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| BanditError::argument(INVALID_REWARD))?,
            _ => return Err(BanditError::argument(INVALID_REWARD)),
        };

        self.reward(index as usize, reward)
    }
}

impl<R> EGreedy<R> {
    /// Index of the highest running mean; the first one wins ties.
    pub fn best_arm(&self) -> usize {
        let mut best = 0;
        for (i, &value) in self.values.iter().enumerate().skip(1) {
            if value > self.values[best] {
                best = i;
            }
        }
        best
    }

    /// Independent copy of the current state.
    pub fn serialize(&self) -> Snapshot {
        Snapshot {
            arms: self.arms,
            epsilon: self.epsilon,
            counts: self.counts.clone(),
            values: self.values.clone(),
        }
    }

    pub fn arms(&self) -> usize {
        self.arms
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Saturates at `u64::MAX`.
    pub fn total_count(&self) -> u64 {
        self.counts.iter().fold(0u64, |total, &c| total.saturating_add(c))
    }
}
