//! Thread-safe handle around a single estimator.
//!
//! The estimator itself is plain synchronous code; this wrapper serializes
//! access behind a mutex so rewards from concurrent tasks are never lost, and
//! exposes `async` methods for callers that expect deferred results.

use crate::bandits::{EGreedy, Selection};
use egreedy_core::error::BanditResult;
use egreedy_core::types::{EGreedyOptions, Snapshot};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedEGreedy {
    inner: Arc<Mutex<EGreedy<StdRng>>>,
}

impl SharedEGreedy {
    pub fn new(options: EGreedyOptions) -> BanditResult<Self> {
        Ok(Self::from(EGreedy::new(options)?))
    }

    pub fn with_seed(options: EGreedyOptions, seed: u64) -> BanditResult<Self> {
        Ok(Self::from(EGreedy::with_seed(options, seed)?))
    }

    pub async fn select(&self) -> usize {
        self.select_blocking()
    }

    pub async fn reward(&self, arm: usize, reward: f64) -> BanditResult<&Self> {
        self.reward_blocking(arm, reward)?;
        Ok(self)
    }

    pub async fn reward_value(&self, arm: &Value, reward: &Value) -> BanditResult<&Self> {
        self.inner.lock().reward_value(arm, reward)?;
        Ok(self)
    }

    pub async fn serialize(&self) -> Snapshot {
        self.serialize_blocking()
    }

    pub fn select_blocking(&self) -> usize {
        self.inner.lock().select()
    }

    pub fn select_detailed_blocking(&self) -> Selection {
        self.inner.lock().select_detailed()
    }

    pub fn reward_blocking(&self, arm: usize, reward: f64) -> BanditResult<()> {
        self.inner.lock().reward(arm, reward)?;
        Ok(())
    }

    pub fn serialize_blocking(&self) -> Snapshot {
        self.inner.lock().serialize()
    }
}

impl From<EGreedy<StdRng>> for SharedEGreedy {
    fn from(estimator: EGreedy<StdRng>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(estimator)),
        }
    }
}
