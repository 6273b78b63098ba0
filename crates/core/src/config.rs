use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `EGREEDY__` (e.g. `EGREEDY__BANDIT__EPSILON=0.2`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bandit: BanditConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BanditConfig {
    #[serde(default = "default_arms")]
    pub arms: usize,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Fixed RNG seed; entropy-seeded when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Defaults to `arms * 100` when unset.
    #[serde(default)]
    pub iterations: Option<usize>,
    #[serde(default)]
    pub rewarded_arm: usize,
}

fn default_arms() -> usize {
    crate::types::DEFAULT_ARMS
}
fn default_epsilon() -> f64 {
    crate::types::DEFAULT_EPSILON
}
fn default_log_filter() -> String {
    "egreedy=info".to_string()
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            arms: default_arms(),
            epsilon: default_epsilon(),
            seed: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: None,
            rewarded_arm: 0,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bandit: BanditConfig::default(),
            simulation: SimulationConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::with_prefix("EGREEDY")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
