//! Configuration for the forward chainer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::thompson::DEFAULT_TRIALS;

/// Defines how a forward chainer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainerConfig {
    /// The maximum number of steps. Negative means unbounded.
    pub maximum_iterations: i64,
    /// The maximum number of steps in flight at once (at least 1).
    pub jobs: usize,
    /// When every source is exhausted, reset the exhaustion flags and try
    /// again instead of stopping.
    pub retry_exhausted_sources: bool,
    /// How strongly source selection favors sources with a short, likely
    /// derivation. 0 gives uniform selection among live sources.
    pub complexity_penalty: f64,
    /// Apply specialized rule instances rather than the unaltered rules.
    pub rule_specialization: bool,
    /// The number of joint draws used to estimate Thompson-sampling weights.
    pub thompson_trials: usize,
    /// Seed for reproducible selection. `None` seeds from the thread RNG.
    pub random_seed: Option<u64>,
}

impl Default for ChainerConfig {
    fn default() -> Self {
        Self {
            maximum_iterations: 100,
            jobs: 1,
            retry_exhausted_sources: false,
            complexity_penalty: 0.0,
            rule_specialization: true,
            thompson_trials: DEFAULT_TRIALS,
            random_seed: None,
        }
    }
}

impl ChainerConfig {
    /// Creates the default configuration: 100 iterations, one job, no
    /// retry, rule specialization on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs until the pool is exhausted, with no iteration limit.
    pub fn exhaustive() -> Self {
        Self {
            maximum_iterations: -1,
            ..Default::default()
        }
    }

    /// Runs up to `jobs` steps concurrently.
    pub fn parallel(jobs: usize) -> Self {
        Self {
            jobs,
            ..Default::default()
        }
    }

    /// Sets the iteration limit.
    ///
    /// # Arguments
    ///
    /// * `maximum` - The maximum number of steps, negative for no limit.
    pub fn with_maximum_iterations(mut self, maximum: i64) -> Self {
        self.maximum_iterations = maximum;
        self
    }

    /// Sets the maximum number of steps in flight at once.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Enables or disables retrying exhausted sources.
    pub fn with_retry_exhausted_sources(mut self, retry: bool) -> Self {
        self.retry_exhausted_sources = retry;
        self
    }

    /// Sets the complexity penalty of source selection.
    pub fn with_complexity_penalty(mut self, penalty: f64) -> Self {
        self.complexity_penalty = penalty;
        self
    }

    /// Enables or disables applying specialized rule instances.
    pub fn with_rule_specialization(mut self, enabled: bool) -> Self {
        self.rule_specialization = enabled;
        self
    }

    /// Sets the number of Thompson-sampling draws per rule selection.
    pub fn with_thompson_trials(mut self, trials: usize) -> Self {
        self.thompson_trials = trials;
        self
    }

    /// Seeds source and rule selection for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Returns `true` if the iteration count is limited.
    pub fn is_bounded(&self) -> bool {
        self.maximum_iterations >= 0
    }

    /// The iteration limit for log output, `+inf` when unbounded.
    pub fn maximum_iterations_str(&self) -> String {
        if self.is_bounded() {
            self.maximum_iterations.to_string()
        } else {
            "+inf".to_string()
        }
    }

    /// Checks that every value is in range.
    ///
    /// Fails with [`Error::InvalidConfig`] if `jobs` or `thompson_trials`
    /// is 0, or the complexity penalty is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(Error::InvalidConfig("jobs must be at least 1".to_string()));
        }
        if !self.complexity_penalty.is_finite() || self.complexity_penalty < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "complexity_penalty must be a non-negative number, got {}",
                self.complexity_penalty
            )));
        }
        if self.thompson_trials == 0 {
            return Err(Error::InvalidConfig(
                "thompson_trials must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
