//! Truth values and the success distributions derived from them.
//!
//! A rule's truth value is a (strength, confidence) pair. Strength is the
//! estimated probability that applying the rule yields something useful;
//! confidence says how much evidence backs that estimate. The chainer turns
//! it into a Beta distribution to drive Thompson sampling.

use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

/// The evidence count that corresponds to confidence 0.5.
pub const DEFAULT_K: f64 = 800.0;

const MAX_CONFIDENCE: f64 = 0.9999;

/// A (strength, confidence) truth value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    /// Estimated probability of success, in `[0, 1]`.
    pub strength: f64,
    /// Weight of evidence behind the strength, in `[0, 1]`.
    pub confidence: f64,
}

impl Default for TruthValue {
    fn default() -> Self {
        Self {
            strength: 1.0,
            confidence: 0.0,
        }
    }
}

impl TruthValue {
    /// Creates a truth value, clamping both components to `[0, 1]`.
    pub fn new(strength: f64, confidence: f64) -> Self {
        Self {
            strength: clamp_unit(strength),
            confidence: clamp_unit(confidence),
        }
    }

    /// Creates a truth value from a strength and an evidence count.
    pub fn from_count(strength: f64, count: f64) -> Self {
        let count = count.max(0.0);
        Self::new(strength, count / (count + DEFAULT_K))
    }

    /// The evidence count equivalent to this confidence.
    pub fn count(&self) -> f64 {
        let c = self.confidence.min(MAX_CONFIDENCE);
        DEFAULT_K * c / (1.0 - c)
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// The Beta distribution over a rule's success probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaDistribution {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaDistribution {
    /// Derives the distribution from a truth value with a uniform prior.
    pub fn from_truth_value(tv: &TruthValue) -> Self {
        let count = tv.count();
        Self {
            alpha: 1.0 + tv.strength * count,
            beta: 1.0 + (1.0 - tv.strength) * count,
        }
    }

    /// The expected success probability.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Draws a success probability. Falls back to the mean if the
    /// parameters do not describe a valid distribution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match Beta::new(self.alpha, self.beta) {
            Ok(dist) => dist.sample(rng),
            Err(_) => self.mean(),
        }
    }
}

impl From<TruthValue> for BetaDistribution {
    fn from(tv: TruthValue) -> Self {
        Self::from_truth_value(&tv)
    }
}
