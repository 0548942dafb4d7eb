//! Thompson sampling over rule success distributions.
//!
//! Each rule is an arm whose success rate follows a Beta distribution. The
//! selection weight of an arm is the probability that it has the highest
//! success rate, estimated by repeated joint draws.

use crate::truth::{BetaDistribution, TruthValue};
use rand::Rng;

/// Default number of joint draws per estimate.
pub const DEFAULT_TRIALS: usize = 100;

/// Estimates, for each arm, the probability of being the best arm.
///
/// # Examples
///
/// ```
/// use aingle_chainer::{ThompsonSampling, TruthValue};
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// let weights = ThompsonSampling::new(&[TruthValue::new(0.9, 0.9), TruthValue::new(0.1, 0.9)])
///     .distribution(&mut rng);
///
/// assert_eq!(weights.len(), 2);
/// assert!(weights[0] > weights[1]);
/// ```
#[derive(Debug, Clone)]
pub struct ThompsonSampling {
    arms: Vec<BetaDistribution>,
    trials: usize,
}

impl ThompsonSampling {
    /// Creates one arm per truth value, with the default trial count.
    pub fn new(tvs: &[TruthValue]) -> Self {
        Self {
            arms: tvs.iter().map(BetaDistribution::from_truth_value).collect(),
            trials: DEFAULT_TRIALS,
        }
    }

    /// Sets the number of joint draws. Clamped to at least one.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials.max(1);
        self
    }

    /// The success distribution of each arm.
    pub fn arms(&self) -> &[BetaDistribution] {
        &self.arms
    }

    /// Returns one weight per arm. The weights sum to 1 unless there are
    /// no arms.
    pub fn distribution<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        match self.arms.len() {
            0 => return Vec::new(),
            1 => return vec![1.0],
            _ => {}
        }

        let mut wins = vec![0usize; self.arms.len()];
        for _ in 0..self.trials {
            let mut best = 0;
            let mut best_draw = f64::NEG_INFINITY;
            for (i, arm) in self.arms.iter().enumerate() {
                let draw = arm.sample(rng);
                if draw > best_draw {
                    best = i;
                    best_draw = draw;
                }
            }
            wins[best] += 1;
        }

        let trials = self.trials as f64;
        wins.into_iter().map(|w| w as f64 / trials).collect()
    }
}
