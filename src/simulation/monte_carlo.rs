//! 🎲 Monte Carlo Simulator
//!
//! Perturbs every variable with independent Gaussian noise, clamps back into
//! [1, 10], scores each trial, and aggregates the score distribution.
//!
//! Trials run on rayon workers in fixed-size chunks. Each trial seeds its own
//! generator from (seed, trial index), and all statistics are computed over the
//! sorted scores, so the result does not depend on how chunks were scheduled.
//! Cancellation and the deadline are checked at every chunk boundary.

use crate::config::SimulationConfig;
use crate::decision_engine::ViabilityScorer;
use crate::error::{EngineError, Result};
use crate::variables::{Variable, VariableSet};
use log::{debug, info, warn};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Width of one histogram bucket in score_1000 points
pub const HISTOGRAM_BUCKET_WIDTH: u32 = 100;
const HISTOGRAM_BUCKETS: usize = 10;

/// Shareable cooperative cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Optional knobs for a run
#[derive(Debug, Clone, Default)]
pub struct MonteCarloOptions {
    /// Per-variable noise std, replacing the run-wide value
    pub noise_overrides: HashMap<Variable, f64>,
    /// Fixed seed for reproducible runs; random when absent
    pub seed: Option<u64>,
    pub cancel: Option<CancelToken>,
    /// Wall-clock budget; falls back to the configured timeout
    pub timeout: Option<Duration>,
}

/// Linear-interpolated percentiles of score_1000
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

/// One fixed-width histogram bucket, `[lower, upper)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub lower: u32,
    pub upper: u32,
    pub count: usize,
}

/// Aggregated outcome distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub n_simulations: usize,
    pub noise_std: f64,
    /// Seed the run used (replay with the same seed for identical output)
    pub seed: u64,
    /// score_1000 of the unperturbed inputs
    pub base_score: u32,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    pub percentiles: Percentiles,
    pub min: u32,
    pub max: u32,
    pub go_probability: f64,
    pub consider_probability: f64,
    pub nogo_probability: f64,
    /// Share of trials where a perturbed gate tripped the kill switch
    pub gate_failure_rate: f64,
    pub histogram: Vec<HistogramBucket>,
}

impl MonteCarloResult {
    /// Create a summary string for logging
    pub fn summary(&self) -> String {
        format!(
            "MC n={} mean={:.1} median={:.1} std={:.1} [{}..{}] go={:.1}% consider={:.1}% nogo={:.1}%",
            self.n_simulations,
            self.mean,
            self.median,
            self.std,
            self.min,
            self.max,
            self.go_probability * 100.0,
            self.consider_probability * 100.0,
            self.nogo_probability * 100.0
        )
    }
}

struct Trial {
    score: u32,
    gate_passed: bool,
}

/// Gaussian perturbation runner
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    scorer: ViabilityScorer,
    config: SimulationConfig,
}

impl MonteCarloSimulator {
    pub fn new(scorer: ViabilityScorer, config: SimulationConfig) -> Self {
        info!("🎲 Monte Carlo simulator initialized:");
        info!("   Default trials: {} (max {})", config.default_trials, config.max_trials);
        info!("   Default noise std: {:.2}", config.default_noise_std);
        info!("   Cancel check every {} trials", config.cancel_check_interval);
        Self { scorer, config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run `n` trials with a uniform noise std
    pub fn run_monte_carlo(&self, vars: &VariableSet, n: i64, noise_std: f64) -> Result<MonteCarloResult> {
        self.run_with_options(vars, n, noise_std, &MonteCarloOptions::default())
    }

    /// Run `n` trials with overrides, seed, cancellation and deadline
    pub fn run_with_options(
        &self,
        vars: &VariableSet,
        n: i64,
        noise_std: f64,
        options: &MonteCarloOptions,
    ) -> Result<MonteCarloResult> {
        let requested = self.validate_count(n)?;
        let noise = Self::noise_plan(noise_std, &options.noise_overrides)?;
        let base_score = self.scorer.score(vars)?.score_1000;
        let seed = options.seed.unwrap_or_else(rand::random);

        let timeout = options.timeout.or_else(|| {
            (self.config.timeout_ms > 0).then(|| Duration::from_millis(self.config.timeout_ms))
        });
        let deadline = timeout.map(|t| Instant::now() + t);
        let chunk_size = self.config.cancel_check_interval.max(1);

        debug!(
            "🎲 Starting {} trials (noise={:.2}, overrides={}, seed={})",
            requested,
            noise_std,
            options.noise_overrides.len(),
            seed
        );

        let chunks: Vec<Option<Vec<Trial>>> = (0..requested)
            .step_by(chunk_size)
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|start| {
                let interrupted = options.cancel.as_ref().map_or(false, |c| c.is_cancelled())
                    || deadline.map_or(false, |d| Instant::now() >= d);
                if interrupted {
                    return Ok(None);
                }
                let end = (start + chunk_size).min(requested);
                (start..end)
                    .map(|index| self.trial(vars, &noise, seed, index as u64))
                    .collect::<Result<Vec<_>>>()
                    .map(Some)
            })
            .collect::<Result<Vec<_>>>()?;

        let completed: usize = chunks.iter().flatten().map(Vec::len).sum();
        if completed < requested {
            warn!("⚠️  Monte Carlo interrupted after {}/{} trials", completed, requested);
            return Err(EngineError::SimulationCancelled { completed, requested });
        }

        let trials: Vec<Trial> = chunks.into_iter().flatten().flatten().collect();
        let result = Self::aggregate(&trials, noise_std, seed, base_score, &self.scorer)?;
        debug!("🎲 {}", result.summary());
        Ok(result)
    }

    fn validate_count(&self, n: i64) -> Result<usize> {
        if n <= 0 {
            return Err(EngineError::InvalidSimulationCount { n });
        }
        let n = n as usize;
        if n > self.config.max_trials {
            return Err(EngineError::InvalidField {
                field: "n",
                details: format!("{} exceeds the maximum of {} trials", n, self.config.max_trials),
            });
        }
        Ok(n)
    }

    /// Per-variable noise distribution, `None` where the std is zero
    fn noise_plan(noise_std: f64, overrides: &HashMap<Variable, f64>) -> Result<Vec<(Variable, Option<Normal>)>> {
        let check = |std: f64| -> Result<f64> {
            if std.is_finite() && std >= 0.0 {
                Ok(std)
            } else {
                Err(EngineError::InvalidNoise { noise_std: std })
            }
        };
        check(noise_std)?;

        Variable::ALL
            .iter()
            .map(|&var| {
                let std = check(overrides.get(&var).copied().unwrap_or(noise_std))?;
                if std == 0.0 {
                    return Ok((var, None));
                }
                let normal = Normal::new(0.0, std).map_err(|_| EngineError::InvalidNoise { noise_std: std })?;
                Ok((var, Some(normal)))
            })
            .collect()
    }

    fn trial(&self, vars: &VariableSet, noise: &[(Variable, Option<Normal>)], seed: u64, index: u64) -> Result<Trial> {
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, index));
        let mut perturbed = *vars;
        for (var, normal) in noise {
            if let Some(normal) = normal {
                perturbed.set(*var, vars.get(*var) + normal.sample(&mut rng));
            }
        }
        let result = self.scorer.score(&perturbed)?;
        Ok(Trial { score: result.score_1000, gate_passed: result.gate_passed })
    }

    fn aggregate(
        trials: &[Trial],
        noise_std: f64,
        seed: u64,
        base_score: u32,
        scorer: &ViabilityScorer,
    ) -> Result<MonteCarloResult> {
        let mut scores: Vec<u32> = trials.iter().map(|t| t.score).collect();
        scores.sort_unstable();
        let (Some(&min), Some(&max)) = (scores.first(), scores.last()) else {
            return Err(EngineError::Computation { context: "monte_carlo_aggregate" });
        };

        let n = scores.len() as f64;
        let mean = scores.iter().map(|&s| s as u64).sum::<u64>() as f64 / n;
        let variance = scores.iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / n;

        let go_bar = scorer.config().go_threshold;
        let consider_bar = scorer.config().consider_threshold;
        let go = scores.iter().filter(|&&s| s >= go_bar).count() as f64 / n;
        let consider = scores.iter().filter(|&&s| s >= consider_bar && s < go_bar).count() as f64 / n;
        let killed = trials.iter().filter(|t| !t.gate_passed).count() as f64 / n;

        let mut histogram: Vec<HistogramBucket> = (0..HISTOGRAM_BUCKETS as u32)
            .map(|i| HistogramBucket {
                lower: i * HISTOGRAM_BUCKET_WIDTH,
                upper: (i + 1) * HISTOGRAM_BUCKET_WIDTH,
                count: 0,
            })
            .collect();
        for &score in &scores {
            let bucket = ((score / HISTOGRAM_BUCKET_WIDTH) as usize).min(HISTOGRAM_BUCKETS - 1);
            histogram[bucket].count += 1;
        }

        Ok(MonteCarloResult {
            n_simulations: scores.len(),
            noise_std,
            seed,
            base_score,
            mean,
            median: percentile(&scores, 50.0),
            std: variance.sqrt(),
            percentiles: Percentiles {
                p10: percentile(&scores, 10.0),
                p25: percentile(&scores, 25.0),
                p75: percentile(&scores, 75.0),
                p90: percentile(&scores, 90.0),
            },
            min,
            max,
            go_probability: go,
            consider_probability: consider,
            nogo_probability: (1.0 - go - consider).max(0.0),
            gate_failure_rate: killed,
            histogram,
        })
    }
}

/// Linear interpolation between closest ranks over sorted data
pub fn percentile(sorted: &[u32], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0] as f64,
        len => {
            let rank = (pct / 100.0).clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * frac
        }
    }
}

/// splitmix64 over (seed, index) so neighbouring trials get unrelated streams
fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
