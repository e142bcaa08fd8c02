//! Configuration management for the STPF decision engine
//!
//! Loads configuration from environment variables (via .env file) and provides
//! validated, type-safe access to every policy constant. Each component receives
//! its own sub-config explicitly; nothing here is global.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Complete configuration for the decision engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub patches: PatchConfig,
    pub simulation: SimulationConfig,
    pub kelly: KellyConfig,
    pub grade: GradeConfig,
    pub bayes: BayesConfig,
    pub logging: LoggingConfig,
}

/// Numerator term weights (sum to 1.0 by default)
#[derive(Debug, Clone, PartialEq)]
pub struct NumeratorWeights {
    pub essence: f64,
    pub capability: f64,
    pub novelty: f64,
    pub connection: f64,
    pub proof: f64,
}

impl Default for NumeratorWeights {
    fn default() -> Self {
        Self {
            essence: 0.30,
            capability: 0.15,
            novelty: 0.20,
            connection: 0.15,
            proof: 0.20,
        }
    }
}

/// Denominator term weights (sum to 1.0 by default)
#[derive(Debug, Clone, PartialEq)]
pub struct DenominatorWeights {
    pub cost: f64,
    pub risk: f64,
    pub threat: f64,
    pub pressure: f64,
    pub time_lag: f64,
    pub uncertainty: f64,
}

impl Default for DenominatorWeights {
    fn default() -> Self {
        Self {
            cost: 0.20,
            risk: 0.25,
            threat: 0.15,
            pressure: 0.10,
            time_lag: 0.10,
            uncertainty: 0.20,
        }
    }
}

/// Gate and core scorer policy
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Gate value strictly below this vetoes the decision
    pub kill_threshold: f64,
    /// Gate value below this (but passing) raises an informational warning
    pub warning_threshold: f64,
    /// Minimum score_1000 for a GO verdict
    pub go_threshold: u32,
    /// Minimum score_1000 for "consider"
    pub consider_threshold: u32,
    /// K in 1000 * raw / (raw + K)
    pub reference_constant: f64,
    /// Floor applied to the weighted denominator
    pub denominator_epsilon: f64,
    /// Multiplier factor = base + slope * value
    pub multiplier_base: f64,
    pub multiplier_slope: f64,
    pub numerator_weights: NumeratorWeights,
    pub denominator_weights: DenominatorWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            kill_threshold: 4.0,
            warning_threshold: 6.0,
            go_threshold: 700,
            consider_threshold: 400,
            reference_constant: 0.6,
            denominator_epsilon: 1e-6,
            multiplier_base: 0.5,
            multiplier_slope: 0.1,
            numerator_weights: NumeratorWeights::default(),
            denominator_weights: DenominatorWeights::default(),
        }
    }
}

/// Reality patch rule parameters
#[derive(Debug, Clone)]
pub struct PatchConfig {
    /// Stated confidence at or above this is treated as overconfidence
    pub overconfidence_level: f64,
    pub overconfidence_factor: f64,
    /// Capital at or above this counts as real commitment
    pub capital_commitment_threshold: f64,
    /// Additive raw-score bonus for committed capital
    pub capital_commitment_bonus: f64,
    /// Retention below this is a cliff
    pub retention_floor: f64,
    pub retention_penalty_factor: f64,
    /// Retention at or above this is sticky
    pub retention_ceiling: f64,
    pub retention_bonus_factor: f64,
    /// Upper bound on the external network multiplier
    pub network_multiplier_cap: f64,
    /// Exponent damping the network multiplier
    pub network_damping: f64,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            overconfidence_level: 9.0,
            overconfidence_factor: 0.85,
            capital_commitment_threshold: 10_000.0,
            capital_commitment_bonus: 0.10,
            retention_floor: 0.30,
            retention_penalty_factor: 0.80,
            retention_ceiling: 0.70,
            retention_bonus_factor: 1.10,
            network_multiplier_cap: 2.0,
            network_damping: 0.5,
        }
    }
}

/// Scenario and Monte Carlo defaults
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub default_variation: f64,
    pub default_trials: usize,
    pub max_trials: usize,
    pub default_noise_std: f64,
    /// Trials per chunk between cancellation checks
    pub cancel_check_interval: usize,
    /// Wall-clock budget for one Monte Carlo run (0 = unlimited)
    pub timeout_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_variation: 0.2,
            default_trials: 1000,
            max_trials: 1_000_000,
            default_noise_std: 1.0,
            cancel_check_interval: 256,
            timeout_ms: 0,
        }
    }
}

/// Kelly sizing policy
#[derive(Debug, Clone)]
pub struct KellyConfig {
    /// Fraction of full Kelly committed (0.5 = half Kelly)
    pub kelly_multiplier: f64,
    pub default_payoff_multiplier: f64,
    /// Logistic score → probability mapping
    pub probability_center: f64,
    pub probability_scale: f64,
    pub probability_floor: f64,
    pub probability_ceiling: f64,
    /// Score bands for the signal
    pub go_score: u32,
    pub moderate_score: u32,
    /// Minimum safe fraction for GO / MODERATE
    pub go_min_fraction: f64,
    pub moderate_min_fraction: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            kelly_multiplier: 0.5,
            default_payoff_multiplier: 2.0,
            probability_center: 500.0,
            probability_scale: 120.0,
            probability_floor: 0.05,
            probability_ceiling: 0.95,
            go_score: 700,
            moderate_score: 400,
            go_min_fraction: 0.10,
            moderate_min_fraction: 0.05,
        }
    }
}

/// Letter grade cut-offs (score_1000)
#[derive(Debug, Clone)]
pub struct GradeConfig {
    pub s_threshold: u32,
    pub a_threshold: u32,
    pub b_threshold: u32,
}

impl Default for GradeConfig {
    fn default() -> Self {
        Self {
            s_threshold: 850,
            a_threshold: 700,
            b_threshold: 400,
        }
    }
}

/// Bayesian pattern updater policy
#[derive(Debug, Clone)]
pub struct BayesConfig {
    /// Uninformative Beta(alpha, beta) prior
    pub prior_alpha: f64,
    pub prior_beta: f64,
    /// Credible level for the reported interval
    pub credible_level: f64,
    /// proof_strength / proof_scale = pseudo-count weight of one observation
    pub proof_scale: f64,
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self {
            prior_alpha: 1.0,
            prior_beta: 1.0,
            credible_level: 0.95,
            proof_scale: 10.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Reads a .env file in the working directory if present. Every variable is
    /// optional and falls back to the built-in default; unparsable values are errors.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        let d = EngineConfig::default();

        Ok(EngineConfig {
            scoring: ScoringConfig {
                kill_threshold: get_env("STPF_KILL_THRESHOLD", d.scoring.kill_threshold)?,
                warning_threshold: get_env("STPF_WARNING_THRESHOLD", d.scoring.warning_threshold)?,
                go_threshold: get_env("STPF_GO_THRESHOLD", d.scoring.go_threshold)?,
                consider_threshold: get_env("STPF_CONSIDER_THRESHOLD", d.scoring.consider_threshold)?,
                reference_constant: get_env("STPF_REFERENCE_CONSTANT", d.scoring.reference_constant)?,
                ..d.scoring
            },
            patches: PatchConfig {
                overconfidence_level: get_env("STPF_OVERCONFIDENCE_LEVEL", d.patches.overconfidence_level)?,
                capital_commitment_threshold: get_env(
                    "STPF_CAPITAL_COMMITMENT_THRESHOLD",
                    d.patches.capital_commitment_threshold,
                )?,
                network_multiplier_cap: get_env("STPF_NETWORK_MULTIPLIER_CAP", d.patches.network_multiplier_cap)?,
                ..d.patches
            },
            simulation: SimulationConfig {
                default_variation: get_env("STPF_TOT_VARIATION", d.simulation.default_variation)?,
                default_trials: get_env("STPF_MC_TRIALS", d.simulation.default_trials)?,
                max_trials: get_env("STPF_MC_MAX_TRIALS", d.simulation.max_trials)?,
                default_noise_std: get_env("STPF_MC_NOISE_STD", d.simulation.default_noise_std)?,
                cancel_check_interval: get_env("STPF_MC_CHECK_INTERVAL", d.simulation.cancel_check_interval)?,
                timeout_ms: get_env("STPF_MC_TIMEOUT_MS", d.simulation.timeout_ms)?,
            },
            kelly: KellyConfig {
                kelly_multiplier: get_env("STPF_KELLY_MULTIPLIER", d.kelly.kelly_multiplier)?,
                default_payoff_multiplier: get_env("STPF_KELLY_PAYOFF", d.kelly.default_payoff_multiplier)?,
                ..d.kelly
            },
            grade: GradeConfig {
                s_threshold: get_env("STPF_GRADE_S", d.grade.s_threshold)?,
                a_threshold: get_env("STPF_GRADE_A", d.grade.a_threshold)?,
                b_threshold: get_env("STPF_GRADE_B", d.grade.b_threshold)?,
            },
            bayes: BayesConfig {
                prior_alpha: get_env("STPF_PRIOR_ALPHA", d.bayes.prior_alpha)?,
                prior_beta: get_env("STPF_PRIOR_BETA", d.bayes.prior_beta)?,
                credible_level: get_env("STPF_CREDIBLE_LEVEL", d.bayes.credible_level)?,
                ..d.bayes
            },
            logging: LoggingConfig {
                log_level: env::var("STPF_LOG_LEVEL").unwrap_or(d.logging.log_level),
            },
        })
    }

    /// Validate configuration values are within acceptable ranges
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if !(1.0..=10.0).contains(&s.kill_threshold) {
            anyhow::bail!("STPF_KILL_THRESHOLD must be within [1, 10]");
        }
        if s.warning_threshold < s.kill_threshold {
            anyhow::bail!("STPF_WARNING_THRESHOLD cannot be below STPF_KILL_THRESHOLD");
        }
        if s.go_threshold >= 1000 {
            anyhow::bail!("STPF_GO_THRESHOLD must be < 1000");
        }
        if s.consider_threshold > s.go_threshold {
            anyhow::bail!("STPF_CONSIDER_THRESHOLD cannot exceed STPF_GO_THRESHOLD");
        }
        if !(s.reference_constant > 0.0 && s.reference_constant.is_finite()) {
            anyhow::bail!("STPF_REFERENCE_CONSTANT must be > 0");
        }
        if s.denominator_epsilon <= 0.0 {
            anyhow::bail!("denominator epsilon must be > 0");
        }
        if s.multiplier_base + s.multiplier_slope <= 0.0 {
            anyhow::bail!("multiplier factor must stay positive over [1, 10]");
        }

        let p = &self.patches;
        if p.overconfidence_factor <= 0.0 || p.retention_penalty_factor <= 0.0 || p.retention_bonus_factor <= 0.0 {
            anyhow::bail!("patch factors must be > 0");
        }
        if p.retention_floor > p.retention_ceiling {
            anyhow::bail!("retention floor cannot exceed retention ceiling");
        }
        if p.network_multiplier_cap < 1.0 {
            anyhow::bail!("STPF_NETWORK_MULTIPLIER_CAP must be >= 1");
        }

        let sim = &self.simulation;
        if !(0.0..=1.0).contains(&sim.default_variation) {
            anyhow::bail!("STPF_TOT_VARIATION must be within [0, 1]");
        }
        if sim.default_trials == 0 || sim.default_trials > sim.max_trials {
            anyhow::bail!("STPF_MC_TRIALS must be within [1, STPF_MC_MAX_TRIALS]");
        }
        if sim.default_noise_std < 0.0 {
            anyhow::bail!("STPF_MC_NOISE_STD must be >= 0");
        }
        if sim.cancel_check_interval == 0 {
            anyhow::bail!("STPF_MC_CHECK_INTERVAL must be > 0");
        }

        let k = &self.kelly;
        if !(k.kelly_multiplier > 0.0 && k.kelly_multiplier <= 1.0) {
            anyhow::bail!("STPF_KELLY_MULTIPLIER must be within (0, 1]");
        }
        if k.default_payoff_multiplier <= 0.0 {
            anyhow::bail!("STPF_KELLY_PAYOFF must be > 0");
        }
        if !(0.0 < k.probability_floor && k.probability_floor < k.probability_ceiling && k.probability_ceiling < 1.0) {
            anyhow::bail!("Kelly probability bounds must satisfy 0 < floor < ceiling < 1");
        }
        if k.probability_scale <= 0.0 {
            anyhow::bail!("Kelly probability scale must be > 0");
        }
        if k.moderate_score > k.go_score {
            anyhow::bail!("Kelly moderate score cannot exceed go score");
        }

        let g = &self.grade;
        if !(g.b_threshold < g.a_threshold && g.a_threshold < g.s_threshold && g.s_threshold < 1000) {
            anyhow::bail!("grade thresholds must satisfy B < A < S < 1000");
        }

        let b = &self.bayes;
        if b.prior_alpha <= 0.0 || b.prior_beta <= 0.0 {
            anyhow::bail!("STPF_PRIOR_ALPHA and STPF_PRIOR_BETA must be > 0");
        }
        if !(b.credible_level > 0.0 && b.credible_level < 1.0) {
            anyhow::bail!("STPF_CREDIBLE_LEVEL must be within (0, 1)");
        }
        if b.proof_scale <= 0.0 {
            anyhow::bail!("proof scale must be > 0");
        }

        Ok(())
    }
}

// Helper for environment variable parsing

fn get_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .ok()
            .with_context(|| format!("Invalid {} value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
