//! 🎲 Bayesian Pattern Updater
//!
//! Beta-Bernoulli belief per content pattern:
//! - success adds `proof_strength / proof_scale` to alpha, failure to beta
//! - p_success = alpha / (alpha + beta)
//! - credible interval from the Beta quantiles, narrowing as evidence accumulates
//!
//! The updater holds no posterior state itself. Records are loaded from and
//! saved to a [`PosteriorStore`]; writers for one pattern id are serialized by a
//! per-key lock while readers may see the previous posterior during a write.

use crate::config::BayesConfig;
use crate::error::{EngineError, Result, StoreError};
use crate::pattern_cache::store::PosteriorStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, ContinuousCDF, Normal};
use std::sync::{Arc, Mutex};

/// Observed outcome for one piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// One observation for a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub outcome: Outcome,
    /// 1-10, how convincing the observation is
    pub proof_strength: f64,
    #[serde(default)]
    pub content_id: Option<String>,
}

/// Beta prior pseudo-counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPrior {
    pub alpha: f64,
    pub beta: f64,
}

/// Current belief about one pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternPosterior {
    pub pattern_id: String,
    pub p_success: f64,
    pub confidence_interval: (f64, f64),
    /// Number of observations folded in
    pub sample_count: u64,
    pub prior: BetaPrior,
    pub alpha: f64,
    pub beta: f64,
    pub last_content_id: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PatternPosterior {
    /// Uninformative default for a pattern with no evidence
    pub fn uninformative(pattern_id: &str, config: &BayesConfig) -> Self {
        let prior = BetaPrior { alpha: config.prior_alpha, beta: config.prior_beta };
        Self {
            pattern_id: pattern_id.to_string(),
            p_success: prior.alpha / (prior.alpha + prior.beta),
            confidence_interval: credible_interval(prior.alpha, prior.beta, config.credible_level),
            sample_count: 0,
            prior,
            alpha: prior.alpha,
            beta: prior.beta,
            last_content_id: None,
            last_updated: None,
        }
    }

    pub fn interval_width(&self) -> f64 {
        self.confidence_interval.1 - self.confidence_interval.0
    }

    /// Fold one weighted observation into a new posterior
    fn observe(&self, evidence: &Evidence, config: &BayesConfig, now: DateTime<Utc>) -> Self {
        let strength = if evidence.proof_strength.is_finite() {
            evidence.proof_strength.clamp(1.0, 10.0)
        } else {
            1.0
        };
        let weight = strength / config.proof_scale;

        let (alpha, beta) = match evidence.outcome {
            Outcome::Success => (self.alpha + weight, self.beta),
            Outcome::Failure => (self.alpha, self.beta + weight),
        };

        Self {
            pattern_id: self.pattern_id.clone(),
            p_success: alpha / (alpha + beta),
            confidence_interval: credible_interval(alpha, beta, config.credible_level),
            sample_count: self.sample_count + 1,
            prior: self.prior,
            alpha,
            beta,
            last_content_id: evidence.content_id.clone().or_else(|| self.last_content_id.clone()),
            last_updated: Some(now),
        }
    }

    fn check_integrity(&self) -> std::result::Result<(), StoreError> {
        let valid = self.alpha.is_finite()
            && self.beta.is_finite()
            && self.alpha > 0.0
            && self.beta > 0.0
            && (0.0..=1.0).contains(&self.p_success);
        if valid {
            Ok(())
        } else {
            Err(StoreError::Corrupt(format!(
                "alpha={} beta={} p={}",
                self.alpha, self.beta, self.p_success
            )))
        }
    }
}

/// Equal-tailed credible interval of Beta(alpha, beta)
///
/// Uses exact Beta quantiles; falls back to a clamped normal approximation if the
/// distribution cannot be built.
pub fn credible_interval(alpha: f64, beta: f64, level: f64) -> (f64, f64) {
    let tail = (1.0 - level) / 2.0;
    if let Ok(dist) = Beta::new(alpha, beta) {
        let lo = dist.inverse_cdf(tail).clamp(0.0, 1.0);
        let hi = dist.inverse_cdf(1.0 - tail).clamp(0.0, 1.0);
        if lo.is_finite() && hi.is_finite() && lo <= hi {
            return (lo, hi);
        }
    }

    let z = Normal::new(0.0, 1.0)
        .map(|n| n.inverse_cdf(1.0 - tail))
        .unwrap_or(1.959_964);
    let sum = alpha + beta;
    let mean = alpha / sum;
    let std = ((alpha * beta) / (sum * sum * (sum + 1.0))).sqrt();
    ((mean - z * std).max(0.0), (mean + z * std).min(1.0))
}

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorSource {
    /// Record found in the store
    Stored,
    /// Pattern never seen; uninformative prior
    Uninformative,
    /// Store unreachable; uninformative prior used instead
    StoreUnavailable,
}

/// Result of `get_prior`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorLookup {
    pub posterior: PatternPosterior,
    pub source: PriorSource,
}

/// Result of `update_posterior`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorUpdate {
    pub posterior: PatternPosterior,
    pub previous_p_success: f64,
    pub source: PriorSource,
    /// False when the store was unavailable on save
    pub persisted: bool,
}

/// Stateless Bayesian logic over an injected store
pub struct BayesianUpdater {
    store: Arc<dyn PosteriorStore>,
    config: BayesConfig,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BayesianUpdater {
    pub fn new(store: Arc<dyn PosteriorStore>, config: BayesConfig) -> Self {
        info!("🎲 Bayesian pattern updater initialized:");
        info!("   Prior: Beta({:.2}, {:.2})", config.prior_alpha, config.prior_beta);
        info!("   Credible level: {:.0}%", config.credible_level * 100.0);
        Self {
            store,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &BayesConfig {
        &self.config
    }

    /// Current belief for a pattern
    ///
    /// Missing records and an unavailable store both yield the uninformative prior;
    /// only a corrupt record is an error.
    pub fn get_prior(&self, pattern_id: &str) -> Result<PosteriorLookup> {
        match self.store.get_prior(pattern_id) {
            Ok(Some(posterior)) => {
                posterior.check_integrity().map_err(|source| {
                    error!("❌ Corrupt posterior for {}: {}", pattern_id, source);
                    EngineError::Store { pattern_id: pattern_id.to_string(), source }
                })?;
                Ok(PosteriorLookup { posterior, source: PriorSource::Stored })
            }
            Ok(None) => Ok(PosteriorLookup {
                posterior: PatternPosterior::uninformative(pattern_id, &self.config),
                source: PriorSource::Uninformative,
            }),
            Err(StoreError::Unavailable(reason)) => {
                warn!("⚠️  Posterior store unavailable for {}: {} (using uninformative prior)", pattern_id, reason);
                Ok(PosteriorLookup {
                    posterior: PatternPosterior::uninformative(pattern_id, &self.config),
                    source: PriorSource::StoreUnavailable,
                })
            }
            Err(source) => {
                error!("❌ Posterior store failure for {}: {}", pattern_id, source);
                Err(EngineError::Store { pattern_id: pattern_id.to_string(), source })
            }
        }
    }

    /// Fold one observation into the pattern's posterior and persist it
    ///
    /// An update built on the unavailable-store fallback is returned but never saved.
    pub fn update_posterior(&self, pattern_id: &str, evidence: &Evidence) -> Result<PosteriorUpdate> {
        let update = {
            let lock = self
                .locks
                .entry(pattern_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            let result = match lock.lock() {
                Ok(_guard) => self.update_locked(pattern_id, evidence),
                Err(_) => Err(EngineError::LockPoisoned { pattern_id: pattern_id.to_string() }),
            };
            drop(lock);
            result
        };

        // Only the map holds the lock once no writer is inside
        self.locks.remove_if(pattern_id, |_, lock| Arc::strong_count(lock) == 1);

        update
    }

    fn update_locked(&self, pattern_id: &str, evidence: &Evidence) -> Result<PosteriorUpdate> {
        let lookup = self.get_prior(pattern_id)?;
        let posterior = lookup.posterior.observe(evidence, &self.config, Utc::now());

        let persisted = if lookup.source == PriorSource::StoreUnavailable {
            warn!("⚠️  Skipping save for {}: prior was not read from the store", pattern_id);
            false
        } else {
            match self.store.save_posterior(pattern_id, &posterior) {
                Ok(()) => true,
                Err(StoreError::Unavailable(reason)) => {
                    warn!("⚠️  Could not persist posterior for {}: {}", pattern_id, reason);
                    false
                }
                Err(source) => {
                    error!("❌ Posterior save failed for {}: {}", pattern_id, source);
                    return Err(EngineError::Store { pattern_id: pattern_id.to_string(), source });
                }
            }
        };

        debug!(
            "🎲 {}: p {:.3} → {:.3} (n={}, CI=[{:.3}, {:.3}])",
            pattern_id,
            lookup.posterior.p_success,
            posterior.p_success,
            posterior.sample_count,
            posterior.confidence_interval.0,
            posterior.confidence_interval.1
        );

        Ok(PosteriorUpdate {
            previous_p_success: lookup.posterior.p_success,
            posterior,
            source: lookup.source,
            persisted,
        })
    }
}
