//! 🩹 Reality Patch Adjuster
//!
//! Deterministic post-hoc corrections keyed on context the base variables do not
//! carry. Patches run in this fixed order, each seeing the previous output:
//! 1. `overconfidence_discount` - stated confidence >= 9 → ×0.85
//! 2. `capital_commitment`      - capital >= 10k committed → +0.10 raw
//! 3. `retention_cliff`         - retention < 0.30 → ×0.80
//! 4. `retention_compounding`   - retention >= 0.70 → ×1.10
//! 5. `network_effect`          - external network multiplier m → ×sqrt(clamp(m, 0.5, 2.0))
//!
//! Only applied when the gates passed; a kill-switch NO_GO is never patched.

use crate::config::PatchConfig;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Ancillary signals outside the base variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchContext {
    /// Capital already committed (currency units)
    pub capital_committed: Option<f64>,
    /// Creator's stated confidence, 1-10
    pub confidence_level: Option<f64>,
    /// Expected retention, 0-1
    pub retention_estimate: Option<f64>,
    /// Externally measured network multiplier (1.0 = neutral)
    pub network_multiplier: Option<f64>,
}

/// Individual patch rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealityPatch {
    OverconfidenceDiscount,
    CapitalCommitment,
    RetentionCliff,
    RetentionCompounding,
    NetworkEffect,
}

impl RealityPatch {
    /// Application order
    pub const ORDER: [RealityPatch; 5] = [
        RealityPatch::OverconfidenceDiscount,
        RealityPatch::CapitalCommitment,
        RealityPatch::RetentionCliff,
        RealityPatch::RetentionCompounding,
        RealityPatch::NetworkEffect,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RealityPatch::OverconfidenceDiscount => "overconfidence_discount",
            RealityPatch::CapitalCommitment => "capital_commitment",
            RealityPatch::RetentionCliff => "retention_cliff",
            RealityPatch::RetentionCompounding => "retention_compounding",
            RealityPatch::NetworkEffect => "network_effect",
        }
    }

    /// Returns the adjusted score if this patch fires
    pub fn apply(&self, score: f64, ctx: &PatchContext, config: &PatchConfig) -> Option<f64> {
        match self {
            RealityPatch::OverconfidenceDiscount => {
                let level = finite(ctx.confidence_level)?;
                (level >= config.overconfidence_level).then(|| score * config.overconfidence_factor)
            }
            RealityPatch::CapitalCommitment => {
                let capital = finite(ctx.capital_committed)?;
                (capital >= config.capital_commitment_threshold).then(|| score + config.capital_commitment_bonus)
            }
            RealityPatch::RetentionCliff => {
                let retention = finite(ctx.retention_estimate)?.clamp(0.0, 1.0);
                (retention < config.retention_floor).then(|| score * config.retention_penalty_factor)
            }
            RealityPatch::RetentionCompounding => {
                let retention = finite(ctx.retention_estimate)?.clamp(0.0, 1.0);
                (retention >= config.retention_ceiling).then(|| score * config.retention_bonus_factor)
            }
            RealityPatch::NetworkEffect => {
                let multiplier = finite(ctx.network_multiplier)?.clamp(0.5, config.network_multiplier_cap);
                if (multiplier - 1.0).abs() < 1e-9 {
                    return None;
                }
                Some(score * multiplier.powf(config.network_damping))
            }
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// One fired patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchStep {
    pub patch: RealityPatch,
    pub before: f64,
    pub after: f64,
}

/// Outcome of running every patch over a raw score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchResult {
    pub original_score: f64,
    pub patched_score: f64,
    /// Identifiers of fired patches, in application order
    pub patches_applied: Vec<String>,
    pub steps: Vec<PatchStep>,
    /// patched_score - original_score
    pub total_adjustment: f64,
}

/// Applies reality patches in their fixed order
#[derive(Debug, Clone)]
pub struct RealityPatchAdjuster {
    config: PatchConfig,
}

impl Default for RealityPatchAdjuster {
    fn default() -> Self {
        Self::new(PatchConfig::default())
    }
}

impl RealityPatchAdjuster {
    pub fn new(config: PatchConfig) -> Self {
        info!("🩹 Reality patches initialized:");
        info!(
            "   Overconfidence ≥ {:.1} → ×{:.2}",
            config.overconfidence_level, config.overconfidence_factor
        );
        info!(
            "   Retention < {:.2} → ×{:.2}, ≥ {:.2} → ×{:.2}",
            config.retention_floor,
            config.retention_penalty_factor,
            config.retention_ceiling,
            config.retention_bonus_factor
        );
        info!("   Network multiplier cap: {:.2}", config.network_multiplier_cap);
        Self { config }
    }

    /// Run every patch over `raw_score`
    pub fn apply_patches(&self, raw_score: f64, ctx: &PatchContext) -> PatchResult {
        let mut score = raw_score;
        let mut steps = Vec::new();

        for patch in RealityPatch::ORDER {
            if let Some(next) = patch.apply(score, ctx, &self.config) {
                let next = next.max(0.0);
                steps.push(PatchStep { patch, before: score, after: next });
                score = next;
            }
        }

        let result = PatchResult {
            original_score: raw_score,
            patched_score: score,
            patches_applied: steps.iter().map(|s| s.patch.id().to_string()).collect(),
            steps,
            total_adjustment: score - raw_score,
        };

        debug!(
            "🩹 Patched {:.4} → {:.4} via [{}]",
            raw_score,
            score,
            result.patches_applied.join(", ")
        );
        result
    }
}
