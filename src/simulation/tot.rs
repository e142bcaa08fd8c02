//! 🌳 Tree-of-Thought Scenario Simulator
//!
//! Three structured scenarios around the caller's inputs:
//! - Worst: numerator and multipliers pulled down, denominator pushed up
//! - Base:  inputs as given
//! - Best:  the mirror image of Worst
//!
//! Each variable moves by `variation × sensitivity`. Proof is sticky (moves half
//! as far as essence). Network is asymmetric: it rises 1.5× the variation on the
//! upside but only 0.4× on the downside.
//!
//! weighted = 0.3·worst + 0.4·base + 0.3·best

use crate::decision_engine::{ScoreResult, ViabilityScorer};
use crate::error::{EngineError, Result};
use crate::variables::{Variable, VariableGroup, VariableSet};
use log::debug;
use serde::{Deserialize, Serialize};

pub const WORST_WEIGHT: f64 = 0.3;
pub const BASE_WEIGHT: f64 = 0.4;
pub const BEST_WEIGHT: f64 = 0.3;

/// Score-range width below which confidence is HIGH
pub const HIGH_CONFIDENCE_WIDTH: u32 = 100;
/// Score-range width below which confidence is MEDIUM
pub const MEDIUM_CONFIDENCE_WIDTH: u32 = 250;

/// How far a variable moves per unit of variation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity {
    pub pessimistic: f64,
    pub optimistic: f64,
}

impl Sensitivity {
    const fn symmetric(s: f64) -> Self {
        Self { pessimistic: s, optimistic: s }
    }

    pub fn of(var: Variable) -> Self {
        match var {
            Variable::Trust | Variable::Legality | Variable::Hygiene => Self::symmetric(0.0),
            Variable::Essence => Self::symmetric(1.0),
            Variable::Capability => Self::symmetric(0.8),
            Variable::Novelty => Self::symmetric(0.9),
            Variable::Connection => Self::symmetric(0.7),
            Variable::Proof => Self::symmetric(0.5),
            Variable::Cost => Self::symmetric(0.8),
            Variable::Risk => Self::symmetric(1.0),
            Variable::Threat => Self::symmetric(0.9),
            Variable::Pressure => Self::symmetric(0.7),
            Variable::TimeLag => Self::symmetric(0.6),
            Variable::Uncertainty => Self::symmetric(1.0),
            Variable::Scarcity => Self::symmetric(0.6),
            Variable::Network => Self { pessimistic: 0.4, optimistic: 1.5 },
            Variable::Leverage => Self::symmetric(0.6),
        }
    }
}

/// Scenario tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Worst,
    Base,
    Best,
}

/// Confidence derived from the worst-best spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    pub fn from_width(width: u32) -> Self {
        if width < HIGH_CONFIDENCE_WIDTH {
            ConfidenceBucket::High
        } else if width < MEDIUM_CONFIDENCE_WIDTH {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }
}

/// Scenario-level verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioVerdict {
    Go,
    Consider,
    NoGo,
}

/// One scored scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub kind: ScenarioKind,
    pub variables: VariableSet,
    pub result: ScoreResult,
}

impl ScenarioResult {
    pub fn score_1000(&self) -> u32 {
        self.result.score_1000
    }
}

/// Outcome of the three-scenario analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToTResult {
    pub worst: ScenarioResult,
    pub base: ScenarioResult,
    pub best: ScenarioResult,
    pub variation: f64,
    pub weighted_score: f64,
    /// (worst.score_1000, best.score_1000)
    pub score_range: (u32, u32),
    pub confidence_bucket: ConfidenceBucket,
    pub verdict: ScenarioVerdict,
    pub recommendation: String,
}

/// Worst / base / best scenario runner
#[derive(Debug, Clone)]
pub struct ScenarioSimulator {
    scorer: ViabilityScorer,
}

impl ScenarioSimulator {
    pub fn new(scorer: ViabilityScorer) -> Self {
        Self { scorer }
    }

    /// Perturb one variable set in a direction
    pub fn perturb(vars: &VariableSet, variation: f64, kind: ScenarioKind) -> VariableSet {
        let mut out = *vars;
        if kind == ScenarioKind::Base {
            return out;
        }

        for (var, value) in vars.iter() {
            let s = Sensitivity::of(var);
            // +1 raises the value, -1 lowers it
            let (sensitivity, direction) = match (kind, var.group()) {
                (_, VariableGroup::Gate) => continue,
                (ScenarioKind::Worst, VariableGroup::Denominator) => (s.pessimistic, 1.0),
                (ScenarioKind::Worst, _) => (s.pessimistic, -1.0),
                (ScenarioKind::Best, VariableGroup::Denominator) => (s.optimistic, -1.0),
                (ScenarioKind::Best, _) => (s.optimistic, 1.0),
                (ScenarioKind::Base, _) => continue,
            };
            out.set(var, value * (1.0 + direction * variation * sensitivity));
        }
        out
    }

    /// Run the three scenarios
    pub fn run_tot(&self, vars: &VariableSet, variation: f64) -> Result<ToTResult> {
        if !variation.is_finite() || !(0.0..=1.0).contains(&variation) {
            return Err(EngineError::InvalidVariation { variation });
        }

        let scenario = |kind| -> Result<ScenarioResult> {
            let variables = Self::perturb(vars, variation, kind);
            let result = self.scorer.score(&variables)?;
            Ok(ScenarioResult { kind, variables, result })
        };
        let worst = scenario(ScenarioKind::Worst)?;
        let base = scenario(ScenarioKind::Base)?;
        let best = scenario(ScenarioKind::Best)?;

        let weighted_score = WORST_WEIGHT * worst.score_1000() as f64
            + BASE_WEIGHT * base.score_1000() as f64
            + BEST_WEIGHT * best.score_1000() as f64;
        let score_range = (worst.score_1000(), best.score_1000());
        let confidence_bucket = ConfidenceBucket::from_width(score_range.1.saturating_sub(score_range.0));
        let (verdict, recommendation) = self.recommend(&worst, &base, weighted_score);

        debug!(
            "🌳 ToT v={:.2}: worst={} base={} best={} weighted={:.1} {:?}",
            variation,
            worst.score_1000(),
            base.score_1000(),
            best.score_1000(),
            weighted_score,
            verdict
        );

        Ok(ToTResult {
            worst,
            base,
            best,
            variation,
            weighted_score,
            score_range,
            confidence_bucket,
            verdict,
            recommendation,
        })
    }

    fn recommend(&self, worst: &ScenarioResult, base: &ScenarioResult, weighted: f64) -> (ScenarioVerdict, String) {
        let go = self.scorer.config().go_threshold as f64;
        let consider = self.scorer.config().consider_threshold;
        let worst_score = worst.score_1000();

        if !base.result.gate_passed {
            return (
                ScenarioVerdict::NoGo,
                "NO-GO: a gate is below the kill threshold; no scenario can rescue it".to_string(),
            );
        }

        if weighted >= go && worst_score >= consider {
            (
                ScenarioVerdict::Go,
                format!(
                    "GO: robust opportunity, weighted {:.0} and still {} in the worst case",
                    weighted, worst_score
                ),
            )
        } else if weighted >= go {
            (
                ScenarioVerdict::Consider,
                format!(
                    "CONSIDER: strong on paper (weighted {:.0}) but fragile, worst case drops to {}",
                    weighted, worst_score
                ),
            )
        } else if weighted >= consider as f64 {
            (
                ScenarioVerdict::Consider,
                format!("CONSIDER: weighted {:.0}; strengthen the weakest inputs before committing", weighted),
            )
        } else {
            (
                ScenarioVerdict::NoGo,
                format!("NO-GO: weighted {:.0} is below the consider bar of {}", weighted, consider),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> ScenarioSimulator {
        ScenarioSimulator::new(ViabilityScorer::default())
    }

    fn strong_vars() -> VariableSet {
        VariableSet::from_core(8.0, 7.0, 6.0, 3.0, 8.0).with_gates(7.0, 8.0, 7.0)
    }

    #[test]
    fn test_scenarios_are_ordered() {
        let tot = simulator().run_tot(&strong_vars(), 0.2).unwrap();

        assert!(tot.worst.score_1000() <= tot.base.score_1000());
        assert!(tot.base.score_1000() <= tot.best.score_1000());
        assert!(tot.weighted_score >= tot.score_range.0 as f64);
        assert!(tot.weighted_score <= tot.score_range.1 as f64);
        assert_eq!(tot.base.variables, strong_vars());
    }

    #[test]
    fn test_zero_variation_collapses() {
        let tot = simulator().run_tot(&strong_vars(), 0.0).unwrap();
        assert_eq!(tot.worst.score_1000(), tot.best.score_1000());
        assert_eq!(tot.confidence_bucket, ConfidenceBucket::High);
        assert!((tot.weighted_score - tot.base.score_1000() as f64).abs() < 1e-9);
    }

    #[test]
    fn test_proof_is_stickier_than_essence() {
        let vars = VariableSet::neutral();
        let worst = ScenarioSimulator::perturb(&vars, 0.2, ScenarioKind::Worst);
        // essence 5 × 0.8 = 4.0, proof 5 × 0.9 = 4.5
        assert!((worst.get(Variable::Essence) - 4.0).abs() < 1e-9);
        assert!((worst.get(Variable::Proof) - 4.5).abs() < 1e-9);
        // risk 5 × 1.2 = 6.0
        assert!((worst.get(Variable::Risk) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_network_asymmetry() {
        let vars = VariableSet::neutral();
        let worst = ScenarioSimulator::perturb(&vars, 0.2, ScenarioKind::Worst);
        let best = ScenarioSimulator::perturb(&vars, 0.2, ScenarioKind::Best);

        let down = 5.0 - worst.get(Variable::Network);
        let up = best.get(Variable::Network) - 5.0;
        assert!(up > down * 3.0);
        assert!(up > best.get(Variable::Scarcity) - 5.0);
    }

    #[test]
    fn test_gates_not_perturbed_and_values_clamped() {
        let vars = VariableSet::neutral().with(Variable::Essence, 10.0).with(Variable::Risk, 10.0);
        let best = ScenarioSimulator::perturb(&vars, 0.5, ScenarioKind::Best);
        let worst = ScenarioSimulator::perturb(&vars, 0.5, ScenarioKind::Worst);

        assert_eq!(best.get(Variable::Essence), 10.0);
        assert_eq!(worst.get(Variable::Risk), 10.0);
        assert_eq!(best.gates, vars.gates);
        assert_eq!(worst.gates, vars.gates);
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(ConfidenceBucket::from_width(0), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_width(99), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_width(100), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_width(249), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_width(250), ConfidenceBucket::Low);
    }

    #[test]
    fn test_killed_gate_is_no_go() {
        let tot = simulator().run_tot(&strong_vars().with(Variable::Legality, 1.0), 0.2).unwrap();
        assert_eq!(tot.verdict, ScenarioVerdict::NoGo);
        assert!(tot.recommendation.starts_with("NO-GO"));
    }

    #[test]
    fn test_robust_opportunity_is_go() {
        let vars = VariableSet::from_core(9.0, 9.0, 9.0, 2.0, 9.0)
            .with(Variable::Cost, 2.0)
            .with(Variable::Uncertainty, 2.0)
            .with_gates(9.0, 9.0, 9.0);
        let tot = simulator().run_tot(&vars, 0.2).unwrap();
        assert_eq!(tot.verdict, ScenarioVerdict::Go);
        assert!(tot.recommendation.starts_with("GO"));
    }

    #[test]
    fn test_weak_opportunity_is_no_go() {
        let vars = VariableSet::from_core(2.0, 2.0, 2.0, 9.0, 2.0)
            .with(Variable::Cost, 9.0)
            .with(Variable::Uncertainty, 9.0);
        let tot = simulator().run_tot(&vars, 0.2).unwrap();
        assert_eq!(tot.verdict, ScenarioVerdict::NoGo);
    }

    #[test]
    fn test_invalid_variation_rejected() {
        let sim = simulator();
        assert!(sim.run_tot(&strong_vars(), -0.1).is_err());
        assert!(sim.run_tot(&strong_vars(), 1.5).is_err());
        assert!(sim.run_tot(&strong_vars(), f64::NAN).is_err());
    }
}
