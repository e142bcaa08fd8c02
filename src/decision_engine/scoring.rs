//! 📊 Gate & Core Viability Scorer
//!
//! Computes the bounded viability score:
//! - Gates (trust, legality, hygiene) act as a kill switch on the verdict
//! - Weighted numerator / weighted denominator (floored at epsilon)
//! - Times the product of the three multiplier factors
//! - Rescaled with 1000 * raw / (raw + K), so the score never reaches 1000
//!
//! A failed gate overrides the verdict only. The raw score is still computed so
//! callers can see what the opportunity would be worth once the gate is fixed.

use crate::config::ScoringConfig;
use crate::error::{EngineError, Result};
use crate::variables::{Variable, VariableGroup, VariableSet};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

/// Highest representable score_1000
pub const SCORE_CEILING: u32 = 999;

/// Go / no-go verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Go,
    NoGo,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Go => "GO",
            Verdict::NoGo => "NO_GO",
        }
    }
}

/// Gate that tripped the kill switch or sits in the warning band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateWarning {
    pub gate: Variable,
    pub value: f64,
    /// True when the gate is below the kill threshold
    pub killed: bool,
}

/// Intermediate terms of the raw score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTerms {
    pub numerator: f64,
    pub denominator: f64,
    pub multiplier: f64,
}

/// Result of one scoring call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Unbounded raw score (>= 0)
    pub raw_score: f64,
    /// Saturating rescale into [0, 999]
    pub score_1000: u32,
    pub gate_passed: bool,
    pub go_nogo: Verdict,
    /// Why the verdict came out this way
    pub why: String,
    /// Improvement actions, most important first
    pub how: Vec<String>,
    pub gate_warnings: Vec<GateWarning>,
    pub terms: ScoreTerms,
}

impl ScoreResult {
    /// Create a breakdown string for logging
    pub fn breakdown(&self) -> String {
        format!(
            "STPF={} {} (raw={:.3}, N={:.2}, D={:.2}, M={:.2}, gates={})",
            self.score_1000,
            self.go_nogo.as_str(),
            self.raw_score,
            self.terms.numerator,
            self.terms.denominator,
            self.terms.multiplier,
            if self.gate_passed { "ok" } else { "KILLED" }
        )
    }

    pub fn is_go(&self) -> bool {
        self.go_nogo == Verdict::Go
    }
}

/// Gate + weighted multiplicative scorer
#[derive(Debug, Clone)]
pub struct ViabilityScorer {
    config: ScoringConfig,
}

impl Default for ViabilityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl ViabilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        info!("📊 Viability scorer initialized:");
        info!("   Kill threshold: {:.1} (warning < {:.1})", config.kill_threshold, config.warning_threshold);
        info!("   GO bar: {} | consider bar: {}", config.go_threshold, config.consider_threshold);
        info!("   Rescale constant K: {:.3}", config.reference_constant);
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a variable set
    pub fn score(&self, vars: &VariableSet) -> Result<ScoreResult> {
        let terms = self.terms(vars);
        let raw_score = terms.numerator / terms.denominator * terms.multiplier;
        self.finalize_with_terms(vars, raw_score, terms)
    }

    /// Build a result for an externally adjusted raw score (e.g. after patches)
    pub fn finalize(&self, vars: &VariableSet, raw_score: f64) -> Result<ScoreResult> {
        self.finalize_with_terms(vars, raw_score, self.terms(vars))
    }

    /// Saturating rescale: 1000 * raw / (raw + K), floored, capped at 999
    pub fn rescale(&self, raw_score: f64) -> u32 {
        if raw_score <= 0.0 {
            return 0;
        }
        let scaled = 1000.0 * raw_score / (raw_score + self.config.reference_constant);
        (scaled.floor() as u32).min(SCORE_CEILING)
    }

    /// Gate check against the kill threshold and warning band
    pub fn evaluate_gates(&self, vars: &VariableSet) -> (bool, Vec<GateWarning>) {
        let mut passed = true;
        let mut warnings = Vec::new();

        for gate in Variable::ALL.iter().filter(|v| v.is_gate()) {
            let value = vars.get(*gate);
            if value < self.config.kill_threshold {
                passed = false;
                warnings.push(GateWarning { gate: *gate, value, killed: true });
            } else if value < self.config.warning_threshold {
                warnings.push(GateWarning { gate: *gate, value, killed: false });
            }
        }

        (passed, warnings)
    }

    fn terms(&self, vars: &VariableSet) -> ScoreTerms {
        let nw = &self.config.numerator_weights;
        let dw = &self.config.denominator_weights;
        let n = &vars.numerator;
        let d = &vars.denominator;
        let m = &vars.multipliers;

        let numerator = n.essence.value() * nw.essence
            + n.capability.value() * nw.capability
            + n.novelty.value() * nw.novelty
            + n.connection.value() * nw.connection
            + n.proof.value() * nw.proof;

        let denominator = (d.cost.value() * dw.cost
            + d.risk.value() * dw.risk
            + d.threat.value() * dw.threat
            + d.pressure.value() * dw.pressure
            + d.time_lag.value() * dw.time_lag
            + d.uncertainty.value() * dw.uncertainty)
            .max(self.config.denominator_epsilon);

        let multiplier = self.multiplier_factor(m.scarcity.value())
            * self.multiplier_factor(m.network.value())
            * self.multiplier_factor(m.leverage.value());

        ScoreTerms { numerator, denominator, multiplier }
    }

    fn multiplier_factor(&self, value: f64) -> f64 {
        self.config.multiplier_base + self.config.multiplier_slope * value
    }

    fn finalize_with_terms(&self, vars: &VariableSet, raw_score: f64, terms: ScoreTerms) -> Result<ScoreResult> {
        if !vars.is_finite() || !raw_score.is_finite() || raw_score < 0.0 {
            error!(
                "❌ Invalid raw score {} (N={}, D={}, M={}) for inputs {:?}",
                raw_score, terms.numerator, terms.denominator, terms.multiplier, vars
            );
            return Err(EngineError::Computation { context: "raw_score" });
        }

        let (gate_passed, gate_warnings) = self.evaluate_gates(vars);
        let score_1000 = self.rescale(raw_score);
        let go_nogo = if gate_passed && score_1000 >= self.config.go_threshold {
            Verdict::Go
        } else {
            Verdict::NoGo
        };

        let why = self.explain(score_1000, gate_passed, &gate_warnings, &terms);
        let how = self.improvements(vars, &gate_warnings);

        let result = ScoreResult {
            raw_score,
            score_1000,
            gate_passed,
            go_nogo,
            why,
            how,
            gate_warnings,
            terms,
        };
        debug!("📊 {}", result.breakdown());
        Ok(result)
    }

    fn explain(&self, score: u32, gate_passed: bool, warnings: &[GateWarning], terms: &ScoreTerms) -> String {
        if !gate_passed {
            let killed: Vec<String> = warnings
                .iter()
                .filter(|w| w.killed)
                .map(|w| format!("{} gate at {:.1}", w.gate, w.value))
                .collect();
            return format!(
                "Kill switch: {} below {:.1}. Score {} is diagnostic only.",
                killed.join(", "),
                self.config.kill_threshold,
                score
            );
        }

        let drivers = format!(
            "value {:.2} against friction {:.2}, amplified x{:.2}",
            terms.numerator, terms.denominator, terms.multiplier
        );
        if score >= self.config.go_threshold {
            format!("Score {} clears the GO bar of {}: {}.", score, self.config.go_threshold, drivers)
        } else if score >= self.config.consider_threshold {
            format!(
                "Score {} is in the consider band [{}, {}): {}.",
                score, self.config.consider_threshold, self.config.go_threshold, drivers
            )
        } else {
            format!("Score {} is below the consider bar of {}: {}.", score, self.config.consider_threshold, drivers)
        }
    }

    /// Ordered improvement actions: killed gates, then biggest numerator upside,
    /// then heaviest friction, then weak multipliers
    fn improvements(&self, vars: &VariableSet, warnings: &[GateWarning]) -> Vec<String> {
        let mut how: Vec<String> = warnings
            .iter()
            .filter(|w| w.killed)
            .map(|w| format!("Raise {} above {:.1} (currently {:.1})", w.gate, self.config.kill_threshold, w.value))
            .collect();

        let mut upside: Vec<(Variable, f64)> = vars
            .iter()
            .filter(|(v, value)| v.group() == VariableGroup::Numerator && *value < 7.0)
            .map(|(v, value)| (v, self.numerator_weight(v) * (10.0 - value)))
            .collect();
        upside.sort_by(|a, b| b.1.total_cmp(&a.1));
        how.extend(
            upside
                .iter()
                .take(2)
                .map(|(v, _)| format!("Strengthen {} (currently {:.1})", v, vars.get(*v))),
        );

        let mut friction: Vec<(Variable, f64)> = vars
            .iter()
            .filter(|(v, value)| v.group() == VariableGroup::Denominator && *value > 4.0)
            .map(|(v, value)| (v, self.denominator_weight(v) * (value - 1.0)))
            .collect();
        friction.sort_by(|a, b| b.1.total_cmp(&a.1));
        how.extend(
            friction
                .iter()
                .take(2)
                .map(|(v, _)| format!("Reduce {} (currently {:.1})", v, vars.get(*v))),
        );

        if let Some((v, value)) = vars
            .iter()
            .filter(|(v, value)| v.group() == VariableGroup::Multiplier && *value < 6.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
        {
            how.push(format!("Amplify {} (currently {:.1})", v, value));
        }

        how
    }

    fn numerator_weight(&self, var: Variable) -> f64 {
        let w = &self.config.numerator_weights;
        match var {
            Variable::Essence => w.essence,
            Variable::Capability => w.capability,
            Variable::Novelty => w.novelty,
            Variable::Connection => w.connection,
            Variable::Proof => w.proof,
            _ => 0.0,
        }
    }

    fn denominator_weight(&self, var: Variable) -> f64 {
        let w = &self.config.denominator_weights;
        match var {
            Variable::Cost => w.cost,
            Variable::Risk => w.risk,
            Variable::Threat => w.threat,
            Variable::Pressure => w.pressure,
            Variable::TimeLag => w.time_lag,
            Variable::Uncertainty => w.uncertainty,
            _ => 0.0,
        }
    }
}
