//! 💰 Kelly Sizing & Grades
//!
//! Converts a final score (optionally a Bayesian success probability) into an
//! effort recommendation and a letter grade.
//!
//! Kelly fraction: f* = (p·b − (1−p)) / b, b = payoff multiplier.
//! The reported raw fraction is f* floored at 0 (no edge → no bet), the safe
//! fraction is raw × kelly_multiplier (half Kelly by default), both in [0, 1].

use crate::config::{GradeConfig, KellyConfig};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Four-way sizing signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KellySignal {
    Go,
    Moderate,
    Caution,
    NoGo,
}

impl KellySignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            KellySignal::Go => "GO",
            KellySignal::Moderate => "MODERATE",
            KellySignal::Caution => "CAUTION",
            KellySignal::NoGo => "NO_GO",
        }
    }
}

/// Where the success probability came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilitySource {
    Supplied,
    DerivedFromScore,
    Vetoed,
}

/// Sizing recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyDecision {
    pub signal: KellySignal,
    /// 100 × safe_kelly_fraction
    pub recommended_effort_percent: f64,
    pub raw_kelly_fraction: f64,
    pub safe_kelly_fraction: f64,
    /// Expected return in time units: time × (p·b − (1−p))
    pub expected_value: f64,
    /// time_investment × safe fraction
    pub recommended_time: f64,
    pub p_success: f64,
    pub probability_source: ProbabilitySource,
    pub payoff_multiplier: f64,
    pub reason: String,
    pub action: String,
}

/// Ordered letter grade (S > A > B > C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    C,
    B,
    A,
    S,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

/// Human-facing grade summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeInfo {
    pub grade: Grade,
    pub label: String,
    pub description: String,
    pub action: String,
    pub kelly_hint: String,
}

/// Kelly sizing + letter grading
#[derive(Debug, Clone)]
pub struct KellyEngine {
    config: KellyConfig,
    grades: GradeConfig,
}

impl Default for KellyEngine {
    fn default() -> Self {
        Self::new(KellyConfig::default(), GradeConfig::default())
    }
}

impl KellyEngine {
    pub fn new(config: KellyConfig, grades: GradeConfig) -> Self {
        info!("💰 Kelly engine initialized:");
        info!("   Kelly multiplier: {:.2} | default payoff: {:.2}x", config.kelly_multiplier, config.default_payoff_multiplier);
        info!(
            "   Grades: S ≥ {}, A ≥ {}, B ≥ {}",
            grades.s_threshold, grades.a_threshold, grades.b_threshold
        );
        Self { config, grades }
    }

    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// Monotonic score → success probability (logistic, bounded to [floor, ceiling])
    pub fn estimate_success_probability(&self, score_1000: u32) -> f64 {
        let c = &self.config;
        let x = (score_1000 as f64 - c.probability_center) / c.probability_scale;
        let sigmoid = 1.0 / (1.0 + (-x).exp());
        c.probability_floor + sigmoid * (c.probability_ceiling - c.probability_floor)
    }

    /// Raw Kelly fraction f* = (p·b − q) / b, floored at 0
    pub fn kelly_fraction(p: f64, payoff: f64) -> f64 {
        let q = 1.0 - p;
        ((p * payoff - q) / payoff).clamp(0.0, 1.0)
    }

    /// Sizing decision for a score
    ///
    /// `p_success` outside [0, 1] is clamped; a non-finite or non-positive payoff
    /// falls back to the configured default.
    pub fn decide(
        &self,
        score_1000: u32,
        p_success: Option<f64>,
        time_investment: f64,
        payoff_multiplier: f64,
    ) -> KellyDecision {
        let score_1000 = score_1000.min(999);
        let (p, probability_source) = match p_success.filter(|p| p.is_finite()) {
            Some(p) => (p.clamp(0.0, 1.0), ProbabilitySource::Supplied),
            None => (self.estimate_success_probability(score_1000), ProbabilitySource::DerivedFromScore),
        };
        let b = if payoff_multiplier.is_finite() && payoff_multiplier > 0.0 {
            payoff_multiplier
        } else {
            self.config.default_payoff_multiplier
        };
        let time = if time_investment.is_finite() { time_investment.max(0.0) } else { 0.0 };

        let raw = Self::kelly_fraction(p, b);
        let safe = (raw * self.config.kelly_multiplier).clamp(0.0, raw);
        let edge = p * b - (1.0 - p);
        let expected_value = time * edge;

        let signal = self.signal(score_1000, raw, safe);
        let (reason, action) = self.explain(signal, score_1000, p, b, raw, safe);

        debug!(
            "💰 Kelly: score={} p={:.3} b={:.2} raw={:.3} safe={:.3} → {}",
            score_1000,
            p,
            b,
            raw,
            safe,
            signal.as_str()
        );

        KellyDecision {
            signal,
            recommended_effort_percent: (safe * 100.0).clamp(0.0, 100.0),
            raw_kelly_fraction: raw,
            safe_kelly_fraction: safe,
            expected_value,
            recommended_time: time * safe,
            p_success: p,
            probability_source,
            payoff_multiplier: b,
            reason,
            action,
        }
    }

    /// Zero-effort NO_GO for an opportunity the kill switch vetoed
    ///
    /// No probability, supplied or derived, can size a vetoed opportunity.
    pub fn vetoed(&self, time_investment: f64, payoff_multiplier: f64) -> KellyDecision {
        let b = if payoff_multiplier.is_finite() && payoff_multiplier > 0.0 {
            payoff_multiplier
        } else {
            self.config.default_payoff_multiplier
        };
        let time = if time_investment.is_finite() { time_investment.max(0.0) } else { 0.0 };

        debug!("💰 Kelly: vetoed by kill switch → NO_GO");

        KellyDecision {
            signal: KellySignal::NoGo,
            recommended_effort_percent: 0.0,
            raw_kelly_fraction: 0.0,
            safe_kelly_fraction: 0.0,
            expected_value: -time,
            recommended_time: 0.0,
            p_success: 0.0,
            probability_source: ProbabilitySource::Vetoed,
            payoff_multiplier: b,
            reason: "Kill switch fired; a failed gate cannot be offset by any edge".to_string(),
            action: "Do not invest; fix the failing gate before re-scoring".to_string(),
        }
    }

    fn signal(&self, score: u32, raw: f64, safe: f64) -> KellySignal {
        if raw <= 0.0 {
            KellySignal::NoGo
        } else if score >= self.config.go_score && safe >= self.config.go_min_fraction {
            KellySignal::Go
        } else if score >= self.config.moderate_score && safe >= self.config.moderate_min_fraction {
            KellySignal::Moderate
        } else {
            KellySignal::Caution
        }
    }

    fn explain(&self, signal: KellySignal, score: u32, p: f64, b: f64, raw: f64, safe: f64) -> (String, String) {
        let odds = format!("p={:.2} at {:.1}x payoff", p, b);
        match signal {
            KellySignal::Go => (
                format!("Score {} with {} gives a Kelly edge of {:.1}%", score, odds, raw * 100.0),
                format!("Commit {:.0}% of available effort now", safe * 100.0),
            ),
            KellySignal::Moderate => (
                format!("Score {} with {} supports a measured bet", score, odds),
                format!("Commit {:.0}% of effort and re-score after first results", safe * 100.0),
            ),
            KellySignal::Caution => (
                format!("Score {} with {} leaves a thin edge ({:.1}%)", score, odds, raw * 100.0),
                "Run a minimal test before committing real effort".to_string(),
            ),
            KellySignal::NoGo => (
                format!("Score {} with {} has no positive Kelly edge", score, odds),
                "Do not invest; rework the weakest inputs first".to_string(),
            ),
        }
    }

    /// Letter grade for a score
    pub fn grade(&self, score_1000: u32) -> GradeInfo {
        let g = &self.grades;
        if score_1000 >= g.s_threshold {
            GradeInfo {
                grade: Grade::S,
                label: "Exceptional".to_string(),
                description: "Rare, robust opportunity with strong value and low friction".to_string(),
                action: "Execute immediately at full planned scale".to_string(),
                kelly_hint: "Half Kelly or more is justified".to_string(),
            }
        } else if score_1000 >= g.a_threshold {
            GradeInfo {
                grade: Grade::A,
                label: "Strong".to_string(),
                description: "Clear GO with manageable friction".to_string(),
                action: "Execute and fix the top friction item in parallel".to_string(),
                kelly_hint: "Size near half Kelly".to_string(),
            }
        } else if score_1000 >= g.b_threshold {
            GradeInfo {
                grade: Grade::B,
                label: "Promising".to_string(),
                description: "Worth considering once the weakest inputs improve".to_string(),
                action: "Prototype cheaply and collect proof".to_string(),
                kelly_hint: "Size at a quarter Kelly or less".to_string(),
            }
        } else {
            GradeInfo {
                grade: Grade::C,
                label: "Weak".to_string(),
                description: "Value does not cover friction".to_string(),
                action: "Rework the concept before investing".to_string(),
                kelly_hint: "No allocation".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_score_is_go() {
        let engine = KellyEngine::default();
        let decision = engine.decide(850, None, 10.0, 2.0);

        assert_eq!(decision.signal, KellySignal::Go);
        assert_eq!(decision.probability_source, ProbabilitySource::DerivedFromScore);
        assert!(decision.p_success > 0.85);
        assert!(decision.safe_kelly_fraction <= decision.raw_kelly_fraction);
        assert!(decision.recommended_effort_percent > 30.0);
        assert!(decision.expected_value > 0.0);
    }

    #[test]
    fn test_low_score_is_no_go() {
        let engine = KellyEngine::default();
        let decision = engine.decide(200, None, 10.0, 2.0);

        assert!(matches!(decision.signal, KellySignal::Caution | KellySignal::NoGo));
        assert!(decision.recommended_effort_percent < 1.0);
        assert_eq!(decision.recommended_time, 0.0);
    }

    #[test]
    fn test_vetoed_is_never_sized() {
        let engine = KellyEngine::default();
        // The score-derived floor alone would leave an edge at a long payoff
        assert!(engine.decide(0, None, 10.0, 20.0).raw_kelly_fraction > 0.0);

        let decision = engine.vetoed(10.0, 20.0);
        assert_eq!(decision.signal, KellySignal::NoGo);
        assert_eq!(decision.probability_source, ProbabilitySource::Vetoed);
        assert_eq!(decision.recommended_effort_percent, 0.0);
        assert_eq!(decision.safe_kelly_fraction, 0.0);
        assert_eq!(decision.recommended_time, 0.0);
        assert_eq!(decision.payoff_multiplier, 20.0);
    }

    #[test]
    fn test_probability_mapping_monotonic() {
        let engine = KellyEngine::default();
        let mut last = 0.0;
        for score in (0..1000).step_by(25) {
            let p = engine.estimate_success_probability(score);
            assert!(p > last);
            assert!(p >= 0.05 && p <= 0.95);
            last = p;
        }
        assert!((engine.estimate_success_probability(500) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_kelly_formula() {
        // p = 0.6, b = 1 → f* = 0.2
        assert!((KellyEngine::kelly_fraction(0.6, 1.0) - 0.2).abs() < 1e-12);
        // p = 0.5, b = 2 → f* = 0.25
        assert!((KellyEngine::kelly_fraction(0.5, 2.0) - 0.25).abs() < 1e-12);
        // no edge
        assert_eq!(KellyEngine::kelly_fraction(0.3, 1.0), 0.0);
    }

    #[test]
    fn test_extreme_probabilities_stay_safe() {
        let engine = KellyEngine::default();
        for p in [0.0, 1e-9, 0.999_999, 1.0, 1.5, -0.2] {
            let d = engine.decide(500, Some(p), 5.0, 3.0);
            assert!(d.safe_kelly_fraction <= d.raw_kelly_fraction);
            assert!((0.0..=100.0).contains(&d.recommended_effort_percent));
            assert_eq!(d.probability_source, ProbabilitySource::Supplied);
        }
    }

    #[test]
    fn test_supplied_probability_overrides_score() {
        let engine = KellyEngine::default();
        let derived = engine.decide(600, None, 1.0, 2.0);
        let supplied = engine.decide(600, Some(0.9), 1.0, 2.0);
        assert!(supplied.raw_kelly_fraction > derived.raw_kelly_fraction);
        assert_eq!(supplied.p_success, 0.9);
    }

    #[test]
    fn test_invalid_payoff_falls_back() {
        let engine = KellyEngine::default();
        let d = engine.decide(800, None, 1.0, -1.0);
        assert_eq!(d.payoff_multiplier, 2.0);
    }

    #[test]
    fn test_moderate_band() {
        let engine = KellyEngine::default();
        // p at 600 ≈ 0.68 → f* ≈ 0.52 → safe ≈ 0.26
        let d = engine.decide(600, None, 1.0, 2.0);
        assert_eq!(d.signal, KellySignal::Moderate);
    }

    #[test]
    fn test_grades_ordered() {
        let engine = KellyEngine::default();
        assert_eq!(engine.grade(900).grade, Grade::S);
        assert_eq!(engine.grade(850).grade, Grade::S);
        assert_eq!(engine.grade(849).grade, Grade::A);
        assert_eq!(engine.grade(700).grade, Grade::A);
        assert_eq!(engine.grade(500).grade, Grade::B);
        assert_eq!(engine.grade(399).grade, Grade::C);
        assert!(Grade::S > Grade::A && Grade::A > Grade::B && Grade::B > Grade::C);

        let mut last = Grade::C;
        for score in 0..1000 {
            let g = engine.grade(score).grade;
            assert!(g >= last);
            last = g;
        }
    }
}
