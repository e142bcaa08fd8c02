//! 📝 Decision Report Assembler
//!
//! Read-only aggregation of everything computed for one request into a single
//! decision document: the score, a variable table with anchor interpretations,
//! optional patch / Kelly / grade / scenario / Monte Carlo / pattern blocks,
//! a diagnosis of ranked contributions, and a near/mid/long action plan.
//! Nothing here recomputes a score.

use crate::decision_engine::{GateWarning, GradeInfo, KellyDecision, PatchResult, ScoreResult};
use crate::pattern_cache::PatternPosterior;
use crate::simulation::{MonteCarloResult, ToTResult};
use crate::variables::{Variable, VariableGroup, VariableSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use uuid::Uuid;

/// Midpoint of the 1-10 scale; contributions are measured from here
pub const CONTRIBUTION_PIVOT: f64 = 5.5;

/// Fixed diagnosis weight per variable (gates are reported as warnings instead)
pub fn diagnosis_weight(var: Variable) -> f64 {
    match var {
        Variable::Trust | Variable::Legality | Variable::Hygiene => 0.0,
        Variable::Essence => 0.30,
        Variable::Capability => 0.15,
        Variable::Novelty => 0.20,
        Variable::Connection => 0.15,
        Variable::Proof => 0.20,
        Variable::Cost => 0.20,
        Variable::Risk => 0.25,
        Variable::Threat => 0.15,
        Variable::Pressure => 0.10,
        Variable::TimeLag => 0.10,
        Variable::Uncertainty => 0.20,
        Variable::Scarcity | Variable::Network | Variable::Leverage => 0.10,
    }
}

/// Calibration anchor for a 1-10 judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// 1-3
    Weak,
    /// 4-6
    Moderate,
    /// 7-8
    Strong,
    /// 9-10
    Exceptional,
}

impl Anchor {
    pub fn of(value: f64) -> Self {
        if value < 4.0 {
            Anchor::Weak
        } else if value < 7.0 {
            Anchor::Moderate
        } else if value < 9.0 {
            Anchor::Strong
        } else {
            Anchor::Exceptional
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Weak => "weak",
            Anchor::Moderate => "moderate",
            Anchor::Strong => "strong",
            Anchor::Exceptional => "exceptional",
        }
    }
}

/// One line of the variable table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRow {
    pub variable: Variable,
    pub group: VariableGroup,
    pub value: f64,
    pub anchor: Anchor,
    pub interpretation: String,
}

impl VariableRow {
    fn new(variable: Variable, value: f64) -> Self {
        let anchor = Anchor::of(value);
        let interpretation = match (variable.group(), anchor) {
            (VariableGroup::Gate, Anchor::Weak) => "fails the gate".to_string(),
            (VariableGroup::Gate, _) => format!("{} gate", anchor.as_str()),
            (VariableGroup::Denominator, Anchor::Weak) => "light friction".to_string(),
            (VariableGroup::Denominator, Anchor::Moderate) => "noticeable friction".to_string(),
            (VariableGroup::Denominator, Anchor::Strong) => "heavy friction".to_string(),
            (VariableGroup::Denominator, Anchor::Exceptional) => "prohibitive friction".to_string(),
            (VariableGroup::Multiplier, _) => format!("{} amplifier", anchor.as_str()),
            (VariableGroup::Numerator, _) => format!("{} value driver", anchor.as_str()),
        };
        Self {
            group: variable.group(),
            variable,
            value,
            anchor,
            interpretation,
        }
    }
}

/// Signed contribution of one variable, positive helps the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub variable: Variable,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// Ranked explanation of the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Positive contributions, strongest first
    pub strengths: Vec<Contribution>,
    /// Negative contributions, most damaging first
    pub weaknesses: Vec<Contribution>,
    /// Worst friction variable, if any friction hurts the score
    pub critical_friction: Option<Contribution>,
    pub gate_warnings: Vec<GateWarning>,
}

/// Action items by horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    /// Next two weeks
    pub near_term: Vec<String>,
    /// One to three months
    pub mid_term: Vec<String>,
    /// Beyond three months
    pub long_term: Vec<String>,
}

/// Optional blocks attached to a report
#[derive(Debug, Clone, Default)]
pub struct ReportExtras {
    pub patches: Option<PatchResult>,
    pub kelly: Option<KellyDecision>,
    pub grade: Option<GradeInfo>,
    pub scenarios: Option<ToTResult>,
    pub monte_carlo: Option<MonteCarloResult>,
    pub pattern: Option<PatternPosterior>,
}

/// Complete decision document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub score: ScoreResult,
    pub variables: Vec<VariableRow>,
    pub patches: Option<PatchResult>,
    pub kelly: Option<KellyDecision>,
    pub grade: Option<GradeInfo>,
    pub scenarios: Option<ToTResult>,
    pub monte_carlo: Option<MonteCarloResult>,
    pub pattern: Option<PatternPosterior>,
    pub diagnosis: Diagnosis,
    pub action_plan: ActionPlan,
}

/// Assemble a report from already computed results
pub fn generate(result: &ScoreResult, vars: &VariableSet, extras: ReportExtras) -> Report {
    let diagnosis = diagnose(vars, &result.gate_warnings);
    let action_plan = plan_actions(&diagnosis);

    Report {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        score: result.clone(),
        variables: vars.iter().map(|(v, value)| VariableRow::new(v, value)).collect(),
        patches: extras.patches,
        kelly: extras.kelly,
        grade: extras.grade,
        scenarios: extras.scenarios,
        monte_carlo: extras.monte_carlo,
        pattern: extras.pattern,
        diagnosis,
        action_plan,
    }
}

/// Rank contributions with the fixed weight table
pub fn diagnose(vars: &VariableSet, gate_warnings: &[GateWarning]) -> Diagnosis {
    let contributions: Vec<Contribution> = vars
        .iter()
        .filter(|(v, _)| !v.is_gate())
        .map(|(variable, value)| {
            let weight = diagnosis_weight(variable);
            let sign = if variable.group() == VariableGroup::Denominator { -1.0 } else { 1.0 };
            Contribution {
                variable,
                value,
                weight,
                contribution: sign * weight * (value - CONTRIBUTION_PIVOT),
            }
        })
        .collect();

    let mut strengths: Vec<Contribution> = contributions.iter().filter(|c| c.contribution > 0.0).cloned().collect();
    strengths.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

    let mut weaknesses: Vec<Contribution> = contributions.iter().filter(|c| c.contribution < 0.0).cloned().collect();
    weaknesses.sort_by(|a, b| a.contribution.total_cmp(&b.contribution));

    let critical_friction = weaknesses
        .iter()
        .find(|c| c.variable.group() == VariableGroup::Denominator)
        .cloned();

    Diagnosis {
        strengths,
        weaknesses,
        critical_friction,
        gate_warnings: gate_warnings.to_vec(),
    }
}

/// Near: gates and critical friction. Mid: weakest value drivers.
/// Long: compound the top strength and amplifiers.
pub fn plan_actions(diagnosis: &Diagnosis) -> ActionPlan {
    let mut plan = ActionPlan::default();

    for warning in &diagnosis.gate_warnings {
        if warning.killed {
            plan.near_term.push(format!("Fix {} before anything else (at {:.1})", warning.gate, warning.value));
        } else {
            plan.near_term.push(format!("Shore up {} (at {:.1}, in the warning band)", warning.gate, warning.value));
        }
    }
    if let Some(friction) = &diagnosis.critical_friction {
        plan.near_term.push(format!("Cut {} from {:.1}", friction.variable, friction.value));
    }

    plan.mid_term.extend(
        diagnosis
            .weaknesses
            .iter()
            .filter(|c| c.variable.group() == VariableGroup::Numerator)
            .take(2)
            .map(|c| format!("Build up {} from {:.1}", c.variable, c.value)),
    );
    plan.mid_term.extend(
        diagnosis
            .weaknesses
            .iter()
            .filter(|c| c.variable.group() == VariableGroup::Denominator)
            .skip(1)
            .take(1)
            .map(|c| format!("Reduce {} from {:.1}", c.variable, c.value)),
    );

    if let Some(top) = diagnosis.strengths.first() {
        plan.long_term.push(format!("Double down on {} ({:.1})", top.variable, top.value));
    }
    plan.long_term.extend(
        diagnosis
            .weaknesses
            .iter()
            .filter(|c| c.variable.group() == VariableGroup::Multiplier)
            .take(1)
            .map(|c| format!("Grow {} to amplify the whole score", c.variable)),
    );

    if plan.near_term.is_empty() {
        plan.near_term.push("Execute the current plan; no blocking issues".to_string());
    }
    if plan.mid_term.is_empty() {
        plan.mid_term.push("Collect outcome data and re-score".to_string());
    }
    if plan.long_term.is_empty() {
        plan.long_term.push("Look for a scarcity, network or leverage angle".to_string());
    }
    plan
}

impl Report {
    /// Plain-text rendering
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // Writes into a String cannot fail
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "STPF DECISION REPORT {}", self.report_id)?;
        writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out)?;
        writeln!(out, "{}", self.score.breakdown())?;
        writeln!(out, "{}", self.score.why)?;

        if let Some(grade) = &self.grade {
            writeln!(out, "Grade {} ({}): {}", grade.grade.as_str(), grade.label, grade.action)?;
        }
        if let Some(kelly) = &self.kelly {
            writeln!(
                out,
                "Kelly {}: {:.1}% effort (raw {:.3}, safe {:.3}) - {}",
                kelly.signal.as_str(),
                kelly.recommended_effort_percent,
                kelly.raw_kelly_fraction,
                kelly.safe_kelly_fraction,
                kelly.action
            )?;
        }
        if let Some(patches) = &self.patches {
            writeln!(
                out,
                "Patches: {:.3} → {:.3} [{}]",
                patches.original_score,
                patches.patched_score,
                patches.patches_applied.join(", ")
            )?;
        }
        if let Some(tot) = &self.scenarios {
            writeln!(
                out,
                "Scenarios: worst {} / base {} / best {} (weighted {:.0}, {:?}) - {}",
                tot.worst.score_1000(),
                tot.base.score_1000(),
                tot.best.score_1000(),
                tot.weighted_score,
                tot.confidence_bucket,
                tot.recommendation
            )?;
        }
        if let Some(mc) = &self.monte_carlo {
            writeln!(out, "{}", mc.summary())?;
        }
        if let Some(pattern) = &self.pattern {
            writeln!(
                out,
                "Pattern {}: p={:.3} CI=[{:.3}, {:.3}] n={}",
                pattern.pattern_id,
                pattern.p_success,
                pattern.confidence_interval.0,
                pattern.confidence_interval.1,
                pattern.sample_count
            )?;
        }

        writeln!(out)?;
        writeln!(out, "VARIABLES")?;
        for row in &self.variables {
            writeln!(out, "  {:<12} {:>5.1}  {}", row.variable.as_str(), row.value, row.interpretation)?;
        }

        writeln!(out)?;
        writeln!(out, "DIAGNOSIS")?;
        for c in self.diagnosis.strengths.iter().take(3) {
            writeln!(out, "  + {:<12} {:+.2}", c.variable.as_str(), c.contribution)?;
        }
        for c in self.diagnosis.weaknesses.iter().take(3) {
            writeln!(out, "  - {:<12} {:+.2}", c.variable.as_str(), c.contribution)?;
        }
        if let Some(friction) = &self.diagnosis.critical_friction {
            writeln!(out, "  Critical friction: {} ({:.1})", friction.variable, friction.value)?;
        }

        writeln!(out)?;
        writeln!(out, "ACTION PLAN")?;
        for (title, items) in [
            ("Near term", &self.action_plan.near_term),
            ("Mid term", &self.action_plan.mid_term),
            ("Long term", &self.action_plan.long_term),
        ] {
            writeln!(out, "  {}:", title)?;
            for item in items {
                writeln!(out, "    - {}", item)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_engine::ViabilityScorer;

    fn strong_vars() -> VariableSet {
        VariableSet::from_core(8.0, 7.0, 6.0, 3.0, 8.0).with_gates(7.0, 8.0, 7.0)
    }

    #[test]
    fn test_anchor_bands() {
        assert_eq!(Anchor::of(1.0), Anchor::Weak);
        assert_eq!(Anchor::of(3.9), Anchor::Weak);
        assert_eq!(Anchor::of(4.0), Anchor::Moderate);
        assert_eq!(Anchor::of(6.5), Anchor::Moderate);
        assert_eq!(Anchor::of(7.0), Anchor::Strong);
        assert_eq!(Anchor::of(8.5), Anchor::Strong);
        assert_eq!(Anchor::of(9.0), Anchor::Exceptional);
        assert_eq!(Anchor::of(10.0), Anchor::Exceptional);
    }

    #[test]
    fn test_denominator_interpretation_reads_as_friction() {
        let row = VariableRow::new(Variable::Risk, 9.5);
        assert_eq!(row.interpretation, "prohibitive friction");
        let row = VariableRow::new(Variable::Essence, 9.5);
        assert_eq!(row.interpretation, "exceptional value driver");
    }

    #[test]
    fn test_diagnosis_ranks_and_flags_friction() {
        let vars = VariableSet::neutral()
            .with(Variable::Essence, 9.0)
            .with(Variable::Novelty, 8.0)
            .with(Variable::Risk, 9.0)
            .with(Variable::Cost, 7.0)
            .with(Variable::Proof, 2.0);
        let diagnosis = diagnose(&vars, &[]);

        assert_eq!(diagnosis.strengths[0].variable, Variable::Essence);
        assert!(diagnosis.strengths.iter().all(|c| c.contribution > 0.0));
        // risk: -0.25 × 3.5 = -0.875, proof: 0.2 × -3.5 = -0.70
        assert_eq!(diagnosis.weaknesses[0].variable, Variable::Risk);
        assert_eq!(diagnosis.weaknesses[1].variable, Variable::Proof);
        assert_eq!(diagnosis.critical_friction.as_ref().map(|c| c.variable), Some(Variable::Risk));
    }

    #[test]
    fn test_low_friction_has_no_critical_item() {
        let mut vars = VariableSet::neutral();
        for var in Variable::ALL.iter().filter(|v| v.group() == VariableGroup::Denominator) {
            vars.set(*var, 2.0);
        }
        assert!(diagnose(&vars, &[]).critical_friction.is_none());
    }

    #[test]
    fn test_action_plan_puts_killed_gate_first() {
        let scorer = ViabilityScorer::default();
        let vars = strong_vars().with(Variable::Trust, 2.0);
        let result = scorer.score(&vars).unwrap();
        let report = generate(&result, &vars, ReportExtras::default());

        assert!(report.action_plan.near_term[0].starts_with("Fix trust"));
        assert!(!report.action_plan.mid_term.is_empty());
        assert!(!report.action_plan.long_term.is_empty());
    }

    #[test]
    fn test_report_does_not_recompute() {
        let scorer = ViabilityScorer::default();
        let vars = strong_vars();
        let result = scorer.finalize(&vars, 0.6).unwrap();
        let report = generate(&result, &vars, ReportExtras::default());

        assert_eq!(report.score, result);
        assert_eq!(report.variables.len(), 17);
        assert!(report.kelly.is_none());
    }

    #[test]
    fn test_render_text_and_json() {
        let scorer = ViabilityScorer::default();
        let vars = strong_vars();
        let result = scorer.score(&vars).unwrap();
        let report = generate(&result, &vars, ReportExtras::default());

        let text = report.render_text();
        assert!(text.contains("STPF=757"));
        assert!(text.contains("ACTION PLAN"));
        assert!(text.contains(&report.report_id.to_string()));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["score"]["go_nogo"], "GO");
        assert!(json["report_id"].is_string());
    }

    #[test]
    fn test_report_ids_are_unique() {
        let scorer = ViabilityScorer::default();
        let vars = strong_vars();
        let result = scorer.score(&vars).unwrap();
        let a = generate(&result, &vars, ReportExtras::default());
        let b = generate(&result, &vars, ReportExtras::default());
        assert_ne!(a.report_id, b.report_id);
    }
}
