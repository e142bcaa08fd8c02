//! 🎚️ Judgment variables
//!
//! Every input is a 1-10 judgment. Out-of-range values are clamped when a
//! [`Level`] is built, never rejected, so any `VariableSet` that exists is
//! already inside the scorer's domain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest admissible judgment value
pub const LEVEL_MIN: f64 = 1.0;
/// Highest admissible judgment value
pub const LEVEL_MAX: f64 = 10.0;
/// Value used for any variable the caller does not supply
pub const LEVEL_NEUTRAL: f64 = 5.0;

/// A judgment value clamped to [1, 10]
///
/// NaN is not a range violation and passes through unchanged so the scorer can
/// report it as a computation failure instead of silently substituting a value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Level(f64);

impl Level {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(LEVEL_MIN, LEVEL_MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(LEVEL_NEUTRAL)
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Level> for f64 {
    fn from(level: Level) -> Self {
        level.0
    }
}

/// Which term of the score a variable feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableGroup {
    Gate,
    Numerator,
    Denominator,
    Multiplier,
}

/// Every named judgment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Trust,
    Legality,
    Hygiene,
    Essence,
    Capability,
    Novelty,
    Connection,
    Proof,
    Cost,
    Risk,
    Threat,
    Pressure,
    TimeLag,
    Uncertainty,
    Scarcity,
    Network,
    Leverage,
}

impl Variable {
    pub const ALL: [Variable; 17] = [
        Variable::Trust,
        Variable::Legality,
        Variable::Hygiene,
        Variable::Essence,
        Variable::Capability,
        Variable::Novelty,
        Variable::Connection,
        Variable::Proof,
        Variable::Cost,
        Variable::Risk,
        Variable::Threat,
        Variable::Pressure,
        Variable::TimeLag,
        Variable::Uncertainty,
        Variable::Scarcity,
        Variable::Network,
        Variable::Leverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Trust => "trust",
            Variable::Legality => "legality",
            Variable::Hygiene => "hygiene",
            Variable::Essence => "essence",
            Variable::Capability => "capability",
            Variable::Novelty => "novelty",
            Variable::Connection => "connection",
            Variable::Proof => "proof",
            Variable::Cost => "cost",
            Variable::Risk => "risk",
            Variable::Threat => "threat",
            Variable::Pressure => "pressure",
            Variable::TimeLag => "time_lag",
            Variable::Uncertainty => "uncertainty",
            Variable::Scarcity => "scarcity",
            Variable::Network => "network",
            Variable::Leverage => "leverage",
        }
    }

    pub fn group(&self) -> VariableGroup {
        match self {
            Variable::Trust | Variable::Legality | Variable::Hygiene => VariableGroup::Gate,
            Variable::Essence
            | Variable::Capability
            | Variable::Novelty
            | Variable::Connection
            | Variable::Proof => VariableGroup::Numerator,
            Variable::Cost
            | Variable::Risk
            | Variable::Threat
            | Variable::Pressure
            | Variable::TimeLag
            | Variable::Uncertainty => VariableGroup::Denominator,
            Variable::Scarcity | Variable::Network | Variable::Leverage => VariableGroup::Multiplier,
        }
    }

    pub fn is_gate(&self) -> bool {
        self.group() == VariableGroup::Gate
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kill-switch inputs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gates {
    pub trust: Level,
    pub legality: Level,
    pub hygiene: Level,
}

/// Value-creating inputs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Numerator {
    pub essence: Level,
    pub capability: Level,
    pub novelty: Level,
    pub connection: Level,
    pub proof: Level,
}

/// Friction inputs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Denominator {
    pub cost: Level,
    pub risk: Level,
    pub threat: Level,
    pub pressure: Level,
    pub time_lag: Level,
    pub uncertainty: Level,
}

/// Amplifying inputs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Multipliers {
    pub scarcity: Level,
    pub network: Level,
    pub leverage: Level,
}

/// Full clamped input to the scorer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableSet {
    pub gates: Gates,
    pub numerator: Numerator,
    pub denominator: Denominator,
    pub multipliers: Multipliers,
}

impl VariableSet {
    /// All variables at the neutral value
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Five core judgments with everything else neutral
    pub fn from_core(essence: f64, novelty: f64, proof: f64, risk: f64, network: f64) -> Self {
        Self::neutral()
            .with(Variable::Essence, essence)
            .with(Variable::Novelty, novelty)
            .with(Variable::Proof, proof)
            .with(Variable::Risk, risk)
            .with(Variable::Network, network)
    }

    pub fn get(&self, var: Variable) -> f64 {
        self.level(var).value()
    }

    fn level(&self, var: Variable) -> Level {
        match var {
            Variable::Trust => self.gates.trust,
            Variable::Legality => self.gates.legality,
            Variable::Hygiene => self.gates.hygiene,
            Variable::Essence => self.numerator.essence,
            Variable::Capability => self.numerator.capability,
            Variable::Novelty => self.numerator.novelty,
            Variable::Connection => self.numerator.connection,
            Variable::Proof => self.numerator.proof,
            Variable::Cost => self.denominator.cost,
            Variable::Risk => self.denominator.risk,
            Variable::Threat => self.denominator.threat,
            Variable::Pressure => self.denominator.pressure,
            Variable::TimeLag => self.denominator.time_lag,
            Variable::Uncertainty => self.denominator.uncertainty,
            Variable::Scarcity => self.multipliers.scarcity,
            Variable::Network => self.multipliers.network,
            Variable::Leverage => self.multipliers.leverage,
        }
    }

    /// Set one variable (clamped)
    pub fn set(&mut self, var: Variable, value: f64) {
        let level = Level::new(value);
        let slot = match var {
            Variable::Trust => &mut self.gates.trust,
            Variable::Legality => &mut self.gates.legality,
            Variable::Hygiene => &mut self.gates.hygiene,
            Variable::Essence => &mut self.numerator.essence,
            Variable::Capability => &mut self.numerator.capability,
            Variable::Novelty => &mut self.numerator.novelty,
            Variable::Connection => &mut self.numerator.connection,
            Variable::Proof => &mut self.numerator.proof,
            Variable::Cost => &mut self.denominator.cost,
            Variable::Risk => &mut self.denominator.risk,
            Variable::Threat => &mut self.denominator.threat,
            Variable::Pressure => &mut self.denominator.pressure,
            Variable::TimeLag => &mut self.denominator.time_lag,
            Variable::Uncertainty => &mut self.denominator.uncertainty,
            Variable::Scarcity => &mut self.multipliers.scarcity,
            Variable::Network => &mut self.multipliers.network,
            Variable::Leverage => &mut self.multipliers.leverage,
        };
        *slot = level;
    }

    /// Builder-style `set`
    pub fn with(mut self, var: Variable, value: f64) -> Self {
        self.set(var, value);
        self
    }

    /// Set the three gates at once
    pub fn with_gates(self, trust: f64, legality: f64, hygiene: f64) -> Self {
        self.with(Variable::Trust, trust)
            .with(Variable::Legality, legality)
            .with(Variable::Hygiene, hygiene)
    }

    /// (variable, value) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        Variable::ALL.iter().map(move |&v| (v, self.get(v)))
    }

    pub fn is_finite(&self) -> bool {
        self.iter().all(|(_, v)| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_clamps() {
        assert_eq!(Level::new(15.0).value(), 10.0);
        assert_eq!(Level::new(-3.0).value(), 1.0);
        assert_eq!(Level::new(0.0).value(), 1.0);
        assert_eq!(Level::new(7.5).value(), 7.5);
        assert_eq!(Level::new(f64::INFINITY).value(), 10.0);
        assert!(Level::new(f64::NAN).value().is_nan());
    }

    #[test]
    fn test_neutral_defaults() {
        let vars = VariableSet::neutral();
        assert!(vars.iter().all(|(_, v)| v == LEVEL_NEUTRAL));
        assert_eq!(vars.iter().count(), 17);
    }

    #[test]
    fn test_set_and_get_every_variable() {
        for (i, var) in Variable::ALL.iter().enumerate() {
            let value = 1.0 + (i % 9) as f64;
            let vars = VariableSet::neutral().with(*var, value);
            assert_eq!(vars.get(*var), value, "{}", var);
        }
    }

    #[test]
    fn test_groups() {
        let count = |g| Variable::ALL.iter().filter(|v| v.group() == g).count();
        assert_eq!(count(VariableGroup::Gate), 3);
        assert_eq!(count(VariableGroup::Numerator), 5);
        assert_eq!(count(VariableGroup::Denominator), 6);
        assert_eq!(count(VariableGroup::Multiplier), 3);
        assert!(Variable::Trust.is_gate());
        assert!(!Variable::Essence.is_gate());
    }

    #[test]
    fn test_from_core() {
        let vars = VariableSet::from_core(8.0, 7.0, 6.0, 3.0, 8.0);
        assert_eq!(vars.get(Variable::Essence), 8.0);
        assert_eq!(vars.get(Variable::Risk), 3.0);
        assert_eq!(vars.get(Variable::Cost), LEVEL_NEUTRAL);
    }

    #[test]
    fn test_deserialize_clamps() {
        let json = r#"{"trust": 12.0, "legality": 0.5, "hygiene": 6.0}"#;
        let gates: Gates = serde_json::from_str(json).unwrap();
        assert_eq!(gates.trust.value(), 10.0);
        assert_eq!(gates.legality.value(), 1.0);
        assert_eq!(gates.hygiene.value(), 6.0);
    }

    #[test]
    fn test_variable_names_round_trip_serde() {
        let encoded = serde_json::to_string(&Variable::TimeLag).unwrap();
        assert_eq!(encoded, "\"time_lag\"");
        assert_eq!(Variable::TimeLag.as_str(), "time_lag");
    }
}
