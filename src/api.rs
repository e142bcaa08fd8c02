//! 🔌 Engine facade and wire contract
//!
//! `Engine` wires every component from one `EngineConfig` and exposes the
//! upward operations. `Request` / `Response` are the JSON shapes a thin
//! transport layer speaks: requests are tagged by `"op"`, responses carry the
//! same `"op"` plus a `"result"` payload, or `"op": "error"` with a code.
//!
//! Wire inputs are validated here. A missing required field is rejected with
//! `STPF-1001`; present values are clamped into [1, 10] by `VariableSet`.

use crate::config::EngineConfig;
use crate::decision_engine::{
    GradeInfo, KellyDecision, KellyEngine, PatchContext, PatchResult, RealityPatchAdjuster, ScoreResult,
    ViabilityScorer,
};
use crate::error::{EngineError, Result};
use crate::pattern_cache::{
    BayesianUpdater, Evidence, MemoryPosteriorStore, Outcome, PosteriorLookup, PosteriorStore, PosteriorUpdate,
    PriorSource,
};
use crate::report::{self, Report, ReportExtras};
use crate::simulation::{MonteCarloOptions, MonteCarloResult, MonteCarloSimulator, ScenarioSimulator, ToTResult};
use crate::variables::{Variable, VariableSet, LEVEL_NEUTRAL};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Full variable payload; every field is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableInput {
    pub trust: Option<f64>,
    pub legality: Option<f64>,
    pub hygiene: Option<f64>,
    pub essence: Option<f64>,
    pub capability: Option<f64>,
    pub novelty: Option<f64>,
    pub connection: Option<f64>,
    pub proof: Option<f64>,
    pub cost: Option<f64>,
    pub risk: Option<f64>,
    pub threat: Option<f64>,
    pub pressure: Option<f64>,
    pub time_lag: Option<f64>,
    pub uncertainty: Option<f64>,
    pub scarcity: Option<f64>,
    pub network: Option<f64>,
    pub leverage: Option<f64>,
}

impl VariableInput {
    pub fn get(&self, var: Variable) -> Option<f64> {
        match var {
            Variable::Trust => self.trust,
            Variable::Legality => self.legality,
            Variable::Hygiene => self.hygiene,
            Variable::Essence => self.essence,
            Variable::Capability => self.capability,
            Variable::Novelty => self.novelty,
            Variable::Connection => self.connection,
            Variable::Proof => self.proof,
            Variable::Cost => self.cost,
            Variable::Risk => self.risk,
            Variable::Threat => self.threat,
            Variable::Pressure => self.pressure,
            Variable::TimeLag => self.time_lag,
            Variable::Uncertainty => self.uncertainty,
            Variable::Scarcity => self.scarcity,
            Variable::Network => self.network,
            Variable::Leverage => self.leverage,
        }
    }

    /// Validate presence and build the clamped variable set
    pub fn to_variables(&self) -> Result<VariableSet> {
        let mut vars = VariableSet::neutral();
        for var in Variable::ALL {
            vars.set(var, required(self.get(var), var.as_str())?);
        }
        Ok(vars)
    }
}

impl From<&VariableSet> for VariableInput {
    fn from(vars: &VariableSet) -> Self {
        let mut input = VariableInput::default();
        for (var, value) in vars.iter() {
            let slot = match var {
                Variable::Trust => &mut input.trust,
                Variable::Legality => &mut input.legality,
                Variable::Hygiene => &mut input.hygiene,
                Variable::Essence => &mut input.essence,
                Variable::Capability => &mut input.capability,
                Variable::Novelty => &mut input.novelty,
                Variable::Connection => &mut input.connection,
                Variable::Proof => &mut input.proof,
                Variable::Cost => &mut input.cost,
                Variable::Risk => &mut input.risk,
                Variable::Threat => &mut input.threat,
                Variable::Pressure => &mut input.pressure,
                Variable::TimeLag => &mut input.time_lag,
                Variable::Uncertainty => &mut input.uncertainty,
                Variable::Scarcity => &mut input.scarcity,
                Variable::Network => &mut input.network,
                Variable::Leverage => &mut input.leverage,
            };
            *slot = Some(value);
        }
        input
    }
}

/// The five core judgments for `quick_score`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreInput {
    pub essence: Option<f64>,
    pub novelty: Option<f64>,
    pub proof: Option<f64>,
    pub risk: Option<f64>,
    pub network: Option<f64>,
}

impl CoreInput {
    /// Every core judgment at the neutral value
    pub fn neutral() -> Self {
        Self {
            essence: Some(LEVEL_NEUTRAL),
            novelty: Some(LEVEL_NEUTRAL),
            proof: Some(LEVEL_NEUTRAL),
            risk: Some(LEVEL_NEUTRAL),
            network: Some(LEVEL_NEUTRAL),
        }
    }

    /// Core values set, everything else (gates included) neutral
    pub fn to_variables(&self) -> Result<VariableSet> {
        Ok(VariableSet::from_core(
            required(self.essence, "essence")?,
            required(self.novelty, "novelty")?,
            required(self.proof, "proof")?,
            required(self.risk, "risk")?,
            required(self.network, "network")?,
        ))
    }
}

fn required(value: Option<f64>, field: &'static str) -> Result<f64> {
    match value {
        None => Err(EngineError::MissingField { field }),
        Some(v) if v.is_nan() => Err(EngineError::InvalidField {
            field,
            details: "not a number".to_string(),
        }),
        Some(v) => Ok(v),
    }
}

/// Upward operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    QuickScore {
        variables: CoreInput,
    },
    FullAnalyze {
        variables: VariableInput,
        #[serde(default)]
        apply_patches: bool,
        #[serde(default)]
        context: PatchContext,
    },
    SimulateTot {
        variables: VariableInput,
        variation: Option<f64>,
    },
    SimulateMonteCarlo {
        variables: VariableInput,
        n: Option<i64>,
        noise_std: Option<f64>,
        seed: Option<u64>,
        #[serde(default)]
        noise_overrides: HashMap<Variable, f64>,
    },
    Kelly {
        score: Option<f64>,
        p_success: Option<f64>,
        time_investment: Option<f64>,
        payoff_multiplier: Option<f64>,
    },
    Grade {
        score: Option<f64>,
    },
    PatternProbability {
        pattern_id: Option<String>,
    },
    PatternUpdate {
        pattern_id: Option<String>,
        outcome: Option<Outcome>,
        proof_strength: Option<f64>,
        content_id: Option<String>,
    },
    Report {
        variables: VariableInput,
        #[serde(default)]
        options: ReportOptions,
    },
}

impl Request {
    /// Parse one JSON request
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::MalformedRequest { details: e.to_string() })
    }

    pub fn op(&self) -> &'static str {
        match self {
            Request::QuickScore { .. } => "quick_score",
            Request::FullAnalyze { .. } => "full_analyze",
            Request::SimulateTot { .. } => "simulate_tot",
            Request::SimulateMonteCarlo { .. } => "simulate_monte_carlo",
            Request::Kelly { .. } => "kelly",
            Request::Grade { .. } => "grade",
            Request::PatternProbability { .. } => "pattern_probability",
            Request::PatternUpdate { .. } => "pattern_update",
            Request::Report { .. } => "report",
        }
    }
}

/// Which optional blocks a report carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub apply_patches: bool,
    pub context: PatchContext,
    pub include_scenarios: bool,
    pub variation: Option<f64>,
    pub include_monte_carlo: bool,
    pub n: Option<i64>,
    pub noise_std: Option<f64>,
    pub seed: Option<u64>,
    /// Use this pattern's posterior as the Kelly success probability
    pub pattern_id: Option<String>,
    pub time_investment: Option<f64>,
    pub payoff_multiplier: Option<f64>,
}

/// Base score, optional patches, and the final score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub base: ScoreResult,
    pub patches: Option<PatchResult>,
    /// `base` replayed with the patched raw score, or `base` itself
    pub result: ScoreResult,
}

/// Wire-level error payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub client_error: bool,
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            client_error: err.is_client_error(),
        }
    }
}

/// Operation result keyed by the request's op
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "result", rename_all = "snake_case")]
pub enum Response {
    QuickScore(ScoreResult),
    FullAnalyze(Analysis),
    SimulateTot(ToTResult),
    SimulateMonteCarlo(MonteCarloResult),
    Kelly(KellyDecision),
    Grade(GradeInfo),
    PatternProbability(PosteriorLookup),
    PatternUpdate(PosteriorUpdate),
    Report(Box<Report>),
    Error(ErrorBody),
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

/// Every component, wired from one config
pub struct Engine {
    config: EngineConfig,
    scorer: ViabilityScorer,
    patches: RealityPatchAdjuster,
    scenarios: ScenarioSimulator,
    monte_carlo: MonteCarloSimulator,
    kelly: KellyEngine,
    bayes: BayesianUpdater,
}

impl Engine {
    pub fn new(config: EngineConfig, store: Arc<dyn PosteriorStore>) -> Self {
        info!("🧠 STPF engine starting...");
        let scorer = ViabilityScorer::new(config.scoring.clone());
        let engine = Self {
            patches: RealityPatchAdjuster::new(config.patches.clone()),
            scenarios: ScenarioSimulator::new(scorer.clone()),
            monte_carlo: MonteCarloSimulator::new(scorer.clone(), config.simulation.clone()),
            kelly: KellyEngine::new(config.kelly.clone(), config.grade.clone()),
            bayes: BayesianUpdater::new(store, config.bayes.clone()),
            scorer,
            config,
        };
        info!("✅ STPF engine ready");
        engine
    }

    /// Engine backed by an in-process posterior store
    pub fn with_memory_store(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(MemoryPosteriorStore::new()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score from the five core judgments
    pub fn quick_score(&self, input: &CoreInput) -> Result<ScoreResult> {
        self.scorer.score(&input.to_variables()?)
    }

    /// Score, then patch when requested and the gates passed
    pub fn full_analyze(&self, vars: &VariableSet, patch_context: Option<&PatchContext>) -> Result<Analysis> {
        let base = self.scorer.score(vars)?;

        let patches = match patch_context {
            Some(ctx) if base.gate_passed => Some(self.patches.apply_patches(base.raw_score, ctx)),
            Some(_) => {
                debug!("🩹 Skipping patches: kill switch active");
                None
            }
            None => None,
        };

        let result = match &patches {
            Some(p) => self.scorer.finalize(vars, p.patched_score)?,
            None => base.clone(),
        };

        Ok(Analysis { base, patches, result })
    }

    /// Worst / base / best scenarios, default variation when `None`
    pub fn simulate_tot(&self, vars: &VariableSet, variation: Option<f64>) -> Result<ToTResult> {
        self.scenarios
            .run_tot(vars, variation.unwrap_or(self.config.simulation.default_variation))
    }

    /// Monte Carlo with defaults for `n` and `noise_std`
    pub fn simulate_monte_carlo(
        &self,
        vars: &VariableSet,
        n: Option<i64>,
        noise_std: Option<f64>,
        options: &MonteCarloOptions,
    ) -> Result<MonteCarloResult> {
        let sim = &self.config.simulation;
        self.monte_carlo.run_with_options(
            vars,
            n.unwrap_or(sim.default_trials as i64),
            noise_std.unwrap_or(sim.default_noise_std),
            options,
        )
    }

    pub fn kelly(
        &self,
        score_1000: u32,
        p_success: Option<f64>,
        time_investment: f64,
        payoff_multiplier: Option<f64>,
    ) -> KellyDecision {
        self.kelly.decide(
            score_1000,
            p_success,
            time_investment,
            payoff_multiplier.unwrap_or(self.kelly.config().default_payoff_multiplier),
        )
    }

    pub fn grade(&self, score_1000: u32) -> GradeInfo {
        self.kelly.grade(score_1000)
    }

    pub fn pattern_probability(&self, pattern_id: &str) -> Result<PosteriorLookup> {
        self.bayes.get_prior(validate_pattern_id(pattern_id)?)
    }

    pub fn pattern_update(&self, pattern_id: &str, evidence: &Evidence) -> Result<PosteriorUpdate> {
        if !evidence.proof_strength.is_finite() {
            return Err(EngineError::InvalidField {
                field: "proof_strength",
                details: "not a finite number".to_string(),
            });
        }
        self.bayes.update_posterior(validate_pattern_id(pattern_id)?, evidence)
    }

    /// Full decision document
    ///
    /// A vetoed opportunity gets a zero-effort NO_GO and grade C whatever the
    /// score or stored pattern posterior says.
    pub fn report(&self, vars: &VariableSet, options: &ReportOptions) -> Result<Report> {
        let analysis = self.full_analyze(vars, options.apply_patches.then_some(&options.context))?;
        let score = analysis.result.score_1000;

        let pattern = match &options.pattern_id {
            Some(id) => Some(self.pattern_probability(id)?),
            None => None,
        };
        let p_success = pattern
            .as_ref()
            .filter(|lookup| lookup.source == PriorSource::Stored)
            .map(|lookup| lookup.posterior.p_success);

        let time_investment = options.time_investment.unwrap_or(1.0);
        let (kelly, grade) = if analysis.result.gate_passed {
            let kelly = self.kelly(score, p_success, time_investment, options.payoff_multiplier);
            (kelly, self.grade(score))
        } else {
            let payoff = options
                .payoff_multiplier
                .unwrap_or(self.kelly.config().default_payoff_multiplier);
            (self.kelly.vetoed(time_investment, payoff), self.grade(0))
        };

        let scenarios = if options.include_scenarios {
            Some(self.simulate_tot(vars, options.variation)?)
        } else {
            None
        };
        let monte_carlo = if options.include_monte_carlo {
            let mc_options = MonteCarloOptions { seed: options.seed, ..Default::default() };
            Some(self.simulate_monte_carlo(vars, options.n, options.noise_std, &mc_options)?)
        } else {
            None
        };

        let extras = ReportExtras {
            patches: analysis.patches,
            kelly: Some(kelly),
            grade: Some(grade),
            scenarios,
            monte_carlo,
            pattern: pattern.map(|lookup| lookup.posterior),
        };
        Ok(report::generate(&analysis.result, vars, extras))
    }

    /// Dispatch one request; failures become `Response::Error`
    pub fn handle(&self, request: Request) -> Response {
        let op = request.op();
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => {
                if err.is_client_error() {
                    warn!("⚠️  {} rejected: {}", op, err);
                } else {
                    error!("❌ {} failed: {}", op, err);
                }
                Response::Error(ErrorBody::from(&err))
            }
        }
    }

    fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::QuickScore { variables } => Ok(Response::QuickScore(self.quick_score(&variables)?)),
            Request::FullAnalyze {
                variables,
                apply_patches,
                context,
            } => {
                let vars = variables.to_variables()?;
                let ctx = apply_patches.then_some(&context);
                Ok(Response::FullAnalyze(self.full_analyze(&vars, ctx)?))
            }
            Request::SimulateTot { variables, variation } => {
                Ok(Response::SimulateTot(self.simulate_tot(&variables.to_variables()?, variation)?))
            }
            Request::SimulateMonteCarlo {
                variables,
                n,
                noise_std,
                seed,
                noise_overrides,
            } => {
                let options = MonteCarloOptions { noise_overrides, seed, ..Default::default() };
                let result = self.simulate_monte_carlo(&variables.to_variables()?, n, noise_std, &options)?;
                Ok(Response::SimulateMonteCarlo(result))
            }
            Request::Kelly {
                score,
                p_success,
                time_investment,
                payoff_multiplier,
            } => {
                let score = score_field(score)?;
                let time = required(time_investment, "time_investment")?;
                Ok(Response::Kelly(self.kelly(score, p_success, time, payoff_multiplier)))
            }
            Request::Grade { score } => Ok(Response::Grade(self.grade(score_field(score)?))),
            Request::PatternProbability { pattern_id } => {
                let id = pattern_id.ok_or(EngineError::MissingField { field: "pattern_id" })?;
                Ok(Response::PatternProbability(self.pattern_probability(&id)?))
            }
            Request::PatternUpdate {
                pattern_id,
                outcome,
                proof_strength,
                content_id,
            } => {
                let id = pattern_id.ok_or(EngineError::MissingField { field: "pattern_id" })?;
                let evidence = Evidence {
                    outcome: outcome.ok_or(EngineError::MissingField { field: "outcome" })?,
                    proof_strength: required(proof_strength, "proof_strength")?,
                    content_id,
                };
                Ok(Response::PatternUpdate(self.pattern_update(&id, &evidence)?))
            }
            Request::Report { variables, options } => {
                let report = self.report(&variables.to_variables()?, &options)?;
                Ok(Response::Report(Box::new(report)))
            }
        }
    }
}

/// Wire score: required, clamped into [0, 999]
fn score_field(score: Option<f64>) -> Result<u32> {
    let score = required(score, "score")?;
    Ok(score.clamp(0.0, 999.0).round() as u32)
}

fn validate_pattern_id(pattern_id: &str) -> Result<&str> {
    let trimmed = pattern_id.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidField {
            field: "pattern_id",
            details: "must not be empty".to_string(),
        });
    }
    Ok(trimmed)
}
