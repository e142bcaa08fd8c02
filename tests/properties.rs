//! Property tests for scorer, simulator and sizing invariants

use proptest::prelude::*;
use stpf_engine::config::SimulationConfig;
use stpf_engine::decision_engine::{KellyEngine, Verdict, ViabilityScorer};
use stpf_engine::simulation::{MonteCarloOptions, MonteCarloSimulator, ScenarioSimulator};
use stpf_engine::{Variable, VariableSet};

/// Any value, including far outside [1, 10]
fn arb_level() -> impl Strategy<Value = f64> {
    -50.0f64..50.0
}

fn arb_variables() -> impl Strategy<Value = VariableSet> {
    prop::collection::vec(arb_level(), Variable::ALL.len()).prop_map(|values| {
        let mut vars = VariableSet::neutral();
        for (var, value) in Variable::ALL.iter().zip(values) {
            vars.set(*var, value);
        }
        vars
    })
}

fn arb_gate() -> impl Strategy<Value = Variable> {
    prop_oneof![Just(Variable::Trust), Just(Variable::Legality), Just(Variable::Hygiene)]
}

proptest! {
    #[test]
    fn prop_score_is_bounded(vars in arb_variables()) {
        let result = ViabilityScorer::default().score(&vars).unwrap();
        prop_assert!(result.score_1000 < 1000);
        prop_assert!(result.raw_score >= 0.0);
    }

    #[test]
    fn prop_every_value_clamped(vars in arb_variables()) {
        for (_, value) in vars.iter() {
            prop_assert!((1.0..=10.0).contains(&value));
        }
    }

    #[test]
    fn prop_clamp_is_idempotent(vars in arb_variables()) {
        let mut again = vars;
        for (var, value) in vars.iter() {
            again.set(var, value);
        }
        prop_assert_eq!(again, vars);
    }

    #[test]
    fn prop_scoring_is_pure(vars in arb_variables()) {
        let scorer = ViabilityScorer::default();
        prop_assert_eq!(scorer.score(&vars).unwrap(), scorer.score(&vars).unwrap());
    }

    #[test]
    fn prop_kill_switch_dominates(vars in arb_variables(), gate in arb_gate(), low in 1.0f64..3.99) {
        let result = ViabilityScorer::default().score(&vars.with(gate, low)).unwrap();
        prop_assert!(!result.gate_passed);
        prop_assert_eq!(result.go_nogo, Verdict::NoGo);
    }

    #[test]
    fn prop_tot_brackets_base(vars in arb_variables(), variation in 0.0f64..=1.0) {
        let sim = ScenarioSimulator::new(ViabilityScorer::default());
        let tot = sim.run_tot(&vars, variation).unwrap();
        prop_assert!(tot.worst.score_1000() <= tot.base.score_1000());
        prop_assert!(tot.base.score_1000() <= tot.best.score_1000());
        prop_assert!(tot.weighted_score >= tot.worst.score_1000() as f64 - 1e-9);
        prop_assert!(tot.weighted_score <= tot.best.score_1000() as f64 + 1e-9);
    }

    #[test]
    fn prop_kelly_safe_never_exceeds_raw(
        score in 0u32..1000,
        p in prop::option::of(0.0f64..=1.0),
        payoff in 0.01f64..20.0,
        time in 0.0f64..1000.0,
    ) {
        let decision = KellyEngine::default().decide(score, p, time, payoff);
        prop_assert!(decision.safe_kelly_fraction <= decision.raw_kelly_fraction);
        prop_assert!((0.0..=1.0).contains(&decision.safe_kelly_fraction));
        prop_assert!((0.0..=100.0).contains(&decision.recommended_effort_percent));
        prop_assert!(decision.recommended_time <= time + 1e-9);
    }

    #[test]
    fn prop_grade_is_monotonic(a in 0u32..1000, b in 0u32..1000) {
        let engine = KellyEngine::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(engine.grade(lo).grade <= engine.grade(hi).grade);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_monte_carlo_zero_noise_is_degenerate(vars in arb_variables(), n in 1i64..200) {
        let sim = MonteCarloSimulator::new(ViabilityScorer::default(), SimulationConfig::default());
        let result = sim.run_monte_carlo(&vars, n, 0.0).unwrap();
        prop_assert_eq!(result.std, 0.0);
        prop_assert_eq!(result.min, result.base_score);
        prop_assert_eq!(result.max, result.base_score);
    }

    #[test]
    fn prop_monte_carlo_probabilities_sum_to_one(vars in arb_variables(), seed in any::<u64>()) {
        let sim = MonteCarloSimulator::new(ViabilityScorer::default(), SimulationConfig::default());
        let options = MonteCarloOptions { seed: Some(seed), ..Default::default() };
        let result = sim.run_with_options(&vars, 300, 1.0, &options).unwrap();
        let total = result.go_probability + result.consider_probability + result.nogo_probability;
        prop_assert!((total - 1.0).abs() < 1e-9);
        prop_assert!(result.max < 1000);
    }
}
