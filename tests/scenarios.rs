//! End-to-end decision scenarios through the public engine API

use stpf_engine::decision_engine::{KellySignal, Verdict};
use stpf_engine::pattern_cache::{Evidence, Outcome, PriorSource};
use stpf_engine::simulation::MonteCarloOptions;
use stpf_engine::{Engine, EngineConfig, Variable, VariableSet};

fn engine() -> Engine {
    Engine::with_memory_store(EngineConfig::default())
}

fn scenario_one() -> VariableSet {
    VariableSet::from_core(8.0, 7.0, 6.0, 3.0, 8.0).with_gates(7.0, 8.0, 7.0)
}

#[test]
fn test_strong_opportunity_is_go() {
    let analysis = engine().full_analyze(&scenario_one(), None).unwrap();
    assert_eq!(analysis.result.go_nogo, Verdict::Go);
    assert!(analysis.result.score_1000 > 700);
    assert!(analysis.result.gate_passed);
}

#[test]
fn test_trust_gate_kills_but_still_scores() {
    let engine = engine();
    let passing = engine.full_analyze(&scenario_one(), None).unwrap();
    let killed = engine
        .full_analyze(&scenario_one().with(Variable::Trust, 2.0), None)
        .unwrap();

    assert_eq!(killed.result.go_nogo, Verdict::NoGo);
    assert!(!killed.result.gate_passed);
    assert!(killed.result.raw_score > 0.0);
    assert_eq!(killed.result.score_1000, passing.result.score_1000);
}

#[test]
fn test_monte_carlo_without_noise_has_zero_spread() {
    let engine = engine();
    let base = engine.full_analyze(&scenario_one(), None).unwrap().result.score_1000;
    let mc = engine
        .simulate_monte_carlo(&scenario_one(), Some(1000), Some(0.0), &MonteCarloOptions::default())
        .unwrap();

    assert_eq!(mc.n_simulations, 1000);
    assert_eq!(mc.std, 0.0);
    assert_eq!(mc.min, base);
    assert_eq!(mc.max, base);
}

#[test]
fn test_curiosity_gap_posterior_rises_with_each_success() {
    let engine = engine();
    let initial = engine.pattern_probability("curiosity_gap").unwrap();
    assert_eq!(initial.source, PriorSource::Uninformative);
    assert_eq!(initial.posterior.sample_count, 0);

    let mut last = initial.posterior.p_success;
    for i in 1..=5 {
        let evidence = Evidence {
            outcome: Outcome::Success,
            proof_strength: 8.0,
            content_id: Some(format!("video-{}", i)),
        };
        let update = engine.pattern_update("curiosity_gap", &evidence).unwrap();
        assert!(update.posterior.p_success > last);
        assert!(update.persisted);
        assert_eq!(update.posterior.sample_count, i);
        last = update.posterior.p_success;
    }

    let stored = engine.pattern_probability("curiosity_gap").unwrap();
    assert!(stored.posterior.p_success > 0.5);
    assert!(stored.posterior.interval_width() < initial.posterior.interval_width());
    assert_eq!(stored.posterior.last_content_id.as_deref(), Some("video-5"));
}

#[test]
fn test_kelly_signals_follow_score() {
    let engine = engine();

    let strong = engine.kelly(850, None, 10.0, None);
    assert_eq!(strong.signal, KellySignal::Go);

    let weak = engine.kelly(200, None, 10.0, None);
    assert!(matches!(weak.signal, KellySignal::Caution | KellySignal::NoGo));
    assert!(weak.recommended_effort_percent < 5.0);
}

#[test]
fn test_tot_brackets_the_base_case() {
    let tot = engine().simulate_tot(&scenario_one(), None).unwrap();
    assert!(tot.worst.score_1000() <= tot.base.score_1000());
    assert!(tot.base.score_1000() <= tot.best.score_1000());
    assert_eq!((tot.variation * 10.0).round(), 2.0);
}

#[test]
fn test_report_text_covers_all_sections() {
    let report = engine()
        .report(&scenario_one(), &stpf_engine::api::ReportOptions::default())
        .unwrap();
    let text = report.render_text();

    assert!(text.contains("Grade A"));
    assert!(text.contains("Kelly GO"));
    assert!(text.contains("VARIABLES"));
    assert!(text.contains("DIAGNOSIS"));
    assert!(text.contains("ACTION PLAN"));
}
