pub mod scoring;
pub mod reality_patches;
pub mod kelly;

// Re-export main types for convenience
pub use scoring::{GateWarning, ScoreResult, ScoreTerms, Verdict, ViabilityScorer, SCORE_CEILING};
pub use reality_patches::{PatchContext, PatchResult, PatchStep, RealityPatch, RealityPatchAdjuster};
pub use kelly::{Grade, GradeInfo, KellyDecision, KellyEngine, KellySignal, ProbabilitySource};
