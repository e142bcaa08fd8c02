pub mod monte_carlo;
pub mod tot;

pub use monte_carlo::{
    percentile, CancelToken, HistogramBucket, MonteCarloOptions, MonteCarloResult, MonteCarloSimulator, Percentiles,
};
pub use tot::{ConfidenceBucket, ScenarioKind, ScenarioResult, ScenarioSimulator, ScenarioVerdict, Sensitivity, ToTResult};
