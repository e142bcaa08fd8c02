pub mod bayesian;
pub mod store;

pub use bayesian::{
    BayesianUpdater, BetaPrior, Evidence, Outcome, PatternPosterior, PosteriorLookup, PosteriorUpdate, PriorSource,
};
pub use store::{MemoryPosteriorStore, PosteriorStore};
