//! 🗄️ Posterior persistence interface
//!
//! The engine never owns durable storage. Backends implement [`PosteriorStore`];
//! [`MemoryPosteriorStore`] is the in-process default, sharded by pattern id.

use crate::error::StoreError;
use crate::pattern_cache::bayesian::PatternPosterior;
use dashmap::DashMap;
use std::sync::Arc;

/// External storage for per-pattern posteriors
pub trait PosteriorStore: Send + Sync {
    /// Load the stored posterior, `Ok(None)` when the pattern was never seen
    fn get_prior(&self, pattern_id: &str) -> Result<Option<PatternPosterior>, StoreError>;

    /// Persist a posterior, replacing any previous record
    fn save_posterior(&self, pattern_id: &str, posterior: &PatternPosterior) -> Result<(), StoreError>;
}

/// Lock-free in-memory store
#[derive(Clone, Default)]
pub struct MemoryPosteriorStore {
    records: Arc<DashMap<String, PatternPosterior>>,
}

impl MemoryPosteriorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get store size
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PosteriorStore for MemoryPosteriorStore {
    fn get_prior(&self, pattern_id: &str) -> Result<Option<PatternPosterior>, StoreError> {
        Ok(self.records.get(pattern_id).map(|entry| entry.value().clone()))
    }

    fn save_posterior(&self, pattern_id: &str, posterior: &PatternPosterior) -> Result<(), StoreError> {
        self.records.insert(pattern_id.to_string(), posterior.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BayesConfig;

    #[test]
    fn test_missing_pattern_is_none() {
        let store = MemoryPosteriorStore::new();
        assert_eq!(store.get_prior("unknown"), Ok(None));
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryPosteriorStore::new();
        let posterior = PatternPosterior::uninformative("hook_first", &BayesConfig::default());

        store.save_posterior("hook_first", &posterior).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_prior("hook_first").unwrap(), Some(posterior));
    }

    #[test]
    fn test_clones_share_records() {
        let store = MemoryPosteriorStore::new();
        let view = store.clone();
        let posterior = PatternPosterior::uninformative("loop", &BayesConfig::default());
        store.save_posterior("loop", &posterior).unwrap();
        assert!(view.get_prior("loop").unwrap().is_some());
    }
}
