//! ⚠️ Engine error taxonomy
//!
//! Codes are stable and machine-parseable:
//! - `STPF-1xxx` boundary validation (malformed requests)
//! - `STPF-2xxx` simulation parameter rejection
//! - `STPF-3xxx` persistence failures that are not a plain fallback
//! - `STPF-9xxx` unexpected computation failures
//!
//! Kill-switch NO_GO verdicts and low go-probabilities are results, not errors.

use thiserror::Error;

/// Shared `Result` alias for the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the decision engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("[STPF-1001] missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("[STPF-1002] invalid value for {field}: {details}")]
    InvalidField { field: &'static str, details: String },

    #[error("[STPF-1003] malformed request: {details}")]
    MalformedRequest { details: String },

    #[error("[STPF-2001] simulation count must be > 0 (got {n})")]
    InvalidSimulationCount { n: i64 },

    #[error("[STPF-2002] noise std must be finite and >= 0 (got {noise_std})")]
    InvalidNoise { noise_std: f64 },

    #[error("[STPF-2003] variation must be finite and within [0, 1] (got {variation})")]
    InvalidVariation { variation: f64 },

    #[error("[STPF-2004] simulation cancelled after {completed}/{requested} trials")]
    SimulationCancelled { completed: usize, requested: usize },

    #[error("[STPF-3001] posterior store failure for pattern {pattern_id}: {source}")]
    Store {
        pattern_id: String,
        #[source]
        source: StoreError,
    },

    #[error("[STPF-3002] pattern lock poisoned for {pattern_id}")]
    LockPoisoned { pattern_id: String },

    #[error("[STPF-9001] computation failure in {context}")]
    Computation { context: &'static str },
}

impl EngineError {
    /// Stable machine-parseable error code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "STPF-1001",
            Self::InvalidField { .. } => "STPF-1002",
            Self::MalformedRequest { .. } => "STPF-1003",
            Self::InvalidSimulationCount { .. } => "STPF-2001",
            Self::InvalidNoise { .. } => "STPF-2002",
            Self::InvalidVariation { .. } => "STPF-2003",
            Self::SimulationCancelled { .. } => "STPF-2004",
            Self::Store { .. } => "STPF-3001",
            Self::LockPoisoned { .. } => "STPF-3002",
            Self::Computation { .. } => "STPF-9001",
        }
    }

    /// True when the caller sent something the boundary must reject
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::InvalidField { .. }
                | Self::MalformedRequest { .. }
                | Self::InvalidSimulationCount { .. }
                | Self::InvalidNoise { .. }
                | Self::InvalidVariation { .. }
        )
    }
}

/// Failure reported by a posterior store implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// Backend unreachable; callers degrade to the uninformative prior
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with data that cannot be a posterior
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_display_prefix() {
        let errors = vec![
            EngineError::MissingField { field: "essence" },
            EngineError::InvalidSimulationCount { n: 0 },
            EngineError::InvalidNoise { noise_std: -1.0 },
            EngineError::Computation { context: "score" },
            EngineError::Store {
                pattern_id: "hook".to_string(),
                source: StoreError::Corrupt("alpha=-1".to_string()),
            },
        ];

        for err in errors {
            let rendered = err.to_string();
            assert!(rendered.starts_with(&format!("[{}]", err.code())), "{}", rendered);
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(EngineError::MissingField { field: "risk" }.is_client_error());
        assert!(EngineError::InvalidNoise { noise_std: -0.5 }.is_client_error());
        assert!(!EngineError::Computation { context: "rescale" }.is_client_error());
        assert!(!EngineError::SimulationCancelled { completed: 10, requested: 100 }.is_client_error());
    }
}
