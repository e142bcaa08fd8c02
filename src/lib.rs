//! 🧠 STPF Decision Engine
//!
//! Turns 1-10 judgment variables into a bounded viability score, a go/no-go
//! verdict, outcome distributions, and an effort-sizing recommendation.
//!
//! ## Architecture
//! - Variables: clamped judgment inputs (gates, numerator, denominator, multipliers)
//! - Decision Engine: gate + core scorer, reality patches, Kelly sizing and grades
//! - Pattern Cache: Bayesian posterior per content pattern over an injected store
//! - Simulation: worst/base/best scenarios and parallel Monte Carlo
//! - Report: read-only decision document
//! - API: `Engine` facade and the JSON request/response contract

pub mod api;
pub mod config;
pub mod decision_engine;
pub mod error;
pub mod pattern_cache;
pub mod report;
pub mod simulation;
pub mod variables;

pub use api::{Analysis, CoreInput, Engine, Request, Response, VariableInput};
pub use config::EngineConfig;
pub use error::{EngineError, Result, StoreError};
pub use variables::{Variable, VariableGroup, VariableSet};
