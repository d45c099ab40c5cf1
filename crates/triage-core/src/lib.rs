//! Triage Core Library
//!
//! Sequential evaluation pipeline: an [`Orchestrator`] runs ordered
//! [`EvaluationUnit`]s against a [`RunRecord`], then a [`DecisionEngine`]
//! turns the accumulated evidence into a [`Decision`].

pub mod decision;
pub mod engine;
pub mod error;
pub mod obs;
pub mod orchestrator;
pub mod record;
pub mod rule;
pub mod rules;
pub mod telemetry;
pub mod unit;

pub use decision::{Category, Decision, SOURCE_KEY, TIMESTAMP_KEY};
pub use engine::{DecisionEngine, FALLBACK_SOURCE};
pub use error::{
    EngineError, Result, RuleError, RunAborted, TriageError, UnitError, ValidationError,
};
pub use orchestrator::{Orchestrator, DEFAULT_VALIDITY_GATE};
pub use record::{RunPhase, RunRecord};
pub use rule::Rule;
pub use rules::{RequireResultsRule, UnitFailureRule};
pub use telemetry::init_tracing;
pub use unit::{EvaluationUnit, FailureMode, UnitOutput, UnitResult, UnitStatus};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
