//! Error taxonomy for the triage core.

use crate::record::RunRecord;

/// Structural contract violations. Always fatal, never silently recovered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate evaluation unit names: {}", names.join(", "))]
    DuplicateUnitNames { names: Vec<String> },

    #[error("run record must carry a non-empty subject identifier")]
    MissingSubjectId,

    #[error("evaluation unit '{unit}' returned a null result")]
    NullResult { unit: String },

    #[error("rationale cannot be empty: decisions must be explained")]
    EmptyRationale,

    #[error("unknown decision category: {0}")]
    UnknownCategory(String),

    #[error("decision already set for subject '{subject_id}'")]
    DecisionAlreadySet { subject_id: String },
}

/// Failure reported by an evaluation unit from `invoke`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    /// Anticipated failure. Recorded as data; fatal only for terminal units.
    #[error("{0}")]
    Failed(String),

    /// A condition the unit did not anticipate. Always fatal to the run.
    #[error("{0}")]
    Unexpected(String),
}

impl UnitError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

/// Errors a rule may report while inspecting a run record.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("malformed evidence in result '{unit}': {reason}")]
    MalformedEvidence { unit: String, reason: String },

    #[error("invalid decision: {0}")]
    InvalidDecision(#[from] ValidationError),
}

/// Errors raised by the decision engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid run record: {0}")]
    Validation(#[from] ValidationError),

    #[error("rule '{rule}' failed: {source}")]
    Rule {
        rule: String,
        #[source]
        source: RuleError,
    },
}

/// Reason a run was aborted instead of producing a decision.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("terminal unit '{unit}' failed: {message}")]
    UnitFailed { unit: String, message: String },

    #[error("unexpected error in unit '{unit}': {message}")]
    UnitCrashed { unit: String, message: String },

    #[error("decision engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("unexpected decision engine error: {0}")]
    EngineUnexpected(String),
}

/// An aborted run. Carries the partially filled record so callers can audit
/// every result stored before the abort.
#[derive(Debug, thiserror::Error)]
#[error("run for subject '{subject_id}' aborted: {source}")]
pub struct RunAborted {
    pub subject_id: String,
    #[source]
    pub source: TriageError,
    pub record: Box<RunRecord>,
}

impl RunAborted {
    /// The error that aborted the run.
    pub fn kind(&self) -> &TriageError {
        &self.source
    }

    /// Take ownership of the partial run record.
    pub fn into_record(self) -> RunRecord {
        *self.record
    }
}

/// Result type for triage core operations.
pub type Result<T> = std::result::Result<T, TriageError>;
