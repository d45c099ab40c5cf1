//! Evaluation unit contract and result types.
//!
//! Units are the independent pieces of work the orchestrator runs in order.
//! Each unit reports through [`UnitOutput`] on success and [`UnitError`] on
//! failure; the orchestrator turns both into a [`UnitResult`] stored on the
//! run record.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::UnitError;
use crate::record::RunRecord;

/// How the orchestrator reacts to a declared failure of a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Failure is recorded and execution continues.
    #[default]
    NonTerminal,
    /// Failure is recorded and the run aborts.
    Terminal,
}

/// Status of one unit execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitStatus {
    Success,
    Failure,
    Skipped,
}

impl UnitStatus {
    /// Wire name, as serialized.
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Success => "SUCCESS",
            UnitStatus::Failure => "FAILURE",
            UnitStatus::Skipped => "SKIPPED",
        }
    }
}

/// Value returned by a unit that completed without failing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutput {
    status: UnitStatus,
    payload: Value,
}

impl UnitOutput {
    /// Successful execution with a unit-defined payload.
    pub fn success(payload: Value) -> Self {
        Self {
            status: UnitStatus::Success,
            payload,
        }
    }

    /// The unit decided it had nothing to do for this subject.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: UnitStatus::Skipped,
            payload: json!({ "reason": reason.into() }),
        }
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// A unit's recorded outcome, as stored in [`RunRecord::results`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub unit_name: String,
    pub status: UnitStatus,
    /// Unit-defined payload. `null` for failures.
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub execution_time_ms: Option<f64>,
}

impl UnitResult {
    pub fn from_output(unit_name: impl Into<String>, output: UnitOutput, elapsed_ms: f64) -> Self {
        Self {
            unit_name: unit_name.into(),
            status: output.status,
            payload: output.payload,
            error_message: None,
            execution_time_ms: Some(elapsed_ms),
        }
    }

    pub fn failure(
        unit_name: impl Into<String>,
        error_message: impl Into<String>,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            unit_name: unit_name.into(),
            status: UnitStatus::Failure,
            payload: Value::Null,
            error_message: Some(error_message.into()),
            execution_time_ms: Some(elapsed_ms),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == UnitStatus::Failure
    }

    /// Look up a top-level field of the payload.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// A named, independent unit of work run by the orchestrator.
///
/// Implementations must report expected domain failures through
/// `UnitError::Failed` (or an "invalid" payload) rather than panicking.
/// `invoke` receives the run record read-only; everything it wants to
/// contribute goes into the returned payload.
pub trait EvaluationUnit: Send + Sync {
    /// Stable name, unique within one orchestrator.
    fn name(&self) -> &str;

    fn failure_mode(&self) -> FailureMode {
        FailureMode::NonTerminal
    }

    fn invoke(&self, record: &RunRecord) -> Result<UnitOutput, UnitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_mode_default_non_terminal() {
        assert_eq!(FailureMode::default(), FailureMode::NonTerminal);
    }

    #[test]
    fn test_skipped_output_carries_reason() {
        let output = UnitOutput::skipped("no structure");
        assert_eq!(output.status(), UnitStatus::Skipped);
        assert_eq!(output.payload()["reason"], "no structure");
    }

    #[test]
    fn test_failure_result() {
        let result = UnitResult::failure("tox", "model offline", 1.5);
        assert!(result.is_failure());
        assert_eq!(result.error_message.as_deref(), Some("model offline"));
        assert!(result.payload.is_null());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_value(UnitStatus::Failure).unwrap();
        assert_eq!(json, "FAILURE");
    }

    #[test]
    fn test_status_as_str_matches_serialized_name() {
        for status in [UnitStatus::Success, UnitStatus::Failure, UnitStatus::Skipped] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
    }

    #[test]
    fn test_field_lookup() {
        let result = UnitResult::from_output(
            "validity",
            UnitOutput::success(json!({ "is_valid": true })),
            0.2,
        );
        assert_eq!(result.field("is_valid"), Some(&Value::Bool(true)));
        assert!(result.field("missing").is_none());
    }
}
