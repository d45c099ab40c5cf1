//! Sequential unit execution and run finalization.
//!
//! An [`Orchestrator`] owns an ordered list of evaluation units and one
//! [`DecisionEngine`]. Each call to [`Orchestrator::run`] creates a fresh
//! [`RunRecord`], runs every unit in list order against it, applies the
//! per-unit failure policy, honours the early-termination flag, and finally
//! asks the engine for a decision.
//!
//! Each enabled unit produces:
//! - One `unit.completed` event on success or `unit.failed` on failure
//! - A stored [`UnitResult`] in either case
//!
//! The run either returns the finalized record or a [`RunAborted`] carrying
//! the partial record.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::engine::DecisionEngine;
use crate::error::{RunAborted, TriageError, UnitError, ValidationError};
use crate::obs::{self, RunSpan};
use crate::record::RunRecord;
use crate::unit::{EvaluationUnit, FailureMode, UnitResult};

/// Unit name whose payload gates the rest of the pipeline.
pub const DEFAULT_VALIDITY_GATE: &str = "validity";

const UNKNOWN_VALIDATION_ERROR: &str = "Unknown validation error";

/// Runs evaluation units in order and delegates the verdict.
pub struct Orchestrator {
    units: Vec<Box<dyn EvaluationUnit>>,
    engine: DecisionEngine,
    validity_gate: String,
}

impl Orchestrator {
    /// Build an orchestrator over `units`, executed in list order.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateUnitNames` when two units share a
    /// name. Every duplicated name is listed once, sorted.
    pub fn new(
        units: Vec<Box<dyn EvaluationUnit>>,
        engine: DecisionEngine,
    ) -> Result<Self, ValidationError> {
        if units.is_empty() {
            warn!("orchestrator initialized with 0 units; every run goes straight to the engine");
        }

        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for unit in &units {
            if !seen.insert(unit.name()) {
                duplicates.insert(unit.name().to_string());
            }
        }
        if !duplicates.is_empty() {
            return Err(ValidationError::DuplicateUnitNames {
                names: duplicates.into_iter().collect(),
            });
        }

        Ok(Self {
            units,
            engine,
            validity_gate: DEFAULT_VALIDITY_GATE.to_string(),
        })
    }

    /// Use a different unit as the validity gate.
    pub fn with_validity_gate(mut self, name: impl Into<String>) -> Self {
        self.validity_gate = name.into();
        self
    }

    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    pub fn validity_gate(&self) -> &str {
        &self.validity_gate
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// SHA-256 digest of the ordered unit names followed by the ordered rule
    /// names. Identical pipelines always produce the same digest.
    pub fn pipeline_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for name in self.unit_names() {
            hasher.update(b"unit\0");
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
        }
        for name in self.engine.rule_names() {
            hasher.update(b"rule\0");
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }

    /// Evaluate one subject end to end.
    ///
    /// # Errors
    ///
    /// Returns [`RunAborted`] when a unit returns a null payload, a terminal
    /// unit fails, any unit fails unexpectedly, or the engine errors. The
    /// error carries the partial record with every result stored so far.
    pub fn run(
        &self,
        subject_id: impl Into<String>,
        raw_input: Value,
    ) -> Result<RunRecord, RunAborted> {
        let mut record =
            RunRecord::new(subject_id, raw_input).with_pipeline_digest(self.pipeline_digest());
        let run_id = record.run_id().to_string();
        let subject_id = record.subject_id().to_string();
        let _span = RunSpan::enter(&run_id, &subject_id);

        obs::emit_run_started(
            &subject_id,
            self.units.len(),
            record.pipeline_digest().unwrap_or_default(),
        );

        let mut executed = 0usize;
        for unit in &self.units {
            if record.is_terminated() {
                obs::emit_run_terminated(
                    &subject_id,
                    record.termination_reason().unwrap_or_default(),
                    record.results().len(),
                );
                break;
            }

            let name = unit.name();
            debug!(unit = %name, "executing unit");

            let start = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| unit.invoke(&record)));
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            executed += 1;

            match outcome {
                Ok(Ok(output)) => {
                    if output.payload().is_null() {
                        let err = ValidationError::NullResult {
                            unit: name.to_string(),
                        };
                        obs::emit_unit_failed(name, &err.to_string(), elapsed_ms, true);
                        return Err(abort(record, err.into()));
                    }

                    let result = UnitResult::from_output(name, output, elapsed_ms);
                    obs::emit_unit_completed(name, result.status.as_str(), elapsed_ms);
                    let gate_error = if name == self.validity_gate {
                        validity_error(&result)
                    } else {
                        None
                    };
                    record.add_result(result);

                    if let Some(error) = gate_error {
                        record.add_message(format!("Subject failed validity check: {error}"));
                        record.terminate(format!("Invalid subject: {error}"));
                        obs::emit_run_terminated(
                            &subject_id,
                            record.termination_reason().unwrap_or_default(),
                            record.results().len(),
                        );
                        break;
                    }
                }
                Ok(Err(UnitError::Failed(message))) => {
                    let fatal = unit.failure_mode() == FailureMode::Terminal;
                    obs::emit_unit_failed(name, &message, elapsed_ms, fatal);
                    record.add_result(UnitResult::failure(name, message.clone(), elapsed_ms));
                    if fatal {
                        let source = TriageError::UnitFailed {
                            unit: name.to_string(),
                            message,
                        };
                        return Err(abort(record, source));
                    }
                }
                Ok(Err(UnitError::Unexpected(message))) => {
                    return Err(crash(record, name, message, elapsed_ms));
                }
                Err(panic) => {
                    let message = format!("panic: {}", panic_message(panic.as_ref()));
                    return Err(crash(record, name, message, elapsed_ms));
                }
            }
        }

        record.add_message(format!("All units completed at {}", Utc::now().to_rfc3339()));
        record.mark_units_complete();

        let decision = match catch_unwind(AssertUnwindSafe(|| self.engine.evaluate(&record))) {
            Ok(Ok(decision)) => decision,
            Ok(Err(err)) => return Err(abort(record, err.into())),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                return Err(abort(record, TriageError::EngineUnexpected(message)));
            }
        };

        let category = decision.category();
        if let Err(err) = record.set_decision(decision) {
            return Err(abort(record, err.into()));
        }

        let failed = record.failed_units().len();
        obs::emit_run_finished(
            &subject_id,
            category.as_str(),
            executed,
            failed,
            record.total_duration_ms(),
            record.is_terminated(),
        );
        info!(
            subject_id = %subject_id,
            total_units = self.units.len(),
            executed_units = executed,
            failed_units = failed,
            early_termination = record.is_terminated(),
            "run complete: {}",
            category
        );

        Ok(record)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("units", &self.unit_names())
            .field("engine", &self.engine)
            .field("validity_gate", &self.validity_gate)
            .finish()
    }
}

fn crash(mut record: RunRecord, unit: &str, message: String, elapsed_ms: f64) -> RunAborted {
    let text = format!("Unexpected error: {message}");
    obs::emit_unit_failed(unit, &text, elapsed_ms, true);
    record.add_result(UnitResult::failure(unit, text, elapsed_ms));
    abort(
        record,
        TriageError::UnitCrashed {
            unit: unit.to_string(),
            message,
        },
    )
}

fn abort(mut record: RunRecord, source: TriageError) -> RunAborted {
    record.mark_aborted();
    obs::emit_run_aborted(record.subject_id(), &source);
    RunAborted {
        subject_id: record.subject_id().to_string(),
        source,
        record: Box::new(record),
    }
}

/// `Some(error)` when a gate result does not report `is_valid: true`.
fn validity_error(result: &UnitResult) -> Option<String> {
    if result.field("is_valid").and_then(Value::as_bool) == Some(true) {
        return None;
    }
    let error = result
        .field("error_message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_VALIDATION_ERROR);
    Some(error.to_string())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Category;
    use crate::unit::UnitOutput;
    use serde_json::json;

    struct Echo(&'static str);

    impl EvaluationUnit for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn invoke(&self, record: &RunRecord) -> Result<UnitOutput, UnitError> {
            Ok(UnitOutput::success(json!({ "seen": record.subject_id() })))
        }
    }

    #[test]
    fn test_duplicate_names_sorted_and_deduplicated() {
        let units: Vec<Box<dyn EvaluationUnit>> = vec![
            Box::new(Echo("Y")),
            Box::new(Echo("X")),
            Box::new(Echo("Y")),
            Box::new(Echo("X")),
            Box::new(Echo("Y")),
        ];
        let err = Orchestrator::new(units, DecisionEngine::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateUnitNames {
                names: vec!["X".to_string(), "Y".to_string()]
            }
        );
    }

    #[test]
    fn test_pipeline_digest_deterministic_and_order_sensitive() {
        let ab = Orchestrator::new(
            vec![Box::new(Echo("a")), Box::new(Echo("b"))],
            DecisionEngine::default(),
        )
        .unwrap();
        let ab_again = Orchestrator::new(
            vec![Box::new(Echo("a")), Box::new(Echo("b"))],
            DecisionEngine::default(),
        )
        .unwrap();
        let ba = Orchestrator::new(
            vec![Box::new(Echo("b")), Box::new(Echo("a"))],
            DecisionEngine::default(),
        )
        .unwrap();
        assert_eq!(ab.pipeline_digest(), ab_again.pipeline_digest());
        assert_ne!(ab.pipeline_digest(), ba.pipeline_digest());
        assert_eq!(ab.pipeline_digest().len(), 64);
    }

    #[test]
    fn test_validity_error_defaults() {
        let missing = UnitResult::from_output("validity", UnitOutput::success(json!({})), 0.1);
        assert_eq!(
            validity_error(&missing).as_deref(),
            Some(UNKNOWN_VALIDATION_ERROR)
        );

        let valid = UnitResult::from_output(
            "validity",
            UnitOutput::success(json!({ "is_valid": true })),
            0.1,
        );
        assert!(validity_error(&valid).is_none());
    }

    #[test]
    fn test_run_attaches_digest_and_message() {
        let orchestrator =
            Orchestrator::new(vec![Box::new(Echo("echo"))], DecisionEngine::default()).unwrap();
        let record = orchestrator.run("MOL_001", json!("CCO")).unwrap();
        assert_eq!(
            record.pipeline_digest(),
            Some(orchestrator.pipeline_digest().as_str())
        );
        assert!(record
            .messages()
            .last()
            .unwrap()
            .starts_with("All units completed at "));
        assert_eq!(record.decision().unwrap().category(), Category::Review);
        assert_eq!(record.result("echo").unwrap().payload["seen"], "MOL_001");
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
