//! Per-evaluation run record.
//!
//! The record is the single source of truth for one evaluation: the
//! subject, its raw input, every unit result, a narrative of messages, and
//! the final decision. Fields are private so the append-only invariants hold
//! by construction: results can be added or overwritten but never removed,
//! messages only grow, and the decision is set exactly once.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::decision::Decision;
use crate::error::ValidationError;
use crate::unit::UnitResult;

/// Lifecycle phase derived from the record's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Initialized,
    Executing,
    TerminatedEarly,
    UnitsExhausted,
    Finalized,
    Aborted,
}

/// All evidence and metadata accumulated during one evaluation.
#[derive(Debug, Clone)]
pub struct RunRecord {
    run_id: Uuid,
    subject_id: String,
    raw_input: Value,
    results: BTreeMap<String, UnitResult>,
    messages: Vec<String>,
    decision: Option<Decision>,
    started_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    terminated: bool,
    termination_reason: Option<String>,
    units_complete: bool,
    decision_set: bool,
    aborted: bool,
    pipeline_digest: Option<String>,
}

impl RunRecord {
    /// Create a record for one subject. `started_at` is captured now.
    pub fn new(subject_id: impl Into<String>, raw_input: Value) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            raw_input,
            results: BTreeMap::new(),
            messages: Vec::new(),
            decision: None,
            started_at: Utc::now(),
            decided_at: None,
            terminated: false,
            termination_reason: None,
            units_complete: false,
            decision_set: false,
            aborted: false,
            pipeline_digest: None,
        }
    }

    /// Attach the digest of the pipeline that produces this record.
    pub fn with_pipeline_digest(mut self, digest: impl Into<String>) -> Self {
        self.pipeline_digest = Some(digest.into());
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn raw_input(&self) -> &Value {
        &self.raw_input
    }

    pub fn results(&self) -> &BTreeMap<String, UnitResult> {
        &self.results
    }

    pub fn result(&self, unit_name: &str) -> Option<&UnitResult> {
        self.results.get(unit_name)
    }

    /// Names of every unit that has a stored result.
    pub fn result_names(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }

    /// Names of units whose stored result is a failure.
    pub fn failed_units(&self) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| r.is_failure())
            .map(|r| r.unit_name.as_str())
            .collect()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn termination_reason(&self) -> Option<&str> {
        self.termination_reason.as_deref()
    }

    pub fn units_complete(&self) -> bool {
        self.units_complete
    }

    pub fn decision_set(&self) -> bool {
        self.decision_set
    }

    pub fn pipeline_digest(&self) -> Option<&str> {
        self.pipeline_digest.as_deref()
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Store a unit result under its unit name. Last write wins.
    pub fn add_result(&mut self, result: UnitResult) {
        self.results.insert(result.unit_name.clone(), result);
    }

    /// Append a narrative message.
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Signal early termination. The first reason given is kept.
    pub fn terminate(&mut self, reason: impl Into<String>) {
        self.terminated = true;
        if self.termination_reason.is_none() {
            self.termination_reason = Some(reason.into());
        }
    }

    /// Mark the unit execution phase as finished.
    pub fn mark_units_complete(&mut self) {
        self.units_complete = true;
    }

    /// Store the final decision and capture `decided_at`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DecisionAlreadySet` on a second call; the
    /// first decision is kept.
    pub fn set_decision(&mut self, decision: Decision) -> Result<(), ValidationError> {
        if self.decision_set {
            return Err(ValidationError::DecisionAlreadySet {
                subject_id: self.subject_id.clone(),
            });
        }
        self.decision = Some(decision);
        self.decided_at = Some(Utc::now());
        self.decision_set = true;
        Ok(())
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// Milliseconds between `started_at` and `decided_at`; 0 when undecided.
    pub fn total_duration_ms(&self) -> f64 {
        match self.decided_at {
            Some(end) => (end - self.started_at)
                .num_microseconds()
                .map(|us| us as f64 / 1000.0)
                .unwrap_or(0.0),
            None => 0.0,
        }
    }

    pub fn phase(&self) -> RunPhase {
        if self.aborted {
            RunPhase::Aborted
        } else if self.decision_set {
            RunPhase::Finalized
        } else if self.units_complete && self.terminated {
            RunPhase::TerminatedEarly
        } else if self.units_complete {
            RunPhase::UnitsExhausted
        } else if self.results.is_empty() && !self.terminated {
            RunPhase::Initialized
        } else {
            RunPhase::Executing
        }
    }

    /// JSON projection for logging, storage and API responses.
    pub fn to_value(&self) -> Value {
        json!({
            "run_id": self.run_id,
            "subject_id": self.subject_id,
            "raw_input": self.raw_input,
            "results": self.results,
            "messages": self.messages,
            "decision": self.decision.as_ref().map(Decision::to_value),
            "started_at": self.started_at.to_rfc3339(),
            "decided_at": self.decided_at.map(|t| t.to_rfc3339()),
            "terminated": self.terminated,
            "termination_reason": self.termination_reason,
            "units_complete": self.units_complete,
            "decision_set": self.decision_set,
            "pipeline_digest": self.pipeline_digest,
            "phase": self.phase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{UnitOutput, UnitStatus};

    fn success(name: &str, payload: Value) -> UnitResult {
        UnitResult::from_output(name, UnitOutput::success(payload), 0.1)
    }

    #[test]
    fn test_new_record_is_initialized() {
        let record = RunRecord::new("MOL_001", json!("CCO"));
        assert_eq!(record.subject_id(), "MOL_001");
        assert_eq!(record.raw_input(), &json!("CCO"));
        assert!(record.results().is_empty());
        assert!(record.decision().is_none());
        assert!(!record.decision_set());
        assert_eq!(record.phase(), RunPhase::Initialized);
    }

    #[test]
    fn test_add_result_last_write_wins() {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        record.add_result(success("tox", json!({ "score": 0.2 })));
        record.add_result(success("tox", json!({ "score": 0.8 })));
        assert_eq!(record.results().len(), 1);
        assert_eq!(record.result("tox").unwrap().payload["score"], 0.8);
    }

    #[test]
    fn test_messages_append_in_order() {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        record.add_message("first");
        record.add_message("second");
        assert_eq!(record.messages(), ["first", "second"]);
    }

    #[test]
    fn test_terminate_keeps_first_reason() {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        record.terminate("invalid structure");
        record.terminate("later reason");
        assert!(record.is_terminated());
        assert_eq!(record.termination_reason(), Some("invalid structure"));
    }

    #[test]
    fn test_set_decision_is_one_shot() {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        record
            .set_decision(Decision::proceed("clean").unwrap())
            .unwrap();
        let err = record
            .set_decision(Decision::reject("second opinion").unwrap())
            .unwrap_err();
        assert!(matches!(err, ValidationError::DecisionAlreadySet { .. }));
        assert_eq!(record.decision().unwrap().rationale(), "clean");
        assert!(record.decided_at().is_some());
        assert_eq!(record.phase(), RunPhase::Finalized);
    }

    #[test]
    fn test_duration_zero_until_decided() {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        assert_eq!(record.total_duration_ms(), 0.0);
        record.set_decision(Decision::review("check").unwrap()).unwrap();
        assert!(record.total_duration_ms() >= 0.0);
    }

    #[test]
    fn test_failed_units() {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        record.add_result(success("validity", json!({ "is_valid": true })));
        record.add_result(UnitResult::failure("tox", "offline", 2.0));
        assert_eq!(record.failed_units(), vec!["tox"]);
        assert_eq!(record.result_names(), vec!["tox", "validity"]);
    }

    #[test]
    fn test_phase_transitions() {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        record.add_result(success("validity", json!({ "is_valid": false })));
        assert_eq!(record.phase(), RunPhase::Executing);
        record.terminate("invalid");
        record.mark_units_complete();
        assert_eq!(record.phase(), RunPhase::TerminatedEarly);

        let mut exhausted = RunRecord::new("MOL_002", Value::Null);
        exhausted.mark_units_complete();
        assert_eq!(exhausted.phase(), RunPhase::UnitsExhausted);
    }

    #[test]
    fn test_to_value_projection() {
        let mut record = RunRecord::new("MOL_001", json!({ "smiles": "CCO" }));
        record.add_result(success("validity", json!({ "is_valid": true })));
        record.add_message("All units completed");
        record.mark_units_complete();
        record.set_decision(Decision::proceed("valid").unwrap()).unwrap();

        let value = record.to_value();
        assert_eq!(value["subject_id"], "MOL_001");
        assert_eq!(value["raw_input"]["smiles"], "CCO");
        assert_eq!(value["results"]["validity"]["status"], "SUCCESS");
        assert_eq!(value["messages"][0], "All units completed");
        assert_eq!(value["decision"]["category"], "proceed");
        assert!(value["started_at"].is_string());
        assert_eq!(value["terminated"], false);
        assert_eq!(value["units_complete"], true);
        assert_eq!(value["decision_set"], true);
        assert_eq!(value["phase"], "finalized");
        assert_eq!(
            value["results"]["validity"]["status"],
            serde_json::to_value(UnitStatus::Success).unwrap()
        );
    }
}
