//! Decision rules that read the validity gate payload.

use serde_json::{json, Map, Value};

use triage_core::{
    Category, Decision, Rule, RuleError, RunRecord, UnitResult, DEFAULT_VALIDITY_GATE, SOURCE_KEY,
};

/// Reads `is_valid` from the gate result. `Ok(None)` when the gate did not
/// run or failed outright.
fn gate_validity(
    gate: &str,
    record: &RunRecord,
) -> Result<Option<(bool, Option<String>)>, RuleError> {
    let Some(result) = record.result(gate).filter(|r| !r.is_failure()) else {
        return Ok(None);
    };
    let is_valid = result
        .field("is_valid")
        .and_then(Value::as_bool)
        .ok_or_else(|| RuleError::MalformedEvidence {
            unit: gate.to_string(),
            reason: "is_valid is missing or not a boolean".to_string(),
        })?;
    Ok(Some((is_valid, error_message(result))))
}

fn error_message(result: &UnitResult) -> Option<String> {
    result
        .field("error_message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn provenance(rule: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(SOURCE_KEY.to_string(), json!(rule));
    metadata
}

/// Rejects a subject whose structure failed the validity gate.
#[derive(Debug, Clone)]
pub struct InvalidStructureRule {
    gate: String,
}

impl InvalidStructureRule {
    pub fn new() -> Self {
        Self::for_gate(DEFAULT_VALIDITY_GATE)
    }

    pub fn for_gate(gate: impl Into<String>) -> Self {
        Self { gate: gate.into() }
    }
}

impl Default for InvalidStructureRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for InvalidStructureRule {
    fn name(&self) -> &str {
        "invalid_structure"
    }

    fn evaluate(&self, record: &RunRecord) -> Result<Option<Decision>, RuleError> {
        match gate_validity(&self.gate, record)? {
            Some((false, error)) => {
                let error = error.unwrap_or_else(|| "no reason given".to_string());
                let mut metadata = provenance(self.name());
                metadata.insert("validity_error".to_string(), json!(error));
                Ok(Some(Decision::new(
                    Category::Reject,
                    format!("Invalid structure for {}: {error}", record.subject_id()),
                    metadata,
                )?))
            }
            _ => Ok(None),
        }
    }
}

/// Proceeds with a valid structure when no unit failed.
#[derive(Debug, Clone)]
pub struct ValidStructureRule {
    gate: String,
}

impl ValidStructureRule {
    pub fn new() -> Self {
        Self::for_gate(DEFAULT_VALIDITY_GATE)
    }

    pub fn for_gate(gate: impl Into<String>) -> Self {
        Self { gate: gate.into() }
    }
}

impl Default for ValidStructureRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ValidStructureRule {
    fn name(&self) -> &str {
        "valid_structure"
    }

    fn evaluate(&self, record: &RunRecord) -> Result<Option<Decision>, RuleError> {
        if !record.failed_units().is_empty() {
            return Ok(None);
        }
        match gate_validity(&self.gate, record)? {
            Some((true, _)) => {
                let mut metadata = provenance(self.name());
                metadata.insert(
                    "units_evaluated".to_string(),
                    json!(record.result_names()),
                );
                Ok(Some(Decision::new(
                    Category::Proceed,
                    format!(
                        "Structure of {} is valid and all {} unit(s) succeeded",
                        record.subject_id(),
                        record.results().len()
                    ),
                    metadata,
                )?))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::UnitOutput;

    fn record_with(results: Vec<UnitResult>) -> RunRecord {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        for r in results {
            record.add_result(r);
        }
        record
    }

    fn gate(payload: Value) -> UnitResult {
        UnitResult::from_output("validity", UnitOutput::success(payload), 0.2)
    }

    #[test]
    fn test_invalid_structure_rejects() {
        let record = record_with(vec![gate(json!({
            "is_valid": false,
            "error_message": "unclosed ring bond 1"
        }))]);
        let decision = InvalidStructureRule::new().evaluate(&record).unwrap().unwrap();
        assert_eq!(decision.category(), Category::Reject);
        assert!(decision.rationale().contains("unclosed ring bond 1"));
        assert_eq!(decision.source(), Some("invalid_structure"));
    }

    #[test]
    fn test_invalid_structure_defers_on_valid_or_missing() {
        let valid = record_with(vec![gate(json!({ "is_valid": true }))]);
        assert!(InvalidStructureRule::new().evaluate(&valid).unwrap().is_none());
        let missing = record_with(vec![]);
        assert!(InvalidStructureRule::new().evaluate(&missing).unwrap().is_none());
    }

    #[test]
    fn test_malformed_gate_payload() {
        let record = record_with(vec![gate(json!({ "is_valid": "yes" }))]);
        assert!(matches!(
            InvalidStructureRule::new().evaluate(&record),
            Err(RuleError::MalformedEvidence { .. })
        ));
    }

    #[test]
    fn test_valid_structure_proceeds() {
        let record = record_with(vec![
            gate(json!({ "is_valid": true })),
            UnitResult::from_output("properties", UnitOutput::success(json!({})), 0.4),
        ]);
        let decision = ValidStructureRule::new().evaluate(&record).unwrap().unwrap();
        assert_eq!(decision.category(), Category::Proceed);
        assert_eq!(
            decision.metadata()["units_evaluated"],
            json!(["properties", "validity"])
        );
    }

    #[test]
    fn test_valid_structure_defers_on_failure() {
        let record = record_with(vec![
            gate(json!({ "is_valid": true })),
            UnitResult::failure("properties", "parse error", 0.4),
        ]);
        assert!(ValidStructureRule::new().evaluate(&record).unwrap().is_none());
    }

    #[test]
    fn test_custom_gate_name() {
        let record = record_with(vec![UnitResult::from_output(
            "structure",
            UnitOutput::success(json!({ "is_valid": false })),
            0.1,
        )]);
        assert!(InvalidStructureRule::new().evaluate(&record).unwrap().is_none());
        let decision = InvalidStructureRule::for_gate("structure")
            .evaluate(&record)
            .unwrap()
            .unwrap();
        assert!(decision.rationale().contains("no reason given"));
    }
}
