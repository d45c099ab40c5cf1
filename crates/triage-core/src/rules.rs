//! Domain-neutral rules shipped with the core.
//!
//! These only look at result statuses and names, never at payload shapes.
//! Domain rules live next to the units whose payloads they read.

use serde_json::{json, Map};

use crate::decision::{Category, Decision, SOURCE_KEY};
use crate::error::RuleError;
use crate::record::RunRecord;
use crate::rule::Rule;

/// Sends a subject to review when any unit recorded a failure.
#[derive(Debug, Clone, Default)]
pub struct UnitFailureRule;

impl Rule for UnitFailureRule {
    fn name(&self) -> &str {
        "unit_failure"
    }

    fn evaluate(&self, record: &RunRecord) -> Result<Option<Decision>, RuleError> {
        let failed = record.failed_units();
        if failed.is_empty() {
            return Ok(None);
        }
        let mut metadata = Map::new();
        metadata.insert(SOURCE_KEY.to_string(), json!(self.name()));
        metadata.insert("failed_units".to_string(), json!(failed));
        let decision = Decision::new(
            Category::Review,
            format!(
                "{} unit(s) failed for {}: {}",
                failed.len(),
                record.subject_id(),
                failed.join(", ")
            ),
            metadata,
        )?;
        Ok(Some(decision))
    }
}

/// Decides with a configured category when required results are missing.
///
/// A result counts as present only when it exists and is not a failure.
#[derive(Debug, Clone)]
pub struct RequireResultsRule {
    required: Vec<String>,
    category: Category,
}

impl RequireResultsRule {
    pub fn new<I, S>(required: I, category: Category) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            category,
        }
    }
}

impl Rule for RequireResultsRule {
    fn name(&self) -> &str {
        "require_results"
    }

    fn evaluate(&self, record: &RunRecord) -> Result<Option<Decision>, RuleError> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|name| {
                record
                    .result(name)
                    .map(|r| r.is_failure())
                    .unwrap_or(true)
            })
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return Ok(None);
        }
        let mut metadata = Map::new();
        metadata.insert(SOURCE_KEY.to_string(), json!(self.name()));
        metadata.insert("missing_results".to_string(), json!(missing));
        let decision = Decision::new(
            self.category,
            format!(
                "Required evidence missing for {}: {}",
                record.subject_id(),
                missing.join(", ")
            ),
            metadata,
        )?;
        Ok(Some(decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{UnitOutput, UnitResult};
    use serde_json::Value;

    fn record_with(results: Vec<UnitResult>) -> RunRecord {
        let mut record = RunRecord::new("MOL_001", Value::Null);
        for r in results {
            record.add_result(r);
        }
        record
    }

    #[test]
    fn test_unit_failure_rule_defers_when_clean() {
        let record = record_with(vec![UnitResult::from_output(
            "validity",
            UnitOutput::success(json!({ "is_valid": true })),
            0.1,
        )]);
        assert!(UnitFailureRule.evaluate(&record).unwrap().is_none());
    }

    #[test]
    fn test_unit_failure_rule_reviews_failures() {
        let record = record_with(vec![UnitResult::failure("tox", "offline", 1.0)]);
        let decision = UnitFailureRule.evaluate(&record).unwrap().unwrap();
        assert_eq!(decision.category(), Category::Review);
        assert!(decision.rationale().contains("tox"));
        assert_eq!(decision.source(), Some("unit_failure"));
    }

    #[test]
    fn test_require_results_missing() {
        let rule = RequireResultsRule::new(["validity", "properties"], Category::Review);
        let record = record_with(vec![UnitResult::from_output(
            "validity",
            UnitOutput::success(json!({ "is_valid": true })),
            0.1,
        )]);
        let decision = rule.evaluate(&record).unwrap().unwrap();
        assert_eq!(decision.metadata()["missing_results"], json!(["properties"]));
    }

    #[test]
    fn test_require_results_failure_counts_as_missing() {
        let rule = RequireResultsRule::new(["tox"], Category::Reject);
        let record = record_with(vec![UnitResult::failure("tox", "offline", 1.0)]);
        let decision = rule.evaluate(&record).unwrap().unwrap();
        assert_eq!(decision.category(), Category::Reject);
    }

    #[test]
    fn test_require_results_all_present() {
        let rule = RequireResultsRule::new(["validity"], Category::Review);
        let record = record_with(vec![UnitResult::from_output(
            "validity",
            UnitOutput::success(json!({ "is_valid": true })),
            0.1,
        )]);
        assert!(rule.evaluate(&record).unwrap().is_none());
    }
}
