//! Integration tests for ordered-rule evaluation.

use serde_json::{json, Map, Value};

use triage_core::{
    Category, Decision, DecisionEngine, EngineError, RequireResultsRule, Rule, RuleError,
    RunRecord, UnitFailureRule, UnitOutput, UnitResult, ValidationError, FALLBACK_SOURCE,
    SOURCE_KEY, TIMESTAMP_KEY,
};

/// Rejects when the `tox` payload score is above a threshold.
struct ToxicityRule {
    threshold: f64,
}

impl Rule for ToxicityRule {
    fn name(&self) -> &str {
        "toxicity"
    }

    fn evaluate(&self, record: &RunRecord) -> Result<Option<Decision>, RuleError> {
        let Some(result) = record.result("tox") else {
            return Ok(None);
        };
        let score = result
            .field("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| RuleError::MalformedEvidence {
                unit: "tox".into(),
                reason: "score missing".into(),
            })?;
        if score > self.threshold {
            return Ok(Some(Decision::reject(format!(
                "toxicity score {score} above {}",
                self.threshold
            ))?));
        }
        Ok(None)
    }
}

/// Proceeds whenever any result exists, with its own source entry.
struct Lenient;

impl Rule for Lenient {
    fn name(&self) -> &str {
        "lenient"
    }

    fn evaluate(&self, record: &RunRecord) -> Result<Option<Decision>, RuleError> {
        if record.results().is_empty() {
            return Ok(None);
        }
        let mut metadata = Map::new();
        metadata.insert(SOURCE_KEY.into(), json!("lenient-v2"));
        Ok(Some(Decision::new(
            Category::Proceed,
            "evidence present",
            metadata,
        )?))
    }
}

fn record_with(results: Vec<UnitResult>) -> RunRecord {
    let mut record = RunRecord::new("MOL_001", json!("CCO"));
    for r in results {
        record.add_result(r);
    }
    record
}

fn success(name: &str, payload: Value) -> UnitResult {
    UnitResult::from_output(name, UnitOutput::success(payload), 0.5)
}

// ── First match wins ──

#[test]
fn earlier_rule_shadows_later_rule() {
    let engine = DecisionEngine::default()
        .with_rule(ToxicityRule { threshold: 0.5 })
        .with_rule(Lenient);
    let record = record_with(vec![success("tox", json!({ "score": 0.9 }))]);

    let decision = engine.evaluate(&record).unwrap();
    assert_eq!(decision.category(), Category::Reject);
    assert_eq!(decision.source(), Some("toxicity"));
}

#[test]
fn deferring_rule_passes_to_next() {
    let engine = DecisionEngine::default()
        .with_rule(ToxicityRule { threshold: 0.5 })
        .with_rule(Lenient);
    let record = record_with(vec![success("tox", json!({ "score": 0.1 }))]);

    let decision = engine.evaluate(&record).unwrap();
    assert_eq!(decision.category(), Category::Proceed);
    assert_eq!(decision.source(), Some("lenient-v2"));
}

#[test]
fn evaluation_is_deterministic() {
    let engine = DecisionEngine::default()
        .with_rule(UnitFailureRule)
        .with_rule(Lenient);
    let record = record_with(vec![UnitResult::failure("tox", "offline", 1.0)]);

    let first = engine.evaluate(&record).unwrap();
    let second = engine.evaluate(&record).unwrap();
    assert_eq!(first.category(), second.category());
    assert_eq!(first.rationale(), second.rationale());
}

// ── Fallback ──

#[test]
fn no_rules_falls_back_to_review() {
    let engine = DecisionEngine::default();
    let record = record_with(vec![success("validity", json!({ "is_valid": true }))]);

    let decision = engine.evaluate(&record).unwrap();
    assert_eq!(decision.category(), Category::Review);
    assert!(!decision.rationale().is_empty());
    assert_eq!(decision.source(), Some(FALLBACK_SOURCE));
    assert_eq!(decision.metadata()["result_count"], 1);
    assert!(decision.metadata().contains_key(TIMESTAMP_KEY));
}

#[test]
fn cleared_engine_falls_back() {
    let mut engine = DecisionEngine::default().with_rule(Lenient);
    engine.clear_rules();
    let record = record_with(vec![success("validity", json!({ "is_valid": true }))]);

    assert_eq!(engine.evaluate(&record).unwrap().source(), Some(FALLBACK_SOURCE));
}

#[test]
fn require_results_then_fallback() {
    let engine = DecisionEngine::new(
        vec![Box::new(RequireResultsRule::new(["validity"], Category::Reject))],
        Category::Proceed,
    );

    let missing = record_with(Vec::new());
    assert_eq!(engine.evaluate(&missing).unwrap().category(), Category::Reject);

    let present = record_with(vec![success("validity", json!({ "is_valid": true }))]);
    assert_eq!(engine.evaluate(&present).unwrap().category(), Category::Proceed);
}

// ── Errors ──

#[test]
fn rule_error_propagates() {
    let engine = DecisionEngine::default()
        .with_rule(ToxicityRule { threshold: 0.5 })
        .with_rule(Lenient);
    let record = record_with(vec![success("tox", json!({ "label": "unknown" }))]);

    let err = engine.evaluate(&record).unwrap_err();
    match err {
        EngineError::Rule { rule, source } => {
            assert_eq!(rule, "toxicity");
            assert!(matches!(source, RuleError::MalformedEvidence { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn blank_subject_is_rejected() {
    let engine = DecisionEngine::default().with_rule(Lenient);
    let record = RunRecord::new("", Value::Null);
    assert!(matches!(
        engine.evaluate(&record),
        Err(EngineError::Validation(ValidationError::MissingSubjectId))
    ));
}
