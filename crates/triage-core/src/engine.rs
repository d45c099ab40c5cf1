//! Ordered-rule decision engine.
//!
//! Rules are evaluated in insertion order and the first decisive rule wins.
//! When every rule defers, the engine synthesizes a fallback decision with
//! the configured default category so evaluation always produces a verdict.

use serde_json::{json, Map};
use tracing::debug;

use crate::decision::{Category, Decision, SOURCE_KEY};
use crate::error::{EngineError, ValidationError};
use crate::obs;
use crate::record::RunRecord;
use crate::rule::Rule;

/// Source name recorded when no rule was decisive.
pub const FALLBACK_SOURCE: &str = "fallback";

/// Applies ordered rules to a run record.
pub struct DecisionEngine {
    rules: Vec<Box<dyn Rule>>,
    default_category: Category,
}

impl DecisionEngine {
    pub fn new(rules: Vec<Box<dyn Rule>>, default_category: Category) -> Self {
        Self {
            rules,
            default_category,
        }
    }

    /// Append a rule (builder pattern).
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Append a rule; it is evaluated after every rule already present.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn default_category(&self) -> Category {
        self.default_category
    }

    /// Produce the decision for a completed run record.
    ///
    /// # Errors
    ///
    /// - `EngineError::Validation` if the record has a blank subject id.
    /// - `EngineError::Rule` if any rule reports an error; later rules and
    ///   the fallback are not consulted.
    pub fn evaluate(&self, record: &RunRecord) -> Result<Decision, EngineError> {
        if record.subject_id().trim().is_empty() {
            return Err(ValidationError::MissingSubjectId.into());
        }

        for rule in &self.rules {
            let verdict = rule.evaluate(record).map_err(|source| EngineError::Rule {
                rule: rule.name().to_string(),
                source,
            })?;

            if let Some(decision) = verdict {
                let decision = if decision.source().is_some() {
                    decision
                } else {
                    decision.with_entry(SOURCE_KEY, rule.name())
                };
                debug!(rule = %rule.name(), category = %decision.category(), "rule decisive");
                self.log_provenance(record, &decision, rule.name());
                return Ok(decision);
            }
            debug!(rule = %rule.name(), "rule deferred");
        }

        let decision = self.fallback(record)?;
        self.log_provenance(record, &decision, FALLBACK_SOURCE);
        Ok(decision)
    }

    fn fallback(&self, record: &RunRecord) -> Result<Decision, ValidationError> {
        let mut metadata = Map::new();
        metadata.insert(SOURCE_KEY.to_string(), json!(FALLBACK_SOURCE));
        metadata.insert("rules_evaluated".to_string(), json!(self.rules.len()));
        metadata.insert("result_count".to_string(), json!(record.results().len()));
        Decision::new(
            self.default_category,
            format!(
                "Insufficient evidence for a definitive decision on {}: no rule was decisive \
                 after {} rule(s) over {} result(s)",
                record.subject_id(),
                self.rules.len(),
                record.results().len()
            ),
            metadata,
        )
    }

    fn log_provenance(&self, record: &RunRecord, decision: &Decision, source: &str) {
        obs::emit_decision_provenance(
            record.subject_id(),
            decision.category().as_str(),
            source,
            &record.result_names(),
        );
    }
}

impl Default for DecisionEngine {
    /// No rules; every evaluation falls back to `REVIEW`.
    fn default() -> Self {
        Self::new(Vec::new(), Category::Review)
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("rules", &self.rule_names())
            .field("default_category", &self.default_category)
            .finish()
    }
}
