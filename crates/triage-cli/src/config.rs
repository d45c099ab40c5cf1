//! Pipeline configuration: which units run, which rules decide.
//!
//! Read from an optional JSON file. Every field has a default, so an empty
//! object (or no file at all) yields the standard structure pipeline:
//! validity gate, properties, then reject-invalid / review-failures /
//! proceed-valid.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use triage_chem::{InvalidStructureRule, PropertiesUnit, ValidStructureRule, ValidityUnit};
use triage_core::{
    Category, DecisionEngine, EvaluationUnit, Orchestrator, RequireResultsRule, Rule,
    UnitFailureRule, DEFAULT_VALIDITY_GATE,
};

/// Units the CLI knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Structure validity gate, registered under the configured gate name.
    Validity,
    Properties,
}

/// One decision rule, in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    RejectInvalidStructure,
    ReviewUnitFailures,
    RequireResults {
        units: Vec<String>,
        #[serde(default)]
        category: Category,
    },
    ProceedValidStructure,
}

impl RuleSpec {
    fn build(&self, gate: &str) -> Box<dyn Rule> {
        match self {
            RuleSpec::RejectInvalidStructure => Box::new(InvalidStructureRule::for_gate(gate)),
            RuleSpec::ReviewUnitFailures => Box::new(UnitFailureRule),
            RuleSpec::RequireResults { units, category } => {
                Box::new(RequireResultsRule::new(units.iter().cloned(), *category))
            }
            RuleSpec::ProceedValidStructure => Box::new(ValidStructureRule::for_gate(gate)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriageConfig {
    /// Category when no rule is decisive.
    pub default_category: Category,
    pub validity_gate: String,
    pub units: Vec<UnitKind>,
    pub rules: Vec<RuleSpec>,
    /// Subjects evaluated concurrently by `batch`.
    pub jobs: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            default_category: Category::Review,
            validity_gate: DEFAULT_VALIDITY_GATE.to_string(),
            units: vec![UnitKind::Validity, UnitKind::Properties],
            rules: vec![
                RuleSpec::RejectInvalidStructure,
                RuleSpec::ReviewUnitFailures,
                RuleSpec::ProceedValidStructure,
            ],
            jobs: 4,
        }
    }
}

impl TriageConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        if self.validity_gate.trim().is_empty() {
            bail!("validity_gate cannot be empty");
        }
        Ok(())
    }

    pub fn build_engine(&self) -> DecisionEngine {
        let rules = self
            .rules
            .iter()
            .map(|spec| spec.build(&self.validity_gate))
            .collect();
        DecisionEngine::new(rules, self.default_category)
    }

    pub fn build_units(&self) -> Vec<Box<dyn EvaluationUnit>> {
        self.units
            .iter()
            .map(|kind| -> Box<dyn EvaluationUnit> {
                match kind {
                    UnitKind::Validity => Box::new(ValidityUnit::named(&self.validity_gate)),
                    UnitKind::Properties => Box::new(PropertiesUnit),
                }
            })
            .collect()
    }

    pub fn build_orchestrator(&self) -> Result<Orchestrator> {
        let orchestrator = Orchestrator::new(self.build_units(), self.build_engine())
            .context("Invalid unit list in config")?;
        Ok(orchestrator.with_validity_gate(&self.validity_gate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_config(value: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    #[test]
    fn test_no_path_gives_defaults() {
        let config = TriageConfig::load(None).unwrap();
        assert_eq!(config, TriageConfig::default());
        let orchestrator = config.build_orchestrator().unwrap();
        assert_eq!(orchestrator.unit_names(), vec!["validity", "properties"]);
        assert_eq!(
            orchestrator.engine().rule_names(),
            vec!["invalid_structure", "unit_failure", "valid_structure"]
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(json!({ "jobs": 8, "default_category": "reject" }));
        let config = TriageConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.jobs, 8);
        assert_eq!(config.default_category, Category::Reject);
        assert_eq!(config.units, TriageConfig::default().units);
    }

    #[test]
    fn test_rule_specs_parse_in_order() {
        let file = write_config(json!({
            "rules": [
                { "kind": "require_results", "units": ["properties"], "category": "review" },
                { "kind": "proceed_valid_structure" }
            ]
        }));
        let config = TriageConfig::load(Some(file.path())).unwrap();
        assert_eq!(
            config.build_engine().rule_names(),
            vec!["require_results", "valid_structure"]
        );
    }

    #[test]
    fn test_custom_gate_names_unit_and_orchestrator() {
        let file = write_config(json!({ "validity_gate": "structure" }));
        let config = TriageConfig::load(Some(file.path())).unwrap();
        let orchestrator = config.build_orchestrator().unwrap();
        assert_eq!(orchestrator.validity_gate(), "structure");
        assert_eq!(orchestrator.unit_names(), vec!["structure", "properties"]);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let zero_jobs = write_config(json!({ "jobs": 0 }));
        assert!(TriageConfig::load(Some(zero_jobs.path())).is_err());

        let unknown_rule = write_config(json!({ "rules": [{ "kind": "coin_flip" }] }));
        assert!(TriageConfig::load(Some(unknown_rule.path())).is_err());

        let unknown_field = write_config(json!({ "workers": 2 }));
        assert!(TriageConfig::load(Some(unknown_field.path())).is_err());

        let missing = TriageConfig::load(Some(Path::new("/nonexistent/triage.json")));
        let msg = format!("{:#}", missing.unwrap_err());
        assert!(msg.contains("Failed to read config file"), "{msg}");
    }

    #[test]
    fn test_duplicate_units_rejected() {
        let config = TriageConfig {
            units: vec![UnitKind::Properties, UnitKind::Properties],
            ..TriageConfig::default()
        };
        let msg = format!("{:#}", config.build_orchestrator().unwrap_err());
        assert!(msg.contains("properties"), "{msg}");
    }
}
