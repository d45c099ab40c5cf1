//! Structure validity checking and the `validity` gate unit.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use triage_core::{EvaluationUnit, RunRecord, UnitError, UnitOutput, DEFAULT_VALIDITY_GATE};

use crate::canonical::canonical_smiles;
use crate::molecule::smiles_from_raw_input;
use crate::smiles::parse_smiles;

/// Outcome of parsing and sanitizing one SMILES string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityReport {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smiles_canonical: Option<String>,
    #[serde(default)]
    pub num_atoms: usize,
    #[serde(default)]
    pub num_bonds: usize,
}

impl ValidityReport {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(error.into()),
            smiles_canonical: None,
            num_atoms: 0,
            num_bonds: 0,
        }
    }
}

/// Parse and sanitize `smiles`, never failing: problems land in the report.
pub fn check_smiles(smiles: &str) -> ValidityReport {
    match parse_smiles(smiles) {
        Ok(graph) => ValidityReport {
            is_valid: true,
            error_message: None,
            smiles_canonical: Some(canonical_smiles(&graph)),
            num_atoms: graph.atom_count(),
            num_bonds: graph.bond_count(),
        },
        Err(e) => ValidityReport::invalid(e.to_string()),
    }
}

/// `Ok(())` for a valid structure, otherwise the reason it is not.
pub fn validate_smiles(smiles: &str) -> Result<(), String> {
    match check_smiles(smiles) {
        ValidityReport { is_valid: true, .. } => Ok(()),
        report => Err(report
            .error_message
            .unwrap_or_else(|| "invalid SMILES".to_string())),
    }
}

/// Gate unit: reports structure validity in its payload.
///
/// It never returns an error; an unreadable or missing structure produces
/// an `is_valid: false` payload, which the orchestrator turns into early
/// termination.
#[derive(Debug, Clone)]
pub struct ValidityUnit {
    name: String,
}

impl ValidityUnit {
    pub fn new() -> Self {
        Self::named(DEFAULT_VALIDITY_GATE)
    }

    /// Register under a different name, for orchestrators with a custom gate.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ValidityUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationUnit for ValidityUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, record: &RunRecord) -> Result<UnitOutput, UnitError> {
        let report = match smiles_from_raw_input(record.raw_input()) {
            Some(smiles) => check_smiles(smiles),
            None => ValidityReport::invalid("raw input carries no SMILES string"),
        };
        debug!(
            subject_id = %record.subject_id(),
            is_valid = report.is_valid,
            "validity checked"
        );
        let mut payload = serde_json::to_value(&report)
            .map_err(|e| UnitError::unexpected(format!("validity report not serializable: {e}")))?;
        if let Value::Object(fields) = &mut payload {
            fields.insert(
                "subject_id".to_string(),
                Value::String(record.subject_id().to_string()),
            );
        }
        Ok(UnitOutput::success(payload))
    }
}
