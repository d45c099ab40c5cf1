//! Validity screening over a list of molecules.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::molecule::Molecule;
use crate::validity::validate_smiles;

/// Counts and ids from [`validate_batch`]. `errors` maps each invalid id to
/// its reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub valid_ids: Vec<String>,
    pub invalid_ids: Vec<String>,
    pub errors: BTreeMap<String, String>,
}

/// Check every molecule's SMILES. Ids keep input order.
pub fn validate_batch(molecules: &[Molecule]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: molecules.len(),
        ..BatchSummary::default()
    };
    for molecule in molecules {
        let id = molecule.molecule_id().to_string();
        match validate_smiles(molecule.smiles()) {
            Ok(()) => summary.valid_ids.push(id),
            Err(reason) => {
                summary.errors.insert(id.clone(), reason);
                summary.invalid_ids.push(id);
            }
        }
    }
    summary.valid = summary.valid_ids.len();
    summary.invalid = summary.invalid_ids.len();
    info!(
        total = summary.total,
        valid = summary.valid,
        invalid = summary.invalid,
        "batch validated"
    );
    summary
}
