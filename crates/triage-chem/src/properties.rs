//! Descriptor calculation and the `properties` evaluation unit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use triage_core::{EvaluationUnit, RunRecord, UnitError, UnitOutput};

use crate::canonical::canonical_smiles;
use crate::graph::{BondOrder, MolGraph};
use crate::molecule::smiles_from_raw_input;
use crate::smiles::parse_smiles;

const HYDROGEN_MASS: f64 = 1.008;

/// Basic descriptors of one structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// Atoms in the graph; implicit hydrogens are not counted.
    pub num_atoms: usize,
    pub num_heavy_atoms: usize,
    pub num_bonds: usize,
    /// Every hydrogen, implicit, bracketed or written as an atom.
    pub num_hydrogens: usize,
    pub molecular_weight: f64,
    /// Hill-order formula with net charge suffix.
    pub formula: String,
    pub ring_count: usize,
    pub num_rotatable_bonds: usize,
    pub num_aromatic_atoms: usize,
    pub smiles_canonical: String,
}

impl Properties {
    pub fn of(graph: &MolGraph) -> Self {
        let atoms = graph.atoms();
        let attached_h: usize = atoms.iter().map(|a| usize::from(a.hydrogen_count())).sum();
        let hydrogen_atoms = atoms.iter().filter(|a| a.element.is_hydrogen()).count();
        let num_hydrogens = attached_h + hydrogen_atoms;

        let molecular_weight = atoms
            .iter()
            .map(|a| a.mass() + f64::from(a.hydrogen_count()) * HYDROGEN_MASS)
            .sum::<f64>();

        Self {
            num_atoms: graph.atom_count(),
            num_heavy_atoms: graph.atom_count() - hydrogen_atoms,
            num_bonds: graph.bond_count(),
            num_hydrogens,
            molecular_weight: (molecular_weight * 1000.0).round() / 1000.0,
            formula: hill_formula(graph),
            ring_count: graph.ring_count(),
            num_rotatable_bonds: rotatable_bonds(graph),
            num_aromatic_atoms: atoms.iter().filter(|a| a.aromatic).count(),
            smiles_canonical: canonical_smiles(graph),
        }
    }
}

/// Parse `smiles` and compute its descriptors.
pub fn compute_properties(smiles: &str) -> Result<Properties, crate::SmilesError> {
    Ok(Properties::of(&parse_smiles(smiles)?))
}

/// Carbon first, then hydrogen, then the rest alphabetically. Without
/// carbon every element, hydrogen included, is alphabetical.
fn hill_formula(graph: &MolGraph) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut charge = 0i32;
    for atom in graph.atoms() {
        if atom.element.atomic_number > 0 {
            *counts.entry(atom.symbol()).or_default() += 1;
        }
        if atom.hydrogen_count() > 0 {
            *counts.entry("H").or_default() += usize::from(atom.hydrogen_count());
        }
        charge += i32::from(atom.charge);
    }

    let mut formula = String::new();
    let mut push = |symbol: &str, count: usize| {
        formula.push_str(symbol);
        if count > 1 {
            formula.push_str(&count.to_string());
        }
    };

    if let Some(carbon) = counts.remove("C") {
        push("C", carbon);
        if let Some(hydrogen) = counts.remove("H") {
            push("H", hydrogen);
        }
    }
    for (symbol, count) in counts {
        push(symbol, count);
    }

    match charge {
        0 => {}
        1 => formula.push('+'),
        -1 => formula.push('-'),
        c if c > 0 => formula.push_str(&format!("+{c}")),
        c => formula.push_str(&format!("{c}")),
    }
    formula
}

/// Acyclic single bonds between two atoms that each have another heavy
/// neighbour.
fn rotatable_bonds(graph: &MolGraph) -> usize {
    let heavy_degree = |atom: usize| {
        graph
            .neighbors(atom)
            .iter()
            .filter(|&&(n, _)| !graph.atoms()[n].element.is_hydrogen())
            .count()
    };
    graph
        .bonds()
        .iter()
        .enumerate()
        .filter(|(index, bond)| {
            bond.order == BondOrder::Single
                && !graph.is_ring_bond(*index)
                && !graph.atoms()[bond.begin].element.is_hydrogen()
                && !graph.atoms()[bond.end].element.is_hydrogen()
                && heavy_degree(bond.begin) > 1
                && heavy_degree(bond.end) > 1
        })
        .count()
}

/// Computes descriptors for the subject's SMILES.
///
/// Non-terminal: a subject whose SMILES cannot be read records a declared
/// failure and the pipeline continues.
#[derive(Debug, Clone, Default)]
pub struct PropertiesUnit;

impl PropertiesUnit {
    pub const NAME: &'static str = "properties";
}

impl EvaluationUnit for PropertiesUnit {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn invoke(&self, record: &RunRecord) -> Result<UnitOutput, UnitError> {
        let smiles = smiles_from_raw_input(record.raw_input())
            .ok_or_else(|| UnitError::failed("raw input carries no SMILES string"))?;
        let properties = compute_properties(smiles)
            .map_err(|e| UnitError::failed(format!("cannot compute properties: {e}")))?;
        debug!(
            subject_id = %record.subject_id(),
            formula = %properties.formula,
            "properties computed"
        );
        let payload: Value = serde_json::to_value(&properties)
            .map_err(|e| UnitError::unexpected(format!("properties not serializable: {e}")))?;
        Ok(UnitOutput::success(payload))
    }
}
