//! Chemistry collaborators for triage pipelines.
//!
//! A SMILES parser with sanitization, a canonical writer, descriptor
//! calculation, and the units and rules that plug them into
//! [`triage_core::Orchestrator`].

mod aromatic;
pub mod batch;
pub mod canonical;
pub mod element;
pub mod error;
pub mod graph;
pub mod molecule;
pub mod properties;
pub mod rules;
pub mod smiles;
pub mod validity;

pub use batch::{validate_batch, BatchSummary};
pub use canonical::{canonical_smiles, canonicalize};
pub use error::{ChemError, Result, SmilesError};
pub use graph::{Atom, Bond, BondOrder, MolGraph};
pub use molecule::{smiles_from_raw_input, Molecule};
pub use properties::{compute_properties, Properties, PropertiesUnit};
pub use rules::{InvalidStructureRule, ValidStructureRule};
pub use smiles::{parse_smiles, MAX_SMILES_BYTES};
pub use validity::{check_smiles, validate_smiles, ValidityReport, ValidityUnit};
