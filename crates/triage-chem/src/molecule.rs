//! Candidate structure submitted for triage.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChemError, Result};

/// A candidate identified by `molecule_id` with its SMILES string.
///
/// Construction (including deserialization) rejects blank ids and blank
/// SMILES. The SMILES itself is not parsed here; that is the validity
/// unit's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MoleculeRepr")]
pub struct Molecule {
    molecule_id: String,
    smiles: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

#[derive(Deserialize)]
struct MoleculeRepr {
    molecule_id: String,
    smiles: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl TryFrom<MoleculeRepr> for Molecule {
    type Error = ChemError;

    fn try_from(repr: MoleculeRepr) -> Result<Self> {
        Ok(Self::new(repr.molecule_id, repr.smiles)?
            .with_name_opt(repr.name)
            .with_metadata(repr.metadata))
    }
}

impl Molecule {
    pub fn new(molecule_id: impl Into<String>, smiles: impl Into<String>) -> Result<Self> {
        let molecule_id = molecule_id.into();
        let smiles = smiles.into();
        if molecule_id.trim().is_empty() {
            return Err(ChemError::EmptyId);
        }
        if smiles.trim().is_empty() {
            return Err(ChemError::EmptySmiles);
        }
        Ok(Self {
            molecule_id,
            smiles,
            name: None,
            metadata: Map::new(),
        })
    }

    /// Build from an orchestrator raw input: either a bare SMILES string or
    /// an object with a `smiles` string and optional `name` / `metadata`.
    pub fn from_raw_input(molecule_id: impl Into<String>, raw_input: &Value) -> Result<Self> {
        let smiles = smiles_from_raw_input(raw_input).ok_or(ChemError::MissingSmiles)?;
        let molecule = Self::new(molecule_id, smiles)?;
        let Value::Object(fields) = raw_input else {
            return Ok(molecule);
        };
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let metadata = fields
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Ok(molecule.with_name_opt(name).with_metadata(metadata))
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_name_opt(Some(name.into()))
    }

    fn with_name_opt(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn molecule_id(&self) -> &str {
        &self.molecule_id
    }

    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Raw input for [`Orchestrator::run`](triage_core::Orchestrator::run).
    pub fn to_raw_input(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("smiles".to_string(), Value::String(self.smiles.clone()));
        if let Some(name) = &self.name {
            fields.insert("name".to_string(), Value::String(name.clone()));
        }
        if !self.metadata.is_empty() {
            fields.insert("metadata".to_string(), Value::Object(self.metadata.clone()));
        }
        Value::Object(fields)
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Molecule({}: {})", self.molecule_id, name),
            None => write!(f, "Molecule({})", self.molecule_id),
        }
    }
}

/// SMILES carried by a raw input, if any.
pub fn smiles_from_raw_input(raw_input: &Value) -> Option<&str> {
    match raw_input {
        Value::String(s) => Some(s.as_str()),
        Value::Object(fields) => fields.get("smiles").and_then(Value::as_str),
        _ => None,
    }
}
