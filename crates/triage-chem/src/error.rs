//! Chemistry error types.

/// SMILES parse and sanitization failures. Positions are byte offsets into
/// the trimmed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SmilesError {
    #[error("SMILES string is empty or whitespace-only")]
    Empty,

    #[error("SMILES input exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        max_bytes: usize,
        actual_bytes: usize,
    },

    #[error("unexpected character '{found}' at {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("unknown element '{symbol}' at {position}")]
    UnknownElement { symbol: String, position: usize },

    #[error("element '{symbol}' at {position} cannot be aromatic")]
    InvalidAromatic { symbol: String, position: usize },

    #[error("unterminated bracket atom starting at {position}")]
    UnterminatedBracket { position: usize },

    #[error("invalid bracket atom at {position}: {reason}")]
    InvalidBracket {
        position: usize,
        reason: &'static str,
    },

    #[error("unbalanced parenthesis at {position}")]
    UnbalancedBranch { position: usize },

    #[error("empty branch at {position}")]
    EmptyBranch { position: usize },

    #[error("bond at {position} is not followed by an atom")]
    DanglingBond { position: usize },

    #[error("unclosed ring bond {label}")]
    UnclosedRing { label: u16 },

    #[error("conflicting bond orders on ring closure {label} at {position}")]
    RingBondConflict { label: u16, position: usize },

    #[error("ring closure {label} at {position} bonds an atom to itself")]
    SelfBond { label: u16, position: usize },

    #[error("duplicate bond between atoms {first} and {second}")]
    DuplicateBond { first: usize, second: usize },

    #[error("explicit valence for atom #{index} {symbol}, {valence}, is greater than permitted")]
    Valence {
        index: usize,
        symbol: String,
        valence: u32,
    },

    #[error("non-ring atom #{index} {symbol} marked aromatic")]
    NonRingAromatic { index: usize, symbol: String },

    #[error("can't kekulize aromatic system; unmatched atoms: {}", join_indices(atoms))]
    Kekulize { atoms: Vec<usize> },

    #[error("molecule has zero atoms (empty structure)")]
    NoAtoms,
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors building [`Molecule`](crate::Molecule) values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChemError {
    #[error("molecule_id cannot be empty or whitespace")]
    EmptyId,

    #[error("smiles cannot be empty or whitespace")]
    EmptySmiles,

    #[error("raw input carries no SMILES string")]
    MissingSmiles,

    #[error(transparent)]
    Smiles(#[from] SmilesError),
}

/// Result type for chemistry operations.
pub type Result<T> = std::result::Result<T, ChemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_mentions_empty() {
        assert!(SmilesError::Empty.to_string().to_lowercase().contains("empty"));
    }

    #[test]
    fn test_valence_message() {
        let err = SmilesError::Valence {
            index: 1,
            symbol: "C".to_string(),
            valence: 5,
        };
        assert_eq!(
            err.to_string(),
            "explicit valence for atom #1 C, 5, is greater than permitted"
        );
    }

    #[test]
    fn test_kekulize_message_lists_atoms() {
        let err = SmilesError::Kekulize {
            atoms: vec![0, 3, 4],
        };
        assert_eq!(
            err.to_string(),
            "can't kekulize aromatic system; unmatched atoms: 0 3 4"
        );
    }
}
