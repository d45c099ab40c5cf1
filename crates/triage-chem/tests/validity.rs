//! Integration tests for structure validity, canonical forms and batches.

use triage_chem::{
    canonicalize, check_smiles, compute_properties, validate_batch, validate_smiles, Molecule,
    SmilesError,
};

const CHOLESTEROL: &str = "CC(C)CCCC(C)C1CCC2C1(CCC3C2CC=C4C3(CCC(C4)O)C)C";

// ── Valid structures ──

#[test]
fn ethanol_is_valid() {
    assert_eq!(validate_smiles("CCO"), Ok(()));
}

#[test]
fn benzene_has_six_atoms() {
    let report = check_smiles("c1ccccc1");
    assert!(report.is_valid);
    assert_eq!(report.num_atoms, 6);
    assert_eq!(report.num_bonds, 6);
}

#[test]
fn single_carbon_has_one_atom() {
    let report = check_smiles("C");
    assert!(report.is_valid);
    assert_eq!(report.num_atoms, 1);
    assert_eq!(report.num_bonds, 0);
}

#[test]
fn cholesterol_is_large_and_valid() {
    let report = check_smiles(CHOLESTEROL);
    assert!(report.is_valid, "{:?}", report.error_message);
    assert!(report.num_atoms > 20);
    let props = compute_properties(CHOLESTEROL).unwrap();
    assert_eq!(props.formula, "C27H46O");
    assert_eq!(props.ring_count, 4);
}

#[test]
fn charged_and_radical_brackets_are_valid() {
    assert_eq!(validate_smiles("[NH4+]"), Ok(()));
    assert_eq!(validate_smiles("[CH3]"), Ok(()));
    assert_eq!(validate_smiles("[O-]C(=O)C"), Ok(()));
}

#[test]
fn surrounding_whitespace_is_ignored() {
    assert_eq!(validate_smiles("  CCO \n"), Ok(()));
}

#[test]
fn aromatic_rings_with_kekule_form_are_valid() {
    for input in ["c1ccccc1", "c1cc[nH]c1", "o1cccc1", "c1ccncc1", "O=c1cc[nH]cc1", "Cn1cccc1"] {
        assert_eq!(validate_smiles(input), Ok(()), "input {input}");
    }
}

// ── Invalid structures ──

#[test]
fn pentavalent_carbon_is_invalid() {
    let err = validate_smiles("C(C)(C)(C)(C)C").unwrap_err();
    assert!(err.contains("valence"), "{err}");
}

#[test]
fn empty_and_whitespace_report_empty() {
    for input in ["", "   "] {
        let err = validate_smiles(input).unwrap_err();
        assert!(err.to_lowercase().contains("empty"), "{err}");
    }
}

#[test]
fn unbalanced_branches_are_invalid() {
    assert!(validate_smiles("C(((").is_err());
    assert!(validate_smiles("CC)C").is_err());
}

#[test]
fn plain_words_are_invalid() {
    assert!(validate_smiles("invalid").is_err());
}

#[test]
fn aromatic_ring_without_kekule_form_is_invalid() {
    for input in ["c1cccc1", "c1ccnc1"] {
        let err = validate_smiles(input).unwrap_err();
        assert!(err.contains("kekulize"), "input {input}: {err}");
    }
}

#[test]
fn aromatic_carbon_with_four_bonds_is_invalid() {
    assert_eq!(
        canonicalize("c1ccc(C)(C)cc1"),
        Err(SmilesError::Kekulize { atoms: vec![3] })
    );
}

#[test]
fn aromatic_chain_is_invalid() {
    assert!(matches!(
        canonicalize("cccc"),
        Err(SmilesError::NonRingAromatic { .. })
    ));
}

// ── Canonical forms ──

#[test]
fn equivalent_inputs_share_canonical_form() {
    assert_eq!(canonicalize("OCC").unwrap(), canonicalize("CCO").unwrap());
    assert_eq!(
        canonicalize("C1=CC=CC=C1").unwrap(),
        canonicalize("C=1C=CC=CC=1").unwrap()
    );
    assert_eq!(
        canonicalize("c1ccccc1O").unwrap(),
        canonicalize("Oc1ccccc1").unwrap()
    );
}

#[test]
fn kekule_and_aromatic_spellings_share_canonical_form() {
    let pairs = [
        ("C1=CC=CC=C1", "c1ccccc1"),
        ("CC1=CC=CC=C1", "Cc1ccccc1"),
        ("C1=CNC=C1", "c1cc[nH]c1"),
        ("C1=CC=C2C=CC=CC2=C1", "c1ccc2ccccc2c1"),
    ];
    for (kekule, aromatic) in pairs {
        assert_eq!(
            canonicalize(kekule).unwrap(),
            canonicalize(aromatic).unwrap(),
            "{kekule} vs {aromatic}"
        );
    }
    assert_eq!(canonicalize("C1=CC=CC=C1").unwrap(), "c1ccccc1");
    assert_eq!(
        compute_properties("C1=CC=CC=C1").unwrap().num_aromatic_atoms,
        6
    );
}

#[test]
fn non_huckel_rings_stay_kekule() {
    for input in ["C1=CCC=CC1", "O=C1C=CC(=O)C=C1", "C1=CC=CC=CC=C1"] {
        let canonical = canonicalize(input).unwrap();
        assert!(
            !canonical.chars().any(|c| c.is_ascii_lowercase()),
            "{input} -> {canonical}"
        );
    }
}

#[test]
fn canonical_form_reparses_to_itself() {
    for input in [
        "CC(=O)Oc1ccccc1C(=O)O",
        CHOLESTEROL,
        "[NH4+].[Cl-]",
        "C1CC1C#N",
        "O=c1cc[nH]cc1",
        "C1=CC2=CC=CC=CC2=C1",
    ] {
        let once = canonicalize(input).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert_eq!(once, twice, "input {input}");
    }
}

#[test]
fn report_carries_canonical_form() {
    let report = check_smiles("OCC");
    assert_eq!(report.smiles_canonical.as_deref(), Some("CCO"));
}

// ── Batches ──

#[test]
fn batch_counts_valid_and_invalid() {
    let molecules = vec![
        Molecule::new("MOL_001", "CCO").unwrap(),
        Molecule::new("MOL_002", "c1ccccc1").unwrap(),
        Molecule::new("MOL_003", "invalid").unwrap(),
        Molecule::new("MOL_004", "C(C)(C)(C)(C)C").unwrap(),
    ];
    let summary = validate_batch(&molecules);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.valid, 2);
    assert_eq!(summary.invalid, 2);
    assert_eq!(summary.valid_ids, vec!["MOL_001", "MOL_002"]);
    assert_eq!(summary.invalid_ids, vec!["MOL_003", "MOL_004"]);
    assert_eq!(summary.errors.len(), 2);
    assert!(summary.errors.contains_key("MOL_003"));
}
