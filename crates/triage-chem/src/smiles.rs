//! SMILES parser.
//!
//! ### Grammar (informal)
//! - **Atoms**: organic subset `B C N O P S F Cl Br I *`, aromatic
//!   `b c n o p s`, or bracket atoms `[isotope? symbol chirality? Hn? charge? :class?]`
//! - **Bonds**: `-` `=` `#` `$` `:` and the directional `/` `\` (read as single)
//! - **Branches**: `( ... )` after an atom
//! - **Ring closures**: digits `0-9` or `%nn`, optionally preceded by a bond
//! - **Components**: `.` separates disconnected fragments
//!
//! Chirality markers are accepted and dropped. Parsing is followed by
//! sanitization, so a successful parse means a chemically plausible graph.

use std::collections::BTreeMap;

use crate::element::{self, Element};
use crate::error::SmilesError;
use crate::graph::{Atom, BondOrder, MolGraph};

/// Maximum accepted SMILES length in bytes.
pub const MAX_SMILES_BYTES: usize = 16 * 1024;

/// Parse and sanitize a SMILES string. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`SmilesError`] for empty input, syntax errors, unknown elements,
/// ring or branch mismatches and valence or aromaticity violations.
pub fn parse_smiles(input: &str) -> Result<MolGraph, SmilesError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::Empty);
    }
    if trimmed.len() > MAX_SMILES_BYTES {
        return Err(SmilesError::TooLarge {
            max_bytes: MAX_SMILES_BYTES,
            actual_bytes: trimmed.len(),
        });
    }
    Parser::new(trimmed).parse()?.sanitize()
}

/// Ring bond opened but not yet closed.
struct OpenRing {
    atom: usize,
    order: Option<BondOrder>,
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    offset: usize,
    graph: MolGraph,
    /// Atom the next bond attaches to.
    previous: Option<usize>,
    /// Explicit bond waiting for its second atom, with its position.
    pending_bond: Option<(BondOrder, usize)>,
    /// Branch points with the position of their `(`.
    branches: Vec<(usize, usize)>,
    rings: BTreeMap<u16, OpenRing>,
    /// Set right after `(`; cleared by the first atom of the branch.
    branch_opened: bool,
    /// Position of a `.` not yet followed by an atom.
    open_dot: Option<usize>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
            graph: MolGraph::default(),
            previous: None,
            pending_bond: None,
            branches: Vec::new(),
            rings: BTreeMap::new(),
            branch_opened: false,
            open_dot: None,
        }
    }

    fn parse(mut self) -> Result<MolGraph, SmilesError> {
        while let Some(&byte) = self.bytes.get(self.offset) {
            match byte {
                b'(' => self.open_branch()?,
                b')' => self.close_branch()?,
                b'-' | b'=' | b'#' | b'$' | b':' | b'/' | b'\\' => self.bond(byte)?,
                b'.' => self.dot()?,
                b'0'..=b'9' | b'%' => self.ring_closure()?,
                b'[' => self.bracket_atom()?,
                _ => self.organic_atom()?,
            }
        }

        if let Some((_, position)) = self.pending_bond {
            return Err(SmilesError::DanglingBond { position });
        }
        if let Some(&(_, position)) = self.branches.last() {
            return Err(SmilesError::UnbalancedBranch { position });
        }
        if let Some((&label, _)) = self.rings.iter().next() {
            return Err(SmilesError::UnclosedRing { label });
        }
        if let Some(position) = self.open_dot {
            return Err(self.unexpected_at(position));
        }
        Ok(self.graph)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    fn open_branch(&mut self) -> Result<(), SmilesError> {
        let Some(atom) = self.previous else {
            return Err(self.unexpected());
        };
        if self.branch_opened {
            return Err(self.unexpected());
        }
        if let Some((_, position)) = self.pending_bond {
            return Err(SmilesError::DanglingBond { position });
        }
        self.branches.push((atom, self.offset));
        self.branch_opened = true;
        self.offset += 1;
        Ok(())
    }

    fn close_branch(&mut self) -> Result<(), SmilesError> {
        if self.branch_opened {
            return Err(SmilesError::EmptyBranch {
                position: self.offset,
            });
        }
        if let Some((_, position)) = self.pending_bond {
            return Err(SmilesError::DanglingBond { position });
        }
        if let Some(position) = self.open_dot {
            return Err(self.unexpected_at(position));
        }
        let Some((atom, _)) = self.branches.pop() else {
            return Err(SmilesError::UnbalancedBranch {
                position: self.offset,
            });
        };
        self.previous = Some(atom);
        self.offset += 1;
        Ok(())
    }

    fn bond(&mut self, byte: u8) -> Result<(), SmilesError> {
        if self.pending_bond.is_some() || self.previous.is_none() {
            return Err(self.unexpected());
        }
        let order = match byte {
            b'=' => BondOrder::Double,
            b'#' => BondOrder::Triple,
            b'$' => BondOrder::Quadruple,
            b':' => BondOrder::Aromatic,
            _ => BondOrder::Single,
        };
        self.pending_bond = Some((order, self.offset));
        self.offset += 1;
        Ok(())
    }

    fn dot(&mut self) -> Result<(), SmilesError> {
        if self.previous.is_none() || self.branch_opened {
            return Err(self.unexpected());
        }
        if let Some((_, position)) = self.pending_bond {
            return Err(SmilesError::DanglingBond { position });
        }
        self.previous = None;
        self.open_dot = Some(self.offset);
        self.offset += 1;
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), SmilesError> {
        let position = self.offset;
        let Some(atom) = self.previous else {
            return Err(self.unexpected());
        };
        if self.branch_opened {
            return Err(self.unexpected());
        }
        let label = self.ring_label()?;
        let order = self.pending_bond.take().map(|(order, _)| order);

        match self.rings.remove(&label) {
            Some(open) => {
                if open.atom == atom {
                    return Err(SmilesError::SelfBond { label, position });
                }
                let order = match (open.order, order) {
                    (Some(first), Some(second)) if first != second => {
                        return Err(SmilesError::RingBondConflict { label, position });
                    }
                    (Some(order), _) | (None, Some(order)) => order,
                    (None, None) => self.default_order(open.atom, atom),
                };
                if self.graph.has_bond(open.atom, atom) {
                    return Err(SmilesError::DuplicateBond {
                        first: open.atom,
                        second: atom,
                    });
                }
                self.graph.add_bond(open.atom, atom, order);
            }
            None => {
                self.rings.insert(label, OpenRing { atom, order });
            }
        }
        Ok(())
    }

    fn ring_label(&mut self) -> Result<u16, SmilesError> {
        if self.bytes[self.offset] == b'%' {
            let digits = self
                .bytes
                .get(self.offset + 1..self.offset + 3)
                .filter(|d| d.iter().all(u8::is_ascii_digit));
            let Some(digits) = digits else {
                return Err(self.unexpected());
            };
            let label = u16::from(digits[0] - b'0') * 10 + u16::from(digits[1] - b'0');
            self.offset += 3;
            Ok(label)
        } else {
            let label = u16::from(self.bytes[self.offset] - b'0');
            self.offset += 1;
            Ok(label)
        }
    }

    // ------------------------------------------------------------------
    // Atoms
    // ------------------------------------------------------------------

    fn organic_atom(&mut self) -> Result<(), SmilesError> {
        let start = self.offset;
        let (symbol, aromatic, len) = match self.bytes[start] {
            b'C' if self.bytes.get(start + 1) == Some(&b'l') => ("Cl", false, 2),
            b'B' if self.bytes.get(start + 1) == Some(&b'r') => ("Br", false, 2),
            b'B' => ("B", false, 1),
            b'C' => ("C", false, 1),
            b'N' => ("N", false, 1),
            b'O' => ("O", false, 1),
            b'P' => ("P", false, 1),
            b'S' => ("S", false, 1),
            b'F' => ("F", false, 1),
            b'I' => ("I", false, 1),
            b'*' => ("*", false, 1),
            b'b' => ("B", true, 1),
            b'c' => ("C", true, 1),
            b'n' => ("N", true, 1),
            b'o' => ("O", true, 1),
            b'p' => ("P", true, 1),
            b's' => ("S", true, 1),
            _ => return Err(self.unexpected()),
        };
        let element = self.element(symbol, start)?;
        self.offset += len;
        self.attach(Atom::organic(element, aromatic));
        Ok(())
    }

    fn bracket_atom(&mut self) -> Result<(), SmilesError> {
        let start = self.offset;
        self.offset += 1;

        let isotope = match self.digits() {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| SmilesError::InvalidBracket {
                position: start,
                reason: "isotope out of range",
            })?),
            None => None,
        };

        let (element, aromatic) = self.bracket_symbol(start)?;
        self.skip_chirality();

        let mut hydrogens = 0u8;
        if self.peek() == Some(b'H') {
            self.offset += 1;
            hydrogens = match self.digits() {
                Some(raw) => raw.parse::<u8>().map_err(|_| SmilesError::InvalidBracket {
                    position: start,
                    reason: "hydrogen count out of range",
                })?,
                None => 1,
            };
        }

        let charge = self.charge(start)?;

        let mut atom_class = None;
        if self.peek() == Some(b':') {
            self.offset += 1;
            let raw = self.digits().ok_or(SmilesError::InvalidBracket {
                position: start,
                reason: "atom class must be numeric",
            })?;
            atom_class = Some(raw.parse::<u32>().map_err(|_| SmilesError::InvalidBracket {
                position: start,
                reason: "atom class out of range",
            })?);
        }

        match self.peek() {
            Some(b']') => self.offset += 1,
            Some(_) => return Err(self.unexpected()),
            None => return Err(SmilesError::UnterminatedBracket { position: start }),
        }

        self.attach(Atom::bracket(
            element, aromatic, isotope, hydrogens, charge, atom_class,
        ));
        Ok(())
    }

    fn bracket_symbol(&mut self, start: usize) -> Result<(&'static Element, bool), SmilesError> {
        let position = self.offset;
        let Some(first) = self.peek() else {
            return Err(SmilesError::UnterminatedBracket { position: start });
        };
        let second = self.bytes.get(position + 1).copied();

        if first == b'*' {
            self.offset += 1;
            return Ok((&element::WILDCARD, false));
        }

        if first.is_ascii_uppercase() {
            if let Some(second) = second.filter(u8::is_ascii_lowercase) {
                let two = [first, second];
                let symbol = std::str::from_utf8(&two).unwrap_or_default();
                if let Some(element) = element::lookup(symbol) {
                    self.offset += 2;
                    return Ok((element, false));
                }
            }
            let symbol = char::from(first).to_string();
            let element = self.element(&symbol, position)?;
            self.offset += 1;
            return Ok((element, false));
        }

        if first.is_ascii_lowercase() {
            if let Some(second) = second.filter(u8::is_ascii_lowercase) {
                let symbol = match [first, second] {
                    [b's', b'e'] => Some("Se"),
                    [b'a', b's'] => Some("As"),
                    [b't', b'e'] => Some("Te"),
                    _ => None,
                };
                if let Some(symbol) = symbol {
                    let element = self.element(symbol, position)?;
                    self.offset += 2;
                    return Ok((element, true));
                }
            }
            let symbol = char::from(first.to_ascii_uppercase()).to_string();
            let element = self.element(&symbol, position)?;
            if !element.is_organic_aromatic() {
                return Err(SmilesError::InvalidAromatic {
                    symbol: char::from(first).to_string(),
                    position,
                });
            }
            self.offset += 1;
            return Ok((element, true));
        }

        Err(self.unexpected())
    }

    /// Skip `@`, `@@` and the `@TH1`-style extended forms.
    fn skip_chirality(&mut self) {
        if self.peek() != Some(b'@') {
            return;
        }
        while self.peek() == Some(b'@') {
            self.offset += 1;
        }
        let class = self.bytes.get(self.offset..self.offset + 2);
        if matches!(class, Some(b"TH" | b"AL" | b"SP" | b"TB" | b"OH")) {
            self.offset += 2;
            self.digits();
        }
    }

    fn charge(&mut self, start: usize) -> Result<i8, SmilesError> {
        let sign = match self.peek() {
            Some(b'+') => 1i8,
            Some(b'-') => -1i8,
            _ => return Ok(0),
        };
        let sign_byte = self.bytes[self.offset];
        self.offset += 1;

        if let Some(raw) = self.digits() {
            let magnitude = raw.parse::<i8>().map_err(|_| SmilesError::InvalidBracket {
                position: start,
                reason: "charge out of range",
            })?;
            return Ok(sign * magnitude);
        }

        let mut magnitude = 1i8;
        while self.peek() == Some(sign_byte) {
            self.offset += 1;
            magnitude = magnitude.saturating_add(1);
        }
        Ok(sign * magnitude)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn attach(&mut self, atom: Atom) {
        let index = self.graph.add_atom(atom);
        if let Some(previous) = self.previous {
            let order = match self.pending_bond.take() {
                Some((order, _)) => order,
                None => self.default_order(previous, index),
            };
            self.graph.add_bond(previous, index, order);
        }
        self.previous = Some(index);
        self.branch_opened = false;
        self.open_dot = None;
    }

    /// Implicit bond: aromatic between two aromatic atoms, else single.
    fn default_order(&self, a: usize, b: usize) -> BondOrder {
        let atoms = self.graph.atoms();
        if atoms[a].aromatic && atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn element(&self, symbol: &str, position: usize) -> Result<&'static Element, SmilesError> {
        element::lookup(symbol).ok_or_else(|| SmilesError::UnknownElement {
            symbol: symbol.to_string(),
            position,
        })
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    /// Consume a run of ASCII digits.
    fn digits(&mut self) -> Option<&'a str> {
        let start = self.offset;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.offset += 1;
        }
        let end = self.offset;
        let input = self.input;
        (end > start).then(|| &input[start..end])
    }

    fn unexpected(&self) -> SmilesError {
        self.unexpected_at(self.offset)
    }

    fn unexpected_at(&self, position: usize) -> SmilesError {
        let found = self.input[position..].chars().next().unwrap_or('\0');
        SmilesError::UnexpectedChar { found, position }
    }
}
