//! Molecular graph produced by the SMILES parser.
//!
//! Atoms and bonds are stored in input order. [`MolGraph::sanitize`] derives
//! ring membership and connected components, assigns implicit hydrogens to
//! organic-subset atoms, checks valences and kekulizes aromatic systems
//! before perceiving aromaticity afresh. Every graph handed out by
//! [`parse_smiles`](crate::parse_smiles) has been sanitized.

use crate::aromatic;
use crate::element::Element;
use crate::error::SmilesError;

/// Bond multiplicity. Directional `/` and `\` bonds are single bonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Contribution to an atom's explicit valence. Aromatic bonds count as
    /// single bonds; the delocalized electron is accounted per atom.
    pub fn valence(self) -> u32 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BondOrder::Single => "-",
            BondOrder::Double => "=",
            BondOrder::Triple => "#",
            BondOrder::Quadruple => "$",
            BondOrder::Aromatic => ":",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: &'static Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Hydrogen count written inside brackets. `None` for organic-subset
    /// atoms, whose hydrogens are implicit.
    pub bracket_hydrogens: Option<u8>,
    pub atom_class: Option<u32>,
    implicit_hydrogens: u8,
}

impl Atom {
    pub fn organic(element: &'static Element, aromatic: bool) -> Self {
        Self {
            element,
            aromatic,
            charge: 0,
            isotope: None,
            bracket_hydrogens: None,
            atom_class: None,
            implicit_hydrogens: 0,
        }
    }

    pub fn bracket(
        element: &'static Element,
        aromatic: bool,
        isotope: Option<u16>,
        hydrogens: u8,
        charge: i8,
        atom_class: Option<u32>,
    ) -> Self {
        Self {
            element,
            aromatic,
            charge,
            isotope,
            bracket_hydrogens: Some(hydrogens),
            atom_class,
            implicit_hydrogens: 0,
        }
    }

    pub fn is_bracket(&self) -> bool {
        self.bracket_hydrogens.is_some()
    }

    /// Attached hydrogens, explicit or implicit.
    pub fn hydrogen_count(&self) -> u8 {
        self.bracket_hydrogens.unwrap_or(self.implicit_hydrogens)
    }

    pub fn symbol(&self) -> &'static str {
        self.element.symbol
    }

    /// Mass of the atom alone. An isotope label replaces the standard weight
    /// with its mass number.
    pub fn mass(&self) -> f64 {
        match self.isotope {
            Some(isotope) => f64::from(isotope),
            None => self.element.mass,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }
}

/// Atoms, bonds and derived topology of one structure.
#[derive(Debug, Clone, Default)]
pub struct MolGraph {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// Per atom: `(neighbor, bond index)` in bond creation order.
    neighbors: Vec<Vec<(usize, usize)>>,
    ring_bonds: Vec<bool>,
    components: usize,
}

impl MolGraph {
    pub(crate) fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.neighbors.push(Vec::new());
        self.atoms.len() - 1
    }

    pub(crate) fn add_bond(&mut self, begin: usize, end: usize, order: BondOrder) {
        let index = self.bonds.len();
        self.bonds.push(Bond { begin, end, order });
        self.neighbors[begin].push((end, index));
        self.neighbors[end].push((begin, index));
    }

    pub(crate) fn set_bond_order(&mut self, bond: usize, order: BondOrder) {
        self.bonds[bond].order = order;
    }

    pub(crate) fn set_aromatic(&mut self, atom: usize, aromatic: bool) {
        self.atoms[atom].aromatic = aromatic;
    }

    pub fn has_bond(&self, a: usize, b: usize) -> bool {
        self.neighbors
            .get(a)
            .is_some_and(|n| n.iter().any(|&(other, _)| other == b))
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.neighbors[atom]
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.neighbors[atom].len()
    }

    pub fn is_ring_bond(&self, bond: usize) -> bool {
        self.ring_bonds.get(bond).copied().unwrap_or(false)
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.neighbors[atom].iter().any(|&(_, b)| self.is_ring_bond(b))
    }

    /// Number of disconnected fragments.
    pub fn component_count(&self) -> usize {
        self.components
    }

    /// Independent cycles (bonds − atoms + components).
    pub fn ring_count(&self) -> usize {
        (self.bonds.len() + self.components).saturating_sub(self.atoms.len())
    }

    /// Sum of bond valence contributions at `atom`.
    pub fn bond_valence(&self, atom: usize) -> u32 {
        self.neighbors[atom]
            .iter()
            .map(|&(_, b)| self.bonds[b].order.valence())
            .sum()
    }

    /// Hydrogens `atom` would carry if written without brackets.
    pub fn unbracketed_hydrogens(&self, atom: usize) -> Option<u8> {
        let a = &self.atoms[atom];
        implicit_hydrogens(a.element, a.aromatic, self.bond_valence(atom))
    }

    /// Derive topology, assign implicit hydrogens, check valences and
    /// normalize aromaticity.
    pub(crate) fn sanitize(mut self) -> Result<Self, SmilesError> {
        if self.atoms.is_empty() {
            return Err(SmilesError::NoAtoms);
        }
        self.find_ring_bonds();

        for index in 0..self.atoms.len() {
            let atom = &self.atoms[index];
            if atom.aromatic && !self.is_ring_atom(index) {
                return Err(SmilesError::NonRingAromatic {
                    index,
                    symbol: atom.symbol().to_string(),
                });
            }

            let bond_valence = self.bond_valence(index);
            let valence_error = || SmilesError::Valence {
                index,
                symbol: atom.symbol().to_string(),
                valence: bond_valence + u32::from(atom.hydrogen_count()),
            };

            let implicit = match atom.bracket_hydrogens {
                None => implicit_hydrogens(atom.element, atom.aromatic, bond_valence)
                    .ok_or_else(valence_error)?,
                Some(explicit) => {
                    let total = bond_valence + u32::from(explicit);
                    if let Some(allowed) = atom.element.allowed_valences(atom.charge) {
                        let max = allowed.iter().copied().max().unwrap_or(0);
                        if total > u32::from(max) {
                            return Err(valence_error());
                        }
                    }
                    0
                }
            };
            self.atoms[index].implicit_hydrogens = implicit;
        }

        for (index, bond) in self.bonds.iter().enumerate() {
            if bond.order == BondOrder::Aromatic && !self.ring_bonds[index] {
                return Err(SmilesError::NonRingAromatic {
                    index: bond.begin,
                    symbol: self.atoms[bond.begin].symbol().to_string(),
                });
            }
        }

        aromatic::kekulize(&mut self)?;
        aromatic::perceive(&mut self);
        Ok(self)
    }

    /// Mark every bond that lies on a cycle (every non-bridge) and count
    /// connected components. Iterative Tarjan bridge search.
    fn find_ring_bonds(&mut self) {
        const UNVISITED: usize = usize::MAX;
        let n = self.atoms.len();
        let mut discovered = vec![UNVISITED; n];
        let mut low = vec![0usize; n];
        let mut bridge = vec![false; self.bonds.len()];
        let mut clock = 0usize;
        let mut components = 0usize;

        for root in 0..n {
            if discovered[root] != UNVISITED {
                continue;
            }
            components += 1;
            discovered[root] = clock;
            low[root] = clock;
            clock += 1;
            // (atom, bond used to reach it, next neighbor slot)
            let mut stack = vec![(root, UNVISITED, 0usize)];

            while let Some(top) = stack.last_mut() {
                let (atom, via) = (top.0, top.1);
                if top.2 < self.neighbors[atom].len() {
                    let (next, bond) = self.neighbors[atom][top.2];
                    top.2 += 1;
                    if bond == via {
                        continue;
                    }
                    if discovered[next] == UNVISITED {
                        discovered[next] = clock;
                        low[next] = clock;
                        clock += 1;
                        stack.push((next, bond, 0));
                    } else {
                        low[atom] = low[atom].min(discovered[next]);
                    }
                } else {
                    stack.pop();
                    if let Some(&(parent, _, _)) = stack.last() {
                        low[parent] = low[parent].min(low[atom]);
                        if low[atom] > discovered[parent] {
                            bridge[via] = true;
                        }
                    }
                }
            }
        }

        self.ring_bonds = bridge.into_iter().map(|is_bridge| !is_bridge).collect();
        self.components = components;
    }
}

/// Implicit hydrogen count of an organic-subset atom, `None` when the bonds
/// already exceed every permitted valence.
///
/// Aromatic atoms reserve one valence for the ring pi system when their
/// lowest valence allows it (benzene `c` gets one hydrogen, pyridine `n`
/// none). Atoms without a valence table get no hydrogens.
fn implicit_hydrogens(element: &Element, aromatic: bool, bond_valence: u32) -> Option<u8> {
    let allowed = element.valences();
    let Some(&max) = allowed.last() else {
        return Some(0);
    };
    if bond_valence > u32::from(max) {
        return None;
    }
    if aromatic {
        let lowest = u32::from(allowed[0]);
        let with_pi = bond_valence + 1;
        return Some(u8::try_from(lowest.saturating_sub(with_pi)).unwrap_or(0));
    }
    allowed
        .iter()
        .map(|&v| u32::from(v))
        .find(|&v| v >= bond_valence)
        .and_then(|v| u8::try_from(v - bond_valence).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::lookup;

    fn carbon() -> Atom {
        Atom::organic(lookup("C").unwrap(), false)
    }

    #[test]
    fn test_chain_has_no_ring_bonds() {
        let mut graph = MolGraph::default();
        let a = graph.add_atom(carbon());
        let b = graph.add_atom(carbon());
        let c = graph.add_atom(carbon());
        graph.add_bond(a, b, BondOrder::Single);
        graph.add_bond(b, c, BondOrder::Single);
        let graph = graph.sanitize().unwrap();
        assert!(!graph.is_ring_bond(0));
        assert!(!graph.is_ring_bond(1));
        assert_eq!(graph.ring_count(), 0);
        assert_eq!(graph.atoms()[0].hydrogen_count(), 3);
        assert_eq!(graph.atoms()[1].hydrogen_count(), 2);
    }

    #[test]
    fn test_triangle_with_tail() {
        let mut graph = MolGraph::default();
        let atoms: Vec<usize> = (0..4).map(|_| graph.add_atom(carbon())).collect();
        graph.add_bond(atoms[0], atoms[1], BondOrder::Single);
        graph.add_bond(atoms[1], atoms[2], BondOrder::Single);
        graph.add_bond(atoms[2], atoms[0], BondOrder::Single);
        graph.add_bond(atoms[2], atoms[3], BondOrder::Single);
        let graph = graph.sanitize().unwrap();
        assert!(graph.is_ring_bond(0));
        assert!(graph.is_ring_bond(1));
        assert!(graph.is_ring_bond(2));
        assert!(!graph.is_ring_bond(3));
        assert_eq!(graph.ring_count(), 1);
        assert_eq!(graph.component_count(), 1);
    }

    #[test]
    fn test_implicit_hydrogens() {
        let c = lookup("C").unwrap();
        let n = lookup("N").unwrap();
        let s = lookup("S").unwrap();
        assert_eq!(implicit_hydrogens(c, false, 0), Some(4));
        assert_eq!(implicit_hydrogens(c, false, 5), None);
        assert_eq!(implicit_hydrogens(c, true, 2), Some(1));
        assert_eq!(implicit_hydrogens(n, true, 2), Some(0));
        assert_eq!(implicit_hydrogens(s, true, 2), Some(0));
        assert_eq!(implicit_hydrogens(s, false, 3), Some(1));
    }

    #[test]
    fn test_aromatic_ring_without_kekule_form_rejected() {
        let mut graph = MolGraph::default();
        let c = lookup("C").unwrap();
        let atoms: Vec<usize> = (0..5)
            .map(|_| graph.add_atom(Atom::organic(c, true)))
            .collect();
        for i in 0..5 {
            graph.add_bond(atoms[i], atoms[(i + 1) % 5], BondOrder::Aromatic);
        }
        assert!(matches!(
            graph.sanitize(),
            Err(SmilesError::Kekulize { atoms }) if atoms.len() == 1
        ));
    }

    #[test]
    fn test_saturated_aromatic_carbon_rejected() {
        let mut graph = MolGraph::default();
        let c = lookup("C").unwrap();
        let ring: Vec<usize> = (0..6)
            .map(|_| graph.add_atom(Atom::organic(c, true)))
            .collect();
        for i in 0..6 {
            graph.add_bond(ring[i], ring[(i + 1) % 6], BondOrder::Aromatic);
        }
        let methyl = graph.add_atom(carbon());
        let ethyl = graph.add_atom(carbon());
        graph.add_bond(ring[0], methyl, BondOrder::Single);
        graph.add_bond(ring[0], ethyl, BondOrder::Single);
        assert_eq!(
            graph.sanitize().unwrap_err(),
            SmilesError::Kekulize { atoms: vec![ring[0]] }
        );
    }

    #[test]
    fn test_empty_graph_rejected() {
        assert_eq!(
            MolGraph::default().sanitize().unwrap_err(),
            SmilesError::NoAtoms
        );
    }
}
