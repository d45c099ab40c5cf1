//! Kekulization and aromaticity perception.
//!
//! Sanitization first proves that written aromaticity has a Kekulé form:
//! every aromatic atom left one valence short by its sigma bonds and
//! hydrogens must take exactly one double bond to another such atom, which
//! is a perfect matching over those atoms. The matched bonds become double
//! and the rest single.
//!
//! Aromaticity is then perceived again from the Kekulé form. A ring is
//! aromatic when every atom contributes to the pi system and the electron
//! count is 4n+2; rings that fail alone are retried fused with a neighbour
//! sharing one bond (azulene). Kekulé and aromatic spellings of the same
//! structure therefore sanitize to the same graph.

use std::collections::{HashSet, VecDeque};

use crate::error::SmilesError;
use crate::graph::{BondOrder, MolGraph};

/// Replace aromatic bonds with an alternating single/double assignment and
/// clear the aromatic flags.
pub(crate) fn kekulize(graph: &mut MolGraph) -> Result<(), SmilesError> {
    let n = graph.atom_count();
    let mut needs_double = vec![false; n];
    for atom in 0..n {
        if !graph.atoms()[atom].aromatic {
            continue;
        }
        match pi_demand(graph, atom) {
            PiDemand::Double => needs_double[atom] = true,
            PiDemand::Satisfied => {}
            PiDemand::Impossible => return Err(SmilesError::Kekulize { atoms: vec![atom] }),
        }
    }

    let adjacency: Vec<Vec<usize>> = (0..n)
        .map(|atom| {
            if !needs_double[atom] {
                return Vec::new();
            }
            graph
                .neighbors(atom)
                .iter()
                .filter(|&&(other, bond)| {
                    needs_double[other] && graph.bonds()[bond].order == BondOrder::Aromatic
                })
                .map(|&(other, _)| other)
                .collect()
        })
        .collect();

    let mate = maximum_matching(&adjacency);
    let unmatched: Vec<usize> = (0..n)
        .filter(|&atom| needs_double[atom] && mate[atom].is_none())
        .collect();
    if !unmatched.is_empty() {
        return Err(SmilesError::Kekulize { atoms: unmatched });
    }

    for index in 0..graph.bond_count() {
        let bond = graph.bonds()[index];
        if bond.order != BondOrder::Aromatic {
            continue;
        }
        let order = if mate[bond.begin] == Some(bond.end) {
            BondOrder::Double
        } else {
            BondOrder::Single
        };
        graph.set_bond_order(index, order);
    }
    for atom in 0..n {
        graph.set_aromatic(atom, false);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PiDemand {
    /// One valence short: needs a double bond inside the aromatic system.
    Double,
    /// Valence complete with a lone pair, an empty orbital or an exocyclic
    /// double bond (pyrrole `[nH]`, furan `o`, pyridone `c(=O)`).
    Satisfied,
    Impossible,
}

fn pi_demand(graph: &MolGraph, atom: usize) -> PiDemand {
    let a = &graph.atoms()[atom];
    let Some(allowed) = a.element.allowed_valences(a.charge) else {
        return PiDemand::Satisfied;
    };
    let hydrogens = u32::from(a.hydrogen_count());
    let used = graph.bond_valence(atom) + hydrogens;
    let permits = |valence: u32| allowed.iter().any(|&v| u32::from(v) == valence);

    if permits(used) {
        let has_double = graph
            .neighbors(atom)
            .iter()
            .any(|&(_, bond)| graph.bonds()[bond].order == BondOrder::Double);
        let connections = graph.degree(atom) + usize::from(a.hydrogen_count());
        if has_double || connections <= 3 {
            PiDemand::Satisfied
        } else {
            PiDemand::Impossible
        }
    } else if permits(used + 1) {
        PiDemand::Double
    } else {
        PiDemand::Impossible
    }
}

const UNMATCHED: usize = usize::MAX;

/// Maximum cardinality matching (Edmonds' blossom algorithm). Returns the
/// partner of every vertex.
fn maximum_matching(adjacency: &[Vec<usize>]) -> Vec<Option<usize>> {
    let n = adjacency.len();
    let mut search = Blossom {
        adjacency,
        mate: vec![UNMATCHED; n],
        parent: vec![UNMATCHED; n],
        base: (0..n).collect(),
        queued: vec![false; n],
        in_blossom: vec![false; n],
        queue: VecDeque::new(),
    };

    for v in 0..n {
        if search.mate[v] != UNMATCHED {
            continue;
        }
        if let Some(&w) = adjacency[v].iter().find(|&&w| search.mate[w] == UNMATCHED) {
            search.mate[v] = w;
            search.mate[w] = v;
        }
    }
    for root in 0..n {
        if search.mate[root] == UNMATCHED && !adjacency[root].is_empty() {
            if let Some(end) = search.augmenting_path(root) {
                search.augment(end);
            }
        }
    }

    search
        .mate
        .into_iter()
        .map(|w| (w != UNMATCHED).then_some(w))
        .collect()
}

struct Blossom<'a> {
    adjacency: &'a [Vec<usize>],
    mate: Vec<usize>,
    parent: Vec<usize>,
    base: Vec<usize>,
    queued: Vec<bool>,
    in_blossom: Vec<bool>,
    queue: VecDeque<usize>,
}

impl Blossom<'_> {
    /// Grow an alternating tree from `root`; returns the free vertex that
    /// ends an augmenting path.
    fn augmenting_path(&mut self, root: usize) -> Option<usize> {
        let adjacency = self.adjacency;
        self.parent.fill(UNMATCHED);
        self.queued.fill(false);
        for (v, base) in self.base.iter_mut().enumerate() {
            *base = v;
        }
        self.queue.clear();
        self.queued[root] = true;
        self.queue.push_back(root);

        while let Some(v) = self.queue.pop_front() {
            for &to in &adjacency[v] {
                if self.base[v] == self.base[to] || self.mate[v] == to {
                    continue;
                }
                let odd_cycle = to == root
                    || (self.mate[to] != UNMATCHED && self.parent[self.mate[to]] != UNMATCHED);
                if odd_cycle {
                    self.contract(v, to);
                } else if self.parent[to] == UNMATCHED {
                    self.parent[to] = v;
                    if self.mate[to] == UNMATCHED {
                        return Some(to);
                    }
                    let next = self.mate[to];
                    self.queued[next] = true;
                    self.queue.push_back(next);
                }
            }
        }
        None
    }

    fn contract(&mut self, v: usize, to: usize) {
        let base = self.common_base(v, to);
        self.in_blossom.fill(false);
        self.mark_path(v, base, to);
        self.mark_path(to, base, v);
        for u in 0..self.base.len() {
            if self.in_blossom[self.base[u]] {
                self.base[u] = base;
                if !self.queued[u] {
                    self.queued[u] = true;
                    self.queue.push_back(u);
                }
            }
        }
    }

    fn common_base(&self, mut a: usize, mut b: usize) -> usize {
        let mut on_path = vec![false; self.base.len()];
        loop {
            a = self.base[a];
            on_path[a] = true;
            if self.mate[a] == UNMATCHED {
                break;
            }
            a = self.parent[self.mate[a]];
        }
        loop {
            b = self.base[b];
            if on_path[b] {
                return b;
            }
            b = self.parent[self.mate[b]];
        }
    }

    fn mark_path(&mut self, mut v: usize, base: usize, mut child: usize) {
        while self.base[v] != base {
            self.in_blossom[self.base[v]] = true;
            self.in_blossom[self.base[self.mate[v]]] = true;
            self.parent[v] = child;
            child = self.mate[v];
            v = self.parent[self.mate[v]];
        }
    }

    fn augment(&mut self, mut v: usize) {
        while v != UNMATCHED {
            let previous = self.parent[v];
            let next = self.mate[previous];
            self.mate[v] = previous;
            self.mate[previous] = v;
            v = next;
        }
    }
}

struct Ring {
    atoms: Vec<usize>,
    /// Sorted bond indices.
    bonds: Vec<usize>,
}

/// Mark Hückel rings of a Kekulé graph aromatic.
pub(crate) fn perceive(graph: &mut MolGraph) {
    let electrons: Vec<Option<u32>> = (0..graph.atom_count())
        .map(|atom| pi_electrons(graph, atom))
        .collect();
    let rings = candidate_rings(graph, &electrons);
    let huckel = |atoms: &[usize]| {
        let total: u32 = atoms.iter().filter_map(|&atom| electrons[atom]).sum();
        total % 4 == 2
    };

    let mut aromatic: Vec<bool> = rings.iter().map(|ring| huckel(&ring.atoms)).collect();

    let mut rings_by_bond = vec![Vec::new(); graph.bond_count()];
    for (index, ring) in rings.iter().enumerate() {
        for &bond in &ring.bonds {
            rings_by_bond[bond].push(index);
        }
    }
    let mut fused = HashSet::new();
    for members in &rings_by_bond {
        for (k, &i) in members.iter().enumerate() {
            for &j in &members[k + 1..] {
                if (aromatic[i] && aromatic[j]) || !fused.insert((i, j)) {
                    continue;
                }
                if shared_bonds(&rings[i].bonds, &rings[j].bonds) != 1 {
                    continue;
                }
                let mut atoms: Vec<usize> =
                    rings[i].atoms.iter().chain(&rings[j].atoms).copied().collect();
                atoms.sort_unstable();
                atoms.dedup();
                if huckel(&atoms) {
                    aromatic[i] = true;
                    aromatic[j] = true;
                }
            }
        }
    }

    for (ring, &is_aromatic) in rings.iter().zip(&aromatic) {
        if !is_aromatic {
            continue;
        }
        for &atom in &ring.atoms {
            graph.set_aromatic(atom, true);
        }
        for &bond in &ring.bonds {
            graph.set_bond_order(bond, BondOrder::Aromatic);
        }
    }
}

/// Pi electrons `atom` donates to a ring, `None` when it cannot be part of
/// an aromatic ring.
fn pi_electrons(graph: &MolGraph, atom: usize) -> Option<u32> {
    let a = &graph.atoms()[atom];
    if !a.element.can_be_aromatic() || !graph.is_ring_atom(atom) {
        return None;
    }
    let mut ring_double = false;
    let mut exocyclic_double = false;
    for &(_, bond) in graph.neighbors(atom) {
        match graph.bonds()[bond].order {
            BondOrder::Double if graph.is_ring_bond(bond) => ring_double = true,
            BondOrder::Double => exocyclic_double = true,
            BondOrder::Triple | BondOrder::Quadruple => return None,
            BondOrder::Single | BondOrder::Aromatic => {}
        }
    }
    if ring_double {
        return Some(1);
    }
    if exocyclic_double {
        return Some(0);
    }

    if graph.degree(atom) + usize::from(a.hydrogen_count()) > 3 {
        return None;
    }
    let hydrogens = u32::from(a.hydrogen_count());
    let outer = i32::from(a.element.valence_electrons()?) - i32::from(a.charge);
    let used = i32::try_from(graph.bond_valence(atom) + hydrogens).ok()?;
    match outer - used {
        0 => Some(0),
        free if free >= 2 => Some(2),
        _ => None,
    }
}

/// Smallest ring through each ring bond whose atoms can all contribute.
fn candidate_rings(graph: &MolGraph, electrons: &[Option<u32>]) -> Vec<Ring> {
    let mut seen = HashSet::new();
    let mut rings = Vec::new();
    for (index, bond) in graph.bonds().iter().enumerate() {
        if !graph.is_ring_bond(index)
            || electrons[bond.begin].is_none()
            || electrons[bond.end].is_none()
        {
            continue;
        }
        if let Some(ring) = ring_through(graph, index, electrons) {
            if seen.insert(ring.bonds.clone()) {
                rings.push(ring);
            }
        }
    }
    rings
}

/// Breadth-first search from one end of `bond` back to the other end,
/// without using `bond` itself.
fn ring_through(graph: &MolGraph, bond: usize, electrons: &[Option<u32>]) -> Option<Ring> {
    let (start, goal) = (graph.bonds()[bond].begin, graph.bonds()[bond].end);
    let mut via: Vec<Option<(usize, usize)>> = vec![None; graph.atom_count()];
    let mut visited = vec![false; graph.atom_count()];
    visited[start] = true;
    let mut queue = VecDeque::from([start]);

    while let Some(atom) = queue.pop_front() {
        if atom == goal {
            break;
        }
        for &(next, b) in graph.neighbors(atom) {
            if b == bond || visited[next] || !graph.is_ring_bond(b) || electrons[next].is_none() {
                continue;
            }
            visited[next] = true;
            via[next] = Some((atom, b));
            queue.push_back(next);
        }
    }
    if !visited[goal] {
        return None;
    }

    let mut atoms = vec![goal];
    let mut bonds = vec![bond];
    let mut current = goal;
    while let Some((previous, b)) = via[current] {
        atoms.push(previous);
        bonds.push(b);
        current = previous;
    }
    bonds.sort_unstable();
    Some(Ring { atoms, bonds })
}

fn shared_bonds(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}
