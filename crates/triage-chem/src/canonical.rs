//! Canonical SMILES writer.
//!
//! Atoms are ranked by iterative refinement of graph invariants (degree,
//! element, isotope, charge, hydrogens, aromaticity, ring membership), with
//! ties broken one class at a time until every atom has a unique rank. The
//! writer then walks each component depth-first from its lowest-ranked atom,
//! visiting neighbours in rank order. Equivalent inputs therefore produce the
//! same string; stereo markers are not carried over.

use crate::error::SmilesError;
use crate::graph::{Atom, BondOrder, MolGraph};
use crate::smiles::parse_smiles;

/// Parse `smiles` and write it back in canonical form.
pub fn canonicalize(smiles: &str) -> Result<String, SmilesError> {
    Ok(canonical_smiles(&parse_smiles(smiles)?))
}

/// Canonical SMILES of a sanitized graph.
pub fn canonical_smiles(graph: &MolGraph) -> String {
    let ranks = canonical_ranks(graph);
    Writer::new(graph, &ranks).write()
}

/// Unique rank per atom, independent of input atom order for
/// non-symmetric atoms.
pub fn canonical_ranks(graph: &MolGraph) -> Vec<usize> {
    let n = graph.atom_count();
    let invariants: Vec<_> = (0..n)
        .map(|i| {
            let atom = &graph.atoms()[i];
            (
                graph.degree(i),
                atom.element.atomic_number,
                atom.isotope.unwrap_or(0),
                atom.charge,
                atom.hydrogen_count(),
                atom.aromatic,
                graph.is_ring_atom(i),
            )
        })
        .collect();
    let mut ranks = dense_ranks(&invariants);

    loop {
        refine(graph, &mut ranks);
        if distinct(&ranks) == n {
            return ranks;
        }
        break_tie(&mut ranks);
    }
}

/// Split rank classes by sorted neighbour ranks until stable.
fn refine(graph: &MolGraph, ranks: &mut Vec<usize>) {
    let mut classes = distinct(ranks);
    loop {
        let keys: Vec<(usize, Vec<(usize, BondOrder)>)> = (0..ranks.len())
            .map(|i| {
                let mut around: Vec<(usize, BondOrder)> = graph
                    .neighbors(i)
                    .iter()
                    .map(|&(j, b)| (ranks[j], graph.bonds()[b].order))
                    .collect();
                around.sort_unstable();
                (ranks[i], around)
            })
            .collect();
        *ranks = dense_ranks(&keys);
        let refined = distinct(ranks);
        if refined == classes {
            return;
        }
        classes = refined;
    }
}

/// Promote the lowest-indexed member of the lowest tied class.
fn break_tie(ranks: &mut [usize]) {
    let mut counts = vec![0usize; ranks.len()];
    for &r in ranks.iter() {
        counts[r] += 1;
    }
    let Some(tied) = counts.iter().position(|&c| c > 1) else {
        return;
    };
    let Some(chosen) = ranks.iter().position(|&r| r == tied) else {
        return;
    };
    for (i, rank) in ranks.iter_mut().enumerate() {
        let bump = usize::from(*rank == tied && i != chosen);
        *rank = *rank * 2 + bump;
    }
}

fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut ranks = vec![0usize; keys.len()];
    let mut rank = 0usize;
    for (pos, &i) in order.iter().enumerate() {
        if pos > 0 && keys[order[pos - 1]] != keys[i] {
            rank += 1;
        }
        ranks[i] = rank;
    }
    ranks
}

fn distinct(ranks: &[usize]) -> usize {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Depth-first SMILES emission over a ranked graph.
struct Writer<'g> {
    graph: &'g MolGraph,
    ranks: &'g [usize],
    /// Neighbours of each atom sorted by rank.
    ordered: Vec<Vec<(usize, usize)>>,
    /// Spanning-tree children `(atom, bond)` per atom.
    children: Vec<Vec<(usize, usize)>>,
    /// Ring-closure bonds opened at each atom.
    opens: Vec<Vec<usize>>,
    /// Ring-closure bonds closed at each atom.
    closes: Vec<Vec<usize>>,
}

enum Step {
    Visit {
        atom: usize,
        via: Option<usize>,
        branched: bool,
    },
    CloseBranch,
}

impl<'g> Writer<'g> {
    fn new(graph: &'g MolGraph, ranks: &'g [usize]) -> Self {
        let n = graph.atom_count();
        let ordered = (0..n)
            .map(|i| {
                let mut around = graph.neighbors(i).to_vec();
                around.sort_by_key(|&(j, _)| ranks[j]);
                around
            })
            .collect();
        Self {
            graph,
            ranks,
            ordered,
            children: vec![Vec::new(); n],
            opens: vec![Vec::new(); n],
            closes: vec![Vec::new(); n],
        }
    }

    fn write(mut self) -> String {
        let n = self.graph.atom_count();
        let mut roots: Vec<usize> = (0..n).collect();
        roots.sort_by_key(|&i| self.ranks[i]);

        let mut visited = vec![false; n];
        let mut closure_seen = vec![false; self.graph.bond_count()];
        let mut fragments = Vec::new();
        for root in roots {
            if visited[root] {
                continue;
            }
            self.span(root, &mut visited, &mut closure_seen);
            fragments.push(self.emit(root));
        }
        fragments.join(".")
    }

    /// Build the spanning tree and classify ring-closure bonds.
    fn span(&mut self, root: usize, visited: &mut [bool], closure_seen: &mut [bool]) {
        const NONE: usize = usize::MAX;
        visited[root] = true;
        let mut stack = vec![(root, NONE, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (atom, via) = (top.0, top.1);
            if top.2 >= self.ordered[atom].len() {
                stack.pop();
                continue;
            }
            let (next, bond) = self.ordered[atom][top.2];
            top.2 += 1;
            if bond == via {
                continue;
            }
            if visited[next] {
                if !closure_seen[bond] {
                    closure_seen[bond] = true;
                    self.opens[next].push(bond);
                    self.closes[atom].push(bond);
                }
            } else {
                visited[next] = true;
                self.children[atom].push((next, bond));
                stack.push((next, bond, 0));
            }
        }
    }

    fn emit(&self, root: usize) -> String {
        let mut out = String::new();
        let mut digits: Vec<Option<usize>> = vec![None; self.graph.bond_count()];
        let mut in_use: Vec<bool> = Vec::new();
        let mut steps = vec![Step::Visit {
            atom: root,
            via: None,
            branched: false,
        }];

        while let Some(step) = steps.pop() {
            let (atom, via, branched) = match step {
                Step::CloseBranch => {
                    out.push(')');
                    continue;
                }
                Step::Visit {
                    atom,
                    via,
                    branched,
                } => (atom, via, branched),
            };

            if branched {
                out.push('(');
            }
            if let Some(bond) = via {
                out.push_str(self.bond_symbol(bond));
            }
            out.push_str(&self.atom_symbol(atom));

            for &bond in &self.closes[atom] {
                if let Some(digit) = digits[bond] {
                    push_ring_digit(&mut out, digit);
                    in_use[digit] = false;
                }
            }
            for &bond in &self.opens[atom] {
                let digit = match in_use.iter().skip(1).position(|used| !used) {
                    Some(free) => free + 1,
                    None => in_use.len().max(1),
                };
                if digit >= in_use.len() {
                    in_use.resize(digit + 1, false);
                }
                in_use[digit] = true;
                digits[bond] = Some(digit);
                out.push_str(self.bond_symbol(bond));
                push_ring_digit(&mut out, digit);
            }

            if branched {
                steps.push(Step::CloseBranch);
            }
            let children = &self.children[atom];
            for (k, &(child, bond)) in children.iter().enumerate().rev() {
                steps.push(Step::Visit {
                    atom: child,
                    via: Some(bond),
                    branched: k + 1 < children.len(),
                });
            }
        }
        out
    }

    fn bond_symbol(&self, bond: usize) -> &'static str {
        let b = &self.graph.bonds()[bond];
        let atoms = self.graph.atoms();
        let both_aromatic = atoms[b.begin].aromatic && atoms[b.end].aromatic;
        match b.order {
            BondOrder::Single if both_aromatic => "-",
            BondOrder::Single => "",
            BondOrder::Aromatic if both_aromatic => "",
            order => order.symbol(),
        }
    }

    fn atom_symbol(&self, index: usize) -> String {
        let atom = &self.graph.atoms()[index];
        if needs_brackets(self.graph, index, atom) {
            bracket_text(atom)
        } else if atom.aromatic {
            atom.symbol().to_ascii_lowercase()
        } else {
            atom.symbol().to_string()
        }
    }
}

fn needs_brackets(graph: &MolGraph, index: usize, atom: &Atom) -> bool {
    if atom.charge != 0 || atom.isotope.is_some() || atom.atom_class.is_some() {
        return true;
    }
    if !atom.element.is_organic_subset() {
        return true;
    }
    if atom.aromatic && !atom.element.is_organic_aromatic() {
        return true;
    }
    graph.unbracketed_hydrogens(index) != Some(atom.hydrogen_count())
}

fn bracket_text(atom: &Atom) -> String {
    let mut text = String::from("[");
    if let Some(isotope) = atom.isotope {
        text.push_str(&isotope.to_string());
    }
    if atom.aromatic {
        text.push_str(&atom.symbol().to_ascii_lowercase());
    } else {
        text.push_str(atom.symbol());
    }
    match atom.hydrogen_count() {
        0 => {}
        1 => text.push('H'),
        h => text.push_str(&format!("H{h}")),
    }
    match atom.charge {
        0 => {}
        1 => text.push('+'),
        -1 => text.push('-'),
        c if c > 0 => text.push_str(&format!("+{c}")),
        c => text.push_str(&format!("-{}", -i16::from(c))),
    }
    if let Some(class) = atom.atom_class {
        text.push_str(&format!(":{class}"));
    }
    text.push(']');
    text
}

fn push_ring_digit(out: &mut String, digit: usize) {
    if digit < 10 {
        out.push_str(&digit.to_string());
    } else {
        out.push_str(&format!("%{digit:02}"));
    }
}
