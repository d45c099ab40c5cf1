//! Periodic table data used by the SMILES parser and property calculators.

/// One chemical element.
#[derive(Debug, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub atomic_number: u8,
    /// Standard atomic weight in daltons.
    pub mass: f64,
    /// Permitted valences in ascending order. Empty means unchecked.
    valences: &'static [u8],
}

impl Element {
    const fn new(
        symbol: &'static str,
        atomic_number: u8,
        mass: f64,
        valences: &'static [u8],
    ) -> Self {
        Self {
            symbol,
            atomic_number,
            mass,
            valences,
        }
    }

    pub fn valences(&self) -> &'static [u8] {
        self.valences
    }

    /// Elements that may appear outside brackets in SMILES.
    pub fn is_organic_subset(&self) -> bool {
        matches!(
            self.symbol,
            "*" | "B" | "C" | "N" | "O" | "P" | "S" | "F" | "Cl" | "Br" | "I"
        )
    }

    /// Elements that may be written aromatic outside brackets.
    pub fn is_organic_aromatic(&self) -> bool {
        matches!(self.symbol, "B" | "C" | "N" | "O" | "P" | "S")
    }

    /// Elements that may be written aromatic at all.
    pub fn can_be_aromatic(&self) -> bool {
        self.is_organic_aromatic() || matches!(self.symbol, "Se" | "As" | "Te")
    }

    pub fn is_hydrogen(&self) -> bool {
        self.atomic_number == 1
    }

    /// Outer-shell electrons of a neutral main-group atom. `None` for
    /// transition metals, lanthanides and the wildcard.
    pub fn valence_electrons(&self) -> Option<u8> {
        let z = self.atomic_number;
        let electrons = match z {
            1..=2 => z,
            3..=10 => z - 2,
            11..=18 => z - 10,
            19..=20 => z - 18,
            31..=36 => z - 28,
            37..=38 => z - 36,
            49..=54 => z - 46,
            55..=56 => z - 54,
            81..=86 => z - 78,
            _ => return None,
        };
        Some(electrons)
    }

    /// Valences permitted for this element carrying `charge`.
    ///
    /// Charged main-group atoms take the valences of their isoelectronic
    /// neighbour (`N+` behaves like `C`, `O-` like `F`). `None` means the
    /// valence is not checked.
    pub fn allowed_valences(&self, charge: i8) -> Option<&'static [u8]> {
        if self.valences.is_empty() {
            return None;
        }
        if charge == 0 {
            return Some(self.valences);
        }
        let target = i16::from(self.atomic_number) - i16::from(charge);
        if target <= 0 {
            return Some(NO_BONDS);
        }
        let target = u8::try_from(target).ok()?;
        by_number(target)
            .map(Element::valences)
            .filter(|v| !v.is_empty())
    }
}

const NO_BONDS: &[u8] = &[0];

/// Placeholder atom `*`.
pub static WILDCARD: Element = Element::new("*", 0, 0.0, &[]);

static ELEMENTS: [Element; 86] = [
    Element::new("H", 1, 1.008, &[1]),
    Element::new("He", 2, 4.0026, &[0]),
    Element::new("Li", 3, 6.94, &[1]),
    Element::new("Be", 4, 9.0122, &[2]),
    Element::new("B", 5, 10.81, &[3]),
    Element::new("C", 6, 12.011, &[4]),
    Element::new("N", 7, 14.007, &[3]),
    Element::new("O", 8, 15.999, &[2]),
    Element::new("F", 9, 18.998, &[1]),
    Element::new("Ne", 10, 20.180, &[0]),
    Element::new("Na", 11, 22.990, &[1]),
    Element::new("Mg", 12, 24.305, &[2]),
    Element::new("Al", 13, 26.982, &[3]),
    Element::new("Si", 14, 28.085, &[4]),
    Element::new("P", 15, 30.974, &[3, 5, 7]),
    Element::new("S", 16, 32.06, &[2, 4, 6]),
    Element::new("Cl", 17, 35.45, &[1]),
    Element::new("Ar", 18, 39.948, &[0]),
    Element::new("K", 19, 39.098, &[1]),
    Element::new("Ca", 20, 40.078, &[2]),
    Element::new("Sc", 21, 44.956, &[]),
    Element::new("Ti", 22, 47.867, &[]),
    Element::new("V", 23, 50.942, &[]),
    Element::new("Cr", 24, 51.996, &[]),
    Element::new("Mn", 25, 54.938, &[]),
    Element::new("Fe", 26, 55.845, &[]),
    Element::new("Co", 27, 58.933, &[]),
    Element::new("Ni", 28, 58.693, &[]),
    Element::new("Cu", 29, 63.546, &[]),
    Element::new("Zn", 30, 65.38, &[]),
    Element::new("Ga", 31, 69.723, &[3]),
    Element::new("Ge", 32, 72.630, &[4]),
    Element::new("As", 33, 74.922, &[3, 5]),
    Element::new("Se", 34, 78.971, &[2, 4, 6]),
    Element::new("Br", 35, 79.904, &[1]),
    Element::new("Kr", 36, 83.798, &[0]),
    Element::new("Rb", 37, 85.468, &[1]),
    Element::new("Sr", 38, 87.62, &[2]),
    Element::new("Y", 39, 88.906, &[]),
    Element::new("Zr", 40, 91.224, &[]),
    Element::new("Nb", 41, 92.906, &[]),
    Element::new("Mo", 42, 95.95, &[]),
    Element::new("Tc", 43, 98.0, &[]),
    Element::new("Ru", 44, 101.07, &[]),
    Element::new("Rh", 45, 102.91, &[]),
    Element::new("Pd", 46, 106.42, &[]),
    Element::new("Ag", 47, 107.87, &[]),
    Element::new("Cd", 48, 112.41, &[]),
    Element::new("In", 49, 114.82, &[3]),
    Element::new("Sn", 50, 118.71, &[2, 4]),
    Element::new("Sb", 51, 121.76, &[3, 5]),
    Element::new("Te", 52, 127.60, &[2, 4, 6]),
    Element::new("I", 53, 126.90, &[1, 3, 5]),
    Element::new("Xe", 54, 131.29, &[0, 2, 4, 6]),
    Element::new("Cs", 55, 132.91, &[1]),
    Element::new("Ba", 56, 137.33, &[2]),
    Element::new("La", 57, 138.91, &[]),
    Element::new("Ce", 58, 140.12, &[]),
    Element::new("Pr", 59, 140.91, &[]),
    Element::new("Nd", 60, 144.24, &[]),
    Element::new("Pm", 61, 145.0, &[]),
    Element::new("Sm", 62, 150.36, &[]),
    Element::new("Eu", 63, 151.96, &[]),
    Element::new("Gd", 64, 157.25, &[]),
    Element::new("Tb", 65, 158.93, &[]),
    Element::new("Dy", 66, 162.50, &[]),
    Element::new("Ho", 67, 164.93, &[]),
    Element::new("Er", 68, 167.26, &[]),
    Element::new("Tm", 69, 168.93, &[]),
    Element::new("Yb", 70, 173.05, &[]),
    Element::new("Lu", 71, 174.97, &[]),
    Element::new("Hf", 72, 178.49, &[]),
    Element::new("Ta", 73, 180.95, &[]),
    Element::new("W", 74, 183.84, &[]),
    Element::new("Re", 75, 186.21, &[]),
    Element::new("Os", 76, 190.23, &[]),
    Element::new("Ir", 77, 192.22, &[]),
    Element::new("Pt", 78, 195.08, &[]),
    Element::new("Au", 79, 196.97, &[]),
    Element::new("Hg", 80, 200.59, &[]),
    Element::new("Tl", 81, 204.38, &[]),
    Element::new("Pb", 82, 207.2, &[2, 4]),
    Element::new("Bi", 83, 208.98, &[3, 5]),
    Element::new("Po", 84, 209.0, &[2, 4, 6]),
    Element::new("At", 85, 210.0, &[1]),
    Element::new("Rn", 86, 222.0, &[0]),
];

/// Look up an element by its exact (case-sensitive) symbol.
pub fn lookup(symbol: &str) -> Option<&'static Element> {
    if symbol == WILDCARD.symbol {
        return Some(&WILDCARD);
    }
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

pub fn by_number(atomic_number: u8) -> Option<&'static Element> {
    if atomic_number == 0 {
        return Some(&WILDCARD);
    }
    ELEMENTS.get(usize::from(atomic_number) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_atomic_number() {
        for (i, element) in ELEMENTS.iter().enumerate() {
            assert_eq!(usize::from(element.atomic_number), i + 1, "{}", element.symbol);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("Cl").unwrap().atomic_number, 17);
        assert!(lookup("cl").is_none());
        assert!(lookup("Xx").is_none());
        assert_eq!(by_number(6).unwrap().symbol, "C");
    }

    #[test]
    fn test_isoelectronic_valences() {
        let n = lookup("N").unwrap();
        assert_eq!(n.allowed_valences(0), Some(&[3u8][..]));
        assert_eq!(n.allowed_valences(1), Some(&[4u8][..]));
        let o = lookup("O").unwrap();
        assert_eq!(o.allowed_valences(-1), Some(&[1u8][..]));
        let na = lookup("Na").unwrap();
        assert_eq!(na.allowed_valences(1), Some(&[0u8][..]));
        let fe = lookup("Fe").unwrap();
        assert_eq!(fe.allowed_valences(2), None);
    }

    #[test]
    fn test_valence_electrons() {
        assert_eq!(lookup("C").unwrap().valence_electrons(), Some(4));
        assert_eq!(lookup("N").unwrap().valence_electrons(), Some(5));
        assert_eq!(lookup("S").unwrap().valence_electrons(), Some(6));
        assert_eq!(lookup("Se").unwrap().valence_electrons(), Some(6));
        assert_eq!(lookup("Te").unwrap().valence_electrons(), Some(6));
        assert_eq!(lookup("Fe").unwrap().valence_electrons(), None);
        assert_eq!(WILDCARD.valence_electrons(), None);
    }
}
