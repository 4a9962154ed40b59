//! Molecular formula validation against the periodic table.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// All 118 element symbols.
pub static PERIODIC_TABLE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
        "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga",
        "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd",
        "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
        "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os",
        "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa",
        "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg",
        "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
    ]
    .into_iter()
    .collect()
});

static FORMULA_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][a-z]?\d*)+$").expect("valid formula shape regex"));

static ELEMENT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z][a-z]?)(\d*)").expect("valid element token regex"));

/// Largest per-element count a plausible formula carries.
const MAX_ELEMENT_COUNT: u64 = 1000;

/// Shape check only, without element-symbol verification.
pub fn has_formula_shape(s: &str) -> bool {
    FORMULA_SHAPE.is_match(s)
}

/// Full check: shape, every element on the periodic table, every explicit
/// count at most 1000.
pub fn validate_formula(s: &str) -> bool {
    if !has_formula_shape(s) {
        return false;
    }
    for cap in ELEMENT_TOKEN.captures_iter(s) {
        let symbol = &cap[1];
        if !PERIODIC_TABLE.contains(symbol) {
            return false;
        }
        let count = &cap[2];
        if !count.is_empty() {
            match count.parse::<u64>() {
                Ok(n) if n <= MAX_ELEMENT_COUNT => {}
                _ => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_formulas_pass() {
        assert!(validate_formula("C9H8O4")); // aspirin
        assert!(validate_formula("H2O"));
        assert!(validate_formula("C8H10N4O2")); // caffeine
        assert!(validate_formula("NaCl"));
        assert!(validate_formula("CH4"));
    }

    #[test]
    fn fake_elements_fail() {
        assert!(!validate_formula("Xx2"));
        assert!(!validate_formula("C9J8")); // J is not an element
    }

    #[test]
    fn shape_violations_fail() {
        assert!(!validate_formula("c9h8o4")); // lowercase start
        assert!(!validate_formula("C9-H8"));
        assert!(!validate_formula(""));
        assert!(!validate_formula("9C"));
    }

    #[test]
    fn counts_above_cap_fail() {
        assert!(validate_formula("C1000"));
        assert!(!validate_formula("C1001"));
    }
}
