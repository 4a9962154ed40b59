//! InChI surface checks and cheap layer parsing.
//!
//! The formula layer sits right after the version segment, so a molecular
//! formula can be recovered from a standard InChI without any
//! cheminformatics toolkit.
use super::formula::validate_formula;

/// True when the body after `InChI=` contains a `/x` layer marker.
pub fn has_layer_markers(body: &str) -> bool {
    let bytes = body.as_bytes();
    bytes
        .windows(2)
        .any(|w| w[0] == b'/' && w[1].is_ascii_lowercase())
}

/// Extracts the formula layer of a standard InChI, e.g.
/// `InChI=1S/C9H8O4/c1-...` yields `C9H8O4`. Multi-component formulas
/// (joined with `.`) are returned verbatim when every component is valid.
pub fn formula_from_inchi(inchi: &str) -> Option<String> {
    let body = inchi.strip_prefix("InChI=")?;
    let mut segments = body.split('/');
    let _version = segments.next()?;
    let formula = segments.next()?;
    if formula.is_empty() {
        return None;
    }
    let all_valid = formula.split('.').all(|component| {
        // Components may carry a leading multiplier, e.g. `2H2O`.
        let stripped = component.trim_start_matches(|c: char| c.is_ascii_digit());
        !stripped.is_empty() && validate_formula(stripped)
    });
    if all_valid {
        Some(formula.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_component_formula() {
        assert_eq!(
            formula_from_inchi("InChI=1S/C9H8O4/c1-6(10)13-8-5-3-2-4-7(8)9(11)12/h2-5H,1H3,(H,11,12)"),
            Some("C9H8O4".to_string())
        );
        assert_eq!(
            formula_from_inchi("InChI=1S/CH4/h1H4"),
            Some("CH4".to_string())
        );
    }

    #[test]
    fn extracts_multi_component_formula() {
        assert_eq!(
            formula_from_inchi("InChI=1S/C7H5NaO2.Na/c8-7(9)6-4-2-1-3-5-6;/q-1;+1"),
            Some("C7H5NaO2.Na".to_string())
        );
        assert_eq!(
            formula_from_inchi("InChI=1S/2C2H6O.H2O/c2*1-2-3;/h2*3H,2H2,1H3;1H2"),
            Some("2C2H6O.H2O".to_string())
        );
    }

    #[test]
    fn rejects_bodies_without_formula_layer() {
        assert_eq!(formula_from_inchi("InChI=1S"), None);
        assert_eq!(formula_from_inchi("not an inchi"), None);
        assert_eq!(formula_from_inchi("InChI=1S//c1-2"), None);
    }

    #[test]
    fn layer_marker_detection() {
        assert!(has_layer_markers("1S/CH4/h1H4"));
        assert!(!has_layer_markers("1S"));
        assert!(!has_layer_markers("1S/C9H8O4"));
    }
}
