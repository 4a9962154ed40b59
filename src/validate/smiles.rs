//! Surface-level SMILES validation.
//!
//! This is a screen for obviously broken strings, not a parser: balanced
//! grouping, ring-closure digit parity, and organic-subset atom symbols
//! outside brackets. Anything inside `[...]` is accepted as written.

/// Issue codes attached by [`check_smiles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmilesIssue {
    UnbalancedParentheses,
    UnbalancedBrackets,
    UnpairedRingClosure(char),
    UnknownAtom(String),
}

impl std::fmt::Display for SmilesIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmilesIssue::UnbalancedParentheses => write!(f, "unbalanced parentheses"),
            SmilesIssue::UnbalancedBrackets => write!(f, "unbalanced square brackets"),
            SmilesIssue::UnpairedRingClosure(d) => {
                write!(f, "ring closure digit '{d}' appears an odd number of times")
            }
            SmilesIssue::UnknownAtom(a) => write!(f, "atom symbol '{a}' outside organic subset"),
        }
    }
}

/// Two-character organic-subset symbols, matched before single characters.
const TWO_CHAR_ATOMS: &[&str] = &["Cl", "Br"];

/// Single-character organic-subset symbols, aromatic forms included.
const ONE_CHAR_ATOMS: &[char] = &[
    'B', 'C', 'N', 'O', 'P', 'S', 'F', 'I', 'b', 'c', 'n', 'o', 'p', 's',
];

const BOND_AND_STRUCTURE: &[char] = &[
    '-', '=', '#', '$', ':', '/', '\\', '.', '%', '+', '@', '*',
];

/// Runs every check and returns the collected issues; empty means valid.
pub fn check_smiles(s: &str) -> Vec<SmilesIssue> {
    let mut issues = Vec::new();

    let open_paren = s.chars().filter(|&c| c == '(').count();
    let close_paren = s.chars().filter(|&c| c == ')').count();
    if open_paren != close_paren {
        issues.push(SmilesIssue::UnbalancedParentheses);
    }

    let open_bracket = s.chars().filter(|&c| c == '[').count();
    let close_bracket = s.chars().filter(|&c| c == ']').count();
    if open_bracket != close_bracket {
        issues.push(SmilesIssue::UnbalancedBrackets);
    }

    // Ring-closure digits outside brackets must pair up. Counting characters
    // is deliberately coarse; mismatched brackets already fail above.
    let mut digit_counts = [0usize; 10];
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '0'..='9' if depth == 0 => {
                digit_counts[c as usize - '0' as usize] += 1;
            }
            _ => {}
        }
    }
    for (digit, count) in digit_counts.iter().enumerate() {
        if count % 2 != 0 {
            issues.push(SmilesIssue::UnpairedRingClosure(
                char::from_digit(digit as u32, 10).unwrap_or('?'),
            ));
        }
    }

    issues.extend(check_atoms(s));
    issues
}

/// Every atom symbol outside brackets must be in the organic subset.
fn check_atoms(s: &str) -> Vec<SmilesIssue> {
    let mut issues = Vec::new();
    let chars: Vec<char> = s.chars().collect();
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '[' {
            depth += 1;
            i += 1;
            continue;
        }
        if c == ']' {
            depth = depth.saturating_sub(1);
            i += 1;
            continue;
        }
        if depth > 0 || c.is_ascii_digit() || c == '(' || c == ')' || BOND_AND_STRUCTURE.contains(&c)
        {
            i += 1;
            continue;
        }
        // Two-character symbols take precedence over their first letter.
        if i + 1 < chars.len() {
            let pair: String = [c, chars[i + 1]].iter().collect();
            if TWO_CHAR_ATOMS.contains(&pair.as_str()) {
                i += 2;
                continue;
            }
        }
        if ONE_CHAR_ATOMS.contains(&c) {
            i += 1;
            continue;
        }
        issues.push(SmilesIssue::UnknownAtom(c.to_string()));
        i += 1;
    }
    issues
}

/// Convenience predicate over [`check_smiles`].
pub fn validate_smiles(s: &str) -> bool {
    !s.is_empty() && check_smiles(s).is_empty()
}

/// Cheap shape heuristic used by the regex extraction source: enough atoms,
/// some structure character, and no whitespace.
pub fn looks_like_smiles(s: &str) -> bool {
    if s.len() < 5 || s.chars().any(char::is_whitespace) {
        return false;
    }
    let has_structure = s
        .chars()
        .any(|c| matches!(c, '(' | ')' | '=' | '#' | '[' | ']') || c.is_ascii_digit());
    let atomish = s
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .count();
    has_structure && atomish >= 3 && validate_smiles(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspirin_smiles_is_valid() {
        assert!(validate_smiles("CC(=O)Oc1ccccc1C(=O)O"));
    }

    #[test]
    fn unbalanced_parentheses_detected() {
        let issues = check_smiles("CC(=O");
        assert!(issues.contains(&SmilesIssue::UnbalancedParentheses));
    }

    #[test]
    fn unpaired_ring_closure_detected() {
        let issues = check_smiles("C1CCC");
        assert!(issues.contains(&SmilesIssue::UnpairedRingClosure('1')));
    }

    #[test]
    fn paired_ring_closures_pass() {
        assert!(validate_smiles("C1CCCCC1")); // cyclohexane
        assert!(validate_smiles("c1ccc2ccccc2c1")); // naphthalene
    }

    #[test]
    fn bracket_atoms_are_not_inspected() {
        // Deuterium and charges only occur inside brackets.
        assert!(validate_smiles("[2H]OC(=O)C"));
        assert!(validate_smiles("C[N+](C)(C)C"));
    }

    #[test]
    fn non_organic_subset_atom_rejected_outside_brackets() {
        let issues = check_smiles("CCAu");
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, SmilesIssue::UnknownAtom(_)))
        );
    }

    #[test]
    fn chlorine_and_bromine_two_char_symbols() {
        assert!(validate_smiles("ClCCBr"));
    }

    #[test]
    fn heuristic_rejects_plain_words() {
        assert!(!looks_like_smiles("method"));
        assert!(!looks_like_smiles("the compound"));
        assert!(looks_like_smiles("CC(=O)Oc1ccccc1C(=O)O"));
    }
}
