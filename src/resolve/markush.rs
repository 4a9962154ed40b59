//! Markush (generic structure) constraint extraction and definition
//! expansion.
use crate::validate::tables::{CARBON_RANGE, GENERIC_KEYWORDS};
use once_cell::sync::Lazy;
use regex::Regex;

/// Structural constraints carried by a generic-structure mention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkushConstraints {
    /// Carbon-count ranges such as `C1-C6`, as `(low, high)` pairs.
    pub carbon_ranges: Vec<(u32, u32)>,
    /// Group-type keywords present in the text (`alkyl`, `aryl`, ...).
    pub group_types: Vec<String>,
}

impl MarkushConstraints {
    pub fn is_empty(&self) -> bool {
        self.carbon_ranges.is_empty() && self.group_types.is_empty()
    }

    /// Note lines for the resolver output, one per constraint.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        for (lo, hi) in &self.carbon_ranges {
            notes.push(format!("carbon range C{lo}-C{hi}"));
        }
        for g in &self.group_types {
            notes.push(format!("group type: {g}"));
        }
        notes
    }
}

/// Pulls carbon ranges and group-type keywords out of generic-structure text.
pub fn extract_constraints(text: &str) -> MarkushConstraints {
    let mut constraints = MarkushConstraints::default();
    for caps in CARBON_RANGE.captures_iter(text) {
        if let (Ok(lo), Ok(hi)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            constraints.carbon_ranges.push((lo, hi));
        }
    }
    let lower = text.to_lowercase();
    for keyword in GENERIC_KEYWORDS.iter() {
        if lower.contains(keyword) {
            constraints.group_types.push((*keyword).to_string());
        }
    }
    constraints
}

/// Substituent stems by carbon count, index 1-based.
const CARBON_STEMS: &[&str] = &[
    "meth", "eth", "prop", "but", "pent", "hex", "hept", "oct", "non", "dec", "undec", "dodec",
];

fn range_names(lo: u32, hi: u32, suffix: &str, min_carbons: u32) -> Vec<String> {
    let lo = lo.max(min_carbons).max(1);
    let hi = hi.min(CARBON_STEMS.len() as u32);
    (lo..=hi)
        .map(|n| format!("{}{suffix}", CARBON_STEMS[(n - 1) as usize]))
        .collect()
}

static RANGE_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"C(\d+)\s*-\s*C?(\d+)\s+(alkyl|alkenyl|alkynyl|alkoxy)")
        .expect("valid range group regex")
});

static LIST_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:,|\bor\b|\band\b)\s*").expect("valid list split regex"));

/// Expands a Markush definition clause into concrete substituent names.
///
/// `C1-C6 alkyl` becomes `methyl..hexyl`; a comma/`or`/`and` separated list
/// is split into its items, each of which may itself be a range shorthand.
/// Items that expand to nothing are kept verbatim so no information is lost.
pub fn expand_definition(definition: &str) -> Vec<String> {
    let mut out = Vec::new();
    for item in LIST_SPLIT.split(definition) {
        let item = item.trim().trim_end_matches(['.', ';']).trim();
        if item.is_empty() {
            continue;
        }
        if let Some(caps) = RANGE_GROUP.captures(item) {
            let lo: u32 = caps[1].parse().unwrap_or(1);
            let hi: u32 = caps[2].parse().unwrap_or(lo);
            let expanded = match &caps[3] {
                "alkyl" => range_names(lo, hi, "yl", 1),
                // No C1 alkene/alkyne exists; ranges start at C2.
                "alkenyl" => range_names(lo, hi, "enyl", 2),
                "alkynyl" => range_names(lo, hi, "ynyl", 2),
                "alkoxy" => range_names(lo, hi, "oxy", 1),
                _ => Vec::new(),
            };
            if !expanded.is_empty() {
                out.extend(expanded);
                continue;
            }
        }
        out.push(item.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ranges_and_groups() {
        let c = extract_constraints("C1-C6 alkyl or optionally substituted aryl");
        assert_eq!(c.carbon_ranges, vec![(1, 6)]);
        assert!(c.group_types.iter().any(|g| g == "alkyl"));
        assert!(c.group_types.iter().any(|g| g == "aryl"));
        assert!(!c.is_empty());
        assert!(c.notes().iter().any(|n| n.contains("C1-C6")));
    }

    #[test]
    fn no_constraints_in_plain_text() {
        assert!(extract_constraints("aspirin tablets").is_empty());
    }

    #[test]
    fn expands_c1_c6_alkyl() {
        assert_eq!(
            expand_definition("C1-C6 alkyl"),
            vec!["methyl", "ethyl", "propyl", "butyl", "pentyl", "hexyl"]
        );
    }

    #[test]
    fn expands_compact_range_shorthand() {
        assert_eq!(
            expand_definition("C1-3 alkyl"),
            vec!["methyl", "ethyl", "propyl"]
        );
    }

    #[test]
    fn expands_alkoxy_and_alkenyl() {
        assert_eq!(
            expand_definition("C1-C3 alkoxy"),
            vec!["methoxy", "ethoxy", "propoxy"]
        );
        // Alkenyl ranges cannot start below C2.
        assert_eq!(
            expand_definition("C1-C4 alkenyl"),
            vec!["ethenyl", "propenyl", "butenyl"]
        );
    }

    #[test]
    fn splits_name_lists() {
        assert_eq!(
            expand_definition("methyl, ethyl or propyl"),
            vec!["methyl", "ethyl", "propyl"]
        );
        assert_eq!(
            expand_definition("hydrogen and halogen"),
            vec!["hydrogen", "halogen"]
        );
    }

    #[test]
    fn mixed_range_and_names() {
        assert_eq!(
            expand_definition("C1-C2 alkyl, phenyl or benzyl"),
            vec!["methyl", "ethyl", "phenyl", "benzyl"]
        );
    }

    #[test]
    fn unknown_items_kept_verbatim() {
        assert_eq!(expand_definition("heteroaryl"), vec!["heteroaryl"]);
    }
}
