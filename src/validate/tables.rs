//! Curated word lists and patterns backing the validator and the regex
//! extraction sources.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Procedural patent vocabulary that NER models habitually mislabel as
/// chemistry. Compared lowercase.
pub static BLACKLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "method", "methods", "system", "systems", "process", "processes", "device", "devices",
        "apparatus", "example", "examples", "step", "steps", "embodiment", "embodiments",
        "invention", "claim", "claims", "figure", "figures", "table", "tables", "formula",
        "scheme", "preparation", "procedure", "composition", "respectively", "wherein",
        "thereof", "solution", "mixture", "product", "material", "sample", "test", "results",
        "data", "group", "groups",
    ]
    .into_iter()
    .collect()
});

/// Patent-bureau and analytical-technique abbreviations, compared lowercase.
pub static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "uspto", "epo", "wipo", "pct", "nmr", "hplc", "gc", "ms", "lc", "tlc", "uv", "ir",
        "dsc", "tga", "xrd", "ftir", "esi", "maldi", "rt", "mp", "bp",
    ]
    .into_iter()
    .collect()
});

/// Terms whose presence in the context window raises confidence.
pub static CONTEXT_TERMS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "compound", "molecule", "molecular", "synthesis", "synthesized", "synthesised",
        "reaction", "derivative", "salt", "solvent", "catalyst", "reagent", "acid", "base",
        "yield", "dissolved", "treated", "substituted", "pharmaceutical", "formulation",
        "inhibitor", "agonist", "antagonist", "polymer", "monomer", "concentration", "dose",
        "mg", "mmol", "purity", "crystalline",
    ]
});

/// IUPAC name suffixes, longest first so `-oic acid` wins over `-ic acid`.
pub static IUPAC_SUFFIXES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "oic acid", "ic acid", "carboxylic", "amide", "amine", "imine", "oxide", "ether",
        "ester", "ane", "ene", "yne", "one", "ol", "al", "ate", "ide", "ium", "ose", "yl",
    ]
});

/// Well-known drug substances (common names), compared lowercase.
pub static KNOWN_DRUGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aspirin", "paracetamol", "acetaminophen", "ibuprofen", "caffeine", "penicillin",
        "amoxicillin", "morphine", "codeine", "metformin", "atorvastatin", "simvastatin",
        "omeprazole", "ciprofloxacin", "warfarin", "digoxin", "insulin", "heparin",
        "diazepam", "fluoxetine", "sertraline", "loratadine", "cetirizine", "naproxen",
        "diclofenac", "prednisone", "dexamethasone", "ethanol", "glucose", "sucrose",
    ]
    .into_iter()
    .collect()
});

/// Registered brand names, compared lowercase.
pub static KNOWN_BRANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "tylenol", "advil", "motrin", "aleve", "lipitor", "zocor", "prilosec", "nexium",
        "prozac", "zoloft", "xanax", "valium", "viagra", "plavix", "glucophage", "coumadin",
        "augmentin", "claritin", "zyrtec", "voltaren",
    ]
    .into_iter()
    .collect()
});

/// Keywords that mark a generic (Markush) structure description.
pub static GENERIC_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "alkyl", "alkenyl", "alkynyl", "aryl", "heteroaryl", "cycloalkyl", "heterocyclyl",
        "alkoxy", "aryloxy", "halogen", "halo", "haloalkyl", "amino", "optionally substituted",
        "substituted or unsubstituted",
    ]
});

/// Ordinary English words that end like an enzyme name and must never be
/// tagged BIOLOGICAL.
pub static BIOLOGICAL_STOPLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "base", "case", "cease", "chase", "database", "decrease", "disease", "ease", "erase",
        "grease", "increase", "lease", "phase", "phrase", "please", "purchase", "release",
    ]
    .into_iter()
    .collect()
});

/// `poly...` words that are not polymers.
pub static POLYMER_STOPLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "polygon", "polynomial", "polymorph", "polymorphic", "polymorphism", "polymath",
        "polyphonic",
    ]
    .into_iter()
    .collect()
});

/// Carbon-range shorthand such as `C1-C6` or `C1-6`.
pub static CARBON_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"C(\d+)\s*-\s*C?(\d+)").expect("valid carbon range regex"));

/// Legal Markush variable symbols: R-family with optional primes and digits,
/// plus the conventional single-letter placeholders.
pub static MARKUSH_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(R'{0,2}\d*|X|Y|Z|Ar|Het|Alk|Hal|Q|W|M|L)$")
        .expect("valid Markush variable regex")
});

/// True when the lowercase form of `s` is blacklisted, an abbreviation, or
/// all digits.
pub fn is_blacklisted(s: &str) -> bool {
    let lower = s.to_lowercase();
    if BLACKLIST.contains(lower.as_str()) || ABBREVIATIONS.contains(lower.as_str()) {
        return true;
    }
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// True when `s` contains any generic-structure keyword or a carbon range.
pub fn has_generic_keyword(s: &str) -> bool {
    let lower = s.to_lowercase();
    GENERIC_KEYWORDS.iter().any(|k| lower.contains(k)) || CARBON_RANGE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_is_case_insensitive() {
        assert!(is_blacklisted("Method"));
        assert!(is_blacklisted("USPTO"));
        assert!(is_blacklisted("nmr"));
        assert!(!is_blacklisted("aspirin"));
    }

    #[test]
    fn all_digit_strings_are_blacklisted() {
        assert!(is_blacklisted("12345"));
        assert!(!is_blacklisted("50-78-2"));
    }

    #[test]
    fn markush_variable_symbols() {
        for sym in ["R", "R1", "R12", "R'", "R'2", "R''", "X", "Y", "Z", "Ar", "Het", "Hal"] {
            assert!(MARKUSH_VARIABLE.is_match(sym), "{sym} should match");
        }
        for sym in ["Rx", "A", "R1a", "het", "XX"] {
            assert!(!MARKUSH_VARIABLE.is_match(sym), "{sym} should not match");
        }
    }

    #[test]
    fn generic_keywords_and_ranges() {
        assert!(has_generic_keyword("C1-C6 alkyl"));
        assert!(has_generic_keyword("optionally substituted aryl"));
        assert!(has_generic_keyword("C1-6 haloalkyl"));
        assert!(!has_generic_keyword("aspirin"));
    }

    #[test]
    fn carbon_range_captures_bounds() {
        let caps = CARBON_RANGE.captures("C1-C6 alkyl").unwrap();
        assert_eq!(&caps[1], "1");
        assert_eq!(&caps[2], "6");
        let caps = CARBON_RANGE.captures("C2-8 alkenyl").unwrap();
        assert_eq!(&caps[1], "2");
        assert_eq!(&caps[2], "8");
    }
}
