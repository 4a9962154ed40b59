//! Dictionary and regex extraction sources.
//!
//! All sources operate on the normalised text so their offsets line up with
//! NER spans during the merge.
use crate::dictionary::ChemDictionary;
use crate::text::Token;
use crate::types::{EntitySource, EntityType, RawEntity};
use crate::validate::smiles::looks_like_smiles;
use crate::validate::validate_formula;
use once_cell::sync::Lazy;
use regex::Regex;

const DICTIONARY_CONFIDENCE: f64 = 0.95;
const BRAND_CONFIDENCE: f64 = 0.90;
const CAS_CONFIDENCE: f64 = 0.90;
const INCHI_CONFIDENCE: f64 = 0.95;
const FORMULA_CONFIDENCE: f64 = 0.85;
const SMILES_CONFIDENCE: f64 = 0.70;
const MARKUSH_CONFIDENCE: f64 = 0.85;

static CAS_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2,7}-\d{2}-\d\b").expect("valid CAS search regex"));

static INCHI_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"InChI=\S+").expect("valid InChI search regex"));

static FORMULA_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[A-Z][a-z]?\d*){2,}\b").expect("valid formula search regex")
});

/// A Markush variable being defined: `R1 is ...`, `X = ...`, etc.
pub static MARKUSH_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(R\d{0,2}|X|Y|Z|Ar|Het)\s+(?:is|represents|denotes|=)\s+")
        .expect("valid Markush definition regex")
});

/// Word-level dictionary matching: n-grams of consecutive word tokens (the
/// longest dictionary name bounds `n`) looked up against the name map, plus
/// unigram brand lookups.
pub fn dictionary_matches(
    text: &str,
    tokens: &[Token],
    dictionary: &ChemDictionary,
) -> Vec<RawEntity> {
    let mut entities = Vec::new();
    let max_words = dictionary.max_name_words().min(4);
    let word_tokens: Vec<&Token> = tokens
        .iter()
        .filter(|t| t.text.chars().next().is_some_and(char::is_alphanumeric))
        .collect();

    let mut i = 0;
    while i < word_tokens.len() {
        let mut matched_len = 0;
        for n in (1..=max_words.min(word_tokens.len() - i)).rev() {
            let start = word_tokens[i].start;
            let end = word_tokens[i + n - 1].end;
            let candidate = &text[start..end];
            // Multi-token candidates spanning punctuation are not names.
            if candidate.contains(|c: char| ",.;:()[]{}".contains(c)) {
                continue;
            }
            if dictionary.contains_name(candidate) {
                entities.push(RawEntity::new(
                    candidate,
                    start,
                    end,
                    EntityType::CommonName,
                    DICTIONARY_CONFIDENCE,
                    EntitySource::Dictionary,
                ));
                matched_len = n;
                break;
            }
            if n == 1 && dictionary.lookup_brand(candidate).is_some() {
                entities.push(RawEntity::new(
                    candidate,
                    start,
                    end,
                    EntityType::BrandName,
                    BRAND_CONFIDENCE,
                    EntitySource::Dictionary,
                ));
                matched_len = 1;
                break;
            }
        }
        i += matched_len.max(1);
    }
    entities
}

/// CAS registry-number shaped substrings.
pub fn cas_matches(text: &str) -> Vec<RawEntity> {
    CAS_IN_TEXT
        .find_iter(text)
        .map(|m| {
            RawEntity::new(
                m.as_str(),
                m.start(),
                m.end(),
                EntityType::CasNumber,
                CAS_CONFIDENCE,
                EntitySource::Regex,
            )
        })
        .collect()
}

/// InChI strings, recognised by their mandatory prefix.
pub fn inchi_matches(text: &str) -> Vec<RawEntity> {
    INCHI_IN_TEXT
        .find_iter(text)
        .map(|m| {
            let s = m.as_str().trim_end_matches(['.', ',', ';', ')']);
            RawEntity::new(
                s,
                m.start(),
                m.start() + s.len(),
                EntityType::Inchi,
                INCHI_CONFIDENCE,
                EntitySource::Regex,
            )
        })
        .collect()
}

/// Molecular-formula shaped substrings. Requires a digit so that ordinary
/// capitalised acronyms ("US", "DNA") stay out.
pub fn formula_matches(text: &str) -> Vec<RawEntity> {
    FORMULA_IN_TEXT
        .find_iter(text)
        .filter(|m| {
            let s = m.as_str();
            s.chars().any(|c| c.is_ascii_digit()) && validate_formula(s)
        })
        .map(|m| {
            RawEntity::new(
                m.as_str(),
                m.start(),
                m.end(),
                EntityType::MolecularFormula,
                FORMULA_CONFIDENCE,
                EntitySource::Regex,
            )
        })
        .collect()
}

/// SMILES-heuristic over whitespace-separated chunks of the text.
pub fn smiles_matches(text: &str) -> Vec<RawEntity> {
    static CHUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("valid chunk regex"));
    CHUNK
        .find_iter(text)
        .filter_map(|m| {
            let chunk = m.as_str().trim_end_matches(['.', ',', ';']);
            if chunk.is_empty() {
                return None;
            }
            // Skip chunks that already look like other entity kinds.
            if chunk.starts_with("InChI=") || CAS_IN_TEXT.is_match(chunk) {
                return None;
            }
            if looks_like_smiles(chunk) {
                Some(RawEntity::new(
                    chunk,
                    m.start(),
                    m.start() + chunk.len(),
                    EntityType::Smiles,
                    SMILES_CONFIDENCE,
                    EntitySource::Regex,
                ))
            } else {
                None
            }
        })
        .collect()
}

static POLYMER_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpoly\([A-Za-z0-9 ,\-]+\)|\bpoly[a-z]{4,}\b").expect("valid polymer regex")
});

static BIOLOGICAL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-z]{2,}(?:ase|mab)\b").expect("valid biological regex"));

const POLYMER_CONFIDENCE: f64 = 0.75;
const BIOLOGICAL_CONFIDENCE: f64 = 0.70;

/// Polymer names: `poly(...)` notation and closed `poly...` words.
pub fn polymer_matches(text: &str) -> Vec<RawEntity> {
    POLYMER_IN_TEXT
        .find_iter(text)
        .filter(|m| {
            let s = m.as_str();
            !s.ends_with("ase")
                && !crate::validate::tables::POLYMER_STOPLIST.contains(s.to_lowercase().as_str())
        })
        .map(|m| {
            RawEntity::new(
                m.as_str(),
                m.start(),
                m.end(),
                EntityType::Polymer,
                POLYMER_CONFIDENCE,
                EntitySource::Regex,
            )
        })
        .collect()
}

/// Enzyme (`-ase`) and monoclonal antibody (`-mab`) names, screened against
/// a stoplist of ordinary English words.
pub fn biological_matches(text: &str) -> Vec<RawEntity> {
    BIOLOGICAL_IN_TEXT
        .find_iter(text)
        .filter(|m| {
            !crate::validate::tables::BIOLOGICAL_STOPLIST.contains(m.as_str().to_lowercase().as_str())
        })
        .map(|m| {
            RawEntity::new(
                m.as_str(),
                m.start(),
                m.end(),
                EntityType::Biological,
                BIOLOGICAL_CONFIDENCE,
                EntitySource::Regex,
            )
        })
        .collect()
}

/// Markush variables that appear on the left side of a definition clause.
pub fn markush_matches(text: &str) -> Vec<RawEntity> {
    MARKUSH_DEFINITION
        .captures_iter(text)
        .filter_map(|caps| {
            let var = caps.get(1)?;
            Some(RawEntity::new(
                var.as_str(),
                var.start(),
                var.end(),
                EntityType::MarkushVariable,
                MARKUSH_CONFIDENCE,
                EntitySource::Regex,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    #[test]
    fn dictionary_finds_multi_word_names() {
        let dict = ChemDictionary::with_defaults();
        let text = "treatment with acetylsalicylic acid and caffeine daily";
        let tokens = tokenize(text);
        let entities = dictionary_matches(text, &tokens, &dict);
        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        assert!(texts.contains(&"acetylsalicylic acid"));
        assert!(texts.contains(&"caffeine"));
        for e in &entities {
            assert_eq!(&text[e.start..e.end], e.text);
        }
    }

    #[test]
    fn dictionary_finds_brands() {
        let dict = ChemDictionary::with_defaults();
        let text = "two Advil tablets";
        let tokens = tokenize(text);
        let entities = dictionary_matches(text, &tokens, &dict);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, EntityType::BrandName);
    }

    #[test]
    fn cas_regex_with_offsets() {
        let text = "aspirin (CAS 50-78-2) and ethanol (64-17-5)";
        let entities = cas_matches(text);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].text, "50-78-2");
        assert_eq!(&text[entities[0].start..entities[0].end], "50-78-2");
    }

    #[test]
    fn formula_regex_requires_digit() {
        let entities = formula_matches("the sample contained C9H8O4 from the US batch");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "C9H8O4");
    }

    #[test]
    fn smiles_heuristic_finds_structures() {
        let text = "prepared from CC(=O)Oc1ccccc1C(=O)O in ethanol";
        let entities = smiles_matches(text);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "CC(=O)Oc1ccccc1C(=O)O");
        assert_eq!(entities[0].entity_type, EntityType::Smiles);
    }

    #[test]
    fn smiles_heuristic_ignores_prose() {
        assert!(smiles_matches("the method described in the claims").is_empty());
    }

    #[test]
    fn inchi_regex_trims_trailing_punctuation() {
        let text = "identified as InChI=1S/CH4/h1H4, a gas";
        let entities = inchi_matches(text);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "InChI=1S/CH4/h1H4");
    }

    #[test]
    fn polymer_notation_and_words() {
        let text = "coated with poly(ethylene glycol) or polystyrene film";
        let entities = polymer_matches(text);
        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["poly(ethylene glycol)", "polystyrene"]);
        assert!(entities.iter().all(|e| e.entity_type == EntityType::Polymer));
    }

    #[test]
    fn polymer_stoplist_and_enzymes_excluded() {
        assert!(polymer_matches("a polymorph of the drug").is_empty());
        assert!(polymer_matches("DNA polymerase activity").is_empty());
    }

    #[test]
    fn biological_suffix_matching() {
        let entities = biological_matches("inhibits tyrosine kinase and binds rituximab");
        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["kinase", "rituximab"]);
    }

    #[test]
    fn biological_stoplist_filters_english_words() {
        assert!(biological_matches("in this phase the release of the base").is_empty());
    }

    #[test]
    fn markush_definitions_yield_variables() {
        let text = "wherein R1 is C1-C6 alkyl and X represents halogen";
        let entities = markush_matches(text);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].text, "R1");
        assert_eq!(entities[1].text, "X");
        assert!(
            entities
                .iter()
                .all(|e| e.entity_type == EntityType::MarkushVariable)
        );
    }
}
