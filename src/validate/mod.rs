//! Syntactic and semantic validation of extracted mentions.
//!
//! Validation never fails for legal input; rejection is expressed through
//! `is_valid = false` plus an issue list. Confidence adjustments are clamped
//! to `[0, 1]` at the end of the pipeline.
pub mod cas;
pub mod formula;
pub mod inchi;
pub mod smiles;
pub mod tables;

use crate::types::{EntityType, RawEntity};
use log::debug;
use std::collections::HashMap;

pub use cas::{has_cas_shape, validate_cas};
pub use formula::{has_formula_shape, validate_formula};
pub use smiles::{check_smiles, looks_like_smiles, validate_smiles};

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub adjusted_confidence: f64,
    pub adjusted_type: EntityType,
    pub issues: Vec<String>,
    /// Applied automatic corrections, keyed by the corrected aspect
    /// (currently only `"type"`).
    pub corrections: HashMap<String, String>,
}

impl ValidationResult {
    fn rejected(confidence: f64, entity_type: EntityType, issue: String) -> Self {
        Self {
            is_valid: false,
            adjusted_confidence: confidence,
            adjusted_type: entity_type,
            issues: vec![issue],
            corrections: HashMap::new(),
        }
    }
}

/// Stateless validation engine; one instance is shared by the orchestrator.
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, raw: &RawEntity) -> ValidationResult {
        let text = raw.text.trim();
        if text.is_empty() {
            return ValidationResult::rejected(0.0, raw.entity_type, "empty text".to_string());
        }

        // Blacklisted mentions are never chemistry, whatever the model said.
        // The pre-validation confidence is preserved for diagnostics.
        if tables::is_blacklisted(text) {
            return ValidationResult::rejected(
                raw.confidence,
                raw.entity_type,
                format!("blacklisted term: {text}"),
            );
        }

        let mut result = ValidationResult {
            is_valid: true,
            adjusted_confidence: raw.confidence,
            adjusted_type: raw.entity_type,
            issues: Vec::new(),
            corrections: HashMap::new(),
        };

        self.reclassify(text, &mut result);
        self.check_type(text, &mut result);
        self.score_context(&raw.context, &mut result);

        result.adjusted_confidence = result.adjusted_confidence.clamp(0.0, 1.0);
        if result.adjusted_type != raw.entity_type || !result.is_valid {
            debug!(
                "validated '{}': type {} -> {}, valid={}, confidence {:.2} -> {:.2}",
                text,
                raw.entity_type,
                result.adjusted_type,
                result.is_valid,
                raw.confidence,
                result.adjusted_confidence
            );
        }
        result
    }

    /// Deterministic type corrections, applied before the per-type check so
    /// the check runs against the corrected type.
    fn reclassify(&self, text: &str, result: &mut ValidationResult) {
        let corrected = match result.adjusted_type {
            EntityType::CommonName if cas::has_cas_shape(text) => Some(EntityType::CasNumber),
            EntityType::IupacName
                if formula::has_formula_shape(text) && !has_iupac_suffix(text) =>
            {
                Some(EntityType::MolecularFormula)
            }
            EntityType::GenericStructure if tables::MARKUSH_VARIABLE.is_match(text) => {
                Some(EntityType::MarkushVariable)
            }
            _ => None,
        };
        if let Some(new_type) = corrected {
            result.corrections.insert(
                "type".to_string(),
                format!("{} -> {}", result.adjusted_type, new_type),
            );
            result.adjusted_type = new_type;
        }
    }

    fn check_type(&self, text: &str, result: &mut ValidationResult) {
        match result.adjusted_type {
            EntityType::CasNumber => {
                if cas::validate_cas(text) {
                    result.adjusted_confidence += 0.10;
                } else {
                    result.is_valid = false;
                    result.issues.push(if cas::has_cas_shape(text) {
                        "CAS checksum mismatch".to_string()
                    } else {
                        "not a CAS registry number shape".to_string()
                    });
                }
            }
            EntityType::Smiles => {
                let issues = smiles::check_smiles(text);
                if issues.is_empty() {
                    result.adjusted_confidence += 0.15;
                } else {
                    result.is_valid = false;
                    result.issues.extend(issues.iter().map(|i| i.to_string()));
                }
            }
            EntityType::MolecularFormula => {
                if formula::validate_formula(text) {
                    result.adjusted_confidence += 0.10;
                } else {
                    result.is_valid = false;
                    result.issues.push("invalid molecular formula".to_string());
                }
            }
            EntityType::IupacName => {
                if text.len() < 3 {
                    result.is_valid = false;
                    result.issues.push("name too short".to_string());
                } else if has_iupac_suffix(text) {
                    result.adjusted_confidence += 0.05;
                } else {
                    result
                        .issues
                        .push("no recognised IUPAC suffix".to_string());
                }
            }
            EntityType::CommonName => {
                if tables::KNOWN_DRUGS.contains(text.to_lowercase().as_str()) {
                    result.adjusted_confidence += 0.10;
                } else {
                    result.issues.push("not in known-drug table".to_string());
                }
            }
            EntityType::GenericStructure => {
                if tables::has_generic_keyword(text) {
                    result.adjusted_confidence += 0.05;
                } else {
                    result.is_valid = false;
                    result
                        .issues
                        .push("no generic-structure keyword".to_string());
                }
            }
            EntityType::MarkushVariable => {
                if tables::MARKUSH_VARIABLE.is_match(text) {
                    result.adjusted_confidence += 0.05;
                } else {
                    result.is_valid = false;
                    result
                        .issues
                        .push("not a Markush variable symbol".to_string());
                }
            }
            EntityType::Inchi => {
                if let Some(layers) = text.strip_prefix("InChI=") {
                    result.adjusted_confidence += 0.15;
                    if !inchi::has_layer_markers(layers) {
                        result.issues.push("no InChI layer markers".to_string());
                    }
                } else {
                    result.is_valid = false;
                    result.issues.push("missing InChI= prefix".to_string());
                }
            }
            EntityType::BrandName => {
                if !text.chars().next().is_some_and(char::is_uppercase) {
                    result
                        .issues
                        .push("brand name not capitalised".to_string());
                }
                if tables::KNOWN_BRANDS.contains(text.to_lowercase().as_str()) {
                    result.adjusted_confidence += 0.05;
                }
            }
            EntityType::Polymer | EntityType::Biological => {}
        }
    }

    /// Mentions surrounded by chemistry vocabulary are more trustworthy.
    fn score_context(&self, context: &str, result: &mut ValidationResult) {
        if context.is_empty() {
            return;
        }
        let lower = context.to_lowercase();
        if tables::CONTEXT_TERMS.iter().any(|t| lower.contains(t)) {
            result.adjusted_confidence += 0.05;
        } else {
            result.adjusted_confidence -= 0.10;
            result
                .issues
                .push("no chemistry term in context".to_string());
        }
    }
}

fn has_iupac_suffix(text: &str) -> bool {
    let lower = text.to_lowercase();
    tables::IUPAC_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntitySource;

    fn raw(text: &str, entity_type: EntityType, confidence: f64) -> RawEntity {
        RawEntity::new(text, 0, text.len(), entity_type, confidence, EntitySource::Ner)
    }

    fn with_context(mut e: RawEntity, context: &str) -> RawEntity {
        e.context = context.to_string();
        e
    }

    #[test]
    fn empty_text_is_rejected_with_zero_confidence() {
        let r = Validator::new().validate(&raw("   ", EntityType::CommonName, 0.9));
        assert!(!r.is_valid);
        assert_eq!(r.adjusted_confidence, 0.0);
    }

    #[test]
    fn blacklisted_term_keeps_confidence() {
        let r = Validator::new().validate(&raw("method", EntityType::CommonName, 0.8));
        assert!(!r.is_valid);
        assert_eq!(r.adjusted_confidence, 0.8);
        assert!(r.issues[0].contains("blacklisted"));
    }

    #[test]
    fn cas_valid_gets_boost() {
        let e = with_context(raw("50-78-2", EntityType::CasNumber, 0.70), "the compound");
        let r = Validator::new().validate(&e);
        assert!(r.is_valid);
        // +0.10 checksum, +0.05 context.
        assert!((r.adjusted_confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn common_name_with_cas_shape_is_reclassified() {
        let r = Validator::new().validate(&raw("50-78-2", EntityType::CommonName, 0.7));
        assert_eq!(r.adjusted_type, EntityType::CasNumber);
        assert!(r.corrections.contains_key("type"));
        assert!(r.is_valid);
    }

    #[test]
    fn iupac_formula_shape_reclassified_to_formula() {
        let r = Validator::new().validate(&raw("C9H8O4", EntityType::IupacName, 0.7));
        assert_eq!(r.adjusted_type, EntityType::MolecularFormula);
        assert!(r.is_valid);
    }

    #[test]
    fn iupac_with_suffix_keeps_type() {
        // Ends in -ol: reclassification must not touch it.
        let r = Validator::new().validate(&raw("ethanol", EntityType::IupacName, 0.7));
        assert_eq!(r.adjusted_type, EntityType::IupacName);
        assert!(r.is_valid);
    }

    #[test]
    fn generic_variable_reclassified_to_markush() {
        let r = Validator::new().validate(&raw("R1", EntityType::GenericStructure, 0.7));
        assert_eq!(r.adjusted_type, EntityType::MarkushVariable);
        assert!(r.is_valid);
    }

    #[test]
    fn smiles_validation_boost_and_issues() {
        let v = Validator::new();
        let ok = v.validate(&raw("CC(=O)Oc1ccccc1C(=O)O", EntityType::Smiles, 0.6));
        assert!(ok.is_valid);
        assert!((ok.adjusted_confidence - 0.75).abs() < 1e-9);

        let broken = v.validate(&raw("CC(=O", EntityType::Smiles, 0.6));
        assert!(!broken.is_valid);
        assert!(broken.issues.iter().any(|i| i.contains("parentheses")));

        let ring = v.validate(&raw("C1CCC", EntityType::Smiles, 0.6));
        assert!(!ring.is_valid);
        assert!(ring.issues.iter().any(|i| i.contains("ring closure")));
    }

    #[test]
    fn context_without_chemistry_terms_penalises() {
        let e = with_context(
            raw("aspirin", EntityType::CommonName, 0.70),
            "was mentioned in the meeting notes",
        );
        let r = Validator::new().validate(&e);
        assert!(r.is_valid);
        // +0.10 known drug, -0.10 context.
        assert!((r.adjusted_confidence - 0.70).abs() < 1e-9);
        assert!(r.issues.iter().any(|i| i.contains("context")));
    }

    #[test]
    fn inchi_prefix_checks() {
        let v = Validator::new();
        let ok = v.validate(&raw("InChI=1S/C2H6O/c1-2-3/h3H,2H2,1H3", EntityType::Inchi, 0.6));
        assert!(ok.is_valid);
        assert!((ok.adjusted_confidence - 0.75).abs() < 1e-9);

        let no_layers = v.validate(&raw("InChI=1S", EntityType::Inchi, 0.6));
        assert!(no_layers.is_valid);
        assert!(no_layers.issues.iter().any(|i| i.contains("layer")));

        let bad = v.validate(&raw("1S/C2H6O", EntityType::Inchi, 0.6));
        assert!(!bad.is_valid);
    }

    #[test]
    fn markush_variable_symbol_check() {
        let v = Validator::new();
        assert!(v.validate(&raw("R2", EntityType::MarkushVariable, 0.7)).is_valid);
        assert!(!v.validate(&raw("Rx", EntityType::MarkushVariable, 0.7)).is_valid);
    }

    #[test]
    fn confidence_is_clamped() {
        let e = with_context(raw("InChI=1S/CH4/h1H4", EntityType::Inchi, 0.95), "compound");
        let r = Validator::new().validate(&e);
        assert_eq!(r.adjusted_confidence, 1.0);
    }

    #[test]
    fn brand_name_checks() {
        let v = Validator::new();
        let known = v.validate(&raw("Lipitor", EntityType::BrandName, 0.7));
        assert!(known.is_valid);
        assert!((known.adjusted_confidence - 0.75).abs() < 1e-9);

        let lowercase = v.validate(&raw("unbranded", EntityType::BrandName, 0.7));
        assert!(lowercase.issues.iter().any(|i| i.contains("capitalised")));
    }
}
