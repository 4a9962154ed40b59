//! Entity data model shared across the extraction, validation, and
//! resolution stages.
use serde::{Deserialize, Serialize};

/// Closed taxonomy of chemical-entity mentions the pipeline recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    CasNumber,
    Smiles,
    Inchi,
    MolecularFormula,
    IupacName,
    CommonName,
    BrandName,
    GenericStructure,
    MarkushVariable,
    Polymer,
    Biological,
}

impl EntityType {
    /// Stable tag used in cache keys, BIO labels, and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::CasNumber => "CAS_NUMBER",
            EntityType::Smiles => "SMILES",
            EntityType::Inchi => "INCHI",
            EntityType::MolecularFormula => "MOLECULAR_FORMULA",
            EntityType::IupacName => "IUPAC_NAME",
            EntityType::CommonName => "COMMON_NAME",
            EntityType::BrandName => "BRAND_NAME",
            EntityType::GenericStructure => "GENERIC_STRUCTURE",
            EntityType::MarkushVariable => "MARKUSH_VARIABLE",
            EntityType::Polymer => "POLYMER",
            EntityType::Biological => "BIOLOGICAL",
        }
    }

    /// Parses the tag written by [`EntityType::as_str`]. BIO label suffixes
    /// use the same spelling, so this also decodes `B-X`/`I-X` suffixes.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "CAS_NUMBER" => Some(EntityType::CasNumber),
            "SMILES" => Some(EntityType::Smiles),
            "INCHI" => Some(EntityType::Inchi),
            "MOLECULAR_FORMULA" => Some(EntityType::MolecularFormula),
            "IUPAC_NAME" => Some(EntityType::IupacName),
            "COMMON_NAME" => Some(EntityType::CommonName),
            "BRAND_NAME" => Some(EntityType::BrandName),
            "GENERIC_STRUCTURE" => Some(EntityType::GenericStructure),
            "MARKUSH_VARIABLE" => Some(EntityType::MarkushVariable),
            "POLYMER" => Some(EntityType::Polymer),
            "BIOLOGICAL" => Some(EntityType::Biological),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stage of the pipeline produced a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    Dictionary,
    Regex,
    Ner,
    MarkushExpansion,
}

impl EntitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitySource::Dictionary => "dictionary",
            EntitySource::Regex => "regex",
            EntitySource::Ner => "ner",
            EntitySource::MarkushExpansion => "markush_expansion",
        }
    }
}

/// A located mention of a chemical entity in the normalised document text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntity {
    pub text: String,
    /// Byte offset of the first character in the normalised text.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub entity_type: EntityType,
    pub confidence: f64,
    /// Surrounding characters attached after overlap resolution.
    #[serde(default)]
    pub context: String,
    pub source: EntitySource,
    #[serde(default)]
    pub is_nested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_text: Option<String>,
}

impl RawEntity {
    pub fn new(
        text: impl Into<String>,
        start: usize,
        end: usize,
        entity_type: EntityType,
        confidence: f64,
        source: EntitySource,
    ) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            entity_type,
            confidence,
            context: String::new(),
            source,
            is_nested: false,
            parent_text: None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when the two spans share at least one byte.
    pub fn overlaps(&self, other: &RawEntity) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely inside this span.
    pub fn contains(&self, other: &RawEntity) -> bool {
        self.start <= other.start && other.end <= self.end && self.len() > other.len()
    }
}

/// Canonical view of a raw entity after resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub raw: RawEntity,
    pub canonical_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smiles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inchi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inchikey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cas_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_weight: Option<f64>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub is_resolved: bool,
    #[serde(default)]
    pub is_ambiguous: bool,
    /// Names the strategy branch that produced the result, e.g.
    /// `"dictionary"`, `"external_cas"`, `"brand_to_dictionary"`,
    /// `"not_found"`.
    pub resolution_method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ResolvedEntity {
    /// Unresolved carrier for `raw`, keeping the original surface text as the
    /// canonical name.
    pub fn unresolved(raw: RawEntity, method: impl Into<String>) -> Self {
        let canonical_name = raw.text.clone();
        Self {
            raw,
            canonical_name,
            smiles: None,
            inchi: None,
            inchikey: None,
            molecular_formula: None,
            cas_number: None,
            molecular_weight: None,
            synonyms: Vec::new(),
            is_resolved: false,
            is_ambiguous: false,
            resolution_method: method.into(),
            notes: Vec::new(),
        }
    }
}

/// Identifiers in external registries attached by the linker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubchem_cid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chembl_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drugbank_id: Option<String>,
}

impl ExternalIds {
    pub fn is_empty(&self) -> bool {
        self.pubchem_cid.is_none() && self.chembl_id.is_none() && self.drugbank_id.is_none()
    }
}

/// Binding of a resolved entity to molecule storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoleculeLink {
    pub entity: ResolvedEntity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecule_id: Option<String>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    pub is_exact_match: bool,
    pub similarity: f64,
    /// Names the cascade stage that matched, e.g. `"cas"`, `"fuzzy_name"`.
    pub match_method: String,
}
