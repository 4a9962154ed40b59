//! Per-instance configuration for the extraction, NER, resolution, and
//! linking stages. All structs deserialize from partial files; missing keys
//! fall back to the documented defaults.
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Entities below this confidence are dropped after validation.
    pub min_confidence: f64,
    /// Characters kept on each side of a span as context.
    pub context_window_size: usize,
    pub enable_dictionary_lookup: bool,
    pub enable_ner: bool,
    /// Documents longer than this are truncated before extraction.
    pub max_text_length: usize,
    /// Worker cap for `extract_batch`.
    pub batch_concurrency: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.60,
            context_window_size: 50,
            enable_dictionary_lookup: true,
            enable_ner: true,
            max_text_length: 500_000,
            batch_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    /// Window length in tokens for sliding-window inference.
    pub max_sequence_length: usize,
    /// Spans whose geometric-mean probability falls below this are discarded.
    pub confidence_threshold: f64,
    /// Viterbi decoding when true; independent per-token argmax otherwise.
    pub use_crf: bool,
    /// Per-window backend timeout.
    pub timeout_ms: u64,
    /// Upper bound on concurrently predicted batch elements.
    pub max_batch_size: usize,
    /// BIO label list the backend was trained with. Index order must match
    /// the emission matrix columns.
    pub labels: Vec<String>,
}

impl NerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_labels() -> Vec<String> {
    let mut labels = vec!["O".to_string()];
    for kind in [
        "CAS_NUMBER",
        "SMILES",
        "MOLECULAR_FORMULA",
        "IUPAC_NAME",
        "COMMON_NAME",
        "BRAND_NAME",
        "GENERIC_STRUCTURE",
        "POLYMER",
        "BIOLOGICAL",
    ] {
        labels.push(format!("B-{kind}"));
        labels.push(format!("I-{kind}"));
    }
    labels
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: 256,
            confidence_threshold: 0.60,
            use_crf: true,
            timeout_ms: 2000,
            max_batch_size: 8,
            labels: default_labels(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub cache_enabled: bool,
    /// Cache freshness window in seconds.
    pub cache_ttl_secs: i64,
    pub external_lookup_enabled: bool,
    /// Per external call.
    pub external_lookup_timeout_ms: u64,
    /// Synonym lists are capped at this length.
    pub max_synonyms: usize,
    /// Worker cap for `resolve_batch`.
    pub resolver_concurrency: usize,
    /// Token-bucket fill rate for external lookups, requests per second.
    pub external_rps: u32,
}

impl ResolverConfig {
    pub fn external_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.external_lookup_timeout_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_secs: 24 * 60 * 60,
            external_lookup_enabled: true,
            external_lookup_timeout_ms: 5_000,
            max_synonyms: 20,
            resolver_concurrency: 10,
            external_rps: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Minimum Jaro-Winkler score for a fuzzy name match.
    pub fuzzy_threshold: f64,
    pub external_lookup_enabled: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.70,
            external_lookup_enabled: true,
        }
    }
}
