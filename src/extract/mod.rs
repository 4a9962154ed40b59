//! End-to-end extraction orchestration: normalise, gather candidates from
//! every enabled source, merge, validate, filter, and report.
pub mod overlap;
pub mod sources;

use crate::config::ExtractionConfig;
use crate::dictionary::ChemDictionary;
use crate::error::{ChemError, Result};
use crate::ner::NerPredictor;
use crate::resolve::{Resolver, markush};
use crate::services::{MetricsSink, NoopMetrics};
use crate::text::{normalize, tokenize};
use crate::types::{EntitySource, EntityType, RawEntity, ResolvedEntity};
use crate::validate::Validator;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Candidate counts per extraction source, before merging.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SourceCounts {
    pub dictionary: usize,
    pub regex: usize,
    pub ner: usize,
}

/// Extraction output: the final entity list plus run statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub entities: Vec<RawEntity>,
    /// Fraction of the normalised text covered by entities, clamped to 1.0.
    pub coverage: f64,
    pub source_counts: SourceCounts,
    pub dropped_by_validation: usize,
    pub truncated: bool,
    pub text_length: usize,
    pub elapsed_ms: u64,
    pub ner_elapsed_ms: u64,
}

/// A technical feature of a claim, with offsets into the normalised claim
/// text.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalFeature {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Claim-level extraction: the plain result, entities grouped per feature,
/// and expanded Markush variable definitions.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimExtraction {
    pub result: ExtractionResult,
    /// Parallel to the input feature list: entities whose span overlaps the
    /// feature's span.
    pub feature_entities: Vec<Vec<RawEntity>>,
    /// Variable symbol -> expanded substituent names.
    pub markush_mapping: HashMap<String, Vec<String>>,
    /// Variable symbol -> resolved substituents, when a resolver is
    /// attached.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub markush_resolutions: HashMap<String, Vec<ResolvedEntity>>,
}

pub struct Extractor {
    config: ExtractionConfig,
    dictionary: Arc<ChemDictionary>,
    validator: Validator,
    ner: Option<Arc<NerPredictor>>,
    resolver: Option<Arc<Resolver>>,
    metrics: Arc<dyn MetricsSink>,
}

impl Extractor {
    pub fn new(config: ExtractionConfig, dictionary: Arc<ChemDictionary>) -> Self {
        Self {
            config,
            dictionary,
            validator: Validator::new(),
            ner: None,
            resolver: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_ner(mut self, ner: Arc<NerPredictor>) -> Self {
        self.ner = Some(ner);
        self
    }

    /// Enables substituent resolution in [`Extractor::extract_from_claim`].
    pub fn with_resolver(mut self, resolver: Arc<Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Extracts chemical entities from one document.
    pub async fn extract(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        let started = Instant::now();
        let mut normalized = normalize(text);
        let truncated = normalized.len() > self.config.max_text_length;
        if truncated {
            let mut cut = self.config.max_text_length;
            while cut > 0 && !normalized.is_char_boundary(cut) {
                cut -= 1;
            }
            normalized.truncate(cut);
            warn!(
                "input truncated to {} bytes before extraction",
                normalized.len()
            );
        }
        if normalized.is_empty() {
            return Ok(ExtractionResult {
                entities: Vec::new(),
                coverage: 0.0,
                source_counts: SourceCounts::default(),
                dropped_by_validation: 0,
                truncated,
                text_length: 0,
                elapsed_ms: 0,
                ner_elapsed_ms: 0,
            });
        }
        if cancel.is_cancelled() {
            return Err(ChemError::Cancelled);
        }

        let tokens = tokenize(&normalized);
        let mut candidates: Vec<RawEntity> = Vec::new();
        let mut counts = SourceCounts::default();

        if self.config.enable_dictionary_lookup {
            let mut dict_hits = sources::dictionary_matches(&normalized, &tokens, &self.dictionary);
            dict_hits.extend(sources::cas_matches(&normalized));
            counts.dictionary = dict_hits.len();
            candidates.append(&mut dict_hits);
        }

        let mut regex_hits = sources::formula_matches(&normalized);
        regex_hits.extend(sources::smiles_matches(&normalized));
        regex_hits.extend(sources::inchi_matches(&normalized));
        regex_hits.extend(sources::markush_matches(&normalized));
        regex_hits.extend(sources::polymer_matches(&normalized));
        regex_hits.extend(sources::biological_matches(&normalized));
        counts.regex = regex_hits.len();
        candidates.append(&mut regex_hits);

        let mut ner_elapsed_ms = 0;
        if self.config.enable_ner {
            if let Some(ner) = &self.ner {
                let ner_started = Instant::now();
                let prediction = tokio::select! {
                    _ = cancel.cancelled() => return Err(ChemError::Cancelled),
                    p = ner.predict(&normalized) => p,
                };
                ner_elapsed_ms = ner_started.elapsed().as_millis() as u64;
                match prediction {
                    Ok(spans) => {
                        counts.ner = spans.len();
                        candidates.extend(spans.into_iter().map(|s| {
                            RawEntity::new(
                                s.text,
                                s.start,
                                s.end,
                                s.entity_type,
                                s.confidence,
                                EntitySource::Ner,
                            )
                        }));
                    }
                    // A dimension mismatch means the backend disagrees about
                    // what we sent it; nothing downstream can be trusted.
                    Err(e @ ChemError::DimensionMismatch { .. }) => return Err(e),
                    Err(e) => warn!("NER unavailable, continuing without it: {e}"),
                }
            }
        }

        let mut entities = overlap::merge_and_resolve(candidates);
        overlap::attach_context(&mut entities, &normalized, self.config.context_window_size);

        let mut dropped = 0;
        let mut validated: Vec<RawEntity> = Vec::with_capacity(entities.len());
        for mut entity in entities {
            let verdict = self.validator.validate(&entity);
            if !verdict.is_valid {
                debug!(
                    "dropping '{}' ({}): {}",
                    entity.text,
                    entity.entity_type,
                    verdict.issues.join("; ")
                );
                dropped += 1;
                continue;
            }
            entity.entity_type = verdict.adjusted_type;
            entity.confidence = verdict.adjusted_confidence;
            validated.push(entity);
        }

        validated.retain(|e| e.confidence >= self.config.min_confidence);
        overlap::sort_candidates(&mut validated);

        let coverage = overlap::coverage(&validated, normalized.len());
        let result = ExtractionResult {
            coverage,
            source_counts: counts,
            dropped_by_validation: dropped,
            truncated,
            text_length: normalized.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            ner_elapsed_ms,
            entities: validated,
        };
        self.metrics.incr("extract.entities", result.entities.len() as u64);
        self.metrics.incr("extract.dropped", dropped as u64);
        self.metrics.observe_ms("extract.elapsed", result.elapsed_ms);
        info!(
            "extracted {} entities ({} dictionary, {} regex, {} ner candidates) in {} ms",
            result.entities.len(),
            result.source_counts.dictionary,
            result.source_counts.regex,
            result.source_counts.ner,
            result.elapsed_ms
        );
        Ok(result)
    }

    /// Extracts a batch of documents with bounded concurrency, results in
    /// input order. Per-item failures stay per-item unless every item fails.
    pub async fn extract_batch(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Result<ExtractionResult>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let futures = texts.iter().map(|text| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| ChemError::Cancelled)?;
                self.extract(text, cancel).await
            }
        });
        let results = futures::future::join_all(futures).await;
        if results.iter().all(|r| r.is_err()) {
            return Err(ChemError::BatchFailed(results.len()));
        }
        Ok(results)
    }

    /// Extracts from a patent claim: the plain extraction, plus entities
    /// grouped under the technical features whose spans they overlap, plus
    /// expanded definitions for every Markush variable found.
    ///
    /// Feature offsets refer to the normalised claim text.
    pub async fn extract_from_claim(
        &self,
        claim_text: &str,
        features: &[TechnicalFeature],
        cancel: &CancellationToken,
    ) -> Result<ClaimExtraction> {
        let result = self.extract(claim_text, cancel).await?;
        let normalized = normalize(claim_text);

        let feature_entities = features
            .iter()
            .map(|feature| {
                result
                    .entities
                    .iter()
                    .filter(|e| e.start < feature.end && feature.start < e.end)
                    .cloned()
                    .collect()
            })
            .collect();

        let mut markush_mapping = HashMap::new();
        for entity in &result.entities {
            if entity.entity_type != EntityType::MarkushVariable {
                continue;
            }
            if let Some(expansion) = find_definition(&normalized, &entity.text) {
                markush_mapping.insert(entity.text.clone(), expansion);
            }
        }

        let mut markush_resolutions = HashMap::new();
        if let Some(resolver) = &self.resolver {
            for (variable, substituents) in &markush_mapping {
                let raws: Vec<RawEntity> = substituents
                    .iter()
                    .map(|name| {
                        RawEntity::new(
                            name.clone(),
                            0,
                            name.len(),
                            EntityType::CommonName,
                            1.0,
                            EntitySource::MarkushExpansion,
                        )
                    })
                    .collect();
                match resolver.resolve_batch(&raws, cancel).await {
                    Ok(results) => {
                        let resolved: Vec<ResolvedEntity> = results
                            .into_iter()
                            .filter_map(|r| match r {
                                Ok(entity) => Some(entity),
                                Err(e) => {
                                    warn!("substituent resolution failed for {variable}: {e}");
                                    None
                                }
                            })
                            .collect();
                        markush_resolutions.insert(variable.clone(), resolved);
                    }
                    Err(e) => warn!("substituent batch failed for {variable}: {e}"),
                }
            }
        }

        Ok(ClaimExtraction {
            result,
            feature_entities,
            markush_mapping,
            markush_resolutions,
        })
    }
}

/// Finds `<var> (is|represents|denotes|=) ...` in the claim and expands the
/// clause up to the next `;` or `.`.
fn find_definition(claim: &str, variable: &str) -> Option<Vec<String>> {
    for caps in sources::MARKUSH_DEFINITION.captures_iter(claim) {
        if &caps[1] != variable {
            continue;
        }
        let clause_start = caps.get(0)?.end();
        let rest = &claim[clause_start..];
        let clause_end = rest.find([';', '.']).unwrap_or(rest.len());
        let expanded = markush::expand_definition(&rest[..clause_end]);
        if !expanded.is_empty() {
            return Some(expanded);
        }
    }
    None
}
