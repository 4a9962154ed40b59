//! Tiered resolution of raw mentions to canonical structures.
//!
//! Each entity type selects a strategy chain; strategies run in order and
//! the first success wins. External failures are logged and treated as
//! "not found" so the chain falls through; only invalid input and
//! cancellation surface as errors.
pub mod markush;

use crate::cache::cache_key;
use crate::config::ResolverConfig;
use crate::dictionary::ChemDictionary;
use crate::error::{ChemError, Result};
use crate::ratelimit::RateLimiter;
use crate::services::{
    CheminformaticsService, CompoundRecord, ExternalRegistry, MetricsSink, NoopMetrics,
    ResolutionCache, SynonymDb,
};
use crate::types::{EntityType, RawEntity, ResolvedEntity};
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Resolution engine with injected collaborators. Every collaborator is
/// optional except the dictionary; a missing collaborator simply disables
/// the strategies that need it.
pub struct Resolver {
    config: ResolverConfig,
    dictionary: Arc<ChemDictionary>,
    chem: Option<Arc<dyn CheminformaticsService>>,
    registry: Option<Arc<dyn ExternalRegistry>>,
    synonyms: Option<Arc<dyn SynonymDb>>,
    cache: Option<Arc<dyn ResolutionCache>>,
    limiter: Arc<RateLimiter>,
    metrics: Arc<dyn MetricsSink>,
}

impl Resolver {
    pub fn new(config: ResolverConfig, dictionary: Arc<ChemDictionary>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.external_rps));
        Self {
            config,
            dictionary,
            chem: None,
            registry: None,
            synonyms: None,
            cache: None,
            limiter,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_cheminformatics(mut self, chem: Arc<dyn CheminformaticsService>) -> Self {
        self.chem = Some(chem);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn ExternalRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_synonyms(mut self, synonyms: Arc<dyn SynonymDb>) -> Self {
        self.synonyms = Some(synonyms);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Stops the owned rate limiter's refill task.
    pub fn shutdown(&self) {
        self.limiter.shutdown();
    }

    /// Resolves one raw entity. The only error returns are empty input and
    /// cancellation; everything else degrades to `is_resolved = false`.
    pub async fn resolve(
        &self,
        raw: &RawEntity,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEntity> {
        let text = raw.text.trim();
        if text.is_empty() {
            return Err(ChemError::EmptyInput("entity text"));
        }

        let key = cache_key(text, raw.entity_type);
        if self.config.cache_enabled {
            if let Some(cache) = &self.cache {
                if let Some(hit) = cache.get(&key).await {
                    debug!("cache hit for {key}");
                    self.metrics.incr("resolve.cache_hits", 1);
                    return Ok(hit);
                }
            }
        }

        let resolved = match raw.entity_type {
            EntityType::CasNumber => self.resolve_cas(raw, cancel).await?,
            EntityType::Smiles => self.resolve_smiles(raw, cancel).await?,
            EntityType::IupacName | EntityType::CommonName => {
                self.resolve_name(raw.clone(), raw.text.clone(), cancel).await?
            }
            EntityType::MolecularFormula => self.resolve_formula(raw, cancel).await?,
            EntityType::Inchi => self.resolve_inchi(raw, cancel).await?,
            EntityType::GenericStructure | EntityType::MarkushVariable => {
                self.resolve_generic(raw)
            }
            EntityType::BrandName => self.resolve_brand(raw, cancel).await?,
            EntityType::Polymer | EntityType::Biological => {
                ResolvedEntity::unresolved(raw.clone(), "not_resolvable")
            }
        };

        if self.config.cache_enabled && resolved.is_resolved {
            if let Some(cache) = &self.cache {
                cache.set(&key, resolved.clone()).await;
            }
        }
        Ok(resolved)
    }

    /// Resolves many entities with bounded concurrency, preserving input
    /// order. Per-item failures stay per-item; the call fails only when
    /// every item failed.
    pub async fn resolve_batch(
        &self,
        entities: &[RawEntity],
        cancel: &CancellationToken,
    ) -> Result<Vec<Result<ResolvedEntity>>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let semaphore = Arc::new(Semaphore::new(self.config.resolver_concurrency.max(1)));
        let futures = entities.iter().map(|entity| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| ChemError::Cancelled)?;
                self.resolve(entity, cancel).await
            }
        });
        let results = futures::future::join_all(futures).await;
        if results.iter().all(|r| r.is_err()) {
            return Err(ChemError::BatchFailed(results.len()));
        }
        Ok(results)
    }

    // --- per-type strategies ---

    async fn resolve_cas(
        &self,
        raw: &RawEntity,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEntity> {
        let cas = raw.text.trim().to_string();
        let mut resolved = ResolvedEntity::unresolved(raw.clone(), "not_found");
        resolved.cas_number = Some(cas.clone());

        if let Some(smiles) = self.dictionary.lookup_cas(&cas) {
            resolved.smiles = Some(smiles);
            resolved.is_resolved = true;
            resolved.resolution_method = "dictionary".to_string();
            self.enrich(&mut resolved).await;
            return Ok(resolved);
        }

        if let Some(record) = self
            .external(cancel, "CAS lookup", |registry| {
                let cas = cas.clone();
                async move { registry.search_by_cas(&cas).await }
            })
            .await?
        {
            self.apply_record(&mut resolved, record);
            resolved.is_resolved = true;
            resolved.resolution_method = "external_cas".to_string();
            self.enrich(&mut resolved).await;
            return Ok(resolved);
        }

        Ok(resolved)
    }

    async fn resolve_smiles(
        &self,
        raw: &RawEntity,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEntity> {
        let smiles = raw.text.trim().to_string();
        let mut resolved = ResolvedEntity::unresolved(raw.clone(), "not_found");

        if let Some(chem) = &self.chem {
            match chem.validate_smiles(&smiles).await {
                Ok(false) => {
                    resolved.notes.push("SMILES rejected by toolkit".to_string());
                    resolved.resolution_method = "invalid_smiles".to_string();
                    return Ok(resolved);
                }
                Ok(true) => {}
                Err(e) => warn!("SMILES validation unavailable: {e}"),
            }
            let canonical = match chem.canonicalize(&smiles).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("canonicalisation failed for {smiles}: {e}");
                    smiles.clone()
                }
            };
            resolved.smiles = Some(canonical);
        } else {
            resolved.smiles = Some(smiles.clone());
        }
        resolved.is_resolved = true;
        resolved.resolution_method = "cheminformatics".to_string();
        self.enrich(&mut resolved).await;

        // Optional: a name for the canonical structure.
        let canonical_smiles = resolved.smiles.clone().unwrap_or_default();
        if let Some(record) = self
            .external(cancel, "SMILES name lookup", |registry| {
                let s = canonical_smiles.clone();
                async move { registry.search_by_smiles(&s).await }
            })
            .await?
        {
            if let Some(name) = record.name.clone() {
                resolved.canonical_name = name;
            }
            self.apply_record(&mut resolved, record);
        }
        Ok(resolved)
    }

    /// Shared by IUPAC names, common names, and the brand fallthrough.
    async fn resolve_name(
        &self,
        raw: RawEntity,
        name: String,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEntity> {
        let name = name.trim().to_string();
        let mut resolved = ResolvedEntity::unresolved(raw, "not_found");
        resolved.canonical_name = name.clone();

        if let Some(smiles) = self.dictionary.lookup(&name) {
            resolved.smiles = Some(smiles);
            resolved.is_resolved = true;
            resolved.resolution_method = "dictionary".to_string();
            self.enrich(&mut resolved).await;
            return Ok(resolved);
        }

        if let Some(synonyms) = &self.synonyms {
            match synonyms.find_canonical(&name).await {
                Ok(Some(canonical)) => {
                    resolved.canonical_name = canonical.clone();
                    resolved.is_resolved = true;
                    resolved.resolution_method = "synonym_db".to_string();
                    if let Some(smiles) = self.dictionary.lookup(&canonical) {
                        resolved.smiles = Some(smiles);
                    }
                    match synonyms.find_synonyms(&canonical).await {
                        Ok(mut list) => {
                            list.truncate(self.config.max_synonyms);
                            resolved.synonyms = list;
                        }
                        Err(e) => warn!("synonym listing failed for {canonical}: {e}"),
                    }
                    self.enrich(&mut resolved).await;
                    return Ok(resolved);
                }
                Ok(None) => {}
                Err(e) => warn!("synonym lookup failed for {name}: {e}"),
            }
        }

        if let Some(record) = self
            .external(cancel, "name lookup", |registry| {
                let name = name.clone();
                async move { registry.search_by_name(&name).await }
            })
            .await?
        {
            if let Some(canonical) = record.name.clone() {
                resolved.canonical_name = canonical;
            }
            self.apply_record(&mut resolved, record);
            resolved.is_resolved = true;
            resolved.resolution_method = "external_name".to_string();
            self.enrich(&mut resolved).await;
            return Ok(resolved);
        }

        Ok(resolved)
    }

    async fn resolve_formula(
        &self,
        raw: &RawEntity,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEntity> {
        let formula = raw.text.trim().to_string();
        let mut resolved = ResolvedEntity::unresolved(raw.clone(), "not_found");

        if !crate::validate::validate_formula(&formula) {
            resolved.resolution_method = "invalid_formula".to_string();
            resolved.notes.push("formula failed validation".to_string());
            return Ok(resolved);
        }
        resolved.molecular_formula = Some(formula.clone());

        if let Some(record) = self
            .external(cancel, "formula lookup", |registry| {
                let formula = formula.clone();
                async move { registry.search_by_name(&formula).await }
            })
            .await?
        {
            // A formula names a composition, not a compound; the first hit
            // is a surrogate and the result is flagged accordingly.
            resolved.is_ambiguous = true;
            if let Some(name) = record.name.clone() {
                resolved
                    .notes
                    .push(format!("formula matched surrogate compound: {name}"));
                resolved.canonical_name = name;
            }
            self.apply_record(&mut resolved, record);
            resolved.is_resolved = true;
            resolved.resolution_method = "external_formula".to_string();
            self.enrich(&mut resolved).await;
        }
        Ok(resolved)
    }

    async fn resolve_inchi(
        &self,
        raw: &RawEntity,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEntity> {
        let inchi = raw.text.trim().to_string();
        let mut resolved = ResolvedEntity::unresolved(raw.clone(), "not_found");

        if !inchi.starts_with("InChI=") {
            resolved.resolution_method = "invalid_inchi".to_string();
            resolved.notes.push("missing InChI= prefix".to_string());
            return Ok(resolved);
        }
        resolved.inchi = Some(inchi.clone());
        resolved.is_resolved = true;
        resolved.resolution_method = "inchi_format".to_string();
        // The formula layer is recoverable without any toolkit.
        resolved.molecular_formula = crate::validate::inchi::formula_from_inchi(&inchi);

        if let Some(record) = self
            .external(cancel, "InChI lookup", |registry| {
                let inchi = inchi.clone();
                async move { registry.search_by_name(&inchi).await }
            })
            .await?
        {
            if let Some(name) = record.name.clone() {
                resolved.canonical_name = name;
            }
            self.apply_record(&mut resolved, record);
            resolved.resolution_method = "external_inchi".to_string();
        }
        self.enrich(&mut resolved).await;
        Ok(resolved)
    }

    fn resolve_generic(&self, raw: &RawEntity) -> ResolvedEntity {
        let mut resolved = ResolvedEntity::unresolved(raw.clone(), "constraint_extraction");
        let mut constraints = markush::extract_constraints(&raw.text);
        if constraints.is_empty() && !raw.context.is_empty() {
            constraints = markush::extract_constraints(&raw.context);
        }
        resolved.notes = constraints.notes();
        resolved
    }

    async fn resolve_brand(
        &self,
        raw: &RawEntity,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEntity> {
        let brand = raw.text.trim();
        match self.dictionary.lookup_brand(brand) {
            Some(common) => {
                let mut resolved = self.resolve_name(raw.clone(), common, cancel).await?;
                resolved.resolution_method = format!("brand_to_{}", resolved.resolution_method);
                Ok(resolved)
            }
            None => Ok(ResolvedEntity::unresolved(raw.clone(), "not_found")),
        }
    }

    // --- shared plumbing ---

    /// Rate-limited, timeout-bounded external registry call. `Ok(None)`
    /// covers "registry disabled", "no hit", and "registry errored"; only
    /// cancellation propagates as an error.
    async fn external<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        what: &str,
        call: F,
    ) -> Result<Option<T>>
    where
        F: FnOnce(Arc<dyn ExternalRegistry>) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if !self.config.external_lookup_enabled {
            return Ok(None);
        }
        let Some(registry) = self.registry.clone() else {
            return Ok(None);
        };
        self.limiter.acquire(cancel).await?;
        self.metrics.incr("resolve.external_lookups", 1);
        let bounded = tokio::time::timeout(self.config.external_lookup_timeout(), call(registry));
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(ChemError::Cancelled),
            outcome = bounded => outcome,
        };
        match outcome {
            Ok(Ok(hit)) => Ok(hit),
            Ok(Err(ChemError::Cancelled)) => Err(ChemError::Cancelled),
            Ok(Err(e)) => {
                warn!("external {what} failed: {e}");
                Ok(None)
            }
            Err(_) => {
                warn!(
                    "external {what} timed out after {} ms",
                    self.config.external_lookup_timeout_ms
                );
                Ok(None)
            }
        }
    }

    /// Copies registry record fields into the resolved entity without
    /// overwriting data an earlier strategy already produced.
    fn apply_record(&self, resolved: &mut ResolvedEntity, record: CompoundRecord) {
        if resolved.smiles.is_none() {
            resolved.smiles = record.smiles;
        }
        if resolved.inchi.is_none() {
            resolved.inchi = record.inchi;
        }
        if resolved.inchikey.is_none() {
            resolved.inchikey = record.inchikey;
        }
        if resolved.molecular_formula.is_none() {
            resolved.molecular_formula = record.molecular_formula;
        }
        if resolved.cas_number.is_none() {
            resolved.cas_number = record.cas_number;
        }
        if resolved.molecular_weight.is_none() {
            resolved.molecular_weight = record.molecular_weight;
        }
        if resolved.synonyms.is_empty() {
            let mut synonyms = record.synonyms;
            synonyms.truncate(self.config.max_synonyms);
            resolved.synonyms = synonyms;
        }
    }

    /// Derives InChI, InChIKey, molecular formula, and weight from the
    /// canonical SMILES. Each derivation is independent; one failure never
    /// aborts the rest.
    async fn enrich(&self, resolved: &mut ResolvedEntity) {
        let Some(chem) = &self.chem else { return };
        let Some(smiles) = resolved.smiles.clone() else {
            return;
        };
        if resolved.inchi.is_none() {
            match chem.smiles_to_inchi(&smiles).await {
                Ok(inchi) => resolved.inchi = Some(inchi),
                Err(e) => warn!("InChI derivation failed for {smiles}: {e}"),
            }
        }
        if resolved.inchikey.is_none() {
            match chem.smiles_to_inchikey(&smiles).await {
                Ok(key) => resolved.inchikey = Some(key),
                Err(e) => warn!("InChIKey derivation failed for {smiles}: {e}"),
            }
        }
        if resolved.molecular_formula.is_none() {
            match chem.smiles_to_formula(&smiles).await {
                Ok(formula) => resolved.molecular_formula = Some(formula),
                Err(e) => warn!("formula derivation failed for {smiles}: {e}"),
            }
        }
        if resolved.molecular_weight.is_none() {
            match chem.molecular_weight(&smiles).await {
                Ok(weight) => resolved.molecular_weight = Some(weight),
                Err(e) => warn!("weight computation failed for {smiles}: {e}"),
            }
        }
    }
}
