//! Collaborator contracts consumed by the pipeline.
//!
//! The neural backend, cheminformatics toolkit, external registry, synonym
//! store, and molecule storage are all injected dependencies behind narrow
//! traits. The core never owns their lifecycles.
use crate::error::Result;
use crate::types::ResolvedEntity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// `T x K` matrix of non-negative per-(token, label) scores. Row order
/// follows the token sequence sent to the backend; column order follows the
/// configured label list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionMatrix {
    /// Wire key mandated by the backend protocol.
    pub emission: Vec<Vec<f64>>,
}

impl EmissionMatrix {
    pub fn rows(&self) -> usize {
        self.emission.len()
    }
}

/// Sequence-labelling model backend. Only the emission-matrix contract is
/// specified here; inference internals are the implementor's business.
#[async_trait]
pub trait NerBackend: Send + Sync {
    /// Returns a matrix with exactly one row per token. A row count mismatch
    /// is a fatal error for the window that sent the tokens.
    async fn predict(&self, tokens: &[String]) -> Result<EmissionMatrix>;
}

/// Structure-level operations delegated to a cheminformatics toolkit.
/// Every operation may fail independently; the resolver treats failure as
/// "not computed".
#[async_trait]
pub trait CheminformaticsService: Send + Sync {
    async fn validate_smiles(&self, smiles: &str) -> Result<bool>;
    async fn canonicalize(&self, smiles: &str) -> Result<String>;
    async fn smiles_to_inchi(&self, smiles: &str) -> Result<String>;
    async fn smiles_to_inchikey(&self, smiles: &str) -> Result<String>;
    async fn smiles_to_formula(&self, smiles: &str) -> Result<String>;
    async fn molecular_weight(&self, smiles: &str) -> Result<f64>;
}

/// A compound record returned by an external registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompoundRecord {
    pub cid: Option<u64>,
    pub name: Option<String>,
    pub smiles: Option<String>,
    pub inchi: Option<String>,
    pub inchikey: Option<String>,
    pub molecular_formula: Option<String>,
    pub cas_number: Option<String>,
    pub molecular_weight: Option<f64>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub chembl_id: Option<String>,
    pub drugbank_id: Option<String>,
}

/// External chemistry registry (e.g. PubChem). `Ok(None)` means "no such
/// compound"; `Err` means the service misbehaved and the caller should
/// degrade gracefully.
#[async_trait]
pub trait ExternalRegistry: Send + Sync {
    async fn search_by_name(&self, name: &str) -> Result<Option<CompoundRecord>>;
    async fn search_by_cas(&self, cas: &str) -> Result<Option<CompoundRecord>>;
    async fn search_by_smiles(&self, smiles: &str) -> Result<Option<CompoundRecord>>;
    async fn get(&self, cid: u64) -> Result<Option<CompoundRecord>>;
}

/// Synonym storage keyed by canonical name.
#[async_trait]
pub trait SynonymDb: Send + Sync {
    async fn find_canonical(&self, name: &str) -> Result<Option<String>>;
    async fn find_synonyms(&self, name: &str) -> Result<Vec<String>>;
    async fn add_synonym(&self, canonical: &str, synonym: &str) -> Result<()>;
}

/// Keyed at-most-once storage for resolution results. TTL and eviction are
/// the implementation's concern.
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<ResolvedEntity>;
    async fn set(&self, key: &str, value: ResolvedEntity);
    async fn invalidate(&self, key: &str);
}

/// An internal molecule record the linker can bind entities to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoleculeRecord {
    pub id: String,
    pub name: String,
    pub cas_number: Option<String>,
    pub smiles: Option<String>,
    pub inchikey: Option<String>,
}

/// Internal molecule storage lookup contract.
#[async_trait]
pub trait MoleculeStore: Send + Sync {
    async fn find_by_cas(&self, cas: &str) -> Result<Option<MoleculeRecord>>;
    async fn find_by_smiles(&self, smiles: &str) -> Result<Option<MoleculeRecord>>;
    async fn find_by_inchikey(&self, inchikey: &str) -> Result<Option<MoleculeRecord>>;
    /// `(name, id)` pairs for fuzzy name matching.
    async fn names(&self) -> Result<Vec<(String, String)>>;
}

/// Counters and timings emitted by the pipeline. Implementations must be
/// cheap; sinks are called on hot paths.
pub trait MetricsSink: Send + Sync {
    fn incr(&self, counter: &str, value: u64);
    fn observe_ms(&self, timer: &str, millis: u64);
}

/// Discards everything; the default sink.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _counter: &str, _value: u64) {}
    fn observe_ms(&self, _timer: &str, _millis: u64) {}
}

/// Emits every metric as a debug log line; handy in the CLI.
#[derive(Debug, Default)]
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn incr(&self, counter: &str, value: u64) {
        log::debug!("metric {counter} += {value}");
    }

    fn observe_ms(&self, timer: &str, millis: u64) {
        log::debug!("metric {timer} = {millis} ms");
    }
}

/// Process-local synonym store backed by a folded-key map.
#[derive(Debug, Default)]
pub struct InMemorySynonymDb {
    // canonical -> synonyms, plus reverse index synonym -> canonical
    forward: RwLock<HashMap<String, Vec<String>>>,
    reverse: RwLock<HashMap<String, String>>,
}

impl InMemorySynonymDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-loads `canonical,synonym` rows. Returns the number of pairs
    /// added.
    pub fn load_csv(&self, path: &std::path::Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let canonical_idx = headers
            .iter()
            .position(|h| h == "canonical")
            .ok_or_else(|| crate::error::ChemError::MissingHeader("canonical".to_string()))?;
        let synonym_idx = headers
            .iter()
            .position(|h| h == "synonym")
            .ok_or_else(|| crate::error::ChemError::MissingHeader("synonym".to_string()))?;

        let mut added = 0;
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 2;
            let canonical = record.get(canonical_idx).unwrap_or("").trim();
            let synonym = record.get(synonym_idx).unwrap_or("").trim();
            if canonical.is_empty() {
                return Err(crate::error::ChemError::MissingValue {
                    column: "canonical".to_string(),
                    row,
                });
            }
            if synonym.is_empty() {
                return Err(crate::error::ChemError::MissingValue {
                    column: "synonym".to_string(),
                    row,
                });
            }
            self.forward
                .write()
                .expect("synonym lock poisoned")
                .entry(fold(canonical))
                .or_default()
                .push(synonym.to_string());
            self.reverse
                .write()
                .expect("synonym lock poisoned")
                .insert(fold(synonym), canonical.to_string());
            added += 1;
        }
        Ok(added)
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

#[async_trait]
impl SynonymDb for InMemorySynonymDb {
    async fn find_canonical(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .reverse
            .read()
            .expect("synonym lock poisoned")
            .get(&fold(name))
            .cloned())
    }

    async fn find_synonyms(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .forward
            .read()
            .expect("synonym lock poisoned")
            .get(&fold(name))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_synonym(&self, canonical: &str, synonym: &str) -> Result<()> {
        self.forward
            .write()
            .expect("synonym lock poisoned")
            .entry(fold(canonical))
            .or_default()
            .push(synonym.trim().to_string());
        self.reverse
            .write()
            .expect("synonym lock poisoned")
            .insert(fold(synonym), canonical.trim().to_string());
        Ok(())
    }
}

/// Process-local molecule store.
#[derive(Debug, Default)]
pub struct InMemoryMoleculeStore {
    records: RwLock<Vec<MoleculeRecord>>,
}

impl InMemoryMoleculeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: MoleculeRecord) {
        self.records
            .write()
            .expect("molecule store lock poisoned")
            .push(record);
    }
}

#[async_trait]
impl MoleculeStore for InMemoryMoleculeStore {
    async fn find_by_cas(&self, cas: &str) -> Result<Option<MoleculeRecord>> {
        let folded = fold(cas);
        Ok(self
            .records
            .read()
            .expect("molecule store lock poisoned")
            .iter()
            .find(|r| r.cas_number.as_deref().is_some_and(|c| fold(c) == folded))
            .cloned())
    }

    async fn find_by_smiles(&self, smiles: &str) -> Result<Option<MoleculeRecord>> {
        let trimmed = smiles.trim();
        Ok(self
            .records
            .read()
            .expect("molecule store lock poisoned")
            .iter()
            .find(|r| r.smiles.as_deref() == Some(trimmed))
            .cloned())
    }

    async fn find_by_inchikey(&self, inchikey: &str) -> Result<Option<MoleculeRecord>> {
        let trimmed = inchikey.trim();
        Ok(self
            .records
            .read()
            .expect("molecule store lock poisoned")
            .iter()
            .find(|r| r.inchikey.as_deref() == Some(trimmed))
            .cloned())
    }

    async fn names(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .records
            .read()
            .expect("molecule store lock poisoned")
            .iter()
            .map(|r| (r.name.clone(), r.id.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synonym_db_round_trip() {
        let db = InMemorySynonymDb::new();
        db.add_synonym("acetylsalicylic acid", "aspirin").await.unwrap();
        db.add_synonym("acetylsalicylic acid", "ASA").await.unwrap();

        assert_eq!(
            db.find_canonical("Aspirin").await.unwrap().as_deref(),
            Some("acetylsalicylic acid")
        );
        let synonyms = db.find_synonyms("ACETYLSALICYLIC ACID").await.unwrap();
        assert_eq!(synonyms, vec!["aspirin", "ASA"]);
        assert!(db.find_canonical("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn synonym_csv_loading() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "canonical,synonym").unwrap();
        writeln!(file, "acetylsalicylic acid,aspirin").unwrap();
        writeln!(file, "acetylsalicylic acid,ASA").unwrap();
        let db = InMemorySynonymDb::new();
        assert_eq!(db.load_csv(file.path()).unwrap(), 2);
        assert_eq!(
            db.find_canonical("ASA").await.unwrap().as_deref(),
            Some("acetylsalicylic acid")
        );
    }

    #[test]
    fn noop_and_log_metrics_accept_values() {
        NoopMetrics.incr("extract.entities", 3);
        NoopMetrics.observe_ms("extract.elapsed", 12);
        LogMetrics.incr("extract.entities", 3);
        LogMetrics.observe_ms("extract.elapsed", 12);
    }

    #[tokio::test]
    async fn molecule_store_lookups() {
        let store = InMemoryMoleculeStore::new();
        store.insert(MoleculeRecord {
            id: "mol-1".to_string(),
            name: "aspirin".to_string(),
            cas_number: Some("50-78-2".to_string()),
            smiles: Some("CC(=O)Oc1ccccc1C(=O)O".to_string()),
            inchikey: Some("BSYNRYMUTXBXSQ-UHFFFAOYSA-N".to_string()),
        });

        assert!(store.find_by_cas("50-78-2").await.unwrap().is_some());
        assert!(
            store
                .find_by_inchikey("BSYNRYMUTXBXSQ-UHFFFAOYSA-N")
                .await
                .unwrap()
                .is_some()
        );
        assert!(store.find_by_smiles("CCO").await.unwrap().is_none());
        assert_eq!(store.names().await.unwrap().len(), 1);
    }
}
