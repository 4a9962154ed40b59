//! Binds resolved entities to molecule records.
//!
//! Exact-match cascade (CAS, then SMILES, then InChIKey), then fuzzy name
//! matching over the store's names, then the external registry. The first
//! hit short-circuits; finding nothing is `Ok(None)`, not an error.
use crate::config::LinkerConfig;
use crate::error::Result;
use crate::services::{ExternalRegistry, MoleculeRecord, MoleculeStore};
use crate::types::{ExternalIds, MoleculeLink, ResolvedEntity};
use log::{debug, warn};
use std::sync::Arc;

pub struct MoleculeLinker {
    config: LinkerConfig,
    store: Arc<dyn MoleculeStore>,
    registry: Option<Arc<dyn ExternalRegistry>>,
}

impl MoleculeLinker {
    pub fn new(config: LinkerConfig, store: Arc<dyn MoleculeStore>) -> Self {
        Self {
            config,
            store,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn ExternalRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub async fn link(&self, entity: &ResolvedEntity) -> Result<Option<MoleculeLink>> {
        if let Some(cas) = entity.cas_number.as_deref() {
            if let Some(record) = self.store_lookup("CAS", self.store.find_by_cas(cas)).await {
                return Ok(Some(exact(entity, record, "cas")));
            }
        }
        if let Some(smiles) = entity.smiles.as_deref() {
            if let Some(record) = self
                .store_lookup("SMILES", self.store.find_by_smiles(smiles))
                .await
            {
                return Ok(Some(exact(entity, record, "smiles")));
            }
        }
        if let Some(inchikey) = entity.inchikey.as_deref() {
            if let Some(record) = self
                .store_lookup("InChIKey", self.store.find_by_inchikey(inchikey))
                .await
            {
                return Ok(Some(exact(entity, record, "inchikey")));
            }
        }

        if let Some(link) = self.fuzzy_name(entity).await {
            return Ok(Some(link));
        }

        if let Some(link) = self.external(entity).await {
            return Ok(Some(link));
        }

        Ok(None)
    }

    async fn fuzzy_name(&self, entity: &ResolvedEntity) -> Option<MoleculeLink> {
        let query = entity.canonical_name.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        let names = match self.store.names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("molecule store name listing failed: {e}");
                return None;
            }
        };
        let mut best: Option<(f64, String)> = None;
        for (name, id) in names {
            let score = strsim::jaro_winkler(&query, &name.to_lowercase());
            if score >= self.config.fuzzy_threshold
                && best.as_ref().is_none_or(|(s, _)| score > *s)
            {
                best = Some((score, id));
            }
        }
        best.map(|(score, id)| {
            debug!(
                "fuzzy matched '{}' to molecule {} (score {:.2})",
                entity.canonical_name, id, score
            );
            MoleculeLink {
                entity: entity.clone(),
                molecule_id: Some(id),
                external_ids: ExternalIds::default(),
                is_exact_match: false,
                similarity: score,
                match_method: "fuzzy_name".to_string(),
            }
        })
    }

    async fn external(&self, entity: &ResolvedEntity) -> Option<MoleculeLink> {
        if !self.config.external_lookup_enabled {
            return None;
        }
        let registry = self.registry.as_ref()?;

        let record = match registry.search_by_name(&entity.canonical_name).await {
            Ok(Some(record)) => Some(("external_name", record)),
            Ok(None) => None,
            Err(e) => {
                warn!("external name lookup failed: {e}");
                None
            }
        };
        let record = match record {
            Some(hit) => Some(hit),
            None => match entity.smiles.as_deref() {
                Some(smiles) => match registry.search_by_smiles(smiles).await {
                    Ok(Some(record)) => Some(("external_smiles", record)),
                    Ok(None) => None,
                    Err(e) => {
                        warn!("external SMILES lookup failed: {e}");
                        None
                    }
                },
                None => None,
            },
        };

        record.map(|(method, record)| MoleculeLink {
            entity: entity.clone(),
            molecule_id: None,
            external_ids: ExternalIds {
                pubchem_cid: record.cid,
                chembl_id: record.chembl_id,
                drugbank_id: record.drugbank_id,
            },
            is_exact_match: false,
            similarity: 0.0,
            match_method: method.to_string(),
        })
    }

    async fn store_lookup(
        &self,
        what: &str,
        lookup: impl std::future::Future<Output = Result<Option<MoleculeRecord>>>,
    ) -> Option<MoleculeRecord> {
        match lookup.await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("molecule store {what} lookup failed: {e}");
                None
            }
        }
    }
}

fn exact(entity: &ResolvedEntity, record: MoleculeRecord, method: &str) -> MoleculeLink {
    MoleculeLink {
        entity: entity.clone(),
        molecule_id: Some(record.id),
        external_ids: ExternalIds::default(),
        is_exact_match: true,
        similarity: 1.0,
        match_method: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryMoleculeStore;
    use crate::types::{EntitySource, EntityType, RawEntity};

    fn resolved(name: &str) -> ResolvedEntity {
        let raw = RawEntity::new(
            name,
            0,
            name.len(),
            EntityType::CommonName,
            0.9,
            EntitySource::Dictionary,
        );
        let mut r = ResolvedEntity::unresolved(raw, "dictionary");
        r.is_resolved = true;
        r
    }

    fn store_with_aspirin() -> Arc<InMemoryMoleculeStore> {
        let store = Arc::new(InMemoryMoleculeStore::new());
        store.insert(MoleculeRecord {
            id: "mol-42".to_string(),
            name: "aspirin".to_string(),
            cas_number: Some("50-78-2".to_string()),
            smiles: Some("CC(=O)Oc1ccccc1C(=O)O".to_string()),
            inchikey: Some("BSYNRYMUTXBXSQ-UHFFFAOYSA-N".to_string()),
        });
        store
    }

    #[tokio::test]
    async fn cas_match_is_exact_and_short_circuits() {
        let linker = MoleculeLinker::new(LinkerConfig::default(), store_with_aspirin());
        let mut entity = resolved("something else entirely");
        entity.cas_number = Some("50-78-2".to_string());

        let link = linker.link(&entity).await.unwrap().expect("link found");
        assert!(link.is_exact_match);
        assert_eq!(link.similarity, 1.0);
        assert_eq!(link.match_method, "cas");
        assert_eq!(link.molecule_id.as_deref(), Some("mol-42"));
    }

    #[tokio::test]
    async fn inchikey_match_after_cas_and_smiles_miss() {
        let linker = MoleculeLinker::new(LinkerConfig::default(), store_with_aspirin());
        let mut entity = resolved("unknown");
        entity.inchikey = Some("BSYNRYMUTXBXSQ-UHFFFAOYSA-N".to_string());

        let link = linker.link(&entity).await.unwrap().expect("link found");
        assert_eq!(link.match_method, "inchikey");
    }

    #[tokio::test]
    async fn fuzzy_name_match_above_threshold() {
        let linker = MoleculeLinker::new(LinkerConfig::default(), store_with_aspirin());
        // Typo, still close to "aspirin".
        let entity = resolved("asprin");
        let link = linker.link(&entity).await.unwrap().expect("link found");
        assert!(!link.is_exact_match);
        assert_eq!(link.match_method, "fuzzy_name");
        assert!(link.similarity >= 0.70 && link.similarity < 1.0);
    }

    #[tokio::test]
    async fn nothing_found_is_none_not_error() {
        let linker = MoleculeLinker::new(LinkerConfig::default(), store_with_aspirin());
        let entity = resolved("completely unrelated zzz");
        assert!(linker.link(&entity).await.unwrap().is_none());
    }
}
