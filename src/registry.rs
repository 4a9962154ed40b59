//! PubChem PUG-REST implementation of the external registry contract.
use crate::error::{ChemError, Result};
use crate::services::{CompoundRecord, ExternalRegistry};
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;
use urlencoding::encode;

const PUBCHEM_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";
pub const USER_AGENT: &str = "chemtract/0.1 (chemical entity extraction; reqwest)";

const PROPERTY_LIST: &str = "Title,CanonicalSMILES,InChI,InChIKey,MolecularFormula,MolecularWeight";

/// Response shape of the PUG-REST property tables.
#[derive(Debug, Deserialize)]
struct PropertyResponse {
    #[serde(rename = "PropertyTable")]
    property_table: PropertyTable,
}

#[derive(Debug, Deserialize)]
struct PropertyTable {
    #[serde(rename = "Properties", default)]
    properties: Vec<PropertyRow>,
}

#[derive(Debug, Deserialize)]
struct PropertyRow {
    #[serde(rename = "CID")]
    cid: Option<u64>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "CanonicalSMILES")]
    canonical_smiles: Option<String>,
    #[serde(rename = "InChI")]
    inchi: Option<String>,
    #[serde(rename = "InChIKey")]
    inchikey: Option<String>,
    #[serde(rename = "MolecularFormula")]
    molecular_formula: Option<String>,
    // PUG-REST serialises the weight as a string.
    #[serde(rename = "MolecularWeight")]
    molecular_weight: Option<String>,
}

impl PropertyRow {
    fn into_record(self, cas_number: Option<String>) -> CompoundRecord {
        CompoundRecord {
            cid: self.cid,
            name: self.title,
            smiles: self.canonical_smiles,
            inchi: self.inchi,
            inchikey: self.inchikey,
            molecular_formula: self.molecular_formula,
            cas_number,
            molecular_weight: self
                .molecular_weight
                .as_deref()
                .and_then(|w| w.parse::<f64>().ok()),
            synonyms: Vec::new(),
            chembl_id: None,
            drugbank_id: None,
        }
    }
}

/// PubChem client. CAS numbers are looked up through the name endpoint,
/// which PubChem resolves against registry identifiers as well.
pub struct PubChemRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl PubChemRegistry {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ChemError::ApiRequestError)?;
        Ok(Self {
            client,
            base_url: PUBCHEM_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different server, for tests and mirrors.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_properties(&self, path: &str, query: &str) -> Result<Option<CompoundRecord>> {
        let url = format!(
            "{}/compound/{path}/property/{PROPERTY_LIST}/JSON",
            self.base_url
        );
        info!("PubChem lookup: {query}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ChemError::ApiRequestError)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            warn!("PubChem returned {status} for {query}");
            return Err(ChemError::ApiStatusError {
                status,
                query: query.to_string(),
            });
        }

        let parsed: PropertyResponse = response
            .json()
            .await
            .map_err(ChemError::ApiJsonDecodeError)?;
        Ok(parsed
            .property_table
            .properties
            .into_iter()
            .next()
            .map(|row| row.into_record(None)))
    }
}

#[async_trait]
impl ExternalRegistry for PubChemRegistry {
    async fn search_by_name(&self, name: &str) -> Result<Option<CompoundRecord>> {
        let path = format!("name/{}", encode(name.trim()));
        self.fetch_properties(&path, name).await
    }

    async fn search_by_cas(&self, cas: &str) -> Result<Option<CompoundRecord>> {
        let path = format!("name/{}", encode(cas.trim()));
        let record = self.fetch_properties(&path, cas).await?;
        Ok(record.map(|mut r| {
            r.cas_number = Some(cas.trim().to_string());
            r
        }))
    }

    async fn search_by_smiles(&self, smiles: &str) -> Result<Option<CompoundRecord>> {
        let path = format!("smiles/{}", encode(smiles.trim()));
        self.fetch_properties(&path, smiles).await
    }

    async fn get(&self, cid: u64) -> Result<Option<CompoundRecord>> {
        let path = format!("cid/{cid}");
        self.fetch_properties(&path, &cid.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_response_parses() {
        let body = r#"{
            "PropertyTable": {
                "Properties": [{
                    "CID": 2244,
                    "Title": "Aspirin",
                    "CanonicalSMILES": "CC(=O)OC1=CC=CC=C1C(=O)O",
                    "InChI": "InChI=1S/C9H8O4/c1-6(10)13-8-5-3-2-4-7(8)9(11)12/h2-5H,1H3,(H,11,12)",
                    "InChIKey": "BSYNRYMUTXBXSQ-UHFFFAOYSA-N",
                    "MolecularFormula": "C9H8O4",
                    "MolecularWeight": "180.16"
                }]
            }
        }"#;
        let parsed: PropertyResponse = serde_json::from_str(body).unwrap();
        let record = parsed
            .property_table
            .properties
            .into_iter()
            .next()
            .unwrap()
            .into_record(Some("50-78-2".to_string()));
        assert_eq!(record.cid, Some(2244));
        assert_eq!(record.name.as_deref(), Some("Aspirin"));
        assert_eq!(record.molecular_weight, Some(180.16));
        assert_eq!(record.cas_number.as_deref(), Some("50-78-2"));
    }

    #[test]
    fn empty_property_table_parses_to_no_record() {
        let body = r#"{"PropertyTable": {"Properties": []}}"#;
        let parsed: PropertyResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.property_table.properties.is_empty());
    }

    #[tokio::test]
    #[ignore] // Hits the live PubChem API.
    async fn live_aspirin_lookup() {
        let registry = PubChemRegistry::new().unwrap();
        let record = registry.search_by_name("aspirin").await.unwrap().unwrap();
        assert_eq!(record.cid, Some(2244));
        assert_eq!(record.molecular_formula.as_deref(), Some("C9H8O4"));
    }

    #[tokio::test]
    #[ignore] // Hits the live PubChem API.
    async fn live_unknown_name_is_none() {
        let registry = PubChemRegistry::new().unwrap();
        let record = registry
            .search_by_name("definitely-not-a-compound-xyzzy")
            .await
            .unwrap();
        assert!(record.is_none());
    }
}
