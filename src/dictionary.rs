//! In-memory chemical dictionary: case-folded name → SMILES, CAS → SMILES,
//! and brand → common-name maps.
//!
//! Loaders (bulk CSV import) serialize on the writer side of one lock;
//! lookups run concurrently and never fail: a missing key is `None`.
use crate::error::{ChemError, Result};
use log::info;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

fn fold(key: &str) -> String {
    key.trim().to_lowercase()
}

#[derive(Debug, Default)]
struct Maps {
    name_to_smiles: HashMap<String, String>,
    cas_to_smiles: HashMap<String, String>,
    brand_to_common: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct ChemDictionary {
    maps: RwLock<Maps>,
}

impl ChemDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small built-in seed so extraction works without external files.
    pub fn with_defaults() -> Self {
        let dict = Self::new();
        for (name, smiles) in [
            ("aspirin", "CC(=O)Oc1ccccc1C(=O)O"),
            ("acetylsalicylic acid", "CC(=O)Oc1ccccc1C(=O)O"),
            ("paracetamol", "CC(=O)Nc1ccc(O)cc1"),
            ("acetaminophen", "CC(=O)Nc1ccc(O)cc1"),
            ("ibuprofen", "CC(C)Cc1ccc(cc1)C(C)C(=O)O"),
            ("caffeine", "Cn1cnc2c1c(=O)n(C)c(=O)n2C"),
            ("ethanol", "CCO"),
            ("benzene", "c1ccccc1"),
            ("glucose", "OCC1OC(O)C(O)C(O)C1O"),
            ("water", "O"),
        ] {
            dict.insert_name(name, smiles);
        }
        for (cas, smiles) in [
            ("50-78-2", "CC(=O)Oc1ccccc1C(=O)O"),
            ("103-90-2", "CC(=O)Nc1ccc(O)cc1"),
            ("58-08-2", "Cn1cnc2c1c(=O)n(C)c(=O)n2C"),
            ("64-17-5", "CCO"),
            ("71-43-2", "c1ccccc1"),
        ] {
            dict.insert_cas(cas, smiles);
        }
        for (brand, common) in [
            ("tylenol", "paracetamol"),
            ("advil", "ibuprofen"),
            ("motrin", "ibuprofen"),
            ("aspirin", "acetylsalicylic acid"),
        ] {
            dict.insert_brand(brand, common);
        }
        dict
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        self.maps
            .read()
            .expect("dictionary lock poisoned")
            .name_to_smiles
            .get(&fold(name))
            .cloned()
    }

    pub fn lookup_cas(&self, cas: &str) -> Option<String> {
        self.maps
            .read()
            .expect("dictionary lock poisoned")
            .cas_to_smiles
            .get(&fold(cas))
            .cloned()
    }

    pub fn lookup_brand(&self, brand: &str) -> Option<String> {
        self.maps
            .read()
            .expect("dictionary lock poisoned")
            .brand_to_common
            .get(&fold(brand))
            .cloned()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.maps
            .read()
            .expect("dictionary lock poisoned")
            .name_to_smiles
            .contains_key(&fold(name))
    }

    pub fn insert_name(&self, name: &str, smiles: &str) {
        self.maps
            .write()
            .expect("dictionary lock poisoned")
            .name_to_smiles
            .insert(fold(name), smiles.trim().to_string());
    }

    pub fn insert_cas(&self, cas: &str, smiles: &str) {
        self.maps
            .write()
            .expect("dictionary lock poisoned")
            .cas_to_smiles
            .insert(fold(cas), smiles.trim().to_string());
    }

    pub fn insert_brand(&self, brand: &str, common: &str) {
        self.maps
            .write()
            .expect("dictionary lock poisoned")
            .brand_to_common
            .insert(fold(brand), common.trim().to_string());
    }

    pub fn remove_name(&self, name: &str) {
        self.maps
            .write()
            .expect("dictionary lock poisoned")
            .name_to_smiles
            .remove(&fold(name));
    }

    pub fn remove_cas(&self, cas: &str) {
        self.maps
            .write()
            .expect("dictionary lock poisoned")
            .cas_to_smiles
            .remove(&fold(cas));
    }

    /// Total entries across all three maps.
    pub fn size(&self) -> usize {
        let maps = self.maps.read().expect("dictionary lock poisoned");
        maps.name_to_smiles.len() + maps.cas_to_smiles.len() + maps.brand_to_common.len()
    }

    /// Longest number of words in any dictionary name, used by the word-level
    /// matcher to bound its n-gram window.
    pub fn max_name_words(&self) -> usize {
        self.maps
            .read()
            .expect("dictionary lock poisoned")
            .name_to_smiles
            .keys()
            .map(|k| k.split_whitespace().count())
            .max()
            .unwrap_or(1)
    }

    /// Loads `name,smiles` rows. Returns the number of entries added.
    pub fn load_names_csv(&self, path: &Path) -> Result<usize> {
        self.load_two_column_csv(path, "name", "smiles", |dict, key, value| {
            dict.insert_name(key, value)
        })
    }

    /// Loads `cas,smiles` rows.
    pub fn load_cas_csv(&self, path: &Path) -> Result<usize> {
        self.load_two_column_csv(path, "cas", "smiles", |dict, key, value| {
            dict.insert_cas(key, value)
        })
    }

    /// Loads `brand,common_name` rows.
    pub fn load_brands_csv(&self, path: &Path) -> Result<usize> {
        self.load_two_column_csv(path, "brand", "common_name", |dict, key, value| {
            dict.insert_brand(key, value)
        })
    }

    fn load_two_column_csv(
        &self,
        path: &Path,
        key_header: &str,
        value_header: &str,
        insert: fn(&Self, &str, &str),
    ) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let key_idx = headers
            .iter()
            .position(|h| h == key_header)
            .ok_or_else(|| ChemError::MissingHeader(key_header.to_string()))?;
        let value_idx = headers
            .iter()
            .position(|h| h == value_header)
            .ok_or_else(|| ChemError::MissingHeader(value_header.to_string()))?;

        let mut added = 0;
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 2; // header + 1-based index
            let key = record.get(key_idx).unwrap_or("").trim();
            let value = record.get(value_idx).unwrap_or("").trim();
            if key.is_empty() {
                return Err(ChemError::MissingValue {
                    column: key_header.to_string(),
                    row,
                });
            }
            if value.is_empty() {
                return Err(ChemError::MissingValue {
                    column: value_header.to_string(),
                    row,
                });
            }
            insert(self, key, value);
            added += 1;
        }
        info!("Loaded {} entries from {:?}", added, path);
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn lookups_fold_case_and_whitespace() {
        let dict = ChemDictionary::new();
        dict.insert_name("Aspirin", "CC(=O)Oc1ccccc1C(=O)O");
        assert_eq!(
            dict.lookup("  ASPIRIN  ").as_deref(),
            Some("CC(=O)Oc1ccccc1C(=O)O")
        );
        assert!(dict.lookup("ibuprofen").is_none());
    }

    #[test]
    fn missing_keys_return_none() {
        let dict = ChemDictionary::new();
        assert!(dict.lookup_cas("50-78-2").is_none());
        assert!(dict.lookup_brand("advil").is_none());
        assert_eq!(dict.size(), 0);
    }

    #[test]
    fn defaults_cover_all_three_maps() {
        let dict = ChemDictionary::with_defaults();
        assert!(dict.lookup("aspirin").is_some());
        assert_eq!(dict.lookup_cas("64-17-5").as_deref(), Some("CCO"));
        assert_eq!(dict.lookup_brand("Advil").as_deref(), Some("ibuprofen"));
        assert!(dict.size() > 10);
        assert!(dict.max_name_words() >= 2); // "acetylsalicylic acid"
    }

    #[test]
    fn load_names_csv_roundtrip() {
        let file = create_test_csv("name,smiles\nAspirin,CC(=O)Oc1ccccc1C(=O)O\nethanol, CCO ");
        let dict = ChemDictionary::new();
        let added = dict.load_names_csv(file.path()).unwrap();
        assert_eq!(added, 2);
        assert_eq!(dict.lookup("ethanol").as_deref(), Some("CCO"));
    }

    #[test]
    fn load_rejects_missing_header() {
        let file = create_test_csv("compound,smiles\nAspirin,CC(=O)Oc1ccccc1C(=O)O");
        let dict = ChemDictionary::new();
        let result = dict.load_names_csv(file.path());
        assert!(matches!(result, Err(ChemError::MissingHeader(h)) if h == "name"));
    }

    #[test]
    fn load_rejects_empty_value_with_row_number() {
        let file = create_test_csv("cas,smiles\n50-78-2,CC(=O)Oc1ccccc1C(=O)O\n64-17-5,");
        let dict = ChemDictionary::new();
        let result = dict.load_cas_csv(file.path());
        assert!(
            matches!(result, Err(ChemError::MissingValue { column, row }) if column == "smiles" && row == 3)
        );
    }

    #[test]
    fn remove_supports_cache_tests() {
        let dict = ChemDictionary::with_defaults();
        dict.remove_cas("64-17-5");
        assert!(dict.lookup_cas("64-17-5").is_none());
    }
}
