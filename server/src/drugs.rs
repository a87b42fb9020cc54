//! Drug-information lookup
//!
//! The table is one JSON object keyed by canonical generic medicine name,
//! with one reserved key (`_brand_to_generic`) holding the brand-to-generic
//! mapping:
//!
//! ```json
//! {
//!   "Paracetamol": { "indication": "...", "max_daily_dose": "..." },
//!   "_brand_to_generic": { "Napa": "Paracetamol" }
//! }
//! ```
//!
//! Lookup follows one fixed precedence: exact generic match, then
//! brand-to-generic translation, then a case-insensitive scan over generics
//! and brands. Unknown names resolve to `None`, never an error.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;

/// Reserved key holding the brand-name map inside the drug table
const BRAND_MAP_KEY: &str = "_brand_to_generic";

/// The drug safety-information table
#[derive(Debug, Clone, Default)]
pub struct MedicineDb {
    generics: serde_json::Map<String, Value>,
    brands: HashMap<String, String>,
}

/// A resolved lookup: the canonical generic name and its record
#[derive(Debug, Clone, PartialEq)]
pub struct DrugRecord<'a> {
    pub generic: &'a str,
    pub info: &'a Value,
}

impl MedicineDb {
    /// Load the table from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read drug table at {:?}", path))?;
        let value: Value = serde_json::from_str(&json)
            .with_context(|| format!("drug table at {:?} is not valid JSON", path))?;

        let Value::Object(mut generics) = value else {
            anyhow::bail!("drug table at {:?} must be a JSON object", path);
        };

        let brands = match generics.remove(BRAND_MAP_KEY) {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(brand, generic)| match generic {
                    Value::String(generic) => Some((brand, generic)),
                    _ => None,
                })
                .collect(),
            Some(_) => anyhow::bail!("'{}' must map brand names to strings", BRAND_MAP_KEY),
            None => HashMap::new(),
        };

        Ok(Self { generics, brands })
    }

    /// Build from parts (used by tests)
    pub fn new(generics: serde_json::Map<String, Value>, brands: HashMap<String, String>) -> Self {
        Self { generics, brands }
    }

    /// Number of generic entries
    pub fn num_generics(&self) -> usize {
        self.generics.len()
    }

    /// Number of brand mappings
    pub fn num_brands(&self) -> usize {
        self.brands.len()
    }

    /// Resolve a medicine name to its safety record.
    ///
    /// Precedence is fixed: exact generic match, then brand translation,
    /// then case-insensitive scan (generics first, then brands).
    pub fn lookup(&self, name: &str) -> Option<DrugRecord<'_>> {
        // 1. Exact generic match
        if let Some((generic, info)) = self.generics.get_key_value(name) {
            return Some(DrugRecord {
                generic: generic.as_str(),
                info,
            });
        }

        // 2. Brand-to-generic translation
        if let Some(generic) = self.brands.get(name) {
            if let Some((generic, info)) = self.generics.get_key_value(generic.as_str()) {
                return Some(DrugRecord {
                    generic: generic.as_str(),
                    info,
                });
            }
        }

        // 3. Case-insensitive scan
        if let Some((generic, info)) = self
            .generics
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            return Some(DrugRecord {
                generic: generic.as_str(),
                info,
            });
        }

        self.brands
            .iter()
            .find(|(brand, _)| brand.eq_ignore_ascii_case(name))
            .and_then(|(_, generic)| self.generics.get_key_value(generic.as_str()))
            .map(|(generic, info)| DrugRecord {
                generic: generic.as_str(),
                info,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_db() -> MedicineDb {
        let Value::Object(generics) = json!({
            "Paracetamol": { "indication": "fever", "max_daily_dose": "4g" },
            "Amoxicillin": { "indication": "bacterial infection" }
        }) else {
            unreachable!()
        };

        let brands = HashMap::from([("Napa".to_string(), "Paracetamol".to_string())]);
        MedicineDb::new(generics, brands)
    }

    #[test]
    fn test_exact_generic_match() {
        let db = sample_db();
        let record = db.lookup("Paracetamol").unwrap();
        assert_eq!(record.generic, "Paracetamol");
        assert_eq!(record.info["max_daily_dose"], "4g");
    }

    #[test]
    fn test_brand_resolves_to_generic() {
        let db = sample_db();
        let record = db.lookup("Napa").unwrap();
        assert_eq!(record.generic, "Paracetamol");
    }

    #[test]
    fn test_case_insensitive_generic() {
        let db = sample_db();
        let record = db.lookup("paracetamol").unwrap();
        assert_eq!(record.generic, "Paracetamol");
    }

    #[test]
    fn test_case_insensitive_brand() {
        let db = sample_db();
        let record = db.lookup("napa").unwrap();
        assert_eq!(record.generic, "Paracetamol");
    }

    #[test]
    fn test_unknown_name_is_none() {
        let db = sample_db();
        assert!(db.lookup("Unknown").is_none());
    }

    #[test]
    fn test_load_splits_reserved_key() {
        let path = std::env::temp_dir().join("medscript_drug_table.json");
        std::fs::write(
            &path,
            r#"{
                "Paracetamol": {"indication": "fever"},
                "_brand_to_generic": {"Napa": "Paracetamol"}
            }"#,
        )
        .unwrap();

        let db = MedicineDb::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(db.num_generics(), 1);
        assert_eq!(db.num_brands(), 1);
        // the reserved key never resolves as a medicine
        assert!(db.lookup(BRAND_MAP_KEY).is_none());
    }

    #[test]
    fn test_exact_match_wins_over_brand() {
        // A name that is both a generic and a brand must resolve as a generic
        let Value::Object(generics) = json!({
            "Napa": { "note": "generic named like the brand" },
            "Paracetamol": { "indication": "fever" }
        }) else {
            unreachable!()
        };
        let brands = HashMap::from([("Napa".to_string(), "Paracetamol".to_string())]);
        let db = MedicineDb::new(generics, brands);

        let record = db.lookup("Napa").unwrap();
        assert_eq!(record.generic, "Napa");
    }
}
