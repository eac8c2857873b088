//! Static product catalog and store inventory.
//!
//! Loaded once at startup from two JSON files and read-only afterwards:
//!
//! - products: `{ "owner": "Nestlé", "products": [{ "name", "amazon_link", "category", "brand" }] }`
//! - stores: `{ "stores": [{ "id", "name", "address", "latitude", "longitude", "products": [..] }] }`

mod metadata;

pub use metadata::{CategorySummary, StructuredMetadata};

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::RagError;
use crate::text::normalize_key;
use crate::types::{CatalogEntry, ProductInfo, StoreEntry};

#[derive(Debug, Deserialize)]
struct ProductsFile {
    #[serde(default)]
    owner: String,
    #[serde(default)]
    products: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct StoresFile {
    #[serde(default)]
    stores: Vec<StoreEntry>,
}

/// Result of looking up a normalized key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyLookup<'a> {
    Unique(&'a CatalogEntry),
    /// The key belongs to more than one entry and never resolves
    Ambiguous,
    Missing,
}

/// Immutable catalog of products and stores.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    owner: String,
    entries: Vec<CatalogEntry>,
    stores: Vec<StoreEntry>,
    by_name: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
    ambiguous_keys: BTreeSet<String>,
}

impl Catalog {
    /// Build a catalog, computing every entry's normalized variants.
    ///
    /// Fails on empty or duplicate canonical names. Normalized keys shared by
    /// two entries are kept out of the index and reported as ambiguous.
    pub fn new(
        owner: impl Into<String>,
        entries: Vec<CatalogEntry>,
        stores: Vec<StoreEntry>,
    ) -> Result<Self, RagError> {
        let mut catalog = Catalog {
            owner: owner.into(),
            stores,
            ..Default::default()
        };

        let mut key_owners: HashMap<String, usize> = HashMap::new();
        for (idx, mut entry) in entries.into_iter().enumerate() {
            let name = entry.canonical_name.trim().to_string();
            if name.is_empty() {
                return Err(RagError::Catalog(format!(
                    "product #{idx} has an empty name"
                )));
            }
            let lower = name.to_lowercase();
            if catalog.by_name.insert(lower, idx).is_some() {
                return Err(RagError::Catalog(format!("duplicate product '{name}'")));
            }

            let mut variants: BTreeSet<String> = entry
                .variants
                .iter()
                .map(|v| normalize_key(v))
                .filter(|v| !v.is_empty())
                .collect();
            let key = normalize_key(&name);
            if key.is_empty() {
                return Err(RagError::Catalog(format!(
                    "product '{name}' has no alphanumeric characters"
                )));
            }
            variants.insert(key);

            for variant in &variants {
                match key_owners.get(variant) {
                    Some(&other) if other != idx => {
                        log::warn!(
                            "Normalized key '{}' is shared by '{}' and '{}'; it will not resolve",
                            variant,
                            catalog.entries[other].canonical_name,
                            name
                        );
                        catalog.ambiguous_keys.insert(variant.clone());
                    }
                    _ => {
                        key_owners.insert(variant.clone(), idx);
                    }
                }
            }

            entry.canonical_name = name;
            entry.variants = variants;
            catalog.entries.push(entry);
        }

        for (key, idx) in key_owners {
            if !catalog.ambiguous_keys.contains(&key) {
                catalog.by_key.insert(key, idx);
            }
        }

        Ok(catalog)
    }

    /// Parse the product and store JSON documents.
    pub fn from_json(products_json: &str, stores_json: &str) -> Result<Self, RagError> {
        let products: ProductsFile = serde_json::from_str(products_json)
            .map_err(|e| RagError::Catalog(format!("invalid product data: {e}")))?;
        let stores: StoresFile = serde_json::from_str(stores_json)
            .map_err(|e| RagError::Catalog(format!("invalid store data: {e}")))?;
        Self::new(products.owner, products.products, stores.stores)
    }

    /// Load the product and store files from disk.
    pub fn load(products_path: &Path, stores_path: &Path) -> Result<Self, RagError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| {
                RagError::Catalog(format!("failed to read {}: {e}", path.display()))
            })
        };
        let catalog = Self::from_json(&read(products_path)?, &read(stores_path)?)?;
        log::info!(
            "Loaded {} products and {} stores",
            catalog.entries.len(),
            catalog.stores.len()
        );
        Ok(catalog)
    }

    /// Display name of the catalog owner (e.g. "Nestlé").
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn stores(&self) -> &[StoreEntry] {
        &self.stores
    }

    /// Canonical names in sorted order.
    pub fn canonical_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .map(|e| e.canonical_name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Every resolvable normalized key with its entry.
    pub fn keys(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.by_key
            .iter()
            .map(|(key, &idx)| (key.as_str(), &self.entries[idx]))
    }

    /// Look up an already-normalized key.
    pub fn lookup_key(&self, key: &str) -> KeyLookup<'_> {
        if self.ambiguous_keys.contains(key) {
            return KeyLookup::Ambiguous;
        }
        match self.by_key.get(key) {
            Some(&idx) => KeyLookup::Unique(&self.entries[idx]),
            None => KeyLookup::Missing,
        }
    }

    /// Exact canonical-name lookup, case-insensitive.
    pub fn entry(&self, canonical_name: &str) -> Option<&CatalogEntry> {
        self.by_name
            .get(&canonical_name.trim().to_lowercase())
            .map(|&idx| &self.entries[idx])
    }

    /// Find a product by canonical name or any spelling that normalizes to it.
    pub fn find_product(&self, name: &str) -> Option<&CatalogEntry> {
        match self.lookup_key(&normalize_key(name)) {
            KeyLookup::Unique(entry) => Some(entry),
            _ => self.entry(name),
        }
    }

    /// Purchase link and product details for a product name.
    pub fn purchase_link(&self, name: &str) -> Option<(String, ProductInfo)> {
        self.find_product(name)
            .filter(|entry| !entry.purchase_link.is_empty())
            .map(|entry| (entry.purchase_link.clone(), ProductInfo::from(entry)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PRODUCTS_JSON: &str = r#"{
        "owner": "Nestlé",
        "products": [
            {"name": "Nescafé", "amazon_link": "https://amazon.example/nescafe", "category": "coffee", "brand": "nestle"},
            {"name": "Nescafé Gold", "amazon_link": "https://amazon.example/nescafe-gold", "category": "coffee", "brand": "nestle"},
            {"name": "Nescafé Dolce Gusto", "amazon_link": "https://amazon.example/dolce-gusto", "category": "coffee", "brand": "nestle"},
            {"name": "Starbucks by Nescafé", "amazon_link": "https://amazon.example/starbucks", "category": "coffee"},
            {"name": "Nespresso", "amazon_link": "https://amazon.example/nespresso", "category": "coffee", "brand": "nespresso"},
            {"name": "KitKat", "amazon_link": "https://amazon.example/kitkat", "category": "chocolate", "brand": "nestle", "variants": ["kit kat"]},
            {"name": "Aero", "amazon_link": "https://amazon.example/aero", "category": "chocolate", "brand": "nestle"},
            {"name": "Smarties", "amazon_link": "https://amazon.example/smarties", "category": "chocolate", "brand": "nestle"},
            {"name": "After Eight", "amazon_link": "https://amazon.example/after-eight", "category": "chocolate", "brand": "nestle", "variants": ["after 8"]},
            {"name": "Nestlé Pure Life", "amazon_link": "https://amazon.example/pure-life", "category": "water", "brand": "nestle", "variants": ["pure life"]},
            {"name": "Perrier", "amazon_link": "https://amazon.example/perrier", "category": "water", "brand": "perrier"},
            {"name": "San Pellegrino", "amazon_link": "https://amazon.example/san-pellegrino", "category": "water", "brand": "san pellegrino"},
            {"name": "Coffee-mate", "amazon_link": "https://amazon.example/coffee-mate", "category": "dairy"},
            {"name": "Häagen-Dazs", "amazon_link": "https://amazon.example/haagen-dazs", "category": "ice cream", "brand": "häagen-dazs"}
        ]
    }"#;

    pub(crate) const STORES_JSON: &str = r#"{
        "stores": [
            {"id": 1, "name": "Downtown Market", "address": "1 King St", "latitude": 43.6510, "longitude": -79.3470, "products": ["KitKat", "Nescafé", "Aero"]},
            {"id": 2, "name": "Harbour Grocer", "address": "9 Queens Quay", "latitude": 43.6400, "longitude": -79.3800, "products": ["KitKat", "Häagen-Dazs", "Turtles"]},
            {"id": 3, "name": "North York Foods", "address": "5100 Yonge St", "latitude": 43.7700, "longitude": -79.4130, "products": ["Perrier", "Smarties"]},
            {"id": 4, "name": "Ottawa Corner", "address": "50 Rideau St", "latitude": 45.4215, "longitude": -75.6972, "products": ["KitKat"]}
        ]
    }"#;

    pub(crate) fn sample_catalog() -> Catalog {
        Catalog::from_json(PRODUCTS_JSON, STORES_JSON).unwrap()
    }

    #[test]
    fn test_from_json_loads_products_and_stores() {
        let catalog = sample_catalog();
        assert_eq!(catalog.owner(), "Nestlé");
        assert_eq!(catalog.entries().len(), 14);
        assert_eq!(catalog.stores().len(), 4);
        assert!(catalog.stores()[0].normalized_products.contains("kitkat"));
    }

    #[test]
    fn test_find_product_by_variant_spelling() {
        let catalog = sample_catalog();
        assert_eq!(catalog.find_product("kit kat").unwrap().canonical_name, "KitKat");
        assert_eq!(catalog.find_product("HAAGEN DAZS").unwrap().canonical_name, "Häagen-Dazs");
        assert_eq!(catalog.find_product("pure life").unwrap().canonical_name, "Nestlé Pure Life");
        assert!(catalog.find_product("Milo").is_none());
    }

    #[test]
    fn test_purchase_link() {
        let catalog = sample_catalog();
        let (link, info) = catalog.purchase_link("kitkat").unwrap();
        assert_eq!(link, "https://amazon.example/kitkat");
        assert_eq!(info.name, "KitKat");
        assert_eq!(info.category.as_deref(), Some("chocolate"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let products = r#"{"products": [
            {"name": "Aero", "amazon_link": "a"},
            {"name": "aero", "amazon_link": "b"}
        ]}"#;
        let err = Catalog::from_json(products, r#"{"stores": []}"#).unwrap_err();
        assert!(matches!(err, RagError::Catalog(_)));
    }

    #[test]
    fn test_colliding_keys_are_ambiguous() {
        let products = r#"{"products": [
            {"name": "Coffee-Mate", "amazon_link": "a"},
            {"name": "Coffee Mate", "amazon_link": "b"}
        ]}"#;
        let catalog = Catalog::from_json(products, r#"{"stores": []}"#).unwrap();
        assert_eq!(catalog.lookup_key("coffeemate"), KeyLookup::Ambiguous);
        // Exact canonical lookups still work.
        assert_eq!(catalog.find_product("Coffee Mate").unwrap().purchase_link, "b");
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let products = dir.path().join("products.json");
        let stores = dir.path().join("stores.json");
        std::fs::write(&products, PRODUCTS_JSON).unwrap();
        std::fs::write(&stores, STORES_JSON).unwrap();

        let catalog = Catalog::load(&products, &stores).unwrap();
        assert_eq!(catalog.canonical_names().first(), Some(&"Aero"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/nonexistent/p.json"), Path::new("/nonexistent/s.json"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_bundled_data_loads_without_collisions() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data");
        let catalog =
            Catalog::load(&data.join("products.json"), &data.join("stores.json")).unwrap();
        assert_eq!(catalog.owner(), "Nestlé");
        assert!(catalog.ambiguous_keys.is_empty());
        assert!(catalog.find_product("kit kat").is_some());
    }
}
