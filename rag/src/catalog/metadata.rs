use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Catalog;
use crate::text::normalize_key;

/// Category name used for products without a category.
const OTHER_CATEGORY: &str = "other";

/// Product count and names for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub count: usize,
    pub products: Vec<String>,
}

/// Precomputed aggregates answering "how many"/"list" questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredMetadata {
    pub owner: String,
    pub total_count: usize,
    pub categories: BTreeMap<String, CategorySummary>,
    pub brands: BTreeMap<String, Vec<String>>,
}

impl StructuredMetadata {
    /// Derive the aggregates from catalog entries and store inventories.
    ///
    /// Store products that do not resolve to a catalog entry are counted once
    /// under the `other` category.
    pub fn derive(catalog: &Catalog) -> Self {
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut brands: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for entry in catalog.entries() {
            let category = entry
                .category
                .as_deref()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| OTHER_CATEGORY.to_string());
            categories
                .entry(category)
                .or_default()
                .push(entry.canonical_name.clone());

            if let Some(brand) = entry
                .brand
                .as_deref()
                .map(|b| b.trim().to_lowercase())
                .filter(|b| !b.is_empty())
            {
                brands
                    .entry(brand)
                    .or_default()
                    .push(entry.canonical_name.clone());
            }
        }

        let mut seen_store_only = BTreeSet::new();
        for store in catalog.stores() {
            for product in &store.products {
                if catalog.find_product(product).is_some() {
                    continue;
                }
                if seen_store_only.insert(normalize_key(product)) {
                    categories
                        .entry(OTHER_CATEGORY.to_string())
                        .or_default()
                        .push(product.clone());
                }
            }
        }

        let total_count = catalog.entries().len() + seen_store_only.len();
        let categories = categories
            .into_iter()
            .map(|(name, products)| {
                (
                    name,
                    CategorySummary {
                        count: products.len(),
                        products,
                    },
                )
            })
            .collect();

        Self {
            owner: catalog.owner().to_string(),
            total_count,
            categories,
            brands,
        }
    }

    /// Every product name across all categories, sorted and deduplicated.
    pub fn all_products(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .categories
            .values()
            .flat_map(|c| c.products.iter())
            .collect();
        names.into_iter().cloned().collect()
    }
}
