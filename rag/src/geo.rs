//! Great-circle distance and nearby store lookup.

use crate::error::RagError;
use crate::text::normalize_key;
use crate::types::{NearbyStore, StoreEntry};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default search radius for nearby stores.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 20.0;

/// Default number of stores returned.
pub const DEFAULT_STORE_LIMIT: usize = 3;

/// Substring matching is skipped for keys shorter than this.
const MIN_SUBSTRING_KEY_LEN: usize = 3;

/// Known alternative spellings, applied before comparing against store
/// inventories. The first alias contained in the query wins.
const SPELLING_VARIANTS: &[(&str, &str)] = &[
    ("pure life", "Nestlé Pure Life"),
    ("kit kat", "KitKat"),
    ("haagen dazs", "Häagen-Dazs"),
    ("after 8", "After Eight"),
];

/// Haversine distance in kilometres between two WGS84 points.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` past 1.0 for near-antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Check that coordinates are finite and within WGS84 bounds.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), RagError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(RagError::InvalidInput(format!("latitude out of range: {latitude}")));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(RagError::InvalidInput(format!("longitude out of range: {longitude}")));
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalized query key with known spelling variants applied.
fn product_key(product: &str) -> String {
    let key = normalize_key(product);
    for (alias, canonical) in SPELLING_VARIANTS {
        if key.contains(&normalize_key(alias)) {
            return normalize_key(canonical);
        }
    }
    key
}

/// Whether a store carries a product, allowing for spelling differences.
///
/// Tries an exact case-insensitive name match, then a normalized match, then
/// a substring match in either direction.
pub fn product_matches(product: &str, store: &StoreEntry) -> bool {
    let lower = product.trim().to_lowercase();
    if store.products.iter().any(|p| p.to_lowercase() == lower) {
        return true;
    }

    let key = product_key(product);
    if key.is_empty() {
        return false;
    }
    if store.normalized_products.contains(&key) {
        return true;
    }
    if key.len() < MIN_SUBSTRING_KEY_LEN {
        return false;
    }
    store
        .normalized_products
        .iter()
        .filter(|p| p.len() >= MIN_SUBSTRING_KEY_LEN)
        .any(|p| p.contains(key.as_str()) || key.contains(p.as_str()))
}

/// Ranks stores by distance and filters them by product.
#[derive(Debug, Clone)]
pub struct StoreMatcher {
    stores: Vec<StoreEntry>,
    max_distance_km: f64,
    limit: usize,
}

impl StoreMatcher {
    pub fn new(stores: Vec<StoreEntry>) -> Self {
        Self {
            stores,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            limit: DEFAULT_STORE_LIMIT,
        }
    }

    /// Override the default search radius and result limit.
    pub fn with_limits(mut self, max_distance_km: f64, limit: usize) -> Self {
        self.max_distance_km = max_distance_km;
        self.limit = limit;
        self
    }

    pub fn stores(&self) -> &[StoreEntry] {
        &self.stores
    }

    /// Nearby stores using the configured radius and limit.
    pub fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        product: Option<&str>,
    ) -> Result<Vec<NearbyStore>, RagError> {
        self.nearby_within(latitude, longitude, product, self.max_distance_km, self.limit)
    }

    /// Stores within `max_distance_km` carrying `product` (any product when
    /// `None` or blank), closest first, at most `limit` of them.
    pub fn nearby_within(
        &self,
        latitude: f64,
        longitude: f64,
        product: Option<&str>,
        max_distance_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, RagError> {
        validate_coordinates(latitude, longitude)?;
        let product = product.map(str::trim).filter(|p| !p.is_empty());

        let mut matches: Vec<NearbyStore> = self
            .stores
            .iter()
            .filter_map(|store| {
                let distance = haversine_km(latitude, longitude, store.latitude, store.longitude);
                if !distance.is_finite() || distance > max_distance_km {
                    return None;
                }
                if let Some(product) = product {
                    if !product_matches(product, store) {
                        return None;
                    }
                }
                Some(NearbyStore {
                    store: store.clone(),
                    distance_km: distance,
                })
            })
            .collect();

        matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        matches.truncate(limit);
        for m in &mut matches {
            m.distance_km = round2(m.distance_km);
        }

        log::debug!(
            "Found {} stores within {} km{}",
            matches.len(),
            max_distance_km,
            product.map(|p| format!(" carrying {p}")).unwrap_or_default()
        );
        Ok(matches)
    }

    /// Every store carrying a product, in catalog order, without distances.
    pub fn stores_carrying(&self, product: &str) -> Vec<&StoreEntry> {
        self.stores
            .iter()
            .filter(|store| product_matches(product, store))
            .collect()
    }
}
