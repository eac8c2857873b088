use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text::normalize_key;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Role name as used by chat completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One immutable message in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Zero-based position within the session (restarts after a clear)
    pub index: usize,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A retrieved passage used as grounding material for generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl ContextDocument {
    /// Attribution for this document, only when both title and url are known.
    pub fn reference(&self) -> Option<Reference> {
        match (&self.title, &self.url) {
            (Some(title), Some(url)) => Some(Reference {
                title: title.clone(),
                url: url.clone(),
            }),
            _ => None,
        }
    }
}

/// A deduplicated `{title, url}` attribution returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

/// A catalog product with its canonical spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical name, the join key across links and store inventories
    #[serde(rename = "name")]
    pub canonical_name: String,
    #[serde(rename = "amazon_link", alias = "purchase_link")]
    pub purchase_link: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Spellings that normalize to this entry
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub variants: BTreeSet<String>,
}

/// Product details attached to a response when a purchase link is found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub purchase_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl From<&CatalogEntry> for ProductInfo {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            name: entry.canonical_name.clone(),
            purchase_link: entry.purchase_link.clone(),
            category: entry.category.clone(),
            brand: entry.brand.clone(),
        }
    }
}

/// A retail point and the products it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStoreEntry")]
pub struct StoreEntry {
    pub id: u64,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub products: Vec<String>,
    /// Normalized spellings of every product, computed at load
    #[serde(skip_serializing)]
    pub normalized_products: BTreeSet<String>,
}

#[derive(Deserialize)]
struct RawStoreEntry {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: Option<String>,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    products: Vec<String>,
}

impl From<RawStoreEntry> for StoreEntry {
    fn from(raw: RawStoreEntry) -> Self {
        StoreEntry::new(
            raw.id,
            raw.name,
            raw.address,
            raw.latitude,
            raw.longitude,
            raw.products,
        )
    }
}

impl StoreEntry {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        address: Option<String>,
        latitude: f64,
        longitude: f64,
        products: Vec<String>,
    ) -> Self {
        let normalized_products = products
            .iter()
            .map(|p| normalize_key(p))
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            id,
            name: name.into(),
            address,
            latitude,
            longitude,
            products,
            normalized_products,
        }
    }
}

/// A store within range of the caller, with its distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStore {
    #[serde(flatten)]
    pub store: StoreEntry,
    /// Great-circle distance in km, rounded to 2 decimals
    pub distance_km: f64,
}

/// Which path produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Structured,
    Graph,
    Vector,
    None,
}

/// An inbound chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Caller coordinates, only when both are present.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// The orchestrator's answer.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub references: Vec<Reference>,
    pub session_id: String,
    pub source: AnswerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stores: Option<Vec<NearbyStore>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_info: Option<ProductInfo>,
}
