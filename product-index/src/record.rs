//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Catalog item as stored in the metadata artifact and returned by search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub parent_asin: String,
    pub title: String,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    /// Whitelisted details, in catalog order.
    #[serde(default)]
    pub details: Map<String, Value>,
    pub price: f64,
    #[serde(default)]
    pub average_rating: Option<f32>,
    #[serde(default)]
    pub rating_number: Option<u64>,
    pub main_image: String,
    pub category: String,
    pub subcategory: String,
}

/// Prepared catalog record that has not been tagged yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub parent_asin: String,
    pub title: String,
    pub store: Option<String>,
    pub features: Vec<String>,
    pub description: Vec<String>,
    pub details: Map<String, Value>,
    pub price: f64,
    pub average_rating: Option<f32>,
    pub rating_number: Option<u64>,
    pub main_image: String,
    /// Normalized text fed to the text embedder.
    pub text: String,
}

impl Product {
    /// Attaches the category tag and drops the embedding text.
    pub fn into_item(self, category: String, subcategory: String) -> Item {
        Item {
            parent_asin: self.parent_asin,
            title: self.title,
            store: self.store,
            features: self.features,
            description: self.description,
            details: self.details,
            price: self.price,
            average_rating: self.average_rating,
            rating_number: self.rating_number,
            main_image: self.main_image,
            category,
            subcategory,
        }
    }
}

/// Which representation a vector carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
    Fused,
}

/// An item identifier paired with one of its vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub modality: Modality,
}

impl EmbeddingRecord {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, modality: Modality) -> Self {
        Self {
            id: id.into(),
            vector,
            modality,
        }
    }
}

/// A single search hit: row, similarity and the joined item.
#[derive(Clone, Debug)]
pub struct Hit {
    pub row: usize,
    pub score: f32,
    pub item: Item,
}

/// Counters reported by a full index build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub read: usize,
    pub prepared: usize,
    pub skipped: usize,
    pub text_embedded: usize,
    pub image_embedded: usize,
    pub zero_norm_dropped: usize,
    pub indexed: usize,
}
