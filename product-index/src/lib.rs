//! Product index: catalog preparation, multimodal embeddings and a flat
//! inner-product index persisted as two aligned artifacts.
//!
//! Build flow (see [`build_index`]):
//! 1. read and prepare the JSONL catalog,
//! 2. embed texts (fail-fast) and images (per-item tolerant) in batches,
//! 3. fuse both vectors per item with explicit weights,
//! 4. tag each item with its nearest taxonomy subcategory,
//! 5. L2-normalize, index and persist.
//!
//! The read path is [`ProductIndex::load`] + [`ProductIndex::search`].

mod artifacts;
mod builder;
mod catalog;
mod config;
mod embed;
mod embed_pool;
mod errors;
mod flat_index;
mod image_source;
mod mixer;
mod normalize;
mod progress;
mod record;
mod tagger;

pub use artifacts::ProductIndex;
pub use builder::{Embedders, build_index};
pub use catalog::{CatalogLoad, embedding_text, load_catalog};
pub use config::{DetailsMap, IndexConfig, Taxonomy};
pub use embed::clip::{ClipImageEmbedder, ClipTextEmbedder};
pub use embed::{EncodedImage, ImageEmbedder, TextEmbedder};
pub use errors::IndexError;
pub use flat_index::FlatIndex;
pub use image_source::ImageFetcher;
pub use mixer::{fuse_by_id, mix};
pub use normalize::{cosine, l2_normalize, strip_emojis};
pub use progress::{IndicatifProgress, NoopProgress, Progress};
pub use record::{BuildReport, EmbeddingRecord, Hit, Item, Modality, Product};
pub use tagger::{CategoryTag, CategoryTagger, TaxonomyEntry};
