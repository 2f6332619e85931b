//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for product-index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Two vectors that must share a dimension do not.
    #[error("vector dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// Index rows and metadata records disagree in count.
    #[error("row count mismatch: index has {index} rows, metadata has {metadata}")]
    RowCountMismatch { index: usize, metadata: usize },

    /// Row `row` of the index is not the item at position `row` of the metadata.
    #[error("index row {row} holds `{index_id}` but metadata holds `{metadata_id}`")]
    Misaligned {
        row: usize,
        index_id: String,
        metadata_id: String,
    },

    /// A vector holds NaN or an infinity.
    #[error("non-finite value in {0} vector")]
    NonFinite(String),

    /// Index artifact failed structural or checksum validation.
    #[error("corrupt index artifact: {0}")]
    Corrupt(String),

    /// Embedding backend failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Image could not be fetched, decoded or re-encoded.
    #[error("image error: {0}")]
    Image(String),

    /// Category taxonomy has no subcategories.
    #[error("category taxonomy is empty")]
    EmptyTaxonomy,
}

impl From<ai_llm_service::AiLlmError> for IndexError {
    fn from(e: ai_llm_service::AiLlmError) -> Self {
        IndexError::Embedding(e.to_string())
    }
}
