//! Runtime configuration loaded from environment variables.

use std::{path::PathBuf, str::FromStr};

use crate::error::RetrieverError;

/// Retrieval knobs. All fields have defaults via [`RetrieverConfig::new_default`].
#[derive(Clone, Debug)]
pub struct RetrieverConfig {
    /// Hits requested per expanded phrase.
    pub base_k: usize,
    /// Upper bound on phrases kept from expansion.
    pub max_phrases: usize,
    /// Candidates per vision call.
    pub relevance_batch_size: usize,
    /// Phrase searches in flight.
    pub phrase_concurrency: usize,
    /// Relevance batches in flight.
    pub relevance_concurrency: usize,

    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl RetrieverConfig {
    pub fn new_default() -> Self {
        Self {
            base_k: 10,
            max_phrases: 5,
            relevance_batch_size: 5,
            phrase_concurrency: 4,
            relevance_concurrency: 4,
            index_path: PathBuf::from("./index/products.index"),
            metadata_path: PathBuf::from("./index/products.meta.json"),
        }
    }

    /// Build from environment variables with defaults.
    ///
    /// # Example
    /// ```
    /// # use product_retriever::RetrieverConfig;
    /// let cfg = RetrieverConfig::from_env().unwrap();
    /// assert!(cfg.base_k >= 1);
    /// ```
    pub fn from_env() -> Result<Self, RetrieverError> {
        let d = Self::new_default();
        let cfg = Self {
            base_k: parse("BASE_K", d.base_k)?,
            max_phrases: parse("MAX_PHRASES", d.max_phrases)?,
            relevance_batch_size: parse("RELEVANCE_BATCH_SIZE", d.relevance_batch_size)?,
            phrase_concurrency: parse("PHRASE_CONCURRENCY", d.phrase_concurrency)?,
            relevance_concurrency: parse("RELEVANCE_CONCURRENCY", d.relevance_concurrency)?,
            index_path: env("INDEX_PATH").map(PathBuf::from).unwrap_or(d.index_path),
            metadata_path: env("METADATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.metadata_path),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), RetrieverError> {
        let positive = [
            ("base_k", self.base_k),
            ("max_phrases", self.max_phrases),
            ("relevance_batch_size", self.relevance_batch_size),
            ("phrase_concurrency", self.phrase_concurrency),
            ("relevance_concurrency", self.relevance_concurrency),
        ];
        match positive.iter().find(|(_, v)| *v == 0) {
            Some((name, _)) => Err(RetrieverError::Config(format!("{name} must be > 0"))),
            None => Ok(()),
        }
    }
}

fn env(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(k: &str, dflt: T) -> Result<T, RetrieverError> {
    match env(k) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| RetrieverError::Config(format!("{k}: cannot parse `{v}`"))),
        None => Ok(dflt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_knobs_are_rejected() {
        let mut cfg = RetrieverConfig::new_default();
        assert!(cfg.validate().is_ok());
        cfg.relevance_batch_size = 0;
        assert!(matches!(cfg.validate(), Err(RetrieverError::Config(_))));
    }
}
