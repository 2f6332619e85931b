//! Assigns each item the nearest (category, subcategory) by cosine similarity.

use tracing::debug;

use crate::{config::Taxonomy, embed::TextEmbedder, errors::IndexError, normalize::cosine};

/// Taxonomy entry with its label embedding.
#[derive(Clone, Debug)]
pub struct TaxonomyEntry {
    pub category: String,
    pub subcategory: String,
    pub embedding: Vec<f32>,
}

/// Result of tagging one vector.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryTag {
    pub category: String,
    pub subcategory: String,
    pub score: f32,
}

/// Dense-scan tagger over embedded subcategory labels.
#[derive(Clone, Debug)]
pub struct CategoryTagger {
    entries: Vec<TaxonomyEntry>,
}

impl CategoryTagger {
    /// Embeds every subcategory label once.
    ///
    /// # Errors
    /// `EmptyTaxonomy`, embedder failures, or a wrong vector count.
    pub async fn build(
        taxonomy: &Taxonomy,
        embedder: &dyn TextEmbedder,
    ) -> Result<Self, IndexError> {
        if taxonomy.is_empty() {
            return Err(IndexError::EmptyTaxonomy);
        }
        let pairs: Vec<(&str, &str)> = taxonomy.entries().collect();
        let labels: Vec<String> = pairs.iter().map(|(_, s)| s.to_string()).collect();
        let vectors = embedder.embed_texts(&labels).await?;
        if vectors.len() != labels.len() {
            return Err(IndexError::Embedding(format!(
                "expected {} label vectors, got {}",
                labels.len(),
                vectors.len()
            )));
        }
        let entries = pairs
            .into_iter()
            .zip(vectors)
            .map(|((c, s), embedding)| TaxonomyEntry {
                category: c.to_string(),
                subcategory: s.to_string(),
                embedding,
            })
            .collect();
        debug!(labels = labels.len(), "taxonomy embedded");
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<TaxonomyEntry>) -> Result<Self, IndexError> {
        if entries.is_empty() {
            return Err(IndexError::EmptyTaxonomy);
        }
        Ok(Self { entries })
    }

    /// Argmax cosine; ties go to the earliest entry.
    ///
    /// # Errors
    /// `DimensionMismatch` if `vector` does not match the label embeddings.
    pub fn tag(&self, vector: &[f32]) -> Result<CategoryTag, IndexError> {
        let mut best: Option<(&TaxonomyEntry, f32)> = None;
        for e in &self.entries {
            if e.embedding.len() != vector.len() {
                return Err(IndexError::DimensionMismatch {
                    got: vector.len(),
                    want: e.embedding.len(),
                });
            }
            let s = cosine(vector, &e.embedding);
            if best.is_none_or(|(_, b)| s > b) {
                best = Some((e, s));
            }
        }
        let (e, score) = best.ok_or(IndexError::EmptyTaxonomy)?;
        Ok(CategoryTag {
            category: e.category.clone(),
            subcategory: e.subcategory.clone(),
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(c: &str, s: &str, v: Vec<f32>) -> TaxonomyEntry {
        TaxonomyEntry {
            category: c.into(),
            subcategory: s.into(),
            embedding: v,
        }
    }

    #[test]
    fn picks_most_similar_label() {
        let t = CategoryTagger::from_entries(vec![
            entry("Apparel", "Swimwear", vec![1.0, 0.0]),
            entry("Accessories", "Sunglasses", vec![0.0, 1.0]),
        ])
        .unwrap();
        let tag = t.tag(&[0.1, 0.9]).unwrap();
        assert_eq!(tag.subcategory, "Sunglasses");
        assert_eq!(tag.category, "Accessories");
    }

    #[test]
    fn ties_go_to_first_entry() {
        let t = CategoryTagger::from_entries(vec![
            entry("Shoes", "Boots", vec![1.0, 0.0]),
            entry("Shoes", "Clogs", vec![2.0, 0.0]),
        ])
        .unwrap();
        assert_eq!(t.tag(&[3.0, 0.0]).unwrap().subcategory, "Boots");
    }

    #[test]
    fn dimension_mismatch_and_empty_taxonomy() {
        let t =
            CategoryTagger::from_entries(vec![entry("Bags", "Backpacks", vec![1.0, 0.0])]).unwrap();
        assert!(matches!(
            t.tag(&[1.0]),
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            CategoryTagger::from_entries(Vec::new()),
            Err(IndexError::EmptyTaxonomy)
        ));
    }
}
