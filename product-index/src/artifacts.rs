//! The persisted pair: vector index + metadata JSON, validated as one unit.

use std::{fs, path::Path};

use tracing::info;

use crate::{
    errors::IndexError,
    flat_index::{FlatIndex, write_atomic},
    record::{Hit, Item},
};

/// Loaded index with its metadata, joined by item id.
#[derive(Clone, Debug)]
pub struct ProductIndex {
    index: FlatIndex,
    items: Vec<Item>,
}

impl ProductIndex {
    /// Pairs an index with items in row order.
    ///
    /// # Errors
    /// `RowCountMismatch` or `Misaligned` when the two disagree.
    pub fn new(index: FlatIndex, items: Vec<Item>) -> Result<Self, IndexError> {
        if index.len() != items.len() {
            return Err(IndexError::RowCountMismatch {
                index: index.len(),
                metadata: items.len(),
            });
        }
        for (row, (id, item)) in index.ids().iter().zip(&items).enumerate() {
            if index.row_of(&item.parent_asin) != Some(row) {
                return Err(IndexError::Misaligned {
                    row,
                    index_id: id.clone(),
                    metadata_id: item.parent_asin.clone(),
                });
            }
        }
        Ok(Self { index, items })
    }

    /// Reads and validates both artifacts.
    pub fn load(index_path: &Path, metadata_path: &Path) -> Result<Self, IndexError> {
        let index = FlatIndex::read_from(index_path)?;
        let items: Vec<Item> = serde_json::from_slice(&fs::read(metadata_path)?)?;
        let out = Self::new(index, items)?;
        info!(
            rows = out.len(),
            dim = out.dim(),
            index = ?index_path,
            metadata = ?metadata_path,
            "product index loaded"
        );
        Ok(out)
    }

    /// Writes both artifacts (temporary sibling + rename each).
    pub fn save(&self, index_path: &Path, metadata_path: &Path) -> Result<(), IndexError> {
        self.index.write_to(index_path)?;
        write_atomic(metadata_path, &serde_json::to_vec(&self.items)?)?;
        info!(
            rows = self.len(),
            index = ?index_path,
            metadata = ?metadata_path,
            "product index saved"
        );
        Ok(())
    }

    /// Top-`k` hits for `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>, IndexError> {
        Ok(self
            .index
            .search(query, k)?
            .into_iter()
            .filter_map(|(row, score)| {
                self.items.get(row).map(|item| Hit {
                    row,
                    score,
                    item: item.clone(),
                })
            })
            .collect())
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.row_of(id).and_then(|row| self.items.get(row))
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.index.row_of(id).and_then(|row| self.index.vector(row))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn item(id: &str, title: &str) -> Item {
        Item {
            parent_asin: id.into(),
            title: title.into(),
            store: None,
            features: vec![],
            description: vec![],
            details: Map::new(),
            price: 10.0,
            average_rating: Some(4.5),
            rating_number: Some(3),
            main_image: format!("https://img/{id}.jpg"),
            category: "Apparel".into(),
            subcategory: "Swimwear".into(),
        }
    }

    fn index(ids: &[&str]) -> FlatIndex {
        let mut idx = FlatIndex::new(2);
        for (i, id) in ids.iter().enumerate() {
            idx.add(*id, &[i as f32, 1.0]).unwrap();
        }
        idx
    }

    #[test]
    fn misaligned_and_mismatched_artifacts_are_rejected() {
        assert!(matches!(
            ProductIndex::new(index(&["a", "b"]), vec![item("a", "A")]),
            Err(IndexError::RowCountMismatch {
                index: 2,
                metadata: 1
            })
        ));
        assert!(matches!(
            ProductIndex::new(index(&["a", "b"]), vec![item("b", "B"), item("a", "A")]),
            Err(IndexError::Misaligned { row: 0, .. })
        ));
    }

    #[test]
    fn save_load_round_trip_keeps_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let ip = dir.path().join("p.index");
        let mp = dir.path().join("p.meta.json");
        let pi =
            ProductIndex::new(index(&["a", "b"]), vec![item("a", "A"), item("b", "B")]).unwrap();
        pi.save(&ip, &mp).unwrap();

        let loaded = ProductIndex::load(&ip, &mp).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.items(), pi.items());
        assert_eq!(loaded.get("b").unwrap().title, "B");

        let hits = loaded.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].item.parent_asin, "b");
    }
}
