//! Fuses image and text vectors: `image * img_ratio + text * text_ratio`.
//!
//! No normalization happens here; the index builder normalizes fused rows.

use std::collections::HashMap;

use crate::{
    errors::IndexError,
    record::{EmbeddingRecord, Modality},
};

/// Elementwise weighted sum of two vectors of equal dimension.
///
/// # Errors
/// `IndexError::DimensionMismatch` if the lengths differ.
pub fn mix(
    image: &[f32],
    text: &[f32],
    img_ratio: f32,
    text_ratio: f32,
) -> Result<Vec<f32>, IndexError> {
    if image.len() != text.len() {
        return Err(IndexError::DimensionMismatch {
            got: text.len(),
            want: image.len(),
        });
    }
    Ok(image
        .iter()
        .zip(text)
        .map(|(i, t)| i * img_ratio + t * text_ratio)
        .collect())
}

/// Inner-joins image and text records by id and fuses each pair.
///
/// Output follows the order of `text` (catalog order); ids missing either
/// modality are left out.
///
/// # Errors
/// Fails on the first dimension mismatch.
pub fn fuse_by_id(
    image: &[EmbeddingRecord],
    text: &[EmbeddingRecord],
    img_ratio: f32,
    text_ratio: f32,
) -> Result<Vec<EmbeddingRecord>, IndexError> {
    let by_id: HashMap<&str, &[f32]> = image
        .iter()
        .map(|r| (r.id.as_str(), r.vector.as_slice()))
        .collect();

    text.iter()
        .filter_map(|t| by_id.get(t.id.as_str()).map(|img| (t, *img)))
        .map(|(t, img)| {
            let fused = mix(img, &t.vector, img_ratio, text_ratio)?;
            Ok(EmbeddingRecord::new(t.id.clone(), fused, Modality::Fused))
        })
        .collect()
}
