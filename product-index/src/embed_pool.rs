//! Batched embedding generator.
//!
//! Text batches are fail-fast. Image batches tolerate per-item failures: an
//! image that cannot be loaded is logged and left out, and a batch rejected by
//! the embedder is retried one image at a time so a single bad input only
//! excludes itself.

use futures::{
    FutureExt,
    future::BoxFuture,
    stream::{self, StreamExt},
};
use tracing::{debug, info, warn};

use crate::{
    embed::{EncodedImage, ImageEmbedder, TextEmbedder},
    errors::IndexError,
    image_source::ImageFetcher,
    progress::Progress,
    record::{EmbeddingRecord, Modality},
};

/// Embeds `texts` (parallel to `ids`) in batches of `batch_size`.
///
/// # Errors
/// Any embedder failure, or a response with the wrong number of vectors.
pub async fn embed_texts(
    ids: &[String],
    texts: &[String],
    embedder: &dyn TextEmbedder,
    batch_size: usize,
    progress: &dyn Progress,
) -> Result<Vec<EmbeddingRecord>, IndexError> {
    if ids.len() != texts.len() {
        return Err(IndexError::Config(format!(
            "{} ids for {} texts",
            ids.len(),
            texts.len()
        )));
    }
    let batch_size = batch_size.max(1);
    info!(total = texts.len(), batch_size, "embedding texts");
    progress.set_total(texts.len().div_ceil(batch_size) as u64);

    let mut out = Vec::with_capacity(texts.len());
    for (n, (id_chunk, text_chunk)) in ids
        .chunks(batch_size)
        .zip(texts.chunks(batch_size))
        .enumerate()
    {
        let vectors = embedder.embed_texts(text_chunk).await?;
        if vectors.len() != text_chunk.len() {
            return Err(IndexError::Embedding(format!(
                "text batch {n}: expected {} vectors, got {}",
                text_chunk.len(),
                vectors.len()
            )));
        }
        out.extend(
            id_chunk
                .iter()
                .zip(vectors)
                .map(|(id, v)| EmbeddingRecord::new(id.clone(), v, Modality::Text)),
        );
        debug!(batch = n, size = text_chunk.len(), "text batch embedded");
        progress.step("text embeddings");
    }
    Ok(out)
}

/// Embeds images at `sources` (parallel to `ids`); failed items are dropped.
pub async fn embed_images(
    ids: &[String],
    sources: &[String],
    embedder: &dyn ImageEmbedder,
    fetcher: &ImageFetcher,
    batch_size: usize,
    fetch_concurrency: usize,
    progress: &dyn Progress,
) -> Vec<EmbeddingRecord> {
    let batch_size = batch_size.max(1);
    info!(total = sources.len(), batch_size, "embedding images");
    progress.set_total(sources.len().div_ceil(batch_size) as u64);

    let mut out = Vec::with_capacity(sources.len());
    for (n, (id_chunk, src_chunk)) in ids
        .chunks(batch_size)
        .zip(sources.chunks(batch_size))
        .enumerate()
    {
        let futs: Vec<BoxFuture<'_, Option<(String, EncodedImage)>>> = id_chunk
            .iter()
            .zip(src_chunk)
            .map(|(id, src)| {
                async move {
                    match fetcher.load(src).await {
                        Ok(img) => Some((id.clone(), img)),
                        Err(e) => {
                            warn!(id = %id, error = %e, "skipping image");
                            None
                        }
                    }
                }
                .boxed()
            })
            .collect();
        let loaded: Vec<Option<(String, EncodedImage)>> = stream::iter(futs)
            .buffered(fetch_concurrency.max(1))
            .collect()
            .await;

        let (batch_ids, images): (Vec<String>, Vec<EncodedImage>) =
            loaded.into_iter().flatten().unzip();
        let embedded = embed_image_batch(n, &batch_ids, &images, embedder).await;
        debug!(
            batch = n,
            size = src_chunk.len(),
            embedded = embedded.len(),
            "image batch embedded"
        );
        out.extend(embedded);
        progress.step("image embeddings");
    }
    out
}

async fn embed_image_batch(
    n: usize,
    ids: &[String],
    images: &[EncodedImage],
    embedder: &dyn ImageEmbedder,
) -> Vec<EmbeddingRecord> {
    if images.is_empty() {
        return Vec::new();
    }
    match embedder.embed_images(images).await {
        Ok(vectors) if vectors.len() == images.len() => ids
            .iter()
            .zip(vectors)
            .map(|(id, v)| EmbeddingRecord::new(id.clone(), v, Modality::Image))
            .collect(),
        Ok(vectors) => {
            warn!(
                batch = n,
                want = images.len(),
                got = vectors.len(),
                "image batch returned wrong count, retrying per item"
            );
            embed_one_by_one(ids, images, embedder).await
        }
        Err(e) => {
            warn!(batch = n, error = %e, "image batch failed, retrying per item");
            embed_one_by_one(ids, images, embedder).await
        }
    }
}

async fn embed_one_by_one(
    ids: &[String],
    images: &[EncodedImage],
    embedder: &dyn ImageEmbedder,
) -> Vec<EmbeddingRecord> {
    let mut out = Vec::new();
    for (id, img) in ids.iter().zip(images) {
        match embedder.embed_images(std::slice::from_ref(img)).await {
            Ok(mut v) if v.len() == 1 => {
                if let Some(vec) = v.pop() {
                    out.push(EmbeddingRecord::new(id.clone(), vec, Modality::Image));
                }
            }
            Ok(_) => warn!(id = %id, "image embedder returned wrong count, skipping"),
            Err(e) => warn!(id = %id, error = %e, "image embedding failed, skipping"),
        }
    }
    out
}
