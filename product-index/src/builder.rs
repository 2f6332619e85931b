//! One-shot index build: catalog → embeddings → fuse → tag → normalize → persist.

use std::{collections::HashMap, io, path::Path, time::Duration};

use tokio::task;
use tracing::{info, warn};

use crate::{
    artifacts::ProductIndex,
    catalog::load_catalog,
    config::IndexConfig,
    embed::{ImageEmbedder, TextEmbedder},
    embed_pool,
    errors::IndexError,
    flat_index::FlatIndex,
    image_source::ImageFetcher,
    mixer::fuse_by_id,
    normalize::l2_normalize,
    progress::Progress,
    record::{BuildReport, Product},
    tagger::CategoryTagger,
};

/// Text and image towers used for a build.
#[derive(Clone, Copy)]
pub struct Embedders<'a> {
    pub text: &'a dyn TextEmbedder,
    pub image: &'a dyn ImageEmbedder,
}

/// Builds the index for `catalog_path` and writes both artifacts to the
/// paths in `cfg`.
///
/// # Errors
/// I/O failures, text-embedding failures and structural violations
/// (dimension mismatch, misalignment) abort the build. Bad records and
/// broken images are skipped.
pub async fn build_index(
    cfg: &IndexConfig,
    catalog_path: &Path,
    embedders: Embedders<'_>,
    progress: &dyn Progress,
) -> Result<(ProductIndex, BuildReport), IndexError> {
    cfg.validate()?;
    let mut report = BuildReport::default();

    let load = {
        let path = catalog_path.to_path_buf();
        let details_map = cfg.details_map.clone();
        let sample_size = cfg.sample_size;
        off_runtime("catalog read", move || {
            load_catalog(path, &details_map, sample_size)
        })
        .await?
    };
    report.read = load.read;
    report.skipped = load.skipped;
    report.prepared = load.products.len();

    let ids: Vec<String> = load
        .products
        .iter()
        .map(|p| p.parent_asin.clone())
        .collect();
    let texts: Vec<String> = load.products.iter().map(|p| p.text.clone()).collect();
    let sources: Vec<String> = load.products.iter().map(|p| p.main_image.clone()).collect();

    let text_vecs =
        embed_pool::embed_texts(&ids, &texts, embedders.text, cfg.batch_size, progress).await?;
    report.text_embedded = text_vecs.len();

    let fetcher = ImageFetcher::new(Duration::from_secs(cfg.image_fetch_timeout_secs))?;
    let image_vecs = embed_pool::embed_images(
        &ids,
        &sources,
        embedders.image,
        &fetcher,
        cfg.batch_size,
        cfg.image_fetch_concurrency,
        progress,
    )
    .await;
    report.image_embedded = image_vecs.len();
    progress.finish("embeddings done");

    let fused = fuse_by_id(&image_vecs, &text_vecs, cfg.img_ratio, cfg.text_ratio)?;
    info!(
        fused = fused.len(),
        img_ratio = cfg.img_ratio,
        text_ratio = cfg.text_ratio,
        "embeddings mixed"
    );

    let dim = match (fused.first(), cfg.embedding_dim) {
        (Some(first), _) => first.vector.len(),
        (None, Some(d)) => d,
        (None, None) => 0,
    };
    if let Some(want) = cfg.embedding_dim {
        if want != dim {
            return Err(IndexError::DimensionMismatch { got: dim, want });
        }
    }

    let tagger = if fused.is_empty() {
        None
    } else {
        Some(CategoryTagger::build(&cfg.taxonomy, embedders.text).await?)
    };

    let mut products: HashMap<String, Product> = load
        .products
        .into_iter()
        .map(|p| (p.parent_asin.clone(), p))
        .collect();

    let mut index = FlatIndex::new(dim);
    let mut items = Vec::with_capacity(fused.len());
    for mut rec in fused {
        if !l2_normalize(&mut rec.vector) {
            warn!(id = %rec.id, "dropping zero-norm or non-finite fused vector");
            report.zero_norm_dropped += 1;
            continue;
        }
        let Some(product) = products.remove(&rec.id) else {
            continue;
        };
        let (category, subcategory) = match &tagger {
            Some(t) => {
                let tag = t.tag(&rec.vector)?;
                (tag.category, tag.subcategory)
            }
            None => (String::new(), String::new()),
        };
        index.add(rec.id, &rec.vector)?;
        items.push(product.into_item(category, subcategory));
    }

    let product_index = {
        let product_index = ProductIndex::new(index, items)?;
        let index_path = cfg.index_path.clone();
        let metadata_path = cfg.metadata_path.clone();
        off_runtime("artifact write", move || {
            product_index.save(&index_path, &metadata_path)?;
            Ok(product_index)
        })
        .await?
    };
    report.indexed = product_index.len();

    info!(
        read = report.read,
        prepared = report.prepared,
        skipped = report.skipped,
        text_embedded = report.text_embedded,
        image_embedded = report.image_embedded,
        zero_norm_dropped = report.zero_norm_dropped,
        indexed = report.indexed,
        "index build complete"
    );
    Ok((product_index, report))
}

/// Runs blocking file work on the blocking pool.
async fn off_runtime<T, F>(what: &'static str, f: F) -> Result<T, IndexError>
where
    F: FnOnce() -> Result<T, IndexError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| IndexError::Io(io::Error::other(format!("{what} task failed: {e}"))))?
}
