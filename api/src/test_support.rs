//! Deterministic fakes and fixtures for handler tests.

use std::{io::Write, path::Path, sync::Arc};

use futures::future::BoxFuture;
use product_index::{EncodedImage, ImageEmbedder, IndexConfig, IndexError, Taxonomy, TextEmbedder};
use product_retriever::{LanguageModel, OFF_DOMAIN_SENTINEL, RetrieverConfig, RetrieverError};

use crate::app::state::AppState;

fn keyword_vec(s: &str) -> Vec<f32> {
    let s = s.to_lowercase();
    if s.contains("swim") || s.contains("trunks") {
        vec![1.0, 0.0, 0.1]
    } else if s.contains("sunglass") {
        vec![0.0, 1.0, 0.1]
    } else {
        vec![0.0, 0.0, 1.0]
    }
}

struct KeywordText;
impl TextEmbedder for KeywordText {
    fn embed_texts<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, IndexError>> {
        Box::pin(async move { Ok(texts.iter().map(|t| keyword_vec(t)).collect()) })
    }
}

struct KeywordImage;
impl ImageEmbedder for KeywordImage {
    fn embed_images<'a>(
        &'a self,
        images: &'a [EncodedImage],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, IndexError>> {
        Box::pin(async move {
            Ok(images
                .iter()
                .map(|i| {
                    let name = Path::new(&i.source)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    keyword_vec(&name)
                })
                .collect())
        })
    }
}

/// Expands everything to "swim trunks" except laptops; confirms only `A`.
struct BeachModel;
impl LanguageModel for BeachModel {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        Box::pin(async move {
            Ok(if user.contains("laptop") {
                OFF_DOMAIN_SENTINEL.to_string()
            } else {
                "swim trunks".to_string()
            })
        })
    }

    fn complete_with_images<'a>(
        &'a self,
        _prompt: &'a str,
        _image_urls: &'a [String],
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        Box::pin(async move { Ok("A".to_string()) })
    }
}

fn state(index_cfg: IndexConfig) -> Arc<AppState> {
    Arc::new(AppState::new(
        index_cfg,
        RetrieverConfig::new_default(),
        Arc::new(KeywordText),
        Arc::new(KeywordImage),
        Arc::new(BeachModel),
    ))
}

pub(crate) fn state_without_index() -> Arc<AppState> {
    state(IndexConfig::new_default())
}

/// Writes a three-record catalog (C has no image) under `dir`.
pub(crate) fn state_with_catalog(dir: &Path) -> Arc<AppState> {
    let mut lines = Vec::new();
    for (asin, title, image) in [
        ("A", "Swim Trunks", Some("swim-trunks.png")),
        ("B", "Sunglasses", Some("sunglasses.png")),
        ("C", "Sandals", None),
    ] {
        let images = match image {
            Some(name) => {
                let path = dir.join(name);
                image::RgbImage::from_pixel(4, 4, image::Rgb([10, 90, 200]))
                    .save(&path)
                    .unwrap();
                format!(r#"[{{"large":"{}","variant":"MAIN"}}]"#, path.display())
            }
            None => "[]".into(),
        };
        lines.push(format!(
            r#"{{"parent_asin":"{asin}","title":"{title}","price":19.5,"images":{images}}}"#
        ));
    }
    let catalog = dir.join("catalog.jsonl");
    let mut f = std::fs::File::create(&catalog).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }

    let mut cfg = IndexConfig::new_default();
    cfg.catalog_path = catalog;
    cfg.index_path = dir.join("out/products.index");
    cfg.metadata_path = dir.join("out/products.meta.json");
    cfg.taxonomy = Taxonomy::new(vec![
        ("Apparel".into(), vec!["Swimwear".into()]),
        ("Accessories".into(), vec!["Sunglasses".into()]),
    ]);
    state(cfg)
}
