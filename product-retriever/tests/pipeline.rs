use std::{
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use product_index::{
    Embedders, EncodedImage, ImageEmbedder, IndexConfig, IndexError, NoopProgress, Taxonomy,
    TextEmbedder, build_index,
};
use product_retriever::{LanguageModel, Retriever, RetrieverConfig, RetrieverError};

/// Axis 0 = swim, axis 1 = sunglasses, axis 2 = anything else.
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

/// Fixed chat and vision replies; records every vision prompt.
struct Canned {
    chat: String,
    vision: String,
    vision_prompts: Mutex<Vec<String>>,
}

impl Canned {
    fn new(chat: &str, vision: &str) -> Arc<Self> {
        Arc::new(Self {
            chat: chat.into(),
            vision: vision.into(),
            vision_prompts: Mutex::default(),
        })
    }
}

impl LanguageModel for Canned {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        Box::pin(async move { Ok(self.chat.clone()) })
    }

    fn complete_with_images<'a>(
        &'a self,
        prompt: &'a str,
        _image_urls: &'a [String],
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        self.vision_prompts.lock().unwrap().push(prompt.into());
        Box::pin(async move { Ok(self.vision.clone()) })
    }
}

fn png(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    image::RgbImage::from_pixel(4, 4, image::Rgb([200, 120, 40]))
        .save(&path)
        .unwrap();
    path.to_string_lossy().into_owned()
}

fn record(asin: &str, title: &str, image: Option<&str>) -> String {
    let images = match image {
        Some(src) => format!(r#"[{{"large":"{src}","variant":"MAIN"}}]"#),
        None => "[]".into(),
    };
    format!(r#"{{"parent_asin":"{asin}","title":"{title}","price":25.0,"images":{images}}}"#)
}

/// Builds the three-item catalog (C has no image) and returns retriever config for it.
async fn build(dir: &Path) -> RetrieverConfig {
    let a = png(dir, "swim-trunks.png");
    let b = png(dir, "sunglasses.png");
    let catalog = dir.join("catalog.jsonl");
    let mut f = std::fs::File::create(&catalog).unwrap();
    for line in [
        record("A", "Swim Trunks", Some(&a)),
        record("B", "Sunglasses", Some(&b)),
        record("C", "Sandals", None),
    ] {
        writeln!(f, "{line}").unwrap();
    }

    let mut icfg = IndexConfig::new_default();
    icfg.catalog_path = catalog.clone();
    icfg.index_path = dir.join("products.index");
    icfg.metadata_path = dir.join("products.meta.json");
    icfg.taxonomy = Taxonomy::new(vec![
        ("Apparel".into(), vec!["Swimwear".into()]),
        ("Accessories".into(), vec!["Sunglasses".into()]),
    ]);
    let embedders = Embedders {
        text: &KeywordText,
        image: &KeywordImage,
    };
    build_index(&icfg, &catalog, embedders, &NoopProgress)
        .await
        .unwrap();

    let mut rcfg = RetrieverConfig::new_default();
    rcfg.index_path = icfg.index_path;
    rcfg.metadata_path = icfg.metadata_path;
    rcfg
}

#[tokio::test]
async fn beach_query_returns_confirmed_items_best_first() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = build(dir.path()).await;
    let llm = Canned::new("swim trunks|||sunglasses", "A|||B|||C|||Z9");
    let r = Retriever::open(cfg, Arc::new(KeywordText), llm.clone()).unwrap();

    let items = r
        .retrieve("I need an outfit to go to the beach this summer")
        .await
        .unwrap();
    let ids: Vec<_> = items.iter().map(|i| i.parent_asin.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(items[0].subcategory, "Swimwear");

    let prompts = llm.vision_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(!prompts[0].contains("Sandals"));
}

#[tokio::test]
async fn off_domain_query_returns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = build(dir.path()).await;
    let llm = Canned::new("not relevant to fashion products", "A|||B");
    let r = Retriever::open(cfg, Arc::new(KeywordText), llm.clone()).unwrap();

    assert!(
        r.retrieve("best laptop for programming")
            .await
            .unwrap()
            .is_empty()
    );
    assert!(llm.vision_prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn only_confirmed_ids_survive() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = build(dir.path()).await;
    let llm = Canned::new("sunglasses", "B|||NOT-OFFERED");
    let r = Retriever::open(cfg, Arc::new(KeywordText), llm).unwrap();

    let items = r.retrieve_with_k("sunglasses", 5).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].parent_asin, "B");
}

#[test]
fn missing_artifacts_fail_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = RetrieverConfig::new_default();
    cfg.index_path = dir.path().join("nope.index");
    cfg.metadata_path = dir.path().join("nope.json");
    let llm = Canned::new("", "");
    assert!(matches!(
        Retriever::open(cfg, Arc::new(KeywordText), llm),
        Err(RetrieverError::Index(_))
    ));
}
