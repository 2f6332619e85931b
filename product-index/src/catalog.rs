//! Catalog reader: tolerant JSONL parsing and record preparation.
//!
//! Each line is one raw catalog record. Preparation:
//! - filters `details` through the [`DetailsMap`] (first key wins after renaming),
//! - picks the `large` URL of the `MAIN` image,
//! - builds the normalized embedding text,
//! - drops records missing id, title, main image or a usable price,
//! - keeps the first occurrence of each title and of each `parent_asin`.
//!
//! Unused raw fields (`categories`, `bought_together`, `main_category`,
//! `videos`) are never deserialized.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{config::DetailsMap, errors::IndexError, normalize::strip_emojis, record::Product};

#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    parent_asin: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    store: Option<String>,
    #[serde(default)]
    features: Option<Vec<String>>,
    #[serde(default)]
    description: Option<Vec<String>>,
    #[serde(default)]
    details: Option<Map<String, Value>>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    average_rating: Option<f32>,
    #[serde(default)]
    rating_number: Option<u64>,
    #[serde(default)]
    images: Option<Vec<RawImage>>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(default)]
    large: Option<String>,
    #[serde(default)]
    variant: Option<String>,
}

/// Result of reading a catalog file.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub products: Vec<Product>,
    /// Non-empty lines seen.
    pub read: usize,
    /// Lines dropped (malformed, incomplete or duplicate).
    pub skipped: usize,
}

/// Reads and prepares a JSONL catalog.
///
/// # Errors
/// Only I/O failures are fatal; bad records are skipped with a warning.
pub fn load_catalog(
    path: impl AsRef<Path>,
    details_map: &DetailsMap,
    sample_size: Option<usize>,
) -> Result<CatalogLoad, IndexError> {
    info!("Reading catalog JSONL: {:?}", path.as_ref());
    let reader = BufReader::new(File::open(path.as_ref())?);

    let mut out = CatalogLoad::default();
    let mut seen_titles = HashSet::new();
    let mut seen_ids = HashSet::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if sample_size.is_some_and(|n| out.products.len() >= n) {
            break;
        }
        out.read += 1;

        let raw: RawRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping malformed catalog line {}: {}", i + 1, e);
                out.skipped += 1;
                continue;
            }
        };

        let Some(product) = prepare_record(raw, details_map) else {
            debug!("Skipping incomplete catalog line {}", i + 1);
            out.skipped += 1;
            continue;
        };

        if !seen_ids.insert(product.parent_asin.clone()) {
            warn!(
                "Skipping duplicate parent_asin {} on line {}",
                product.parent_asin,
                i + 1
            );
            out.skipped += 1;
            continue;
        }
        if !seen_titles.insert(product.title.clone()) {
            debug!("Skipping duplicate title on line {}", i + 1);
            out.skipped += 1;
            continue;
        }
        out.products.push(product);
    }

    info!(
        read = out.read,
        prepared = out.products.len(),
        skipped = out.skipped,
        "catalog prepared"
    );
    Ok(out)
}

/// Turns one raw record into a [`Product`], or `None` if it is unusable.
fn prepare_record(raw: RawRecord, details_map: &DetailsMap) -> Option<Product> {
    let parent_asin = raw.parent_asin.filter(|s| !s.trim().is_empty())?;
    let title = strip_emojis(raw.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let main_image = main_image(raw.images.as_deref().unwrap_or_default())?;
    let price = raw.price.as_ref().and_then(parse_price)?;

    let features = clean_list(raw.features.unwrap_or_default());
    let description = clean_list(raw.description.unwrap_or_default());
    let details = filter_details(raw.details.unwrap_or_default(), details_map);
    let store = raw.store.filter(|s| !s.trim().is_empty());

    let text = embedding_text(&title, &features, &description, &details, store.as_deref());

    Some(Product {
        parent_asin,
        title,
        store,
        features,
        description,
        details,
        price,
        average_rating: raw.average_rating,
        rating_number: raw.rating_number,
        main_image,
        text,
    })
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|s| strip_emojis(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// `large` URL of the first image whose variant is `MAIN`.
fn main_image(images: &[RawImage]) -> Option<String> {
    images
        .iter()
        .filter(|img| img.variant.as_deref() == Some("MAIN"))
        .find_map(|img| img.large.clone().filter(|u| !u.trim().is_empty()))
}

/// Accepts JSON numbers and numeric strings such as `"19.99"` or `"$19.99"`.
fn parse_price(v: &Value) -> Option<f64> {
    let p = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    }?;
    (p.is_finite() && p >= 0.0).then_some(p)
}

/// Keeps whitelisted keys under their canonical name; the first value wins on collisions.
fn filter_details(raw: Map<String, Value>, details_map: &DetailsMap) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in raw {
        if let Some(canon) = details_map.canonical(&k) {
            if !out.contains_key(canon) {
                out.insert(canon.to_string(), v);
            }
        }
    }
    out
}

fn detail_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the lowercased, emoji-free text embedded for an item.
pub fn embedding_text(
    title: &str,
    features: &[String],
    description: &[String],
    details: &Map<String, Value>,
    store: Option<&str>,
) -> String {
    let mut text = format!("Title: {title}\n");
    if !features.is_empty() {
        text.push_str(&format!("Features: {}\n", features.join(" ")));
    }
    if !description.is_empty() {
        text.push_str(&format!("Description: {}\n", description.join(" ")));
    }
    if !details.is_empty() {
        let joined = details
            .iter()
            .map(|(k, v)| format!("{k}: {}", detail_value(v)))
            .collect::<Vec<_>>()
            .join("; ");
        text.push_str(&format!("Details: {joined}\n"));
    }
    if let Some(store) = store {
        text.push_str(&format!("Store: {store}\n"));
    }
    strip_emojis(&text.to_lowercase())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn line(asin: &str, title: &str, price: &str, image: bool) -> String {
        let images = if image {
            format!(
                r#"[{{"thumb":"t","large":"https://img/{asin}-alt.jpg","variant":"PT01"}},{{"large":"https://img/{asin}.jpg","variant":"MAIN"}}]"#
            )
        } else {
            "[]".into()
        };
        format!(
            r##"{{"parent_asin":"{asin}","title":"{title}","store":"Acme","price":{price},"features":["Quick dry 🌊"],"description":[],"details":{{"Brand Name":"Acme","Brand":"Other","Best Sellers Rank":"#1"}},"images":{images},"categories":["x"],"bought_together":null,"main_category":"AMAZON FASHION"}}"##
        )
    }

    fn write_catalog(lines: &[String]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
        f
    }

    #[test]
    fn incomplete_records_are_excluded() {
        let f = write_catalog(&[
            line("A", "Swim Trunks", "20.0", true),
            line("B", "Sunglasses", "\"$15\"", true),
            line("C", "Sandals", "12.0", false),
            line("D", "Scarf", "null", true),
            "{not json".into(),
        ]);
        let load = load_catalog(f.path(), &DetailsMap::builtin(), None).unwrap();
        let ids: Vec<_> = load
            .products
            .iter()
            .map(|p| p.parent_asin.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(load.read, 5);
        assert_eq!(load.skipped, 3);
        assert_eq!(load.products[1].price, 15.0);
        assert_eq!(load.products[0].main_image, "https://img/A.jpg");
    }

    #[test]
    fn details_are_whitelisted_and_first_key_wins() {
        let f = write_catalog(&[line("A", "Swim Trunks", "20.0", true)]);
        let load = load_catalog(f.path(), &DetailsMap::builtin(), None).unwrap();
        let p = &load.products[0];
        assert_eq!(p.details.len(), 1);
        assert_eq!(p.details["Brand"], "Acme");
        assert!(!p.details.contains_key("Best Sellers Rank"));
        assert_eq!(p.features, vec!["Quick dry".to_string()]);
    }

    #[test]
    fn duplicate_titles_and_ids_keep_first() {
        let f = write_catalog(&[
            line("A", "Swim Trunks", "20.0", true),
            line("B", "Swim Trunks", "25.0", true),
            line("A", "Other Title", "5.0", true),
        ]);
        let load = load_catalog(f.path(), &DetailsMap::builtin(), None).unwrap();
        assert_eq!(load.products.len(), 1);
        assert_eq!(load.products[0].price, 20.0);
        assert_eq!(load.skipped, 2);
    }

    #[test]
    fn sample_size_keeps_first_n() {
        let f = write_catalog(&[
            line("A", "One", "1", true),
            line("B", "Two", "2", true),
            line("C", "Three", "3", true),
        ]);
        let load = load_catalog(f.path(), &DetailsMap::builtin(), Some(2)).unwrap();
        assert_eq!(load.products.len(), 2);
    }

    #[test]
    fn embedding_text_layout() {
        let mut details = Map::new();
        details.insert("Brand".into(), Value::String("Acme".into()));
        details.insert("Size".into(), serde_json::json!(42));
        let text = embedding_text(
            "Swim Trunks 🩳",
            &["Quick dry".into()],
            &[],
            &details,
            Some("Acme"),
        );
        assert_eq!(
            text,
            "title: swim trunks features: quick dry details: brand: acme; size: 42 store: acme"
        );
    }
}
