//! Build configuration, category taxonomy and details whitelist.

use std::{collections::HashMap, path::PathBuf, str::FromStr};

use serde_json::{Map, Value};

use crate::errors::IndexError;

/// Configuration for catalog preparation, embedding and index build.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Weight of the image vector in the fused embedding.
    pub img_ratio: f32,
    /// Weight of the text vector in the fused embedding.
    pub text_ratio: f32,
    /// Inputs per embedding request.
    pub batch_size: usize,
    /// Images fetched concurrently inside one batch.
    pub image_fetch_concurrency: usize,
    /// Per-image fetch timeout in seconds.
    pub image_fetch_timeout_secs: u64,
    pub catalog_path: PathBuf,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Keep only the first N prepared records.
    pub sample_size: Option<usize>,
    /// If `Some`, every embedding must have this length.
    pub embedding_dim: Option<usize>,
    pub taxonomy: Taxonomy,
    pub details_map: DetailsMap,
}

impl IndexConfig {
    /// Defaults matching the fashion catalog layout.
    pub fn new_default() -> Self {
        Self {
            img_ratio: 0.7,
            text_ratio: 0.3,
            batch_size: 100,
            image_fetch_concurrency: 8,
            image_fetch_timeout_secs: 3,
            catalog_path: PathBuf::from("./data/meta_Amazon_Fashion.jsonl"),
            index_path: PathBuf::from("./index/products.index"),
            metadata_path: PathBuf::from("./index/products.meta.json"),
            sample_size: None,
            embedding_dim: None,
            taxonomy: Taxonomy::builtin(),
            details_map: DetailsMap::builtin(),
        }
    }

    /// Build from environment variables on top of [`IndexConfig::new_default`].
    ///
    /// # Errors
    /// Returns `IndexError::Config` for unparsable values, and I/O or JSON
    /// errors when `TAXONOMY_PATH` / `DETAILS_MAP_PATH` cannot be loaded.
    pub fn from_env() -> Result<Self, IndexError> {
        let d = Self::new_default();

        let taxonomy = match env_opt("TAXONOMY_PATH") {
            Some(p) => Taxonomy::from_json_str(&std::fs::read_to_string(p)?)?,
            None => d.taxonomy,
        };
        let details_map = match env_opt("DETAILS_MAP_PATH") {
            Some(p) => DetailsMap::from_json_str(&std::fs::read_to_string(p)?)?,
            None => d.details_map,
        };

        let cfg = Self {
            img_ratio: parse("IMG_RATIO", d.img_ratio)?,
            text_ratio: parse("TEXT_RATIO", d.text_ratio)?,
            batch_size: parse("EMBED_BATCH_SIZE", d.batch_size)?,
            image_fetch_concurrency: parse("IMAGE_FETCH_CONCURRENCY", d.image_fetch_concurrency)?,
            image_fetch_timeout_secs: parse(
                "IMAGE_FETCH_TIMEOUT_SECS",
                d.image_fetch_timeout_secs,
            )?,
            catalog_path: env_opt("CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.catalog_path),
            index_path: env_opt("INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.index_path),
            metadata_path: env_opt("METADATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.metadata_path),
            sample_size: parse_opt("CATALOG_SAMPLE_SIZE")?,
            embedding_dim: parse_opt("EMBEDDING_DIM")?,
            taxonomy,
            details_map,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), IndexError> {
        for (name, r) in [
            ("img_ratio", self.img_ratio),
            ("text_ratio", self.text_ratio),
        ] {
            if !r.is_finite() || r < 0.0 {
                return Err(IndexError::Config(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if self.img_ratio == 0.0 && self.text_ratio == 0.0 {
            return Err(IndexError::Config(
                "img_ratio and text_ratio are both 0".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(IndexError::Config("batch_size must be > 0".into()));
        }
        if self.image_fetch_concurrency == 0 {
            return Err(IndexError::Config(
                "image_fetch_concurrency must be > 0".into(),
            ));
        }
        if self.index_path.as_os_str().is_empty() || self.metadata_path.as_os_str().is_empty() {
            return Err(IndexError::Config(
                "index/metadata paths must not be empty".into(),
            ));
        }
        if self.embedding_dim == Some(0) {
            return Err(IndexError::Config("embedding_dim must be > 0".into()));
        }
        if self.taxonomy.is_empty() {
            return Err(IndexError::EmptyTaxonomy);
        }
        Ok(())
    }
}

fn env_opt(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(k: &str, dflt: T) -> Result<T, IndexError> {
    match env_opt(k) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| IndexError::Config(format!("{k}: cannot parse `{v}`"))),
        None => Ok(dflt),
    }
}

fn parse_opt<T: FromStr>(k: &str) -> Result<Option<T>, IndexError> {
    env_opt(k)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| IndexError::Config(format!("{k}: cannot parse `{v}`")))
        })
        .transpose()
}

/* ------------------------------------------------------------------------- */
/* Taxonomy                                                                  */
/* ------------------------------------------------------------------------- */

/// Two-level category tree. Order is significant: it breaks tagging ties.
#[derive(Clone, Debug, PartialEq)]
pub struct Taxonomy {
    categories: Vec<(String, Vec<String>)>,
}

const BUILTIN_TAXONOMY: &[(&str, &[&str])] = &[
    (
        "Apparel",
        &[
            "Dresses",
            "Jackets & Coats",
            "Jeans & Pants",
            "Jumpsuits & Rompers",
            "Lingerie & Sleepwear",
            "T-Shirts & Tops",
            "Shorts & Skirts",
            "Sweaters & Knits",
            "Swimwear",
            "Sportswear",
        ],
    ),
    (
        "Shoes",
        &[
            "Boots",
            "Flats & Loafers",
            "Heels & Pumps",
            "Sandals & Espadrilles",
            "Sneakers & Athletic",
            "Clogs",
        ],
    ),
    (
        "Bags",
        &[
            "Backpacks",
            "Bucket & Tote Bags",
            "Clutches & Mini Bags",
            "Crossbody & Shoulder Bags",
            "Top Handle Bags",
            "Wallets & Card Cases",
        ],
    ),
    (
        "Accessories",
        &[
            "Belts",
            "Hats",
            "Jewelry",
            "Sunglasses",
            "Watches",
            "Gloves & Scarves",
            "Facemasks",
            "Other Accessories",
        ],
    ),
];

impl Taxonomy {
    pub fn new(categories: Vec<(String, Vec<String>)>) -> Self {
        Self { categories }
    }

    /// Built-in fashion taxonomy (Apparel / Shoes / Bags / Accessories).
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_TAXONOMY
                .iter()
                .map(|(c, subs)| (c.to_string(), subs.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }

    /// Parses `{"Category": ["Sub", ...], ...}` keeping key order.
    pub fn from_json_str(s: &str) -> Result<Self, IndexError> {
        let map: Map<String, Value> = serde_json::from_str(s)?;
        let mut categories = Vec::with_capacity(map.len());
        for (cat, subs) in map {
            let subs: Vec<String> = serde_json::from_value(subs)?;
            categories.push((cat, subs));
        }
        let t = Self::new(categories);
        if t.is_empty() {
            return Err(IndexError::EmptyTaxonomy);
        }
        Ok(t)
    }

    /// Flattened `(category, subcategory)` pairs in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories
            .iter()
            .flat_map(|(c, subs)| subs.iter().map(move |s| (c.as_str(), s.as_str())))
    }

    /// Number of subcategories.
    pub fn len(&self) -> usize {
        self.categories.iter().map(|(_, s)| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/* ------------------------------------------------------------------------- */
/* Details whitelist / rename map                                            */
/* ------------------------------------------------------------------------- */

/// Maps raw `details` keys to canonical names; unknown keys are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailsMap {
    map: HashMap<String, String>,
}

const BUILTIN_DETAILS: &[(&str, &str)] = &[
    ("Date First Available", "Date First Available"),
    ("Package Dimensions", "Package Dimensions"),
    ("Item model number", "Item model number"),
    (
        "Is Discontinued By Manufacturer",
        "Is Discontinued By Manufacturer",
    ),
    ("Product Dimensions", "Product Dimensions"),
    ("Department", "Department"),
    ("Manufacturer", "Manufacturer"),
    ("Brand", "Brand"),
    ("Age Range (Description)", "Age Range (Description)"),
    ("Material", "Material"),
    ("Item Weight", "Item Weight"),
    ("Style", "Style"),
    ("Color", "Color"),
    ("Closure Type", "Closure Type"),
    ("Size", "Size"),
    ("Shape", "Shape"),
    ("Reusability", "Reusability"),
    ("Theme", "Theme"),
    ("Special Feature", "Special Feature"),
    ("Pattern", "Pattern"),
    ("Country of Origin", "Country of Origin"),
    ("Unit Count", "Unit Count"),
    ("Item Package Quantity", "Item Package Quantity"),
    ("Clasp Type", "Clasp Type"),
    ("Sport", "Sport"),
    ("Neck Style", "Neck Style"),
    ("Batteries", "Batteries"),
    ("Item Dimensions LxWxH", "Item Dimensions LxWxH"),
    ("Fit Type", "Fit Type"),
    ("Sleeve Type", "Sleeve Type"),
    ("Chain Type", "Chain Type"),
    (
        "Manufacturer recommended age",
        "Manufacturer recommended age",
    ),
    ("Number of Items", "Number of Items"),
    ("Number of Pieces", "Number of Pieces"),
    ("Fabric Type", "Fabric Type"),
    ("Occasion", "Occasion"),
    ("Product Care Instructions", "Product Care Instructions"),
    ("Frame Material", "Frame Material"),
    ("Collection Name", "Collection Name"),
    ("Metal Type", "Metal Type"),
    ("Item Length", "Item Length"),
    ("Shirt form type", "Shirt form type"),
    ("Brand Name", "Brand"),
    ("Metal Stamp", "Metal Stamp"),
    ("Part Number", "Part Number"),
    ("Target Audience", "Target Audience"),
    ("Item Package Dimensions L x W x H", "Item Dimensions LxWxH"),
    ("Cartoon Character", "Cartoon Character"),
    ("Package Weight", "Package Weight"),
    ("Included Components", "Included Components"),
    ("Collar Style", "Collar Style"),
    ("Hand Orientation", "Hand Orientation"),
    ("Item Length (Description)", "Item Length"),
    ("Sport Type", "Sport"),
    ("Lens Color", "Lens Color"),
    ("Form Factor", "Form Factor"),
    ("Lining Description", "Lining Description"),
    ("Frame Type", "Frame Type"),
    ("Lens Coating Description", "Lens Coating Description"),
    ("Suggested Users", "Target Audience"),
    ("Band Material Type", "Band Material Type"),
    ("Team Name", "Team Name"),
    ("Band Color", "Band Color"),
    (
        "Recommended Uses For Product",
        "Recommended Uses For Product",
    ),
    ("Ply Rating", "Ply Rating"),
    ("Compatible Phone Models", "Compatible Phone Models"),
    ("Use for", "Recommended Uses For Product"),
    ("Filter Class", "Filter Class"),
    ("Handle Material", "Handle Material"),
    ("Vehicle Service Type", "Vehicle Service Type"),
    ("Opening Mechanism", "Opening Mechanism"),
    ("Item Form", "Item Form"),
    ("Manufacturer Part Number", "Part Number"),
    ("Number of Labels", "Number of Labels"),
    ("League", "League"),
    ("Hair Type", "Hair Type"),
    ("Mounting Type", "Mounting Type"),
    ("Item Dimensions  LxWxH", "Item Dimensions LxWxH"),
    ("Compatible Devices", "Compatible Devices"),
    ("Number of Sets", "Number of Sets"),
    ("Finish Type", "Finish Type"),
    ("Lens Material", "Lens Material"),
    ("Stone Color", "Stone Color"),
    ("Band Size", "Band Size"),
    ("Model Name", "Model Name"),
    ("Outer Material", "Outer Material"),
    ("Capacity", "Capacity"),
    ("Material Type", "Material"),
    ("Primary Stone Gem Type", "Primary Stone Gem Type"),
    ("Band Width", "Band Width"),
    ("Water Resistance Level", "Water Resistance Level"),
    ("Language", "Language"),
    ("Size Map", "Size Map"),
    ("UPC", "UPC"),
    ("Shaft Material", "Shaft Material"),
    ("Top Style", "Top Style"),
    ("Model Year", "Model Year"),
    ("Batteries required", "Batteries"),
];

impl DetailsMap {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_DETAILS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Parses `{"Raw Key": "Canonical Key", ...}`. Empty keys are ignored.
    pub fn from_json_str(s: &str) -> Result<Self, IndexError> {
        let map: HashMap<String, String> = serde_json::from_str(s)?;
        Ok(Self::new(
            map.into_iter()
                .filter(|(k, v)| !k.trim().is_empty() && !v.trim().is_empty())
                .collect(),
        ))
    }

    /// Canonical name for `raw`, if whitelisted.
    pub fn canonical(&self, raw: &str) -> Option<&str> {
        self.map.get(raw).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_taxonomy_keeps_declaration_order() {
        let t = Taxonomy::builtin();
        let first: Vec<_> = t.entries().take(2).collect();
        assert_eq!(
            first,
            vec![("Apparel", "Dresses"), ("Apparel", "Jackets & Coats")]
        );
        assert_eq!(t.len(), 30);
    }

    #[test]
    fn taxonomy_from_json_preserves_key_order() {
        let t = Taxonomy::from_json_str(r#"{"Shoes": ["Boots"], "Bags": ["Totes", "Clutches"]}"#)
            .unwrap();
        let all: Vec<_> = t.entries().collect();
        assert_eq!(
            all,
            vec![("Shoes", "Boots"), ("Bags", "Totes"), ("Bags", "Clutches")]
        );
        assert!(matches!(
            Taxonomy::from_json_str(r#"{"Shoes": []}"#),
            Err(IndexError::EmptyTaxonomy)
        ));
    }

    #[test]
    fn details_map_renames_and_whitelists() {
        let m = DetailsMap::builtin();
        assert_eq!(m.canonical("Brand Name"), Some("Brand"));
        assert_eq!(m.canonical("Material Type"), Some("Material"));
        assert_eq!(m.canonical("Best Sellers Rank"), None);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = IndexConfig::new_default();
        assert!(cfg.validate().is_ok());
        cfg.img_ratio = 0.0;
        cfg.text_ratio = 0.0;
        assert!(cfg.validate().is_err());
        cfg = IndexConfig::new_default();
        cfg.batch_size = 0;
        assert!(cfg.validate().is_err());
        cfg = IndexConfig::new_default();
        cfg.img_ratio = f32::NAN;
        assert!(cfg.validate().is_err());
    }
}
