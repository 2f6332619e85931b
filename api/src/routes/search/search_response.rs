use product_index::Item;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub message: &'static str,
    pub query: String,
    pub count: usize,
    pub items: Vec<Item>,
}
