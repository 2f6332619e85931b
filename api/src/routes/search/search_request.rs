use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Hits per expanded phrase; server default when absent.
    pub k: Option<usize>,
}
