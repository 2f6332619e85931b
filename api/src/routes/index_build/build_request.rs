use serde::Deserialize;

/// Both fields fall back to the server's build configuration.
#[derive(Debug, Default, Deserialize)]
pub struct BuildRequest {
    pub catalog_path: Option<String>,
    pub sample_size: Option<usize>,
}
