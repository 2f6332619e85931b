use product_index::BuildReport;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub message: String,
    pub catalog_path: String,
    pub index_path: String,
    pub metadata_path: String,
    pub report: BuildReport,
}
