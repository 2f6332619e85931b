use std::{env, path::PathBuf, sync::Arc};

use ai_llm_service::{LlmServiceProfiles, telemetry};
use anyhow::Context;
use product_index::{
    ClipImageEmbedder, ClipTextEmbedder, Embedders, IndexConfig, IndicatifProgress, build_index,
};
use tracing::{Level, info};

const USAGE: &str = "usage: fashion-search [serve | build-index [CATALOG_PATH]]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    dotenvy::dotenv().ok();
    telemetry::init("info", Level::INFO);

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => api::start().await.context("api server failed"),
        Some("build-index") => build(args.get(1).map(PathBuf::from)).await,
        Some(other) => anyhow::bail!("unknown command `{other}`\n{USAGE}"),
    }
}

/// Offline index build with a terminal progress bar.
async fn build(catalog: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = IndexConfig::from_env().context("invalid index configuration")?;
    let svc = Arc::new(LlmServiceProfiles::from_env().context("invalid model configuration")?);
    let text = ClipTextEmbedder::new(svc.clone(), cfg.embedding_dim);
    let image = ClipImageEmbedder::new(svc, cfg.embedding_dim);

    let catalog = catalog.unwrap_or_else(|| cfg.catalog_path.clone());
    let progress = IndicatifProgress::bar();
    let (_, report) = build_index(
        &cfg,
        &catalog,
        Embedders {
            text: &text,
            image: &image,
        },
        &progress,
    )
    .await
    .with_context(|| format!("index build failed for {}", catalog.display()))?;

    info!(
        read = report.read,
        skipped = report.skipped,
        zero_norm = report.zero_norm_dropped,
        indexed = report.indexed,
        index = ?cfg.index_path,
        metadata = ?cfg.metadata_path,
        "index build finished"
    );
    Ok(())
}
