mod routes;

use anyhow::Context;
use noor_lib::{AdhkarCatalog, ChapterCoordinator, ClassificationRules, NoorConfig, QuranComSource};
use routes::{create_router, ApiState};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = NoorConfig::load();

    let upstream = Arc::new(
        QuranComSource::new(&config.upstream_base_url, config.fetch_timeout())
            .context("Failed to create upstream client")?,
    );
    let rules = ClassificationRules::default().with_policy(config.unmarked_policy);
    let catalog = match &config.adhkar_path {
        Some(path) => AdhkarCatalog::from_path(path, rules),
        None => AdhkarCatalog::embedded(rules),
    };
    // Fail at startup rather than on the first request.
    catalog.collections().context("Failed to load adhkar dataset")?;

    let state = Arc::new(ApiState {
        chapters: ChapterCoordinator::new(upstream.clone(), config.fetch_timeout()),
        commentary: upstream,
        commentary_timeout: config.commentary_timeout(),
        catalog,
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.api_bind.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.api_bind))?;
    tracing::info!("Listening on http://{}", config.api_bind);
    axum::serve(listener, app).await?;

    Ok(())
}
