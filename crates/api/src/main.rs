use std::sync::Arc;

use anyhow::Context;

use teamgate_api::{app, config::ApiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    teamgate_observability::init();

    let config = ApiConfig::from_env();
    if config.environment.is_development() {
        tracing::warn!("development environment: dev-bypass requirements admit anonymous requests");
    }

    let (services, directory) = app::services::build_in_memory_services(&config);
    tracing::info!(accounts = directory.len(), "account directory ready");
    if directory.is_empty() {
        tracing::warn!("no accounts seeded; set SEED_ACCOUNTS to enable login and refresh");
    }
    let app = app::build_app(Arc::new(services)).context("invalid route requirements")?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
