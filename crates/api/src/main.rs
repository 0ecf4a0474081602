use std::sync::Arc;

use anyhow::Context;

use shoplab_api::app::{self, services::AppServices};
use shoplab_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shoplab_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;

    let services = AppServices::connect(&config.db)
        .await
        .context("failed to open database")?;
    let app = app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
