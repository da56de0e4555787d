use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use film_match::{
    api::{create_router, AppState},
    bot::BotEngine,
    config::Config,
    db::{self, Store},
    services::{MetadataProvider, TmdbClient},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::create_schema(&pool).await?;

    let provider = TmdbClient::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_url.clone(),
        Duration::from_secs(config.http_timeout_secs),
    )?;

    // The genre catalog rarely changes; one fetch at startup serves every
    // dialogue and caption.
    let genres = provider.genres().await?;
    tracing::info!(genres = genres.len(), "Loaded TMDB genre dictionary");

    let engine = BotEngine::new(
        Store::new(pool),
        Arc::new(provider),
        genres,
        Duration::from_secs(config.session_idle_secs),
    );

    let app = create_router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
