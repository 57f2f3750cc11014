mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use crate::services::image_store::LocalImageStore;
use crate::services::scrape::HttpScraper;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "insightboard failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::AppConfig::from_env()?;

    let pool = db::init_pool(&cfg.database_url, cfg.db_max_connections).await?;
    let scraper = HttpScraper::new(&cfg.scrape_user_agent, cfg.scrape_timeouts)?;
    let images = LocalImageStore::new(cfg.image_root.clone(), cfg.image_public_base.clone());

    if cfg.dev_auth_bypass {
        tracing::warn!("DEV_AUTH_BYPASS enabled: /api/dev/session issues sessions without login");
    }

    let state = state::AppState::new(pool, Arc::new(scraper), Arc::new(images), cfg.access)
        .with_dev_auth_bypass(cfg.dev_auth_bypass)
        .with_cookie_secure(cfg.cookie_secure);

    let app = routes::app(state, &cfg.image_root, &cfg.image_public_base);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port)).await?;

    tracing::info!(port = cfg.port, image_root = %cfg.image_root.display(), "insightboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}
