mod archive;
mod atproto;
mod bot;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod state;
mod viewer;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::archive::{ArchiveStore, SqliteArchiveStore};
use crate::atproto::{AtpClient, FeedSource};
use crate::bot::{NotificationWalker, PollScheduler, Responder};
use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bookmark bot v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let pool = create_pool(&config.database_url).await?;
    let store: Arc<dyn ArchiveStore> = Arc::new(SqliteArchiveStore::new(pool));

    // Log in to the PDS
    let client = AtpClient::new(config.atproto_service.clone())?;
    let bot_handle = client
        .login(&config.atproto_identifier, &config.atproto_password)
        .await
        .with_context(|| format!("Failed to log in as {}", config.atproto_identifier))?;
    let feed: Arc<dyn FeedSource> = Arc::new(client);

    // Start the notification walker on its own task
    let walker = NotificationWalker::new(
        feed.clone(),
        store.clone(),
        Responder::new(config.domain.clone()),
        config.max_pages_per_cycle,
    );
    tokio::spawn(PollScheduler::new(config.poll_interval).run(walker));

    // Build app state
    let state = AppState {
        feed,
        store,
        bot_handle,
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
