use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ratings_api::{
    config::{Config, StoreKind},
    db::{create_pool, run_migrations, InMemoryStore, PgStore},
    routes::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = match config.store {
        StoreKind::Postgres => {
            let pool = create_pool(&config.database_url, config.max_db_connections).await?;
            run_migrations(&pool).await?;
            AppState::new(Arc::new(PgStore::new(pool)), &config)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; ratings are lost on restart");
            AppState::new(Arc::new(InMemoryStore::new()), &config)
        }
    };

    tracing::info!(store = state.store.name(), "Rating store ready");

    let app = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
