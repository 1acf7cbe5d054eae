use std::{net::SocketAddr, sync::Arc};

use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use axum_checkout_api::{
    app::build_app,
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    repository::InMemoryStore,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,axum_checkout_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let app = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            run_migrations(&pool).await?;

            let session_store = PostgresStore::new(pool.clone());
            session_store.migrate().await?;

            let orm = create_orm_conn(&pool);
            let state = AppState::postgres(pool, orm, config.pricing);
            build_app(state, session_store, config.secure_cookies)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using the in-memory store; data is lost on exit");
            let state = AppState::in_memory(Arc::new(InMemoryStore::new()), config.pricing);
            build_app(state, MemoryStore::default(), config.secure_cookies)
        }
    };

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
