use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use social_api::auth::AppStateInner;
use social_api::config::Config;
use social_api::router::router;
use social_api::token::TokenService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "social_server=debug,social_api=debug,social_db=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "Loaded configuration");

    let db = social_db::Database::open(&config.db_path)?;
    let tokens = TokenService::new(&config.jwt_secret)?;
    let state = AppStateInner::new(db, tokens);

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Social server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
