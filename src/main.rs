use anyhow::Result;
use dashboard::{auth::jwt::JwtValidator, catalog, config::Config, web, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting dashboard service");

    let config = Config::load()?;
    tracing::info!(
        environment = ?config.environment,
        keycloak_realm = %config.keycloak_realm,
        "Configuration loaded"
    );

    let jwt_validator = Arc::new(JwtValidator::new(&config)?);

    // Prefetch so /readyz passes as soon as we listen
    jwt_validator.prefetch_jwks().await?;
    tracing::info!("JWKS prefetched successfully");

    // Logs its own summary; refuses to start on an invalid catalog
    let catalog = catalog::load_catalog(&config.catalog)?;

    let bind_address = config.bind_address();
    let state = Arc::new(AppState {
        catalog: Arc::new(catalog),
        jwt_validator,
        config: Arc::new(config),
    });

    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Dashboard listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
