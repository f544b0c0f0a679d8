use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use todo_api::{AppConfig, AppState, create_router};
use todo_auth::{PasswordService, TokenService};
use todo_common::{health_check, init_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting todo list API");

    let config = AppConfig::from_env()?;
    if config.jwt.uses_insecure_secret() {
        warn!("SECRET_KEY is not set; using the insecure development secret");
    }

    // Initialize database connection pool
    let pool = init_pool(&config.database).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let applied = run_migrations(&pool).await?;
    info!("Database schema ready ({} migrations applied)", applied);

    let passwords = PasswordService::select(config.hasher.candidates())?;
    let tokens = TokenService::new(config.jwt.clone());

    let app = create_router(AppState::new(pool, tokens, passwords), &config.cors_origins);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Todo list API listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Todo list API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
