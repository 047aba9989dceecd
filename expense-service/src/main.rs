use expense_service::{
    build_router,
    config::ExpenseConfig,
    db,
    middleware::auth::IdentityVerifier,
    services::{Database, MockEmailService, SmtpEmailService},
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    dotenvy::dotenv().ok();

    // Load configuration - fail fast if invalid
    let config = ExpenseConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting expense service"
    );

    // Database
    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    let database = Database::new(pool);

    // Identity provider public key
    let pem = std::fs::read(&config.auth.public_key_path)?;
    let verifier = IdentityVerifier::from_pem(&pem)?;
    tracing::info!("Identity verifier initialized");

    // Email provider; the mock is used when SMTP is disabled so dev
    // environments never send real mail
    let email: Arc<dyn expense_service::services::EmailProvider> = if config.smtp.enabled {
        Arc::new(SmtpEmailService::new(
            config.smtp.clone(),
            config.email.treasury_email.clone(),
        )?)
    } else {
        tracing::warn!("SMTP disabled, expense emails will only be logged");
        Arc::new(MockEmailService::new())
    };

    let state = AppState {
        config: config.clone(),
        db: database,
        email,
        verifier,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
