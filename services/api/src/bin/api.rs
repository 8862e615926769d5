//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, LogMailer, SmtpMailer},
    config::Config,
    error::ApiError,
    jobs::JobScheduler,
    web::{app, state::AppState},
};
use attendance_core::{MailService, MemoryStore, RecordStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Record Store & Run Migrations ---
    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(config.store_timeout)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; records are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 3. Initialize the Mail Adapter ---
    let mailer: Arc<dyn MailService> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "Using SMTP relay for reports");
            Arc::new(
                SmtpMailer::new(smtp, config.mail_timeout)
                    .map_err(|e| ApiError::Internal(e.to_string()))?,
            )
        }
        None => {
            warn!("SMTP_HOST is not set; reports will be logged instead of mailed");
            Arc::new(LogMailer)
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(store, mailer, config.clone()));

    // --- 5. Start the Background Jobs ---
    let shutdown = CancellationToken::new();
    let jobs = JobScheduler::new(
        app_state.reporter.clone(),
        app_state.ledger.clone(),
        config.clone(),
    )
    .spawn(shutdown.clone());

    // --- 6. Start the Server ---
    let app = app(app_state);
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    // --- 7. Wait for the Jobs to Wind Down ---
    shutdown.cancel();
    for job in jobs {
        if let Err(e) = job.await {
            warn!(error = %e, "Background job ended abnormally");
        }
    }
    info!("Server stopped");

    Ok(())
}
