//! DocStream server binary.

use std::sync::Arc;

use docstream::adapters::{
    app_router, CollaborationServices, Hub, InMemoryDocumentRepository,
    PostgresDocumentRepository, WebSocketState,
};
use docstream::application::StorageDeadline;
use docstream::config::AppConfig;
use docstream::ports::DocumentRepository;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let repository: Arc<dyn DocumentRepository> = match &config.database {
        Some(database) => {
            let pool = database.pool_options().connect(&database.url).await?;
            let repository = PostgresDocumentRepository::new(pool);
            if database.run_migrations {
                repository.migrate().await?;
                tracing::info!("Database migrations applied");
            }
            Arc::new(repository)
        }
        None => {
            tracing::warn!("No database configured, documents are kept in memory");
            Arc::new(InMemoryDocumentRepository::new())
        }
    };

    let deadline = StorageDeadline::from_secs(config.realtime.operation_timeout_secs);
    let services = CollaborationServices::new(repository, deadline);
    let hub = Arc::new(Hub::new(services, config.realtime.inbound_capacity));

    if let Some(interval) = config.realtime.room_reap_interval() {
        hub.spawn_reaper(interval);
    }

    let state = WebSocketState::new(hub, config.realtime.outbound_capacity);
    let app = app_router(state, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "DocStream listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("DocStream stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
