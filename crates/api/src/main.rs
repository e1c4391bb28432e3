use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitevault_api::config::{ServerConfig, StoreBackend};
use sitevault_api::notifications::NotificationRouter;
use sitevault_api::router::build_app_router;
use sitevault_api::state::AppState;
use sitevault_core::engine::SnapshotEngine;
use sitevault_core::store::{MemorySnapshotStore, SnapshotStore};
use sitevault_events::EventBus;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "sitevault_api=debug,sitevault_core=info,sitevault_db=info,sitevault_events=info,tower_http=debug"
            .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Snapshot store ---
    let store: Arc<dyn SnapshotStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = sitevault_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            sitevault_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            sitevault_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(sitevault_db::PgSnapshotStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory snapshot store; snapshots are lost on restart");
            Arc::new(MemorySnapshotStore::new())
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let router_handle = tokio::spawn(NotificationRouter::run(event_bus.subscribe()));
    tracing::info!("Event bus and notification router started");

    // --- Engine ---
    let engine = SnapshotEngine::new(store)
        .with_notifier(Arc::clone(&event_bus) as _)
        .with_config(config.engine);
    tracing::info!(
        max_allocation_attempts = config.engine.max_allocation_attempts,
        "Snapshot engine ready"
    );

    // --- App state ---
    let state = AppState {
        engine: Arc::new(engine),
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Every handler has finished, so the router's state (and the engine's
    // notifier handle) is gone. Dropping the last bus handle closes the
    // channel and ends the notification router.
    drop(event_bus);
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, router_handle).await {
        Ok(Ok(raised)) => tracing::info!(raised, "Notification router stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Notification router task failed"),
        Err(_) => tracing::warn!("Notification router did not stop in time"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
