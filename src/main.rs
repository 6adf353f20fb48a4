//! Smart City VLAN Manager server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vlan_manager::{
    config::Config,
    create_router, db,
    logic::{self, AssignmentSink, Coordinator, NullSink},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vlan_manager=debug,tower_http=debug".into());
    if config.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("VLAN Manager starting ({})...", config.environment);

    // History sink
    let (pool, sink): (_, Arc<dyn AssignmentSink>) = if config.persist_enabled {
        tracing::info!("Database: {}", config.database_url);
        let pool = db::create_pool(&config.database_url)
            .await
            .context("Failed to create database pool")?;

        tracing::info!("Running database migrations...");
        db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        let (sink, rx) = logic::sink_channel(config.sink_queue_capacity);
        tokio::spawn(logic::run_sink_writer(pool.clone(), rx));
        let sink: Arc<dyn AssignmentSink> = Arc::new(sink);
        (Some(pool), sink)
    } else {
        tracing::info!("Persistence disabled, assignment history is not recorded");
        let sink: Arc<dyn AssignmentSink> = Arc::new(NullSink);
        (None, sink)
    };

    let coordinator = Arc::new(Coordinator::new(sink));

    // Ingest queue, fed by the broker bridge and POST /api/ingest
    let (ingest, rx) = logic::ingest_channel(config.ingest_queue_capacity);
    tokio::spawn(logic::run_ingest_worker(
        coordinator.clone(),
        rx,
        config.mqtt_topic.clone(),
    ));
    tracing::info!("Accepting telemetry on topics matching '{}'", config.mqtt_topic);

    // Build application state
    let state = AppState {
        coordinator,
        ingest,
        pool,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("VLAN Manager stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
