//! Smart City VLAN Manager
//!
//! Assigns IoT devices to network segments ("VLANs") from their streaming
//! telemetry, using an administrator-editable threshold rule set.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    VLAN MANAGER                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │  API      │  │  Ingest       │  │  History Writer     │ │
//! │  │  (Axum)   │  │  Worker       │  │  (Background Task)  │ │
//! │  └─────┬─────┘  └───────┬───────┘  └──────────▲──────────┘ │
//! │        └────────────────┼─────────────────────┤            │
//! │                         ▼                     │            │
//! │                  ┌─────────────┐        ┌─────┴─────┐      │
//! │                  │ Coordinator │───────►│  SQLite   │      │
//! │                  └─────────────┘        └───────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Segment assignments are computed values only; no switch is configured.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult, IngestError};
pub use logic::{Coordinator, IngestHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub ingest: IngestHandle,
    /// `None` when persistence is disabled
    pub pool: Option<sqlx::SqlitePool>,
    pub config: Config,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let query_routes = Router::new()
        // Devices
        .route("/api/devices", get(handlers::devices::list))
        .route("/api/devices/:id", get(handlers::devices::get))

        // Assignments
        .route("/api/vlans", get(handlers::vlans::list))
        .route("/api/vlans/:id", get(handlers::vlans::get))
        .route("/assign_vlan", post(handlers::vlans::assign_vlan))
        .route("/api/stats/vlans", get(handlers::vlans::stats))

        // History
        .route("/api/history", get(handlers::history::list));

    let admin_routes = Router::new()
        .route("/api/rules", get(handlers::rules::get).post(handlers::rules::update))
        .route("/api/simulate", post(handlers::simulate::simulate_device))
        .route("/api/ingest", post(handlers::ingest::enqueue));

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(query_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
