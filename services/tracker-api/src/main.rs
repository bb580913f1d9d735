use axum::{
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

mod config;
mod handlers;
mod state;

use config::Config;
use state::AppState;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    fleetcore_core::logging::init_with(config.log_format);

    // Built before the runtime starts and dropped after it stops
    let state = Arc::new(AppState::new(&config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(config.port, Arc::clone(&state)));
    drop(runtime);
    drop(state);
    result
}

async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Tracker API listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Tracker API stopped");
    Ok(())
}

pub(crate) fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/buses", get(handlers::list_buses))
        .route("/buses/:bus_id", get(handlers::get_bus))
        .route("/buses/:bus_id/location", post(handlers::submit_location))
        .route("/buses/:bus_id/passengers", put(handlers::update_passengers))
        .route("/buses/:bus_id/geofence", get(handlers::bus_geofence))
        .route("/buses/:bus_id/eta/:stop_id", get(handlers::bus_eta))
        .route("/buses/:bus_id/arrival/:stop_id", get(handlers::stop_arrival))
        .route("/buses/:bus_id/trip", get(handlers::active_trip))
        .route("/fleet/summary", get(handlers::fleet_summary))
        .route("/trips", post(handlers::start_trip))
        .route("/trips/:trip_id", get(handlers::get_trip))
        .route("/trips/:trip_id/end", post(handlers::end_trip))
        .route("/trips/:trip_id/delay", post(handlers::report_delay))
        .route("/trips/:trip_id/breakdown", post(handlers::report_breakdown))
        .route("/trips/:trip_id/resume", post(handlers::resume_trip))
        .route("/trips/:trip_id/reports", get(handlers::trip_reports))
        .route("/eta", post(handlers::estimate_eta))
        .route("/routes/:route_id", get(handlers::get_route))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "tracker-api",
        "timestamp": Utc::now().to_rfc3339()
    })))
}
