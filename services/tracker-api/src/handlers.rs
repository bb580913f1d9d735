use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use fleetcore_core::GeoPoint;
use fleetcore_tracking::{
    BusState, BusView, DelayReport, EtaEstimate, FleetSummary, GeofenceResult,
    LocationSubmission, Route, TrackingContext, TrackingError, Trip,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::state::AppState;

/// Tracking error rendered as `{"error": kind, "message": text}`
#[derive(Debug)]
pub struct ApiError(TrackingError);

impl From<TrackingError> for ApiError {
    fn from(err: TrackingError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            TrackingError::InvalidCoordinate { .. } | TrackingError::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            TrackingError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            TrackingError::NotFound(_) | TrackingError::TripNotFound(_) => StatusCode::NOT_FOUND,
            TrackingError::NoActiveTrip(_)
            | TrackingError::TripAlreadyActive { .. }
            | TrackingError::TripNotActive(_) => StatusCode::CONFLICT,
            TrackingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            TrackingError::Internal(detail) => {
                error!(detail = %detail, "internal tracking error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(json!({ "error": self.0.kind(), "message": message })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a call that may block on the external routing provider
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TrackingContext) -> fleetcore_tracking::Result<T> + Send + 'static,
{
    let ctx = Arc::clone(&state.ctx);
    tokio::task::spawn_blocking(move || f(&ctx))
        .await
        .map_err(|e| ApiError(TrackingError::Internal(format!("blocking task failed: {}", e))))?
        .map_err(ApiError)
}

pub async fn list_buses(State(state): State<Arc<AppState>>) -> ApiResult<Vec<BusView>> {
    Ok(Json(state.ctx.broadcast().list()?))
}

pub async fn get_bus(
    State(state): State<Arc<AppState>>,
    Path(bus_id): Path<String>,
) -> ApiResult<BusView> {
    Ok(Json(state.ctx.broadcast().read(&bus_id)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// False when the fix was stale or a duplicate
    pub accepted: bool,
    pub bus: BusState,
}

pub async fn submit_location(
    State(state): State<Arc<AppState>>,
    Path(bus_id): Path<String>,
    Json(submission): Json<LocationSubmission>,
) -> ApiResult<SubmitResponse> {
    let outcome = state.ctx.ingest().submit(&bus_id, &submission)?;
    Ok(Json(SubmitResponse {
        accepted: outcome.is_accepted(),
        bus: outcome.into_state(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PassengersRequest {
    pub count: u32,
}

pub async fn update_passengers(
    State(state): State<Arc<AppState>>,
    Path(bus_id): Path<String>,
    Json(request): Json<PassengersRequest>,
) -> ApiResult<BusState> {
    Ok(Json(
        state
            .ctx
            .registry()
            .update_passengers(&bus_id, request.count)?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct GeofenceQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
}

pub async fn bus_geofence(
    State(state): State<Arc<AppState>>,
    Path(bus_id): Path<String>,
    Query(query): Query<GeofenceQuery>,
) -> ApiResult<GeofenceResult> {
    let center = GeoPoint::new(query.lat, query.lng).map_err(TrackingError::from)?;
    Ok(Json(state.ctx.bus_geofence(&bus_id, &center, query.radius)?))
}

pub async fn bus_eta(
    State(state): State<Arc<AppState>>,
    Path((bus_id, stop_id)): Path<(String, String)>,
) -> ApiResult<EtaEstimate> {
    let estimate = blocking(&state, move |ctx| ctx.eta_to_stop(&bus_id, &stop_id)).await?;
    Ok(Json(estimate))
}

pub async fn stop_arrival(
    State(state): State<Arc<AppState>>,
    Path((bus_id, stop_id)): Path<(String, String)>,
) -> ApiResult<GeofenceResult> {
    Ok(Json(state.ctx.stop_arrival(&bus_id, &stop_id)?))
}

pub async fn active_trip(
    State(state): State<Arc<AppState>>,
    Path(bus_id): Path<String>,
) -> ApiResult<Trip> {
    let trip = state
        .ctx
        .trips()
        .active_trip(&bus_id)?
        .ok_or_else(|| TrackingError::NotFound(format!("active trip of bus {}", bus_id)))?;
    Ok(Json(trip))
}

pub async fn fleet_summary(State(state): State<Arc<AppState>>) -> ApiResult<FleetSummary> {
    Ok(Json(state.ctx.broadcast().summary()?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTripRequest {
    pub bus_id: String,
    pub driver_id: String,
}

pub async fn start_trip(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartTripRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let trip_id = state
        .ctx
        .trips()
        .start_trip(&request.bus_id, &request.driver_id)?;
    Ok((StatusCode::CREATED, Json(json!({ "tripId": trip_id }))))
}

pub async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> ApiResult<Trip> {
    Ok(Json(state.ctx.trips().trip(&trip_id)?))
}

pub async fn end_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> ApiResult<Trip> {
    Ok(Json(state.ctx.trips().end_trip(&trip_id)?))
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

pub async fn report_delay(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<DelayReport> {
    Ok(Json(
        state.ctx.trips().report_delay(&trip_id, &request.reason)?,
    ))
}

pub async fn report_breakdown(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<DelayReport> {
    Ok(Json(
        state
            .ctx
            .trips()
            .report_breakdown(&trip_id, &request.reason)?,
    ))
}

pub async fn resume_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> ApiResult<Trip> {
    Ok(Json(state.ctx.trips().resume(&trip_id)?))
}

pub async fn trip_reports(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> ApiResult<Vec<DelayReport>> {
    Ok(Json(state.ctx.trips().delay_reports(&trip_id)?))
}

#[derive(Debug, Deserialize)]
pub struct EtaRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

pub async fn estimate_eta(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EtaRequest>,
) -> ApiResult<EtaEstimate> {
    let estimate = blocking(&state, move |ctx| {
        ctx.estimate_eta(&request.origin, &request.destination)
    })
    .await?;
    Ok(Json(estimate))
}

pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<String>,
) -> ApiResult<Route> {
    Ok(Json(state.ctx.routes().route(&route_id)?.clone()))
}
