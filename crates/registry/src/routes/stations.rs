use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use time::OffsetDateTime;

use crate::{AppState, Listing, StatusReply};

#[utoipa::path(
    get,
    path = "/api/stations",
    responses(
        (status = OK, description = "Stations seen within the retention window, newest record per station_url", body = Listing)
    ))]
pub async fn active_stations(State(state): State<Arc<AppState>>) -> Json<Listing> {
    Json(state.listing.collect(OffsetDateTime::now_utc()).await)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = OK, description = "Station database reachable", content_type = "text/plain", body = String),
        (status = SERVICE_UNAVAILABLE, description = "Station database unreachable", content_type = "text/plain", body = String)
    ))]
pub async fn health(State(state): State<Arc<AppState>>) -> StatusReply {
    match state.store.health_check().await {
        Ok(()) => match state.store.count_stations().await {
            Ok(count) => StatusReply::ok(format!("{} stations registered", count)),
            Err(e) => StatusReply::fail(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        },
        Err(e) => StatusReply::fail(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}
