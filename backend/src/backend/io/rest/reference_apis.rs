//! # REST API for Reference Data
//!
//! Academic years, funds, institute metadata and permission lookups. All
//! read-only; the dashboard fetches these once per screen.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::{error, info};

use crate::backend::io::rest::acting_group;
use crate::backend::AppState;
use shared::PermissionQuery;

/// Create a router for reference data APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/academic-years", get(list_academic_years))
        .route("/funds", get(list_funds))
        .route("/institute", get(get_institute))
        .route("/permissions", get(list_permissions))
}

pub async fn list_academic_years(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/academic-years");

    match state.reference_service.list_academic_years().await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list academic years: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn list_funds(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/funds");

    match state.reference_service.list_funds().await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list funds: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn get_institute(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/institute");

    match state.reference_service.get_institute().await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to load institute metadata: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Codenames for a group, defaulting to the acting group, so the dashboard
/// can decide which controls to render.
pub async fn list_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PermissionQuery>,
) -> impl IntoResponse {
    let group = query.group.unwrap_or_else(|| acting_group(&headers));
    info!("GET /api/permissions - group: {}", group);

    match state.permission_service.list_permissions(&group).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list permissions: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
