//! # REST API for Waiver Management

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use log::{error, info};

use crate::backend::io::rest::{require_permission, YearQuery};
use crate::backend::AppState;
use shared::{CreateWaiverRequest, UpdateWaiverRequest, WaiverListQuery};

/// Create a router for waiver APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_waivers).post(create_waiver))
        .route("/:waiver_id", put(update_waiver).delete(delete_waiver))
}

pub async fn list_waivers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WaiverListQuery>,
) -> impl IntoResponse {
    info!("GET /api/waivers - query: {:?}", query);

    if let Err(response) = require_permission(&state, &headers, "view_waiver").await {
        return response;
    }

    match state.waiver_service.list_waivers(query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list waivers: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn create_waiver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateWaiverRequest>,
) -> impl IntoResponse {
    info!("POST /api/waivers - request: {:?}", request);

    if let Err(response) = require_permission(&state, &headers, "add_waiver").await {
        return response;
    }

    match state.waiver_service.create_waiver(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to create waiver: {}", e);
            let status = if e.to_string().contains("between 0 and 100")
                || e.to_string().contains("at least one fee head")
            {
                StatusCode::BAD_REQUEST
            } else if e.to_string().contains("Student not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

pub async fn update_waiver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(waiver_id): Path<String>,
    Query(query): Query<YearQuery>,
    Json(request): Json<UpdateWaiverRequest>,
) -> impl IntoResponse {
    info!("PUT /api/waivers/{} - request: {:?}", waiver_id, request);

    if let Err(response) = require_permission(&state, &headers, "change_waiver").await {
        return response;
    }

    match state
        .waiver_service
        .update_waiver(&query.academic_year, &waiver_id, request)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to update waiver: {}", e);
            let status = if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else if e.to_string().contains("between 0 and 100")
                || e.to_string().contains("at least one fee head")
            {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

pub async fn delete_waiver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(waiver_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    info!("DELETE /api/waivers/{}", waiver_id);

    if let Err(response) = require_permission(&state, &headers, "delete_waiver").await {
        return response;
    }

    match state
        .waiver_service
        .delete_waiver(&query.academic_year, &waiver_id)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to delete waiver: {}", e);
            let status = if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}
