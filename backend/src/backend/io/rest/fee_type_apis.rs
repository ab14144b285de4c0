//! # REST API for the Fee Type Catalog

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::{error, info};

use crate::backend::io::rest::require_permission;
use crate::backend::AppState;
use shared::{CreateFeeTypeRequest, FeeTypeListQuery, UpdateFeeTypeRequest};

/// Create a router for fee type APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_fee_types).post(create_fee_type))
        .route("/:fee_type_id", axum::routing::put(update_fee_type).delete(delete_fee_type))
}

pub async fn list_fee_types(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FeeTypeListQuery>,
) -> impl IntoResponse {
    info!("GET /api/fee-types - year: {}", query.academic_year);

    if let Err(response) = require_permission(&state, &headers, "view_feetype").await {
        return response;
    }

    match state
        .fee_catalog_service
        .list_fee_types(&query.academic_year)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list fee types: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn create_fee_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateFeeTypeRequest>,
) -> impl IntoResponse {
    info!("POST /api/fee-types - request: {:?}", request);

    if let Err(response) = require_permission(&state, &headers, "add_feetype").await {
        return response;
    }

    match state.fee_catalog_service.create_fee_type(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to create fee type: {}", e);
            let status = if e.to_string().contains("cannot be empty")
                || e.to_string().contains("must be positive")
                || e.to_string().contains("must not be negative")
            {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

pub async fn update_fee_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(fee_type_id): Path<String>,
    Json(request): Json<UpdateFeeTypeRequest>,
) -> impl IntoResponse {
    info!("PUT /api/fee-types/{} - request: {:?}", fee_type_id, request);

    if let Err(response) = require_permission(&state, &headers, "change_feetype").await {
        return response;
    }

    match state
        .fee_catalog_service
        .update_fee_type(&fee_type_id, request)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to update fee type: {}", e);
            let status = if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else if e.to_string().contains("cannot be empty")
                || e.to_string().contains("must be positive")
                || e.to_string().contains("must not be negative")
            {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

pub async fn delete_fee_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(fee_type_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/fee-types/{}", fee_type_id);

    if let Err(response) = require_permission(&state, &headers, "delete_feetype").await {
        return response;
    }

    match state.fee_catalog_service.delete_fee_type(&fee_type_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to delete fee type: {}", e);
            let status = if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}
