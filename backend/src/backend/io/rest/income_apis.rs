//! # REST API for Income Items

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use log::{error, info};

use crate::backend::io::rest::expense_apis::ledger_error_status;
use crate::backend::io::rest::{require_permission, YearQuery};
use crate::backend::AppState;
use shared::{CreateIncomeRequest, LedgerListQuery, UpdateIncomeRequest};

/// Create a router for income APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_incomes).post(create_income))
        .route("/:income_id", put(update_income).delete(delete_income))
}

pub async fn list_incomes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LedgerListQuery>,
) -> impl IntoResponse {
    info!("GET /api/incomes - year: {}", query.academic_year);

    if let Err(response) = require_permission(&state, &headers, "view_income").await {
        return response;
    }

    match state.income_service.list_incomes(&query.academic_year).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list incomes: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn create_income(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateIncomeRequest>,
) -> impl IntoResponse {
    info!("POST /api/incomes - request: {:?}", request);

    if let Err(response) = require_permission(&state, &headers, "add_income").await {
        return response;
    }

    match state.income_service.create_income(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to create income: {}", e);
            (ledger_error_status(&e.to_string()), e.to_string()).into_response()
        }
    }
}

pub async fn update_income(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(income_id): Path<String>,
    Query(query): Query<YearQuery>,
    Json(request): Json<UpdateIncomeRequest>,
) -> impl IntoResponse {
    info!("PUT /api/incomes/{} - request: {:?}", income_id, request);

    if let Err(response) = require_permission(&state, &headers, "change_income").await {
        return response;
    }

    match state
        .income_service
        .update_income(&query.academic_year, &income_id, request)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to update income: {}", e);
            (ledger_error_status(&e.to_string()), e.to_string()).into_response()
        }
    }
}

pub async fn delete_income(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(income_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    info!("DELETE /api/incomes/{}", income_id);

    if let Err(response) = require_permission(&state, &headers, "delete_income").await {
        return response;
    }

    match state
        .income_service
        .delete_income(&query.academic_year, &income_id)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to delete income: {}", e);
            (ledger_error_status(&e.to_string()), e.to_string()).into_response()
        }
    }
}
