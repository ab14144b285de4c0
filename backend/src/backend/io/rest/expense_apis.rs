//! # REST API for Expense Items

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
use shared::{CreateExpenseRequest, LedgerListQuery, UpdateExpenseRequest};

pub(crate) fn ledger_error_status(message: &str) -> StatusCode {
    if message.contains("not found") {
        StatusCode::NOT_FOUND
    } else if message.contains("cannot be empty")
        || message.contains("must be positive")
        || message.contains("too long")
        || message.contains("decimal places")
        || message.contains("exceeds the maximum")
        || message.contains("Invalid date")
        || message.contains("Unknown fund")
    {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Create a router for expense APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/:expense_id", put(update_expense).delete(delete_expense))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LedgerListQuery>,
) -> impl IntoResponse {
    info!("GET /api/expenses - year: {}", query.academic_year);

    if let Err(response) = require_permission(&state, &headers, "view_expense").await {
        return response;
    }

    match state.expense_service.list_expenses(&query.academic_year).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list expenses: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn create_expense(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateExpenseRequest>,
) -> impl IntoResponse {
    info!("POST /api/expenses - request: {:?}", request);

    if let Err(response) = require_permission(&state, &headers, "add_expense").await {
        return response;
    }

    match state.expense_service.create_expense(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to create expense: {}", e);
            (ledger_error_status(&e.to_string()), e.to_string()).into_response()
        }
    }
}

pub async fn update_expense(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(expense_id): Path<String>,
    Query(query): Query<YearQuery>,
    Json(request): Json<UpdateExpenseRequest>,
) -> impl IntoResponse {
    info!("PUT /api/expenses/{} - request: {:?}", expense_id, request);

    if let Err(response) = require_permission(&state, &headers, "change_expense").await {
        return response;
    }

    match state
        .expense_service
        .update_expense(&query.academic_year, &expense_id, request)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to update expense: {}", e);
            (ledger_error_status(&e.to_string()), e.to_string()).into_response()
        }
    }
}

pub async fn delete_expense(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(expense_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    info!("DELETE /api/expenses/{}", expense_id);

    if let Err(response) = require_permission(&state, &headers, "delete_expense").await {
        return response;
    }

    match state
        .expense_service
        .delete_expense(&query.academic_year, &expense_id)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to delete expense: {}", e);
            (ledger_error_status(&e.to_string()), e.to_string()).into_response()
        }
    }
}
