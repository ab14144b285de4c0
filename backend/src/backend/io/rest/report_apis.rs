//! # REST API for Reports
//!
//! Each report is served either as a CSV download or as a printable HTML
//! document (`format=print`) that opens the browser's print dialog.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use log::{error, info};

use crate::backend::domain::report_service::ReportDocument;
use crate::backend::io::rest::require_permission;
use crate::backend::AppState;
use shared::{FeeReportQuery, LedgerReportQuery};

/// Create a router for report APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fees", get(fee_report))
        .route("/expenses", get(expense_report))
        .route("/incomes", get(income_report))
}

fn wants_print(format: &Option<String>) -> bool {
    format.as_deref() == Some("print")
}

fn csv_download(document: ReportDocument) -> axum::response::Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        document.content,
    )
        .into_response()
}

pub async fn fee_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FeeReportQuery>,
) -> impl IntoResponse {
    info!("GET /api/reports/fees - query: {:?}", query);

    if let Err(response) = require_permission(&state, &headers, "view_report").await {
        return response;
    }

    if wants_print(&query.format) {
        match state.report_service.fee_report_html(&query).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("Failed to build fee report: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    } else {
        match state.report_service.fee_report_csv(&query).await {
            Ok(document) => csv_download(document),
            Err(e) => {
                error!("Failed to build fee report: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}

pub async fn expense_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LedgerReportQuery>,
) -> impl IntoResponse {
    info!("GET /api/reports/expenses - query: {:?}", query);

    if let Err(response) = require_permission(&state, &headers, "view_report").await {
        return response;
    }

    if wants_print(&query.format) {
        match state
            .report_service
            .expense_report_html(&query.academic_year)
            .await
        {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("Failed to build expense report: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    } else {
        match state
            .report_service
            .expense_report_csv(&query.academic_year)
            .await
        {
            Ok(document) => csv_download(document),
            Err(e) => {
                error!("Failed to build expense report: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}

pub async fn income_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LedgerReportQuery>,
) -> impl IntoResponse {
    info!("GET /api/reports/incomes - query: {:?}", query);

    if let Err(response) = require_permission(&state, &headers, "view_report").await {
        return response;
    }

    if wants_print(&query.format) {
        match state
            .report_service
            .income_report_html(&query.academic_year)
            .await
        {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("Failed to build income report: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    } else {
        match state
            .report_service
            .income_report_csv(&query.academic_year)
            .await
        {
            Ok(document) => csv_download(document),
            Err(e) => {
                error!("Failed to build income report: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}
