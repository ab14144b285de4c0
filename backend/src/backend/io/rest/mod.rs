//! # REST API Interface Layer
//!
//! HTTP endpoints for the fee tracker, one module per dashboard screen.
//! Handlers are pure translation: permission check, input into the domain
//! layer, domain errors mapped to status codes with the message passed
//! through verbatim (the dashboard surfaces it as a toast).

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use log::warn;
use serde::Deserialize;

use crate::backend::AppState;

pub mod expense_apis;
pub mod fee_collection_apis;
pub mod fee_type_apis;
pub mod income_apis;
pub mod reference_apis;
pub mod report_apis;
pub mod student_apis;
pub mod waiver_apis;

/// Year scoping for path-addressed records (update/delete).
#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub academic_year: String,
}

/// The acting user group, taken from the `x-user-group` header. Requests
/// without one act as admin; identity is owned by the deployment's proxy,
/// this service only does the membership test.
pub(crate) fn acting_group(headers: &HeaderMap) -> String {
    headers
        .get("x-user-group")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("admin")
        .to_string()
}

/// Check one codename for the acting group; a denial becomes a 403 with the
/// message in the body.
pub(crate) async fn require_permission(
    state: &AppState,
    headers: &HeaderMap,
    codename: &str,
) -> Result<(), Response> {
    let group = acting_group(headers);
    state
        .permission_service
        .check(&group, codename)
        .await
        .map_err(|e| {
            warn!("{}", e);
            (StatusCode::FORBIDDEN, e.to_string()).into_response()
        })
}
