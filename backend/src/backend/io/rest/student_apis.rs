//! # REST API for Student Lookup
//!
//! Resolves the student record for a login user before a collection screen
//! opens. Read-only reference data, no permission gate.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::{error, info};

use crate::backend::AppState;
use shared::StudentLookupQuery;

/// Create a router for student APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/lookup", get(lookup_student))
}

pub async fn lookup_student(
    State(state): State<AppState>,
    Query(query): Query<StudentLookupQuery>,
) -> impl IntoResponse {
    info!("GET /api/students/lookup - user_id: {}", query.user_id);

    match state.reference_service.lookup_student(&query.user_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to look up student: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
