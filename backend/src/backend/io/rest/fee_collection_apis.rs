//! # REST API for Fee Collection
//!
//! The collectible-fee table, batch submission, fee record listing/deletion
//! and per-student exclusions.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use log::{error, info};

use crate::backend::io::rest::{require_permission, YearQuery};
use crate::backend::AppState;
use shared::{
    CollectFeesRequest, CollectibleFeesQuery, CreateFeeExclusionRequest, FeeListQuery,
};

/// Create a router for fee collection APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_fees))
        .route("/collectible", get(list_collectible_fees))
        .route("/collect", post(collect_fees))
        .route("/:fee_id", delete(delete_fee))
        .route("/exclusions", post(create_exclusion))
        .route("/exclusions/:exclusion_id", delete(revoke_exclusion))
}

/// The fee collection table: eligible fee types with derived amounts
pub async fn list_collectible_fees(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CollectibleFeesQuery>,
) -> impl IntoResponse {
    info!("GET /api/fees/collectible - query: {:?}", query);

    if let Err(response) = require_permission(&state, &headers, "view_feerecord").await {
        return response;
    }

    match state.fee_collection_service.list_collectible_fees(query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to build collectible fee list: {}", e);
            let status = if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

/// Submit a batch of fee payments
pub async fn collect_fees(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CollectFeesRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/fees/collect - student: {}, {} entries",
        request.student_id,
        request.payments.len()
    );

    if let Err(response) = require_permission(&state, &headers, "add_feerecord").await {
        return response;
    }

    match state.fee_collection_service.collect_fees(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to submit fee batch: {}", e);
            let status = if e.to_string().contains("No fees selected") {
                StatusCode::BAD_REQUEST
            } else if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

/// List persisted fee records
pub async fn list_fees(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FeeListQuery>,
) -> impl IntoResponse {
    info!("GET /api/fees - query: {:?}", query);

    if let Err(response) = require_permission(&state, &headers, "view_feerecord").await {
        return response;
    }

    match state.fee_collection_service.list_fees(query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to list fee records: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Hard-delete a fee record
pub async fn delete_fee(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(fee_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    info!("DELETE /api/fees/{}", fee_id);

    if let Err(response) = require_permission(&state, &headers, "delete_feerecord").await {
        return response;
    }

    match state
        .fee_collection_service
        .delete_fee(&query.academic_year, &fee_id)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to delete fee record: {}", e);
            let status = if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

/// Exclude a fee type for a student/year
pub async fn create_exclusion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateFeeExclusionRequest>,
) -> impl IntoResponse {
    info!("POST /api/fees/exclusions - request: {:?}", request);

    if let Err(response) = require_permission(&state, &headers, "delete_feerecord").await {
        return response;
    }

    match state.fee_catalog_service.create_exclusion(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to create exclusion: {}", e);
            let status = if e.to_string().contains("already excluded") {
                StatusCode::CONFLICT
            } else if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

/// Restore an excluded fee type
pub async fn revoke_exclusion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(exclusion_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    info!("DELETE /api/fees/exclusions/{}", exclusion_id);

    if let Err(response) = require_permission(&state, &headers, "delete_feerecord").await {
        return response;
    }

    match state
        .fee_catalog_service
        .revoke_exclusion(&query.academic_year, &exclusion_id)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Failed to revoke exclusion: {}", e);
            let status = if e.to_string().contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::{sample_student, TEST_YEAR};
    use crate::backend::storage::csv::{CsvConnection, ReferenceRepository};
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;
    use shared::{FeeCategory, FeePayment};

    fn setup_test_app_state() -> (tempfile::TempDir, AppState) {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let connection = CsvConnection::new(temp_dir.path()).expect("Failed to init test storage");

        ReferenceRepository::new(connection.clone())
            .store_student(&sample_student("student-1", "user-1", "Asha Rahman"))
            .unwrap();

        let app_state = crate::backend::initialize_with_connection(connection)
            .expect("Failed to build app state");
        (temp_dir, app_state)
    }

    fn headers_for(group: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-group", HeaderValue::from_str(group).unwrap());
        headers
    }

    fn collect_request() -> CollectFeesRequest {
        CollectFeesRequest {
            student_id: "student-1".to_string(),
            academic_year: TEST_YEAR.to_string(),
            category: FeeCategory::Current,
            payments: vec![FeePayment {
                fee_type_id: "feetype::1".to_string(),
                amount: 100.0,
                discount: 0.0,
            }],
        }
    }

    #[tokio::test]
    async fn test_viewer_group_cannot_submit_fees() {
        let (_temp, app_state) = setup_test_app_state();

        let response = collect_fees(
            State(app_state),
            headers_for("viewer"),
            Json(collect_request()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_batch_returns_bad_request() {
        let (_temp, app_state) = setup_test_app_state();

        let mut request = collect_request();
        request.payments.clear();

        let response = collect_fees(State(app_state), headers_for("admin"), Json(request))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_collectible_list_for_unknown_student_is_not_found() {
        let (_temp, app_state) = setup_test_app_state();

        let response = list_collectible_fees(
            State(app_state),
            headers_for("admin"),
            Query(CollectibleFeesQuery {
                student_id: "student-404".to_string(),
                academic_year: TEST_YEAR.to_string(),
                category: FeeCategory::Current,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_group_header_defaults_to_admin() {
        let (_temp, app_state) = setup_test_app_state();

        let response = list_fees(
            State(app_state),
            HeaderMap::new(),
            Query(FeeListQuery {
                academic_year: TEST_YEAR.to_string(),
                student_id: None,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
