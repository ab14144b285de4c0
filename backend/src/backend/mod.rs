//! # Backend Module
//!
//! Contains all non-UI logic for the fee tracker service.
//!
//! The backend follows a layered architecture:
//! ```text
//! REST clients (the dashboard)
//!     ↓
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (services + reconciliation)
//!     ↓
//! Storage Layer (CSV/YAML files)
//! ```
//!
//! ## Key Responsibilities
//!
//! - Initialize the storage connection and seed first-run data
//! - Wire repositories into the domain services and application state
//! - Set up the REST API router with CORS for the dashboard

pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::backend::domain::{
    ExpenseService, FeeCatalogService, FeeCollectionService, IncomeService, PermissionService,
    ReferenceService, ReportService, WaiverService,
};
use crate::backend::storage::csv::{
    CsvConnection, ExclusionRepository, ExpenseRepository, FeeRepository, FeeTypeRepository,
    IncomeRepository, InstituteRepository, PermissionRepository, ReferenceRepository,
    WaiverRepository,
};

pub use storage::*;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub fee_collection_service: FeeCollectionService,
    pub fee_catalog_service: FeeCatalogService,
    pub waiver_service: WaiverService,
    pub expense_service: ExpenseService,
    pub income_service: IncomeService,
    pub reference_service: ReferenceService,
    pub permission_service: PermissionService,
    pub report_service: ReportService,
}

/// Initialize the backend with the default data directory.
pub async fn initialize_backend() -> Result<AppState> {
    info!("Setting up storage");
    let connection = CsvConnection::new_default()?;
    initialize_with_connection(connection)
}

/// Wire repositories and services for a given storage connection. Used by
/// `initialize_backend` and by tests with a temp-dir connection.
pub fn initialize_with_connection(connection: CsvConnection) -> Result<AppState> {
    let reference_repo = ReferenceRepository::new(connection.clone());
    reference_repo.ensure_academic_year_exists()?;
    reference_repo.ensure_default_fund()?;

    let permission_repo = PermissionRepository::new(connection.clone());
    permission_repo.ensure_defaults()?;

    info!("Setting up domain services");
    let fees: Arc<FeeRepository> = Arc::new(FeeRepository::new(connection.clone()));
    let fee_types: Arc<FeeTypeRepository> = Arc::new(FeeTypeRepository::new(connection.clone()));
    let waivers: Arc<WaiverRepository> = Arc::new(WaiverRepository::new(connection.clone()));
    let exclusions: Arc<ExclusionRepository> =
        Arc::new(ExclusionRepository::new(connection.clone()));
    let expenses: Arc<ExpenseRepository> = Arc::new(ExpenseRepository::new(connection.clone()));
    let incomes: Arc<IncomeRepository> = Arc::new(IncomeRepository::new(connection.clone()));
    let institute: Arc<InstituteRepository> =
        Arc::new(InstituteRepository::new(connection.clone()));
    let reference: Arc<ReferenceRepository> = Arc::new(reference_repo);
    let permissions: Arc<PermissionRepository> = Arc::new(permission_repo);

    let fee_collection_service = FeeCollectionService::new(
        fees.clone(),
        fee_types.clone(),
        waivers.clone(),
        exclusions.clone(),
        reference.clone(),
    );
    let fee_catalog_service = FeeCatalogService::new(fee_types.clone(), exclusions);
    let waiver_service = WaiverService::new(waivers, reference.clone());
    let expense_service = ExpenseService::new(expenses.clone(), reference.clone());
    let income_service = IncomeService::new(incomes.clone(), reference.clone());
    let reference_service = ReferenceService::new(reference.clone(), institute.clone());
    let permission_service = PermissionService::new(permissions);
    let report_service = ReportService::new(
        fees,
        fee_types,
        expenses,
        incomes,
        reference,
        institute,
    );

    info!("Setting up application state");
    Ok(AppState {
        fee_collection_service,
        fee_catalog_service,
        waiver_service,
        expense_service,
        income_service,
        reference_service,
        permission_service,
        report_service,
    })
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    // CORS setup to allow the dashboard to make requests
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api/fees", io::rest::fee_collection_apis::router())
        .nest("/api/fee-types", io::rest::fee_type_apis::router())
        .nest("/api/waivers", io::rest::waiver_apis::router())
        .nest("/api/expenses", io::rest::expense_apis::router())
        .nest("/api/incomes", io::rest::income_apis::router())
        .nest("/api/students", io::rest::student_apis::router())
        .nest("/api/reports", io::rest::report_apis::router())
        .nest("/api", io::rest::reference_apis::router())
        .layer(cors)
        .with_state(app_state)
}
