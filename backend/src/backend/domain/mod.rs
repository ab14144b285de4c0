//! # Domain Module
//!
//! Business logic for the fee tracker. The services here encapsulate the
//! rules for fee collection, waivers, the expense/income ledger and report
//! generation, independent of the REST layer and the storage backend.
//!
//! ## Module Organization
//!
//! - **reconciliation**: the shared fee calculation (waiver resolution,
//!   payable computation, status derivation) used by every collection screen
//! - **fee_collection_service**: collectible-row assembly and batch
//!   create-or-update submission
//! - **fee_catalog_service**: fee type CRUD and per-student exclusions
//! - **waiver_service**: waiver CRUD
//! - **expense_service** / **income_service**: ledger CRUD with form
//!   validation
//! - **reference_service**: academic years, funds, students, institute
//! - **permission_service**: group membership checks for UI gating
//! - **report_service**: CSV exports and printable HTML documents

pub mod expense_service;
pub mod fee_catalog_service;
pub mod fee_collection_service;
pub mod income_service;
pub mod permission_service;
pub mod reconciliation;
pub mod reference_service;
pub mod report_service;
pub mod waiver_service;

pub use expense_service::*;
pub use fee_catalog_service::*;
pub use fee_collection_service::*;
pub use income_service::*;
pub use permission_service::*;
pub use reference_service::*;
pub use report_service::*;
pub use waiver_service::*;
