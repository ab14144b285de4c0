//! # CSV Storage Backend
//!
//! File-based repositories over the data directory:
//!
//! ```text
//! data/
//! ├── fee_types.csv
//! ├── academic_years.csv
//! ├── funds.csv
//! ├── students.csv
//! ├── institute.yaml
//! ├── permissions.yaml
//! └── {academic_year}/
//!     ├── fees.csv
//!     ├── waivers.csv
//!     ├── exclusions.csv
//!     ├── expenses.csv
//!     └── incomes.csv
//! ```

pub mod connection;
pub mod exclusion_repository;
pub mod expense_repository;
pub mod fee_repository;
pub mod fee_type_repository;
pub mod income_repository;
pub mod institute_repository;
pub mod permission_repository;
pub mod reference_repository;
pub mod waiver_repository;

#[cfg(test)]
pub mod test_utils;

pub use connection::CsvConnection;
pub use exclusion_repository::ExclusionRepository;
pub use expense_repository::ExpenseRepository;
pub use fee_repository::FeeRepository;
pub use fee_type_repository::FeeTypeRepository;
pub use income_repository::IncomeRepository;
pub use institute_repository::InstituteRepository;
pub use permission_repository::PermissionRepository;
pub use reference_repository::ReferenceRepository;
pub use waiver_repository::WaiverRepository;
