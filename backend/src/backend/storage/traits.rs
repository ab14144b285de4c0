//! # Storage Traits
//!
//! Abstraction over the persistence layer so the domain services can work
//! against any storage backend. The shipped implementation is CSV/YAML files
//! under a data directory; the traits keep that swappable.

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    AcademicYear, Expense, FeeExclusion, FeeRecord, FeeType, Fund, Income, Institute, Student,
    Waiver,
};

/// Fee record persistence. Records are scoped to an academic year.
#[async_trait]
pub trait FeeStorage: Send + Sync {
    /// Store a new fee record
    async fn store_fee(&self, fee: &FeeRecord) -> Result<()>;

    /// Retrieve a specific fee record by ID
    async fn get_fee(&self, academic_year: &str, fee_id: &str) -> Result<Option<FeeRecord>>;

    /// Find the record for a student + fee type, used for create-or-update
    async fn find_fee(
        &self,
        academic_year: &str,
        student_id: &str,
        fee_type_id: &str,
    ) -> Result<Option<FeeRecord>>;

    /// List fee records, optionally restricted to one student
    async fn list_fees(
        &self,
        academic_year: &str,
        student_id: Option<&str>,
    ) -> Result<Vec<FeeRecord>>;

    /// Update an existing fee record
    async fn update_fee(&self, fee: &FeeRecord) -> Result<()>;

    /// Delete a fee record. Returns true if it was found and deleted.
    async fn delete_fee(&self, academic_year: &str, fee_id: &str) -> Result<bool>;
}

/// Fee type catalog persistence.
#[async_trait]
pub trait FeeTypeStorage: Send + Sync {
    async fn store_fee_type(&self, fee_type: &FeeType) -> Result<()>;

    async fn get_fee_type(&self, fee_type_id: &str) -> Result<Option<FeeType>>;

    /// List fee types for an academic year
    async fn list_fee_types(&self, academic_year: &str) -> Result<Vec<FeeType>>;

    async fn update_fee_type(&self, fee_type: &FeeType) -> Result<()>;

    async fn delete_fee_type(&self, fee_type_id: &str) -> Result<bool>;
}

/// Waiver persistence.
#[async_trait]
pub trait WaiverStorage: Send + Sync {
    async fn store_waiver(&self, waiver: &Waiver) -> Result<()>;

    async fn get_waiver(&self, academic_year: &str, waiver_id: &str) -> Result<Option<Waiver>>;

    /// List waivers in stored order, optionally restricted to one student.
    /// Order matters: waiver resolution takes the first matching grant.
    async fn list_waivers(
        &self,
        academic_year: &str,
        student_id: Option<&str>,
    ) -> Result<Vec<Waiver>>;

    async fn update_waiver(&self, waiver: &Waiver) -> Result<()>;

    async fn delete_waiver(&self, academic_year: &str, waiver_id: &str) -> Result<bool>;
}

/// Fee exclusion persistence (a fee type marked deleted for a student/year).
#[async_trait]
pub trait ExclusionStorage: Send + Sync {
    async fn store_exclusion(&self, exclusion: &FeeExclusion) -> Result<()>;

    async fn list_exclusions(
        &self,
        academic_year: &str,
        student_id: &str,
    ) -> Result<Vec<FeeExclusion>>;

    /// Whether a fee type is excluded for a student/year
    async fn is_excluded(
        &self,
        academic_year: &str,
        student_id: &str,
        fee_type_id: &str,
    ) -> Result<bool>;

    async fn delete_exclusion(&self, academic_year: &str, exclusion_id: &str) -> Result<bool>;
}

/// Expense item persistence.
#[async_trait]
pub trait ExpenseStorage: Send + Sync {
    async fn store_expense(&self, expense: &Expense) -> Result<()>;

    async fn get_expense(&self, academic_year: &str, expense_id: &str)
        -> Result<Option<Expense>>;

    async fn list_expenses(&self, academic_year: &str) -> Result<Vec<Expense>>;

    async fn update_expense(&self, expense: &Expense) -> Result<()>;

    async fn delete_expense(&self, academic_year: &str, expense_id: &str) -> Result<bool>;
}

/// Income item persistence.
#[async_trait]
pub trait IncomeStorage: Send + Sync {
    async fn store_income(&self, income: &Income) -> Result<()>;

    async fn get_income(&self, academic_year: &str, income_id: &str) -> Result<Option<Income>>;

    async fn list_incomes(&self, academic_year: &str) -> Result<Vec<Income>>;

    async fn update_income(&self, income: &Income) -> Result<()>;

    async fn delete_income(&self, academic_year: &str, income_id: &str) -> Result<bool>;
}

/// Read-only reference data: academic years, funds, students.
#[async_trait]
pub trait ReferenceStorage: Send + Sync {
    async fn list_academic_years(&self) -> Result<Vec<AcademicYear>>;

    /// The academic year flagged active, if any
    async fn get_active_academic_year(&self) -> Result<Option<AcademicYear>>;

    async fn list_funds(&self) -> Result<Vec<Fund>>;

    async fn get_student(&self, student_id: &str) -> Result<Option<Student>>;

    async fn find_student_by_user_id(&self, user_id: &str) -> Result<Option<Student>>;
}

/// Institute metadata for report headers.
#[async_trait]
pub trait InstituteStorage: Send + Sync {
    async fn get_institute(&self) -> Result<Institute>;
}

/// Permission sets per user group.
#[async_trait]
pub trait PermissionStorage: Send + Sync {
    /// Codenames granted to a group; empty when the group is unknown
    async fn codenames_for_group(&self, group: &str) -> Result<Vec<String>>;
}
