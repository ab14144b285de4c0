use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived classification of a fee record based on cumulative payment
/// versus the payable amount. Recomputed on every read; the stored value
/// is a cache refreshed on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeeStatus {
    Unpaid,
    Partial,
    Paid,
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeStatus::Unpaid => write!(f, "UNPAID"),
            FeeStatus::Partial => write!(f, "PARTIAL"),
            FeeStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// Which fee collection screen a request belongs to. Late fees only apply
/// to the current variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeCategory {
    Current,
    Previous,
    Boarding,
}

/// A fee-type definition: a category of chargeable fee with a nominal amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeType {
    /// ID in format "feetype::<epoch_millis>"
    pub id: String,
    pub title: String,
    /// Nominal amount before waiver, late fee and discount
    pub amount: f64,
    /// Fee head this type belongs to; waivers match on this
    pub fee_head_id: String,
    /// Boarding fees are collected on their own screen
    pub is_boarding: bool,
    /// Late fee applied on the current-fees screen only
    pub late_fee: Option<f64>,
    pub academic_year: String,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub updated_at: String,
}

/// A persisted payment instance. Created on first payment, mutated on
/// subsequent partial payments, hard-deleted only via explicit delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    /// ID in format "fee::<epoch_millis>"
    pub id: String,
    pub fee_type_id: String,
    pub student_id: String,
    /// Cumulative amount paid across all payments
    pub amount: f64,
    /// Discount entered at the most recent payment
    pub discount: f64,
    /// Waiver amount resolved at the most recent payment
    pub waiver_amount: f64,
    pub status: FeeStatus,
    pub academic_year: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A grant of a percentage reduction tied to a student, academic year and a
/// set of fee heads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waiver {
    /// ID in format "waiver::<epoch_millis>"
    pub id: String,
    pub student_id: String,
    pub academic_year: String,
    /// Fee heads this waiver applies to
    pub fee_head_ids: Vec<String>,
    /// Percentage reduction, 0..=100
    pub percentage: f64,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Marks a fee type as excluded for a student/year. Excluded fee types never
/// appear in the collectible list regardless of any FeeRecord history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeExclusion {
    /// ID in format "exclusion::<epoch_millis>"
    pub id: String,
    pub student_id: String,
    pub academic_year: String,
    pub fee_type_id: String,
    pub created_at: String,
}

/// An expense item charged against a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// ID in format "expense::<epoch_millis>"
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub fund_id: String,
    /// ISO 8601 date (YYYY-MM-DD)
    pub expense_date: String,
    pub description: String,
    pub academic_year: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An income item credited to a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    /// ID in format "income::<epoch_millis>"
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub fund_id: String,
    /// ISO 8601 date (YYYY-MM-DD)
    pub income_date: String,
    pub description: String,
    pub academic_year: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A student enrolled at the institute. Read-only from this service's
/// perspective; enrollment is owned elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    /// Login user this student record belongs to
    pub user_id: String,
    pub name: String,
    pub class_name: String,
    pub section: String,
    pub roll_no: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: String,
    /// e.g. "2025-2026"
    pub title: String,
    pub is_active: bool,
}

/// An accounting bucket for expenses and incomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Institute metadata used in report headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institute {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Default for Institute {
    fn default() -> Self {
        Self {
            name: "Unnamed Institute".to_string(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fee collection requests/responses
// ---------------------------------------------------------------------------

/// Query for the fee collection table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectibleFeesQuery {
    pub student_id: String,
    pub academic_year: String,
    pub category: FeeCategory,
}

/// One row of the fee collection table with all derived amounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectibleFeeRow {
    pub fee_type: FeeType,
    /// Existing FeeRecord for this student + fee type, if any
    pub record_id: Option<String>,
    pub waiver_amount: f64,
    pub payable_after_waiver: f64,
    /// 0.0 where not applicable (previous/boarding)
    pub late_fee: f64,
    pub total_payable: f64,
    pub previously_paid: f64,
    /// Discount carried on the existing record
    pub discount: f64,
    pub status: FeeStatus,
    pub due_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectibleFeesResponse {
    pub student: Student,
    pub academic_year: String,
    pub category: FeeCategory,
    pub rows: Vec<CollectibleFeeRow>,
}

/// A single selected fee within a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeePayment {
    pub fee_type_id: String,
    /// New amount entered this session
    pub amount: f64,
    /// Discount entered this session, capped at the total payable
    pub discount: f64,
}

/// Batch submission: one create-or-update per selected fee, dispatched in
/// parallel with no atomicity across the batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectFeesRequest {
    pub student_id: String,
    pub academic_year: String,
    pub category: FeeCategory,
    pub payments: Vec<FeePayment>,
}

/// Outcome of one entry in a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeSubmissionOutcome {
    pub fee_type_id: String,
    pub success: bool,
    pub record_id: Option<String>,
    pub status: Option<FeeStatus>,
    pub due_amount: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectFeesResponse {
    pub batch_id: String,
    pub outcomes: Vec<FeeSubmissionOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub success_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeListQuery {
    pub academic_year: String,
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeListResponse {
    pub fees: Vec<FeeRecord>,
}

/// Shared response for delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub success_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateFeeExclusionRequest {
    pub student_id: String,
    pub academic_year: String,
    pub fee_type_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeExclusionResponse {
    pub exclusion: FeeExclusion,
    pub success_message: String,
}

// ---------------------------------------------------------------------------
// Fee catalog requests/responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateFeeTypeRequest {
    pub title: String,
    pub amount: f64,
    pub fee_head_id: String,
    pub is_boarding: bool,
    pub late_fee: Option<f64>,
    pub academic_year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateFeeTypeRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub late_fee: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeTypeResponse {
    pub fee_type: FeeType,
    pub success_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeTypeListQuery {
    pub academic_year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeTypeListResponse {
    pub fee_types: Vec<FeeType>,
}

// ---------------------------------------------------------------------------
// Waiver requests/responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateWaiverRequest {
    pub student_id: String,
    pub academic_year: String,
    pub fee_head_ids: Vec<String>,
    pub percentage: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateWaiverRequest {
    pub fee_head_ids: Option<Vec<String>>,
    pub percentage: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaiverResponse {
    pub waiver: Waiver,
    pub success_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaiverListQuery {
    pub academic_year: String,
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaiverListResponse {
    pub waivers: Vec<Waiver>,
}

// ---------------------------------------------------------------------------
// Ledger (expense/income) requests/responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateExpenseRequest {
    pub title: String,
    pub amount: f64,
    pub fund_id: String,
    pub expense_date: String,
    pub description: String,
    pub academic_year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateExpenseRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub fund_id: Option<String>,
    pub expense_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseResponse {
    pub expense: Expense,
    pub success_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateIncomeRequest {
    pub title: String,
    pub amount: f64,
    pub fund_id: String,
    pub income_date: String,
    pub description: String,
    pub academic_year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateIncomeRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub fund_id: Option<String>,
    pub income_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeResponse {
    pub income: Income,
    pub success_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeListResponse {
    pub incomes: Vec<Income>,
}

/// Query shared by the year-scoped ledger listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerListQuery {
    pub academic_year: String,
}

/// Validation errors for expense/income/payment form input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LedgerValidationError {
    EmptyTitle,
    TitleTooLong(usize),
    AmountNotPositive,
    AmountTooLarge(f64),
    AmountPrecisionTooHigh,
    InvalidDate(String),
    UnknownFund(String),
}

/// Form validation result for ledger input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormValidation {
    pub is_valid: bool,
    pub errors: Vec<LedgerValidationError>,
}

// ---------------------------------------------------------------------------
// Reference data and permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentLookupQuery {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentLookupResponse {
    pub student: Option<Student>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcademicYearListResponse {
    pub academic_years: Vec<AcademicYear>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundListResponse {
    pub funds: Vec<Fund>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstituteResponse {
    pub institute: Institute,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionQuery {
    pub group: Option<String>,
}

/// Codenames granted to a user group, consumed by the UI as a membership test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionListResponse {
    pub group: String,
    pub codenames: Vec<String>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeReportQuery {
    pub academic_year: String,
    pub student_id: Option<String>,
    /// "csv" (default) or "print"
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerReportQuery {
    pub academic_year: String,
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Structured record IDs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RecordIdError {
    InvalidFormat,
    InvalidPrefix,
    InvalidTimestamp,
}

impl fmt::Display for RecordIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIdError::InvalidFormat => write!(f, "Invalid record ID format"),
            RecordIdError::InvalidPrefix => write!(f, "Invalid record ID prefix"),
            RecordIdError::InvalidTimestamp => write!(f, "Invalid timestamp in record ID"),
        }
    }
}

impl std::error::Error for RecordIdError {}

fn make_id(prefix: &str, epoch_millis: u64) -> String {
    format!("{}::{}", prefix, epoch_millis)
}

fn parse_prefixed_id(prefix: &str, id: &str) -> Result<u64, RecordIdError> {
    let parts: Vec<&str> = id.split("::").collect();
    if parts.len() != 2 {
        return Err(RecordIdError::InvalidFormat);
    }
    if parts[0] != prefix {
        return Err(RecordIdError::InvalidPrefix);
    }
    parts[1]
        .parse::<u64>()
        .map_err(|_| RecordIdError::InvalidTimestamp)
}

macro_rules! record_id {
    ($type:ty, $prefix:literal) => {
        impl $type {
            /// Generate an ID from an epoch-millis timestamp.
            pub fn generate_id(epoch_millis: u64) -> String {
                make_id($prefix, epoch_millis)
            }

            /// Parse an ID back into its timestamp for sorting.
            pub fn parse_id(id: &str) -> Result<u64, RecordIdError> {
                parse_prefixed_id($prefix, id)
            }
        }
    };
}

record_id!(FeeType, "feetype");
record_id!(FeeRecord, "fee");
record_id!(Waiver, "waiver");
record_id!(FeeExclusion, "exclusion");
record_id!(Expense, "expense");
record_id!(Income, "income");

/// Validate an ISO 8601 date string (YYYY-MM-DD).
pub fn is_valid_iso_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
