//! Test fixtures for the storage and domain tests. Sample records default to
//! the 2025-2026 academic year; tests that need another year mutate the
//! returned value.

use shared::{Expense, FeeRecord, FeeStatus, FeeType, Income, Student, Waiver};

pub const TEST_YEAR: &str = "2025-2026";

pub fn sample_fee_type(
    id: &str,
    fee_head_id: &str,
    amount: f64,
    late_fee: Option<f64>,
) -> FeeType {
    FeeType {
        id: id.to_string(),
        title: "Tuition Fee".to_string(),
        amount,
        fee_head_id: fee_head_id.to_string(),
        is_boarding: false,
        late_fee,
        academic_year: TEST_YEAR.to_string(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

pub fn sample_fee_record(
    id: &str,
    fee_type_id: &str,
    student_id: &str,
    academic_year: &str,
) -> FeeRecord {
    FeeRecord {
        id: id.to_string(),
        fee_type_id: fee_type_id.to_string(),
        student_id: student_id.to_string(),
        amount: 500.0,
        discount: 0.0,
        waiver_amount: 0.0,
        status: FeeStatus::Partial,
        academic_year: academic_year.to_string(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

pub fn sample_waiver(
    id: &str,
    student_id: &str,
    fee_head_ids: &[&str],
    percentage: f64,
) -> Waiver {
    Waiver {
        id: id.to_string(),
        student_id: student_id.to_string(),
        academic_year: TEST_YEAR.to_string(),
        fee_head_ids: fee_head_ids.iter().map(|s| s.to_string()).collect(),
        percentage,
        description: "Scholarship".to_string(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

pub fn sample_expense(id: &str, title: &str, amount: f64) -> Expense {
    Expense {
        id: id.to_string(),
        title: title.to_string(),
        amount,
        fund_id: "fund-general".to_string(),
        expense_date: "2025-03-15".to_string(),
        description: String::new(),
        academic_year: TEST_YEAR.to_string(),
        created_at: "2025-03-15T00:00:00Z".to_string(),
        updated_at: "2025-03-15T00:00:00Z".to_string(),
    }
}

pub fn sample_income(id: &str, title: &str, amount: f64) -> Income {
    Income {
        id: id.to_string(),
        title: title.to_string(),
        amount,
        fund_id: "fund-general".to_string(),
        income_date: "2025-03-15".to_string(),
        description: String::new(),
        academic_year: TEST_YEAR.to_string(),
        created_at: "2025-03-15T00:00:00Z".to_string(),
        updated_at: "2025-03-15T00:00:00Z".to_string(),
    }
}

pub fn sample_student(id: &str, user_id: &str, name: &str) -> Student {
    Student {
        id: id.to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        class_name: "Seven".to_string(),
        section: "A".to_string(),
        roll_no: "12".to_string(),
    }
}
