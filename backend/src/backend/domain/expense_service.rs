//! Expense item service: CRUD plus form validation for the expense screen.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::backend::domain::reconciliation::round_currency;
use crate::backend::storage::{ExpenseStorage, ReferenceStorage};
use shared::{
    is_valid_iso_date, CreateExpenseRequest, DeleteResponse, Expense, ExpenseListResponse,
    ExpenseResponse, FormValidation, LedgerValidationError, UpdateExpenseRequest,
};

pub const MAX_TITLE_LENGTH: usize = 256;
pub const MAX_LEDGER_AMOUNT: f64 = 10_000_000.0;

/// Validate ledger form fields. Shared verbatim by the income service.
pub fn validate_ledger_form(title: &str, amount: f64, date: &str) -> FormValidation {
    let mut errors = Vec::new();

    if title.trim().is_empty() {
        errors.push(LedgerValidationError::EmptyTitle);
    } else if title.len() > MAX_TITLE_LENGTH {
        errors.push(LedgerValidationError::TitleTooLong(title.len()));
    }

    if amount <= 0.0 {
        errors.push(LedgerValidationError::AmountNotPositive);
    } else if amount > MAX_LEDGER_AMOUNT {
        errors.push(LedgerValidationError::AmountTooLarge(MAX_LEDGER_AMOUNT));
    } else if (round_currency(amount) - amount).abs() > f64::EPSILON {
        errors.push(LedgerValidationError::AmountPrecisionTooHigh);
    }

    if !is_valid_iso_date(date) {
        errors.push(LedgerValidationError::InvalidDate(date.to_string()));
    }

    FormValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// User-facing message for the first validation error.
pub fn first_error_message(errors: &[LedgerValidationError]) -> Option<String> {
    errors.first().map(|error| match error {
        LedgerValidationError::EmptyTitle => "Title cannot be empty".to_string(),
        LedgerValidationError::TitleTooLong(len) => {
            format!("Title too long ({} characters, max {})", len, MAX_TITLE_LENGTH)
        }
        LedgerValidationError::AmountNotPositive => "Amount must be positive".to_string(),
        LedgerValidationError::AmountTooLarge(max) => {
            format!("Amount exceeds the maximum of {:.2}", max)
        }
        LedgerValidationError::AmountPrecisionTooHigh => {
            "Amount cannot have more than 2 decimal places".to_string()
        }
        LedgerValidationError::InvalidDate(date) => {
            format!("Invalid date '{}', expected YYYY-MM-DD", date)
        }
        LedgerValidationError::UnknownFund(fund_id) => format!("Unknown fund: {}", fund_id),
    })
}

#[derive(Clone)]
pub struct ExpenseService {
    expenses: Arc<dyn ExpenseStorage>,
    reference: Arc<dyn ReferenceStorage>,
}

impl ExpenseService {
    pub fn new(expenses: Arc<dyn ExpenseStorage>, reference: Arc<dyn ReferenceStorage>) -> Self {
        Self {
            expenses,
            reference,
        }
    }

    async fn check_fund(&self, fund_id: &str) -> Result<()> {
        let funds = self.reference.list_funds().await?;
        if !funds.iter().any(|f| f.id == fund_id) {
            anyhow::bail!("Unknown fund: {}", fund_id);
        }
        Ok(())
    }

    pub async fn list_expenses(&self, academic_year: &str) -> Result<ExpenseListResponse> {
        let expenses = self.expenses.list_expenses(academic_year).await?;
        Ok(ExpenseListResponse { expenses })
    }

    pub async fn create_expense(&self, request: CreateExpenseRequest) -> Result<ExpenseResponse> {
        let validation =
            validate_ledger_form(&request.title, request.amount, &request.expense_date);
        if !validation.is_valid {
            let message = first_error_message(&validation.errors)
                .unwrap_or_else(|| "Invalid input".to_string());
            anyhow::bail!(message);
        }
        self.check_fund(&request.fund_id).await?;

        let now = Utc::now();
        let expense = Expense {
            id: Expense::generate_id(now.timestamp_millis() as u64),
            title: request.title.trim().to_string(),
            amount: round_currency(request.amount),
            fund_id: request.fund_id,
            expense_date: request.expense_date,
            description: request.description,
            academic_year: request.academic_year,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };
        self.expenses.store_expense(&expense).await?;
        info!("Created expense {} ({})", expense.id, expense.title);

        let success_message = format!("Expense '{}' recorded", expense.title);
        Ok(ExpenseResponse {
            expense,
            success_message,
        })
    }

    pub async fn update_expense(
        &self,
        academic_year: &str,
        expense_id: &str,
        request: UpdateExpenseRequest,
    ) -> Result<ExpenseResponse> {
        let mut expense = self
            .expenses
            .get_expense(academic_year, expense_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Expense not found: {}", expense_id))?;

        if let Some(title) = request.title {
            expense.title = title;
        }
        if let Some(amount) = request.amount {
            expense.amount = amount;
        }
        if let Some(fund_id) = request.fund_id {
            self.check_fund(&fund_id).await?;
            expense.fund_id = fund_id;
        }
        if let Some(expense_date) = request.expense_date {
            expense.expense_date = expense_date;
        }
        if let Some(description) = request.description {
            expense.description = description;
        }

        let validation =
            validate_ledger_form(&expense.title, expense.amount, &expense.expense_date);
        if !validation.is_valid {
            let message = first_error_message(&validation.errors)
                .unwrap_or_else(|| "Invalid input".to_string());
            anyhow::bail!(message);
        }

        expense.amount = round_currency(expense.amount);
        expense.updated_at = Utc::now().to_rfc3339();
        self.expenses.update_expense(&expense).await?;
        info!("Updated expense {}", expense.id);

        let success_message = format!("Expense '{}' updated", expense.title);
        Ok(ExpenseResponse {
            expense,
            success_message,
        })
    }

    pub async fn delete_expense(
        &self,
        academic_year: &str,
        expense_id: &str,
    ) -> Result<DeleteResponse> {
        let deleted = self.expenses.delete_expense(academic_year, expense_id).await?;
        if !deleted {
            anyhow::bail!("Expense not found: {}", expense_id);
        }
        info!("Deleted expense {}", expense_id);
        Ok(DeleteResponse {
            deleted,
            success_message: "Expense deleted".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::TEST_YEAR;
    use crate::backend::storage::csv::{CsvConnection, ExpenseRepository, ReferenceRepository};
    use shared::Fund;

    fn setup() -> (tempfile::TempDir, ExpenseService) {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let reference = Arc::new(ReferenceRepository::new(connection.clone()));
        reference
            .store_fund(&Fund {
                id: "fund-general".to_string(),
                title: "General Fund".to_string(),
                description: String::new(),
            })
            .unwrap();
        let service =
            ExpenseService::new(Arc::new(ExpenseRepository::new(connection)), reference);
        (temp_dir, service)
    }

    fn create_request(title: &str, amount: f64) -> CreateExpenseRequest {
        CreateExpenseRequest {
            title: title.to_string(),
            amount,
            fund_id: "fund-general".to_string(),
            expense_date: "2025-03-15".to_string(),
            description: "Quarterly purchase".to_string(),
            academic_year: TEST_YEAR.to_string(),
        }
    }

    #[test]
    fn test_validate_ledger_form() {
        assert!(validate_ledger_form("Lab equipment", 120.5, "2025-03-15").is_valid);

        let empty = validate_ledger_form("  ", 120.5, "2025-03-15");
        assert!(empty.errors.contains(&LedgerValidationError::EmptyTitle));

        let negative = validate_ledger_form("Lab equipment", -5.0, "2025-03-15");
        assert!(negative
            .errors
            .contains(&LedgerValidationError::AmountNotPositive));

        let precise = validate_ledger_form("Lab equipment", 10.005, "2025-03-15");
        assert!(precise
            .errors
            .contains(&LedgerValidationError::AmountPrecisionTooHigh));

        let bad_date = validate_ledger_form("Lab equipment", 10.0, "15/03/2025");
        assert!(matches!(
            bad_date.errors[0],
            LedgerValidationError::InvalidDate(_)
        ));
    }

    #[tokio::test]
    async fn test_create_update_delete_expense() {
        let (_temp, service) = setup();

        let created = service
            .create_expense(create_request("Lab equipment", 1200.0))
            .await
            .unwrap();
        assert_eq!(created.expense.amount, 1200.0);

        let updated = service
            .update_expense(
                TEST_YEAR,
                &created.expense.id,
                UpdateExpenseRequest {
                    title: None,
                    amount: Some(1350.5),
                    fund_id: None,
                    expense_date: None,
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.expense.amount, 1350.5);

        let deleted = service
            .delete_expense(TEST_YEAR, &created.expense.id)
            .await
            .unwrap();
        assert!(deleted.deleted);
    }

    #[tokio::test]
    async fn test_unknown_fund_is_rejected() {
        let (_temp, service) = setup();

        let mut request = create_request("Lab equipment", 100.0);
        request.fund_id = "fund-404".to_string();
        let err = service.create_expense(request).await.unwrap_err();
        assert!(err.to_string().contains("Unknown fund"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_write() {
        let (_temp, service) = setup();

        let err = service
            .create_expense(create_request("", 100.0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Title cannot be empty"));

        let listed = service.list_expenses(TEST_YEAR).await.unwrap();
        assert!(listed.expenses.is_empty());
    }
}
