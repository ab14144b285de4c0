//! Income item service: CRUD for the income screen. Form validation is
//! shared with the expense service; the two screens accept identical input.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::backend::domain::expense_service::{first_error_message, validate_ledger_form};
use crate::backend::domain::reconciliation::round_currency;
use crate::backend::storage::{IncomeStorage, ReferenceStorage};
use shared::{
    CreateIncomeRequest, DeleteResponse, Income, IncomeListResponse, IncomeResponse,
    UpdateIncomeRequest,
};

#[derive(Clone)]
pub struct IncomeService {
    incomes: Arc<dyn IncomeStorage>,
    reference: Arc<dyn ReferenceStorage>,
}

impl IncomeService {
    pub fn new(incomes: Arc<dyn IncomeStorage>, reference: Arc<dyn ReferenceStorage>) -> Self {
        Self { incomes, reference }
    }

    async fn check_fund(&self, fund_id: &str) -> Result<()> {
        let funds = self.reference.list_funds().await?;
        if !funds.iter().any(|f| f.id == fund_id) {
            anyhow::bail!("Unknown fund: {}", fund_id);
        }
        Ok(())
    }

    pub async fn list_incomes(&self, academic_year: &str) -> Result<IncomeListResponse> {
        let incomes = self.incomes.list_incomes(academic_year).await?;
        Ok(IncomeListResponse { incomes })
    }

    pub async fn create_income(&self, request: CreateIncomeRequest) -> Result<IncomeResponse> {
        let validation = validate_ledger_form(&request.title, request.amount, &request.income_date);
        if !validation.is_valid {
            let message = first_error_message(&validation.errors)
                .unwrap_or_else(|| "Invalid input".to_string());
            anyhow::bail!(message);
        }
        self.check_fund(&request.fund_id).await?;

        let now = Utc::now();
        let income = Income {
            id: Income::generate_id(now.timestamp_millis() as u64),
            title: request.title.trim().to_string(),
            amount: round_currency(request.amount),
            fund_id: request.fund_id,
            income_date: request.income_date,
            description: request.description,
            academic_year: request.academic_year,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };
        self.incomes.store_income(&income).await?;
        info!("Created income {} ({})", income.id, income.title);

        let success_message = format!("Income '{}' recorded", income.title);
        Ok(IncomeResponse {
            income,
            success_message,
        })
    }

    pub async fn update_income(
        &self,
        academic_year: &str,
        income_id: &str,
        request: UpdateIncomeRequest,
    ) -> Result<IncomeResponse> {
        let mut income = self
            .incomes
            .get_income(academic_year, income_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Income not found: {}", income_id))?;

        if let Some(title) = request.title {
            income.title = title;
        }
        if let Some(amount) = request.amount {
            income.amount = amount;
        }
        if let Some(fund_id) = request.fund_id {
            self.check_fund(&fund_id).await?;
            income.fund_id = fund_id;
        }
        if let Some(income_date) = request.income_date {
            income.income_date = income_date;
        }
        if let Some(description) = request.description {
            income.description = description;
        }

        let validation = validate_ledger_form(&income.title, income.amount, &income.income_date);
        if !validation.is_valid {
            let message = first_error_message(&validation.errors)
                .unwrap_or_else(|| "Invalid input".to_string());
            anyhow::bail!(message);
        }

        income.amount = round_currency(income.amount);
        income.updated_at = Utc::now().to_rfc3339();
        self.incomes.update_income(&income).await?;
        info!("Updated income {}", income.id);

        let success_message = format!("Income '{}' updated", income.title);
        Ok(IncomeResponse {
            income,
            success_message,
        })
    }

    pub async fn delete_income(
        &self,
        academic_year: &str,
        income_id: &str,
    ) -> Result<DeleteResponse> {
        let deleted = self.incomes.delete_income(academic_year, income_id).await?;
        if !deleted {
            anyhow::bail!("Income not found: {}", income_id);
        }
        info!("Deleted income {}", income_id);
        Ok(DeleteResponse {
            deleted,
            success_message: "Income deleted".to_string(),
        })
    }
}
