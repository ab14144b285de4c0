//! CSV-backed expense item repository.

use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::backend::storage::traits::ExpenseStorage;
use shared::Expense;

#[derive(Clone)]
pub struct ExpenseRepository {
    connection: CsvConnection,
}

impl ExpenseRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_expenses(&self, academic_year: &str) -> Result<Vec<Expense>> {
        let file_path = self.connection.expenses_file(academic_year)?;

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut expenses = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            expenses.push(Expense {
                id: record.get(0).unwrap_or("").to_string(),
                title: record.get(1).unwrap_or("").to_string(),
                amount: record.get(2).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                fund_id: record.get(3).unwrap_or("").to_string(),
                expense_date: record.get(4).unwrap_or("").to_string(),
                description: record.get(5).unwrap_or("").to_string(),
                academic_year: record.get(6).unwrap_or("").to_string(),
                created_at: record.get(7).unwrap_or("").to_string(),
                updated_at: record.get(8).unwrap_or("").to_string(),
            });
        }

        Ok(expenses)
    }

    fn write_expenses(&self, academic_year: &str, expenses: &[Expense]) -> Result<()> {
        let file_path = self.connection.expenses_file(academic_year)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;

        let writer = BufWriter::new(file);
        let mut csv_writer = Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "title",
            "amount",
            "fund_id",
            "expense_date",
            "description",
            "academic_year",
            "created_at",
            "updated_at",
        ])?;

        for expense in expenses {
            csv_writer.write_record([
                expense.id.clone(),
                expense.title.clone(),
                expense.amount.to_string(),
                expense.fund_id.clone(),
                expense.expense_date.clone(),
                expense.description.clone(),
                expense.academic_year.clone(),
                expense.created_at.clone(),
                expense.updated_at.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl ExpenseStorage for ExpenseRepository {
    async fn store_expense(&self, expense: &Expense) -> Result<()> {
        let _guard = self.connection.lock();
        let mut expenses = self.read_expenses(&expense.academic_year)?;
        expenses.push(expense.clone());
        self.write_expenses(&expense.academic_year, &expenses)
    }

    async fn get_expense(
        &self,
        academic_year: &str,
        expense_id: &str,
    ) -> Result<Option<Expense>> {
        let expenses = self.read_expenses(academic_year)?;
        Ok(expenses.into_iter().find(|e| e.id == expense_id))
    }

    async fn list_expenses(&self, academic_year: &str) -> Result<Vec<Expense>> {
        let mut expenses = self.read_expenses(academic_year)?;
        // Newest first for the listing screens
        expenses.sort_by(|a, b| b.expense_date.cmp(&a.expense_date));
        Ok(expenses)
    }

    async fn update_expense(&self, expense: &Expense) -> Result<()> {
        let _guard = self.connection.lock();
        let mut expenses = self.read_expenses(&expense.academic_year)?;
        let position = expenses
            .iter()
            .position(|e| e.id == expense.id)
            .ok_or_else(|| anyhow::anyhow!("Expense not found: {}", expense.id))?;
        expenses[position] = expense.clone();
        self.write_expenses(&expense.academic_year, &expenses)
    }

    async fn delete_expense(&self, academic_year: &str, expense_id: &str) -> Result<bool> {
        let _guard = self.connection.lock();
        let mut expenses = self.read_expenses(academic_year)?;
        let before = expenses.len();
        expenses.retain(|e| e.id != expense_id);
        if expenses.len() == before {
            return Ok(false);
        }
        self.write_expenses(academic_year, &expenses)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::sample_expense;

    const YEAR: &str = "2025-2026";

    #[tokio::test]
    async fn test_store_update_delete_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = ExpenseRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut expense = sample_expense("expense::1", "Lab equipment", 1200.0);
        repo.store_expense(&expense).await.unwrap();

        expense.amount = 1350.5;
        repo.update_expense(&expense).await.unwrap();

        let reloaded = repo.get_expense(YEAR, "expense::1").await.unwrap().unwrap();
        assert_eq!(reloaded.amount, 1350.5);

        assert!(repo.delete_expense(YEAR, "expense::1").await.unwrap());
        assert!(repo.get_expense(YEAR, "expense::1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = ExpenseRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut older = sample_expense("expense::1", "Chalk", 20.0);
        older.expense_date = "2025-04-01".to_string();
        let mut newer = sample_expense("expense::2", "Projector", 900.0);
        newer.expense_date = "2025-05-01".to_string();

        repo.store_expense(&older).await.unwrap();
        repo.store_expense(&newer).await.unwrap();

        let expenses = repo.list_expenses(YEAR).await.unwrap();
        assert_eq!(expenses[0].id, "expense::2");
    }
}
