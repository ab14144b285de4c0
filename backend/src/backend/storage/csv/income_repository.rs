//! CSV-backed income item repository.

use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::backend::storage::traits::IncomeStorage;
use shared::Income;

#[derive(Clone)]
pub struct IncomeRepository {
    connection: CsvConnection,
}

impl IncomeRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_incomes(&self, academic_year: &str) -> Result<Vec<Income>> {
        let file_path = self.connection.incomes_file(academic_year)?;

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut incomes = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            incomes.push(Income {
                id: record.get(0).unwrap_or("").to_string(),
                title: record.get(1).unwrap_or("").to_string(),
                amount: record.get(2).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                fund_id: record.get(3).unwrap_or("").to_string(),
                income_date: record.get(4).unwrap_or("").to_string(),
                description: record.get(5).unwrap_or("").to_string(),
                academic_year: record.get(6).unwrap_or("").to_string(),
                created_at: record.get(7).unwrap_or("").to_string(),
                updated_at: record.get(8).unwrap_or("").to_string(),
            });
        }

        Ok(incomes)
    }

    fn write_incomes(&self, academic_year: &str, incomes: &[Income]) -> Result<()> {
        let file_path = self.connection.incomes_file(academic_year)?;

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
            "income_date",
            "description",
            "academic_year",
            "created_at",
            "updated_at",
        ])?;

        for income in incomes {
            csv_writer.write_record([
                income.id.clone(),
                income.title.clone(),
                income.amount.to_string(),
                income.fund_id.clone(),
                income.income_date.clone(),
                income.description.clone(),
                income.academic_year.clone(),
                income.created_at.clone(),
                income.updated_at.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl IncomeStorage for IncomeRepository {
    async fn store_income(&self, income: &Income) -> Result<()> {
        let _guard = self.connection.lock();
        let mut incomes = self.read_incomes(&income.academic_year)?;
        incomes.push(income.clone());
        self.write_incomes(&income.academic_year, &incomes)
    }

    async fn get_income(&self, academic_year: &str, income_id: &str) -> Result<Option<Income>> {
        let incomes = self.read_incomes(academic_year)?;
        Ok(incomes.into_iter().find(|i| i.id == income_id))
    }

    async fn list_incomes(&self, academic_year: &str) -> Result<Vec<Income>> {
        let mut incomes = self.read_incomes(academic_year)?;
        incomes.sort_by(|a, b| b.income_date.cmp(&a.income_date));
        Ok(incomes)
    }

    async fn update_income(&self, income: &Income) -> Result<()> {
        let _guard = self.connection.lock();
        let mut incomes = self.read_incomes(&income.academic_year)?;
        let position = incomes
            .iter()
            .position(|i| i.id == income.id)
            .ok_or_else(|| anyhow::anyhow!("Income not found: {}", income.id))?;
        incomes[position] = income.clone();
        self.write_incomes(&income.academic_year, &incomes)
    }

    async fn delete_income(&self, academic_year: &str, income_id: &str) -> Result<bool> {
        let _guard = self.connection.lock();
        let mut incomes = self.read_incomes(academic_year)?;
        let before = incomes.len();
        incomes.retain(|i| i.id != income_id);
        if incomes.len() == before {
            return Ok(false);
        }
        self.write_incomes(academic_year, &incomes)?;
        Ok(true)
    }
}
