//! CSV-backed fee record repository.

use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::backend::storage::traits::FeeStorage;
use shared::{FeeRecord, FeeStatus};

fn parse_status(raw: &str) -> FeeStatus {
    match raw {
        "PAID" => FeeStatus::Paid,
        "PARTIAL" => FeeStatus::Partial,
        _ => FeeStatus::Unpaid,
    }
}

#[derive(Clone)]
pub struct FeeRepository {
    connection: CsvConnection,
}

impl FeeRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Read all fee records for an academic year from its CSV file.
    fn read_fees(&self, academic_year: &str) -> Result<Vec<FeeRecord>> {
        let file_path = self.connection.fees_file(academic_year)?;

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut fees = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            fees.push(FeeRecord {
                id: record.get(0).unwrap_or("").to_string(),
                fee_type_id: record.get(1).unwrap_or("").to_string(),
                student_id: record.get(2).unwrap_or("").to_string(),
                amount: record.get(3).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                discount: record.get(4).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                waiver_amount: record.get(5).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                status: parse_status(record.get(6).unwrap_or("UNPAID")),
                academic_year: record.get(7).unwrap_or("").to_string(),
                created_at: record.get(8).unwrap_or("").to_string(),
                updated_at: record.get(9).unwrap_or("").to_string(),
            });
        }

        Ok(fees)
    }

    /// Write all fee records for an academic year to its CSV file.
    fn write_fees(&self, academic_year: &str, fees: &[FeeRecord]) -> Result<()> {
        let file_path = self.connection.fees_file(academic_year)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;

        let writer = BufWriter::new(file);
        let mut csv_writer = Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "fee_type_id",
            "student_id",
            "amount",
            "discount",
            "waiver_amount",
            "status",
            "academic_year",
            "created_at",
            "updated_at",
        ])?;

        for fee in fees {
            csv_writer.write_record([
                fee.id.clone(),
                fee.fee_type_id.clone(),
                fee.student_id.clone(),
                fee.amount.to_string(),
                fee.discount.to_string(),
                fee.waiver_amount.to_string(),
                fee.status.to_string(),
                fee.academic_year.clone(),
                fee.created_at.clone(),
                fee.updated_at.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl FeeStorage for FeeRepository {
    async fn store_fee(&self, fee: &FeeRecord) -> Result<()> {
        let _guard = self.connection.lock();
        let mut fees = self.read_fees(&fee.academic_year)?;
        fees.push(fee.clone());
        self.write_fees(&fee.academic_year, &fees)
    }

    async fn get_fee(&self, academic_year: &str, fee_id: &str) -> Result<Option<FeeRecord>> {
        let fees = self.read_fees(academic_year)?;
        Ok(fees.into_iter().find(|f| f.id == fee_id))
    }

    async fn find_fee(
        &self,
        academic_year: &str,
        student_id: &str,
        fee_type_id: &str,
    ) -> Result<Option<FeeRecord>> {
        let fees = self.read_fees(academic_year)?;
        Ok(fees
            .into_iter()
            .find(|f| f.student_id == student_id && f.fee_type_id == fee_type_id))
    }

    async fn list_fees(
        &self,
        academic_year: &str,
        student_id: Option<&str>,
    ) -> Result<Vec<FeeRecord>> {
        let mut fees = self.read_fees(academic_year)?;
        if let Some(student_id) = student_id {
            fees.retain(|f| f.student_id == student_id);
        }
        // Oldest first, by the timestamp embedded in the ID
        fees.sort_by_key(|f| FeeRecord::parse_id(&f.id).unwrap_or(0));
        Ok(fees)
    }

    async fn update_fee(&self, fee: &FeeRecord) -> Result<()> {
        let _guard = self.connection.lock();
        let mut fees = self.read_fees(&fee.academic_year)?;
        let position = fees
            .iter()
            .position(|f| f.id == fee.id)
            .ok_or_else(|| anyhow::anyhow!("Fee record not found: {}", fee.id))?;
        fees[position] = fee.clone();
        self.write_fees(&fee.academic_year, &fees)
    }

    async fn delete_fee(&self, academic_year: &str, fee_id: &str) -> Result<bool> {
        let _guard = self.connection.lock();
        let mut fees = self.read_fees(academic_year)?;
        let before = fees.len();
        fees.retain(|f| f.id != fee_id);
        if fees.len() == before {
            return Ok(false);
        }
        self.write_fees(academic_year, &fees)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::sample_fee_record;

    const YEAR: &str = "2025-2026";

    fn setup() -> (tempfile::TempDir, FeeRepository) {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        (temp_dir, FeeRepository::new(connection))
    }

    #[tokio::test]
    async fn test_store_and_find_fee() {
        let (_temp, repo) = setup();
        let fee = sample_fee_record("fee::1", "feetype::1", "student-1", YEAR);

        repo.store_fee(&fee).await.unwrap();

        let found = repo
            .find_fee(YEAR, "student-1", "feetype::1")
            .await
            .unwrap();
        assert_eq!(found, Some(fee));
    }

    #[tokio::test]
    async fn test_update_fee_persists_changes() {
        let (_temp, repo) = setup();
        let mut fee = sample_fee_record("fee::1", "feetype::1", "student-1", YEAR);
        repo.store_fee(&fee).await.unwrap();

        fee.amount = 400.0;
        fee.status = FeeStatus::Partial;
        repo.update_fee(&fee).await.unwrap();

        let reloaded = repo.get_fee(YEAR, "fee::1").await.unwrap().unwrap();
        assert_eq!(reloaded.amount, 400.0);
        assert_eq!(reloaded.status, FeeStatus::Partial);
    }

    #[tokio::test]
    async fn test_delete_fee() {
        let (_temp, repo) = setup();
        let fee = sample_fee_record("fee::1", "feetype::1", "student-1", YEAR);
        repo.store_fee(&fee).await.unwrap();

        assert!(repo.delete_fee(YEAR, "fee::1").await.unwrap());
        assert!(!repo.delete_fee(YEAR, "fee::1").await.unwrap());
        assert!(repo.get_fee(YEAR, "fee::1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_fees_filters_by_student() {
        let (_temp, repo) = setup();
        repo.store_fee(&sample_fee_record("fee::1", "feetype::1", "student-1", YEAR))
            .await
            .unwrap();
        repo.store_fee(&sample_fee_record("fee::2", "feetype::2", "student-2", YEAR))
            .await
            .unwrap();

        let all = repo.list_fees(YEAR, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let one = repo.list_fees(YEAR, Some("student-1")).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].student_id, "student-1");
    }

    #[tokio::test]
    async fn test_years_are_isolated() {
        let (_temp, repo) = setup();
        repo.store_fee(&sample_fee_record("fee::1", "feetype::1", "student-1", YEAR))
            .await
            .unwrap();

        let other_year = repo.list_fees("2024-2025", None).await.unwrap();
        assert!(other_year.is_empty());
    }
}
