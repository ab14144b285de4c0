//! CSV-backed fee type catalog repository. Fee types for every academic year
//! live in one root-level file.

use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::backend::storage::traits::FeeTypeStorage;
use shared::FeeType;

#[derive(Clone)]
pub struct FeeTypeRepository {
    connection: CsvConnection,
}

impl FeeTypeRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_fee_types(&self) -> Result<Vec<FeeType>> {
        let file_path = self.connection.fee_types_file()?;

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut fee_types = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let late_fee_raw = record.get(5).unwrap_or("");
            fee_types.push(FeeType {
                id: record.get(0).unwrap_or("").to_string(),
                title: record.get(1).unwrap_or("").to_string(),
                amount: record.get(2).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                fee_head_id: record.get(3).unwrap_or("").to_string(),
                is_boarding: record.get(4).unwrap_or("false") == "true",
                late_fee: if late_fee_raw.is_empty() {
                    None
                } else {
                    late_fee_raw.parse::<f64>().ok()
                },
                academic_year: record.get(6).unwrap_or("").to_string(),
                created_at: record.get(7).unwrap_or("").to_string(),
                updated_at: record.get(8).unwrap_or("").to_string(),
            });
        }

        Ok(fee_types)
    }

    fn write_fee_types(&self, fee_types: &[FeeType]) -> Result<()> {
        let file_path = self.connection.fee_types_file()?;

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
            "fee_head_id",
            "is_boarding",
            "late_fee",
            "academic_year",
            "created_at",
            "updated_at",
        ])?;

        for fee_type in fee_types {
            let late_fee = fee_type
                .late_fee
                .map(|f| f.to_string())
                .unwrap_or_default();
            csv_writer.write_record([
                fee_type.id.clone(),
                fee_type.title.clone(),
                fee_type.amount.to_string(),
                fee_type.fee_head_id.clone(),
                fee_type.is_boarding.to_string(),
                late_fee,
                fee_type.academic_year.clone(),
                fee_type.created_at.clone(),
                fee_type.updated_at.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl FeeTypeStorage for FeeTypeRepository {
    async fn store_fee_type(&self, fee_type: &FeeType) -> Result<()> {
        let _guard = self.connection.lock();
        let mut fee_types = self.read_fee_types()?;
        fee_types.push(fee_type.clone());
        self.write_fee_types(&fee_types)
    }

    async fn get_fee_type(&self, fee_type_id: &str) -> Result<Option<FeeType>> {
        let fee_types = self.read_fee_types()?;
        Ok(fee_types.into_iter().find(|f| f.id == fee_type_id))
    }

    async fn list_fee_types(&self, academic_year: &str) -> Result<Vec<FeeType>> {
        let mut fee_types = self.read_fee_types()?;
        fee_types.retain(|f| f.academic_year == academic_year);
        Ok(fee_types)
    }

    async fn update_fee_type(&self, fee_type: &FeeType) -> Result<()> {
        let _guard = self.connection.lock();
        let mut fee_types = self.read_fee_types()?;
        let position = fee_types
            .iter()
            .position(|f| f.id == fee_type.id)
            .ok_or_else(|| anyhow::anyhow!("Fee type not found: {}", fee_type.id))?;
        fee_types[position] = fee_type.clone();
        self.write_fee_types(&fee_types)
    }

    async fn delete_fee_type(&self, fee_type_id: &str) -> Result<bool> {
        let _guard = self.connection.lock();
        let mut fee_types = self.read_fee_types()?;
        let before = fee_types.len();
        fee_types.retain(|f| f.id != fee_type_id);
        if fee_types.len() == before {
            return Ok(false);
        }
        self.write_fee_types(&fee_types)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::sample_fee_type;

    #[tokio::test]
    async fn test_late_fee_round_trips_through_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = FeeTypeRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let with_late_fee = sample_fee_type("feetype::1", "head-1", 1000.0, Some(50.0));
        let without = sample_fee_type("feetype::2", "head-2", 500.0, None);
        repo.store_fee_type(&with_late_fee).await.unwrap();
        repo.store_fee_type(&without).await.unwrap();

        let reloaded = repo.get_fee_type("feetype::1").await.unwrap().unwrap();
        assert_eq!(reloaded.late_fee, Some(50.0));

        let reloaded = repo.get_fee_type("feetype::2").await.unwrap().unwrap();
        assert_eq!(reloaded.late_fee, None);
    }

    #[tokio::test]
    async fn test_list_filters_by_year() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = FeeTypeRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut fee_type = sample_fee_type("feetype::1", "head-1", 1000.0, None);
        fee_type.academic_year = "2024-2025".to_string();
        repo.store_fee_type(&fee_type).await.unwrap();
        repo.store_fee_type(&sample_fee_type("feetype::2", "head-2", 500.0, None))
            .await
            .unwrap();

        let current = repo.list_fee_types("2025-2026").await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, "feetype::2");
    }
}
