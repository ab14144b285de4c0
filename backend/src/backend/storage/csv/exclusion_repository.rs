//! CSV-backed repository for fee exclusions (fee types marked deleted for a
//! student/year).

use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::backend::storage::traits::ExclusionStorage;
use shared::FeeExclusion;

#[derive(Clone)]
pub struct ExclusionRepository {
    connection: CsvConnection,
}

impl ExclusionRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_exclusions(&self, academic_year: &str) -> Result<Vec<FeeExclusion>> {
        let file_path = self.connection.exclusions_file(academic_year)?;

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut exclusions = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            exclusions.push(FeeExclusion {
                id: record.get(0).unwrap_or("").to_string(),
                student_id: record.get(1).unwrap_or("").to_string(),
                academic_year: record.get(2).unwrap_or("").to_string(),
                fee_type_id: record.get(3).unwrap_or("").to_string(),
                created_at: record.get(4).unwrap_or("").to_string(),
            });
        }

        Ok(exclusions)
    }

    fn write_exclusions(&self, academic_year: &str, exclusions: &[FeeExclusion]) -> Result<()> {
        let file_path = self.connection.exclusions_file(academic_year)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;

        let writer = BufWriter::new(file);
        let mut csv_writer = Writer::from_writer(writer);

        csv_writer.write_record(["id", "student_id", "academic_year", "fee_type_id", "created_at"])?;

        for exclusion in exclusions {
            csv_writer.write_record([
                exclusion.id.as_str(),
                exclusion.student_id.as_str(),
                exclusion.academic_year.as_str(),
                exclusion.fee_type_id.as_str(),
                exclusion.created_at.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl ExclusionStorage for ExclusionRepository {
    async fn store_exclusion(&self, exclusion: &FeeExclusion) -> Result<()> {
        let _guard = self.connection.lock();
        let mut exclusions = self.read_exclusions(&exclusion.academic_year)?;
        exclusions.push(exclusion.clone());
        self.write_exclusions(&exclusion.academic_year, &exclusions)
    }

    async fn list_exclusions(
        &self,
        academic_year: &str,
        student_id: &str,
    ) -> Result<Vec<FeeExclusion>> {
        let mut exclusions = self.read_exclusions(academic_year)?;
        exclusions.retain(|e| e.student_id == student_id);
        Ok(exclusions)
    }

    async fn is_excluded(
        &self,
        academic_year: &str,
        student_id: &str,
        fee_type_id: &str,
    ) -> Result<bool> {
        let exclusions = self.read_exclusions(academic_year)?;
        Ok(exclusions
            .iter()
            .any(|e| e.student_id == student_id && e.fee_type_id == fee_type_id))
    }

    async fn delete_exclusion(&self, academic_year: &str, exclusion_id: &str) -> Result<bool> {
        let _guard = self.connection.lock();
        let mut exclusions = self.read_exclusions(academic_year)?;
        let before = exclusions.len();
        exclusions.retain(|e| e.id != exclusion_id);
        if exclusions.len() == before {
            return Ok(false);
        }
        self.write_exclusions(academic_year, &exclusions)?;
        Ok(true)
    }
}
