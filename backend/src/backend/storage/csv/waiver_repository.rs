//! CSV-backed waiver repository. The fee-head set is stored as a
//! semicolon-joined list in a single column.

use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::backend::storage::traits::WaiverStorage;
use shared::Waiver;

#[derive(Clone)]
pub struct WaiverRepository {
    connection: CsvConnection,
}

impl WaiverRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_waivers(&self, academic_year: &str) -> Result<Vec<Waiver>> {
        let file_path = self.connection.waivers_file(academic_year)?;

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut waivers = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let fee_head_ids = record
                .get(3)
                .unwrap_or("")
                .split(';')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            waivers.push(Waiver {
                id: record.get(0).unwrap_or("").to_string(),
                student_id: record.get(1).unwrap_or("").to_string(),
                academic_year: record.get(2).unwrap_or("").to_string(),
                fee_head_ids,
                percentage: record.get(4).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                description: record.get(5).unwrap_or("").to_string(),
                created_at: record.get(6).unwrap_or("").to_string(),
                updated_at: record.get(7).unwrap_or("").to_string(),
            });
        }

        Ok(waivers)
    }

    fn write_waivers(&self, academic_year: &str, waivers: &[Waiver]) -> Result<()> {
        let file_path = self.connection.waivers_file(academic_year)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;

        let writer = BufWriter::new(file);
        let mut csv_writer = Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "student_id",
            "academic_year",
            "fee_head_ids",
            "percentage",
            "description",
            "created_at",
            "updated_at",
        ])?;

        for waiver in waivers {
            csv_writer.write_record([
                waiver.id.clone(),
                waiver.student_id.clone(),
                waiver.academic_year.clone(),
                waiver.fee_head_ids.join(";"),
                waiver.percentage.to_string(),
                waiver.description.clone(),
                waiver.created_at.clone(),
                waiver.updated_at.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl WaiverStorage for WaiverRepository {
    async fn store_waiver(&self, waiver: &Waiver) -> Result<()> {
        let _guard = self.connection.lock();
        let mut waivers = self.read_waivers(&waiver.academic_year)?;
        waivers.push(waiver.clone());
        self.write_waivers(&waiver.academic_year, &waivers)
    }

    async fn get_waiver(&self, academic_year: &str, waiver_id: &str) -> Result<Option<Waiver>> {
        let waivers = self.read_waivers(academic_year)?;
        Ok(waivers.into_iter().find(|w| w.id == waiver_id))
    }

    async fn list_waivers(
        &self,
        academic_year: &str,
        student_id: Option<&str>,
    ) -> Result<Vec<Waiver>> {
        let mut waivers = self.read_waivers(academic_year)?;
        if let Some(student_id) = student_id {
            waivers.retain(|w| w.student_id == student_id);
        }
        Ok(waivers)
    }

    async fn update_waiver(&self, waiver: &Waiver) -> Result<()> {
        let _guard = self.connection.lock();
        let mut waivers = self.read_waivers(&waiver.academic_year)?;
        let position = waivers
            .iter()
            .position(|w| w.id == waiver.id)
            .ok_or_else(|| anyhow::anyhow!("Waiver not found: {}", waiver.id))?;
        waivers[position] = waiver.clone();
        self.write_waivers(&waiver.academic_year, &waivers)
    }

    async fn delete_waiver(&self, academic_year: &str, waiver_id: &str) -> Result<bool> {
        let _guard = self.connection.lock();
        let mut waivers = self.read_waivers(academic_year)?;
        let before = waivers.len();
        waivers.retain(|w| w.id != waiver_id);
        if waivers.len() == before {
            return Ok(false);
        }
        self.write_waivers(academic_year, &waivers)?;
        Ok(true)
    }
}
