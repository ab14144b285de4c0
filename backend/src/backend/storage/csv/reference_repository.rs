//! CSV-backed reference data: academic years, funds and students. These
//! catalogs are read by every screen; rows are edited rarely, so alongside
//! the read-only trait there are store helpers used at bootstrap and by
//! test fixtures.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Datelike;
use csv::{Reader, Writer};
use log::info;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::backend::storage::traits::ReferenceStorage;
use shared::{AcademicYear, Fund, Student};

#[derive(Clone)]
pub struct ReferenceRepository {
    connection: CsvConnection,
}

impl ReferenceRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_academic_years(&self) -> Result<Vec<AcademicYear>> {
        let file_path = self.connection.academic_years_file()?;
        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut years = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            years.push(AcademicYear {
                id: record.get(0).unwrap_or("").to_string(),
                title: record.get(1).unwrap_or("").to_string(),
                is_active: record.get(2).unwrap_or("false") == "true",
            });
        }
        Ok(years)
    }

    fn write_academic_years(&self, years: &[AcademicYear]) -> Result<()> {
        let file_path = self.connection.academic_years_file()?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;
        let mut csv_writer = Writer::from_writer(BufWriter::new(file));

        csv_writer.write_record(["id", "title", "is_active"])?;
        for year in years {
            csv_writer.write_record([
                year.id.as_str(),
                year.title.as_str(),
                if year.is_active { "true" } else { "false" },
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    fn read_funds(&self) -> Result<Vec<Fund>> {
        let file_path = self.connection.funds_file()?;
        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut funds = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            funds.push(Fund {
                id: record.get(0).unwrap_or("").to_string(),
                title: record.get(1).unwrap_or("").to_string(),
                description: record.get(2).unwrap_or("").to_string(),
            });
        }
        Ok(funds)
    }

    fn read_students(&self) -> Result<Vec<Student>> {
        let file_path = self.connection.students_file()?;
        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut students = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            students.push(Student {
                id: record.get(0).unwrap_or("").to_string(),
                user_id: record.get(1).unwrap_or("").to_string(),
                name: record.get(2).unwrap_or("").to_string(),
                class_name: record.get(3).unwrap_or("").to_string(),
                section: record.get(4).unwrap_or("").to_string(),
                roll_no: record.get(5).unwrap_or("").to_string(),
            });
        }
        Ok(students)
    }

    /// Append an academic year row.
    pub fn store_academic_year(&self, year: &AcademicYear) -> Result<()> {
        let _guard = self.connection.lock();
        let mut years = self.read_academic_years()?;
        years.push(year.clone());
        self.write_academic_years(&years)
    }

    /// Append a fund row.
    pub fn store_fund(&self, fund: &Fund) -> Result<()> {
        let _guard = self.connection.lock();
        let mut funds = self.read_funds()?;
        funds.push(fund.clone());

        let file_path = self.connection.funds_file()?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;
        let mut csv_writer = Writer::from_writer(BufWriter::new(file));
        csv_writer.write_record(["id", "title", "description"])?;
        for fund in &funds {
            csv_writer.write_record([
                fund.id.as_str(),
                fund.title.as_str(),
                fund.description.as_str(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Append a student row.
    pub fn store_student(&self, student: &Student) -> Result<()> {
        let _guard = self.connection.lock();
        let mut students = self.read_students()?;
        students.push(student.clone());

        let file_path = self.connection.students_file()?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;
        let mut csv_writer = Writer::from_writer(BufWriter::new(file));
        csv_writer.write_record(["id", "user_id", "name", "class_name", "section", "roll_no"])?;
        for student in &students {
            csv_writer.write_record([
                student.id.as_str(),
                student.user_id.as_str(),
                student.name.as_str(),
                student.class_name.as_str(),
                student.section.as_str(),
                student.roll_no.as_str(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Seed a general fund if the catalog is empty, so expense and income
    /// entry works on a fresh data directory.
    pub fn ensure_default_fund(&self) -> Result<()> {
        if !self.read_funds()?.is_empty() {
            return Ok(());
        }

        info!("No funds found, seeding the general fund");
        self.store_fund(&Fund {
            id: "fund-general".to_string(),
            title: "General Fund".to_string(),
            description: "Default fund for expenses and incomes".to_string(),
        })
    }

    /// Seed the current academic year if the catalog is empty, so a fresh
    /// data directory starts usable.
    pub fn ensure_academic_year_exists(&self) -> Result<()> {
        if !self.read_academic_years()?.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now();
        // School years roll over mid-calendar-year
        let start = if now.month() >= 7 {
            now.year()
        } else {
            now.year() - 1
        };
        let title = format!("{}-{}", start, start + 1);
        info!("No academic years found, seeding {}", title);

        self.store_academic_year(&AcademicYear {
            id: format!("year::{}", start),
            title,
            is_active: true,
        })
    }
}

#[async_trait]
impl ReferenceStorage for ReferenceRepository {
    async fn list_academic_years(&self) -> Result<Vec<AcademicYear>> {
        self.read_academic_years()
    }

    async fn get_active_academic_year(&self) -> Result<Option<AcademicYear>> {
        let years = self.read_academic_years()?;
        Ok(years.into_iter().find(|y| y.is_active))
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        self.read_funds()
    }

    async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let students = self.read_students()?;
        Ok(students.into_iter().find(|s| s.id == student_id))
    }

    async fn find_student_by_user_id(&self, user_id: &str) -> Result<Option<Student>> {
        let students = self.read_students()?;
        Ok(students.into_iter().find(|s| s.user_id == user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_student_lookup_by_user_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = ReferenceRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repo.store_student(&Student {
            id: "student-1".to_string(),
            user_id: "user-42".to_string(),
            name: "Asha Rahman".to_string(),
            class_name: "Seven".to_string(),
            section: "A".to_string(),
            roll_no: "12".to_string(),
        })
        .unwrap();

        let found = repo.find_student_by_user_id("user-42").await.unwrap();
        assert_eq!(found.unwrap().name, "Asha Rahman");

        let missing = repo.find_student_by_user_id("user-404").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_active_year_selection() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = ReferenceRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repo.store_academic_year(&AcademicYear {
            id: "year::2024".to_string(),
            title: "2024-2025".to_string(),
            is_active: false,
        })
        .unwrap();
        repo.store_academic_year(&AcademicYear {
            id: "year::2025".to_string(),
            title: "2025-2026".to_string(),
            is_active: true,
        })
        .unwrap();

        let active = repo.get_active_academic_year().await.unwrap().unwrap();
        assert_eq!(active.title, "2025-2026");
    }

    #[tokio::test]
    async fn test_seed_runs_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = ReferenceRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repo.ensure_academic_year_exists().unwrap();
        repo.ensure_academic_year_exists().unwrap();

        let years = repo.list_academic_years().await.unwrap();
        assert_eq!(years.len(), 1);
        assert!(years[0].is_active);
    }
}
