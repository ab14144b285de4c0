//! CsvConnection manages the data directory layout and ensures row files
//! exist with their headers before repositories touch them.

use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const FEES_HEADER: &str =
    "id,fee_type_id,student_id,amount,discount,waiver_amount,status,academic_year,created_at,updated_at\n";
const WAIVERS_HEADER: &str =
    "id,student_id,academic_year,fee_head_ids,percentage,description,created_at,updated_at\n";
const EXCLUSIONS_HEADER: &str = "id,student_id,academic_year,fee_type_id,created_at\n";
const EXPENSES_HEADER: &str =
    "id,title,amount,fund_id,expense_date,description,academic_year,created_at,updated_at\n";
const INCOMES_HEADER: &str =
    "id,title,amount,fund_id,income_date,description,academic_year,created_at,updated_at\n";
const FEE_TYPES_HEADER: &str =
    "id,title,amount,fee_head_id,is_boarding,late_fee,academic_year,created_at,updated_at\n";
const ACADEMIC_YEARS_HEADER: &str = "id,title,is_active\n";
const FUNDS_HEADER: &str = "id,title,description\n";
const STUDENTS_HEADER: &str = "id,user_id,name,class_name,section,roll_no\n";

/// Connection to the file-based store. Cheap to clone; clones share the base
/// directory and the write lock that serializes read-modify-write cycles.
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: Arc<Mutex<PathBuf>>,
    write_lock: Arc<Mutex<()>>,
}

impl CsvConnection {
    /// Create a connection rooted at the given directory, creating it if
    /// needed.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self {
            base_directory: Arc::new(Mutex::new(base_path)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Create a connection in the default data directory. Honors the
    /// `FEE_TRACKER_DATA` environment variable, otherwise uses
    /// `~/Documents/Fee Tracker`.
    pub fn new_default() -> Result<Self> {
        let data_dir = match std::env::var("FEE_TRACKER_DATA") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => {
                let documents_dir = dirs::document_dir()
                    .or_else(dirs::home_dir)
                    .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
                documents_dir.join("Fee Tracker")
            }
        };

        info!("Using data directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    /// Base directory of the store.
    pub fn base_directory(&self) -> PathBuf {
        self.base_directory.lock().unwrap().clone()
    }

    /// Serialize a read-modify-write cycle against the row files. Every
    /// repository mutation holds this across its read and its write.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap()
    }

    /// Directory holding one academic year's row files.
    pub fn get_year_directory(&self, academic_year: &str) -> PathBuf {
        self.base_directory().join(academic_year)
    }

    fn ensure_file(path: &Path, header: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            fs::write(path, header)?;
        }
        Ok(())
    }

    pub fn fees_file(&self, academic_year: &str) -> Result<PathBuf> {
        let path = self.get_year_directory(academic_year).join("fees.csv");
        Self::ensure_file(&path, FEES_HEADER)?;
        Ok(path)
    }

    pub fn waivers_file(&self, academic_year: &str) -> Result<PathBuf> {
        let path = self.get_year_directory(academic_year).join("waivers.csv");
        Self::ensure_file(&path, WAIVERS_HEADER)?;
        Ok(path)
    }

    pub fn exclusions_file(&self, academic_year: &str) -> Result<PathBuf> {
        let path = self.get_year_directory(academic_year).join("exclusions.csv");
        Self::ensure_file(&path, EXCLUSIONS_HEADER)?;
        Ok(path)
    }

    pub fn expenses_file(&self, academic_year: &str) -> Result<PathBuf> {
        let path = self.get_year_directory(academic_year).join("expenses.csv");
        Self::ensure_file(&path, EXPENSES_HEADER)?;
        Ok(path)
    }

    pub fn incomes_file(&self, academic_year: &str) -> Result<PathBuf> {
        let path = self.get_year_directory(academic_year).join("incomes.csv");
        Self::ensure_file(&path, INCOMES_HEADER)?;
        Ok(path)
    }

    pub fn fee_types_file(&self) -> Result<PathBuf> {
        let path = self.base_directory().join("fee_types.csv");
        Self::ensure_file(&path, FEE_TYPES_HEADER)?;
        Ok(path)
    }

    pub fn academic_years_file(&self) -> Result<PathBuf> {
        let path = self.base_directory().join("academic_years.csv");
        Self::ensure_file(&path, ACADEMIC_YEARS_HEADER)?;
        Ok(path)
    }

    pub fn funds_file(&self) -> Result<PathBuf> {
        let path = self.base_directory().join("funds.csv");
        Self::ensure_file(&path, FUNDS_HEADER)?;
        Ok(path)
    }

    pub fn students_file(&self) -> Result<PathBuf> {
        let path = self.base_directory().join("students.csv");
        Self::ensure_file(&path, STUDENTS_HEADER)?;
        Ok(path)
    }

    pub fn institute_file(&self) -> PathBuf {
        self.base_directory().join("institute.yaml")
    }

    pub fn permissions_file(&self) -> PathBuf {
        self.base_directory().join("permissions.yaml")
    }
}
