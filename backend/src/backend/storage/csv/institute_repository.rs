//! Institute metadata stored as a single YAML file at the root of the data
//! directory, written atomically via a temp file.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::fs;

use super::connection::CsvConnection;
use crate::backend::storage::traits::InstituteStorage;
use shared::Institute;

#[derive(Clone)]
pub struct InstituteRepository {
    connection: CsvConnection,
}

impl InstituteRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Write institute metadata, creating the file if needed.
    pub fn save_institute(&self, institute: &Institute) -> Result<()> {
        let _guard = self.connection.lock();
        let path = self.connection.institute_file();
        let yaml = serde_yaml::to_string(institute)?;

        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, yaml)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

#[async_trait]
impl InstituteStorage for InstituteRepository {
    async fn get_institute(&self) -> Result<Institute> {
        let path = self.connection.institute_file();

        if !path.exists() {
            info!("No institute.yaml found, using defaults");
            return Ok(Institute::default());
        }

        let content = fs::read_to_string(&path)?;
        let institute: Institute = serde_yaml::from_str(&content)?;
        Ok(institute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = InstituteRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let institute = repo.get_institute().await.unwrap();
        assert_eq!(institute, Institute::default());
    }

    #[tokio::test]
    async fn test_round_trip_through_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = InstituteRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let institute = Institute {
            name: "Greenfield High School".to_string(),
            address: "12 College Road".to_string(),
            phone: "+880-1700-000000".to_string(),
            email: "office@greenfield.example".to_string(),
        };
        repo.save_institute(&institute).unwrap();

        let reloaded = repo.get_institute().await.unwrap();
        assert_eq!(reloaded, institute);
    }
}
