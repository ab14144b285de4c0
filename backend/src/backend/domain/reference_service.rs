//! Reference data service: academic years, funds, institute metadata and
//! student lookup. All read-only; the catalogs are maintained outside the
//! dashboard.

use anyhow::Result;
use std::sync::Arc;

use crate::backend::storage::{InstituteStorage, ReferenceStorage};
use shared::{
    AcademicYearListResponse, FundListResponse, InstituteResponse, StudentLookupResponse,
};

#[derive(Clone)]
pub struct ReferenceService {
    reference: Arc<dyn ReferenceStorage>,
    institute: Arc<dyn InstituteStorage>,
}

impl ReferenceService {
    pub fn new(reference: Arc<dyn ReferenceStorage>, institute: Arc<dyn InstituteStorage>) -> Self {
        Self {
            reference,
            institute,
        }
    }

    pub async fn list_academic_years(&self) -> Result<AcademicYearListResponse> {
        let academic_years = self.reference.list_academic_years().await?;
        Ok(AcademicYearListResponse { academic_years })
    }

    pub async fn list_funds(&self) -> Result<FundListResponse> {
        let funds = self.reference.list_funds().await?;
        Ok(FundListResponse { funds })
    }

    pub async fn get_institute(&self) -> Result<InstituteResponse> {
        let institute = self.institute.get_institute().await?;
        Ok(InstituteResponse { institute })
    }

    /// Find the student record for a login user, used when an operator opens
    /// a collection screen for a user id.
    pub async fn lookup_student(&self, user_id: &str) -> Result<StudentLookupResponse> {
        let student = self.reference.find_student_by_user_id(user_id).await?;
        Ok(StudentLookupResponse { student })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::sample_student;
    use crate::backend::storage::csv::{CsvConnection, InstituteRepository, ReferenceRepository};

    fn setup() -> (tempfile::TempDir, ReferenceService, Arc<ReferenceRepository>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let repo = Arc::new(ReferenceRepository::new(connection.clone()));
        let service = ReferenceService::new(
            repo.clone(),
            Arc::new(InstituteRepository::new(connection)),
        );
        (temp_dir, service, repo)
    }

    #[tokio::test]
    async fn test_lookup_student_by_user_id() {
        let (_temp, service, repo) = setup();
        repo.store_student(&sample_student("student-1", "user-42", "Asha Rahman"))
            .unwrap();

        let found = service.lookup_student("user-42").await.unwrap();
        assert_eq!(found.student.unwrap().id, "student-1");

        let missing = service.lookup_student("user-404").await.unwrap();
        assert!(missing.student.is_none());
    }

    #[tokio::test]
    async fn test_institute_defaults_without_config() {
        let (_temp, service, _repo) = setup();
        let response = service.get_institute().await.unwrap();
        assert_eq!(response.institute.name, "Unnamed Institute");
    }
}
