//! Waiver service: CRUD for percentage-based fee reductions.
//!
//! Waivers have an independent lifecycle from fee records; resolution against
//! fees happens in the reconciliation module at collection time.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::backend::storage::{ReferenceStorage, WaiverStorage};
use shared::{
    CreateWaiverRequest, DeleteResponse, UpdateWaiverRequest, Waiver, WaiverListQuery,
    WaiverListResponse, WaiverResponse,
};

#[derive(Clone)]
pub struct WaiverService {
    waivers: Arc<dyn WaiverStorage>,
    reference: Arc<dyn ReferenceStorage>,
}

impl WaiverService {
    pub fn new(waivers: Arc<dyn WaiverStorage>, reference: Arc<dyn ReferenceStorage>) -> Self {
        Self { waivers, reference }
    }

    fn validate_percentage(percentage: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&percentage) {
            anyhow::bail!("Percentage must be between 0 and 100");
        }
        Ok(())
    }

    pub async fn list_waivers(&self, query: WaiverListQuery) -> Result<WaiverListResponse> {
        let waivers = self
            .waivers
            .list_waivers(&query.academic_year, query.student_id.as_deref())
            .await?;
        Ok(WaiverListResponse { waivers })
    }

    pub async fn create_waiver(&self, request: CreateWaiverRequest) -> Result<WaiverResponse> {
        Self::validate_percentage(request.percentage)?;
        if request.fee_head_ids.is_empty() {
            anyhow::bail!("Waiver must apply to at least one fee head");
        }
        self.reference
            .get_student(&request.student_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Student not found: {}", request.student_id))?;

        let now = Utc::now();
        let waiver = Waiver {
            id: Waiver::generate_id(now.timestamp_millis() as u64),
            student_id: request.student_id,
            academic_year: request.academic_year,
            fee_head_ids: request.fee_head_ids,
            percentage: request.percentage,
            description: request.description,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };
        self.waivers.store_waiver(&waiver).await?;
        info!(
            "Created waiver {} ({}% for student {})",
            waiver.id, waiver.percentage, waiver.student_id
        );

        let success_message = format!("Waiver of {}% created", waiver.percentage);
        Ok(WaiverResponse {
            waiver,
            success_message,
        })
    }

    pub async fn update_waiver(
        &self,
        academic_year: &str,
        waiver_id: &str,
        request: UpdateWaiverRequest,
    ) -> Result<WaiverResponse> {
        let mut waiver = self
            .waivers
            .get_waiver(academic_year, waiver_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Waiver not found: {}", waiver_id))?;

        if let Some(fee_head_ids) = request.fee_head_ids {
            if fee_head_ids.is_empty() {
                anyhow::bail!("Waiver must apply to at least one fee head");
            }
            waiver.fee_head_ids = fee_head_ids;
        }
        if let Some(percentage) = request.percentage {
            Self::validate_percentage(percentage)?;
            waiver.percentage = percentage;
        }
        if let Some(description) = request.description {
            waiver.description = description;
        }
        waiver.updated_at = Utc::now().to_rfc3339();

        self.waivers.update_waiver(&waiver).await?;
        info!("Updated waiver {}", waiver.id);

        let success_message = "Waiver updated".to_string();
        Ok(WaiverResponse {
            waiver,
            success_message,
        })
    }

    pub async fn delete_waiver(
        &self,
        academic_year: &str,
        waiver_id: &str,
    ) -> Result<DeleteResponse> {
        let deleted = self.waivers.delete_waiver(academic_year, waiver_id).await?;
        if !deleted {
            anyhow::bail!("Waiver not found: {}", waiver_id);
        }
        info!("Deleted waiver {}", waiver_id);
        Ok(DeleteResponse {
            deleted,
            success_message: "Waiver deleted".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::{sample_student, TEST_YEAR};
    use crate::backend::storage::csv::{CsvConnection, ReferenceRepository, WaiverRepository};

    fn setup() -> (tempfile::TempDir, WaiverService) {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let reference = Arc::new(ReferenceRepository::new(connection.clone()));
        reference
            .store_student(&sample_student("student-1", "user-1", "Asha Rahman"))
            .unwrap();
        let service =
            WaiverService::new(Arc::new(WaiverRepository::new(connection)), reference);
        (temp_dir, service)
    }

    fn create_request(percentage: f64) -> CreateWaiverRequest {
        CreateWaiverRequest {
            student_id: "student-1".to_string(),
            academic_year: TEST_YEAR.to_string(),
            fee_head_ids: vec!["head-1".to_string()],
            percentage,
            description: "Sibling discount".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_waivers() {
        let (_temp, service) = setup();

        service.create_waiver(create_request(10.0)).await.unwrap();

        let listed = service
            .list_waivers(WaiverListQuery {
                academic_year: TEST_YEAR.to_string(),
                student_id: Some("student-1".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(listed.waivers.len(), 1);
        assert_eq!(listed.waivers[0].percentage, 10.0);
    }

    #[tokio::test]
    async fn test_percentage_out_of_range_is_rejected() {
        let (_temp, service) = setup();

        let err = service.create_waiver(create_request(120.0)).await.unwrap_err();
        assert!(err.to_string().contains("between 0 and 100"));

        let err = service.create_waiver(create_request(-5.0)).await.unwrap_err();
        assert!(err.to_string().contains("between 0 and 100"));
    }

    #[tokio::test]
    async fn test_unknown_student_is_rejected() {
        let (_temp, service) = setup();

        let mut request = create_request(10.0);
        request.student_id = "student-404".to_string();
        let err = service.create_waiver(request).await.unwrap_err();
        assert!(err.to_string().contains("Student not found"));
    }

    #[tokio::test]
    async fn test_update_and_delete_waiver() {
        let (_temp, service) = setup();
        let created = service.create_waiver(create_request(10.0)).await.unwrap();

        let updated = service
            .update_waiver(
                TEST_YEAR,
                &created.waiver.id,
                UpdateWaiverRequest {
                    fee_head_ids: None,
                    percentage: Some(25.0),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.waiver.percentage, 25.0);
        assert_eq!(updated.waiver.description, "Sibling discount");

        let deleted = service
            .delete_waiver(TEST_YEAR, &created.waiver.id)
            .await
            .unwrap();
        assert!(deleted.deleted);

        let err = service
            .delete_waiver(TEST_YEAR, &created.waiver.id)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
