//! Fee catalog service: fee type CRUD and per-student exclusions
//! (a fee type marked deleted for a student/year).

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::backend::storage::{ExclusionStorage, FeeTypeStorage};
use shared::{
    CreateFeeExclusionRequest, CreateFeeTypeRequest, DeleteResponse, FeeExclusion,
    FeeExclusionResponse, FeeType, FeeTypeListResponse, FeeTypeResponse, UpdateFeeTypeRequest,
};

#[derive(Clone)]
pub struct FeeCatalogService {
    fee_types: Arc<dyn FeeTypeStorage>,
    exclusions: Arc<dyn ExclusionStorage>,
}

impl FeeCatalogService {
    pub fn new(fee_types: Arc<dyn FeeTypeStorage>, exclusions: Arc<dyn ExclusionStorage>) -> Self {
        Self {
            fee_types,
            exclusions,
        }
    }

    pub async fn list_fee_types(&self, academic_year: &str) -> Result<FeeTypeListResponse> {
        let fee_types = self.fee_types.list_fee_types(academic_year).await?;
        Ok(FeeTypeListResponse { fee_types })
    }

    pub async fn create_fee_type(&self, request: CreateFeeTypeRequest) -> Result<FeeTypeResponse> {
        if request.title.trim().is_empty() {
            anyhow::bail!("Title cannot be empty");
        }
        if request.amount <= 0.0 {
            anyhow::bail!("Amount must be positive");
        }
        if request.fee_head_id.trim().is_empty() {
            anyhow::bail!("Fee head cannot be empty");
        }
        if let Some(late_fee) = request.late_fee {
            if late_fee < 0.0 {
                anyhow::bail!("Late fee must not be negative");
            }
        }

        let now = Utc::now();
        let fee_type = FeeType {
            id: FeeType::generate_id(now.timestamp_millis() as u64),
            title: request.title.trim().to_string(),
            amount: request.amount,
            fee_head_id: request.fee_head_id,
            is_boarding: request.is_boarding,
            late_fee: request.late_fee,
            academic_year: request.academic_year,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };
        self.fee_types.store_fee_type(&fee_type).await?;
        info!("Created fee type {} ({})", fee_type.id, fee_type.title);

        let success_message = format!("Fee type '{}' created", fee_type.title);
        Ok(FeeTypeResponse {
            fee_type,
            success_message,
        })
    }

    pub async fn update_fee_type(
        &self,
        fee_type_id: &str,
        request: UpdateFeeTypeRequest,
    ) -> Result<FeeTypeResponse> {
        let mut fee_type = self
            .fee_types
            .get_fee_type(fee_type_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Fee type not found: {}", fee_type_id))?;

        if let Some(title) = request.title {
            if title.trim().is_empty() {
                anyhow::bail!("Title cannot be empty");
            }
            fee_type.title = title.trim().to_string();
        }
        if let Some(amount) = request.amount {
            if amount <= 0.0 {
                anyhow::bail!("Amount must be positive");
            }
            fee_type.amount = amount;
        }
        if let Some(late_fee) = request.late_fee {
            if late_fee < 0.0 {
                anyhow::bail!("Late fee must not be negative");
            }
            fee_type.late_fee = Some(late_fee);
        }
        fee_type.updated_at = Utc::now().to_rfc3339();

        self.fee_types.update_fee_type(&fee_type).await?;
        info!("Updated fee type {}", fee_type.id);

        let success_message = format!("Fee type '{}' updated", fee_type.title);
        Ok(FeeTypeResponse {
            fee_type,
            success_message,
        })
    }

    pub async fn delete_fee_type(&self, fee_type_id: &str) -> Result<DeleteResponse> {
        let deleted = self.fee_types.delete_fee_type(fee_type_id).await?;
        if !deleted {
            anyhow::bail!("Fee type not found: {}", fee_type_id);
        }
        info!("Deleted fee type {}", fee_type_id);
        Ok(DeleteResponse {
            deleted,
            success_message: format!("Fee type {} deleted", fee_type_id),
        })
    }

    /// Exclude a fee type for a student/year. The fee stops appearing in the
    /// collectible list regardless of any payment history.
    pub async fn create_exclusion(
        &self,
        request: CreateFeeExclusionRequest,
    ) -> Result<FeeExclusionResponse> {
        let fee_type = self
            .fee_types
            .get_fee_type(&request.fee_type_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Fee type not found: {}", request.fee_type_id))?;

        if self
            .exclusions
            .is_excluded(&request.academic_year, &request.student_id, &request.fee_type_id)
            .await?
        {
            anyhow::bail!("Fee type already excluded for this student");
        }

        let now = Utc::now();
        let exclusion = FeeExclusion {
            id: FeeExclusion::generate_id(now.timestamp_millis() as u64),
            student_id: request.student_id,
            academic_year: request.academic_year,
            fee_type_id: request.fee_type_id,
            created_at: now.to_rfc3339(),
        };
        self.exclusions.store_exclusion(&exclusion).await?;
        info!(
            "Excluded fee type {} for student {}",
            exclusion.fee_type_id, exclusion.student_id
        );

        let success_message = format!("Fee '{}' removed from collection", fee_type.title);
        Ok(FeeExclusionResponse {
            exclusion,
            success_message,
        })
    }

    pub async fn revoke_exclusion(
        &self,
        academic_year: &str,
        exclusion_id: &str,
    ) -> Result<DeleteResponse> {
        let deleted = self
            .exclusions
            .delete_exclusion(academic_year, exclusion_id)
            .await?;
        if !deleted {
            anyhow::bail!("Exclusion not found: {}", exclusion_id);
        }
        info!("Revoked exclusion {}", exclusion_id);
        Ok(DeleteResponse {
            deleted,
            success_message: "Fee restored to collection".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::TEST_YEAR;
    use crate::backend::storage::csv::{CsvConnection, ExclusionRepository, FeeTypeRepository};

    fn setup() -> (tempfile::TempDir, FeeCatalogService) {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let service = FeeCatalogService::new(
            Arc::new(FeeTypeRepository::new(connection.clone())),
            Arc::new(ExclusionRepository::new(connection)),
        );
        (temp_dir, service)
    }

    fn create_request(title: &str) -> CreateFeeTypeRequest {
        CreateFeeTypeRequest {
            title: title.to_string(),
            amount: 1000.0,
            fee_head_id: "head-1".to_string(),
            is_boarding: false,
            late_fee: Some(50.0),
            academic_year: TEST_YEAR.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_fee_types() {
        let (_temp, service) = setup();

        let created = service
            .create_fee_type(create_request("Tuition Fee"))
            .await
            .unwrap();
        assert_eq!(created.fee_type.title, "Tuition Fee");

        let listed = service.list_fee_types(TEST_YEAR).await.unwrap();
        assert_eq!(listed.fee_types.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (_temp, service) = setup();

        let mut request = create_request("  ");
        let err = service.create_fee_type(request.clone()).await.unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));

        request = create_request("Tuition Fee");
        request.amount = 0.0;
        let err = service.create_fee_type(request).await.unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[tokio::test]
    async fn test_update_fee_type_fields() {
        let (_temp, service) = setup();
        let created = service
            .create_fee_type(create_request("Tuition Fee"))
            .await
            .unwrap();

        let updated = service
            .update_fee_type(
                &created.fee_type.id,
                UpdateFeeTypeRequest {
                    title: None,
                    amount: Some(1200.0),
                    late_fee: Some(75.0),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.fee_type.amount, 1200.0);
        assert_eq!(updated.fee_type.late_fee, Some(75.0));
        assert_eq!(updated.fee_type.title, "Tuition Fee");
    }

    #[tokio::test]
    async fn test_exclusion_lifecycle() {
        let (_temp, service) = setup();
        let created = service
            .create_fee_type(create_request("Tuition Fee"))
            .await
            .unwrap();

        let exclusion = service
            .create_exclusion(CreateFeeExclusionRequest {
                student_id: "student-1".to_string(),
                academic_year: TEST_YEAR.to_string(),
                fee_type_id: created.fee_type.id.clone(),
            })
            .await
            .unwrap();

        // A second exclusion for the same fee is a conflict
        let err = service
            .create_exclusion(CreateFeeExclusionRequest {
                student_id: "student-1".to_string(),
                academic_year: TEST_YEAR.to_string(),
                fee_type_id: created.fee_type.id.clone(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already excluded"));

        let revoked = service
            .revoke_exclusion(TEST_YEAR, &exclusion.exclusion.id)
            .await
            .unwrap();
        assert!(revoked.deleted);
    }
}
