//! Fee collection service.
//!
//! Assembles the collectible-fee table for a student and handles batch
//! submission: one create-or-update per selected fee, dispatched in parallel
//! with no atomicity across the batch. A failing entry never blocks or rolls
//! back the others; the caller gets per-fee outcomes plus aggregate counts.

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::domain::reconciliation::{
    self, late_fee_for_category, resolve_waiver, total_payable,
};
use crate::backend::storage::{
    ExclusionStorage, FeeStorage, FeeTypeStorage, ReferenceStorage, WaiverStorage,
};
use shared::{
    CollectFeesRequest, CollectFeesResponse, CollectibleFeeRow, CollectibleFeesQuery,
    CollectibleFeesResponse, DeleteResponse, FeeCategory, FeeListQuery, FeeListResponse,
    FeePayment, FeeRecord, FeeSubmissionOutcome, FeeType, Waiver,
};

#[derive(Clone)]
pub struct FeeCollectionService {
    fees: Arc<dyn FeeStorage>,
    fee_types: Arc<dyn FeeTypeStorage>,
    waivers: Arc<dyn WaiverStorage>,
    exclusions: Arc<dyn ExclusionStorage>,
    reference: Arc<dyn ReferenceStorage>,
}

impl FeeCollectionService {
    pub fn new(
        fees: Arc<dyn FeeStorage>,
        fee_types: Arc<dyn FeeTypeStorage>,
        waivers: Arc<dyn WaiverStorage>,
        exclusions: Arc<dyn ExclusionStorage>,
        reference: Arc<dyn ReferenceStorage>,
    ) -> Self {
        Self {
            fees,
            fee_types,
            waivers,
            exclusions,
            reference,
        }
    }

    /// Fee types eligible for collection: category-matched and not excluded
    /// for this student/year.
    async fn eligible_fee_types(
        &self,
        student_id: &str,
        academic_year: &str,
        category: FeeCategory,
    ) -> Result<Vec<FeeType>> {
        let fee_types = self.fee_types.list_fee_types(academic_year).await?;

        let mut eligible = Vec::new();
        for fee_type in fee_types {
            let category_match = match category {
                FeeCategory::Boarding => fee_type.is_boarding,
                FeeCategory::Current | FeeCategory::Previous => !fee_type.is_boarding,
            };
            if !category_match {
                continue;
            }
            if self
                .exclusions
                .is_excluded(academic_year, student_id, &fee_type.id)
                .await?
            {
                continue;
            }
            eligible.push(fee_type);
        }

        Ok(eligible)
    }

    /// Build the fee collection table for a student: every eligible fee type
    /// with its resolved waiver, payable base and derived status.
    pub async fn list_collectible_fees(
        &self,
        query: CollectibleFeesQuery,
    ) -> Result<CollectibleFeesResponse> {
        let student = self
            .reference
            .get_student(&query.student_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Student not found: {}", query.student_id))?;

        let fee_types = self
            .eligible_fee_types(&query.student_id, &query.academic_year, query.category)
            .await?;
        let waivers = self
            .waivers
            .list_waivers(&query.academic_year, Some(&query.student_id))
            .await?;

        let mut rows = Vec::new();
        for fee_type in fee_types {
            let existing = self
                .fees
                .find_fee(&query.academic_year, &query.student_id, &fee_type.id)
                .await?;

            let resolution =
                resolve_waiver(&fee_type, &query.student_id, &query.academic_year, &waivers);
            let late_fee = late_fee_for_category(&fee_type, query.category);
            let payable = total_payable(resolution.payable_after_waiver, late_fee);

            let previously_paid = existing.as_ref().map(|f| f.amount).unwrap_or(0.0);
            // Stored discounts are trusted at render time but clamped to the
            // payable base, which can shrink if a waiver was widened later.
            let discount = existing
                .as_ref()
                .map(|f| f.discount.min(payable))
                .unwrap_or(0.0);

            let outcome =
                reconciliation::derive_status(payable, discount, previously_paid, 0.0)?;

            rows.push(CollectibleFeeRow {
                record_id: existing.map(|f| f.id),
                waiver_amount: resolution.waiver_amount,
                payable_after_waiver: resolution.payable_after_waiver,
                late_fee: late_fee.unwrap_or(0.0),
                total_payable: payable,
                previously_paid,
                discount,
                status: outcome.status,
                due_amount: outcome.due_amount,
                fee_type,
            });
        }

        Ok(CollectibleFeesResponse {
            student,
            academic_year: query.academic_year,
            category: query.category,
            rows,
        })
    }

    /// Submit a batch of fee payments. Each entry is processed independently
    /// and the futures are joined; already-written entries stay written when
    /// a later one fails.
    pub async fn collect_fees(&self, request: CollectFeesRequest) -> Result<CollectFeesResponse> {
        if request.payments.is_empty() {
            anyhow::bail!("No fees selected");
        }

        self.reference
            .get_student(&request.student_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Student not found: {}", request.student_id))?;

        // One waiver fetch for the whole batch; resolution itself is pure
        let waivers = self
            .waivers
            .list_waivers(&request.academic_year, Some(&request.student_id))
            .await?;

        let base_millis = Utc::now().timestamp_millis() as u64;

        let submissions = request.payments.iter().enumerate().map(|(index, payment)| {
            let service = self.clone();
            let waivers = waivers.clone();
            let student_id = request.student_id.clone();
            let academic_year = request.academic_year.clone();
            let payment = payment.clone();
            let category = request.category;
            // Offset keeps generated IDs unique within the batch
            let id_millis = base_millis + index as u64;
            async move {
                service
                    .submit_single(
                        &student_id,
                        &academic_year,
                        category,
                        &waivers,
                        &payment,
                        id_millis,
                    )
                    .await
            }
        });

        let outcomes: Vec<FeeSubmissionOutcome> = join_all(submissions).await;

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        if failed > 0 {
            warn!(
                "Batch fee submission for {}: {} of {} entries failed",
                request.student_id,
                failed,
                outcomes.len()
            );
        }

        let success_message = format!(
            "Recorded {} of {} fee payments for student {}",
            succeeded,
            outcomes.len(),
            request.student_id
        );

        Ok(CollectFeesResponse {
            batch_id: Uuid::new_v4().to_string(),
            outcomes,
            succeeded,
            failed,
            success_message,
        })
    }

    /// Process one entry of a batch: reconcile, then create or update the
    /// fee record. Errors are folded into the outcome, never propagated, so
    /// sibling entries keep going.
    async fn submit_single(
        &self,
        student_id: &str,
        academic_year: &str,
        category: FeeCategory,
        waivers: &[Waiver],
        payment: &FeePayment,
        id_millis: u64,
    ) -> FeeSubmissionOutcome {
        match self
            .try_submit_single(student_id, academic_year, category, waivers, payment, id_millis)
            .await
        {
            Ok((record_id, status, due_amount)) => FeeSubmissionOutcome {
                fee_type_id: payment.fee_type_id.clone(),
                success: true,
                record_id: Some(record_id),
                status: Some(status),
                due_amount: Some(due_amount),
                error: None,
            },
            Err(e) => FeeSubmissionOutcome {
                fee_type_id: payment.fee_type_id.clone(),
                success: false,
                record_id: None,
                status: None,
                due_amount: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn try_submit_single(
        &self,
        student_id: &str,
        academic_year: &str,
        category: FeeCategory,
        waivers: &[Waiver],
        payment: &FeePayment,
        id_millis: u64,
    ) -> Result<(String, shared::FeeStatus, f64)> {
        let fee_type = self
            .fee_types
            .get_fee_type(&payment.fee_type_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Fee type not found: {}", payment.fee_type_id))?;

        if self
            .exclusions
            .is_excluded(academic_year, student_id, &fee_type.id)
            .await?
        {
            anyhow::bail!("Fee type {} is excluded for this student", fee_type.title);
        }

        let existing = self
            .fees
            .find_fee(academic_year, student_id, &fee_type.id)
            .await?;
        let previously_paid = existing.as_ref().map(|f| f.amount).unwrap_or(0.0);

        let (resolution, _payable, outcome) = reconciliation::reconcile(
            &fee_type,
            student_id,
            academic_year,
            waivers,
            category,
            payment.discount,
            previously_paid,
            payment.amount,
        )?;

        let now = Utc::now().to_rfc3339();
        let record = match existing {
            Some(mut record) => {
                record.amount = outcome.total_paid;
                record.discount = payment.discount;
                record.waiver_amount = resolution.waiver_amount;
                record.status = outcome.status;
                record.updated_at = now;
                self.fees.update_fee(&record).await?;
                info!(
                    "Updated fee record {} ({} -> {})",
                    record.id, fee_type.title, record.status
                );
                record
            }
            None => {
                let record = FeeRecord {
                    id: FeeRecord::generate_id(id_millis),
                    fee_type_id: fee_type.id.clone(),
                    student_id: student_id.to_string(),
                    amount: outcome.total_paid,
                    discount: payment.discount,
                    waiver_amount: resolution.waiver_amount,
                    status: outcome.status,
                    academic_year: academic_year.to_string(),
                    created_at: now.clone(),
                    updated_at: now,
                };
                self.fees.store_fee(&record).await?;
                info!(
                    "Created fee record {} ({} -> {})",
                    record.id, fee_type.title, record.status
                );
                record
            }
        };

        Ok((record.id, outcome.status, outcome.due_amount))
    }

    /// List persisted fee records for an academic year, optionally for one
    /// student.
    pub async fn list_fees(&self, query: FeeListQuery) -> Result<FeeListResponse> {
        let fees = self
            .fees
            .list_fees(&query.academic_year, query.student_id.as_deref())
            .await?;
        Ok(FeeListResponse { fees })
    }

    /// Hard-delete a fee record via the explicit delete action.
    pub async fn delete_fee(&self, academic_year: &str, fee_id: &str) -> Result<DeleteResponse> {
        let deleted = self.fees.delete_fee(academic_year, fee_id).await?;
        if !deleted {
            anyhow::bail!("Fee record not found: {}", fee_id);
        }
        info!("Deleted fee record {}", fee_id);
        Ok(DeleteResponse {
            deleted,
            success_message: format!("Fee record {} deleted", fee_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::{
        sample_fee_type, sample_student, sample_waiver, TEST_YEAR,
    };
    use crate::backend::storage::csv::{
        CsvConnection, ExclusionRepository, FeeRepository, FeeTypeRepository,
        ReferenceRepository, WaiverRepository,
    };
    use crate::backend::storage::{ExclusionStorage as _, FeeTypeStorage as _, WaiverStorage as _};
    use shared::{FeeExclusion, FeeStatus};

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        service: FeeCollectionService,
        fee_types: Arc<FeeTypeRepository>,
        waivers: Arc<WaiverRepository>,
        exclusions: Arc<ExclusionRepository>,
    }

    fn setup() -> Fixture {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();

        let fees = Arc::new(FeeRepository::new(connection.clone()));
        let fee_types = Arc::new(FeeTypeRepository::new(connection.clone()));
        let waivers = Arc::new(WaiverRepository::new(connection.clone()));
        let exclusions = Arc::new(ExclusionRepository::new(connection.clone()));
        let reference = Arc::new(ReferenceRepository::new(connection));

        reference
            .store_student(&sample_student("student-1", "user-1", "Asha Rahman"))
            .unwrap();

        let service = FeeCollectionService::new(
            fees,
            fee_types.clone(),
            waivers.clone(),
            exclusions.clone(),
            reference,
        );

        Fixture {
            _temp_dir: temp_dir,
            service,
            fee_types,
            waivers,
            exclusions,
        }
    }

    fn payment(fee_type_id: &str, amount: f64, discount: f64) -> FeePayment {
        FeePayment {
            fee_type_id: fee_type_id.to_string(),
            amount,
            discount,
        }
    }

    fn collect_request(payments: Vec<FeePayment>) -> CollectFeesRequest {
        CollectFeesRequest {
            student_id: "student-1".to_string(),
            academic_year: TEST_YEAR.to_string(),
            category: FeeCategory::Current,
            payments,
        }
    }

    #[tokio::test]
    async fn test_full_payment_with_waiver_late_fee_and_discount() {
        let fixture = setup();
        fixture
            .fee_types
            .store_fee_type(&sample_fee_type("feetype::1", "head-1", 1000.0, Some(50.0)))
            .await
            .unwrap();
        fixture
            .waivers
            .store_waiver(&sample_waiver("waiver::1", "student-1", &["head-1"], 10.0))
            .await
            .unwrap();

        let response = fixture
            .service
            .collect_fees(collect_request(vec![payment("feetype::1", 900.0, 50.0)]))
            .await
            .unwrap();

        assert_eq!(response.succeeded, 1);
        assert_eq!(response.failed, 0);
        let outcome = &response.outcomes[0];
        assert_eq!(outcome.status, Some(FeeStatus::Paid));
        assert_eq!(outcome.due_amount, Some(0.0));
    }

    #[tokio::test]
    async fn test_partial_payment_then_settlement() {
        let fixture = setup();
        fixture
            .fee_types
            .store_fee_type(&sample_fee_type("feetype::1", "head-1", 1000.0, Some(50.0)))
            .await
            .unwrap();
        fixture
            .waivers
            .store_waiver(&sample_waiver("waiver::1", "student-1", &["head-1"], 10.0))
            .await
            .unwrap();

        // payable 950, discount 50 -> 900; first payment 400
        let first = fixture
            .service
            .collect_fees(collect_request(vec![payment("feetype::1", 400.0, 50.0)]))
            .await
            .unwrap();
        assert_eq!(first.outcomes[0].status, Some(FeeStatus::Partial));
        assert_eq!(first.outcomes[0].due_amount, Some(500.0));

        // second payment settles the record; create-or-update must update
        let second = fixture
            .service
            .collect_fees(collect_request(vec![payment("feetype::1", 500.0, 50.0)]))
            .await
            .unwrap();
        assert_eq!(second.outcomes[0].status, Some(FeeStatus::Paid));
        assert_eq!(second.outcomes[0].record_id, first.outcomes[0].record_id);

        let fees = fixture
            .service
            .list_fees(FeeListQuery {
                academic_year: TEST_YEAR.to_string(),
                student_id: Some("student-1".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(fees.fees.len(), 1);
        assert_eq!(fees.fees[0].amount, 900.0);
    }

    #[tokio::test]
    async fn test_discount_above_payable_fails_entry_without_write() {
        let fixture = setup();
        fixture
            .fee_types
            .store_fee_type(&sample_fee_type("feetype::1", "head-1", 1000.0, None))
            .await
            .unwrap();

        let response = fixture
            .service
            .collect_fees(collect_request(vec![payment("feetype::1", 100.0, 1200.0)]))
            .await
            .unwrap();

        assert_eq!(response.failed, 1);
        assert!(response.outcomes[0]
            .error
            .as_ref()
            .unwrap()
            .contains("exceeds payable"));

        let fees = fixture
            .service
            .list_fees(FeeListQuery {
                academic_year: TEST_YEAR.to_string(),
                student_id: None,
            })
            .await
            .unwrap();
        assert!(fees.fees.is_empty());
    }

    #[tokio::test]
    async fn test_partial_batch_failure_leaves_successes_written() {
        let fixture = setup();
        fixture
            .fee_types
            .store_fee_type(&sample_fee_type("feetype::1", "head-1", 1000.0, None))
            .await
            .unwrap();

        let response = fixture
            .service
            .collect_fees(collect_request(vec![
                payment("feetype::1", 1000.0, 0.0),
                payment("feetype::404", 100.0, 0.0),
            ]))
            .await
            .unwrap();

        assert_eq!(response.succeeded, 1);
        assert_eq!(response.failed, 1);

        // The successful entry stays written despite the failing sibling
        let fees = fixture
            .service
            .list_fees(FeeListQuery {
                academic_year: TEST_YEAR.to_string(),
                student_id: None,
            })
            .await
            .unwrap();
        assert_eq!(fees.fees.len(), 1);
        assert_eq!(fees.fees[0].status, FeeStatus::Paid);
    }

    #[tokio::test]
    async fn test_excluded_fee_type_disappears_from_collectible_list() {
        let fixture = setup();
        fixture
            .fee_types
            .store_fee_type(&sample_fee_type("feetype::1", "head-1", 1000.0, None))
            .await
            .unwrap();
        fixture
            .fee_types
            .store_fee_type(&sample_fee_type("feetype::2", "head-2", 500.0, None))
            .await
            .unwrap();
        fixture
            .exclusions
            .store_exclusion(&FeeExclusion {
                id: "exclusion::1".to_string(),
                student_id: "student-1".to_string(),
                academic_year: TEST_YEAR.to_string(),
                fee_type_id: "feetype::1".to_string(),
                created_at: "2025-01-01T00:00:00Z".to_string(),
            })
            .await
            .unwrap();

        let response = fixture
            .service
            .list_collectible_fees(CollectibleFeesQuery {
                student_id: "student-1".to_string(),
                academic_year: TEST_YEAR.to_string(),
                category: FeeCategory::Current,
            })
            .await
            .unwrap();

        assert_eq!(response.rows.len(), 1);
        assert_eq!(response.rows[0].fee_type.id, "feetype::2");
    }

    #[tokio::test]
    async fn test_boarding_rows_skip_late_fee() {
        let fixture = setup();
        let mut boarding = sample_fee_type("feetype::1", "head-1", 2000.0, Some(75.0));
        boarding.is_boarding = true;
        fixture.fee_types.store_fee_type(&boarding).await.unwrap();

        let response = fixture
            .service
            .list_collectible_fees(CollectibleFeesQuery {
                student_id: "student-1".to_string(),
                academic_year: TEST_YEAR.to_string(),
                category: FeeCategory::Boarding,
            })
            .await
            .unwrap();

        assert_eq!(response.rows.len(), 1);
        assert_eq!(response.rows[0].late_fee, 0.0);
        assert_eq!(response.rows[0].total_payable, 2000.0);
        assert_eq!(response.rows[0].status, FeeStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let fixture = setup();
        let err = fixture
            .service
            .collect_fees(collect_request(vec![]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No fees selected"));
    }
}
