//! Fee reconciliation calculations.
//!
//! The current, previous and boarding collection screens all run the same
//! three steps for every fee row: resolve the waiver, compute the payable
//! base, derive the status. This module is the single home for that
//! arithmetic, parameterized by an optional late fee (only the current-fees
//! variant passes one). All functions are pure and take request-scoped
//! parameters; callers own fetching the inputs.

use shared::{FeeCategory, FeeStatus, FeeType, Waiver};
use thiserror::Error;

/// Round to 2 decimal places. Every amount that leaves this module is
/// currency, so every output goes through here.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Validation failures raised before any record is written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconciliationError {
    #[error("Discount {discount:.2} exceeds payable amount {payable:.2}")]
    DiscountExceedsPayable { discount: f64, payable: f64 },
    #[error("Amounts must not be negative")]
    NegativeAmount,
}

/// Result of matching a fee against the waiver list.
#[derive(Debug, Clone, PartialEq)]
pub struct WaiverResolution {
    pub waiver_amount: f64,
    pub payable_after_waiver: f64,
}

/// Find the waiver that applies to a fee and convert its percentage into a
/// currency amount.
///
/// A waiver applies when its student and academic year match and its fee-head
/// set contains the fee's head id. When several waivers apply, the first
/// matching grant in list order wins; this precedence is deliberate and
/// pinned by a test. No match means zero reduction.
pub fn resolve_waiver(
    fee_type: &FeeType,
    student_id: &str,
    academic_year: &str,
    waivers: &[Waiver],
) -> WaiverResolution {
    let percentage = waivers
        .iter()
        .find(|w| {
            w.student_id == student_id
                && w.academic_year == academic_year
                && w.fee_head_ids.iter().any(|h| h == &fee_type.fee_head_id)
        })
        .map(|w| w.percentage / 100.0)
        .unwrap_or(0.0);

    let waiver_amount = round_currency(fee_type.amount * percentage);
    WaiverResolution {
        waiver_amount,
        payable_after_waiver: round_currency(fee_type.amount - waiver_amount),
    }
}

/// The payable base before discount: waived amount plus late fee where one
/// applies. Previous and boarding fees pass `None`.
pub fn total_payable(payable_after_waiver: f64, late_fee: Option<f64>) -> f64 {
    round_currency(payable_after_waiver + late_fee.unwrap_or(0.0))
}

/// Late fee applicable for a fee on a given collection screen. Only the
/// current-fees screen charges late fees.
pub fn late_fee_for_category(fee_type: &FeeType, category: FeeCategory) -> Option<f64> {
    match category {
        FeeCategory::Current => fee_type.late_fee,
        FeeCategory::Previous | FeeCategory::Boarding => None,
    }
}

/// Full classification of a fee after a (possibly zero) payment.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeReconciliation {
    pub total_payable: f64,
    pub payable_after_discount: f64,
    pub total_paid: f64,
    pub status: FeeStatus,
    pub due_amount: f64,
}

/// Classify a fee given the payable base, the discount entered this session,
/// the cumulative amount already paid and the new payment.
///
/// The discount is capped at the total payable; exceeding it is a validation
/// error and nothing is persisted. Status follows the payable comparison:
/// PAID when total paid covers the discounted payable, PARTIAL when some but
/// not all of it is covered, UNPAID otherwise.
pub fn derive_status(
    total_payable: f64,
    discount: f64,
    previously_paid: f64,
    current_payment: f64,
) -> Result<FeeReconciliation, ReconciliationError> {
    if total_payable < 0.0 || discount < 0.0 || previously_paid < 0.0 || current_payment < 0.0 {
        return Err(ReconciliationError::NegativeAmount);
    }
    if discount > total_payable {
        return Err(ReconciliationError::DiscountExceedsPayable {
            discount,
            payable: total_payable,
        });
    }

    let total_paid = round_currency(previously_paid + current_payment);
    let payable_after_discount = round_currency(total_payable - discount);

    let status = if total_paid >= payable_after_discount {
        FeeStatus::Paid
    } else if total_paid > 0.0 {
        FeeStatus::Partial
    } else {
        FeeStatus::Unpaid
    };

    let due_amount = round_currency((payable_after_discount - total_paid).max(0.0));

    Ok(FeeReconciliation {
        total_payable,
        payable_after_discount,
        total_paid,
        status,
        due_amount,
    })
}

/// Convenience composition of all three steps for one fee row.
pub fn reconcile(
    fee_type: &FeeType,
    student_id: &str,
    academic_year: &str,
    waivers: &[Waiver],
    category: FeeCategory,
    discount: f64,
    previously_paid: f64,
    current_payment: f64,
) -> Result<(WaiverResolution, f64, FeeReconciliation), ReconciliationError> {
    let resolution = resolve_waiver(fee_type, student_id, academic_year, waivers);
    let late_fee = late_fee_for_category(fee_type, category);
    let payable = total_payable(resolution.payable_after_waiver, late_fee);
    let reconciliation = derive_status(payable, discount, previously_paid, current_payment)?;
    Ok((resolution, payable, reconciliation))
}
