//! Deterministic cancellation refund math. No hidden state: the same
//! booking, policy, and instant always produce the same breakdown.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use veranda_shared::CancellationPolicy;

use crate::models::PricingSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundBreakdown {
    pub base_refund: i64,
    pub cleaning_fee_refund: i64,
    pub service_fee_refund: i64,
    pub total_refund: i64,
    /// Which tier applied: 100, the policy's partial percentage, or 0.
    pub refund_percentage: i64,
}

/// Tiered by whole calendar days between the cancellation date and
/// check-in. The cleaning fee comes back whenever any base refund
/// applies; the service fee only when the policy says so.
pub fn calculate_refund(
    pricing: &PricingSnapshot,
    policy: &CancellationPolicy,
    check_in: NaiveDate,
    cancelled_at: DateTime<Utc>,
) -> RefundBreakdown {
    let days_until_checkin = (check_in - cancelled_at.date_naive()).num_days();

    let (base_refund, refund_percentage) = if days_until_checkin >= policy.free_cancellation_days {
        (pricing.nightly_subtotal, 100)
    } else if days_until_checkin >= policy.partial_refund_days {
        (
            pricing.nightly_subtotal * policy.partial_refund_percentage / 100,
            policy.partial_refund_percentage,
        )
    } else {
        (0, 0)
    };

    let cleaning_fee_refund = if refund_percentage > 0 { pricing.cleaning_fee } else { 0 };
    let service_fee_refund = if refund_percentage > 0 && policy.service_fee_refundable {
        pricing.service_fee
    } else {
        0
    };

    RefundBreakdown {
        base_refund,
        cleaning_fee_refund,
        service_fee_refund,
        total_refund: base_refund + cleaning_fee_refund + service_fee_refund,
        refund_percentage,
    }
}
