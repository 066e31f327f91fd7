use serde::{Deserialize, Serialize};

/// Cancellation terms snapshotted onto a booking at creation time, so a
/// host editing their policy does not change the terms of stays already
/// booked.
///
/// The free-cancellation boundary lies further from check-in than the
/// partial boundary: cancelling at least `free_cancellation_days` out
/// refunds the full nightly subtotal, cancelling at least
/// `partial_refund_days` out refunds `partial_refund_percentage` of it,
/// anything closer refunds nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancellationPolicy {
    pub free_cancellation_days: i64,
    pub partial_refund_days: i64,
    pub partial_refund_percentage: i64,
    pub service_fee_refundable: bool,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            free_cancellation_days: 14,
            partial_refund_days: 5,
            partial_refund_percentage: 50,
            service_fee_refundable: false,
        }
    }
}
