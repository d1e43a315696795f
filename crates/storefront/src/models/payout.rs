//! Payout domain types.

use chrono::{DateTime, Utc};

use handicrafts_core::{Money, OrderId, PayoutId, PayoutStatus, VendorId};

/// The vendor's share of a paid order.
#[derive(Debug, Clone)]
pub struct Payout {
    pub id: PayoutId,
    pub vendor_id: VendorId,
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}
