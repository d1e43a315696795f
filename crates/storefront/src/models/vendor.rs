//! Vendor domain types.

use chrono::{DateTime, Utc};

use handicrafts_core::{UserId, VendorId, VendorStatus};

/// A seller account owned by exactly one user.
#[derive(Debug, Clone)]
pub struct Vendor {
    pub id: VendorId,
    pub owner_id: UserId,
    pub name: String,
    pub description: String,
    pub status: VendorStatus,
    /// Free-form payout instructions (bank or UPI details).
    pub payout_info: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
