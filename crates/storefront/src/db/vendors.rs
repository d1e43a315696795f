//! Vendor repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use handicrafts_core::{UserId, VendorId, VendorStatus};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Vendor;

const VENDOR_COLUMNS: &str =
    "id, owner_id, name, description, status, payout_info, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct VendorRow {
    id: VendorId,
    owner_id: UserId,
    name: String,
    description: String,
    status: VendorStatus,
    payout_info: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(r: VendorRow) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            name: r.name,
            description: r.description,
            status: r.status,
            payout_info: r.payout_info,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Repository for vendor database operations.
pub struct VendorRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VendorRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a new vendor application in `PENDING` status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a vendor.
    pub async fn create(
        &self,
        owner_id: UserId,
        name: &str,
        description: &str,
        payout_info: &str,
    ) -> Result<Vendor, RepositoryError> {
        let now = Utc::now();
        let row: VendorRow = sqlx::query_as(&format!(
            "INSERT INTO vendors (owner_id, name, description, status, payout_info, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING {VENDOR_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .bind(VendorStatus::Pending)
        .bind(payout_info)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "vendor application"))?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let row: Option<VendorRow> =
            sqlx::query_as(&format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(Vendor::from))
    }

    /// The vendor owned by a user, if they have applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_owner(&self, owner_id: UserId) -> Result<Option<Vendor>, RepositoryError> {
        let row: Option<VendorRow> = sqlx::query_as(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE owner_id = ?"
        ))
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Vendor::from))
    }

    /// All vendors, pending applications first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Vendor>, RepositoryError> {
        let rows: Vec<VendorRow> = sqlx::query_as(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors \
             ORDER BY CASE status WHEN 'PENDING' THEN 0 ELSE 1 END, created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Vendor::from).collect())
    }

    /// Overwrite a vendor's status.
    ///
    /// Callers are responsible for checking that the transition is allowed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vendor doesn't exist.
    pub async fn set_status(
        &self,
        id: VendorId,
        status: VendorStatus,
    ) -> Result<Vendor, RepositoryError> {
        let row: Option<VendorRow> = sqlx::query_as(&format!(
            "UPDATE vendors SET status = ?, updated_at = ? WHERE id = ? \
             RETURNING {VENDOR_COLUMNS}"
        ))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Vendor::from).ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::{pool, user};

    #[tokio::test]
    async fn test_one_application_per_user() {
        let pool = pool().await;
        let owner = user(&pool, "maker@example.com").await;
        let repo = VendorRepository::new(&pool);

        let vendor = repo
            .create(owner.id, "Kaveri Crafts", "Bamboo work", "UPI kaveri@upi")
            .await
            .unwrap();
        assert_eq!(vendor.status, VendorStatus::Pending);

        let err = repo.create(owner.id, "Again", "", "").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_status() {
        let pool = pool().await;
        let owner = user(&pool, "maker@example.com").await;
        let repo = VendorRepository::new(&pool);
        let vendor = repo.create(owner.id, "Kaveri Crafts", "", "").await.unwrap();

        let approved = repo
            .set_status(vendor.id, VendorStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, VendorStatus::Approved);
        assert_eq!(
            repo.get_by_owner(owner.id).await.unwrap().unwrap().status,
            VendorStatus::Approved
        );
    }
}
