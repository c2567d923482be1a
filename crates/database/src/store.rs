use crate::error::DbError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use core_types::{
    CategoryPlace, DailyCount, Location, ManagementEntry, ManagementUpdate, MarkerPoint, Place,
    ShakeAnchor,
};

/// The storage operations the HTTP layer is built on.
///
/// This trait lets the handlers stay agnostic about whether they are talking
/// to PostgreSQL or to an in-memory double in tests. Lookups return `Option`
/// so callers decide between "bad reference" and "not found"; only genuine
/// storage failures are errors.
#[async_trait]
pub trait FacilityStore: Send + Sync {
    /// All management rows joined with their marker, type, floor and building.
    async fn list_management(&self) -> Result<Vec<ManagementEntry>, DbError>;

    async fn list_places(&self) -> Result<Vec<Place>, DbError>;

    async fn list_markers(&self) -> Result<Vec<MarkerPoint>, DbError>;

    async fn categories_by_type(&self, type_id: i32) -> Result<Vec<CategoryPlace>, DbError>;

    /// Resolves a type label to its id.
    async fn find_type_id(&self, type_name: &str) -> Result<Option<i32>, DbError>;

    /// Resolves a building (alias or display name) and floor number to the
    /// floor key markers reference.
    async fn find_floor_key(&self, location: &Location) -> Result<Option<String>, DbError>;

    /// Rebinds the marker of a management row and updates its dates in one
    /// transaction. Returns the refreshed row, or `None` when the management
    /// row or its marker does not exist (nothing is written in that case).
    async fn update_management(
        &self,
        id: i32,
        update: &ManagementUpdate,
    ) -> Result<Option<ManagementEntry>, DbError>;

    /// Deletes a management row and its marker atomically. Returns `false`
    /// when the id is unknown.
    async fn delete_management(&self, id: i32) -> Result<bool, DbError>;

    async fn find_shake_anchor(&self, id: i32) -> Result<Option<ShakeAnchor>, DbError>;

    /// Shake events per day for a management row within `[start, end]`.
    async fn daily_shake_counts(
        &self,
        id: i32,
        start: NaiveDate,
        end: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<DailyCount>, DbError>;

    /// Stores a new status and shake timestamp and appends the matching
    /// history entry. Returns `false` when the id is unknown.
    async fn record_shake(&self, id: i32, status: &str, at: DateTime<Utc>) -> Result<bool, DbError>;

    /// The database server's clock, used as a liveness probe.
    async fn server_time(&self) -> Result<DateTime<Utc>, DbError>;
}
