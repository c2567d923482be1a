use crate::error::DbError;
use crate::store::FacilityStore;
use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use core_types::{
    CategoryPlace, DailyCount, Location, ManagementEntry, ManagementUpdate, MarkerPoint, Place,
    ShakeAnchor,
};
use sqlx::postgres::PgPool;
use std::future::Future;
use std::time::Duration;

/// The joined management projection shared by the list and the post-update
/// re-read. Expands to a string literal so it can be `concat!`ed.
macro_rules! management_select {
    () => {
        r#"
        SELECT
            mg.id, mk.name, t.type_name, mg.date, mg.shake_date,
            p.name || ' ' || f.number || '층' AS location,
            mg.status
        FROM management AS mg
        JOIN marker AS mk ON mg.marker_id = mk.id
        JOIN types AS t ON mk.ckey = t.id
        JOIN floors AS f ON mk.fkey = f.name
        JOIN places AS p ON f.building_name = p.alias
        "#
    };
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self { pool, query_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Waits for checked-out connections to be returned, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed.");
    }

    /// Runs `operation` under the query timeout.
    ///
    /// When the timeout fires the future is dropped; an open transaction
    /// inside it is dropped too and therefore rolled back.
    async fn bounded<T, E, F>(&self, label: &'static str, operation: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<DbError>,
    {
        match tokio::time::timeout(self.query_timeout, operation).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                tracing::warn!(operation = label, timeout = ?self.query_timeout, "Database operation timed out.");
                Err(DbError::Timeout(self.query_timeout))
            }
        }
    }
}

/// The UTC instant at which `day` begins on a clock running at `offset`.
fn start_of_day(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc() - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}

#[async_trait]
impl FacilityStore for DbRepository {
    async fn list_management(&self) -> Result<Vec<ManagementEntry>, DbError> {
        self.bounded(
            "list_management",
            sqlx::query_as::<_, ManagementEntry>(concat!(
                management_select!(),
                "ORDER BY length(mk.name), mk.name"
            ))
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn list_places(&self) -> Result<Vec<Place>, DbError> {
        self.bounded(
            "list_places",
            sqlx::query_as::<_, Place>(
                "SELECT alias, name, lat, lng, maxfloor FROM places ORDER BY alias",
            )
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn list_markers(&self) -> Result<Vec<MarkerPoint>, DbError> {
        self.bounded(
            "list_markers",
            sqlx::query_as::<_, MarkerPoint>(
                r#"
                SELECT mk.x, mk.y, mk.name, f.number AS floor
                FROM marker AS mk
                JOIN floors AS f ON mk.fkey = f.name
                ORDER BY mk.id
                "#,
            )
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn categories_by_type(&self, type_id: i32) -> Result<Vec<CategoryPlace>, DbError> {
        self.bounded(
            "categories_by_type",
            sqlx::query_as::<_, CategoryPlace>(
                r#"
                SELECT name, type, lat AS latitude, lng AS longitude
                FROM category
                WHERE type = $1
                ORDER BY id
                "#,
            )
            .bind(type_id)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn find_type_id(&self, type_name: &str) -> Result<Option<i32>, DbError> {
        self.bounded(
            "find_type_id",
            sqlx::query_scalar::<_, i32>("SELECT id FROM types WHERE type_name = $1")
                .bind(type_name)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_floor_key(&self, location: &Location) -> Result<Option<String>, DbError> {
        self.bounded(
            "find_floor_key",
            sqlx::query_scalar::<_, String>(
                r#"
                SELECT f.name
                FROM floors AS f
                JOIN places AS p ON f.building_name = p.alias
                WHERE (p.alias = $1 OR p.name = $1) AND f.number = $2
                LIMIT 1
                "#,
            )
            .bind(&location.building)
            .bind(location.floor)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn update_management(
        &self,
        id: i32,
        update: &ManagementUpdate,
    ) -> Result<Option<ManagementEntry>, DbError> {
        self.bounded("update_management", async {
            let mut tx = self.pool.begin().await?;

            let marker_id: Option<i32> =
                sqlx::query_scalar("SELECT marker_id FROM management WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some(marker_id) = marker_id else {
                tx.rollback().await?;
                return Ok(None);
            };

            let updated = sqlx::query("UPDATE marker SET name = $1, ckey = $2, fkey = $3 WHERE id = $4")
                .bind(&update.name)
                .bind(update.type_id)
                .bind(&update.floor_key)
                .bind(marker_id)
                .execute(&mut *tx)
                .await?;
            if updated.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(None);
            }

            sqlx::query(
                r#"
                UPDATE management
                SET date = COALESCE($1, date), shake_date = COALESCE($2, shake_date)
                WHERE id = $3
                "#,
            )
            .bind(update.date)
            .bind(update.shake_date)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            let entry = sqlx::query_as::<_, ManagementEntry>(concat!(management_select!(), "WHERE mg.id = $1"))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, DbError>(Some(entry))
        })
        .await
    }

    async fn delete_management(&self, id: i32) -> Result<bool, DbError> {
        self.bounded("delete_management", async {
            // Both deletes share this transaction; an early return drops it and rolls back.
            let mut tx = self.pool.begin().await?;

            let marker_id: Option<i32> =
                sqlx::query_scalar("SELECT marker_id FROM management WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some(marker_id) = marker_id else {
                tx.rollback().await?;
                return Ok(false);
            };

            sqlx::query("DELETE FROM management WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM marker WHERE id = $1")
                .bind(marker_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, DbError>(true)
        })
        .await
    }

    async fn find_shake_anchor(&self, id: i32) -> Result<Option<ShakeAnchor>, DbError> {
        self.bounded(
            "find_shake_anchor",
            sqlx::query_as::<_, ShakeAnchor>(
                r#"
                SELECT mk.name, mg.shake_date
                FROM management AS mg
                JOIN marker AS mk ON mg.marker_id = mk.id
                WHERE mg.id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn daily_shake_counts(
        &self,
        id: i32,
        start: NaiveDate,
        end: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<DailyCount>, DbError> {
        let from = start_of_day(start, offset);
        let until = start_of_day(end.checked_add_days(Days::new(1)).unwrap_or(end), offset);
        let offset_secs = f64::from(offset.local_minus_utc());

        self.bounded(
            "daily_shake_counts",
            sqlx::query_as::<_, DailyCount>(
                r#"
                SELECT ((record_at AT TIME ZONE 'UTC') + make_interval(secs => $4))::date AS day,
                       COUNT(*) AS count
                FROM management_history
                WHERE management_id = $1 AND record_at >= $2 AND record_at < $3
                GROUP BY day
                ORDER BY day
                "#,
            )
            .bind(id)
            .bind(from)
            .bind(until)
            .bind(offset_secs)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn record_shake(&self, id: i32, status: &str, at: DateTime<Utc>) -> Result<bool, DbError> {
        self.bounded("record_shake", async {
            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query("UPDATE management SET status = $1, shake_date = $2 WHERE id = $3")
                .bind(status)
                .bind(at)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if updated.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }

            sqlx::query(
                "INSERT INTO management_history (management_id, status, record_at) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(status)
            .bind(at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, DbError>(true)
        })
        .await
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, DbError> {
        self.bounded(
            "server_time",
            sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()").fetch_one(&self.pool),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgConnectOptions;

    fn lazy_repo(timeout: Duration) -> DbRepository {
        // Never connects unless a query actually runs.
        DbRepository::new(PgPool::connect_lazy_with(PgConnectOptions::new()), timeout)
    }

    #[tokio::test]
    async fn stalled_operation_becomes_a_timeout() {
        let repo = lazy_repo(Duration::from_millis(5));
        let result = repo
            .bounded("stalled", std::future::pending::<Result<(), DbError>>())
            .await;
        assert!(matches!(result, Err(DbError::Timeout(limit)) if limit == Duration::from_millis(5)));
    }

    #[tokio::test]
    async fn finished_operation_passes_through() {
        let repo = lazy_repo(Duration::from_secs(1));
        let ok = repo.bounded("ready", async { Ok::<_, sqlx::Error>(7) }).await;
        assert!(matches!(ok, Ok(7)));

        let err = repo
            .bounded("failed", async { Err::<(), _>(sqlx::Error::RowNotFound) })
            .await;
        assert!(matches!(err, Err(DbError::QueryError(sqlx::Error::RowNotFound))));
    }

    #[test]
    fn day_boundaries_follow_the_offset() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();

        assert_eq!(start_of_day(day, utc).to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert_eq!(start_of_day(day, seoul).to_rfc3339(), "2024-04-30T15:00:00+00:00");
    }
}
