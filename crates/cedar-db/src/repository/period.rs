//! # Accounting Period Lock Repository
//!
//! The gate consulted by the GL posting engine before admitting a journal,
//! plus the administrative write side (creating and toggling locks).
//!
//! The check itself runs on the poster's transaction
//! ([`PeriodLockRepository::is_locked_on`]) so a lock toggle cannot race an
//! in-flight journal for the same date: whichever commits first wins, the
//! other observes it.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use cedar_core::validation::validate_period_range;
use cedar_core::AccountingPeriodLock;

/// Repository for accounting period locks.
#[derive(Debug, Clone)]
pub struct PeriodLockRepository {
    pool: SqlitePool,
}

impl PeriodLockRepository {
    /// Creates a new PeriodLockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PeriodLockRepository { pool }
    }

    /// True iff any active lock range of the company covers `date`.
    pub async fn is_locked(&self, company_id: &str, date: NaiveDate) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::is_locked_on(&mut conn, company_id, date).await
    }

    /// Connection-composable variant used by the posting engine, so the
    /// check shares the posting transaction.
    pub async fn is_locked_on(
        conn: &mut SqliteConnection,
        company_id: &str,
        date: NaiveDate,
    ) -> DbResult<bool> {
        let locked: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM accounting_period_locks
                WHERE company_id = ?1
                  AND locked = 1
                  AND ?2 BETWEEN start_date AND end_date
            )
            "#,
        )
        .bind(company_id)
        .bind(date)
        .fetch_one(&mut *conn)
        .await?;

        Ok(locked)
    }

    /// Creates an active lock over a date range. Administrative operation.
    pub async fn lock(
        &self,
        company_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: Option<&str>,
    ) -> DbResult<AccountingPeriodLock> {
        validate_period_range(start_date, end_date)?;

        let row = AccountingPeriodLock {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            start_date,
            end_date,
            locked: true,
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO accounting_period_locks
                (id, company_id, start_date, end_date, locked, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&row.id)
        .bind(&row.company_id)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.locked)
        .bind(&row.reason)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            company_id,
            start = %start_date,
            end = %end_date,
            "Accounting period locked"
        );

        Ok(row)
    }

    /// Toggles an existing lock. Unlocking is the only remedy for a
    /// `PeriodLocked` posting rejection.
    pub async fn set_locked(&self, lock_id: &str, locked: bool) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounting_period_locks
            SET locked = ?2
            WHERE id = ?1
            "#,
        )
        .bind(lock_id)
        .bind(locked)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("PeriodLock", lock_id));
        }

        debug!(lock_id, locked, "Period lock toggled");
        Ok(())
    }

    /// Lists all lock rows of a company, newest range first.
    pub async fn list(&self, company_id: &str) -> DbResult<Vec<AccountingPeriodLock>> {
        let rows = sqlx::query_as(
            r#"
            SELECT id, company_id, start_date, end_date, locked, reason, created_at
            FROM accounting_period_locks
            WHERE company_id = ?1
            ORDER BY start_date DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_lock_covers_range_inclusive() {
        let db = test_db().await;
        let repo = db.period_locks();

        repo.lock("co-1", d(2024, 1, 1), d(2024, 1, 31), Some("year-end close"))
            .await
            .unwrap();

        assert!(repo.is_locked("co-1", d(2024, 1, 1)).await.unwrap());
        assert!(repo.is_locked("co-1", d(2024, 1, 15)).await.unwrap());
        assert!(repo.is_locked("co-1", d(2024, 1, 31)).await.unwrap());
        assert!(!repo.is_locked("co-1", d(2024, 2, 1)).await.unwrap());
        assert!(!repo.is_locked("co-1", d(2023, 12, 31)).await.unwrap());
        // Other companies are unaffected.
        assert!(!repo.is_locked("co-2", d(2024, 1, 15)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_reopens_period() {
        let db = test_db().await;
        let repo = db.period_locks();

        let lock = repo
            .lock("co-1", d(2024, 1, 1), d(2024, 1, 31), None)
            .await
            .unwrap();
        assert!(repo.is_locked("co-1", d(2024, 1, 15)).await.unwrap());

        repo.set_locked(&lock.id, false).await.unwrap();
        assert!(!repo.is_locked("co-1", d(2024, 1, 15)).await.unwrap());

        repo.set_locked(&lock.id, true).await.unwrap();
        assert!(repo.is_locked("co-1", d(2024, 1, 15)).await.unwrap());
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let db = test_db().await;
        let err = db
            .period_locks()
            .lock("co-1", d(2024, 2, 1), d(2024, 1, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_single_day_lock() {
        let db = test_db().await;
        let repo = db.period_locks();
        repo.lock("co-1", d(2024, 3, 15), d(2024, 3, 15), None)
            .await
            .unwrap();
        assert!(repo.is_locked("co-1", d(2024, 3, 15)).await.unwrap());
        assert!(!repo.is_locked("co-1", d(2024, 3, 16)).await.unwrap());
    }
}
