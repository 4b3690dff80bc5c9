//! # Document Sequence Repository
//!
//! Atomic per-(company, doc_type) counters producing human-readable
//! document numbers.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  next_number("co-1", "SI")                                             │
//! │       │                                                                 │
//! │       ├── INSERT OR IGNORE row (prefix="SI", next_no=1)   ← write,     │
//! │       │                                                     takes lock │
//! │       ├── UPDATE next_no = next_no + 1 RETURNING …         ← atomic    │
//! │       │                                                                 │
//! │       └── format: "SI-2026-00042"                                      │
//! │                                                                         │
//! │  Concurrent callers serialize on the write lock: N parallel            │
//! │  allocations yield N distinct, strictly increasing numbers.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Year Label Quirk
//! The year in the formatted number is the calendar year AT ALLOCATION TIME
//! (UTC wall clock), not any document date, and the counter never resets.
//! Numbers allocated around New Year's Eve therefore look non-contiguous
//! per year label ("SI-2025-00041" followed by "SI-2026-00042"). This is
//! the historical numbering behavior and reports rely on it.

use chrono::{Datelike, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use cedar_core::{DocumentSequence, DEFAULT_SEQUENCE_PADDING};

/// Repository for document number allocation.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Allocates the next document number for a (company, doc_type) pair.
    ///
    /// First call for an unseen pair initializes the row (prefix =
    /// doc_type, next_no = 1) before allocating. Allocation is atomic;
    /// numbers are never reused even if the enclosing document is later
    /// abandoned (gaps are acceptable, duplicates are not).
    pub async fn next_number(&self, company_id: &str, doc_type: &str) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        let number = Self::next_number_tx(&mut tx, company_id, doc_type).await?;
        tx.commit().await?;
        Ok(number)
    }

    /// Transaction-composable variant: document services draw the number
    /// inside the same transaction that creates the document, so a rollback
    /// releases nothing persistent except a counter gap.
    pub async fn next_number_tx(
        conn: &mut SqliteConnection,
        company_id: &str,
        doc_type: &str,
    ) -> DbResult<String> {
        // Initialize-if-missing. A write either way, so the lock is held
        // before the increment below reads the counter.
        sqlx::query(
            r#"
            INSERT INTO document_sequences (company_id, doc_type, prefix, next_no, padding)
            VALUES (?1, ?2, ?2, 1, ?3)
            ON CONFLICT (company_id, doc_type) DO NOTHING
            "#,
        )
        .bind(company_id)
        .bind(doc_type)
        .bind(DEFAULT_SEQUENCE_PADDING)
        .execute(&mut *conn)
        .await?;

        // Claim the current value and advance the counter in one statement.
        let (prefix, claimed, padding): (String, i64, i64) = sqlx::query_as(
            r#"
            UPDATE document_sequences
            SET next_no = next_no + 1
            WHERE company_id = ?1 AND doc_type = ?2
            RETURNING prefix, next_no - 1, padding
            "#,
        )
        .bind(company_id)
        .bind(doc_type)
        .fetch_one(&mut *conn)
        .await?;

        // Wall-clock year at allocation time, not any document date.
        let year = Utc::now().year();
        let number = format!(
            "{}-{}-{:0width$}",
            prefix,
            year,
            claimed,
            width = padding.max(1) as usize
        );

        debug!(company_id, doc_type, number, "Document number allocated");
        Ok(number)
    }

    /// Reads a sequence row without allocating. Diagnostics only.
    pub async fn peek(
        &self,
        company_id: &str,
        doc_type: &str,
    ) -> DbResult<Option<DocumentSequence>> {
        let row = sqlx::query_as(
            r#"
            SELECT company_id, doc_type, prefix, next_no, padding
            FROM document_sequences
            WHERE company_id = ?1 AND doc_type = ?2
            "#,
        )
        .bind(company_id)
        .bind(doc_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use std::collections::HashSet;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn numeric_suffix(number: &str) -> i64 {
        number.rsplit('-').next().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_first_allocation_initializes_row() {
        let db = test_db().await;
        let repo = db.sequences();

        let year = Utc::now().year();
        let n1 = repo.next_number("co-1", "SI").await.unwrap();
        assert_eq!(n1, format!("SI-{year}-00001"));

        let row = repo.peek("co-1", "SI").await.unwrap().unwrap();
        assert_eq!(row.next_no, 2);
        assert_eq!(row.prefix, "SI");
    }

    #[tokio::test]
    async fn test_sequences_are_independent_per_company_and_type() {
        let db = test_db().await;
        let repo = db.sequences();

        assert_eq!(numeric_suffix(&repo.next_number("co-1", "SI").await.unwrap()), 1);
        assert_eq!(numeric_suffix(&repo.next_number("co-1", "SI").await.unwrap()), 2);
        assert_eq!(numeric_suffix(&repo.next_number("co-1", "GR").await.unwrap()), 1);
        assert_eq!(numeric_suffix(&repo.next_number("co-2", "SI").await.unwrap()), 1);
        assert_eq!(numeric_suffix(&repo.next_number("co-1", "SI").await.unwrap()), 3);
    }

    #[tokio::test]
    async fn test_padding_overflow_keeps_full_digits() {
        let db = test_db().await;

        sqlx::query(
            "INSERT INTO document_sequences (company_id, doc_type, prefix, next_no, padding)
             VALUES ('co-1', 'SI', 'SI', 123456, 5)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let n = db.sequences().next_number("co-1", "SI").await.unwrap();
        assert!(n.ends_with("-123456"), "got {n}");
    }

    /// N parallel callers get N distinct, strictly increasing values with
    /// zero duplicates. Needs a file-backed database: in-memory SQLite is
    /// limited to a single connection.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("seq.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();

        const CALLERS: usize = 16;
        let mut handles = Vec::new();
        for _ in 0..CALLERS {
            let repo = db.sequences();
            handles.push(tokio::spawn(async move {
                repo.next_number("co-1", "SI").await.unwrap()
            }));
        }

        let mut seen = HashSet::new();
        for h in handles {
            let number = h.await.unwrap();
            assert!(seen.insert(numeric_suffix(&number)), "duplicate: {number}");
        }

        let allocated: Vec<i64> = {
            let mut v: Vec<i64> = seen.into_iter().collect();
            v.sort_unstable();
            v
        };
        assert_eq!(allocated, (1..=CALLERS as i64).collect::<Vec<_>>());

        let row = db.sequences().peek("co-1", "SI").await.unwrap().unwrap();
        assert_eq!(row.next_no, CALLERS as i64 + 1);
    }
}
