//! # GL Posting Repository
//!
//! Double-entry journal posting with balance enforcement, period-lock
//! gating and absolute immutability.
//!
//! ## Posting Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    post_journal() - One Atomic Unit                     │
//! │                                                                         │
//! │  1. VALIDATE                                                           │
//! │     └── ids, memos, Σdebit == Σcredit per currency (cedar-core)        │
//! │                                                                         │
//! │  2. DRAW JOURNAL NUMBER                                                │
//! │     └── sequence increment - a WRITE, takes the lock first             │
//! │                                                                         │
//! │  3. PERIOD LOCK CHECK                                                  │
//! │     └── same transaction as the insert, so an admin lock toggle        │
//! │         cannot race an in-flight posting for the same date             │
//! │                                                                         │
//! │  4. INSERT journal + entries, COMMIT                                   │
//! │                                                                         │
//! │  After commit the journal is permanently immutable: no update or       │
//! │  delete path exists in this repository, and RAISE triggers reject      │
//! │  raw SQL attempts too. The only sanctioned undo is reverse_journal.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The balance invariant is an engine-level contract: storage carries no
//! balance constraint, so the transactional check in step 1 is the single
//! enforcement point for the books.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::period::PeriodLockRepository;
use crate::repository::sequence::SequenceRepository;
use cedar_core::journal::{reversed_lines, validate_balanced};
use cedar_core::validation::{validate_id, validate_memo};
use cedar_core::{GlEntry, GlJournal, JournalLine, Lbp, NewJournal, SourceType, Usd};

/// Sequence doc_type for machine-posted journal vouchers.
const JOURNAL_DOC_TYPE: &str = "JV";

/// One line of a trial balance: per-account totals in both ledgers.
#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceLine {
    pub account_id: String,
    pub debit_usd: Usd,
    pub credit_usd: Usd,
    pub debit_lbp: Lbp,
    pub credit_lbp: Lbp,
}

/// Repository for GL journals and entries.
///
/// Exposes `Create` (post) and `Reverse` only. There is deliberately no
/// update or delete surface at any layer, internal tooling included.
#[derive(Debug, Clone)]
pub struct GlRepository {
    pool: SqlitePool,
}

impl GlRepository {
    /// Creates a new GlRepository.
    pub fn new(pool: SqlitePool) -> Self {
        GlRepository { pool }
    }

    /// Posts a balanced journal. See the module docs for the pipeline.
    ///
    /// Document services that also move stock should open their own
    /// transaction and compose
    /// [`crate::repository::movement::MovementRepository::record_move_tx`]
    /// with [`Self::post_journal_tx`]: the movement, the aggregate and the
    /// journal then commit or roll back together.
    pub async fn post_journal(&self, input: NewJournal) -> DbResult<GlJournal> {
        let mut tx = self.pool.begin().await?;
        let journal = Self::post_journal_tx(&mut tx, &input).await?;
        tx.commit().await?;
        Ok(journal)
    }

    /// Transaction-composable variant of [`Self::post_journal`].
    pub async fn post_journal_tx(
        conn: &mut SqliteConnection,
        input: &NewJournal,
    ) -> DbResult<GlJournal> {
        validate_id("company_id", &input.company_id)?;
        validate_id("source_id", &input.source_id)?;
        validate_memo("memo", input.memo.as_deref())?;
        for line in &input.lines {
            validate_id("account_id", &line.account_id)?;
            validate_memo("entry memo", line.memo.as_deref())?;
        }

        // Engine-level balance contract, checked before any row exists.
        validate_balanced(&input.lines)?;

        // Drawing the number is a write: the transaction holds the write
        // lock before the period-lock read below.
        let journal_no =
            SequenceRepository::next_number_tx(conn, &input.company_id, JOURNAL_DOC_TYPE).await?;

        if PeriodLockRepository::is_locked_on(conn, &input.company_id, input.journal_date).await? {
            return Err(DbError::PeriodLocked {
                company_id: input.company_id.clone(),
                date: input.journal_date,
            });
        }

        let journal = GlJournal {
            id: Uuid::new_v4().to_string(),
            company_id: input.company_id.clone(),
            journal_no,
            journal_date: input.journal_date,
            source_type: input.source_type,
            source_id: input.source_id.clone(),
            rate_type: input.rate_type,
            exchange_rate: input.exchange_rate,
            memo: input.memo.clone(),
            created_at: chrono::Utc::now(),
        };

        Self::insert_journal(conn, &journal, &input.lines).await?;

        info!(
            journal_id = %journal.id,
            journal_no = %journal.journal_no,
            company_id = %journal.company_id,
            lines = input.lines.len(),
            "Journal posted"
        );

        Ok(journal)
    }

    /// Reverses a posted journal: a NEW journal with the same accounts and
    /// amounts, debit/credit sides swapped, dated `reversal_date`. The
    /// original is untouched.
    ///
    /// Idempotent: reversing an already-reversed journal returns the
    /// existing reversal instead of stacking a second one.
    pub async fn reverse_journal(
        &self,
        company_id: &str,
        original_id: &str,
        reversal_date: chrono::NaiveDate,
        reason: &str,
    ) -> DbResult<GlJournal> {
        let mut tx = self.pool.begin().await?;

        let original = Self::fetch_journal(&mut tx, company_id, original_id)
            .await?
            .ok_or_else(|| DbError::not_found("GlJournal", original_id))?;

        // Idempotency: one reversal per journal.
        if let Some(existing) =
            Self::fetch_reversal_of(&mut tx, company_id, original_id).await?
        {
            debug!(
                original_id,
                reversal_id = %existing.id,
                "Journal already reversed, reusing"
            );
            tx.commit().await?;
            return Ok(existing);
        }

        if PeriodLockRepository::is_locked_on(&mut tx, company_id, reversal_date).await? {
            return Err(DbError::PeriodLocked {
                company_id: company_id.to_string(),
                date: reversal_date,
            });
        }

        let entries = Self::fetch_entries(&mut tx, original_id).await?;
        let lines = reversed_lines(&entries);
        validate_balanced(&lines)?;

        let reversal = GlJournal {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            journal_no: void_journal_no(&original.journal_no),
            journal_date: reversal_date,
            source_type: SourceType::Reversal,
            // The reversal points back at the journal it undoes.
            source_id: original.id.clone(),
            rate_type: original.rate_type,
            exchange_rate: original.exchange_rate,
            memo: Some(reason.to_string()),
            created_at: chrono::Utc::now(),
        };

        Self::insert_journal(&mut tx, &reversal, &lines).await?;
        tx.commit().await?;

        info!(
            original_id,
            reversal_id = %reversal.id,
            reversal_no = %reversal.journal_no,
            "Journal reversed"
        );

        Ok(reversal)
    }

    /// Gets a journal by id.
    pub async fn get_journal(
        &self,
        company_id: &str,
        journal_id: &str,
    ) -> DbResult<Option<GlJournal>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_journal(&mut conn, company_id, journal_id).await
    }

    /// Gets a journal's entries in posting order.
    pub async fn get_entries(&self, journal_id: &str) -> DbResult<Vec<GlEntry>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_entries(&mut conn, journal_id).await
    }

    /// Finds the most recent journal created by one source document.
    pub async fn journal_for_source(
        &self,
        company_id: &str,
        source_type: SourceType,
        source_id: &str,
    ) -> DbResult<Option<GlJournal>> {
        let journal = sqlx::query_as(
            r#"
            SELECT id, company_id, journal_no, journal_date, source_type, source_id,
                   rate_type, exchange_rate, memo, created_at
            FROM gl_journals
            WHERE company_id = ?1 AND source_type = ?2 AND source_id = ?3
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .bind(source_type)
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(journal)
    }

    /// Per-account debit/credit totals across all posted journals of a
    /// company. Feed for the trial balance report.
    pub async fn trial_balance(&self, company_id: &str) -> DbResult<Vec<TrialBalanceLine>> {
        let rows: Vec<(String, i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT e.account_id,
                   COALESCE(SUM(e.debit_usd), 0),
                   COALESCE(SUM(e.credit_usd), 0),
                   COALESCE(SUM(e.debit_lbp), 0),
                   COALESCE(SUM(e.credit_lbp), 0)
            FROM gl_entries e
            JOIN gl_journals j ON j.id = e.journal_id
            WHERE j.company_id = ?1
            GROUP BY e.account_id
            ORDER BY e.account_id
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(account_id, debit_usd, credit_usd, debit_lbp, credit_lbp)| TrialBalanceLine {
                    account_id,
                    debit_usd: Usd::from_raw(debit_usd),
                    credit_usd: Usd::from_raw(credit_usd),
                    debit_lbp: Lbp::from_raw(debit_lbp),
                    credit_lbp: Lbp::from_raw(credit_lbp),
                },
            )
            .collect())
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    async fn insert_journal(
        conn: &mut SqliteConnection,
        journal: &GlJournal,
        lines: &[JournalLine],
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO gl_journals
                (id, company_id, journal_no, journal_date, source_type, source_id,
                 rate_type, exchange_rate, memo, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&journal.id)
        .bind(&journal.company_id)
        .bind(&journal.journal_no)
        .bind(journal.journal_date)
        .bind(journal.source_type)
        .bind(&journal.source_id)
        .bind(journal.rate_type)
        .bind(journal.exchange_rate)
        .bind(&journal.memo)
        .bind(journal.created_at)
        .execute(&mut *conn)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO gl_entries
                    (id, journal_id, account_id,
                     debit_usd, credit_usd, debit_lbp, credit_lbp, memo)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&journal.id)
            .bind(&line.account_id)
            .bind(line.debit_usd)
            .bind(line.credit_usd)
            .bind(line.debit_lbp)
            .bind(line.credit_lbp)
            .bind(&line.memo)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    async fn fetch_journal(
        conn: &mut SqliteConnection,
        company_id: &str,
        journal_id: &str,
    ) -> DbResult<Option<GlJournal>> {
        let journal = sqlx::query_as(
            r#"
            SELECT id, company_id, journal_no, journal_date, source_type, source_id,
                   rate_type, exchange_rate, memo, created_at
            FROM gl_journals
            WHERE company_id = ?1 AND id = ?2
            "#,
        )
        .bind(company_id)
        .bind(journal_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(journal)
    }

    async fn fetch_reversal_of(
        conn: &mut SqliteConnection,
        company_id: &str,
        original_id: &str,
    ) -> DbResult<Option<GlJournal>> {
        let journal = sqlx::query_as(
            r#"
            SELECT id, company_id, journal_no, journal_date, source_type, source_id,
                   rate_type, exchange_rate, memo, created_at
            FROM gl_journals
            WHERE company_id = ?1 AND source_type = ?2 AND source_id = ?3
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .bind(SourceType::Reversal)
        .bind(original_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(journal)
    }

    async fn fetch_entries(
        conn: &mut SqliteConnection,
        journal_id: &str,
    ) -> DbResult<Vec<GlEntry>> {
        let entries = sqlx::query_as(
            r#"
            SELECT id, journal_id, account_id,
                   debit_usd, credit_usd, debit_lbp, credit_lbp, memo
            FROM gl_entries
            WHERE journal_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(journal_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }
}

/// Builds the journal number for a reversal: `VOID-{original}-{6 hex}`.
/// The original number is sanitized and capped so the result stays a valid
/// reference even for imported journals with odd numbering.
fn void_journal_no(original_no: &str) -> String {
    let base: String = original_no
        .trim()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(40)
        .collect();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("VOID-{}-{}", base, &suffix[..6])
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cedar_core::RateType;
    use chrono::NaiveDate;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn line(account: &str, debit_usd: i64, credit_usd: i64) -> JournalLine {
        JournalLine {
            account_id: account.to_string(),
            debit_usd: Usd::from_raw(debit_usd),
            credit_usd: Usd::from_raw(credit_usd),
            // Keep the LBP ledger balanced at 90,000 LL per USD for
            // readability; the engine treats the ledgers independently.
            debit_lbp: Lbp::from_raw(debit_usd * 900),
            credit_lbp: Lbp::from_raw(credit_usd * 900),
            memo: None,
        }
    }

    fn sale_journal(date: NaiveDate) -> NewJournal {
        NewJournal {
            company_id: "co-1".into(),
            journal_date: date,
            source_type: SourceType::SalesInvoice,
            source_id: "inv-1".into(),
            rate_type: RateType::Market,
            exchange_rate: 90_000_0000,
            memo: Some("cash sale".into()),
            lines: vec![
                line("cash", 1_000_000, 0),
                line("sales", 0, 1_000_000),
            ],
        }
    }

    #[tokio::test]
    async fn test_post_balanced_journal() {
        let db = test_db().await;
        let journal = db.gl().post_journal(sale_journal(d(2024, 3, 1))).await.unwrap();

        assert!(journal.journal_no.starts_with("JV-"));

        let entries = db.gl().get_entries(&journal.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].account_id, "cash");
        assert_eq!(entries[0].debit_usd, Usd::from_raw(1_000_000));
        assert_eq!(entries[1].credit_lbp, Lbp::from_raw(900_000_000));

        let found = db
            .gl()
            .journal_for_source("co-1", SourceType::SalesInvoice, "inv-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, journal.id);
    }

    #[tokio::test]
    async fn test_unbalanced_usd_rejected_and_nothing_persisted() {
        let db = test_db().await;
        let mut input = sale_journal(d(2024, 3, 1));
        input.lines[1] = line("sales", 0, 999_900);

        let err = db.gl().post_journal(input).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gl_journals")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_unbalanced_lbp_rejected_independently() {
        let db = test_db().await;
        let mut input = sale_journal(d(2024, 3, 1));
        // USD stays balanced; LBP side drifts by 1 raw unit.
        input.lines[1].credit_lbp = Lbp::from_raw(899_999_999);

        let err = db.gl().post_journal(input).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    /// Lock 2024-01-01..2024-01-31; a posting dated inside
    /// fails, one dated outside succeeds.
    #[tokio::test]
    async fn test_period_lock_gates_posting() {
        let db = test_db().await;
        db.period_locks()
            .lock("co-1", d(2024, 1, 1), d(2024, 1, 31), Some("close"))
            .await
            .unwrap();

        let err = db
            .gl()
            .post_journal(sale_journal(d(2024, 1, 15)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::PeriodLocked { .. }));

        db.gl().post_journal(sale_journal(d(2024, 2, 1))).await.unwrap();
    }

    #[tokio::test]
    async fn test_posted_journal_is_immutable_even_via_raw_sql() {
        let db = test_db().await;
        let journal = db.gl().post_journal(sale_journal(d(2024, 3, 1))).await.unwrap();

        let err: DbError = sqlx::query("UPDATE gl_journals SET memo = 'rewritten' WHERE id = ?1")
            .bind(&journal.id)
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Immutable { .. }));

        let err: DbError = sqlx::query("DELETE FROM gl_journals WHERE id = ?1")
            .bind(&journal.id)
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Immutable { .. }));

        let err: DbError = sqlx::query("UPDATE gl_entries SET debit_usd = 0")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Immutable { .. }));

        let err: DbError = sqlx::query("DELETE FROM gl_entries")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Immutable { .. }));
    }

    /// A reversal negates the original exactly, the original
    /// stays byte-identical and still rejects edits.
    #[tokio::test]
    async fn test_reversal_negates_and_preserves_original() {
        let db = test_db().await;
        let original = db.gl().post_journal(sale_journal(d(2024, 3, 1))).await.unwrap();
        let before = db.gl().get_journal("co-1", &original.id).await.unwrap().unwrap();

        let reversal = db
            .gl()
            .reverse_journal("co-1", &original.id, d(2024, 3, 5), "invoice voided")
            .await
            .unwrap();

        assert!(reversal.journal_no.starts_with("VOID-"));
        assert_eq!(reversal.source_type, SourceType::Reversal);
        assert_eq!(reversal.source_id, original.id);
        assert_eq!(reversal.rate_type, original.rate_type);
        assert_eq!(reversal.exchange_rate, original.exchange_rate);

        let orig_entries = db.gl().get_entries(&original.id).await.unwrap();
        let rev_entries = db.gl().get_entries(&reversal.id).await.unwrap();
        assert_eq!(orig_entries.len(), rev_entries.len());
        for (o, r) in orig_entries.iter().zip(rev_entries.iter()) {
            assert_eq!(o.account_id, r.account_id);
            assert_eq!(o.debit_usd, r.credit_usd);
            assert_eq!(o.credit_usd, r.debit_usd);
            assert_eq!(o.debit_lbp, r.credit_lbp);
            assert_eq!(o.credit_lbp, r.debit_lbp);
        }

        // Original untouched.
        let after = db.gl().get_journal("co-1", &original.id).await.unwrap().unwrap();
        assert_eq!(before.journal_no, after.journal_no);
        assert_eq!(before.memo, after.memo);
        assert_eq!(before.created_at, after.created_at);

        // And still immutable.
        let err: DbError = sqlx::query("UPDATE gl_journals SET memo = 'x' WHERE id = ?1")
            .bind(&original.id)
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Immutable { .. }));

        // Original + reversal net to zero on every account.
        for line in db.gl().trial_balance("co-1").await.unwrap() {
            assert_eq!(line.debit_usd, line.credit_usd);
            assert_eq!(line.debit_lbp, line.credit_lbp);
        }
    }

    #[tokio::test]
    async fn test_reversal_is_idempotent() {
        let db = test_db().await;
        let original = db.gl().post_journal(sale_journal(d(2024, 3, 1))).await.unwrap();

        let first = db
            .gl()
            .reverse_journal("co-1", &original.id, d(2024, 3, 5), "void")
            .await
            .unwrap();
        let second = db
            .gl()
            .reverse_journal("co-1", &original.id, d(2024, 3, 6), "void again")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gl_journals")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_reversal_respects_period_lock() {
        let db = test_db().await;
        let original = db.gl().post_journal(sale_journal(d(2024, 3, 1))).await.unwrap();

        db.period_locks()
            .lock("co-1", d(2024, 3, 1), d(2024, 3, 31), None)
            .await
            .unwrap();

        let err = db
            .gl()
            .reverse_journal("co-1", &original.id, d(2024, 3, 10), "void")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::PeriodLocked { .. }));

        // Dated after the locked range, the reversal goes through.
        db.gl()
            .reverse_journal("co-1", &original.id, d(2024, 4, 1), "void")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reverse_unknown_journal_not_found() {
        let db = test_db().await;
        let err = db
            .gl()
            .reverse_journal("co-1", "missing", d(2024, 3, 5), "void")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_void_journal_no_sanitizes() {
        let no = void_journal_no("JV 2024/00001 *weird*");
        assert!(no.starts_with("VOID-JV-202400001-"));
    }
}
