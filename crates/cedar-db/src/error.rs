//! # Database Error Types
//!
//! Error types for the storage engine, including the ledger's transactional
//! taxonomy.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ledger Error Taxonomy                                │
//! │                                                                         │
//! │  Validation     malformed input (bad qty, unbalanced journal).         │
//! │                 Surfaced immediately; never retried automatically.     │
//! │                                                                         │
//! │  Immutable      any edit/delete of a posted journal, entry or stock    │
//! │                 move. Always rejected; the only remedy is a            │
//! │                 reversing journal.                                     │
//! │                                                                         │
//! │  PeriodLocked   journal date inside a locked accounting period.        │
//! │                 Resolved only by an explicit administrative unlock.    │
//! │                                                                         │
//! │  Contention     lock wait / busy timeout on a hot aggregate or         │
//! │                 sequence row. Safe to retry the whole calling          │
//! │                 transaction.                                           │
//! │                                                                         │
//! │  No partial commits are possible: every failure mode aborts the        │
//! │  entire enclosing transaction.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use cedar_core::ValidationError;

/// Storage-engine errors.
///
/// Wraps sqlx errors with ledger-domain categorization so callers can branch
/// on retryability without parsing messages.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed input, rejected before any row was written.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// An edit or delete touched an immutable row. Raised by the RAISE
    /// triggers even for raw SQL, so this holds unconditionally.
    #[error("immutable record: {message}")]
    Immutable { message: String },

    /// The journal date falls inside a locked accounting period.
    #[error("accounting period is locked for {company_id} on {date}")]
    PeriodLocked {
        company_id: String,
        date: NaiveDate,
    },

    /// Lock wait or busy timeout on a hot row. The whole calling
    /// transaction may be retried.
    #[error("database contention, retry the transaction: {0}")]
    Contention(String),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (duplicate journal number, sequence row).
    #[error("duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Internal database error.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when retrying the whole calling transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Contention(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound            → DbError::NotFound
/// Database: "… immutable …"           → DbError::Immutable   (RAISE triggers)
/// Database: "… append-only …"         → DbError::Immutable
/// Database: "database is locked"      → DbError::Contention  (SQLITE_BUSY)
/// Database: "UNIQUE constraint …"     → DbError::UniqueViolation
/// Database: "FOREIGN KEY constraint"  → DbError::ForeignKeyViolation
/// sqlx::Error::PoolTimedOut           → DbError::Contention
/// Other                               → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains("immutable") || msg.contains("append-only") {
                    // Message text comes from our RAISE(ABORT, ...) triggers.
                    DbError::Immutable {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Contention(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::Contention("connection pool timed out".to_string())
            }

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cedar_core::Qty;

    #[test]
    fn test_validation_error_converts() {
        let err: DbError = ValidationError::NonPositiveQty { qty: Qty::zero() }.into();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_contention_is_retryable() {
        let err = DbError::Contention("database is locked".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_period_locked_message() {
        let err = DbError::PeriodLocked {
            company_id: "co-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "accounting period is locked for co-1 on 2024-01-15"
        );
    }
}
