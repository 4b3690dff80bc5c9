//! # Error Types
//!
//! Domain-specific error types for cedar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cedar-core errors (this file)                                         │
//! │  └── ValidationError  - malformed input, unbalanced journals           │
//! │                                                                         │
//! │  cedar-db errors (separate crate)                                      │
//! │  └── DbError          - storage failures plus the transactional        │
//! │                         taxonomy: PeriodLocked, Immutable, Contention  │
//! │                                                                         │
//! │  Flow: ValidationError → DbError → caller (document service / API)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (company, amounts, dates)
//! 3. Errors are enum variants, never String
//! 4. Validation errors are never retried automatically; they are surfaced
//!    straight back to the caller

use thiserror::Error;

use crate::money::{Lbp, Qty, Usd};

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These fail fast, before any row is written, and abort the whole enclosing
/// transaction when raised mid-flight.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required identifier is missing or blank.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A movement quantity must be strictly positive; direction is carried
    /// separately, never through the sign of the quantity.
    #[error("movement qty must be positive, got {qty}")]
    NonPositiveQty { qty: Qty },

    /// A persisted stock movement row may carry qty_in or qty_out, never
    /// both. Unreachable through the typed API; guards the storage layer.
    #[error("stock move has both qty_in {qty_in} and qty_out {qty_out}")]
    BothDirections { qty_in: Qty, qty_out: Qty },

    /// A journal must carry at least one entry line.
    #[error("journal has no entry lines")]
    EmptyJournal,

    /// The USD ledger of a journal does not balance.
    #[error("journal out of balance in USD: debits exceed credits by {diff}")]
    UnbalancedUsd { diff: Usd },

    /// The LBP ledger of a journal does not balance.
    #[error("journal out of balance in LBP: debits exceed credits by {diff}")]
    UnbalancedLbp { diff: Lbp },

    /// A journal entry line carries a negative debit or credit. Negative
    /// amounts are expressed by swapping sides, exactly as a reversal does.
    #[error("journal line for account {account_id} has a negative amount")]
    NegativeAmount { account_id: String },

    /// A period lock range must satisfy start_date ≤ end_date.
    #[error("period lock range is inverted: {start} > {end}")]
    InvertedPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// Free-text field exceeds its storage limit.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
