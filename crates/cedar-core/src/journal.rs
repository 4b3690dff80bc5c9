//! # Journal Rules
//!
//! The double-entry contract: balance validation and reversal construction.
//!
//! ## The Balance Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per journal, independently in each ledger:                            │
//! │                                                                         │
//! │      Σ debit_usd == Σ credit_usd                                       │
//! │      Σ debit_lbp == Σ credit_lbp                                       │
//! │                                                                         │
//! │  Storage carries NO balance constraint (matching the source system);   │
//! │  this module is the single enforcement point, and the posting engine   │
//! │  calls it transactionally before any row is written. Dropping this     │
//! │  check would silently allow unbalanced books.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::money::{Lbp, Usd};
use crate::types::{GlEntry, JournalLine};

/// Validates that a line set forms a balanced double-entry journal.
///
/// ## Checks, in order
/// 1. At least one line
/// 2. No negative debit or credit (sign is expressed by side, not value)
/// 3. Σdebit == Σcredit in USD
/// 4. Σdebit == Σcredit in LBP
///
/// ## Example
/// ```rust
/// use cedar_core::journal::validate_balanced;
/// use cedar_core::money::{Lbp, Usd};
/// use cedar_core::types::JournalLine;
///
/// let lines = vec![
///     JournalLine {
///         account_id: "cash".into(),
///         debit_usd: Usd::from_major(100),
///         credit_usd: Usd::zero(),
///         debit_lbp: Lbp::from_major(9_000_000),
///         credit_lbp: Lbp::zero(),
///         memo: None,
///     },
///     JournalLine {
///         account_id: "sales".into(),
///         debit_usd: Usd::zero(),
///         credit_usd: Usd::from_major(100),
///         debit_lbp: Lbp::zero(),
///         credit_lbp: Lbp::from_major(9_000_000),
///         memo: None,
///     },
/// ];
/// assert!(validate_balanced(&lines).is_ok());
/// ```
pub fn validate_balanced(lines: &[JournalLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyJournal);
    }

    let mut net_usd = Usd::zero();
    let mut net_lbp = Lbp::zero();

    for line in lines {
        if line.debit_usd.is_negative()
            || line.credit_usd.is_negative()
            || line.debit_lbp.is_negative()
            || line.credit_lbp.is_negative()
        {
            return Err(ValidationError::NegativeAmount {
                account_id: line.account_id.clone(),
            });
        }

        net_usd += line.debit_usd - line.credit_usd;
        net_lbp += line.debit_lbp - line.credit_lbp;
    }

    if !net_usd.is_zero() {
        return Err(ValidationError::UnbalancedUsd { diff: net_usd });
    }
    if !net_lbp.is_zero() {
        return Err(ValidationError::UnbalancedLbp { diff: net_lbp });
    }

    Ok(())
}

/// Builds the line set that reverses a posted journal: same accounts, same
/// amounts, debit and credit sides swapped per line.
///
/// Swapping sides (rather than negating values) keeps every amount
/// non-negative, so the reversal passes [`validate_balanced`] like any other
/// journal.
pub fn reversed_lines(entries: &[GlEntry]) -> Vec<JournalLine> {
    entries
        .iter()
        .map(|e| JournalLine {
            account_id: e.account_id.clone(),
            debit_usd: e.credit_usd,
            credit_usd: e.debit_usd,
            debit_lbp: e.credit_lbp,
            credit_lbp: e.debit_lbp,
            memo: e.memo.clone(),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(account: &str, debit_usd: i64, credit_usd: i64, debit_lbp: i64, credit_lbp: i64) -> JournalLine {
        JournalLine {
            account_id: account.to_string(),
            debit_usd: Usd::from_raw(debit_usd),
            credit_usd: Usd::from_raw(credit_usd),
            debit_lbp: Lbp::from_raw(debit_lbp),
            credit_lbp: Lbp::from_raw(credit_lbp),
            memo: None,
        }
    }

    #[test]
    fn test_balanced_journal_passes() {
        let lines = vec![
            line("cash", 1_000_000, 0, 9_000_000_00, 0),
            line("sales", 0, 1_000_000, 0, 9_000_000_00),
        ];
        assert!(validate_balanced(&lines).is_ok());
    }

    #[test]
    fn test_empty_journal_rejected() {
        assert!(matches!(
            validate_balanced(&[]),
            Err(ValidationError::EmptyJournal)
        ));
    }

    #[test]
    fn test_usd_imbalance_rejected() {
        let lines = vec![
            line("cash", 1_000_000, 0, 100, 0),
            line("sales", 0, 999_900, 0, 100),
        ];
        match validate_balanced(&lines) {
            Err(ValidationError::UnbalancedUsd { diff }) => {
                assert_eq!(diff, Usd::from_raw(100));
            }
            other => panic!("expected UnbalancedUsd, got {other:?}"),
        }
    }

    #[test]
    fn test_lbp_imbalance_rejected_even_when_usd_balances() {
        // The two ledgers balance independently; one passing never excuses
        // the other.
        let lines = vec![
            line("cash", 1_000_000, 0, 9_000_000_00, 0),
            line("sales", 0, 1_000_000, 0, 8_999_999_00),
        ];
        assert!(matches!(
            validate_balanced(&lines),
            Err(ValidationError::UnbalancedLbp { .. })
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let lines = vec![
            line("cash", -100, 0, 0, 0),
            line("sales", 0, -100, 0, 0),
        ];
        assert!(matches!(
            validate_balanced(&lines),
            Err(ValidationError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn test_reversal_swaps_sides_and_balances() {
        let entries = vec![
            GlEntry {
                id: "e1".into(),
                journal_id: "j1".into(),
                account_id: "cash".into(),
                debit_usd: Usd::from_major(50),
                credit_usd: Usd::zero(),
                debit_lbp: Lbp::from_major(4_500_000),
                credit_lbp: Lbp::zero(),
                memo: Some("payment".into()),
            },
            GlEntry {
                id: "e2".into(),
                journal_id: "j1".into(),
                account_id: "receivable".into(),
                debit_usd: Usd::zero(),
                credit_usd: Usd::from_major(50),
                debit_lbp: Lbp::zero(),
                credit_lbp: Lbp::from_major(4_500_000),
                memo: None,
            },
        ];

        let reversed = reversed_lines(&entries);
        assert_eq!(reversed.len(), 2);
        assert_eq!(reversed[0].account_id, "cash");
        assert_eq!(reversed[0].credit_usd, Usd::from_major(50));
        assert_eq!(reversed[0].debit_usd, Usd::zero());
        assert_eq!(reversed[1].debit_usd, Usd::from_major(50));
        assert!(validate_balanced(&reversed).is_ok());
    }
}
