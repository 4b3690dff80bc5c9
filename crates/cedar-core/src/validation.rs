//! # Validation Module
//!
//! Input validation for the ledger engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Calling document service                                     │
//! │  ├── Document-level rules (batch selection, pricing, permissions)      │
//! │  └── Builds fully-formed NewStockMove / NewJournal inputs              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + journal::validate_balanced                     │
//! │  ├── Ledger invariants (positive qty, balanced entries, date ranges)   │
//! │  └── Runs before any row is written, inside the posting transaction    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (one-direction-only movements)                  │
//! │  ├── UNIQUE constraints (journal numbers, sequence rows)               │
//! │  └── RAISE triggers (append-only / immutability)                       │
//! │                                                                         │
//! │  Defense in depth: each layer catches what the one above missed        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::money::Qty;
use crate::types::NewStockMove;
use crate::MAX_MEMO_LEN;
use chrono::NaiveDate;

/// Validates a movement quantity: strictly positive, direction carried
/// separately.
///
/// ## Example
/// ```rust
/// use cedar_core::money::Qty;
/// use cedar_core::validation::validate_move_qty;
///
/// assert!(validate_move_qty(Qty::from_whole(5)).is_ok());
/// assert!(validate_move_qty(Qty::zero()).is_err());
/// assert!(validate_move_qty(Qty::from_whole(-1)).is_err());
/// ```
pub fn validate_move_qty(qty: Qty) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::NonPositiveQty { qty });
    }
    Ok(())
}

/// Validates an identifier field is present.
pub fn validate_id(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Validates a free-text memo against the storage limit.
pub fn validate_memo(field: &'static str, memo: Option<&str>) -> ValidationResult<()> {
    if let Some(m) = memo {
        if m.len() > MAX_MEMO_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_MEMO_LEN,
            });
        }
    }
    Ok(())
}

/// Validates a period lock range: `start <= end`.
pub fn validate_period_range(start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvertedPeriod { start, end });
    }
    Ok(())
}

/// Validates a full movement input before it reaches the storage layer.
pub fn validate_new_move(input: &NewStockMove) -> ValidationResult<()> {
    validate_id("company_id", &input.company_id)?;
    validate_id("item_id", &input.item_id)?;
    validate_id("warehouse_id", &input.warehouse_id)?;
    validate_id("source_id", &input.source_id)?;
    validate_move_qty(input.qty)?;
    Ok(())
}

/// Guards the persisted-row invariant: exactly one of qty_in / qty_out is
/// nonzero. The typed API cannot produce a violation; this exists for paths
/// that re-ingest raw rows (rebuild, imports).
pub fn validate_move_row(qty_in: Qty, qty_out: Qty) -> ValidationResult<()> {
    if !qty_in.is_zero() && !qty_out.is_zero() {
        return Err(ValidationError::BothDirections { qty_in, qty_out });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Lbp, Usd};
    use crate::types::{MoveDirection, SourceType};

    fn sample_move() -> NewStockMove {
        NewStockMove {
            company_id: "co-1".into(),
            item_id: "item-1".into(),
            warehouse_id: "wh-1".into(),
            batch_no: None,
            direction: MoveDirection::Inbound,
            qty: Qty::from_whole(10),
            unit_cost_usd: Some(Usd::from_major(2)),
            unit_cost_lbp: Some(Lbp::from_major(180_000)),
            source_type: SourceType::GoodsReceipt,
            source_id: "grn-1".into(),
        }
    }

    #[test]
    fn test_valid_move_passes() {
        assert!(validate_new_move(&sample_move()).is_ok());
    }

    #[test]
    fn test_zero_qty_rejected() {
        let mut m = sample_move();
        m.qty = Qty::zero();
        assert!(matches!(
            validate_new_move(&m),
            Err(ValidationError::NonPositiveQty { .. })
        ));
    }

    #[test]
    fn test_blank_company_rejected() {
        let mut m = sample_move();
        m.company_id = "  ".into();
        assert!(matches!(
            validate_new_move(&m),
            Err(ValidationError::Required { field: "company_id" })
        ));
    }

    #[test]
    fn test_both_directions_rejected() {
        assert!(validate_move_row(Qty::from_whole(1), Qty::from_whole(1)).is_err());
        assert!(validate_move_row(Qty::from_whole(1), Qty::zero()).is_ok());
        assert!(validate_move_row(Qty::zero(), Qty::from_whole(1)).is_ok());
    }

    #[test]
    fn test_inverted_period_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(validate_period_range(start, end).is_err());
        assert!(validate_period_range(end, start).is_ok());
        assert!(validate_period_range(start, start).is_ok());
    }

    #[test]
    fn test_memo_length() {
        assert!(validate_memo("memo", Some("short")).is_ok());
        let long = "x".repeat(MAX_MEMO_LEN + 1);
        assert!(validate_memo("memo", Some(&long)).is_err());
    }
}
