//! # Costing Module
//!
//! The weighted-moving-average costing step: a total, pure function of
//! (previous aggregate, incoming movement) → (next aggregate).
//!
//! ## Where This Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Synchronous Costing Inside One Transaction                 │
//! │                                                                         │
//! │  record_move() in cedar-db                                             │
//! │       │                                                                 │
//! │       ├── 1. validate input                                            │
//! │       ├── 2. take the write lock (aggregate row)                       │
//! │       ├── 3. read CostAggregate                                        │
//! │       ├── 4. CostAggregate::apply(effect)   ← THIS MODULE              │
//! │       ├── 5. persist movement + new aggregate                          │
//! │       └── 6. commit (or roll back everything)                          │
//! │                                                                         │
//! │  Never recomputed as a batch after the fact: the average read in       │
//! │  step 3 is the cost captured for COGS in the same transaction.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Inbound q @ c: `on_hand' = on_hand + q`;
//!   `avg' = (on_hand·avg + q·c) / on_hand'` when `on_hand' > 0`, else `c`.
//!   Computed independently for the USD and LBP ledgers.
//! - Outbound q: `on_hand' = on_hand − q`; averages untouched.
//! - Negative on-hand is applied as-is; whether it is *allowed* is an
//!   override policy owned by the calling document service.

use serde::{Deserialize, Serialize};

use crate::money::{Lbp, Qty, Usd};

// =============================================================================
// Aggregate State
// =============================================================================

/// Per (item, warehouse) costing state: on-hand quantity plus the two
/// parallel moving averages.
///
/// One row per (company, item, warehouse) in storage; mutated exclusively by
/// movement application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostAggregate {
    /// Units on hand. `Σ qty_in − Σ qty_out` over the movement log.
    pub on_hand: Qty,

    /// Weighted moving average unit cost, USD ledger.
    pub avg_cost_usd: Usd,

    /// Weighted moving average unit cost, LBP ledger.
    pub avg_cost_lbp: Lbp,
}

/// The costing-relevant effect of a single stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEffect {
    /// Receipt of `qty` units at the given dual-currency unit cost.
    Inbound {
        qty: Qty,
        unit_cost_usd: Usd,
        unit_cost_lbp: Lbp,
    },

    /// Issue of `qty` units. Carries no cost: the issue is valued at the
    /// aggregate's current average, which is why outbound moves never change
    /// the average.
    Outbound { qty: Qty },
}

impl CostAggregate {
    /// An empty aggregate: nothing on hand, zero averages.
    pub const fn empty() -> Self {
        CostAggregate {
            on_hand: Qty::zero(),
            avg_cost_usd: Usd::zero(),
            avg_cost_lbp: Lbp::zero(),
        }
    }

    /// Applies one movement and returns the next aggregate state.
    ///
    /// Total over all inputs: the degenerate cases (first receipt on an
    /// empty key, receipt on top of a negative balance) fall back to the
    /// incoming unit cost instead of dividing by a non-positive quantity.
    ///
    /// ## Example
    /// ```rust
    /// use cedar_core::costing::{CostAggregate, MoveEffect};
    /// use cedar_core::money::{Lbp, Qty, Usd};
    ///
    /// let a = CostAggregate::empty().apply(&MoveEffect::Inbound {
    ///     qty: Qty::from_whole(10),
    ///     unit_cost_usd: Usd::from_major(2),
    ///     unit_cost_lbp: Lbp::from_major(180_000),
    /// });
    /// assert_eq!(a.on_hand, Qty::from_whole(10));
    /// assert_eq!(a.avg_cost_usd, Usd::from_major(2));
    /// ```
    pub fn apply(&self, effect: &MoveEffect) -> CostAggregate {
        match *effect {
            MoveEffect::Inbound {
                qty,
                unit_cost_usd,
                unit_cost_lbp,
            } => {
                let new_on_hand = self.on_hand + qty;
                if new_on_hand.is_positive() && !self.on_hand.is_negative() {
                    CostAggregate {
                        on_hand: new_on_hand,
                        avg_cost_usd: Usd::weighted_avg(
                            self.on_hand,
                            self.avg_cost_usd,
                            qty,
                            unit_cost_usd,
                        ),
                        avg_cost_lbp: Lbp::weighted_avg(
                            self.on_hand,
                            self.avg_cost_lbp,
                            qty,
                            unit_cost_lbp,
                        ),
                    }
                } else {
                    // Empty or negative aggregate: the blend is meaningless
                    // (or a division by a non-positive quantity), so the
                    // incoming cost re-bases the average.
                    CostAggregate {
                        on_hand: new_on_hand,
                        avg_cost_usd: unit_cost_usd,
                        avg_cost_lbp: unit_cost_lbp,
                    }
                }
            }

            MoveEffect::Outbound { qty } => CostAggregate {
                on_hand: self.on_hand - qty,
                // Issues are valued at the average; they never move it.
                avg_cost_usd: self.avg_cost_usd,
                avg_cost_lbp: self.avg_cost_lbp,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
