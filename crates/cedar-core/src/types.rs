//! # Domain Types
//!
//! Core domain types for the ledger: stock movements, costing aggregates as
//! stored, GL journals and entries, period locks and document sequences.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockMove     │   │    GlJournal    │   │    GlEntry      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  qty_in/out     │   │  journal_no     │   │  journal_id FK  │       │
//! │  │  unit costs ×2  │   │  journal_date   │   │  debit/credit×2 │       │
//! │  │  append-only    │   │  immutable      │   │  immutable      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐  ┌─────────────────┐   │
//! │  │ MoveDirection   │   │ AccountingPeriodLock │  │DocumentSequence │   │
//! │  │  Inbound        │   │  start..end, locked  │  │ prefix,next_no  │   │
//! │  │  Outbound       │   └──────────────────────┘  └─────────────────┘   │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every document-facing entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business number: (journal_no, document number) - human-readable,
//!   allocated by the sequence generator
//!
//! Every row is scoped by `company_id`; tenant isolation beyond that column
//! is enforced by the surrounding infrastructure, not here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Lbp, Qty, Usd};

// =============================================================================
// Enums
// =============================================================================

/// Direction of a stock movement.
///
/// Carried as an enum at the API so "both directions nonzero" is
/// unrepresentable; storage still splits into qty_in/qty_out columns with a
/// CHECK constraint for defense in depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum MoveDirection {
    Inbound,
    Outbound,
}

/// Originating document type of a movement or journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum SourceType {
    SalesInvoice,
    GoodsReceipt,
    SupplierInvoice,
    StockAdjustment,
    StockTransfer,
    /// A reversing journal; `source_id` points at the reversed journal.
    Reversal,
}

/// Which published rate a journal's `exchange_rate` snapshot came from.
/// Audit metadata only: amounts in the two ledgers are entered
/// independently and never derived through this rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum RateType {
    /// Central-bank official rate.
    Official,
    /// Parallel market rate.
    Market,
}

// =============================================================================
// Stock Movement Log
// =============================================================================

/// Input for recording a stock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockMove {
    pub company_id: String,
    pub item_id: String,
    pub warehouse_id: String,

    /// Optional batch/lot; selection is owned by the calling document
    /// service.
    pub batch_no: Option<String>,

    pub direction: MoveDirection,

    /// Always positive; direction is carried by `direction`.
    pub qty: Qty,

    /// Unit cost, USD ledger. Required meaning for inbound (defaults to
    /// zero for free receipts). For outbound, `None` or zero means "value
    /// at the current average" and the engine substitutes it.
    pub unit_cost_usd: Option<Usd>,

    /// Unit cost, LBP ledger. Same semantics as `unit_cost_usd`.
    pub unit_cost_lbp: Option<Lbp>,

    pub source_type: SourceType,
    pub source_id: String,
}

/// A persisted stock movement. Append-only: corrections are new offsetting
/// moves, never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMove {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub company_id: String,
    pub item_id: String,
    pub warehouse_id: String,
    pub batch_no: Option<String>,

    /// Invariant: exactly one of qty_in / qty_out is nonzero.
    pub qty_in: Qty,
    pub qty_out: Qty,

    /// The unit cost actually used: the supplied cost for inbound, the
    /// captured average for outbound. Never a placeholder.
    pub unit_cost_usd: Usd,
    pub unit_cost_lbp: Lbp,

    pub source_type: SourceType,
    pub source_id: String,

    pub created_at: DateTime<Utc>,
}

/// The stored costing aggregate: one row per (company, item, warehouse),
/// mutated exclusively by movement application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ItemWarehouseCost {
    pub company_id: String,
    pub item_id: String,
    pub warehouse_id: String,

    pub on_hand_qty: Qty,
    pub avg_cost_usd: Usd,
    pub avg_cost_lbp: Lbp,

    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// General Ledger
// =============================================================================

/// One line of a journal to be posted: debit/credit in both ledgers against
/// one account. Amounts are non-negative; sign is expressed by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_id: String,
    pub debit_usd: Usd,
    pub credit_usd: Usd,
    pub debit_lbp: Lbp,
    pub credit_lbp: Lbp,
    pub memo: Option<String>,
}

/// Input for posting a journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJournal {
    pub company_id: String,
    pub journal_date: NaiveDate,
    pub source_type: SourceType,
    pub source_id: String,
    pub rate_type: RateType,

    /// LBP per USD at 4 decimal places, snapshotted at posting time.
    /// Audit metadata only; never applied to amounts.
    pub exchange_rate: i64,

    pub memo: Option<String>,
    pub lines: Vec<JournalLine>,
}

/// A posted journal header. Created once; permanently immutable. The only
/// sanctioned undo is a reversing journal (`SourceType::Reversal` pointing
/// back at this journal's id).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GlJournal {
    pub id: String,
    pub company_id: String,

    /// Human-readable number, unique per company. Reversals carry a
    /// `VOID-…` number derived from the original.
    pub journal_no: String,

    pub journal_date: NaiveDate,
    pub source_type: SourceType,
    pub source_id: String,
    pub rate_type: RateType,

    /// See [`NewJournal::exchange_rate`].
    pub exchange_rate: i64,

    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A posted journal entry line. Immutable alongside its journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GlEntry {
    pub id: String,
    pub journal_id: String,
    pub account_id: String,

    pub debit_usd: Usd,
    pub credit_usd: Usd,
    pub debit_lbp: Lbp,
    pub credit_lbp: Lbp,

    pub memo: Option<String>,
}

// =============================================================================
// Period Locks & Document Sequences
// =============================================================================

/// An administrative posting freeze over a date range.
/// Invariant: `start_date <= end_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AccountingPeriodLock {
    pub id: String,
    pub company_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub locked: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per (company, doc_type) counter row backing document numbering.
/// Mutated atomically on every allocation; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DocumentSequence {
    pub company_id: String,
    pub doc_type: String,
    pub prefix: String,
    pub next_no: i64,
    pub padding: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
