//! # cedar-core: Pure Ledger Logic for Cedar
//!
//! This crate is the **heart** of the Cedar ledger engine. It contains the
//! numeric discipline and the double-entry rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cedar Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Document Services (external collaborators)           │   │
//! │  │   sales invoice • goods receipt • adjustment • transfer         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cedar-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  costing  │  │  journal  │  │ validation│  │   │
//! │  │   │ Usd, Lbp  │  │ weighted  │  │  balance  │  │   rules   │  │   │
//! │  │   │   Qty     │  │  average  │  │ reversal  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    cedar-db (Storage Engine)                    │   │
//! │  │        SQLite transactions, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Fixed-point `Usd`/`Lbp`/`Qty` types (no floating point!)
//! - [`costing`] - Weighted-moving-average aggregate step, dual currency
//! - [`journal`] - Double-entry balance validation and reversal construction
//! - [`types`] - Domain types (StockMove, GlJournal, GlEntry, ...)
//! - [`error`] - Typed validation errors
//! - [`validation`] - Input validation for movements, locks, memos
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic - same input =
//!    same output. Even the clock is an input (callers pass timestamps).
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Fixed-Point Money**: i64 at explicit scales, i128 intermediates,
//!    half-away-from-zero rounding - never floats
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod costing;
pub mod error;
pub mod journal;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use costing::{CostAggregate, MoveEffect};
pub use error::{ValidationError, ValidationResult};
pub use money::{Lbp, Qty, Usd};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of free-text memo fields on journals and entries.
///
/// ## Business Reason
/// Memos are audit annotations, not documents; a bound keeps report exports
/// and replication payloads predictable.
pub const MAX_MEMO_LEN: usize = 500;

/// Default zero-padding width for generated document numbers
/// (`SI-2026-00042` style). Stored per sequence row so individual companies
/// can widen it without renumbering.
pub const DEFAULT_SEQUENCE_PADDING: i64 = 5;
