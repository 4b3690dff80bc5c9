//! # Repository Module
//!
//! Database repository implementations for the Cedar ledger core.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Document Service (invoice posting, goods receipt, ...)                │
//! │       │                                                                 │
//! │       │  db.movements().record_move(input)                             │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  MovementRepository                                                    │
//! │  ├── record_move(&self, input)                                         │
//! │  ├── record_move_tx(conn, input)      ← composes into caller's tx     │
//! │  ├── list_for_key(&self, ...)                                          │
//! │  └── list_for_source(&self, ...)                                       │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every repository that participates in document posting exposes a      │
//! │  `_tx` variant taking a &mut SqliteConnection, so a sales invoice      │
//! │  can move stock, post its journal and draw its number in ONE           │
//! │  transaction.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`movement::MovementRepository`] - Append-only stock movement log + costing writes
//! - [`costing::CostRepository`] - Costing aggregate reads, valuation, rebuild
//! - [`gl::GlRepository`] - Journal posting, reversal, trial balance
//! - [`period::PeriodLockRepository`] - Accounting period locks
//! - [`sequence::SequenceRepository`] - Atomic document number allocation

pub mod costing;
pub mod gl;
pub mod movement;
pub mod period;
pub mod sequence;
