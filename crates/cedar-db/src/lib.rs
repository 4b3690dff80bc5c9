//! # cedar-db: Storage Layer for the Cedar Ledger Core
//!
//! This crate persists the Cedar transactional ledger: stock movements,
//! costing aggregates, GL journals, period locks and document sequences.
//! It uses SQLite for storage with sqlx for async operations; all ledger
//! math lives in `cedar-core` and is pure.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cedar Data Flow                                  │
//! │                                                                         │
//! │  Document Service (sales invoice, goods receipt, adjustment)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cedar-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (movement.rs) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ MovementRepo  │    │ 001_initial_ │  │   │
//! │  │   │ WAL + busy    │◄───│ GlRepo        │    │ schema.sql   │  │   │
//! │  │   │ timeout       │    │ SequenceRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                                ▼                               │   │
//! │  │                    cedar-core (pure ledger math)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL) — immutability enforced by triggers             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (movement, gl, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cedar_db::{Database, DbConfig};
//!
//! // Create database with default config (migrations run on connect)
//! let config = DbConfig::new("path/to/cedar.db");
//! let db = Database::new(config).await?;
//!
//! // Record a goods receipt movement
//! let recorded = db.movements().record_move(input).await?;
//!
//! // Post its journal
//! let journal = db.gl().post_journal(new_journal).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::costing::{CostRepository, ValuationLine};
pub use repository::gl::{GlRepository, TrialBalanceLine};
pub use repository::movement::{MovementRepository, RecordedMove};
pub use repository::period::PeriodLockRepository;
pub use repository::sequence::SequenceRepository;
