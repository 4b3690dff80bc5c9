//! # Stock Movement Repository
//!
//! The append-only movement log and its synchronous costing update.
//!
//! ## Posting Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_move() - One Atomic Unit                      │
//! │                                                                         │
//! │  1. VALIDATE                                                           │
//! │     └── positive qty, present ids (cedar-core::validation)             │
//! │                                                                         │
//! │  2. LOCK                                                               │
//! │     └── ensure-insert the aggregate row - a WRITE, so this             │
//! │         transaction holds the database write lock before reading       │
//! │                                                                         │
//! │  3. READ AGGREGATE                                                     │
//! │     └── the (item, warehouse) costing state, under the lock            │
//! │                                                                         │
//! │  4. COST-FILL                                                          │
//! │     └── outbound with omitted/zero cost takes the CURRENT average;     │
//! │         the persisted row carries the cost actually used for COGS      │
//! │                                                                         │
//! │  5. APPLY COSTING STEP (cedar-core::costing, pure)                     │
//! │                                                                         │
//! │  6. PERSIST movement + new aggregate, COMMIT                           │
//! │                                                                         │
//! │  Any failure rolls back the whole unit: the log and the aggregate      │
//! │  are never out of step. Never a post-hoc batch recomputation.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use cedar_core::costing::{CostAggregate, MoveEffect};
use cedar_core::validation::validate_new_move;
use cedar_core::{ItemWarehouseCost, Lbp, MoveDirection, NewStockMove, Qty, StockMove, Usd};

/// Result of recording a movement: the persisted row (with the cost
/// actually applied) plus the post-move aggregate snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedMove {
    pub movement: StockMove,
    pub aggregate: ItemWarehouseCost,
}

/// Repository for the stock movement log.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Records a movement and updates the costing aggregate in one
    /// transaction.
    ///
    /// Document services that also post a journal should instead open their
    /// own transaction and call [`Self::record_move_tx`] followed by
    /// [`crate::repository::gl::GlRepository::post_journal_tx`], so the
    /// movement, the aggregate and the journal commit or roll back together.
    pub async fn record_move(&self, input: NewStockMove) -> DbResult<RecordedMove> {
        let mut tx = self.pool.begin().await?;
        let recorded = Self::record_move_tx(&mut tx, &input).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    /// Transaction-composable variant of [`Self::record_move`].
    ///
    /// The first statement issued here is a write against the aggregate
    /// row, which takes SQLite's single write lock; concurrent movements on
    /// any key serialize at that point and the read below observes a stable
    /// aggregate. Do not run read statements on this transaction before
    /// calling this, or the lock acquisition degrades into an upgrade race.
    pub async fn record_move_tx(
        conn: &mut SqliteConnection,
        input: &NewStockMove,
    ) -> DbResult<RecordedMove> {
        validate_new_move(input)?;

        let now = Utc::now();

        debug!(
            company_id = %input.company_id,
            item_id = %input.item_id,
            warehouse_id = %input.warehouse_id,
            qty = %input.qty,
            direction = ?input.direction,
            "Recording stock movement"
        );

        // Step 2: ensure the aggregate row exists. This is the write that
        // acquires the lock, whether or not the row is new.
        sqlx::query(
            r#"
            INSERT INTO item_warehouse_costs
                (company_id, item_id, warehouse_id, on_hand_qty, avg_cost_usd, avg_cost_lbp, updated_at)
            VALUES (?1, ?2, ?3, 0, 0, 0, ?4)
            ON CONFLICT (company_id, item_id, warehouse_id) DO NOTHING
            "#,
        )
        .bind(&input.company_id)
        .bind(&input.item_id)
        .bind(&input.warehouse_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        // Step 3: read the aggregate under the lock.
        let current: ItemWarehouseCost = sqlx::query_as(
            r#"
            SELECT company_id, item_id, warehouse_id,
                   on_hand_qty, avg_cost_usd, avg_cost_lbp, updated_at
            FROM item_warehouse_costs
            WHERE company_id = ?1 AND item_id = ?2 AND warehouse_id = ?3
            "#,
        )
        .bind(&input.company_id)
        .bind(&input.item_id)
        .bind(&input.warehouse_id)
        .fetch_one(&mut *conn)
        .await?;

        let aggregate = CostAggregate {
            on_hand: current.on_hand_qty,
            avg_cost_usd: current.avg_cost_usd,
            avg_cost_lbp: current.avg_cost_lbp,
        };

        // Step 4: resolve the cost this movement is valued at.
        let (effect, used_cost_usd, used_cost_lbp, qty_in, qty_out) = match input.direction {
            MoveDirection::Inbound => {
                let cost_usd = input.unit_cost_usd.unwrap_or(Usd::zero());
                let cost_lbp = input.unit_cost_lbp.unwrap_or(Lbp::zero());
                (
                    MoveEffect::Inbound {
                        qty: input.qty,
                        unit_cost_usd: cost_usd,
                        unit_cost_lbp: cost_lbp,
                    },
                    cost_usd,
                    cost_lbp,
                    input.qty,
                    Qty::zero(),
                )
            }
            MoveDirection::Outbound => {
                // Omitted/zero cost means "value at the current average",
                // captured per currency under the lock taken above.
                let cost_usd = input
                    .unit_cost_usd
                    .filter(|c| !c.is_zero())
                    .unwrap_or(aggregate.avg_cost_usd);
                let cost_lbp = input
                    .unit_cost_lbp
                    .filter(|c| !c.is_zero())
                    .unwrap_or(aggregate.avg_cost_lbp);
                (
                    MoveEffect::Outbound { qty: input.qty },
                    cost_usd,
                    cost_lbp,
                    Qty::zero(),
                    input.qty,
                )
            }
        };

        // Step 5: pure costing step.
        let next = aggregate.apply(&effect);

        // Step 6: persist both sides.
        sqlx::query(
            r#"
            UPDATE item_warehouse_costs
            SET on_hand_qty = ?4, avg_cost_usd = ?5, avg_cost_lbp = ?6, updated_at = ?7
            WHERE company_id = ?1 AND item_id = ?2 AND warehouse_id = ?3
            "#,
        )
        .bind(&input.company_id)
        .bind(&input.item_id)
        .bind(&input.warehouse_id)
        .bind(next.on_hand)
        .bind(next.avg_cost_usd)
        .bind(next.avg_cost_lbp)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let movement = StockMove {
            id: Uuid::new_v4().to_string(),
            company_id: input.company_id.clone(),
            item_id: input.item_id.clone(),
            warehouse_id: input.warehouse_id.clone(),
            batch_no: input.batch_no.clone(),
            qty_in,
            qty_out,
            unit_cost_usd: used_cost_usd,
            unit_cost_lbp: used_cost_lbp,
            source_type: input.source_type,
            source_id: input.source_id.clone(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_moves
                (id, company_id, item_id, warehouse_id, batch_no,
                 qty_in, qty_out, unit_cost_usd, unit_cost_lbp,
                 source_type, source_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.company_id)
        .bind(&movement.item_id)
        .bind(&movement.warehouse_id)
        .bind(&movement.batch_no)
        .bind(movement.qty_in)
        .bind(movement.qty_out)
        .bind(movement.unit_cost_usd)
        .bind(movement.unit_cost_lbp)
        .bind(movement.source_type)
        .bind(&movement.source_id)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        debug!(
            move_id = %movement.id,
            on_hand = %next.on_hand,
            avg_cost_usd = %next.avg_cost_usd,
            "Movement recorded"
        );

        Ok(RecordedMove {
            movement,
            aggregate: ItemWarehouseCost {
                company_id: input.company_id.clone(),
                item_id: input.item_id.clone(),
                warehouse_id: input.warehouse_id.clone(),
                on_hand_qty: next.on_hand,
                avg_cost_usd: next.avg_cost_usd,
                avg_cost_lbp: next.avg_cost_lbp,
                updated_at: now,
            },
        })
    }

    /// Lists the movement log for one (item, warehouse), in commit order.
    pub async fn list_for_key(
        &self,
        company_id: &str,
        item_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Vec<StockMove>> {
        let moves = sqlx::query_as(
            r#"
            SELECT id, company_id, item_id, warehouse_id, batch_no,
                   qty_in, qty_out, unit_cost_usd, unit_cost_lbp,
                   source_type, source_id, created_at
            FROM stock_moves
            WHERE company_id = ?1 AND item_id = ?2 AND warehouse_id = ?3
            ORDER BY created_at, id
            "#,
        )
        .bind(company_id)
        .bind(item_id)
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(moves)
    }

    /// Lists movements created by one source document.
    pub async fn list_for_source(
        &self,
        company_id: &str,
        source_id: &str,
    ) -> DbResult<Vec<StockMove>> {
        let moves = sqlx::query_as(
            r#"
            SELECT id, company_id, item_id, warehouse_id, batch_no,
                   qty_in, qty_out, unit_cost_usd, unit_cost_lbp,
                   source_type, source_id, created_at
            FROM stock_moves
            WHERE company_id = ?1 AND source_id = ?2
            ORDER BY created_at, id
            "#,
        )
        .bind(company_id)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(moves)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use cedar_core::SourceType;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn receipt(qty: i64, usd_major: i64, lbp_major: i64) -> NewStockMove {
        NewStockMove {
            company_id: "co-1".into(),
            item_id: "item-x".into(),
            warehouse_id: "wh-w".into(),
            batch_no: None,
            direction: MoveDirection::Inbound,
            qty: Qty::from_whole(qty),
            unit_cost_usd: Some(Usd::from_major(usd_major)),
            unit_cost_lbp: Some(Lbp::from_major(lbp_major)),
            source_type: SourceType::GoodsReceipt,
            source_id: "grn-1".into(),
        }
    }

    fn sale(qty: i64) -> NewStockMove {
        NewStockMove {
            company_id: "co-1".into(),
            item_id: "item-x".into(),
            warehouse_id: "wh-w".into(),
            batch_no: None,
            direction: MoveDirection::Outbound,
            qty: Qty::from_whole(qty),
            unit_cost_usd: None,
            unit_cost_lbp: None,
            source_type: SourceType::SalesInvoice,
            source_id: "inv-1".into(),
        }
    }

    /// Receive 10 @ $2.00 → avg $2.00; receive 5 @ $3.00 →
    /// avg $2.3333; sell 8 → on_hand 7, avg unchanged, COGS captured on the
    /// persisted row.
    #[tokio::test]
    async fn test_weighted_average_receipt_and_sale() {
        let db = test_db().await;
        let repo = db.movements();

        let r1 = repo.record_move(receipt(10, 2, 180_000)).await.unwrap();
        assert_eq!(r1.aggregate.on_hand_qty, Qty::from_whole(10));
        assert_eq!(r1.aggregate.avg_cost_usd, Usd::from_major(2));

        let r2 = repo.record_move(receipt(5, 3, 270_000)).await.unwrap();
        assert_eq!(r2.aggregate.on_hand_qty, Qty::from_whole(15));
        assert_eq!(r2.aggregate.avg_cost_usd, Usd::from_raw(23_333));
        assert_eq!(r2.aggregate.avg_cost_lbp, Lbp::from_major(210_000));

        let r3 = repo.record_move(sale(8)).await.unwrap();
        assert_eq!(r3.aggregate.on_hand_qty, Qty::from_whole(7));
        // Outbound never changes the average.
        assert_eq!(r3.aggregate.avg_cost_usd, Usd::from_raw(23_333));

        // The persisted outbound row carries the captured average, not a
        // placeholder, and its extension is the COGS amount.
        assert_eq!(r3.movement.unit_cost_usd, Usd::from_raw(23_333));
        assert_eq!(
            r3.movement.unit_cost_usd.extend(Qty::from_whole(8)).raw(),
            186_664
        );
    }

    #[tokio::test]
    async fn test_on_hand_matches_log_sums() {
        let db = test_db().await;
        let repo = db.movements();

        repo.record_move(receipt(10, 2, 180_000)).await.unwrap();
        repo.record_move(sale(4)).await.unwrap();
        repo.record_move(receipt(6, 3, 270_000)).await.unwrap();
        repo.record_move(sale(5)).await.unwrap();

        let moves = repo.list_for_key("co-1", "item-x", "wh-w").await.unwrap();
        assert_eq!(moves.len(), 4);

        let mut net = Qty::zero();
        for m in &moves {
            // Persisted-row invariant: exactly one direction nonzero.
            assert!(m.qty_in.is_zero() != m.qty_out.is_zero());
            net += m.qty_in - m.qty_out;
        }

        let agg = db.costs().get("co-1", "item-x", "wh-w").await.unwrap().unwrap();
        assert_eq!(agg.on_hand_qty, net);
        assert_eq!(agg.on_hand_qty, Qty::from_whole(7));
    }

    #[tokio::test]
    async fn test_zero_qty_rejected() {
        let db = test_db().await;
        let mut m = receipt(10, 2, 180_000);
        m.qty = Qty::zero();

        let err = db.movements().record_move(m).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_negative_stock_applied_as_is() {
        let db = test_db().await;
        let repo = db.movements();

        repo.record_move(receipt(3, 2, 180_000)).await.unwrap();
        let r = repo.record_move(sale(5)).await.unwrap();

        // Policy is external; the ledger applies the quantity and keeps the
        // average.
        assert_eq!(r.aggregate.on_hand_qty, Qty::from_whole(-2));
        assert_eq!(r.aggregate.avg_cost_usd, Usd::from_major(2));
    }

    #[tokio::test]
    async fn test_outbound_with_explicit_cost_keeps_it() {
        let db = test_db().await;
        let repo = db.movements();

        repo.record_move(receipt(10, 2, 180_000)).await.unwrap();

        let mut m = sale(4);
        m.unit_cost_usd = Some(Usd::from_major(9));
        m.unit_cost_lbp = Some(Lbp::from_major(810_000));
        let r = repo.record_move(m).await.unwrap();

        // Caller supplied the valuation; the engine does not override it,
        // and the average still does not move.
        assert_eq!(r.movement.unit_cost_usd, Usd::from_major(9));
        assert_eq!(r.aggregate.avg_cost_usd, Usd::from_major(2));
    }

    #[tokio::test]
    async fn test_moves_are_append_only_even_via_raw_sql() {
        let db = test_db().await;
        db.movements()
            .record_move(receipt(10, 2, 180_000))
            .await
            .unwrap();

        let err: DbError = sqlx::query("UPDATE stock_moves SET qty_in = 999")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Immutable { .. }));

        let err: DbError = sqlx::query("DELETE FROM stock_moves")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Immutable { .. }));
    }
}
