//! # Costing Aggregate Repository
//!
//! Read side of the costing ledger (valuation, COGS feeds) plus the
//! administrative rebuild that re-derives every aggregate from the movement
//! log.
//!
//! Aggregates are written only by
//! [`crate::repository::movement::MovementRepository`]; nothing here mutates
//! them outside of `rebuild`.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::DbResult;
use cedar_core::costing::{CostAggregate, MoveEffect};
use cedar_core::{ItemWarehouseCost, Lbp, StockMove, Usd};

/// One line of an inventory valuation report: the aggregate extended to a
/// total value per ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationLine {
    pub item_id: String,
    pub warehouse_id: String,
    pub aggregate: ItemWarehouseCost,
    pub value_usd: Usd,
    pub value_lbp: Lbp,
}

/// Repository for costing aggregate reads and repair.
#[derive(Debug, Clone)]
pub struct CostRepository {
    pool: SqlitePool,
}

impl CostRepository {
    /// Creates a new CostRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CostRepository { pool }
    }

    /// Gets the aggregate for one (item, warehouse), if any movement ever
    /// touched it.
    pub async fn get(
        &self,
        company_id: &str,
        item_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Option<ItemWarehouseCost>> {
        let row = sqlx::query_as(
            r#"
            SELECT company_id, item_id, warehouse_id,
                   on_hand_qty, avg_cost_usd, avg_cost_lbp, updated_at
            FROM item_warehouse_costs
            WHERE company_id = ?1 AND item_id = ?2 AND warehouse_id = ?3
            "#,
        )
        .bind(company_id)
        .bind(item_id)
        .bind(warehouse_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Lists every aggregate for a company.
    pub async fn list(&self, company_id: &str) -> DbResult<Vec<ItemWarehouseCost>> {
        let rows = sqlx::query_as(
            r#"
            SELECT company_id, item_id, warehouse_id,
                   on_hand_qty, avg_cost_usd, avg_cost_lbp, updated_at
            FROM item_warehouse_costs
            WHERE company_id = ?1
            ORDER BY item_id, warehouse_id
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inventory valuation: every aggregate extended to on_hand × avg in
    /// both ledgers. The extension happens in fixed-point Rust math, not
    /// SQL, so rounding matches the rest of the engine.
    pub async fn valuation(&self, company_id: &str) -> DbResult<Vec<ValuationLine>> {
        let rows = self.list(company_id).await?;

        Ok(rows
            .into_iter()
            .map(|agg| ValuationLine {
                item_id: agg.item_id.clone(),
                warehouse_id: agg.warehouse_id.clone(),
                value_usd: agg.avg_cost_usd.extend(agg.on_hand_qty),
                value_lbp: agg.avg_cost_lbp.extend(agg.on_hand_qty),
                aggregate: agg,
            })
            .collect())
    }

    /// Rebuilds every aggregate of a company from its movement log.
    ///
    /// Administrative repair path: replays the log in commit order through
    /// the same pure costing step the live path uses, so the result is
    /// exactly the state incremental application would have produced. Runs
    /// in one transaction; concurrent movements wait on the write lock.
    pub async fn rebuild(&self, company_id: &str) -> DbResult<usize> {
        info!(company_id, "Rebuilding item costs from movement log");

        let mut tx = self.pool.begin().await?;

        // First statement is the write that takes the lock.
        sqlx::query("DELETE FROM item_warehouse_costs WHERE company_id = ?1")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        let moves: Vec<StockMove> = sqlx::query_as(
            r#"
            SELECT id, company_id, item_id, warehouse_id, batch_no,
                   qty_in, qty_out, unit_cost_usd, unit_cost_lbp,
                   source_type, source_id, created_at
            FROM stock_moves
            WHERE company_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(company_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut aggregates: BTreeMap<(String, String), CostAggregate> = BTreeMap::new();
        for m in &moves {
            let key = (m.item_id.clone(), m.warehouse_id.clone());
            let state = aggregates.entry(key).or_insert_with(CostAggregate::empty);
            let effect = if m.qty_in.is_positive() {
                MoveEffect::Inbound {
                    qty: m.qty_in,
                    unit_cost_usd: m.unit_cost_usd,
                    unit_cost_lbp: m.unit_cost_lbp,
                }
            } else {
                MoveEffect::Outbound { qty: m.qty_out }
            };
            *state = state.apply(&effect);
        }

        let now = Utc::now();
        let rebuilt = aggregates.len();
        for ((item_id, warehouse_id), state) in aggregates {
            sqlx::query(
                r#"
                INSERT INTO item_warehouse_costs
                    (company_id, item_id, warehouse_id, on_hand_qty, avg_cost_usd, avg_cost_lbp, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(company_id)
            .bind(&item_id)
            .bind(&warehouse_id)
            .bind(state.on_hand)
            .bind(state.avg_cost_usd)
            .bind(state.avg_cost_lbp)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(company_id, rebuilt, "Item cost rebuild complete");
        Ok(rebuilt)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cedar_core::{MoveDirection, NewStockMove, Qty, SourceType};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn mv(item: &str, dir: MoveDirection, qty: i64, usd: i64) -> NewStockMove {
        NewStockMove {
            company_id: "co-1".into(),
            item_id: item.into(),
            warehouse_id: "wh-w".into(),
            batch_no: None,
            direction: dir,
            qty: Qty::from_whole(qty),
            unit_cost_usd: Some(Usd::from_major(usd)),
            unit_cost_lbp: Some(Lbp::from_major(usd * 90_000)),
            source_type: SourceType::StockAdjustment,
            source_id: "adj-1".into(),
        }
    }

    #[tokio::test]
    async fn test_valuation_extends_at_storage_scale() {
        let db = test_db().await;
        db.movements()
            .record_move(mv("item-a", MoveDirection::Inbound, 10, 2))
            .await
            .unwrap();
        db.movements()
            .record_move(mv("item-a", MoveDirection::Inbound, 5, 3))
            .await
            .unwrap();

        let lines = db.costs().valuation("co-1").await.unwrap();
        assert_eq!(lines.len(), 1);
        // 15 × $2.3333 = $34.9995
        assert_eq!(lines[0].value_usd, Usd::from_raw(349_995));
    }

    #[tokio::test]
    async fn test_rebuild_matches_incremental_state() {
        let db = test_db().await;
        let moves = [
            mv("item-a", MoveDirection::Inbound, 10, 2),
            mv("item-a", MoveDirection::Outbound, 4, 0),
            mv("item-a", MoveDirection::Inbound, 6, 3),
            mv("item-b", MoveDirection::Inbound, 2, 7),
        ];
        for m in moves {
            let mut m = m;
            if matches!(m.direction, MoveDirection::Outbound) {
                m.unit_cost_usd = None;
                m.unit_cost_lbp = None;
            }
            db.movements().record_move(m).await.unwrap();
        }

        let live = db.costs().list("co-1").await.unwrap();

        let rebuilt_count = db.costs().rebuild("co-1").await.unwrap();
        assert_eq!(rebuilt_count, 2);

        let rebuilt = db.costs().list("co-1").await.unwrap();
        assert_eq!(live.len(), rebuilt.len());
        for (a, b) in live.iter().zip(rebuilt.iter()) {
            assert_eq!(a.item_id, b.item_id);
            assert_eq!(a.on_hand_qty, b.on_hand_qty);
            assert_eq!(a.avg_cost_usd, b.avg_cost_usd);
            assert_eq!(a.avg_cost_lbp, b.avg_cost_lbp);
        }
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let db = test_db().await;
        let agg = db.costs().get("co-1", "nope", "wh").await.unwrap();
        assert!(agg.is_none());
    }
}
