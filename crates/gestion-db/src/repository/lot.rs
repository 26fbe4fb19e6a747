//! # Stock Lot Repository
//!
//! Purchase batches. Receiving a lot raises stock through the same choke
//! point as every other stock change (movement kind LOT_RECEIPT); the lot
//! history then feeds FIFO / LIFO / average valuation.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::repository::product::{ProductRepository, StockChange};
use crate::tx::WriteGate;
use gestion_core::validation::{normalize_optional, validate_price_cents, validate_quantity};
use gestion_core::valuation::{value_stock, StockValuation, ValuationMethod};
use gestion_core::{CoreError, MovementKind, StockLot};

const SELECT_LOT: &str = r#"
    SELECT id, product_id, quantity, unit_cost_cents, reference, received_at
    FROM stock_lots
"#;

#[derive(Debug, Clone)]
pub struct StockLotRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl StockLotRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        StockLotRepository { pool, gate }
    }

    /// Records a received lot and adds its quantity to stock.
    pub async fn receive(
        &self,
        product_id: i64,
        quantity: i64,
        unit_cost_cents: i64,
        reference: Option<&str>,
    ) -> DbResult<StockLot> {
        validate_quantity(quantity)?;
        validate_price_cents("unitCost", unit_cost_cents)?;

        let mut tx = self.gate.begin().await?;
        let conn = tx.conn();
        ProductRepository::fetch(&mut *conn, product_id).await?;

        let lot = sqlx::query_as::<_, StockLot>(
            r#"
            INSERT INTO stock_lots (product_id, quantity, unit_cost_cents, reference, received_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, product_id, quantity, unit_cost_cents, reference, received_at
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(unit_cost_cents)
        .bind(normalize_optional(reference))
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        let stock = ProductRepository::apply_stock_delta(
            &mut *conn,
            product_id,
            quantity,
            StockChange::new(MovementKind::LotReceipt, lot.id),
        )
        .await?;
        tx.commit().await?;

        info!(lot_id = lot.id, product_id, quantity, stock, "Stock lot received");
        Ok(lot)
    }

    /// Lots of a product, oldest first.
    pub async fn list(&self, product_id: i64) -> DbResult<Vec<StockLot>> {
        let sql = format!("{SELECT_LOT} WHERE product_id = ?1 ORDER BY received_at, id");
        let lots = sqlx::query_as::<_, StockLot>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lots)
    }

    /// Values the product's current stock from its lot history.
    pub async fn valuation(
        &self,
        product_id: i64,
        method: ValuationMethod,
    ) -> DbResult<StockValuation> {
        let product = ProductRepository::new(self.pool.clone(), self.gate.clone())
            .get_by_id(product_id)
            .await?
            .ok_or(CoreError::ProductNotFound(product_id))?;
        let lots = self.list(product_id).await?;

        Ok(value_stock(
            product_id,
            &lots,
            product.stock,
            product.purchase_price_cents,
            method,
        ))
    }
}
