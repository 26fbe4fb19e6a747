//! # Product Repository
//!
//! Catalogue CRUD, manual stock counts, and the stock mutation choke point.
//!
//! ## Who Moves Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SalesLedger::process ──── SALE ──────────┐                            │
//! │  SalesLedger::edit ─────── SALE_REVERSAL ─┤                            │
//! │  ReturnsEngine::process ── RETURN ────────┼──► apply_stock_delta()     │
//! │  adjust_stock ──────────── ADJUSTMENT ────┤     UPDATE … WHERE         │
//! │  StockLotRepository ────── LOT_RECEIPT ───┘     stock + Δ >= 0         │
//! │                                                  + stock_movements row │
//! │                                                                         │
//! │  `update()` never writes the stock column.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guarded UPDATE makes "stock never negative" hold even if a caller
//! skipped its own availability check; the CHECK constraint on the column
//! is the last line.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::tx::WriteGate;
use gestion_core::validation::{
    normalize_optional, validate_adjustments, validate_product, validate_search_query,
};
use gestion_core::{
    CoreError, MovementKind, Product, ProductInput, StockAdjustment, StockAdjustmentLine,
    StockMovement,
};

const SELECT_PRODUCT: &str = r#"
    SELECT id, barcode, name, purchase_price_cents, price_retail_cents,
           price_wholesale_cents, price_carton_cents, pieces_per_carton,
           stock, alert_threshold, category, created_at, updated_at
    FROM products
"#;

/// Why and on behalf of what a stock delta is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub kind: MovementKind,
    /// Sale, return, adjustment or lot id.
    pub reference_id: Option<i64>,
}

impl StockChange {
    pub fn new(kind: MovementKind, reference_id: i64) -> Self {
        StockChange {
            kind,
            reference_id: Some(reference_id),
        }
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        ProductRepository { pool, gate }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Searches name, barcode and category. An empty query lists by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list(limit, 0).await;
        }

        let pattern = like_pattern(&query);
        let sql = format!(
            "{SELECT_PRODUCT}
             WHERE name LIKE ?1 ESCAPE '\\'
                OR barcode LIKE ?1 ESCAPE '\\'
                OR category LIKE ?1 ESCAPE '\\'
             ORDER BY
                CASE WHEN barcode = ?2 THEN 0 ELSE 1 END,
                name
             LIMIT ?3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .bind(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let sql = format!("{SELECT_PRODUCT} ORDER BY name LIMIT ?1 OFFSET ?2");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Looks a product up by its scanned barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE barcode = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Products at or under their alert threshold, emptiest first.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "{SELECT_PRODUCT} WHERE stock <= alert_threshold ORDER BY stock, name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Stock movement journal of a product, newest first.
    pub async fn movements(&self, product_id: i64, limit: u32) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, delta, stock_after, kind, reference_id, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Manual stock count history of a product, newest first.
    pub async fn adjustments(&self, product_id: i64) -> DbResult<Vec<StockAdjustment>> {
        let rows = sqlx::query_as::<_, StockAdjustment>(
            r#"
            SELECT id, product_id, old_quantity, new_quantity, reason, user_id, created_at
            FROM stock_adjustments
            WHERE product_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a product. Opening stock is booked as an ADJUSTMENT movement.
    pub async fn insert(&self, input: &ProductInput) -> DbResult<Product> {
        let name = validate_product(input)?;
        let barcode = normalize_optional(input.barcode.as_deref());
        let category = normalize_optional(input.category.as_deref());
        let now = Utc::now();

        debug!(name = %name, barcode = ?barcode, "Inserting product");

        let mut tx = self.gate.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                barcode, name, purchase_price_cents, price_retail_cents,
                price_wholesale_cents, price_carton_cents, pieces_per_carton,
                stock, alert_threshold, category, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10, ?10)
            RETURNING id
            "#,
        )
        .bind(&barcode)
        .bind(&name)
        .bind(input.purchase_price_cents)
        .bind(input.price_retail_cents)
        .bind(input.price_wholesale_cents)
        .bind(input.price_carton_cents)
        .bind(input.pieces_per_carton)
        .bind(input.alert_threshold)
        .bind(&category)
        .bind(now)
        .fetch_one(tx.conn())
        .await?;

        if input.stock > 0 {
            Self::apply_stock_delta(
                tx.conn(),
                id,
                input.stock,
                StockChange {
                    kind: MovementKind::Adjustment,
                    reference_id: None,
                },
            )
            .await?;
        }

        let product = Self::fetch(tx.conn(), id).await?;
        tx.commit().await?;

        info!(product_id = id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Updates catalogue fields. `input.stock` is ignored.
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        let name = validate_product(&ProductInput {
            stock: 0,
            ..input.clone()
        })?;
        let barcode = normalize_optional(input.barcode.as_deref());
        let category = normalize_optional(input.category.as_deref());

        debug!(product_id = id, "Updating product");

        let mut tx = self.gate.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                barcode = ?2,
                name = ?3,
                purchase_price_cents = ?4,
                price_retail_cents = ?5,
                price_wholesale_cents = ?6,
                price_carton_cents = ?7,
                pieces_per_carton = ?8,
                alert_threshold = ?9,
                category = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&barcode)
        .bind(&name)
        .bind(input.purchase_price_cents)
        .bind(input.price_retail_cents)
        .bind(input.price_wholesale_cents)
        .bind(input.price_carton_cents)
        .bind(input.pieces_per_carton)
        .bind(input.alert_threshold)
        .bind(&category)
        .bind(Utc::now())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id).into());
        }

        let product = Self::fetch(tx.conn(), id).await?;
        tx.commit().await?;

        Ok(product)
    }

    /// Deletes a product that was never sold.
    ///
    /// Products referenced by a sale line fail with `ForeignKeyViolation`.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(product_id = id, "Deleting product");

        let mut tx = self.gate.begin().await?;
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(tx.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id).into());
        }
        tx.commit().await?;

        info!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Applies a stock count in one transaction.
    ///
    /// One `stock_adjustments` audit row is written per product whose
    /// quantity actually changes; unchanged lines are skipped. Runs behind
    /// the write gate, so it never interleaves with a sale on the same
    /// product.
    pub async fn adjust_stock(
        &self,
        lines: &[StockAdjustmentLine],
        reason: &str,
        user_id: Option<i64>,
    ) -> DbResult<Vec<StockAdjustment>> {
        validate_adjustments(lines, reason)?;
        let reason = reason.trim();

        let mut tx = self.gate.begin().await?;
        let mut written = Vec::with_capacity(lines.len());

        for line in lines {
            let product = Self::fetch(tx.conn(), line.product_id).await?;
            let delta = line.new_quantity - product.stock;
            if delta == 0 {
                continue;
            }

            let adjustment = sqlx::query_as::<_, StockAdjustment>(
                r#"
                INSERT INTO stock_adjustments (
                    product_id, old_quantity, new_quantity, reason, user_id, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING id, product_id, old_quantity, new_quantity, reason, user_id, created_at
                "#,
            )
            .bind(product.id)
            .bind(product.stock)
            .bind(line.new_quantity)
            .bind(reason)
            .bind(user_id)
            .bind(Utc::now())
            .fetch_one(tx.conn())
            .await?;

            Self::apply_stock_delta(
                tx.conn(),
                product.id,
                delta,
                StockChange::new(MovementKind::Adjustment, adjustment.id),
            )
            .await?;

            written.push(adjustment);
        }

        tx.commit().await?;

        info!(
            lines = lines.len(),
            changed = written.len(),
            reason = %reason,
            "Stock adjusted"
        );
        Ok(written)
    }

    // =========================================================================
    // Transaction primitives
    // =========================================================================

    /// Loads a product on an open connection, failing with
    /// `ProductNotFound`.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Product> {
        let sql = format!("{SELECT_PRODUCT} WHERE id = ?1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id).into())
    }

    /// The only statement that changes `products.stock`.
    ///
    /// Returns the new stock level. A delta that would take stock below
    /// zero fails with `InsufficientStock` and changes nothing.
    pub async fn apply_stock_delta(
        conn: &mut SqliteConnection,
        product_id: i64,
        delta: i64,
        change: StockChange,
    ) -> DbResult<i64> {
        let stock_after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            RETURNING stock
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(stock_after) = stock_after else {
            let product = Self::fetch(conn, product_id).await?;
            warn!(
                product_id,
                available = product.stock,
                delta,
                "Stock change rejected"
            );
            return Err(DbError::Domain(CoreError::InsufficientStock {
                product_id,
                product_name: product.name,
                available: product.stock,
                requested: -delta,
            }));
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (product_id, delta, stock_after, kind, reference_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(stock_after)
        .bind(change.kind)
        .bind(change.reference_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(product_id, delta, stock_after, kind = ?change.kind, "Stock moved");
        Ok(stock_after)
    }
}

/// `%query%` with LIKE wildcards in the query escaped.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn input(name: &str, barcode: Option<&str>, stock: i64) -> ProductInput {
        ProductInput {
            barcode: barcode.map(str::to_string),
            name: name.to_string(),
            purchase_price_cents: 700,
            price_retail_cents: 1000,
            price_wholesale_cents: 900,
            price_carton_cents: 10_000,
            pieces_per_carton: 12,
            stock,
            alert_threshold: 5,
            category: Some("Epicerie".to_string()),
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[tokio::test]
    async fn test_insert_books_opening_stock() {
        let db = db().await;
        let product = db
            .products()
            .insert(&input("Huile 1L", Some("6111000000011"), 20))
            .await
            .unwrap();

        assert_eq!(product.stock, 20);
        let movements = db.products().movements(product.id, 10).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Adjustment);
        assert_eq!(movements[0].stock_after, 20);
    }

    #[tokio::test]
    async fn test_search_and_barcode_lookup() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&input("Huile Lesieur 1L", Some("611"), 3)).await.unwrap();
        repo.insert(&input("Sucre 1kg", Some("612"), 3)).await.unwrap();

        let found = repo.search("huile", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Huile Lesieur 1L");

        let by_code = repo.get_by_barcode("612").await.unwrap().unwrap();
        assert_eq!(by_code.name, "Sucre 1kg");

        assert_eq!(repo.search("", 10).await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = db().await;
        db.products().insert(&input("A", Some("999"), 0)).await.unwrap();
        let err = db.products().insert(&input("B", Some("999"), 0)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_never_touches_stock() {
        let db = db().await;
        let product = db.products().insert(&input("Thé", None, 8)).await.unwrap();

        let mut changed = input("Thé vert", None, 999);
        changed.price_retail_cents = 1500;
        let updated = db.products().update(product.id, &changed).await.unwrap();

        assert_eq!(updated.name, "Thé vert");
        assert_eq!(updated.price_retail_cents, 1500);
        assert_eq!(updated.stock, 8);
    }

    #[tokio::test]
    async fn test_adjust_stock_writes_audit_rows() {
        let db = db().await;
        let repo = db.products();
        let a = repo.insert(&input("A", None, 10)).await.unwrap();
        let b = repo.insert(&input("B", None, 4)).await.unwrap();

        let written = repo
            .adjust_stock(
                &[
                    StockAdjustmentLine {
                        product_id: a.id,
                        new_quantity: 7,
                    },
                    StockAdjustmentLine {
                        product_id: b.id,
                        new_quantity: 4,
                    },
                ],
                "Inventaire mensuel",
                Some(2),
            )
            .await
            .unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].old_quantity, 10);
        assert_eq!(written[0].new_quantity, 7);
        assert_eq!(repo.get_by_id(a.id).await.unwrap().unwrap().stock, 7);
        assert_eq!(repo.adjustments(a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_adjust_stock_is_atomic() {
        let db = db().await;
        let repo = db.products();
        let a = repo.insert(&input("A", None, 10)).await.unwrap();

        let err = repo
            .adjust_stock(
                &[
                    StockAdjustmentLine {
                        product_id: a.id,
                        new_quantity: 2,
                    },
                    StockAdjustmentLine {
                        product_id: 9999,
                        new_quantity: 1,
                    },
                ],
                "Casse",
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(9999))));
        assert_eq!(repo.get_by_id(a.id).await.unwrap().unwrap().stock, 10);
        assert!(repo.adjustments(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stock_delta_never_goes_negative() {
        let db = db().await;
        let product = db.products().insert(&input("A", None, 2)).await.unwrap();

        let mut tx = db.write_gate().begin().await.unwrap();
        let err = ProductRepository::apply_stock_delta(
            tx.conn(),
            product.id,
            -3,
            StockChange::new(MovementKind::Sale, 1),
        )
        .await
        .unwrap_err();
        drop(tx);

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.products().get_by_id(product.id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = db().await;
        let product = db.products().insert(&input("A", None, 0)).await.unwrap();
        db.products().delete(product.id).await.unwrap();
        assert!(db.products().get_by_id(product.id).await.unwrap().is_none());

        let err = db.products().delete(product.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = db().await;
        db.products().insert(&input("Low", None, 2)).await.unwrap();
        db.products().insert(&input("Plenty", None, 50)).await.unwrap();

        let low = db.products().low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Low");
        assert!(low[0].is_low_stock());
    }
}
