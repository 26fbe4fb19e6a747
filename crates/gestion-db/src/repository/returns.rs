//! # Return Repository
//!
//! Read side of returns and the row primitives the returns engine uses.
//!
//! "Already returned" for a sale item is always the sum of
//! `return_items.quantity_returned` over every return against it; there
//! is no cached counter to drift.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use gestion_core::{
    ItemCondition, ReturnDetail, ReturnItem, ReturnStatus, ReturnableItem, SaleReturn, SaleUnit,
};

const SELECT_RETURN: &str = r#"
    SELECT id, return_number, original_sale_id, client_id, user_id, total_refund_cents,
           refund_cash_cents, refund_credit_cents, reason, status, return_date
    FROM returns
"#;

const SELECT_RETURN_ITEM: &str = r#"
    SELECT id, return_id, original_sale_item_id, product_id, quantity_returned, unit,
           unit_price_cents, refund_cents, condition_status, back_to_stock
    FROM return_items
"#;

const SELECT_RETURNABLE: &str = r#"
    SELECT si.id AS sale_item_id,
           si.product_id,
           p.name AS product_name,
           si.unit,
           si.unit_price_cents,
           si.quantity AS quantity_sold,
           COALESCE((
               SELECT SUM(ri.quantity_returned)
               FROM return_items ri
               WHERE ri.original_sale_item_id = si.id
           ), 0) AS quantity_returned,
           si.units_per_item
    FROM sale_items si
    JOIN products p ON p.id = si.product_id
    WHERE si.sale_id = ?1
    ORDER BY si.id
"#;

/// Header of a return about to be written.
#[derive(Debug, Clone)]
pub struct NewReturn<'a> {
    pub return_number: &'a str,
    pub original_sale_id: i64,
    pub client_id: Option<i64>,
    pub user_id: Option<i64>,
    pub refund_cash_cents: i64,
    pub refund_credit_cents: i64,
    pub reason: Option<&'a str>,
}

/// One returned line about to be written.
#[derive(Debug, Clone, Copy)]
pub struct NewReturnItem {
    pub original_sale_item_id: i64,
    pub product_id: i64,
    pub quantity_returned: i64,
    pub unit: SaleUnit,
    pub unit_price_cents: i64,
    pub refund_cents: i64,
    pub condition: ItemCondition,
    pub back_to_stock: bool,
    /// Stock pieces put back when `back_to_stock`.
    pub stock_units: i64,
}

#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Gets a return with its lines.
    pub async fn get(&self, return_id: i64) -> DbResult<Option<ReturnDetail>> {
        let sql = format!("{SELECT_RETURN} WHERE id = ?1");
        let sale_return = sqlx::query_as::<_, SaleReturn>(&sql)
            .bind(return_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(sale_return) = sale_return else {
            return Ok(None);
        };

        let sql = format!("{SELECT_RETURN_ITEM} WHERE return_id = ?1 ORDER BY id");
        let items = sqlx::query_as::<_, ReturnItem>(&sql)
            .bind(return_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(ReturnDetail { sale_return, items }))
    }

    /// Returns recorded against a sale, oldest first.
    pub async fn for_sale(&self, sale_id: i64) -> DbResult<Vec<SaleReturn>> {
        let sql = format!("{SELECT_RETURN} WHERE original_sale_id = ?1 ORDER BY id");
        let returns = sqlx::query_as::<_, SaleReturn>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(returns)
    }

    /// Sold, already returned and remaining quantity per item of a sale.
    pub async fn returnable_items(&self, sale_id: i64) -> DbResult<Vec<ReturnableItem>> {
        let items = sqlx::query_as::<_, ReturnableItem>(SELECT_RETURNABLE)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    // =========================================================================
    // Transaction primitives
    // =========================================================================

    /// Returnable items of a sale keyed by sale item id.
    pub async fn returnable_by_item(
        conn: &mut SqliteConnection,
        sale_id: i64,
    ) -> DbResult<HashMap<i64, ReturnableItem>> {
        let items = sqlx::query_as::<_, ReturnableItem>(SELECT_RETURNABLE)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(items.into_iter().map(|i| (i.sale_item_id, i)).collect())
    }

    /// Credit already refunded by earlier returns of a sale.
    pub async fn credit_refunded(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<i64> {
        let refunded: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(refund_credit_cents), 0) FROM returns WHERE original_sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(refunded)
    }

    pub async fn insert_return(
        conn: &mut SqliteConnection,
        new: &NewReturn<'_>,
    ) -> DbResult<SaleReturn> {
        let sql = r#"
            INSERT INTO returns (
                return_number, original_sale_id, client_id, user_id, total_refund_cents,
                refund_cash_cents, refund_credit_cents, reason, status, return_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING id, return_number, original_sale_id, client_id, user_id, total_refund_cents,
                      refund_cash_cents, refund_credit_cents, reason, status, return_date
        "#;

        let inserted = sqlx::query_as::<_, SaleReturn>(sql)
            .bind(new.return_number)
            .bind(new.original_sale_id)
            .bind(new.client_id)
            .bind(new.user_id)
            .bind(new.refund_cash_cents + new.refund_credit_cents)
            .bind(new.refund_cash_cents)
            .bind(new.refund_credit_cents)
            .bind(new.reason)
            .bind(ReturnStatus::Completed)
            .bind(Utc::now())
            .fetch_one(&mut *conn)
            .await?;

        debug!(return_id = inserted.id, number = %inserted.return_number, "Return row inserted");
        Ok(inserted)
    }

    pub async fn insert_item(
        conn: &mut SqliteConnection,
        return_id: i64,
        item: &NewReturnItem,
    ) -> DbResult<ReturnItem> {
        let inserted = sqlx::query_as::<_, ReturnItem>(
            r#"
            INSERT INTO return_items (
                return_id, original_sale_item_id, product_id, quantity_returned, unit,
                unit_price_cents, refund_cents, condition_status, back_to_stock
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING id, return_id, original_sale_item_id, product_id, quantity_returned, unit,
                      unit_price_cents, refund_cents, condition_status, back_to_stock
            "#,
        )
        .bind(return_id)
        .bind(item.original_sale_item_id)
        .bind(item.product_id)
        .bind(item.quantity_returned)
        .bind(item.unit)
        .bind(item.unit_price_cents)
        .bind(item.refund_cents)
        .bind(item.condition)
        .bind(item.back_to_stock)
        .fetch_one(&mut *conn)
        .await?;

        Ok(inserted)
    }
}
