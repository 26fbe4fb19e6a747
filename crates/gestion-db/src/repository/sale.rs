//! # Sale Repository
//!
//! Read side of the sales journal, plus the row-level primitives the
//! sales ledger calls inside its transaction.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. PROCESS                                                            │
//! │     └── insert_sale() → Sale { status: COMPLETED }                     │
//! │     └── insert_item() × cart lines                                     │
//! │                                                                         │
//! │  2. (OPTIONAL) EDIT                                                    │
//! │     └── set_status(CORRECTED) on the original                          │
//! │     └── insert_sale() → replacement { original_sale_id: original }     │
//! │                                                                         │
//! │  3. (OPTIONAL) RETURNS                                                 │
//! │     └── mark_returned(fully = false) → has_returns                     │
//! │     └── mark_returned(fully = true)  → status RETURNED                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never deleted: a corrected sale stays in the journal next to
//! its replacement.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use gestion_core::{
    CoreError, PaymentMethod, Sale, SaleDetail, SaleFilter, SaleItem, SaleStatus, SaleUnit,
};

const SELECT_SALE: &str = r#"
    SELECT id, ticket_number, client_id, user_id, total_cents, paid_cash_cents,
           paid_credit_cents, payment_method, status, original_sale_id,
           has_returns, sale_date
    FROM sales
"#;

const SELECT_SALE_ITEM: &str = r#"
    SELECT id, sale_id, product_id, quantity, unit, unit_price_cents,
           line_total_cents, purchase_price_cents, units_per_item
    FROM sale_items
"#;

const DEFAULT_HISTORY_LIMIT: i64 = 100;
const MAX_HISTORY_LIMIT: i64 = 1000;

/// Header values of a sale about to be written.
#[derive(Debug, Clone)]
pub struct NewSale<'a> {
    pub ticket_number: &'a str,
    pub client_id: i64,
    pub user_id: Option<i64>,
    pub total_cents: i64,
    pub paid_cash_cents: i64,
    pub paid_credit_cents: i64,
    pub payment_method: PaymentMethod,
    pub original_sale_id: Option<i64>,
}

/// One sale line about to be written.
#[derive(Debug, Clone, Copy)]
pub struct NewSaleItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit: SaleUnit,
    pub unit_price_cents: i64,
    pub purchase_price_cents: i64,
    pub units_per_item: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its lines.
    pub async fn get(&self, id: i64) -> DbResult<Option<SaleDetail>> {
        let sql = format!("{SELECT_SALE} WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(sale) => {
                let items = self.items(sale.id).await?;
                Ok(Some(SaleDetail { sale, items }))
            }
            None => Ok(None),
        }
    }

    /// Gets a sale by its printed ticket number.
    pub async fn get_by_ticket(&self, ticket_number: &str) -> DbResult<Option<SaleDetail>> {
        let sql = format!("{SELECT_SALE} WHERE ticket_number = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(ticket_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(sale) => {
                let items = self.items(sale.id).await?;
                Ok(Some(SaleDetail { sale, items }))
            }
            None => Ok(None),
        }
    }

    /// Lines of a sale, in cart order.
    pub async fn items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let sql = format!("{SELECT_SALE_ITEM} WHERE sale_id = ?1 ORDER BY id");
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Sales history, newest first.
    ///
    /// Dates are compared on the store's local calendar day, the same day
    /// printed in the ticket number.
    pub async fn history(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_SALE);
        qb.push(" WHERE 1 = 1");

        if let Some(from) = filter.from {
            qb.push(" AND date(sale_date, 'localtime') >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND date(sale_date, 'localtime') <= ").push_bind(to);
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        qb.push(" ORDER BY id DESC LIMIT ").push_bind(limit);

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        debug!(count = sales.len(), "Sales history loaded");
        Ok(sales)
    }

    // =========================================================================
    // Transaction primitives
    // =========================================================================

    /// Loads a sale on an open connection, failing with `SaleNotFound`.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Sale> {
        let sql = format!("{SELECT_SALE} WHERE id = ?1");
        sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id).into())
    }

    pub async fn fetch_items(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let sql = format!("{SELECT_SALE_ITEM} WHERE sale_id = ?1 ORDER BY id");
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(items)
    }

    /// Writes a COMPLETED sale header.
    pub async fn insert_sale(conn: &mut SqliteConnection, sale: &NewSale<'_>) -> DbResult<Sale> {
        let sql = r#"
            INSERT INTO sales (
                ticket_number, client_id, user_id, total_cents, paid_cash_cents,
                paid_credit_cents, payment_method, status, original_sale_id,
                has_returns, sale_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10)
            RETURNING id, ticket_number, client_id, user_id, total_cents, paid_cash_cents,
                      paid_credit_cents, payment_method, status, original_sale_id,
                      has_returns, sale_date
        "#;

        let inserted = sqlx::query_as::<_, Sale>(sql)
            .bind(sale.ticket_number)
            .bind(sale.client_id)
            .bind(sale.user_id)
            .bind(sale.total_cents)
            .bind(sale.paid_cash_cents)
            .bind(sale.paid_credit_cents)
            .bind(sale.payment_method)
            .bind(SaleStatus::Completed)
            .bind(sale.original_sale_id)
            .bind(Utc::now())
            .fetch_one(&mut *conn)
            .await?;

        debug!(sale_id = inserted.id, ticket = %inserted.ticket_number, "Sale row inserted");
        Ok(inserted)
    }

    pub async fn insert_item(
        conn: &mut SqliteConnection,
        sale_id: i64,
        item: &NewSaleItem,
    ) -> DbResult<SaleItem> {
        let sql = r#"
            INSERT INTO sale_items (
                sale_id, product_id, quantity, unit, unit_price_cents,
                line_total_cents, purchase_price_cents, units_per_item
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id, sale_id, product_id, quantity, unit, unit_price_cents,
                      line_total_cents, purchase_price_cents, units_per_item
        "#;

        let inserted = sqlx::query_as::<_, SaleItem>(sql)
            .bind(sale_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit)
            .bind(item.unit_price_cents)
            .bind(item.unit_price_cents * item.quantity)
            .bind(item.purchase_price_cents)
            .bind(item.units_per_item)
            .fetch_one(&mut *conn)
            .await?;

        Ok(inserted)
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        sale_id: i64,
        status: SaleStatus,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET status = ?2 WHERE id = ?1")
            .bind(sale_id)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::SaleNotFound(sale_id).into());
        }
        Ok(())
    }

    /// Flags a sale as having returns; `fully` also moves it to RETURNED.
    pub async fn mark_returned(
        conn: &mut SqliteConnection,
        sale_id: i64,
        fully: bool,
    ) -> DbResult<()> {
        let sql = if fully {
            "UPDATE sales SET has_returns = 1, status = 'RETURNED' WHERE id = ?1"
        } else {
            "UPDATE sales SET has_returns = 1 WHERE id = ?1"
        };
        sqlx::query(sql).bind(sale_id).execute(&mut *conn).await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
