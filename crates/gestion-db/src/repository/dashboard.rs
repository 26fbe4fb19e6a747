//! # Dashboard Queries
//!
//! Read-only aggregates over the ledger tables. Ranges are inclusive and
//! compared on the local calendar day. CORRECTED sales are left out: their
//! replacement carries the figures.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::DbResult;
use gestion_core::{DashboardSummary, TopProduct};

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Revenue, payment split, margin and refunds between two days.
    ///
    /// Margin is Σ (unit_price − purchase_price) × quantity over sold lines,
    /// using the cost frozen on each line.
    pub async fn summary(&self, from: NaiveDate, to: NaiveDate) -> DbResult<DashboardSummary> {
        let summary = sqlx::query_as::<_, DashboardSummary>(
            r#"
            WITH counted AS (
                SELECT * FROM sales
                WHERE status != 'CORRECTED'
                  AND date(sale_date, 'localtime') BETWEEN ?1 AND ?2
            )
            SELECT
                (SELECT COUNT(*) FROM counted) AS sale_count,
                (SELECT COALESCE(SUM(total_cents), 0) FROM counted) AS revenue_cents,
                (SELECT COALESCE(SUM(paid_cash_cents), 0) FROM counted) AS cash_collected_cents,
                (SELECT COALESCE(SUM(paid_credit_cents), 0) FROM counted) AS credit_issued_cents,
                (SELECT COALESCE(SUM((si.unit_price_cents - si.purchase_price_cents) * si.quantity), 0)
                   FROM sale_items si
                   JOIN counted c ON c.id = si.sale_id) AS gross_margin_cents,
                (SELECT COALESCE(SUM(total_refund_cents), 0)
                   FROM returns
                   WHERE date(return_date, 'localtime') BETWEEN ?1 AND ?2) AS refunds_cents
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Best sellers by revenue.
    pub async fn top_products(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT p.id AS product_id,
                   p.name,
                   SUM(si.quantity) AS quantity_sold,
                   SUM(si.line_total_cents) AS revenue_cents
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.status != 'CORRECTED'
              AND date(s.sale_date, 'localtime') BETWEEN ?1 AND ?2
            GROUP BY p.id, p.name
            ORDER BY revenue_cents DESC, quantity_sold DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Total owed by clients. Store credit (negative balances) is not
    /// netted against it.
    pub async fn outstanding_credit(&self) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(credit_balance_cents), 0) FROM clients WHERE credit_balance_cents > 0",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use crate::ledger::fixtures::*;
    use gestion_core::{ItemCondition, ReturnLine, ReturnRequest, WALK_IN_CLIENT_ID};

    #[tokio::test]
    async fn test_summary_excludes_corrected_sales() {
        let db = db().await;
        let p = product(&db, "Thé vert", 1000, 50).await;
        let c = client(&db, "Latifa").await;

        let mut credit_sale = cash_sale(c.id, vec![line(p.id, 3, 1000)]);
        credit_sale.amount_paid_cash_cents = 1000;
        credit_sale.credit_cents = 2000;
        let first = db.sales_ledger().process(&credit_sale).await.unwrap();

        // Corrected into a 2-unit sale: the 3-unit original no longer counts
        let edited = db
            .sales_ledger()
            .edit(first.sale_id, &cash_sale(c.id, vec![line(p.id, 2, 1000)]))
            .await
            .unwrap();

        let walk_in = db
            .sales_ledger()
            .process(&cash_sale(WALK_IN_CLIENT_ID, vec![line(p.id, 1, 1000)]))
            .await
            .unwrap();
        let item = db.sales().items(walk_in.sale_id).await.unwrap()[0].id;
        db.returns()
            .process(&ReturnRequest {
                original_sale_id: walk_in.sale_id,
                client_id: None,
                items: vec![ReturnLine {
                    sale_item_id: item,
                    product_id: p.id,
                    quantity: 1,
                    condition: ItemCondition::Good,
                    back_to_stock: true,
                }],
                refund_cash_cents: 1000,
                refund_credit_cents: 0,
                reason: None,
                user_id: None,
            })
            .await
            .unwrap();

        let today = chrono::Local::now().date_naive();
        let summary = db.dashboard().summary(today, today).await.unwrap();
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.revenue_cents, 3000);
        assert_eq!(summary.cash_collected_cents, 3000);
        assert_eq!(summary.credit_issued_cents, 0);
        // 3 pieces at (10.00 − 7.00)
        assert_eq!(summary.gross_margin_cents, 900);
        assert_eq!(summary.refunds_cents, 1000);

        let top = db.dashboard().top_products(today, today, 5).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].quantity_sold, 3);
        assert_ne!(edited.sale_id, first.sale_id);

        assert_eq!(db.dashboard().outstanding_credit().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let db = db().await;
        let day = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let summary = db.dashboard().summary(day, day).await.unwrap();
        assert_eq!(summary, Default::default());
        assert!(db.dashboard().top_products(day, day, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outstanding_credit_ignores_store_credit() {
        let db = db().await;
        let c = client(&db, "Driss").await;
        let other = client(&db, "Salma").await;
        db.credits()
            .add_manual_credit(&gestion_core::CreditPaymentRequest {
                client_id: c.id,
                user_id: None,
                amount_paid_cents: 4500,
                note: Some("Ancien carnet".to_string()),
            })
            .await
            .unwrap();

        db.credits()
            .record_payment(&gestion_core::CreditPaymentRequest {
                client_id: other.id,
                user_id: None,
                amount_paid_cents: 1000,
                note: None,
            })
            .await
            .unwrap();

        assert_eq!(db.dashboard().outstanding_credit().await.unwrap(), 4500);
    }
}
