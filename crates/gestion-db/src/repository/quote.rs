//! # Quote Repository
//!
//! Quotes (devis), numbered `D-YYYYMMDD-NNNN`. A quote can be turned into
//! an invoice once; it then stays CONVERTED and points at the invoice.
//!
//! ```text
//! DRAFT ──► SENT ──► ACCEPTED ──► CONVERTED (convert_to_invoice)
//!   │         │          │
//!   └─────────┴──► REJECTED
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::ledger::numbering::next_number;
use crate::repository::invoice::{
    billed_client, fetch_lines, insert_lines, BilledClient, InvoiceRepository,
};
use crate::tx::WriteGate;
use gestion_core::numbering::DocumentKind;
use gestion_core::validation::{normalize_optional, validate_document};
use gestion_core::{
    CoreError, DocumentInput, DocumentLineInput, DocumentTotals, InvoiceDetail, Quote,
    QuoteDetail, QuoteStatus, TvaRate, ValidationError,
};

const SELECT_QUOTE: &str = r#"
    SELECT id, quote_number, client_id, client_name, client_ice, client_address,
           subtotal_ht_cents, tva_rate_bps, tva_cents, total_cents, status, notes,
           converted_invoice_id, issue_date, valid_until
    FROM quotes
"#;

#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
    gate: WriteGate,
    default_tva: TvaRate,
}

impl QuoteRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate, default_tva: TvaRate) -> Self {
        QuoteRepository {
            pool,
            gate,
            default_tva,
        }
    }

    pub async fn create(&self, input: &DocumentInput) -> DbResult<QuoteDetail> {
        validate_document(input)?;
        let rate = input
            .tva_rate_bps
            .map(TvaRate::from_bps)
            .unwrap_or(self.default_tva);

        let mut tx = self.gate.begin().await?;
        let conn = tx.conn();
        let client = billed_client(&mut *conn, input).await?;
        let detail = Self::insert(
            &mut *conn,
            &client,
            &input.lines,
            rate,
            normalize_optional(input.notes.as_deref()),
            input.date_limit,
        )
        .await?;
        tx.commit().await?;

        info!(
            quote_id = detail.quote.id,
            number = %detail.quote.quote_number,
            total = detail.quote.total_cents,
            "Quote created"
        );
        Ok(detail)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<QuoteDetail>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{SELECT_QUOTE} WHERE id = ?1");
        let quote = sqlx::query_as::<_, Quote>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match quote {
            Some(quote) => {
                let items = fetch_lines(&mut *conn, DocumentKind::Quote, quote.id).await?;
                Ok(Some(QuoteDetail { quote, items }))
            }
            None => Ok(None),
        }
    }

    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Quote>> {
        let sql = format!("{SELECT_QUOTE} ORDER BY id DESC LIMIT ?1 OFFSET ?2");
        let quotes = sqlx::query_as::<_, Quote>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(quotes)
    }

    /// Moves a quote through DRAFT / SENT / ACCEPTED / REJECTED.
    /// CONVERTED is only reached through `convert_to_invoice`.
    pub async fn update_status(&self, id: i64, status: QuoteStatus) -> DbResult<Quote> {
        let mut tx = self.gate.begin().await?;
        let conn = tx.conn();

        let current = Self::fetch(&mut *conn, id).await?;
        if !quote_transition_allowed(current.status, status) {
            return Err(bad_transition(current.status, status).into());
        }

        sqlx::query("UPDATE quotes SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&mut *conn)
            .await?;
        let updated = Self::fetch(&mut *conn, id).await?;
        tx.commit().await?;

        info!(quote_id = id, status = ?status, "Quote status changed");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.gate.begin().await?;
        let result = sqlx::query("DELETE FROM quotes WHERE id = ?1")
            .bind(id)
            .execute(tx.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id).into());
        }
        tx.commit().await?;

        info!(quote_id = id, "Quote deleted");
        Ok(())
    }

    /// Creates a DRAFT invoice from a quote and marks the quote CONVERTED.
    ///
    /// The invoice carries the quote's client snapshot, TVA rate and lines.
    pub async fn convert_to_invoice(&self, id: i64) -> DbResult<InvoiceDetail> {
        let mut tx = self.gate.begin().await?;
        let conn = tx.conn();

        let quote = Self::fetch(&mut *conn, id).await?;
        if matches!(quote.status, QuoteStatus::Converted | QuoteStatus::Rejected) {
            return Err(bad_transition(quote.status, QuoteStatus::Converted).into());
        }

        let lines: Vec<DocumentLineInput> = fetch_lines(&mut *conn, DocumentKind::Quote, quote.id)
            .await?
            .into_iter()
            .map(|item| DocumentLineInput {
                product_id: item.product_id,
                description: item.description,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
            })
            .collect();

        let client = BilledClient {
            id: quote.client_id,
            name: quote.client_name.clone(),
            ice: quote.client_ice.clone(),
            address: quote.client_address.clone(),
        };
        let rate = TvaRate::from_bps(u32::try_from(quote.tva_rate_bps).unwrap_or(0));
        let invoice = InvoiceRepository::insert(
            &mut *conn,
            &client,
            &lines,
            rate,
            quote.notes.clone(),
            None,
        )
        .await?;

        sqlx::query("UPDATE quotes SET status = ?2, converted_invoice_id = ?3 WHERE id = ?1")
            .bind(quote.id)
            .bind(QuoteStatus::Converted)
            .bind(invoice.invoice.id)
            .execute(&mut *conn)
            .await?;
        tx.commit().await?;

        info!(
            quote_id = quote.id,
            invoice_id = invoice.invoice.id,
            number = %invoice.invoice.invoice_number,
            "Quote converted to invoice"
        );
        Ok(invoice)
    }

    // =========================================================================
    // Transaction primitives
    // =========================================================================

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Quote> {
        let sql = format!("{SELECT_QUOTE} WHERE id = ?1");
        sqlx::query_as::<_, Quote>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| not_found(id).into())
    }

    async fn insert(
        conn: &mut SqliteConnection,
        client: &BilledClient,
        lines: &[DocumentLineInput],
        rate: TvaRate,
        notes: Option<String>,
        valid_until: Option<NaiveDate>,
    ) -> DbResult<QuoteDetail> {
        let totals = DocumentTotals::compute(lines, rate);
        let number = next_number(&mut *conn, DocumentKind::Quote).await?;

        let sql = r#"
            INSERT INTO quotes (
                quote_number, client_id, client_name, client_ice, client_address,
                subtotal_ht_cents, tva_rate_bps, tva_cents, total_cents, status, notes,
                issue_date, valid_until
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING id, quote_number, client_id, client_name, client_ice, client_address,
                      subtotal_ht_cents, tva_rate_bps, tva_cents, total_cents, status, notes,
                      converted_invoice_id, issue_date, valid_until
        "#;

        let quote = sqlx::query_as::<_, Quote>(sql)
            .bind(&number)
            .bind(client.id)
            .bind(&client.name)
            .bind(&client.ice)
            .bind(&client.address)
            .bind(totals.subtotal_ht.cents())
            .bind(i64::from(totals.tva_rate.bps()))
            .bind(totals.tva.cents())
            .bind(totals.total.cents())
            .bind(QuoteStatus::Draft)
            .bind(notes)
            .bind(Utc::now())
            .bind(valid_until)
            .fetch_one(&mut *conn)
            .await?;

        let items = insert_lines(&mut *conn, DocumentKind::Quote, quote.id, lines).await?;
        Ok(QuoteDetail { quote, items })
    }
}

fn not_found(id: i64) -> CoreError {
    CoreError::DocumentNotFound {
        kind: "quote".to_string(),
        id,
    }
}

fn bad_transition(from: QuoteStatus, to: QuoteStatus) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "status".to_string(),
        reason: format!("cannot move quote from {from:?} to {to:?}"),
    }
}

fn quote_transition_allowed(from: QuoteStatus, to: QuoteStatus) -> bool {
    use QuoteStatus::*;
    matches!(
        (from, to),
        (Draft, Sent) | (Draft, Accepted) | (Draft, Rejected) | (Sent, Accepted) | (Sent, Rejected)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use gestion_core::InvoiceStatus;

    fn input() -> DocumentInput {
        DocumentInput {
            client_id: None,
            client_name: Some("Café Central".to_string()),
            lines: vec![DocumentLineInput {
                product_id: None,
                description: "Machine expresso".to_string(),
                quantity: 1,
                unit_price_cents: 1_250_000,
            }],
            tva_rate_bps: Some(1400),
            notes: None,
            date_limit: NaiveDate::from_ymd_opt(2026, 12, 31),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let detail = db.quotes().create(&input()).await.unwrap();

        assert!(detail.quote.quote_number.starts_with("D-"));
        assert_eq!(detail.quote.tva_cents, 175_000);
        assert_eq!(detail.quote.total_cents, 1_425_000);
        assert_eq!(detail.quote.valid_until, NaiveDate::from_ymd_opt(2026, 12, 31));

        let fetched = db.quotes().get(detail.quote.id).await.unwrap().unwrap();
        assert_eq!(fetched.items[0].description, "Machine expresso");
        assert_eq!(db.quotes().list(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_convert_to_invoice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let quote = db.quotes().create(&input()).await.unwrap().quote;
        db.quotes()
            .update_status(quote.id, QuoteStatus::Accepted)
            .await
            .unwrap();

        let invoice = db.quotes().convert_to_invoice(quote.id).await.unwrap();
        assert_eq!(invoice.invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.invoice.client_name, "Café Central");
        assert_eq!(invoice.invoice.total_cents, quote.total_cents);
        assert_eq!(invoice.invoice.tva_rate_bps, 1400);
        assert_eq!(invoice.items.len(), 1);

        let converted = db.quotes().get(quote.id).await.unwrap().unwrap().quote;
        assert_eq!(converted.status, QuoteStatus::Converted);
        assert_eq!(converted.converted_invoice_id, Some(invoice.invoice.id));

        let err = db.quotes().convert_to_invoice(quote.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn test_converted_status_not_settable_directly() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let quote = db.quotes().create(&input()).await.unwrap().quote;

        assert!(db
            .quotes()
            .update_status(quote.id, QuoteStatus::Converted)
            .await
            .is_err());
        db.quotes().delete(quote.id).await.unwrap();
        assert!(db.quotes().get(quote.id).await.unwrap().is_none());
    }
}
