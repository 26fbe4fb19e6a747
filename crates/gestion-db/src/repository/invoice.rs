//! # Invoice Repository
//!
//! Invoices (factures) with their own HT / TVA / TTC totals. They never
//! touch stock or client credit.
//!
//! ## Status
//! ```text
//! DRAFT ──► ISSUED ──► PAID
//!   │          │
//!   └──────────┴─────► CANCELLED
//! ```
//!
//! The client's name, ICE and address are copied onto the invoice when it
//! is created, so a later client edit never rewrites an issued invoice.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::ledger::numbering::next_number;
use crate::repository::client::ClientRepository;
use crate::tx::WriteGate;
use gestion_core::numbering::DocumentKind;
use gestion_core::validation::{normalize_optional, validate_document};
use gestion_core::{
    CoreError, DocumentInput, DocumentItem, DocumentLineInput, DocumentTotals, Invoice,
    InvoiceDetail, InvoiceStatus, TvaRate, ValidationError,
};

const SELECT_INVOICE: &str = r#"
    SELECT id, invoice_number, client_id, client_name, client_ice, client_address,
           subtotal_ht_cents, tva_rate_bps, tva_cents, total_cents, status, notes,
           issue_date, due_date
    FROM invoices
"#;

// =============================================================================
// Shared with quotes
// =============================================================================

/// Client identity printed on a billing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BilledClient {
    pub id: Option<i64>,
    pub name: String,
    pub ice: Option<String>,
    pub address: Option<String>,
}

/// Resolves the billed client: a known client, or a one-off name.
pub(crate) async fn billed_client(
    conn: &mut SqliteConnection,
    input: &DocumentInput,
) -> DbResult<BilledClient> {
    match input.client_id {
        Some(id) => {
            let client = ClientRepository::fetch(conn, id).await?;
            Ok(BilledClient {
                id: Some(client.id),
                name: client.name,
                ice: client.ice,
                address: client.address,
            })
        }
        None => {
            let name = input
                .client_name
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            Ok(BilledClient {
                id: None,
                name,
                ice: None,
                address: None,
            })
        }
    }
}

/// Lines table and foreign key column of a kind of billing document.
fn lines_location(kind: DocumentKind) -> (&'static str, &'static str) {
    match kind {
        DocumentKind::Quote => ("quote_items", "quote_id"),
        _ => ("invoice_items", "invoice_id"),
    }
}

pub(crate) async fn insert_lines(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
    lines: &[DocumentLineInput],
) -> DbResult<Vec<DocumentItem>> {
    let (table, fk) = lines_location(kind);
    let sql = format!(
        r#"
        INSERT INTO {table} ({fk}, product_id, description, quantity, unit_price_cents, line_total_cents)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING id, {fk} AS document_id, product_id, description, quantity,
                  unit_price_cents, line_total_cents
        "#
    );

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = sqlx::query_as::<_, DocumentItem>(&sql)
            .bind(document_id)
            .bind(line.product_id)
            .bind(line.description.trim())
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.unit_price_cents * line.quantity)
            .fetch_one(&mut *conn)
            .await?;
        items.push(item);
    }

    Ok(items)
}

pub(crate) async fn fetch_lines(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
) -> DbResult<Vec<DocumentItem>> {
    let (table, fk) = lines_location(kind);
    let sql = format!(
        r#"
        SELECT id, {fk} AS document_id, product_id, description, quantity,
               unit_price_cents, line_total_cents
        FROM {table}
        WHERE {fk} = ?1
        ORDER BY id
        "#
    );

    let items = sqlx::query_as::<_, DocumentItem>(&sql)
        .bind(document_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    gate: WriteGate,
    default_tva: TvaRate,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate, default_tva: TvaRate) -> Self {
        InvoiceRepository {
            pool,
            gate,
            default_tva,
        }
    }

    /// Creates a DRAFT invoice numbered `F-YYYYMMDD-NNNN`.
    pub async fn create(&self, input: &DocumentInput) -> DbResult<InvoiceDetail> {
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
            invoice_id = detail.invoice.id,
            number = %detail.invoice.invoice_number,
            total = detail.invoice.total_cents,
            "Invoice created"
        );
        Ok(detail)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<InvoiceDetail>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{SELECT_INVOICE} WHERE id = ?1");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match invoice {
            Some(invoice) => {
                let items = fetch_lines(&mut *conn, DocumentKind::Invoice, invoice.id).await?;
                Ok(Some(InvoiceDetail { invoice, items }))
            }
            None => Ok(None),
        }
    }

    /// Invoices, newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Invoice>> {
        let sql = format!("{SELECT_INVOICE} ORDER BY id DESC LIMIT ?1 OFFSET ?2");
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(invoices)
    }

    pub async fn update_status(&self, id: i64, status: InvoiceStatus) -> DbResult<Invoice> {
        let mut tx = self.gate.begin().await?;
        let conn = tx.conn();

        let current = Self::fetch(&mut *conn, id).await?;
        if !invoice_transition_allowed(current.status, status) {
            return Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("cannot move invoice from {:?} to {:?}", current.status, status),
            }
            .into());
        }

        sqlx::query("UPDATE invoices SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&mut *conn)
            .await?;
        let updated = Self::fetch(&mut *conn, id).await?;
        tx.commit().await?;

        info!(invoice_id = id, status = ?status, "Invoice status changed");
        Ok(updated)
    }

    /// Deletes an invoice and its lines.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.gate.begin().await?;
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(tx.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id).into());
        }
        tx.commit().await?;

        info!(invoice_id = id, "Invoice deleted");
        Ok(())
    }

    // =========================================================================
    // Transaction primitives
    // =========================================================================

    pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Invoice> {
        let sql = format!("{SELECT_INVOICE} WHERE id = ?1");
        sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| not_found(id).into())
    }

    /// Writes a DRAFT invoice and its lines.
    pub(crate) async fn insert(
        conn: &mut SqliteConnection,
        client: &BilledClient,
        lines: &[DocumentLineInput],
        rate: TvaRate,
        notes: Option<String>,
        due_date: Option<NaiveDate>,
    ) -> DbResult<InvoiceDetail> {
        let totals = DocumentTotals::compute(lines, rate);
        let number = next_number(&mut *conn, DocumentKind::Invoice).await?;

        let sql = r#"
            INSERT INTO invoices (
                invoice_number, client_id, client_name, client_ice, client_address,
                subtotal_ht_cents, tva_rate_bps, tva_cents, total_cents, status, notes,
                issue_date, due_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING id, invoice_number, client_id, client_name, client_ice, client_address,
                      subtotal_ht_cents, tva_rate_bps, tva_cents, total_cents, status, notes,
                      issue_date, due_date
        "#;

        let invoice = sqlx::query_as::<_, Invoice>(sql)
            .bind(&number)
            .bind(client.id)
            .bind(&client.name)
            .bind(&client.ice)
            .bind(&client.address)
            .bind(totals.subtotal_ht.cents())
            .bind(i64::from(totals.tva_rate.bps()))
            .bind(totals.tva.cents())
            .bind(totals.total.cents())
            .bind(InvoiceStatus::Draft)
            .bind(notes)
            .bind(Utc::now())
            .bind(due_date)
            .fetch_one(&mut *conn)
            .await?;

        let items = insert_lines(&mut *conn, DocumentKind::Invoice, invoice.id, lines).await?;
        Ok(InvoiceDetail { invoice, items })
    }
}

fn not_found(id: i64) -> CoreError {
    CoreError::DocumentNotFound {
        kind: "invoice".to_string(),
        id,
    }
}

fn invoice_transition_allowed(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    use InvoiceStatus::*;
    matches!(
        (from, to),
        (Draft, Issued) | (Draft, Cancelled) | (Issued, Paid) | (Issued, Cancelled)
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use gestion_core::ClientInput;

    fn lines() -> Vec<DocumentLineInput> {
        vec![
            DocumentLineInput {
                product_id: None,
                description: "Peinture blanche 20L".to_string(),
                quantity: 2,
                unit_price_cents: 45_000,
            },
            DocumentLineInput {
                product_id: None,
                description: "Rouleau".to_string(),
                quantity: 3,
                unit_price_cents: 3_335,
            },
        ]
    }

    fn input(client_id: Option<i64>) -> DocumentInput {
        DocumentInput {
            client_id,
            client_name: Some("Chantier Anfa".to_string()),
            lines: lines(),
            tva_rate_bps: None,
            notes: Some("  Livraison incluse ".to_string()),
            date_limit: None,
        }
    }

    #[tokio::test]
    async fn test_create_computes_totals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let detail = db.invoices().create(&input(None)).await.unwrap();
        let invoice = &detail.invoice;

        assert!(invoice.invoice_number.starts_with("F-"));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.client_name, "Chantier Anfa");
        // 900.00 + 100.05 = 1000.05 HT, TVA 20 % = 200.01
        assert_eq!(invoice.subtotal_ht_cents, 100_005);
        assert_eq!(invoice.tva_rate_bps, 2000);
        assert_eq!(invoice.tva_cents, 20_001);
        assert_eq!(invoice.total_cents, 120_006);
        assert_eq!(invoice.notes.as_deref(), Some("Livraison incluse"));
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[1].line_total_cents, 10_005);
    }

    #[tokio::test]
    async fn test_client_identity_is_copied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let client = db
            .clients()
            .add(&ClientInput {
                name: "Société Atlas".to_string(),
                ice: Some("001525452000088".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut doc = input(Some(client.id));
        doc.tva_rate_bps = Some(1000);
        let detail = db.invoices().create(&doc).await.unwrap();

        assert_eq!(detail.invoice.client_name, "Société Atlas");
        assert_eq!(detail.invoice.client_ice.as_deref(), Some("001525452000088"));
        assert_eq!(detail.invoice.tva_cents, 10_001);

        let fetched = db.invoices().get(detail.invoice.id).await.unwrap().unwrap();
        assert_eq!(fetched.items.len(), 2);
        assert_eq!(fetched.items[0].document_id, detail.invoice.id);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = db.invoices().create(&input(None)).await.unwrap().invoice.id;

        let err = db
            .invoices()
            .update_status(id, InvoiceStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));

        db.invoices().update_status(id, InvoiceStatus::Issued).await.unwrap();
        let paid = db.invoices().update_status(id, InvoiceStatus::Paid).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = db.invoices().create(&input(None)).await.unwrap();
        let second = db.invoices().create(&input(None)).await.unwrap();
        assert_ne!(first.invoice.invoice_number, second.invoice.invoice_number);

        let list = db.invoices().list(10, 0).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.invoice.id);

        db.invoices().delete(first.invoice.id).await.unwrap();
        assert!(db.invoices().get(first.invoice.id).await.unwrap().is_none());

        let err = db.invoices().delete(first.invoice.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::DocumentNotFound { .. })
        ));
    }
}
