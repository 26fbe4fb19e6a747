//! # Sales Ledger
//!
//! Records sales and corrects finalized ones. Each call is one
//! transaction: stock, sale rows and client credit land together or not
//! at all.
//!
//! ## process
//! ```text
//!  validate_sale_request (no transaction yet)
//!        │
//!  BEGIN ▼
//!  client exists ── products exist ── stock ≥ units needed per product
//!        │
//!  next ticket V-YYYYMMDD-NNNN
//!        │
//!  INSERT sales ─► INSERT sale_items ─► stock −units (SALE)
//!        │
//!  credit > 0 ? client.credit_balance += credit
//!  COMMIT
//! ```
//!
//! ## edit
//! ```text
//!  BEGIN
//!  original COMPLETED, no returns
//!  stock +units per original line (SALE_REVERSAL)
//!  original client credit −= original credit
//!  original.status = CORRECTED
//!  process(new data) with original_sale_id = original, new ticket
//!  COMMIT
//! ```

use std::collections::{BTreeMap, HashMap};

use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::DbResult;
use crate::ledger::numbering::next_number;
use crate::repository::client::ClientRepository;
use crate::repository::product::{ProductRepository, StockChange};
use crate::repository::sale::{NewSale, NewSaleItem, SaleRepository};
use crate::tx::WriteGate;
use gestion_core::numbering::DocumentKind;
use gestion_core::validation::validate_sale_request;
use gestion_core::{
    CoreError, MovementKind, Product, Sale, SaleReceipt, SaleRequest, SaleStatus, SaleUnit,
};

/// Sales ledger engine.
#[derive(Debug, Clone)]
pub struct SalesLedger {
    gate: WriteGate,
}

impl SalesLedger {
    pub fn new(gate: WriteGate) -> Self {
        SalesLedger { gate }
    }

    /// Records a new sale.
    ///
    /// ## Errors
    /// - `Validation` / `InvalidPaymentAmount` for a malformed request
    /// - `CreditNotAllowedForWalkInClient`
    /// - `ClientNotFound`, `ProductNotFound`
    /// - `InsufficientStock` (nothing is written)
    pub async fn process(&self, req: &SaleRequest) -> DbResult<SaleReceipt> {
        validate_sale_request(req)?;

        let mut tx = self.gate.begin().await?;
        let sale = Self::record(tx.conn(), req, None).await?;
        tx.commit().await?;

        info!(
            sale_id = sale.id,
            ticket = %sale.ticket_number,
            total = sale.total_cents,
            credit = sale.paid_credit_cents,
            "Sale processed"
        );
        Ok(SaleReceipt {
            sale_id: sale.id,
            ticket_number: sale.ticket_number,
        })
    }

    /// Replaces a finalized sale by a corrected one.
    ///
    /// The original row stays in the journal as CORRECTED; the returned
    /// receipt names the replacement. Sales with returns cannot be edited.
    pub async fn edit(&self, original_sale_id: i64, req: &SaleRequest) -> DbResult<SaleReceipt> {
        validate_sale_request(req)?;

        let mut tx = self.gate.begin().await?;
        let conn = tx.conn();

        let original = SaleRepository::fetch(&mut *conn, original_sale_id).await?;
        if original.has_returns {
            return Err(CoreError::SaleHasReturns(original.id).into());
        }
        if original.status != SaleStatus::Completed {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: original.id,
                current_status: original.status.as_str().to_string(),
            }
            .into());
        }

        Self::reverse(&mut *conn, &original).await?;
        SaleRepository::set_status(&mut *conn, original.id, SaleStatus::Corrected).await?;

        let replacement = Self::record(&mut *conn, req, Some(original.id)).await?;
        tx.commit().await?;

        info!(
            original_sale_id = original.id,
            sale_id = replacement.id,
            ticket = %replacement.ticket_number,
            "Sale corrected"
        );
        Ok(SaleReceipt {
            sale_id: replacement.id,
            ticket_number: replacement.ticket_number,
        })
    }

    /// Undoes the stock and credit effects of a sale.
    async fn reverse(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        let items = SaleRepository::fetch_items(&mut *conn, sale.id).await?;
        for item in &items {
            ProductRepository::apply_stock_delta(
                &mut *conn,
                item.product_id,
                item.stock_units(item.quantity),
                StockChange::new(MovementKind::SaleReversal, sale.id),
            )
            .await?;
        }

        if sale.paid_credit_cents > 0 {
            match sale.client_id {
                Some(client_id) => {
                    ClientRepository::apply_credit_delta(
                        &mut *conn,
                        client_id,
                        -sale.paid_credit_cents,
                    )
                    .await?;
                }
                None => warn!(
                    sale_id = sale.id,
                    credit = sale.paid_credit_cents,
                    "Client of the corrected sale was deleted, credit not reversed"
                ),
            }
        }

        Ok(())
    }

    /// Writes a sale and applies its stock and credit effects.
    async fn record(
        conn: &mut SqliteConnection,
        req: &SaleRequest,
        original_sale_id: Option<i64>,
    ) -> DbResult<Sale> {
        ClientRepository::fetch(&mut *conn, req.client_id).await?;

        let mut products: HashMap<i64, Product> = HashMap::new();
        let mut needed: BTreeMap<i64, i64> = BTreeMap::new();
        for line in &req.cart {
            if !products.contains_key(&line.product_id) {
                let product = ProductRepository::fetch(&mut *conn, line.product_id).await?;
                products.insert(line.product_id, product);
            }
            let product = &products[&line.product_id];
            *needed.entry(line.product_id).or_insert(0) +=
                product.stock_units(line.unit, line.quantity);
        }

        // Check every product before writing, so the error names the
        // full quantity the cart asks for.
        for (product_id, units) in &needed {
            let product = &products[product_id];
            if product.stock < *units {
                warn!(
                    product_id,
                    available = product.stock,
                    requested = units,
                    "Sale rejected: insufficient stock"
                );
                return Err(CoreError::InsufficientStock {
                    product_id: *product_id,
                    product_name: product.name.clone(),
                    available: product.stock,
                    requested: *units,
                }
                .into());
            }
        }

        let ticket_number = next_number(&mut *conn, DocumentKind::Sale).await?;
        let sale = SaleRepository::insert_sale(
            &mut *conn,
            &NewSale {
                ticket_number: &ticket_number,
                client_id: req.client_id,
                user_id: req.user_id,
                total_cents: req.total_cents,
                paid_cash_cents: req.amount_paid_cash_cents,
                paid_credit_cents: req.credit_cents,
                payment_method: req.payment_method,
                original_sale_id,
            },
        )
        .await?;

        for line in &req.cart {
            let product = &products[&line.product_id];
            let purchase_price_cents = line
                .purchase_price_cents
                .unwrap_or_else(|| unit_cost(product, line.unit));
            let units_per_item = product.stock_units(line.unit, 1);

            SaleRepository::insert_item(
                &mut *conn,
                sale.id,
                &NewSaleItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit: line.unit,
                    unit_price_cents: line.unit_price_cents,
                    purchase_price_cents,
                    units_per_item,
                },
            )
            .await?;

            ProductRepository::apply_stock_delta(
                &mut *conn,
                line.product_id,
                -(units_per_item * line.quantity),
                StockChange::new(MovementKind::Sale, sale.id),
            )
            .await?;
        }

        if req.credit_cents > 0 {
            ClientRepository::apply_credit_delta(&mut *conn, req.client_id, req.credit_cents)
                .await?;
        }

        Ok(sale)
    }
}

/// Cost of one sold `unit` of a product.
fn unit_cost(product: &Product, unit: SaleUnit) -> i64 {
    match unit {
        SaleUnit::Carton => product.purchase_price_cents * product.pieces_per_carton,
        SaleUnit::Retail | SaleUnit::Wholesale => product.purchase_price_cents,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
