//! # Returns Engine
//!
//! Partial or full returns against a recorded sale.
//!
//! ## process
//! ```text
//!  validate_return (pure, no transaction)
//!        │
//!  BEGIN ▼
//!  sale exists, not CORRECTED, client matches
//!  per line: belongs to the sale, qty ≤ sold − already returned
//!  refund  = Σ unit_price × qty   (DEFECTIVE lines × defective_refund_bps)
//!  cash + credit = refund, credit ≤ credit portion not yet refunded
//!        │
//!  next number R-YYYYMMDD-NNNN
//!  INSERT returns ─► INSERT return_items
//!  GOOD + back_to_stock ? stock +units (RETURN)
//!  client.credit_balance −= refund_credit
//!  sale.has_returns = 1, status RETURNED once nothing is left
//!  COMMIT
//! ```

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::DbResult;
use crate::ledger::numbering::next_number;
use crate::repository::client::ClientRepository;
use crate::repository::product::{ProductRepository, StockChange};
use crate::repository::returns::{NewReturn, NewReturnItem, ReturnRepository};
use crate::repository::sale::SaleRepository;
use crate::tx::WriteGate;
use gestion_core::numbering::DocumentKind;
use gestion_core::validation::validate_return;
use gestion_core::{
    CoreError, ItemCondition, Money, MovementKind, ReturnReceipt, ReturnRequest, ReturnableItem,
    SaleStatus, ValidationError, ValidationReport, WALK_IN_CLIENT_ID,
};

/// Returns engine.
#[derive(Debug, Clone)]
pub struct ReturnsEngine {
    gate: WriteGate,
    defective_refund_bps: u32,
}

impl ReturnsEngine {
    pub fn new(gate: WriteGate, defective_refund_bps: u32) -> Self {
        ReturnsEngine {
            gate,
            defective_refund_bps,
        }
    }

    /// Structural pre-flight check. Touches no data.
    pub fn validate(&self, req: &ReturnRequest) -> ValidationReport {
        validate_return(req)
    }

    /// Refund owed for `quantity` of a sold item in `condition`.
    pub fn line_refund(&self, unit_price_cents: i64, quantity: i64, condition: ItemCondition) -> i64 {
        let full = Money::from_cents(unit_price_cents).multiply_quantity(quantity);
        match condition {
            ItemCondition::Good => full.cents(),
            ItemCondition::Defective => full.apply_bps(self.defective_refund_bps).cents(),
        }
    }

    /// Records a return.
    ///
    /// ## Errors
    /// - `Validation` when the pre-flight check fails
    /// - `SaleNotFound`, `SaleItemNotFound`, `InvalidSaleStatus`
    /// - `OverReturn`, `RefundAmountMismatch`, `RefundCreditExceedsCredit`
    /// - `CreditNotAllowedForWalkInClient` for a credit refund to the walk-in client
    pub async fn process(&self, req: &ReturnRequest) -> DbResult<ReturnReceipt> {
        let report = validate_return(req);
        if !report.is_valid {
            return Err(ValidationError::InvalidFormat {
                field: "return".to_string(),
                reason: report.errors.join("; "),
            }
            .into());
        }

        let mut tx = self.gate.begin().await?;
        let conn = tx.conn();

        let sale = SaleRepository::fetch(&mut *conn, req.original_sale_id).await?;
        if sale.status == SaleStatus::Corrected {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale.id,
                current_status: sale.status.as_str().to_string(),
            }
            .into());
        }
        if let Some(client_id) = req.client_id {
            if sale.client_id != Some(client_id) {
                return Err(ValidationError::Mismatch {
                    field: "clientId".to_string(),
                    expected: sale.client_id.unwrap_or_default(),
                    actual: client_id,
                }
                .into());
            }
        }
        let credit_client = sale.client_id.unwrap_or(WALK_IN_CLIENT_ID);
        if req.refund_credit_cents > 0 && credit_client == WALK_IN_CLIENT_ID {
            return Err(CoreError::CreditNotAllowedForWalkInClient.into());
        }

        let returnable = ReturnRepository::returnable_by_item(&mut *conn, sale.id).await?;
        let mut lines = Vec::with_capacity(req.items.len());
        for line in &req.items {
            let item = returnable
                .get(&line.sale_item_id)
                .filter(|item| item.product_id == line.product_id)
                .ok_or(CoreError::SaleItemNotFound {
                    sale_id: sale.id,
                    sale_item_id: line.sale_item_id,
                })?;

            if line.quantity > item.remaining() {
                warn!(
                    sale_item_id = item.sale_item_id,
                    remaining = item.remaining(),
                    requested = line.quantity,
                    "Return rejected: over-return"
                );
                return Err(CoreError::OverReturn {
                    sale_item_id: item.sale_item_id,
                    sold: item.quantity_sold,
                    already_returned: item.quantity_returned,
                    requested: line.quantity,
                }
                .into());
            }

            lines.push(NewReturnItem {
                original_sale_item_id: item.sale_item_id,
                product_id: item.product_id,
                quantity_returned: line.quantity,
                unit: item.unit,
                unit_price_cents: item.unit_price_cents,
                refund_cents: self.line_refund(item.unit_price_cents, line.quantity, line.condition),
                condition: line.condition,
                back_to_stock: line.restocks(),
                stock_units: item.stock_units(line.quantity),
            });
        }

        let expected: i64 = lines.iter().map(|l| l.refund_cents).sum();
        let provided = req.refund_cash_cents.saturating_add(req.refund_credit_cents);
        if provided != expected {
            return Err(CoreError::RefundAmountMismatch { expected, provided }.into());
        }

        let available_credit =
            sale.paid_credit_cents - ReturnRepository::credit_refunded(&mut *conn, sale.id).await?;
        if req.refund_credit_cents > available_credit {
            return Err(CoreError::RefundCreditExceedsCredit {
                sale_id: sale.id,
                available: available_credit,
                requested: req.refund_credit_cents,
            }
            .into());
        }

        let return_number = next_number(&mut *conn, DocumentKind::Return).await?;
        let reason = req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        let sale_return = ReturnRepository::insert_return(
            &mut *conn,
            &NewReturn {
                return_number: &return_number,
                original_sale_id: sale.id,
                client_id: sale.client_id,
                user_id: req.user_id,
                refund_cash_cents: req.refund_cash_cents,
                refund_credit_cents: req.refund_credit_cents,
                reason,
            },
        )
        .await?;

        for line in &lines {
            ReturnRepository::insert_item(&mut *conn, sale_return.id, line).await?;
            if line.back_to_stock {
                ProductRepository::apply_stock_delta(
                    &mut *conn,
                    line.product_id,
                    line.stock_units,
                    StockChange::new(MovementKind::Return, sale_return.id),
                )
                .await?;
            }
        }

        if req.refund_credit_cents > 0 {
            ClientRepository::apply_credit_delta(&mut *conn, credit_client, -req.refund_credit_cents)
                .await?;
        }

        let fully_returned = Self::nothing_left(&returnable, &lines);
        SaleRepository::mark_returned(&mut *conn, sale.id, fully_returned).await?;

        tx.commit().await?;

        info!(
            return_id = sale_return.id,
            number = %sale_return.return_number,
            sale_id = sale.id,
            refund = expected,
            refund_credit = req.refund_credit_cents,
            fully_returned,
            "Return processed"
        );
        Ok(ReturnReceipt {
            return_id: sale_return.id,
            return_number: sale_return.return_number,
            total_refund_cents: expected,
        })
    }

    /// Whether this return exhausts every item of the sale.
    fn nothing_left(returnable: &HashMap<i64, ReturnableItem>, lines: &[NewReturnItem]) -> bool {
        returnable.values().all(|item| {
            let now: i64 = lines
                .iter()
                .filter(|l| l.original_sale_item_id == item.sale_item_id)
                .map(|l| l.quantity_returned)
                .sum();
            item.remaining() - now <= 0
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
