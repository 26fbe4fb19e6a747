//! # Domain Types
//!
//! Core domain types used throughout GestionPro.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐          │
//! │  │   Product    │    │    Client    │    │      Sale        │          │
//! │  │  stock ≥ 0   │◄─┐ │ credit_bal.  │◄───│ ticket V-…-NNNN  │          │
//! │  └──────────────┘  │ └──────────────┘    │ cash + credit    │          │
//! │                    │                     └────────┬─────────┘          │
//! │                    │                              │ 1..n               │
//! │                    │ ┌──────────────┐    ┌────────▼─────────┐          │
//! │                    └─│  SaleItem    │◄───│   ReturnItem     │          │
//! │                      │ cost snapshot│    │ GOOD / DEFECTIVE │          │
//! │                      └──────────────┘    └────────┬─────────┘          │
//! │                                                   │ n..1               │
//! │                                          ┌────────▼─────────┐          │
//! │                                          │   SaleReturn     │          │
//! │                                          │ return R-…-NNNN  │          │
//! │                                          └──────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row types derive `sqlx::FromRow` behind the `sqlx` feature, so
//! gestion-db decodes rows straight into them. Request types are what the
//! GUI shell sends; they are camelCase on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ClientConflict;
use crate::money::{Money, TvaRate};
use crate::WALK_IN_CLIENT_ID;

// =============================================================================
// Enums
// =============================================================================

/// Unit a product is sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleUnit {
    Retail,
    Wholesale,
    Carton,
}

impl Default for SaleUnit {
    fn default() -> Self {
        SaleUnit::Retail
    }
}

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    /// Finalized sale, stock and credit applied.
    Completed,
    /// Every item has been returned.
    Returned,
    /// Superseded by a corrected replacement sale (see `original_sale_id`).
    Corrected,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Returned => "RETURNED",
            SaleStatus::Corrected => "CORRECTED",
        }
    }
}

/// How the customer settled the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Check,
    /// Some or all of the total goes on the client's account.
    Credit,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// Status of a return record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    Completed,
    /// Kept for rows written by older back-office versions.
    PendingValidation,
}

/// Condition of a returned item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCondition {
    Good,
    Defective,
}

impl Default for ItemCondition {
    fn default() -> Self {
        ItemCondition::Good
    }
}

/// Why a product's stock moved. One `stock_movements` row per change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Sale,
    SaleReversal,
    Return,
    Adjustment,
    LotReceipt,
}

/// Kind of entry in the client credit journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditEntryKind {
    /// Client paid back part of what they owe.
    Payment,
    /// Debt recorded by hand, outside of any sale.
    ManualDebt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    /// Turned into an invoice, see `converted_invoice_id`.
    Converted,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalogue.
///
/// `stock` is counted in retail pieces and never goes negative. It is only
/// changed by the sales ledger, the returns engine, stock adjustments and
/// lot receipts.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub barcode: Option<String>,
    pub name: String,
    /// Cost price per piece, used for margin reporting.
    pub purchase_price_cents: i64,
    pub price_retail_cents: i64,
    pub price_wholesale_cents: i64,
    /// Price of a full carton.
    pub price_carton_cents: i64,
    pub pieces_per_carton: i64,
    pub stock: i64,
    pub alert_threshold: i64,
    pub category: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// List price for the given unit.
    pub fn price_for(&self, unit: SaleUnit) -> Money {
        Money::from_cents(match unit {
            SaleUnit::Retail => self.price_retail_cents,
            SaleUnit::Wholesale => self.price_wholesale_cents,
            SaleUnit::Carton => self.price_carton_cents,
        })
    }

    /// Number of stock pieces moved by `quantity` of `unit`.
    pub fn stock_units(&self, unit: SaleUnit, quantity: i64) -> i64 {
        stock_units(unit, quantity, self.pieces_per_carton)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.alert_threshold
    }
}

/// Stock pieces for `quantity` of `unit`: cartons expand to
/// `pieces_per_carton` pieces, retail and wholesale count one piece each.
pub fn stock_units(unit: SaleUnit, quantity: i64, pieces_per_carton: i64) -> i64 {
    match unit {
        SaleUnit::Carton => quantity * pieces_per_carton.max(1),
        SaleUnit::Retail | SaleUnit::Wholesale => quantity,
    }
}

/// Product fields accepted on create and update.
///
/// `stock` is only read on create; updates go through stock adjustments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductInput {
    pub barcode: Option<String>,
    pub name: String,
    pub purchase_price_cents: i64,
    pub price_retail_cents: i64,
    pub price_wholesale_cents: i64,
    pub price_carton_cents: i64,
    pub pieces_per_carton: i64,
    pub stock: i64,
    pub alert_threshold: i64,
    pub category: Option<String>,
}

impl Default for ProductInput {
    fn default() -> Self {
        ProductInput {
            barcode: None,
            name: String::new(),
            purchase_price_cents: 0,
            price_retail_cents: 0,
            price_wholesale_cents: 0,
            price_carton_cents: 0,
            pieces_per_carton: 1,
            stock: 0,
            alert_threshold: 0,
            category: None,
        }
    }
}

/// One line of a manual stock count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentLine {
    pub product_id: i64,
    pub new_quantity: i64,
}

/// Audit row written for every manual stock change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub id: i64,
    pub product_id: i64,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub reason: String,
    pub user_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One change of a product's stock, whatever its origin.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub delta: i64,
    pub stock_after: i64,
    pub kind: MovementKind,
    /// Sale, return, adjustment or lot id depending on `kind`.
    pub reference_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A purchased batch of a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockLot {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
}

// =============================================================================
// Client
// =============================================================================

/// A customer. `credit_balance_cents > 0` means the client owes money.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Identifiant Commun de l'Entreprise (Moroccan company id).
    pub ice: Option<String>,
    pub credit_balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn is_walk_in(&self) -> bool {
        self.id == WALK_IN_CLIENT_ID
    }

    pub fn credit_balance(&self) -> Money {
        Money::from_cents(self.credit_balance_cents)
    }

    /// Identity reported when this client blocks another insert.
    pub fn conflict(&self) -> ClientConflict {
        ClientConflict {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            ice: self.ice.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientInput {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub ice: Option<String>,
}

/// Payment against a client's credit balance.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditPaymentRequest {
    pub client_id: i64,
    pub user_id: Option<i64>,
    pub amount_paid_cents: i64,
    pub note: Option<String>,
}

/// Row of the `credit_payments` journal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditEntry {
    pub id: i64,
    pub client_id: i64,
    pub user_id: Option<i64>,
    pub kind: CreditEntryKind,
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale.
///
/// Invariant: `total_cents == paid_cash_cents + paid_credit_cents`
/// (also enforced by a CHECK constraint).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub ticket_number: String,
    pub client_id: Option<i64>,
    pub user_id: Option<i64>,
    pub total_cents: i64,
    pub paid_cash_cents: i64,
    pub paid_credit_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    /// Set on a corrected replacement; points at the sale it supersedes.
    pub original_sale_id: Option<i64>,
    pub has_returns: bool,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

impl Sale {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn paid_credit(&self) -> Money {
        Money::from_cents(self.paid_credit_cents)
    }
}

/// A line of a sale. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit: SaleUnit,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Cost per `unit` at sale time (frozen for margin reporting).
    pub purchase_price_cents: i64,
    /// Stock pieces per sold `unit` at sale time.
    pub units_per_item: i64,
}

impl SaleItem {
    /// Stock pieces moved by `quantity` of this line.
    pub fn stock_units(&self, quantity: i64) -> i64 {
        quantity * self.units_per_item.max(1)
    }
}

/// A sale with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// One cart line as built by the caisse.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub unit: SaleUnit,
    pub unit_price_cents: i64,
    /// Cost snapshot. Taken from the product when absent.
    #[serde(default)]
    pub purchase_price_cents: Option<i64>,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// `None` when `unit_price × quantity` does not fit in centimes.
    pub fn checked_line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_multiply_quantity(self.quantity)
    }
}

/// Input of `sales.process` and the replacement data of `sales.edit`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    #[serde(default = "default_client_id")]
    pub client_id: i64,
    pub cart: Vec<CartLine>,
    pub total_cents: i64,
    pub amount_paid_cash_cents: i64,
    #[serde(default)]
    pub credit_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub user_id: Option<i64>,
}

fn default_client_id() -> i64 {
    WALK_IN_CLIENT_ID
}

/// Result of a processed or edited sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale_id: i64,
    pub ticket_number: String,
}

/// Filters for the sales history screen. All optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub client_id: Option<i64>,
    pub status: Option<SaleStatus>,
    pub limit: Option<i64>,
}

// =============================================================================
// Returns
// =============================================================================

/// A return recorded against a sale.
///
/// Invariant: `total_refund_cents == refund_cash_cents + refund_credit_cents`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleReturn {
    pub id: i64,
    pub return_number: String,
    pub original_sale_id: i64,
    pub client_id: Option<i64>,
    pub user_id: Option<i64>,
    pub total_refund_cents: i64,
    pub refund_cash_cents: i64,
    pub refund_credit_cents: i64,
    pub reason: Option<String>,
    pub status: ReturnStatus,
    #[ts(as = "String")]
    pub return_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItem {
    pub id: i64,
    pub return_id: i64,
    pub original_sale_item_id: i64,
    pub product_id: i64,
    pub quantity_returned: i64,
    pub unit: SaleUnit,
    pub unit_price_cents: i64,
    pub refund_cents: i64,
    pub condition_status: ItemCondition,
    pub back_to_stock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnDetail {
    #[serde(rename = "return")]
    pub sale_return: SaleReturn,
    pub items: Vec<ReturnItem>,
}

/// One line of a return request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLine {
    pub sale_item_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub condition: ItemCondition,
    #[serde(default = "default_back_to_stock")]
    pub back_to_stock: bool,
}

fn default_back_to_stock() -> bool {
    true
}

impl ReturnLine {
    /// Only good items flagged back-to-stock return to sellable stock.
    pub fn restocks(&self) -> bool {
        self.condition == ItemCondition::Good && self.back_to_stock
    }
}

/// Input of `sales.processReturn`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub original_sale_id: i64,
    /// When given, must match the sale's client.
    #[serde(default)]
    pub client_id: Option<i64>,
    pub items: Vec<ReturnLine>,
    #[serde(default)]
    pub refund_cash_cents: i64,
    #[serde(default)]
    pub refund_credit_cents: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnReceipt {
    pub return_id: i64,
    pub return_number: String,
    pub total_refund_cents: i64,
}

/// What is still returnable on one sale item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnableItem {
    pub sale_item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit: SaleUnit,
    pub unit_price_cents: i64,
    pub quantity_sold: i64,
    pub quantity_returned: i64,
    /// Stock pieces per sold `unit`, as frozen on the sale item.
    pub units_per_item: i64,
}

impl ReturnableItem {
    pub fn remaining(&self) -> i64 {
        self.quantity_sold - self.quantity_returned
    }

    /// Stock pieces that `quantity` returned units put back.
    pub fn stock_units(&self, quantity: i64) -> i64 {
        quantity * self.units_per_item.max(1)
    }
}

/// Outcome of the pure return pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

// =============================================================================
// Billing documents (invoices and quotes)
// =============================================================================

/// An invoice (facture). Not coupled to stock or credit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub client_id: Option<i64>,
    pub client_name: String,
    pub client_ice: Option<String>,
    pub client_address: Option<String>,
    pub subtotal_ht_cents: i64,
    pub tva_rate_bps: i64,
    pub tva_cents: i64,
    pub total_cents: i64,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub issue_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

/// A quote (devis). Not coupled to stock or credit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: i64,
    pub quote_number: String,
    pub client_id: Option<i64>,
    pub client_name: String,
    pub client_ice: Option<String>,
    pub client_address: Option<String>,
    pub subtotal_ht_cents: i64,
    pub tva_rate_bps: i64,
    pub tva_cents: i64,
    pub total_cents: i64,
    pub status: QuoteStatus,
    pub notes: Option<String>,
    pub converted_invoice_id: Option<i64>,
    #[ts(as = "String")]
    pub issue_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<NaiveDate>,
}

/// A line of an invoice or quote.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub id: i64,
    pub document_id: i64,
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLineInput {
    #[serde(default)]
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Input for creating an invoice or a quote.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub client_id: Option<i64>,
    /// Used when `client_id` is absent (one-off customer).
    #[serde(default)]
    pub client_name: Option<String>,
    pub lines: Vec<DocumentLineInput>,
    /// Falls back to the configured default rate.
    #[serde(default)]
    pub tva_rate_bps: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Due date for invoices, validity date for quotes.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date_limit: Option<NaiveDate>,
}

/// HT / TVA / TTC breakdown of a billing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub subtotal_ht: Money,
    pub tva_rate: TvaRate,
    pub tva: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Computes the totals of a set of lines at one TVA rate.
    pub fn compute(lines: &[DocumentLineInput], rate: TvaRate) -> Self {
        let subtotal_ht: Money = lines
            .iter()
            .map(|l| Money::from_cents(l.unit_price_cents).multiply_quantity(l.quantity))
            .sum();
        let tva = subtotal_ht.calculate_tva(rate);
        DocumentTotals {
            subtotal_ht,
            tva_rate: rate,
            tva,
            total: subtotal_ht + tva,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<DocumentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetail {
    pub quote: Quote,
    pub items: Vec<DocumentItem>,
}

// =============================================================================
// Dashboard
// =============================================================================

/// Aggregates over a date range. Corrected sales are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub sale_count: i64,
    pub revenue_cents: i64,
    pub cash_collected_cents: i64,
    pub credit_issued_cents: i64,
    pub gross_margin_cents: i64,
    pub refunds_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: i64,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_units_expands_cartons() {
        assert_eq!(stock_units(SaleUnit::Retail, 3, 12), 3);
        assert_eq!(stock_units(SaleUnit::Wholesale, 3, 12), 3);
        assert_eq!(stock_units(SaleUnit::Carton, 2, 12), 24);
        // A misconfigured carton size still moves at least one piece
        assert_eq!(stock_units(SaleUnit::Carton, 2, 0), 2);
    }

    #[test]
    fn test_return_line_restocks_only_good_items() {
        let mut line = ReturnLine {
            sale_item_id: 1,
            product_id: 1,
            quantity: 1,
            condition: ItemCondition::Good,
            back_to_stock: true,
        };
        assert!(line.restocks());

        line.back_to_stock = false;
        assert!(!line.restocks());

        line.back_to_stock = true;
        line.condition = ItemCondition::Defective;
        assert!(!line.restocks());
    }

    #[test]
    fn test_sale_request_defaults_to_walk_in_cash() {
        let json = r#"{
            "cart": [{"productId": 4, "quantity": 2, "unitPriceCents": 1000}],
            "totalCents": 2000,
            "amountPaidCashCents": 2000
        }"#;
        let req: SaleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.client_id, WALK_IN_CLIENT_ID);
        assert_eq!(req.payment_method, PaymentMethod::Cash);
        assert_eq!(req.credit_cents, 0);
        assert_eq!(req.cart[0].unit, SaleUnit::Retail);
        assert_eq!(req.cart[0].line_total().cents(), 2000);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&SaleStatus::Corrected).unwrap(), "\"CORRECTED\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::Check).unwrap(), "\"check\"");
        assert_eq!(
            serde_json::to_string(&ReturnStatus::PendingValidation).unwrap(),
            "\"PENDING_VALIDATION\""
        );
        assert_eq!(SaleStatus::Returned.as_str(), "RETURNED");
    }

    #[test]
    fn test_document_totals() {
        let lines = vec![
            DocumentLineInput {
                product_id: None,
                description: "Pose".into(),
                quantity: 2,
                unit_price_cents: 15_000,
            },
            DocumentLineInput {
                product_id: Some(3),
                description: "Câble".into(),
                quantity: 10,
                unit_price_cents: 250,
            },
        ];
        let totals = DocumentTotals::compute(&lines, TvaRate::STANDARD);
        assert_eq!(totals.subtotal_ht.cents(), 32_500);
        assert_eq!(totals.tva.cents(), 6_500);
        assert_eq!(totals.total.cents(), 39_000);
    }
}
