//! # Validation Module
//!
//! Request validation for GestionPro, run before any transaction opens.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: GUI shell                                                    │
//! │  └── Field formats, immediate feedback                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (pure, no I/O)                                   │
//! │  ├── Cart shape, payment split, quantities                             │
//! │  └── Return pre-flight (`validate_return`)                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger transaction (gestion-db)                              │
//! │  ├── Stock availability, over-return, refund totals                    │
//! │  └── CHECK / UNIQUE / FOREIGN KEY constraints                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Layer 2 failures are `ValidationError`s (or the payment-specific
//! `CoreError` kinds) and have no side effects.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{
    ClientInput, DocumentInput, PaymentMethod, ProductInput, ReturnRequest, SaleRequest,
    StockAdjustmentLine, ValidationReport,
};
use crate::{
    MAX_CART_LINES, MAX_LINE_QUANTITY, MAX_PIECES_PER_CARTON, MAX_PRICE_CENTS, WALK_IN_CLIENT_ID,
};
use std::collections::HashSet;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, bounded text field and returns it trimmed.
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Trims an optional text field, mapping blank values to `None`.
///
/// Blank phones and ICEs must be stored as NULL, otherwise the UNIQUE
/// constraints would treat every empty string as the same value.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a Moroccan phone number.
///
/// Digits, spaces, dots, dashes and a leading `+` are accepted; at least
/// 8 digits are required.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone.chars().enumerate().all(|(i, c)| {
        c.is_ascii_digit() || c == ' ' || c == '.' || c == '-' || (c == '+' && i == 0)
    });

    if !allowed || digits < 8 || digits > 15 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 8 to 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an ICE (Identifiant Commun de l'Entreprise).
///
/// Legacy records hold ICEs typed in free form, so only the charset and
/// length are checked.
pub fn validate_ice(ice: &str) -> ValidationResult<()> {
    if ice.chars().count() > 30 {
        return Err(ValidationError::TooLong {
            field: "ice".to_string(),
            max: 30,
        });
    }
    if !ice.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "ice".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed. Empty is allowed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: 1 to `MAX_LINE_QUANTITY`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in centimes: 0 (gifts) to `MAX_PRICE_CENTS`.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::must_not_be_negative(field));
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a rate in basis points (0 to 100 %).
pub fn validate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Products
// =============================================================================

/// Validates a product on create/update and returns the trimmed name.
pub fn validate_product(input: &ProductInput) -> ValidationResult<String> {
    let name = validate_name("name", &input.name, 200)?;

    if let Some(barcode) = normalize_optional(input.barcode.as_deref()) {
        if barcode.len() > 50 {
            return Err(ValidationError::TooLong {
                field: "barcode".to_string(),
                max: 50,
            });
        }
    }

    validate_price_cents("purchasePrice", input.purchase_price_cents)?;
    validate_price_cents("priceRetail", input.price_retail_cents)?;
    validate_price_cents("priceWholesale", input.price_wholesale_cents)?;
    validate_price_cents("priceCarton", input.price_carton_cents)?;

    if input.pieces_per_carton < 1 {
        return Err(ValidationError::must_be_positive("piecesPerCarton"));
    }
    if input.pieces_per_carton > MAX_PIECES_PER_CARTON {
        return Err(ValidationError::OutOfRange {
            field: "piecesPerCarton".to_string(),
            min: 1,
            max: MAX_PIECES_PER_CARTON,
        });
    }
    if input.stock < 0 {
        return Err(ValidationError::must_not_be_negative("stock"));
    }
    if input.alert_threshold < 0 {
        return Err(ValidationError::must_not_be_negative("alertThreshold"));
    }

    Ok(name)
}

/// Validates a stock count before `adjust_stock` opens its transaction.
pub fn validate_adjustments(lines: &[StockAdjustmentLine], reason: &str) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::required("adjustments"));
    }
    validate_name("reason", reason, 500)?;

    let mut seen = HashSet::new();
    for line in lines {
        if line.new_quantity < 0 {
            return Err(ValidationError::must_not_be_negative("newQuantity"));
        }
        if !seen.insert(line.product_id) {
            return Err(ValidationError::DuplicateEntry {
                field: "productId".to_string(),
                value: line.product_id.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Clients
// =============================================================================

/// A client input with its text fields trimmed and blank values dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedClient {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub ice: Option<String>,
}

/// Validates and normalizes a client before the uniqueness checks run.
pub fn validate_client(input: &ClientInput) -> ValidationResult<NormalizedClient> {
    let name = validate_name("name", &input.name, 150)?;
    let phone = normalize_optional(input.phone.as_deref());
    let ice = normalize_optional(input.ice.as_deref());
    let address = normalize_optional(input.address.as_deref());

    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }
    if let Some(ice) = &ice {
        validate_ice(ice)?;
    }

    Ok(NormalizedClient {
        name,
        phone,
        address,
        ice,
    })
}

/// Validates a credit payment or manual debt amount.
pub fn validate_credit_amount(client_id: i64, amount_cents: i64) -> CoreResult<()> {
    if client_id == WALK_IN_CLIENT_ID {
        return Err(CoreError::CreditNotAllowedForWalkInClient);
    }
    if amount_cents <= 0 {
        return Err(ValidationError::must_be_positive("amountPaid").into());
    }

    Ok(())
}

// =============================================================================
// Sales
// =============================================================================

/// Checks a sale request before the ledger opens its transaction.
///
/// ## Rules
/// ```text
/// cart          non-empty, at most MAX_CART_LINES lines
/// each line     quantity in 1..=MAX_LINE_QUANTITY, unit price ≥ 0
/// total         = Σ unit_price × quantity
/// cash, credit  ≥ 0 and cash + credit = total
/// credit > 0    not for the walk-in client
/// method credit requires credit > 0
/// ```
///
/// Stock availability is checked later, inside the transaction.
pub fn validate_sale_request(req: &SaleRequest) -> CoreResult<()> {
    if req.cart.is_empty() {
        return Err(ValidationError::required("cart").into());
    }
    if req.cart.len() > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        }
        .into());
    }

    let mut line_sum = 0i64;
    for line in &req.cart {
        validate_quantity(line.quantity)?;
        validate_price_cents("unitPrice", line.unit_price_cents)?;
        if let Some(cost) = line.purchase_price_cents {
            validate_price_cents("purchasePrice", cost)?;
        }
        line_sum = line
            .checked_line_total()
            .and_then(|total| line_sum.checked_add(total.cents()))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: i64::MAX,
            })?;
    }

    if req.total_cents != line_sum {
        return Err(ValidationError::Mismatch {
            field: "total".to_string(),
            expected: line_sum,
            actual: req.total_cents,
        }
        .into());
    }

    if req.credit_cents > 0 && req.client_id == WALK_IN_CLIENT_ID {
        return Err(CoreError::CreditNotAllowedForWalkInClient);
    }

    if req.amount_paid_cash_cents < 0 {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "cash amount is negative".to_string(),
        });
    }
    if req.credit_cents < 0 {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "credit amount is negative".to_string(),
        });
    }
    if req.amount_paid_cash_cents > req.total_cents {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!(
                "cash {} exceeds total {}",
                req.amount_paid_cash_cents, req.total_cents
            ),
        });
    }
    if req.amount_paid_cash_cents.checked_add(req.credit_cents) != Some(req.total_cents) {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!(
                "cash {} + credit {} does not equal total {}",
                req.amount_paid_cash_cents, req.credit_cents, req.total_cents
            ),
        });
    }

    if req.payment_method == PaymentMethod::Credit && req.credit_cents == 0 {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "credit payment without a credit amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Returns
// =============================================================================

/// Pure pre-flight check of a return request.
///
/// Collects every structural problem instead of stopping at the first,
/// so the GUI can show them all at once. Quantities against what was
/// sold and the refund total are checked by the returns engine.
pub fn validate_return(req: &ReturnRequest) -> ValidationReport {
    let mut errors = Vec::new();

    if req.original_sale_id <= 0 {
        errors.push("originalSaleId is required".to_string());
    }
    if req.items.is_empty() {
        errors.push("itemsToReturn must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    for (index, item) in req.items.iter().enumerate() {
        if item.sale_item_id <= 0 {
            errors.push(format!("item {}: saleItemId is required", index + 1));
        }
        if item.product_id <= 0 {
            errors.push(format!("item {}: productId is required", index + 1));
        }
        if let Err(e) = validate_quantity(item.quantity) {
            errors.push(format!("item {}: {}", index + 1, e));
        }
        if item.sale_item_id > 0 && !seen.insert(item.sale_item_id) {
            errors.push(format!(
                "item {}: sale item {} appears more than once",
                index + 1,
                item.sale_item_id
            ));
        }
    }

    if req.refund_cash_cents < 0 {
        errors.push("refundCash must not be negative".to_string());
    }
    if req.refund_credit_cents < 0 {
        errors.push("refundCredit must not be negative".to_string());
    }
    if req.client_id == Some(WALK_IN_CLIENT_ID) && req.refund_credit_cents > 0 {
        errors.push("walk-in client returns must be refunded in cash".to_string());
    }
    if let Some(reason) = &req.reason {
        if reason.chars().count() > 500 {
            errors.push("reason must be at most 500 characters".to_string());
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

// =============================================================================
// Billing documents
// =============================================================================

/// Validates an invoice or quote before it is written.
pub fn validate_document(input: &DocumentInput) -> ValidationResult<()> {
    if input.lines.is_empty() {
        return Err(ValidationError::required("lines"));
    }
    if input.client_id.is_none() {
        validate_name("clientName", input.client_name.as_deref().unwrap_or(""), 150)?;
    }
    if let Some(bps) = input.tva_rate_bps {
        validate_bps("tvaRate", bps)?;
    }

    for line in &input.lines {
        validate_name("description", &line.description, 300)?;
        validate_quantity(line.quantity)?;
        validate_price_cents("unitPrice", line.unit_price_cents)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartLine, DocumentLineInput, ItemCondition, ReturnLine, SaleUnit};

    fn cart_line(product_id: i64, quantity: i64, unit_price_cents: i64) -> CartLine {
        CartLine {
            product_id,
            quantity,
            unit: SaleUnit::Retail,
            unit_price_cents,
            purchase_price_cents: None,
        }
    }

    fn sale(client_id: i64, cash: i64, credit: i64, method: PaymentMethod) -> SaleRequest {
        SaleRequest {
            client_id,
            cart: vec![cart_line(1, 2, 1000)],
            total_cents: 2000,
            amount_paid_cash_cents: cash,
            credit_cents: credit,
            payment_method: method,
            user_id: None,
        }
    }

    #[test]
    fn test_valid_cash_sale() {
        assert!(validate_sale_request(&sale(1, 2000, 0, PaymentMethod::Cash)).is_ok());
    }

    #[test]
    fn test_split_credit_sale() {
        assert!(validate_sale_request(&sale(5, 1500, 500, PaymentMethod::Credit)).is_ok());
    }

    #[test]
    fn test_walk_in_credit_rejected() {
        let err = validate_sale_request(&sale(1, 1500, 500, PaymentMethod::Credit)).unwrap_err();
        assert!(matches!(err, CoreError::CreditNotAllowedForWalkInClient));
    }

    #[test]
    fn test_payment_split_must_match_total() {
        let err = validate_sale_request(&sale(5, 1000, 500, PaymentMethod::Credit)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));

        let err = validate_sale_request(&sale(5, -1, 2001, PaymentMethod::Credit)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));

        let err = validate_sale_request(&sale(5, 2500, 0, PaymentMethod::Cash)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));
    }

    #[test]
    fn test_credit_method_requires_credit_amount() {
        let err = validate_sale_request(&sale(5, 2000, 0, PaymentMethod::Credit)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));
    }

    #[test]
    fn test_cart_checks() {
        let mut req = sale(1, 2000, 0, PaymentMethod::Cash);
        req.cart.clear();
        assert!(matches!(
            validate_sale_request(&req),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let mut req = sale(1, 2000, 0, PaymentMethod::Cash);
        req.cart[0].quantity = 0;
        assert!(matches!(
            validate_sale_request(&req),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let mut req = sale(1, 2000, 0, PaymentMethod::Cash);
        req.total_cents = 1999;
        req.amount_paid_cash_cents = 1999;
        assert!(matches!(
            validate_sale_request(&req),
            Err(CoreError::Validation(ValidationError::Mismatch { expected: 2000, .. }))
        ));
    }

    #[test]
    fn test_huge_unit_price_rejected() {
        let mut req = sale(1, 2000, 0, PaymentMethod::Cash);
        req.cart[0].quantity = 3;
        req.cart[0].unit_price_cents = 4_611_686_018_427_387_904;
        assert!(matches!(
            validate_sale_request(&req),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_huge_credit_does_not_overflow_split() {
        let req = sale(5, 2000, i64::MAX, PaymentMethod::Credit);
        assert!(matches!(
            validate_sale_request(&req),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));
    }

    fn return_request() -> ReturnRequest {
        ReturnRequest {
            original_sale_id: 10,
            client_id: Some(5),
            items: vec![ReturnLine {
                sale_item_id: 3,
                product_id: 7,
                quantity: 1,
                condition: ItemCondition::Good,
                back_to_stock: true,
            }],
            refund_cash_cents: 1000,
            refund_credit_cents: 0,
            reason: None,
            user_id: None,
        }
    }

    #[test]
    fn test_validate_return_ok() {
        let report = validate_return(&return_request());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_validate_return_collects_every_error() {
        let mut req = return_request();
        req.original_sale_id = 0;
        req.items[0].quantity = 0;
        req.items.push(req.items[0].clone());
        req.refund_cash_cents = -1;

        let report = validate_return(&req);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 5);
        assert!(report.errors[0].contains("originalSaleId"));
    }

    #[test]
    fn test_validate_return_empty_items() {
        let mut req = return_request();
        req.items.clear();
        let report = validate_return(&req);
        assert_eq!(report.errors, vec!["itemsToReturn must not be empty".to_string()]);
    }

    #[test]
    fn test_walk_in_return_needs_cash_refund() {
        let mut req = return_request();
        req.client_id = Some(WALK_IN_CLIENT_ID);
        req.refund_cash_cents = 0;
        req.refund_credit_cents = 1000;
        assert!(!validate_return(&req).is_valid);
    }

    #[test]
    fn test_validate_client_normalizes() {
        let client = validate_client(&ClientInput {
            name: "  Ali Benali ".to_string(),
            phone: Some("  ".to_string()),
            address: None,
            ice: Some("001234567000089".to_string()),
        })
        .unwrap();
        assert_eq!(client.name, "Ali Benali");
        assert_eq!(client.phone, None);
        assert_eq!(client.ice.as_deref(), Some("001234567000089"));
    }

    #[test]
    fn test_phone_and_ice_formats() {
        assert!(validate_phone("06 61 23 45 67").is_ok());
        assert!(validate_phone("+212661234567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("06-ab-12").is_err());

        assert!(validate_ice("001234567000089").is_ok());
        assert!(validate_ice("ICE1").is_ok());
        assert!(validate_ice("ICE 1").is_err());
    }

    #[test]
    fn test_credit_amount() {
        assert!(validate_credit_amount(5, 4000).is_ok());
        assert!(validate_credit_amount(5, 0).is_err());
        assert!(matches!(
            validate_credit_amount(WALK_IN_CLIENT_ID, 100),
            Err(CoreError::CreditNotAllowedForWalkInClient)
        ));
    }

    #[test]
    fn test_adjustments() {
        let line = StockAdjustmentLine {
            product_id: 1,
            new_quantity: 4,
        };
        assert!(validate_adjustments(&[line], "Inventaire").is_ok());
        assert!(validate_adjustments(&[line], " ").is_err());
        assert!(validate_adjustments(&[line, line], "Inventaire").is_err());
        assert!(validate_adjustments(
            &[StockAdjustmentLine {
                product_id: 1,
                new_quantity: -1
            }],
            "Casse"
        )
        .is_err());
    }

    #[test]
    fn test_validate_product() {
        let mut input = ProductInput {
            name: "Sucre 1kg".to_string(),
            pieces_per_carton: 10,
            ..Default::default()
        };
        assert_eq!(validate_product(&input).unwrap(), "Sucre 1kg");

        input.pieces_per_carton = 0;
        assert!(validate_product(&input).is_err());

        input.pieces_per_carton = MAX_PIECES_PER_CARTON + 1;
        assert!(matches!(
            validate_product(&input),
            Err(ValidationError::OutOfRange { .. })
        ));

        input.pieces_per_carton = 12;
        input.price_carton_cents = MAX_PRICE_CENTS + 1;
        assert!(validate_product(&input).is_err());
    }

    #[test]
    fn test_validate_document() {
        let input = DocumentInput {
            client_id: None,
            client_name: Some("Société Atlas".to_string()),
            lines: vec![DocumentLineInput {
                product_id: None,
                description: "Installation".to_string(),
                quantity: 1,
                unit_price_cents: 50_000,
            }],
            tva_rate_bps: Some(2000),
            notes: None,
            date_limit: None,
        };
        assert!(validate_document(&input).is_ok());

        let mut no_name = input.clone();
        no_name.client_name = None;
        assert!(validate_document(&no_name).is_err());

        let mut bad_rate = input;
        bad_rate.tva_rate_bps = Some(12_000);
        assert!(validate_document(&bad_rate).is_err());
    }
}
