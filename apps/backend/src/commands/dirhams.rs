//! # Dirham Payloads
//!
//! The caisse screens send money as decimal dirhams under short keys
//! (`{"total": 20, "amountPaidCash": 20, "credit": 0}`), and returns as
//! `itemsToReturn` lines keyed like the `return_items` columns. The
//! domain types take integer centimes under `*Cents` keys. These rewrites
//! run on the raw payload before it is deserialized:
//!
//! ```text
//! total: 12.5          → totalCents: 1250
//! itemsToReturn[]      → items[]
//!   originalSaleItemId → saleItemId
//!   quantityReturned   → quantity
//! ```
//!
//! A key already present in its centime form wins; the dirham key is
//! then dropped.

use serde_json::{Map, Value};

use crate::error::ApiError;

const SALE_AMOUNTS: &[(&str, &str)] = &[
    ("total", "totalCents"),
    ("amountPaidCash", "amountPaidCashCents"),
    ("credit", "creditCents"),
];

const CART_AMOUNTS: &[(&str, &str)] = &[
    ("unitPrice", "unitPriceCents"),
    ("purchasePrice", "purchasePriceCents"),
];

const RETURN_AMOUNTS: &[(&str, &str)] = &[
    ("refundCash", "refundCashCents"),
    ("refundCredit", "refundCreditCents"),
];

const RETURN_LINE_KEYS: &[(&str, &str)] = &[
    ("originalSaleItemId", "saleItemId"),
    ("quantityReturned", "quantity"),
    ("conditionStatus", "condition"),
];

const PAYMENT_AMOUNTS: &[(&str, &str)] = &[("amountPaid", "amountPaidCents")];

/// Largest amount in centimes an `f64` still holds exactly.
const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_992.0;

/// `sales.process`.
pub fn sale(payload: &mut Value) -> Result<(), ApiError> {
    let Some(fields) = payload.as_object_mut() else {
        return Ok(());
    };
    convert(fields, SALE_AMOUNTS)?;
    if let Some(Value::Array(cart)) = fields.get_mut("cart") {
        for line in cart.iter_mut().filter_map(Value::as_object_mut) {
            convert(line, CART_AMOUNTS)?;
        }
    }
    Ok(())
}

/// `sales.edit`: the replacement sale sits under `newSaleData`.
pub fn sale_edit(payload: &mut Value) -> Result<(), ApiError> {
    match payload.get_mut("newSaleData") {
        Some(data) => sale(data),
        None => Ok(()),
    }
}

/// `sales.processReturn` and `sales.validateReturn`.
pub fn sale_return(payload: &mut Value) -> Result<(), ApiError> {
    let Some(fields) = payload.as_object_mut() else {
        return Ok(());
    };
    rename(fields, &[("itemsToReturn", "items")]);
    convert(fields, RETURN_AMOUNTS)?;
    if let Some(Value::Array(items)) = fields.get_mut("items") {
        for line in items.iter_mut().filter_map(Value::as_object_mut) {
            rename(line, RETURN_LINE_KEYS);
        }
    }
    Ok(())
}

/// `credits.recordPayment` and `credits.addManual`.
pub fn payment(payload: &mut Value) -> Result<(), ApiError> {
    match payload.as_object_mut() {
        Some(fields) => convert(fields, PAYMENT_AMOUNTS),
        None => Ok(()),
    }
}

fn rename(fields: &mut Map<String, Value>, keys: &[(&str, &str)]) {
    for (from, to) in keys {
        if let Some(value) = fields.remove(*from) {
            if !fields.contains_key(*to) {
                fields.insert((*to).to_string(), value);
            }
        }
    }
}

fn convert(fields: &mut Map<String, Value>, keys: &[(&str, &str)]) -> Result<(), ApiError> {
    for (from, to) in keys {
        let Some(value) = fields.remove(*from) else {
            continue;
        };
        if fields.contains_key(*to) {
            continue;
        }
        let cents = match value {
            Value::Null => Value::Null,
            value => Value::from(to_cents(from, &value)?),
        };
        fields.insert((*to).to_string(), cents);
    }
    Ok(())
}

/// Decimal dirhams to centimes, rounded to the nearest centime.
fn to_cents(key: &str, value: &Value) -> Result<i64, ApiError> {
    let dirhams = value
        .as_f64()
        .ok_or_else(|| ApiError::validation(format!("{} must be a number", key)))?;
    let cents = (dirhams * 100.0).round();
    if !cents.is_finite() || cents.abs() > MAX_EXACT_CENTS {
        return Err(ApiError::validation(format!("{} is out of range", key)));
    }
    Ok(cents as i64)
}
