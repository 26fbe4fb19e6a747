//! # Stock Valuation
//!
//! Values a product's current stock from its purchase lots.
//!
//! ```text
//! lots (oldest → newest):   [10 @ 5.00] [10 @ 6.00] [10 @ 7.00]
//! stock on hand:            15
//!
//! FIFO     oldest sold first, on hand = newest 15   → 10×7 + 5×6 = 100.00
//! LIFO     newest sold first, on hand = oldest 15   → 10×5 + 5×6 =  80.00
//! Average  weighted cost 6.00 × 15                  →               90.00
//! ```
//!
//! Stock not covered by any lot (opening stock, adjustments) is valued at
//! the product's purchase price.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::StockLot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ValuationMethod {
    Fifo,
    Lifo,
    Average,
}

impl Default for ValuationMethod {
    fn default() -> Self {
        ValuationMethod::Fifo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockValuation {
    pub product_id: i64,
    pub method: ValuationMethod,
    pub quantity: i64,
    pub value_cents: i64,
    /// Portion of `quantity` priced at the product's purchase price.
    pub uncovered_quantity: i64,
}

/// Values `stock` units of a product.
///
/// `lots` must be ordered oldest first. Negative stock is treated as zero.
pub fn value_stock(
    product_id: i64,
    lots: &[StockLot],
    stock: i64,
    fallback_unit_cost_cents: i64,
    method: ValuationMethod,
) -> StockValuation {
    let stock = stock.max(0);
    let lot_total: i64 = lots.iter().map(|l| l.quantity.max(0)).sum();
    let covered = stock.min(lot_total);
    let uncovered = stock - covered;

    let covered_value = match method {
        ValuationMethod::Fifo => take_from(lots.iter().rev(), covered),
        ValuationMethod::Lifo => take_from(lots.iter(), covered),
        ValuationMethod::Average => {
            if lot_total == 0 {
                0
            } else {
                let lot_value: i128 = lots
                    .iter()
                    .map(|l| l.quantity.max(0) as i128 * l.unit_cost_cents as i128)
                    .sum();
                // Round half up on centimes
                ((lot_value * covered as i128 * 2 + lot_total as i128) / (lot_total as i128 * 2))
                    as i64
            }
        }
    };

    StockValuation {
        product_id,
        method,
        quantity: stock,
        value_cents: covered_value + uncovered * fallback_unit_cost_cents,
        uncovered_quantity: uncovered,
    }
}

fn take_from<'a>(lots: impl Iterator<Item = &'a StockLot>, mut wanted: i64) -> i64 {
    let mut value = 0;
    for lot in lots {
        if wanted == 0 {
            break;
        }
        let take = lot.quantity.max(0).min(wanted);
        value += take * lot.unit_cost_cents;
        wanted -= take;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn lots() -> Vec<StockLot> {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        [(10, 500), (10, 600), (10, 700)]
            .into_iter()
            .enumerate()
            .map(|(i, (quantity, unit_cost_cents))| StockLot {
                id: i as i64 + 1,
                product_id: 1,
                quantity,
                unit_cost_cents,
                reference: None,
                received_at: start + Duration::days(i as i64),
            })
            .collect()
    }

    #[test]
    fn test_fifo_values_newest_lots() {
        let v = value_stock(1, &lots(), 15, 0, ValuationMethod::Fifo);
        assert_eq!(v.value_cents, 10_000);
        assert_eq!(v.uncovered_quantity, 0);
    }

    #[test]
    fn test_lifo_values_oldest_lots() {
        let v = value_stock(1, &lots(), 15, 0, ValuationMethod::Lifo);
        assert_eq!(v.value_cents, 8_000);
    }

    #[test]
    fn test_average_cost() {
        let v = value_stock(1, &lots(), 15, 0, ValuationMethod::Average);
        assert_eq!(v.value_cents, 9_000);

        // 7 units at an average of 6.00 = 42.00
        let v = value_stock(1, &lots(), 7, 0, ValuationMethod::Average);
        assert_eq!(v.value_cents, 4_200);
    }

    #[test]
    fn test_uncovered_stock_uses_purchase_price() {
        let v = value_stock(1, &lots(), 35, 400, ValuationMethod::Fifo);
        assert_eq!(v.uncovered_quantity, 5);
        assert_eq!(v.value_cents, 18_000 + 2_000);
    }

    #[test]
    fn test_no_lots() {
        let v = value_stock(1, &[], 3, 250, ValuationMethod::Average);
        assert_eq!(v.value_cents, 750);
        assert_eq!(v.uncovered_quantity, 3);
    }
}
