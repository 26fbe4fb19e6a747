//! # Stock Lot Commands
//!
//! Goods receipts and stock valuation.

use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use gestion_core::valuation::{StockValuation, ValuationMethod};
use gestion_core::StockLot;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveLotArgs {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Records a delivery; the product's stock goes up by `quantity`.
pub async fn receive_lot(state: &AppState, args: ReceiveLotArgs) -> Result<StockLot, ApiError> {
    Ok(state
        .db()
        .lots()
        .receive(
            args.product_id,
            args.quantity,
            args.unit_cost_cents,
            args.reference.as_deref(),
        )
        .await?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLotsArgs {
    pub product_id: i64,
    #[serde(default)]
    pub method: ValuationMethod,
}

pub async fn list_lots(state: &AppState, args: ProductLotsArgs) -> Result<Vec<StockLot>, ApiError> {
    Ok(state.db().lots().list(args.product_id).await?)
}

pub async fn valuation(
    state: &AppState,
    args: ProductLotsArgs,
) -> Result<StockValuation, ApiError> {
    Ok(state
        .db()
        .lots()
        .valuation(args.product_id, args.method)
        .await?)
}
