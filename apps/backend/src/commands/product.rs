//! # Product Commands
//!
//! Catalogue lookups for the POS screen and the stock count screen.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier scans "6110000000003" or types "thé"                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  Is query a barcode? (8-14 digits)        │                         │
//! │  │  YES: exact barcode lookup first          │──► Found? Return [1]    │
//! │  │  NO:  LIKE search on name/barcode/category│                         │
//! │  └───────────────────────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info};

use super::{Done, IdArgs, PageArgs, SearchArgs};
use crate::error::ApiError;
use crate::state::AppState;
use gestion_core::{Product, ProductInput, StockAdjustment, StockAdjustmentLine, StockMovement};

/// Barcode scanners type a full EAN-8 / EAN-13 / GTIN-14 in one burst.
fn is_barcode_query(query: &str) -> bool {
    let len = query.len();
    (8..=14).contains(&len) && query.chars().all(|c| c.is_ascii_digit())
}

pub async fn search_products(state: &AppState, args: SearchArgs) -> Result<Vec<Product>, ApiError> {
    let start = Instant::now();
    let query = args.query.trim();
    let limit = args.limit();

    debug!(query = %query, limit, "products.search");

    if is_barcode_query(query) {
        if let Some(product) = state.db().products().get_by_barcode(query).await? {
            info!(
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "products.search barcode hit"
            );
            return Ok(vec![product]);
        }
        debug!("Barcode not found, falling back to text search");
    }

    let products = state.db().products().search(query, limit).await?;
    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = products.len(),
        "products.search complete"
    );
    Ok(products)
}

pub async fn get_product(state: &AppState, args: IdArgs) -> Result<Product, ApiError> {
    state
        .db()
        .products()
        .get_by_id(args.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", args.id))
}

#[derive(Debug, Deserialize)]
pub struct BarcodeArgs {
    pub barcode: String,
}

pub async fn get_product_by_barcode(
    state: &AppState,
    args: BarcodeArgs,
) -> Result<Product, ApiError> {
    let barcode = args.barcode.trim();
    state
        .db()
        .products()
        .get_by_barcode(barcode)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", barcode))
}

pub async fn list_products(state: &AppState, args: PageArgs) -> Result<Vec<Product>, ApiError> {
    Ok(state
        .db()
        .products()
        .list(args.limit(), args.offset())
        .await?)
}

pub async fn create_product(state: &AppState, input: ProductInput) -> Result<Product, ApiError> {
    Ok(state.db().products().insert(&input).await?)
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductArgs {
    pub id: i64,
    pub product: ProductInput,
}

/// Stock is not editable here; use `products.adjustStock`.
pub async fn update_product(
    state: &AppState,
    args: UpdateProductArgs,
) -> Result<Product, ApiError> {
    Ok(state.db().products().update(args.id, &args.product).await?)
}

pub async fn delete_product(state: &AppState, args: IdArgs) -> Result<Done, ApiError> {
    state.db().products().delete(args.id).await?;
    Ok(Done::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LimitArgs {
    pub limit: Option<u32>,
}

pub async fn low_stock(state: &AppState, args: LimitArgs) -> Result<Vec<Product>, ApiError> {
    let limit = args.limit.unwrap_or(50).clamp(1, 500);
    Ok(state.db().products().low_stock(limit).await?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockArgs {
    pub adjustments: Vec<StockAdjustmentLine>,
    pub reason: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

pub async fn adjust_stock(
    state: &AppState,
    args: AdjustStockArgs,
) -> Result<Vec<StockAdjustment>, ApiError> {
    debug!(lines = args.adjustments.len(), "products.adjustStock");
    Ok(state
        .db()
        .products()
        .adjust_stock(&args.adjustments, &args.reason, args.user_id)
        .await?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductHistoryArgs {
    pub product_id: i64,
    #[serde(default)]
    pub limit: Option<u32>,
}

pub async fn stock_movements(
    state: &AppState,
    args: ProductHistoryArgs,
) -> Result<Vec<StockMovement>, ApiError> {
    let limit = args.limit.unwrap_or(100).clamp(1, 1000);
    Ok(state
        .db()
        .products()
        .movements(args.product_id, limit)
        .await?)
}

pub async fn stock_adjustments(
    state: &AppState,
    args: ProductHistoryArgs,
) -> Result<Vec<StockAdjustment>, ApiError> {
    Ok(state.db().products().adjustments(args.product_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{dispatch, testing};
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_barcode_detection() {
        assert!(is_barcode_query("6111234567890"));
        assert!(is_barcode_query("12345678"));
        assert!(!is_barcode_query("1234567"));
        assert!(!is_barcode_query("thé vert"));
        assert!(!is_barcode_query("61112345678901234"));
    }

    #[tokio::test]
    async fn test_create_search_and_adjust() {
        let state = testing::state().await;
        let created = dispatch(
            &state,
            "products.create",
            json!({
                "barcode": "6111234567890",
                "name": "Thé vert Sultan",
                "purchasePriceCents": 1450,
                "priceRetailCents": 1800,
                "priceWholesaleCents": 1700,
                "priceCartonCents": 19_000,
                "piecesPerCarton": 12,
                "stock": 10,
                "alertThreshold": 5,
                "category": "Boissons"
            }),
        )
        .await
        .unwrap();
        let id = created["id"].as_i64().unwrap();

        let by_barcode = dispatch(&state, "products.search", json!({ "query": "6111234567890" }))
            .await
            .unwrap();
        assert_eq!(by_barcode[0]["id"], id);

        let by_name = dispatch(&state, "products.search", json!({ "query": "sultan" }))
            .await
            .unwrap();
        assert_eq!(by_name.as_array().unwrap().len(), 1);

        let rows = dispatch(
            &state,
            "products.adjustStock",
            json!({
                "adjustments": [{ "productId": id, "newQuantity": 4 }],
                "reason": "Inventaire mensuel",
                "userId": 1
            }),
        )
        .await
        .unwrap();
        assert_eq!(rows[0]["oldQuantity"], 10);
        assert_eq!(rows[0]["newQuantity"], 4);

        let low = dispatch(&state, "products.lowStock", json!({})).await.unwrap();
        assert_eq!(low[0]["id"], id);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let state = testing::state().await;
        let err = dispatch(&state, "products.get", json!({ "id": 404 }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
