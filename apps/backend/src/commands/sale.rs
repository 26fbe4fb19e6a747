//! # Sale Commands
//!
//! Checkout, correction of a sale, returns and the sales history screen.
//! All writes go through the ledger engines of gestion-db; this module only
//! shapes payloads.

use serde::Deserialize;
use tracing::debug;

use super::IdArgs;
use crate::error::ApiError;
use crate::state::AppState;
use gestion_core::{
    ReturnDetail, ReturnReceipt, ReturnRequest, ReturnableItem, Sale, SaleDetail, SaleFilter,
    SaleReceipt, SaleRequest, SaleReturn, ValidationReport,
};

pub async fn process_sale(state: &AppState, req: SaleRequest) -> Result<SaleReceipt, ApiError> {
    debug!(
        client_id = req.client_id,
        lines = req.cart.len(),
        total = req.total_cents,
        "sales.process"
    );
    Ok(state.db().sales_ledger().process(&req).await?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSaleArgs {
    pub original_sale_id: i64,
    pub new_sale_data: SaleRequest,
}

/// Replaces a completed sale. The original is kept as CORRECTED.
pub async fn edit_sale(state: &AppState, args: EditSaleArgs) -> Result<SaleReceipt, ApiError> {
    debug!(
        original_sale_id = args.original_sale_id,
        lines = args.new_sale_data.cart.len(),
        "sales.edit"
    );
    Ok(state
        .db()
        .sales_ledger()
        .edit(args.original_sale_id, &args.new_sale_data)
        .await?)
}

pub async fn get_sale(state: &AppState, args: IdArgs) -> Result<SaleDetail, ApiError> {
    state
        .db()
        .sales()
        .get(args.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", args.id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketArgs {
    pub ticket_number: String,
}

pub async fn get_sale_by_ticket(
    state: &AppState,
    args: TicketArgs,
) -> Result<SaleDetail, ApiError> {
    let ticket = args.ticket_number.trim();
    state
        .db()
        .sales()
        .get_by_ticket(ticket)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", ticket))
}

pub async fn sale_history(state: &AppState, filter: SaleFilter) -> Result<Vec<Sale>, ApiError> {
    Ok(state.db().sales().history(&filter).await?)
}

pub async fn process_return(
    state: &AppState,
    req: ReturnRequest,
) -> Result<ReturnReceipt, ApiError> {
    debug!(
        original_sale_id = req.original_sale_id,
        lines = req.items.len(),
        "sales.processReturn"
    );
    Ok(state.db().returns().process(&req).await?)
}

/// Pre-flight check of a return request. Never touches the database.
pub async fn validate_return(
    state: &AppState,
    req: ReturnRequest,
) -> Result<ValidationReport, ApiError> {
    Ok(state.db().returns().validate(&req))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleIdArgs {
    pub sale_id: i64,
}

pub async fn returnable_items(
    state: &AppState,
    args: SaleIdArgs,
) -> Result<Vec<ReturnableItem>, ApiError> {
    Ok(state.db().return_records().returnable_items(args.sale_id).await?)
}

pub async fn sale_returns(
    state: &AppState,
    args: SaleIdArgs,
) -> Result<Vec<SaleReturn>, ApiError> {
    Ok(state.db().return_records().for_sale(args.sale_id).await?)
}

pub async fn get_return(state: &AppState, args: IdArgs) -> Result<ReturnDetail, ApiError> {
    state
        .db()
        .return_records()
        .get(args.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Return", args.id))
}

#[cfg(test)]
mod tests {
    use crate::commands::{dispatch, testing};
    use crate::error::ErrorCode;
    use crate::state::AppState;
    use serde_json::{json, Value};

    async fn product(state: &AppState, stock: i64) -> i64 {
        let created = dispatch(
            state,
            "products.create",
            json!({
                "name": "Huile Lesieur 1L",
                "purchasePriceCents": 1850,
                "priceRetailCents": 2300,
                "priceWholesaleCents": 2150,
                "priceCartonCents": 25_000,
                "piecesPerCarton": 12,
                "stock": stock
            }),
        )
        .await
        .unwrap();
        created["id"].as_i64().unwrap()
    }

    fn cash_sale(product_id: i64, quantity: i64) -> Value {
        json!({
            "cart": [{ "productId": product_id, "quantity": quantity, "unitPriceCents": 2300 }],
            "totalCents": 2300 * quantity,
            "amountPaidCashCents": 2300 * quantity,
            "userId": 1
        })
    }

    #[tokio::test]
    async fn test_checkout_and_lookup_by_ticket() {
        let state = testing::state().await;
        let pid = product(&state, 10).await;

        let receipt = dispatch(&state, "sales.process", cash_sale(pid, 2)).await.unwrap();
        let ticket = receipt["ticketNumber"].as_str().unwrap().to_string();
        assert!(ticket.starts_with("V-"));

        let detail = dispatch(&state, "sales.getByTicket", json!({ "ticketNumber": ticket }))
            .await
            .unwrap();
        assert_eq!(detail["sale"]["id"], receipt["saleId"]);

        let history = dispatch(&state, "sales.history", json!({})).await.unwrap();
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_error_code() {
        let state = testing::state().await;
        let pid = product(&state, 1).await;

        let err = dispatch(&state, "sales.process", cash_sale(pid, 3)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.details.unwrap()["available"], 1);
    }

    #[tokio::test]
    async fn test_dirham_payloads() {
        let state = testing::state().await;
        let pid = product(&state, 10).await;

        let receipt = dispatch(
            &state,
            "sales.process",
            json!({
                "clientId": 1,
                "cart": [{ "productId": pid, "quantity": 2, "unitPrice": 23 }],
                "total": 46,
                "amountPaidCash": 46,
                "credit": 0,
                "paymentMethod": "cash",
                "userId": 1
            }),
        )
        .await
        .unwrap();
        let sale_id = receipt["saleId"].as_i64().unwrap();
        let detail = dispatch(&state, "sales.get", json!({ "id": sale_id })).await.unwrap();
        assert_eq!(detail["sale"]["totalCents"], 4600);
        let item_id = detail["items"][0]["id"].as_i64().unwrap();

        let request = json!({
            "originalSaleId": sale_id,
            "clientId": 1,
            "itemsToReturn": [{
                "originalSaleItemId": item_id,
                "productId": pid,
                "quantityReturned": 1,
                "conditionStatus": "GOOD",
                "backToStock": true
            }],
            "refundCash": 23,
            "refundCredit": 0
        });
        let report = dispatch(&state, "sales.validateReturn", request.clone())
            .await
            .unwrap();
        assert_eq!(report["isValid"], true);

        let ret = dispatch(&state, "sales.processReturn", request).await.unwrap();
        assert_eq!(ret["totalRefundCents"], 2300);

        let product = dispatch(&state, "products.get", json!({ "id": pid })).await.unwrap();
        assert_eq!(product["stock"], 9);
    }

    #[tokio::test]
    async fn test_huge_unit_price_is_a_validation_error() {
        let state = testing::state().await;
        let pid = product(&state, 10).await;

        let err = dispatch(
            &state,
            "sales.process",
            json!({
                "cart": [{
                    "productId": pid,
                    "quantity": 3,
                    "unitPriceCents": 4_611_686_018_427_387_904_i64
                }],
                "totalCents": 0,
                "amountPaidCashCents": 0
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let product = dispatch(&state, "products.get", json!({ "id": pid })).await.unwrap();
        assert_eq!(product["stock"], 10);
    }

    #[tokio::test]
    async fn test_walk_in_credit_rejected() {
        let state = testing::state().await;
        let pid = product(&state, 5).await;

        let mut sale = cash_sale(pid, 1);
        sale["amountPaidCashCents"] = json!(0);
        sale["creditCents"] = json!(2300);
        sale["paymentMethod"] = json!("credit");

        let err = dispatch(&state, "sales.process", sale).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CreditNotAllowedForWalkInClient);
    }

    #[tokio::test]
    async fn test_return_flow_and_edit_lock() {
        let state = testing::state().await;
        let pid = product(&state, 10).await;
        let receipt = dispatch(&state, "sales.process", cash_sale(pid, 3)).await.unwrap();
        let sale_id = receipt["saleId"].as_i64().unwrap();

        let items = dispatch(&state, "sales.returnableItems", json!({ "saleId": sale_id }))
            .await
            .unwrap();
        let item_id = items[0]["saleItemId"].as_i64().unwrap();

        let request = json!({
            "originalSaleId": sale_id,
            "items": [{ "saleItemId": item_id, "productId": pid, "quantity": 1 }],
            "refundCashCents": 2300
        });
        let report = dispatch(&state, "sales.validateReturn", request.clone())
            .await
            .unwrap();
        assert_eq!(report["isValid"], true);

        let ret = dispatch(&state, "sales.processReturn", request).await.unwrap();
        assert!(ret["returnNumber"].as_str().unwrap().starts_with("R-"));

        let over = json!({
            "originalSaleId": sale_id,
            "items": [{ "saleItemId": item_id, "productId": pid, "quantity": 3 }],
            "refundCashCents": 6900
        });
        let err = dispatch(&state, "sales.processReturn", over).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OverReturn);

        let err = dispatch(
            &state,
            "sales.edit",
            json!({ "originalSaleId": sale_id, "newSaleData": cash_sale(pid, 1) }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::SaleHasReturns);
    }

    #[tokio::test]
    async fn test_edit_replaces_sale() {
        let state = testing::state().await;
        let pid = product(&state, 10).await;
        let first = dispatch(&state, "sales.process", cash_sale(pid, 3)).await.unwrap();

        let edited = dispatch(
            &state,
            "sales.edit",
            json!({ "originalSaleId": first["saleId"], "newSaleData": cash_sale(pid, 1) }),
        )
        .await
        .unwrap();
        assert_ne!(edited["saleId"], first["saleId"]);

        let product = dispatch(&state, "products.get", json!({ "id": pid })).await.unwrap();
        assert_eq!(product["stock"], 9);

        let original = dispatch(&state, "sales.get", json!({ "id": first["saleId"] }))
            .await
            .unwrap();
        assert_eq!(original["sale"]["status"], "CORRECTED");
    }
}
