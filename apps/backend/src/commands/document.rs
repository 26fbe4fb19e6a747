//! # Invoice and Quote Commands
//!
//! Billing documents are standalone: creating one never moves stock or
//! client credit.

use serde::Deserialize;

use super::{Done, IdArgs, PageArgs};
use crate::error::ApiError;
use crate::state::AppState;
use gestion_core::{
    DocumentInput, Invoice, InvoiceDetail, InvoiceStatus, Quote, QuoteDetail, QuoteStatus,
};

// =============================================================================
// Invoices
// =============================================================================

pub async fn create_invoice(
    state: &AppState,
    input: DocumentInput,
) -> Result<InvoiceDetail, ApiError> {
    Ok(state.db().invoices().create(&input).await?)
}

pub async fn get_invoice(state: &AppState, args: IdArgs) -> Result<InvoiceDetail, ApiError> {
    state
        .db()
        .invoices()
        .get(args.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", args.id))
}

pub async fn list_invoices(state: &AppState, args: PageArgs) -> Result<Vec<Invoice>, ApiError> {
    Ok(state
        .db()
        .invoices()
        .list(args.limit(), args.offset())
        .await?)
}

#[derive(Debug, Deserialize)]
pub struct InvoiceStatusArgs {
    pub id: i64,
    pub status: InvoiceStatus,
}

pub async fn update_invoice_status(
    state: &AppState,
    args: InvoiceStatusArgs,
) -> Result<Invoice, ApiError> {
    Ok(state
        .db()
        .invoices()
        .update_status(args.id, args.status)
        .await?)
}

pub async fn delete_invoice(state: &AppState, args: IdArgs) -> Result<Done, ApiError> {
    state.db().invoices().delete(args.id).await?;
    Ok(Done::OK)
}

// =============================================================================
// Quotes
// =============================================================================

pub async fn create_quote(state: &AppState, input: DocumentInput) -> Result<QuoteDetail, ApiError> {
    Ok(state.db().quotes().create(&input).await?)
}

pub async fn get_quote(state: &AppState, args: IdArgs) -> Result<QuoteDetail, ApiError> {
    state
        .db()
        .quotes()
        .get(args.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Quote", args.id))
}

pub async fn list_quotes(state: &AppState, args: PageArgs) -> Result<Vec<Quote>, ApiError> {
    Ok(state
        .db()
        .quotes()
        .list(args.limit(), args.offset())
        .await?)
}

#[derive(Debug, Deserialize)]
pub struct QuoteStatusArgs {
    pub id: i64,
    pub status: QuoteStatus,
}

pub async fn update_quote_status(
    state: &AppState,
    args: QuoteStatusArgs,
) -> Result<Quote, ApiError> {
    Ok(state.db().quotes().update_status(args.id, args.status).await?)
}

pub async fn delete_quote(state: &AppState, args: IdArgs) -> Result<Done, ApiError> {
    state.db().quotes().delete(args.id).await?;
    Ok(Done::OK)
}

pub async fn convert_quote(state: &AppState, args: IdArgs) -> Result<InvoiceDetail, ApiError> {
    Ok(state.db().quotes().convert_to_invoice(args.id).await?)
}

#[cfg(test)]
mod tests {
    use crate::commands::{dispatch, testing};
    use crate::error::ErrorCode;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "clientName": "Entreprise Bennani SARL",
            "lines": [
                { "description": "Ciment 50kg", "quantity": 20, "unitPriceCents": 7_500 },
                { "description": "Livraison", "quantity": 1, "unitPriceCents": 15_000 }
            ]
        })
    }

    #[tokio::test]
    async fn test_invoice_uses_default_tva() {
        let state = testing::state().await;
        let detail = dispatch(&state, "invoices.create", document()).await.unwrap();
        let invoice = &detail["invoice"];

        assert!(invoice["invoiceNumber"].as_str().unwrap().starts_with("F-"));
        assert_eq!(invoice["subtotalHtCents"], 165_000);
        assert_eq!(invoice["tvaRateBps"], 2000);
        assert_eq!(invoice["tvaCents"], 33_000);
        assert_eq!(invoice["totalCents"], 198_000);
        assert_eq!(detail["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_quote_conversion() {
        let state = testing::state().await;
        let quote = dispatch(&state, "quotes.create", document()).await.unwrap();
        let id = quote["quote"]["id"].clone();
        assert!(quote["quote"]["quoteNumber"].as_str().unwrap().starts_with("D-"));

        let invoice = dispatch(&state, "quotes.convertToInvoice", json!({ "id": id }))
            .await
            .unwrap();
        assert_eq!(invoice["invoice"]["totalCents"], quote["quote"]["totalCents"]);

        let converted = dispatch(&state, "quotes.get", json!({ "id": id })).await.unwrap();
        assert_eq!(converted["quote"]["status"], "CONVERTED");

        let again = dispatch(&state, "quotes.convertToInvoice", json!({ "id": id }))
            .await
            .unwrap_err();
        assert_eq!(again.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_invoice_status_payload() {
        let state = testing::state().await;
        let detail = dispatch(&state, "invoices.create", document()).await.unwrap();
        let id = detail["invoice"]["id"].clone();

        let issued = dispatch(
            &state,
            "invoices.updateStatus",
            json!({ "id": id, "status": "ISSUED" }),
        )
        .await
        .unwrap();
        assert_eq!(issued["status"], "ISSUED");

        let err = dispatch(
            &state,
            "invoices.updateStatus",
            json!({ "id": id, "status": "ARCHIVED" }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
